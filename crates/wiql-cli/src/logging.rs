//! Structured logging for the wiql tool
//!
//! Console logs go to stderr so they never mix with translated queries on
//! stdout. Optional daily-rotated log files for batch runs.

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "wiql.log";

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// JSON format (structured logging)
    Json,
    /// Single-line format
    Compact,
}

impl LogFormat {
    /// Parse from environment variable
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr only
    Stderr,
    /// Log to file only
    File,
    /// Log to both stderr and file
    Both,
}

impl LogOutput {
    /// Parse from environment variable
    pub fn from_env() -> Self {
        match std::env::var("LOG_OUTPUT").as_deref() {
            Ok("file") => LogOutput::File,
            Ok("both") => LogOutput::Both,
            // "stdout" included: console logs always go to stderr
            _ => LogOutput::Stderr,
        }
    }
}

fn log_dir() -> String {
    std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string())
}

fn file_appender() -> anyhow::Result<RollingFileAppender> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE_PREFIX))
}

/// Initialize the logging system
///
/// Environment variables:
/// - `RUST_LOG`: Log level (e.g., "debug", "wiql_ir=trace")
/// - `LOG_FORMAT`: Output format ("pretty", "json", "compact")
/// - `LOG_OUTPUT`: Where to write logs ("stderr", "file", "both")
/// - `LOG_DIR`: Directory for log files (default: "./logs")
///
/// Examples:
/// ```bash
/// # See every flushed clause while translating
/// RUST_LOG=wiql_ir=trace wiql "from Task | where Priority = 1"
///
/// # JSON logs to a file, WIQL on stdout
/// LOG_FORMAT=json LOG_OUTPUT=file LOG_DIR=/var/log/wiql wiql --file queries.txt
/// ```
pub fn init() -> anyhow::Result<()> {
    let format = LogFormat::from_env();
    let output = LogOutput::from_env();

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;

    match (output, format) {
        (LogOutput::Stderr, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr).with_target(true))
                .try_init()?;
        }
        (LogOutput::Stderr, LogFormat::Json) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_current_span(true))
                .try_init()?;
        }
        (LogOutput::Stderr, LogFormat::Compact) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()?;
        }
        (LogOutput::File, _) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(file_appender()?).with_ansi(false))
                .try_init()?;
        }
        // Both stderr and file - use boxed layers for dynamic dispatch
        (LogOutput::Both, format) => {
            let console_layer = match format {
                LogFormat::Pretty => fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .boxed(),
                LogFormat::Json => fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .boxed(),
                LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
            };

            let file_layer = fmt::layer()
                .with_writer(file_appender()?)
                .with_ansi(false)
                .boxed();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()?;
        }
    }

    tracing::debug!(format = ?format, output = ?output, "Logging initialized");
    if matches!(output, LogOutput::File | LogOutput::Both) {
        tracing::debug!(directory = %log_dir(), "Writing log files");
    }

    Ok(())
}

/// Helper macro for logging with structured fields
///
/// Usage:
/// ```ignore
/// log_event!(
///     level: tracing::Level::INFO,
///     event: "query_translated",
///     entity: "Task",
///     where_clauses: 2
/// );
/// ```
#[macro_export]
macro_rules! log_event {
    (level: $level:expr, event: $event:expr $(, $key:ident: $value:expr)* $(,)?) => {
        tracing::event!(
            $level,
            event = $event
            $(, $key = ?$value)*
        );
    };
}
