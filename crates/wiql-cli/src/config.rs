//! Configuration for the wiql command-line tool
//!
//! Loads configuration from:
//! 1. config.yaml - translator, output and logging settings
//! 2. .env file - loaded into the environment at startup
//!
//! Environment variables always override config.yaml values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use wiql_ir::ProjectionMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Translator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// How the select list is built: "explicit" or "default_fields"
    pub projection: ProjectionMode,

    /// YAML entity mappings; the built-in work item entities when unset
    pub mapping_file: Option<String>,
}

/// Output format of translated queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// WIQL text, one statement per line
    #[default]
    Wiql,
    /// One JSON object per query: text, fingerprint and the structured query
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wiql" | "text" => Ok(OutputFormat::Wiql),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stderr, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            output: "stderr".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub translator: TranslatorConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        // A relative mapping file is relative to the config file, not the working directory
        if let (Some(mapping_file), Some(dir)) = (&config.translator.mapping_file, path.parent()) {
            if Path::new(mapping_file).is_relative() {
                config.translator.mapping_file = Some(dir.join(mapping_file).to_string_lossy().into_owned());
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Defaults with environment variable overrides, for runs without a config file
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = std::env::var("WIQL_MAPPING_FILE") {
            self.translator.mapping_file = Some(path);
        }
        if let Ok(mode) = std::env::var("WIQL_PROJECTION_MODE") {
            self.translator.projection = parse_var("WIQL_PROJECTION_MODE", &mode)?;
        }
        if let Ok(format) = std::env::var("WIQL_OUTPUT_FORMAT") {
            self.output.format = parse_var("WIQL_OUTPUT_FORMAT", &format)?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }

        Ok(())
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}

fn parse_var<T: FromStr<Err = String>>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|message| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    })
}
