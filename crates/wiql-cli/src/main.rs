//! wiql: translate pipeline queries into WIQL
//!
//! ```bash
//! wiql "from Task | where Priority = 1 | select Title | order ChangedDate desc"
//! wiql --json --mappings mappings.yaml --file queries.txt
//! ```

use anyhow::Context;
use clap::Parser;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;
use wiql_ir::WiqlTranslator;
use wiql_registry::{CachingFieldMapper, FieldRegistry};

mod args;
mod batch;
mod config;
mod logging;

use args::{Args, Input};
use config::Config;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::load(DEFAULT_CONFIG_FILE)?,
        None => Config::from_env()?,
    };
    if let Some(path) = &args.mappings {
        config.translator.mapping_file = Some(path.clone());
    }
    if let Some(mode) = args.projection {
        config.translator.projection = mode;
    }
    if let Some(format) = args.format() {
        config.output.format = format;
    }

    config.apply_logging_env();
    logging::init()?;

    let registry = match &config.translator.mapping_file {
        Some(path) => FieldRegistry::from_yaml_file(path)?,
        None => FieldRegistry::with_builtins(),
    };
    info!(entities = ?registry.entity_names(), "Field registry ready");

    let mapper = CachingFieldMapper::new(registry);
    let translator = WiqlTranslator::new(&mapper).with_projection_mode(config.translator.projection);

    let sources = match args.input() {
        Input::Inline(text) => vec![text],
        Input::File(path) => batch::split_queries(
            &std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        Input::Stdin => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            batch::split_queries(&text)
        }
    };
    if sources.is_empty() {
        anyhow::bail!("No query given; pass QUERY, --file, or pipe queries on stdin");
    }

    let mut outputs = Vec::with_capacity(sources.len());
    for (index, source) in sources.iter().enumerate() {
        let output = batch::translate_one(&translator, source)
            .with_context(|| format!("Query {} of {}", index + 1, sources.len()))?;

        crate::log_event!(
            level: tracing::Level::INFO,
            event: "query_translated",
            index: index,
            entity: output.query.underlying_type,
            where_clauses: output.query.where_clauses.len(),
            order_clauses: output.query.then_order_clauses.len(),
            fingerprint: output.fingerprint,
        );
        outputs.push(output);
    }
    tracing::debug!(cached_fields = mapper.cached_len(), "Translation finished");

    let rendered = batch::render(&outputs, config.output.format)?;
    std::io::stdout().lock().write_all(rendered.as_bytes())?;

    Ok(())
}
