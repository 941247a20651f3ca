//! Translating query text in batches and rendering the results

use anyhow::Context;
use serde::Serialize;
use wiql_ir::{TranslatedQuery, WiqlTranslator};

use crate::config::OutputFormat;

/// One translated query as printed in JSON mode
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub wiql: String,
    pub fingerprint: String,
    pub query: TranslatedQuery,
}

/// Split input into queries on blank lines outside `'...'` literals
pub fn split_queries(text: &str) -> Vec<String> {
    let mut queries = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_string = false;

    for line in text.lines() {
        if line.trim().is_empty() && !in_string {
            if !current.is_empty() {
                queries.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        // `''` toggles twice, so escaped quotes keep the state
        if line.matches('\'').count() % 2 == 1 {
            in_string = !in_string;
        }
        current.push(line);
    }
    if !current.is_empty() {
        queries.push(current.join("\n"));
    }

    queries
}

pub fn translate_one(translator: &WiqlTranslator<'_>, source: &str) -> anyhow::Result<QueryOutput> {
    let ast = wiql_ast::parse(source).context("Failed to parse query")?;
    let query = translator.translate(&ast).context("Failed to translate query")?;

    Ok(QueryOutput {
        wiql: query.to_wiql(),
        fingerprint: query.fingerprint(),
        query,
    })
}

pub fn render(outputs: &[QueryOutput], format: OutputFormat) -> anyhow::Result<String> {
    let mut out = String::new();
    for output in outputs {
        match format {
            OutputFormat::Wiql => out.push_str(&output.wiql),
            OutputFormat::Json => out.push_str(&serde_json::to_string(output)?),
        }
        out.push('\n');
    }
    Ok(out)
}
