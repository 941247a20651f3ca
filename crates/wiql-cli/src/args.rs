//! Command-line arguments

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::config::OutputFormat;
use wiql_ir::ProjectionMode;

/// Where query text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Inline(String),
    File(PathBuf),
    Stdin,
}

#[derive(Parser, Debug)]
#[command(
    name = "wiql",
    about = "Translate pipeline queries into WIQL",
    after_help = "Reads the query from QUERY, --file, or standard input when neither is given \
                  (or QUERY is '-'). Queries in a file or on stdin are separated by blank lines \
                  outside string literals. Options go before the query words."
)]
pub struct Args {
    /// Config file (default: ./config.yaml if present)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Entity mapping YAML (default: built-in entities)
    #[arg(long, short = 'm', value_name = "PATH")]
    pub mappings: Option<String>,

    /// Read queries from a file
    #[arg(long, short = 'f', value_name = "PATH", conflicts_with = "query")]
    pub file: Option<PathBuf>,

    /// explicit | default_fields
    #[arg(long, short = 'p', value_name = "MODE", value_parser = ProjectionMode::from_str)]
    pub projection: Option<ProjectionMode>,

    /// Print JSON instead of WIQL text
    #[arg(long)]
    pub json: bool,

    /// Query words, joined with spaces
    #[arg(value_name = "QUERY", trailing_var_arg = true)]
    pub query: Vec<String>,
}

impl Args {
    pub fn input(&self) -> Input {
        match &self.file {
            Some(path) => Input::File(path.clone()),
            None if self.is_stdin() => Input::Stdin,
            None => Input::Inline(self.query.join(" ")),
        }
    }

    pub fn format(&self) -> Option<OutputFormat> {
        self.json.then_some(OutputFormat::Json)
    }

    fn is_stdin(&self) -> bool {
        match self.query.as_slice() {
            [] => true,
            [word] => word == "-",
            _ => false,
        }
    }
}
