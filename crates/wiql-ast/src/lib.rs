//! WIQL AST - query tree types and the pipeline text front end

pub mod ast;
mod parser;

pub use ast::*;
pub use parser::{parse, ParseError, Rule, WiqlParser, PARAMETER};
