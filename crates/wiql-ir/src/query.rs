//! Translated query and its WIQL rendering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use wiql_ast::Projection;

use crate::fragment::Fragment;
use crate::text;

/// Source every WIQL flat query selects from
pub const FROM_SOURCE: &str = "WorkItems";

/// Output of one translation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslatedQuery {
    pub underlying_type: Option<String>,

    /// Raw projection requests, in the order they were encountered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projections: Vec<Projection>,

    pub select: Vec<String>,

    /// Filter clauses, combined with AND
    #[serde(default)]
    pub where_clauses: Vec<Fragment>,

    /// Sort keys, applied in order
    #[serde(default)]
    pub then_order_clauses: Vec<Fragment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl TranslatedQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the entity kind unless one was already set. Returns whether it was set.
    pub fn set_underlying_type(&mut self, entity: &str) -> bool {
        if self.underlying_type.is_some() {
            return false;
        }
        self.underlying_type = Some(entity.to_string());
        true
    }

    pub fn where_text(&self) -> Vec<String> {
        self.where_clauses.iter().map(Fragment::render).collect()
    }

    pub fn order_text(&self) -> Vec<String> {
        self.then_order_clauses.iter().map(Fragment::render).collect()
    }

    /// Render the complete WIQL statement
    pub fn to_wiql(&self) -> String {
        let mut wiql = format!("SELECT {} FROM {}", self.select.join(", "), FROM_SOURCE);

        if !self.where_clauses.is_empty() {
            wiql.push_str(" WHERE ");
            wiql.push_str(&text::concat(&self.where_clauses, Fragment::render, " AND "));
        }

        if !self.then_order_clauses.is_empty() {
            wiql.push_str(" ORDER BY ");
            wiql.push_str(&text::concat(&self.then_order_clauses, Fragment::render, ", "));
        }

        if let Some(as_of) = &self.as_of {
            wiql.push_str(" ASOF ");
            wiql.push_str(&text::quote(&text::format_timestamp(as_of)));
        }

        wiql
    }

    /// SHA-256 of the rendered statement
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_wiql().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for TranslatedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wiql())
    }
}
