//! Query AST → WIQL translator

mod clause;
mod walker;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use wiql_ast::{Expr, Projection};
use wiql_registry::{FieldMapper, RegistryError};

use crate::fragment::Fragment;
use crate::query::TranslatedQuery;
use walker::Walker;

/// Field holding the work item type; target of the implicit type restriction
pub const WORK_ITEM_TYPE_FIELD: &str = "System.WorkItemType";

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error(transparent)]
    UnknownField(#[from] RegistryError),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Malformed order: sort direction is neither ascending nor descending")]
    MalformedOrder,

    #[error("Missing source: the query has no entity type to translate against")]
    MissingSource,

    #[error("No fields to select for entity '{0}'")]
    EmptySelect(String),
}

/// How the `select` list is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    /// Always select the mapper's default fields, ignoring projections
    DefaultFields,
    /// Select the projected properties; defaults when none were requested
    #[default]
    Explicit,
}

impl FromStr for ProjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default_fields" | "defaults" => Ok(ProjectionMode::DefaultFields),
            "explicit" => Ok(ProjectionMode::Explicit),
            other => Err(format!("unknown projection mode '{}'", other)),
        }
    }
}

/// Translator for query ASTs → `TranslatedQuery`
///
/// Holds no per-query state; a single instance can serve many translations,
/// concurrently if the mapper allows it.
pub struct WiqlTranslator<'a> {
    field_mapper: &'a dyn FieldMapper,
    projection_mode: ProjectionMode,
}

impl<'a> WiqlTranslator<'a> {
    pub fn new(field_mapper: &'a dyn FieldMapper) -> Self {
        Self {
            field_mapper,
            projection_mode: ProjectionMode::default(),
        }
    }

    pub fn with_projection_mode(mut self, mode: ProjectionMode) -> Self {
        self.projection_mode = mode;
        self
    }

    pub fn projection_mode(&self) -> ProjectionMode {
        self.projection_mode
    }

    /// Translate an AST in a single pass. Errors abort the whole translation.
    pub fn translate(&self, ast: &Expr) -> Result<TranslatedQuery, TranslateError> {
        let root_type = ast.element_type().map(str::to_string);
        tracing::debug!(root_type = ?root_type, "Translating query");

        let mut walker = Walker::new(self.field_mapper, root_type.clone());
        walker.visit(ast)?;
        let mut query = walker.into_query();

        if query.underlying_type.is_none() {
            let entity = root_type.ok_or(TranslateError::MissingSource)?;
            query.set_underlying_type(&entity);
        }
        let entity = query
            .underlying_type
            .clone()
            .ok_or(TranslateError::MissingSource)?;

        query.select = self.select_fields(&entity, &query.projections)?;
        if query.select.is_empty() {
            return Err(TranslateError::EmptySelect(entity));
        }

        if let Some(restriction) = self.type_restriction_clause(&entity) {
            query.where_clauses.push(restriction);
        }

        tracing::debug!(
            entity = %entity,
            select = query.select.len(),
            where_clauses = query.where_clauses.len(),
            order_clauses = query.then_order_clauses.len(),
            "Translated query"
        );

        Ok(query)
    }

    fn select_fields(&self, entity: &str, projections: &[Projection]) -> Result<Vec<String>, TranslateError> {
        let mut requested: Vec<&str> = Vec::new();
        for projection in projections {
            if let Projection::Fields(names) = projection {
                for name in names {
                    if !requested.contains(&name.as_str()) {
                        requested.push(name.as_str());
                    }
                }
            }
        }

        match self.projection_mode {
            ProjectionMode::Explicit if !requested.is_empty() => requested
                .into_iter()
                .map(|property| self.field_mapper.resolve(entity, property).map_err(TranslateError::from))
                .collect(),
            ProjectionMode::Explicit => Ok(self.field_mapper.default_fields(entity)),
            ProjectionMode::DefaultFields => {
                if !requested.is_empty() {
                    tracing::warn!(
                        entity = %entity,
                        requested = ?requested,
                        "Explicit projection ignored, selecting default fields"
                    );
                }
                Ok(self.field_mapper.default_fields(entity))
            }
        }
    }

    fn type_restriction_clause(&self, entity: &str) -> Option<Fragment> {
        let mut types = self.field_mapper.type_restriction(entity);

        let (keyword, value) = match types.len() {
            0 => return None,
            1 => (" = ", Fragment::Constant(types.remove(0))),
            _ => (" IN ", Fragment::StringList(types)),
        };

        Some(Fragment::Compound(vec![
            Fragment::GroupOpen,
            Fragment::FieldReference(WORK_ITEM_TYPE_FIELD.to_string()),
            Fragment::literal(keyword),
            value,
            Fragment::GroupClose,
        ]))
    }
}
