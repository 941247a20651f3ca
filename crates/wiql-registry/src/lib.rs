//! Field registry: maps entity properties to WIQL field identifiers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

mod caching;

pub use caching::CachingFieldMapper;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown field: no mapping for property '{property}' on entity '{entity}'")]
    UnknownField { entity: String, property: String },

    #[error("Failed to read mapping file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse mapping YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Resolves logical property names to field identifiers of the target system
///
/// Implementations are shared between concurrent translations, hence
/// `Send + Sync`.
pub trait FieldMapper: Send + Sync {
    /// Field identifier for `property` on `entity`
    fn resolve(&self, entity: &str, property: &str) -> Result<String, RegistryError>;

    /// Fields selected when a query has no explicit projection
    fn default_fields(&self, entity: &str) -> Vec<String>;

    /// Work item type values limiting a query to `entity`; empty means unrestricted
    fn type_restriction(&self, entity: &str) -> Vec<String>;
}

impl<M: FieldMapper + ?Sized> FieldMapper for Arc<M> {
    fn resolve(&self, entity: &str, property: &str) -> Result<String, RegistryError> {
        (**self).resolve(entity, property)
    }

    fn default_fields(&self, entity: &str) -> Vec<String> {
        (**self).default_fields(entity)
    }

    fn type_restriction(&self, entity: &str) -> Vec<String> {
        (**self).type_restriction(entity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMapping {
    pub property: String,
    pub field: String,
    /// Part of the default projection
    #[serde(default = "default_selected")]
    pub default: bool,
}

fn default_selected() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub work_item_types: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyMapping>,
}

impl EntityMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            work_item_types: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn property(self, property: impl Into<String>, field: impl Into<String>) -> Self {
        self.push_property(property.into(), field.into(), true)
    }

    /// Mapped property that is left out of the default projection
    pub fn hidden_property(self, property: impl Into<String>, field: impl Into<String>) -> Self {
        self.push_property(property.into(), field.into(), false)
    }

    pub fn work_item_type(mut self, name: impl Into<String>) -> Self {
        self.work_item_types.push(name.into());
        self
    }

    fn push_property(mut self, property: String, field: String, default: bool) -> Self {
        self.properties.push(PropertyMapping { property, field, default });
        self
    }

    pub fn find_property(&self, property: &str) -> Option<&PropertyMapping> {
        self.properties.iter().find(|p| p.property == property)
    }
}

/// In-memory field mapper keyed by entity name
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    entities: HashMap<String, EntityMapping>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the standard work item entities
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Load entity mappings from a YAML list
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let mappings: Vec<EntityMapping> = serde_yaml::from_str(yaml)?;
        let mut registry = Self::new();
        for mapping in mappings {
            registry.register(mapping);
        }
        Ok(registry)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let registry = Self::from_yaml_str(&contents)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            entities = registry.entities.len(),
            "Loaded field mappings"
        );
        Ok(registry)
    }

    /// Register an entity, replacing any previous mapping with the same name
    pub fn register(&mut self, mapping: EntityMapping) {
        if self.entities.contains_key(&mapping.name) {
            tracing::debug!(entity = %mapping.name, "Replacing entity mapping");
        }
        self.entities.insert(mapping.name.clone(), mapping);
    }

    pub fn with_entity(mut self, mapping: EntityMapping) -> Self {
        self.register(mapping);
        self
    }

    pub fn entity(&self, name: &str) -> Option<&EntityMapping> {
        self.entities.get(name)
    }

    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn register_builtins(&mut self) {
        self.register(common_properties(EntityMapping::new("WorkItem")));

        self.register(
            common_properties(EntityMapping::new("Task"))
                .property("Priority", "Microsoft.VSTS.Common.Priority")
                .property("RemainingWork", "Microsoft.VSTS.Scheduling.RemainingWork")
                .hidden_property("OriginalEstimate", "Microsoft.VSTS.Scheduling.OriginalEstimate")
                .hidden_property("CompletedWork", "Microsoft.VSTS.Scheduling.CompletedWork")
                .work_item_type("Task"),
        );

        self.register(
            common_properties(EntityMapping::new("Bug"))
                .property("Priority", "Microsoft.VSTS.Common.Priority")
                .property("Severity", "Microsoft.VSTS.Common.Severity")
                .hidden_property("ReproSteps", "Microsoft.VSTS.TCM.ReproSteps")
                .work_item_type("Bug"),
        );
    }
}

fn common_properties(mapping: EntityMapping) -> EntityMapping {
    mapping
        .property("Id", "System.Id")
        .property("Title", "System.Title")
        .property("State", "System.State")
        .property("WorkItemType", "System.WorkItemType")
        .property("AssignedTo", "System.AssignedTo")
        .property("AreaPath", "System.AreaPath")
        .property("IterationPath", "System.IterationPath")
        .property("ChangedDate", "System.ChangedDate")
        .hidden_property("Rev", "System.Rev")
        .hidden_property("Reason", "System.Reason")
        .hidden_property("CreatedDate", "System.CreatedDate")
        .hidden_property("Tags", "System.Tags")
        .hidden_property("Description", "System.Description")
        .hidden_property("History", "System.History")
}

impl FieldMapper for FieldRegistry {
    fn resolve(&self, entity: &str, property: &str) -> Result<String, RegistryError> {
        self.entities
            .get(entity)
            .and_then(|mapping| mapping.find_property(property))
            .map(|p| p.field.clone())
            .ok_or_else(|| RegistryError::UnknownField {
                entity: entity.to_string(),
                property: property.to_string(),
            })
    }

    fn default_fields(&self, entity: &str) -> Vec<String> {
        self.entities
            .get(entity)
            .map(|mapping| {
                mapping
                    .properties
                    .iter()
                    .filter(|p| p.default)
                    .map(|p| p.field.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn type_restriction(&self, entity: &str) -> Vec<String> {
        self.entities
            .get(entity)
            .map(|mapping| mapping.work_item_types.clone())
            .unwrap_or_default()
    }
}
