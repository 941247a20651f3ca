//! Memoizing wrapper around a field mapper

use std::collections::HashMap;
use std::sync::RwLock;

use crate::{FieldMapper, RegistryError};

/// Caches `resolve` results by `(entity, property)`
///
/// Failed lookups are not cached. The cache is safe to populate from
/// concurrent translations.
pub struct CachingFieldMapper<M> {
    inner: M,
    cache: RwLock<HashMap<(String, String), String>>,
}

impl<M: FieldMapper> CachingFieldMapper<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    /// Number of memoized resolutions
    pub fn cached_len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl<M: FieldMapper> FieldMapper for CachingFieldMapper<M> {
    fn resolve(&self, entity: &str, property: &str) -> Result<String, RegistryError> {
        let key = (entity.to_string(), property.to_string());

        if let Ok(cache) = self.cache.read() {
            if let Some(field) = cache.get(&key) {
                return Ok(field.clone());
            }
        }

        let field = self.inner.resolve(entity, property)?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, field.clone());
        }
        Ok(field)
    }

    fn default_fields(&self, entity: &str) -> Vec<String> {
        self.inner.default_fields(entity)
    }

    fn type_restriction(&self, entity: &str) -> Vec<String> {
        self.inner.type_restriction(entity)
    }
}
