//! Mapping registry
//!
//! Owns every mapping definition keyed by (source key, destination key).
//! Both execution engines read from the same registry.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::mapping::{Mapping, MappingKey};
use crate::{Error, Result};

/// Registry of mapping definitions
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    mappings: BTreeMap<MappingKey, Mapping>,
}

impl MappingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the mapping for a key pair
    ///
    /// Repeated calls for the same pair return the same mapping, so
    /// configuration accumulates.
    pub fn create_mapping(&mut self, source_key: &str, destination_key: &str) -> &mut Mapping {
        let key = MappingKey::new(source_key, destination_key);
        self.mappings.entry(key).or_insert_with_key(|key| {
            debug!(mapping = %key, "registering mapping");
            Mapping::new(key.source.clone(), key.destination.clone())
        })
    }

    /// Look up the mapping for a key pair
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` when no mapping is registered.
    pub fn get_mapping(&self, source_key: &str, destination_key: &str) -> Result<&Mapping> {
        self.mappings
            .get(&MappingKey::new(source_key, destination_key))
            .ok_or_else(|| Error::mapping_not_found(source_key, destination_key))
    }

    /// Mutable lookup for the mapping of a key pair
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` when no mapping is registered.
    pub fn get_mapping_mut(&mut self, source_key: &str, destination_key: &str) -> Result<&mut Mapping> {
        self.mappings
            .get_mut(&MappingKey::new(source_key, destination_key))
            .ok_or_else(|| Error::mapping_not_found(source_key, destination_key))
    }

    #[must_use]
    pub fn contains(&self, source_key: &str, destination_key: &str) -> bool {
        self.mappings
            .contains_key(&MappingKey::new(source_key, destination_key))
    }

    /// Mappings in key order
    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Keep only the mappings matching `predicate`
    pub fn retain(&mut self, mut predicate: impl FnMut(&Mapping) -> bool) {
        self.mappings.retain(|_, mapping| predicate(mapping));
    }

    /// Drop every mapping
    pub fn reset(&mut self) {
        info!(mappings = self.mappings.len(), "resetting mapping registry");
        self.mappings.clear();
    }

    /// Map a source value with the mapping registered for a key pair
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` for an unknown key pair and propagates
    /// execution errors.
    pub fn map(&self, source_key: &str, destination_key: &str, source: Option<&Value>) -> Result<Option<Value>> {
        self.get_mapping(source_key, destination_key)?.map(source)
    }

    /// Map a sequence with holes
    ///
    /// # Errors
    ///
    /// See [`MappingRegistry::map`].
    pub fn map_items(
        &self,
        source_key: &str,
        destination_key: &str,
        items: &[Option<Value>],
    ) -> Result<Vec<Option<Value>>> {
        self.get_mapping(source_key, destination_key)?.map_items(items)
    }

    /// Asynchronous counterpart of [`MappingRegistry::map`]
    ///
    /// # Errors
    ///
    /// See [`MappingRegistry::map`].
    pub async fn map_async(
        &self,
        source_key: &str,
        destination_key: &str,
        source: Option<&Value>,
    ) -> Result<Option<Value>> {
        self.get_mapping(source_key, destination_key)?
            .map_async(source)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::MemberConfig;
    use serde_json::json;

    #[test]
    fn test_create_mapping_is_idempotent() {
        let mut registry = MappingRegistry::new();
        registry
            .create_mapping("a", "b")
            .configure_member("x", MemberConfig::constant(1))
            .unwrap();
        registry
            .create_mapping("a", "b")
            .configure_member("y", MemberConfig::constant(2))
            .unwrap();

        assert_eq!(registry.len(), 1);
        let mapping = registry.get_mapping("a", "b").unwrap();
        assert_eq!(mapping.tree().configured_members().len(), 2);
    }

    #[test]
    fn test_missing_mapping() {
        let registry = MappingRegistry::new();
        let err = registry.map("a", "b", Some(&json!({}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not find map object with a source of a and a destination of b"
        );
    }

    #[test]
    fn test_retain() {
        let mut registry = MappingRegistry::new();
        registry.create_mapping("p=>a", "p=>b");
        registry.create_mapping("a", "b");
        registry.retain(|mapping| !mapping.source_key().starts_with("p=>"));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("a", "b"));
    }

    #[test]
    fn test_reset() {
        let mut registry = MappingRegistry::new();
        registry.create_mapping("a", "b");
        assert!(registry.contains("a", "b"));
        registry.reset();
        assert!(registry.is_empty());
    }
}
