//! The model registry
//!
//! Holds every `ModelConfiguration` keyed by alias. Built once at bootstrap
//! and handed by reference to request handlers; it is never mutated after
//! that point.

use crate::configuration::ModelConfiguration;
use indexmap::IndexMap;
use perch_core::{AdminError, AdminResult};
use std::rc::Rc;

/// Read-only (after bootstrap) registry of model configurations
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, Rc<ModelConfiguration>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a configuration under its alias
    pub fn register(&mut self, configuration: ModelConfiguration) -> AdminResult<Rc<ModelConfiguration>> {
        self.register_shared(Rc::new(configuration))
    }

    /// Register an already shared configuration
    pub fn register_shared(
        &mut self,
        configuration: Rc<ModelConfiguration>,
    ) -> AdminResult<Rc<ModelConfiguration>> {
        let alias = configuration.alias().to_string();
        if self.models.contains_key(&alias) {
            return Err(AdminError::DuplicateModel(alias));
        }

        tracing::info!(
            "Registered model '{}' (table '{}')",
            alias,
            configuration.definition().table
        );
        self.models.insert(alias, configuration.clone());
        Ok(configuration)
    }

    /// Look up a configuration by alias
    pub fn get(&self, alias: &str) -> AdminResult<&Rc<ModelConfiguration>> {
        self.models
            .get(alias)
            .ok_or_else(|| AdminError::UnknownModel(alias.to_string()))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.models.contains_key(alias)
    }

    /// Find the configuration managing a table
    pub fn for_table(&self, table: &str) -> Option<&Rc<ModelConfiguration>> {
        self.models.values().find(|m| m.definition().table == table)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<ModelConfiguration>> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ModelDefinition;
    use crate::memory::{MemoryRepository, MemoryStore};
    use perch_core::Templates;

    fn config(alias: &str, table: &str) -> ModelConfiguration {
        let store = Rc::new(MemoryStore::new());
        let definition = ModelDefinition::new(table);
        ModelConfiguration::builder(
            alias,
            definition.clone(),
            Rc::new(MemoryRepository::new(store, definition)),
            Rc::new(Templates::new("admin")),
        )
        .build()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ModelRegistry::new();
        registry.register(config("users", "users")).unwrap();
        registry.register(config("posts", "blog_posts")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("posts").unwrap().alias(), "posts");
        assert_eq!(registry.for_table("blog_posts").unwrap().alias(), "posts");
        assert_eq!(registry.aliases().collect::<Vec<_>>(), vec!["users", "posts"]);
    }

    #[test]
    fn test_unknown_alias() {
        let registry = ModelRegistry::new();
        let err = registry.get("ghosts").unwrap_err();
        assert!(matches!(err, AdminError::UnknownModel(ref a) if a == "ghosts"));
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut registry = ModelRegistry::new();
        registry.register(config("users", "users")).unwrap();
        let err = registry.register(config("users", "people")).unwrap_err();
        assert!(err.is_fatal());
    }
}
