//! Per-entity admin configuration
//!
//! A `ModelConfiguration` ties a model definition to its repository and
//! template engine, and carries the capability flags and lifecycle listeners
//! consulted by displays and forms. It is built once at bootstrap and shared
//! read-only afterwards.

use crate::definition::ModelDefinition;
use crate::events::{EventHooks, HookOutcome, ModelEvent};
use indexmap::IndexMap;
use perch_core::types::{display_value, encode_query};
use perch_core::{ConfigurationId, Record, Repository, TemplateEngine, Value};
use std::rc::Rc;

// ============================================================================
// ModelConfiguration
// ============================================================================

/// Settings and capabilities of one admin-managed entity type
pub struct ModelConfiguration {
    id: ConfigurationId,
    alias: String,
    title: Option<String>,
    definition: ModelDefinition,
    repository: Rc<dyn Repository>,
    template: Rc<dyn TemplateEngine>,
    url_prefix: String,
    creatable: bool,
    editable: bool,
    deletable: bool,
    restorable: bool,
    hooks: EventHooks,
}

impl ModelConfiguration {
    /// Start building a configuration
    pub fn builder(
        alias: impl Into<String>,
        definition: ModelDefinition,
        repository: Rc<dyn Repository>,
        template: Rc<dyn TemplateEngine>,
    ) -> ModelConfigurationBuilder {
        ModelConfigurationBuilder {
            config: ModelConfiguration {
                id: ConfigurationId::new(),
                alias: alias.into(),
                title: None,
                definition,
                repository,
                template,
                url_prefix: "/admin".to_string(),
                creatable: true,
                editable: true,
                deletable: true,
                restorable: true,
                hooks: EventHooks::new(),
            },
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Instance identity (distinct even for equal aliases)
    pub fn id(&self) -> ConfigurationId {
        self.id
    }

    /// Whether `other` is this very configuration
    pub fn is_same(&self, other: &ModelConfiguration) -> bool {
        self.id == other.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Display title (defaults to the alias in title case)
    pub fn title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| heck::ToTitleCase::to_title_case(self.alias.as_str()))
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn repository(&self) -> &Rc<dyn Repository> {
        &self.repository
    }

    pub fn template(&self) -> &Rc<dyn TemplateEngine> {
        &self.template
    }

    /// A blank record of the configured model
    pub fn new_model(&self) -> Record {
        self.definition.new_record()
    }

    // ========================================================================
    // Capabilities
    // ========================================================================

    pub fn is_creatable(&self) -> bool {
        self.creatable
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_deletable(&self) -> bool {
        self.deletable
    }

    /// Soft-delete aware model with restoring enabled
    pub fn is_restorable_model(&self) -> bool {
        self.definition.soft_deletes && self.restorable
    }

    // ========================================================================
    // URLs
    // ========================================================================

    /// Listing URL
    pub fn display_url(&self) -> String {
        format!("{}/{}", self.url_prefix, self.alias)
    }

    /// Create-form URL with query parameters
    pub fn create_url(&self, params: &IndexMap<String, Value>) -> String {
        let base = format!("{}/create", self.display_url());
        let query = encode_query(params);
        if query.is_empty() {
            base
        } else {
            format!("{}?{}", base, query)
        }
    }

    /// Edit-form URL of a record
    pub fn edit_url(&self, key: &Value) -> String {
        format!("{}/{}/edit", self.display_url(), display_value(key))
    }

    /// Delete endpoint of a record
    pub fn delete_url(&self, key: &Value) -> String {
        format!("{}/{}/delete", self.display_url(), display_value(key))
    }

    /// Restore endpoint of a soft-deleted record
    pub fn restore_url(&self, key: &Value) -> String {
        format!("{}/{}/restore", self.display_url(), display_value(key))
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Fire a lifecycle event for a record
    pub fn fire_event(&self, event: ModelEvent, cancellable: bool, record: &Record) -> HookOutcome {
        tracing::debug!("Firing '{}' for model '{}'", event, self.alias);
        self.hooks.fire(event, cancellable, record)
    }

    pub fn hooks(&self) -> &EventHooks {
        &self.hooks
    }
}

impl std::fmt::Debug for ModelConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfiguration")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .field("definition", &self.definition)
            .field("creatable", &self.creatable)
            .field("editable", &self.editable)
            .field("deletable", &self.deletable)
            .field("restorable", &self.restorable)
            .field("hooks", &self.hooks)
            .finish()
    }
}

// ============================================================================
// ModelConfigurationBuilder
// ============================================================================

/// Builder for [`ModelConfiguration`]
pub struct ModelConfigurationBuilder {
    config: ModelConfiguration,
}

impl ModelConfigurationBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// URL prefix for generated links (default `/admin`)
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.url_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn creatable(mut self, creatable: bool) -> Self {
        self.config.creatable = creatable;
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.config.editable = editable;
        self
    }

    pub fn deletable(mut self, deletable: bool) -> Self {
        self.config.deletable = deletable;
        self
    }

    pub fn restorable(mut self, restorable: bool) -> Self {
        self.config.restorable = restorable;
        self
    }

    /// Register a lifecycle listener
    pub fn on<F>(mut self, event: ModelEvent, listener: F) -> Self
    where
        F: Fn(&Record) -> HookOutcome + 'static,
    {
        self.config.hooks.listen(event, listener);
        self
    }

    pub fn build(self) -> ModelConfiguration {
        self.config
    }

    /// Build into a shared handle
    pub fn build_shared(self) -> Rc<ModelConfiguration> {
        Rc::new(self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRepository, MemoryStore};
    use perch_core::Templates;
    use serde_json::json;

    fn configuration(definition: ModelDefinition) -> ModelConfigurationBuilder {
        let store = Rc::new(MemoryStore::new());
        let repository = Rc::new(MemoryRepository::new(store, definition.clone()));
        ModelConfiguration::builder(
            "blog_posts",
            definition,
            repository,
            Rc::new(Templates::new("admin")),
        )
    }

    #[test]
    fn test_default_title_and_urls() {
        let config = configuration(ModelDefinition::new("posts"))
            .url_prefix("/backend/")
            .build();

        assert_eq!(config.title(), "Blog Posts");
        assert_eq!(config.display_url(), "/backend/blog_posts");
        assert_eq!(config.edit_url(&json!(3)), "/backend/blog_posts/3/edit");
        assert_eq!(config.create_url(&IndexMap::new()), "/backend/blog_posts/create");

        let mut params = IndexMap::new();
        params.insert("user_id".to_string(), json!(4));
        assert_eq!(
            config.create_url(&params),
            "/backend/blog_posts/create?user_id=4"
        );
    }

    #[test]
    fn test_restorable_requires_soft_deletes() {
        let plain = configuration(ModelDefinition::new("posts")).build();
        assert!(!plain.is_restorable_model());

        let soft = configuration(ModelDefinition::new("posts").with_soft_deletes()).build();
        assert!(soft.is_restorable_model());

        let disabled = configuration(ModelDefinition::new("posts").with_soft_deletes())
            .restorable(false)
            .build();
        assert!(!disabled.is_restorable_model());
    }

    #[test]
    fn test_identity_is_per_instance() {
        let a = configuration(ModelDefinition::new("posts")).build();
        let b = configuration(ModelDefinition::new("posts")).build();
        assert!(a.is_same(&a));
        assert!(!a.is_same(&b));
    }

    #[test]
    fn test_fire_event_uses_registered_listeners() {
        let config = configuration(ModelDefinition::new("posts"))
            .on(ModelEvent::Creating, |record| {
                if record.get("title").is_none() {
                    HookOutcome::Abort
                } else {
                    HookOutcome::Proceed
                }
            })
            .build();

        let blank = config.new_model();
        assert!(config.fire_event(ModelEvent::Creating, true, &blank).is_abort());

        let titled = config.new_model().with("title", "Hello");
        assert!(!config.fire_event(ModelEvent::Creating, true, &titled).is_abort());
    }
}
