//! Builtin template engine
//!
//! A registry of named views, each a closure from payload and placement
//! sections to markup. Display and form crates register their default views;
//! applications can override any of them by registering the same name again.

use crate::error::{AdminError, AdminResult};
use crate::traits::TemplateEngine;
use crate::types::Sections;
use indexmap::IndexMap;
use serde_json::Value;

/// Signature of a registered view
pub type ViewFn = Box<dyn Fn(&Value, &Sections) -> AdminResult<String>>;

/// Closure-backed template registry
pub struct Templates {
    namespace: String,
    views: IndexMap<String, ViewFn>,
}

impl Templates {
    /// Create an empty registry; view paths are prefixed with `namespace::`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            views: IndexMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register (or replace) a view
    pub fn register<F>(&mut self, name: impl Into<String>, view: F) -> &mut Self
    where
        F: Fn(&Value, &Sections) -> AdminResult<String> + 'static,
    {
        let name = name.into();
        tracing::debug!("Registering view {}::{}", self.namespace, name);
        self.views.insert(name, Box::new(view));
        self
    }

    /// Registered view names, in registration order
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("namespace", &self.namespace)
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TemplateEngine for Templates {
    fn view_path(&self, view: &str) -> String {
        format!("{}::{}", self.namespace, view)
    }

    fn has_view(&self, view: &str) -> bool {
        self.views.contains_key(view)
    }

    fn render(&self, view: &str, data: &Value, sections: &Sections) -> AdminResult<String> {
        let render = self
            .views
            .get(view)
            .ok_or_else(|| AdminError::TemplateNotFound(self.view_path(view)))?;
        render(data, sections)
    }
}

/// Read a string field of a payload (empty when absent)
pub fn str_field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Read a boolean field of a payload (false when absent)
pub fn bool_field(data: &Value, key: &str) -> bool {
    data.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Read an array field of a payload (empty when absent)
pub fn array_field<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// ============================================================================
// Tests
// ============================================================================
