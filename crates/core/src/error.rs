//! Error types for Perch Admin
//!
//! This module provides unified error handling for displays, forms, model
//! configurations and their collaborators. Validation failures and hook
//! vetoes are deliberately *not* errors: they are reported as values by the
//! form pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Perch Admin
#[derive(Debug, Error)]
pub enum AdminError {
    // ========================================================================
    // Dispatch Errors
    // ========================================================================
    /// Accessor name did not resolve to a registered extension
    #[error("Call to undefined method [{0}]")]
    MethodNotFound(String),

    /// Extension is not registered on the display
    #[error("Extension not registered: '{0}'")]
    ExtensionNotFound(String),

    /// Extension is registered under the name but has another concrete type
    #[error("Extension '{name}' is not a {expected}")]
    ExtensionType {
        name: String,
        expected: &'static str,
    },

    // ========================================================================
    // Template Errors
    // ========================================================================
    /// View is not registered with the template engine
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// View failed to render
    #[error("Template rendering failed for '{template}': {message}")]
    TemplateRender { template: String, message: String },

    // ========================================================================
    // Model Errors
    // ========================================================================
    /// No model configuration registered under the alias
    #[error("Unknown model alias: {0}")]
    UnknownModel(String),

    /// Model configuration alias registered twice
    #[error("Duplicate model alias: '{0}' already registered")]
    DuplicateModel(String),

    /// Record lookup by key failed
    #[error("Model '{model}' has no record with key {key}")]
    ModelNotFound { model: String, key: String },

    /// A save or validation was requested by a configuration that does not
    /// own the form
    #[error("Configuration mismatch: form belongs to '{expected}', request came from '{found}'")]
    ConfigurationMismatch { expected: String, found: String },

    /// Relation is missing or could not be saved
    #[error("Relation '{relation}' failed: {message}")]
    Relation { relation: String, message: String },

    /// Query scope is not known to the repository
    #[error("Unknown query scope '{scope}' on table '{table}'")]
    UnknownScope { table: String, scope: String },

    /// Persistence layer failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// Validation rule could not be parsed
    #[error("Invalid validation rule '{0}'")]
    InvalidRule(String),

    /// Configuration file schema is newer than this build understands
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: u32, found: u32 },

    // ========================================================================
    // IO and Serialization Errors
    // ========================================================================
    /// File IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File read error
    #[error("Failed to read file '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    /// File write error
    #[error("Failed to write file '{path}': {message}")]
    FileWrite { path: PathBuf, message: String },

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl AdminError {
    /// Create a template rendering error
    pub fn render(template: impl Into<String>, msg: impl Into<String>) -> Self {
        AdminError::TemplateRender {
            template: template.into(),
            message: msg.into(),
        }
    }

    /// Create a relation error
    pub fn relation(relation: impl Into<String>, msg: impl Into<String>) -> Self {
        AdminError::Relation {
            relation: relation.into(),
            message: msg.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        AdminError::Persistence(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        AdminError::InvalidConfig(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        AdminError::Internal(msg.into())
    }

    /// Create an error with context
    pub fn with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        AdminError::WithContext {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AdminError::MethodNotFound(_)
                | AdminError::ExtensionNotFound(_)
                | AdminError::TemplateNotFound(_)
                | AdminError::UnknownModel(_)
                | AdminError::ModelNotFound { .. }
                | AdminError::UnknownScope { .. }
        )
    }

    /// Check if this error should abort bootstrap rather than a single request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AdminError::TemplateNotFound(_)
                | AdminError::InvalidConfig(_)
                | AdminError::MissingConfig(_)
                | AdminError::SchemaVersionMismatch { .. }
                | AdminError::DuplicateModel(_)
        )
    }

    /// Check if this error came from the persistence layer
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            AdminError::Persistence(_) | AdminError::Relation { .. } | AdminError::UnknownScope { .. }
        )
    }
}

/// Result type alias using AdminError
pub type AdminResult<T> = Result<T, AdminError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> AdminResult<T>;
}

impl<T, E: Into<AdminError>> ResultExt<T> for Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> AdminResult<T> {
        self.map_err(|e| {
            let err: AdminError = e.into();
            AdminError::WithContext {
                context: context.into(),
                message: err.to_string(),
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
