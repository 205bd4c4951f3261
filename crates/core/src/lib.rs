//! # Perch Core
//!
//! Core types, collaborator traits, and error handling for Perch Admin.
//!
//! This crate provides the foundational building blocks used by the model,
//! display and form crates, including:
//!
//! - **Records**: dynamic entity instances with loaded relations
//! - **Queries**: plain query descriptions and paginated result sets
//! - **Traits**: `Repository`, `TemplateEngine`, `ValidationFactory`
//! - **Templates**: a closure-backed builtin template registry
//! - **Errors**: unified error handling with `AdminError` and `AdminResult`
//!

pub mod error;
pub mod query;
pub mod record;
pub mod template;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{AdminError, AdminResult, ResultExt};
pub use query::{Collection, Condition, Direction, Operator, Order, Page, Query, ScopeCall};
pub use record::{Attributes, LoadedRelation, Record, RelationKind, SharedRecord};
pub use template::Templates;
pub use traits::{
    Initializable, PresenceVerifier, Renderable, Repository, TemplateEngine, ValidationErrors,
    ValidationFactory, ValidationInput, Validator,
};
pub use types::{ConfigurationId, DisplayId, HtmlAttributes, Injection, Request, Sections};

/// Re-exported so downstream crates agree on the value type
pub use serde_json::Value;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
