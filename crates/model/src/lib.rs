//! # Perch Model
//!
//! Model-side building blocks for Perch Admin:
//!
//! - **Definitions**: tables, keys, timestamps, soft deletes and relations
//! - **Configurations**: per-entity admin settings, capabilities and hooks
//! - **Registry**: alias-keyed, read-only after bootstrap
//! - **Validation**: the `name[:args]` rule validator
//! - **Memory**: an in-memory `Repository` with a JSON data file
//! - **Config**: the declarative TOML admin configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use perch_model::{MemoryRepository, MemoryStore, ModelConfiguration, ModelDefinition};
//!
//! let store = Rc::new(MemoryStore::new());
//! let definition = ModelDefinition::new("users").with_timestamps();
//! let repository = Rc::new(MemoryRepository::new(store, definition.clone()));
//! let users = ModelConfiguration::builder("users", definition, repository, templates)
//!     .title("Users")
//!     .build();
//! ```

pub mod config;
pub mod configuration;
pub mod definition;
pub mod events;
pub mod memory;
pub mod registry;
pub mod relation;
pub mod validation;

pub use config::{
    AdminConfig, ConfigReport, ModelSection, check_config, load_config, parse_config,
    read_config,
};
pub use configuration::{ModelConfiguration, ModelConfigurationBuilder};
pub use definition::{CREATED_AT, DELETED_AT, ModelDefinition, UPDATED_AT};
pub use events::{EventHooks, HookOutcome, ModelEvent};
pub use memory::{MemoryRepository, MemoryStore};
pub use registry::ModelRegistry;
pub use relation::RelationDefinition;
pub use validation::{Rule, RuleValidator, RuleValidatorFactory};
