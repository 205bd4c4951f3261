//! # Perch CLI
//!
//! Command-line interface for Perch Admin. A TOML configuration describes
//! the managed models; a JSON data file backs the in-memory store.
//!
//! ## Commands
//!
//! - `check` - Validate a configuration and report every problem
//! - `list` - Render the listing of a model (HTML or JSON payload)
//! - `create` - Run the form save pipeline for a new record
//! - `edit` - Run the form save pipeline for an existing record
//! - `form` - Render the create or edit form
//!

pub mod args;
pub mod bootstrap;
pub mod commands;

pub use args::{Cli, Commands};
pub use bootstrap::Admin;
pub use commands::{execute, run};

/// CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
