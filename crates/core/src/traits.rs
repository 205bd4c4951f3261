//! Collaborator traits for Perch Admin
//!
//! Displays and forms never talk to storage, templates or validators
//! directly; they go through these seams. The workspace ships an in-memory
//! repository (`perch_model::memory`), a closure-based template registry
//! (`crate::template`) and a rule validator (`perch_model::validation`).

use crate::error::AdminResult;
use crate::query::{Page, Query};
use crate::record::Record;
use crate::types::Sections;
use indexmap::IndexMap;
use serde_json::Value;

// ============================================================================
// Repository
// ============================================================================

/// Checks whether values already exist in storage (for `unique` rules)
pub trait PresenceVerifier {
    /// Count rows of `table` whose `column` equals `value`, skipping the row
    /// identified by `ignore` (`(key column, key value)`).
    fn count_matching(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        ignore: Option<(&str, &Value)>,
    ) -> AdminResult<usize>;
}

/// Query-building abstraction over a storage backend, bound to one model
pub trait Repository: PresenceVerifier {
    /// Relations to eager load on every following query
    fn with(&self, relations: &[String]);

    /// A fresh query for the repository's table, eager loads applied
    fn query(&self) -> Query;

    /// Find a record by primary key
    fn find(&self, key: &Value) -> AdminResult<Option<Record>>;

    /// Execute a query and return every matching row
    fn get(&self, query: &Query) -> AdminResult<Vec<Record>>;

    /// Execute a query and return one page (pages are 1-based)
    fn paginate(&self, query: &Query, per_page: usize, page: usize) -> AdminResult<Page>;

    /// Insert or update a record of any table, marking it persisted and
    /// assigning its key when storage generates one
    fn save(&self, record: &mut Record) -> AdminResult<()>;
}

// ============================================================================
// TemplateEngine
// ============================================================================

/// View rendering collaborator
pub trait TemplateEngine {
    /// Fully qualified path of a view name (`admin::display.table`)
    fn view_path(&self, view: &str) -> String;

    /// Whether a view is registered
    fn has_view(&self, view: &str) -> bool;

    /// Render a view with its payload; `sections` carries fragments injected
    /// into named placements
    fn render(&self, view: &str, data: &Value, sections: &Sections) -> AdminResult<String>;

    /// Render a view without placements
    fn render_view(&self, view: &str, data: &Value) -> AdminResult<String> {
        self.render(view, data, &Sections::default())
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Everything a validator needs: submitted data plus the merged ruleset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationInput {
    /// Submitted request data
    pub data: IndexMap<String, Value>,
    /// Rules per field, in the `name[:args]` grammar
    pub rules: IndexMap<String, Vec<String>>,
    /// Custom messages keyed `field.rule`
    pub messages: IndexMap<String, String>,
    /// Human labels per field (replace `:attribute`)
    pub labels: IndexMap<String, String>,
    /// Table checked by `unique` rules
    pub table: String,
    /// Row excluded from `unique` checks (the record being edited)
    pub ignore: Option<(String, Value)>,
}

/// Field-level validation errors, in rule order
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ValidationErrors {
    errors: IndexMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields with errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.errors.iter()
    }
}

/// Outcome of running a ruleset
pub trait Validator {
    fn fails(&self) -> bool;

    fn passes(&self) -> bool {
        !self.fails()
    }

    fn errors(&self) -> &ValidationErrors;
}

/// Creates validators from a ruleset
pub trait ValidationFactory {
    fn make(
        &self,
        input: ValidationInput,
        verifier: Option<&dyn PresenceVerifier>,
    ) -> AdminResult<Box<dyn Validator>>;
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Components with a one-time setup step before first render
pub trait Initializable {
    fn initialize(&mut self) -> AdminResult<()>;
}

/// Components that render a complete page fragment
pub trait Renderable {
    fn render(&mut self) -> AdminResult<String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_keep_field_order() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "The email field is required.");
        errors.add("name", "The name may not be greater than 5 characters.");
        errors.add("email", "The email must be a valid email address.");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.first("email"), Some("The email field is required."));
        assert_eq!(errors.get("email").len(), 2);
        assert!(errors.get("missing").is_empty());
        assert_eq!(
            errors.iter().map(|(f, _)| f.as_str()).collect::<Vec<_>>(),
            vec!["email", "name"]
        );
    }
}
