//! Model definitions
//!
//! A `ModelDefinition` is the storage shape of one entity type: its table,
//! key column, timestamp and soft-delete behaviour, and named relations.

use crate::relation::RelationDefinition;
use perch_core::Record;
use serde::{Deserialize, Serialize};

/// Column set when a record is created (timestamps enabled)
pub const CREATED_AT: &str = "created_at";

/// Column refreshed on every save (timestamps enabled)
pub const UPDATED_AT: &str = "updated_at";

/// Column marking a soft-deleted row
pub const DELETED_AT: &str = "deleted_at";

/// Whether a record carries a soft-delete marker
pub fn is_trashed(record: &Record) -> bool {
    record.get(DELETED_AT).is_some_and(|v| !v.is_null())
}

// ============================================================================
// ModelDefinition
// ============================================================================

/// Storage shape of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Database table name (e.g., "users")
    pub table: String,

    /// Primary key column
    pub key_name: String,

    /// Maintain `created_at` / `updated_at`
    pub timestamps: bool,

    /// Rows are hidden by `deleted_at` instead of removed
    pub soft_deletes: bool,

    /// Named relations
    pub relations: Vec<RelationDefinition>,
}

impl ModelDefinition {
    /// Create a definition keyed by `id`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_name: "id".to_string(),
            timestamps: false,
            soft_deletes: false,
            relations: Vec::new(),
        }
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the primary key column
    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    /// Enable timestamps
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Enable soft deletes
    pub fn with_soft_deletes(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    /// Add a relation (replaces a relation with the same name)
    pub fn with_relation(mut self, relation: RelationDefinition) -> Self {
        self.relations.retain(|r| r.name != relation.name);
        self.relations.push(relation);
        self
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    pub fn relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relation(name).is_some()
    }

    /// A blank record of this model
    pub fn new_record(&self) -> Record {
        Record::new(&self.table, &self.key_name)
    }
}

// ============================================================================
// Tests
// ============================================================================
