//! Relation definitions between models
//!
//! A `RelationDefinition` describes how to load and save a named relation:
//! which table holds the related rows and which columns join the two sides.

use perch_core::{LoadedRelation, Record, RelationKind};
use serde::{Deserialize, Serialize};

// ============================================================================
// RelationDefinition
// ============================================================================

/// Describes a named relation of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    /// Relation name, also the key it is loaded under (e.g., "company")
    pub name: String,

    /// Relation kind
    pub kind: RelationKind,

    /// Table of the related model
    pub related_table: String,

    /// Key column of the related model
    #[serde(default = "default_key")]
    pub related_key_name: String,

    /// Foreign key column (on the parent for belongs-to, on the related
    /// table otherwise)
    pub foreign_key: String,

    /// Referenced column (owner key for belongs-to, local key otherwise)
    #[serde(default = "default_key")]
    pub reference_key: String,
}

fn default_key() -> String {
    "id".to_string()
}

impl RelationDefinition {
    /// Create a belongs-to relation; the foreign key defaults to `<name>_id`
    pub fn belongs_to(name: impl Into<String>, related_table: impl Into<String>) -> Self {
        let name = name.into();
        let foreign_key = format!("{}_id", heck::ToSnakeCase::to_snake_case(name.as_str()));
        Self {
            name,
            kind: RelationKind::BelongsTo,
            related_table: related_table.into(),
            related_key_name: default_key(),
            foreign_key,
            reference_key: default_key(),
        }
    }

    /// Create a has-one relation
    pub fn has_one(
        name: impl Into<String>,
        related_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::HasOne,
            related_table: related_table.into(),
            related_key_name: default_key(),
            foreign_key: foreign_key.into(),
            reference_key: default_key(),
        }
    }

    /// Create a has-many relation
    pub fn has_many(
        name: impl Into<String>,
        related_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationKind::HasMany,
            ..Self::has_one(name, related_table, foreign_key)
        }
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the foreign key column
    pub fn with_foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = column.into();
        self
    }

    /// Set the referenced column (owner key or local key)
    pub fn with_reference_key(mut self, column: impl Into<String>) -> Self {
        self.reference_key = column.into();
        self
    }

    /// Set the key column of the related table
    pub fn with_related_key_name(mut self, column: impl Into<String>) -> Self {
        self.related_key_name = column.into();
        self
    }

    // ========================================================================
    // Loading helpers
    // ========================================================================

    /// Column on the *related* rows that must match the parent
    pub fn related_match_column(&self) -> &str {
        match self.kind {
            RelationKind::BelongsTo => &self.reference_key,
            RelationKind::HasOne | RelationKind::HasMany => &self.foreign_key,
        }
    }

    /// Column on the *parent* whose value the related rows must match
    pub fn parent_match_column(&self) -> &str {
        match self.kind {
            RelationKind::BelongsTo => &self.foreign_key,
            RelationKind::HasOne | RelationKind::HasMany => &self.reference_key,
        }
    }

    /// Wrap related rows into a loaded relation value
    pub fn load(&self, mut related: Vec<Record>) -> LoadedRelation {
        match self.kind {
            RelationKind::BelongsTo => LoadedRelation::BelongsTo {
                foreign_key: self.foreign_key.clone(),
                owner_key: self.reference_key.clone(),
                related: related.drain(..).next().map(Box::new),
            },
            RelationKind::HasOne => LoadedRelation::HasOne {
                foreign_key: self.foreign_key.clone(),
                local_key: self.reference_key.clone(),
                related: related.drain(..).next().map(Box::new),
            },
            RelationKind::HasMany => LoadedRelation::HasMany {
                foreign_key: self.foreign_key.clone(),
                local_key: self.reference_key.clone(),
                related,
            },
        }
    }

    /// A blank related record for this relation's table
    pub fn new_related(&self) -> Record {
        Record::new(&self.related_table, &self.related_key_name)
    }
}

// ============================================================================
// Tests
// ============================================================================
