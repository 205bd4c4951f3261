//! Records: the entity instances displays list and forms edit
//!
//! A `Record` is a dynamic row (ordered attribute map) tagged with its table
//! and key column. Relations loaded alongside the record are kept separately
//! so the form pipeline can save them in the right order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Attribute storage for a record
pub type Attributes = IndexMap<String, Value>;

/// A record shared between a form and its element tree
pub type SharedRecord = Rc<RefCell<Record>>;

// ============================================================================
// RelationKind
// ============================================================================

/// How a related record is attached to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Parent holds the foreign key (`posts.user_id -> users.id`)
    BelongsTo,
    /// Related row holds the foreign key, at most one row
    HasOne,
    /// Related rows hold the foreign key
    HasMany,
}

impl RelationKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "Belongs To",
            RelationKind::HasOne => "Has One",
            RelationKind::HasMany => "Has Many",
        }
    }

    /// Whether related rows must be saved before the parent
    pub fn saves_before_parent(&self) -> bool {
        matches!(self, RelationKind::BelongsTo)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// LoadedRelation
// ============================================================================

/// A relation loaded (or attached for saving) on a record
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedRelation {
    BelongsTo {
        /// Column on the parent holding the related key
        foreign_key: String,
        /// Key column on the related record
        owner_key: String,
        related: Option<Box<Record>>,
    },
    HasOne {
        /// Column on the related record pointing back at the parent
        foreign_key: String,
        /// Parent column referenced by the foreign key
        local_key: String,
        related: Option<Box<Record>>,
    },
    HasMany {
        foreign_key: String,
        local_key: String,
        related: Vec<Record>,
    },
}

impl LoadedRelation {
    pub fn kind(&self) -> RelationKind {
        match self {
            LoadedRelation::BelongsTo { .. } => RelationKind::BelongsTo,
            LoadedRelation::HasOne { .. } => RelationKind::HasOne,
            LoadedRelation::HasMany { .. } => RelationKind::HasMany,
        }
    }

    /// Whether a related record is attached
    pub fn is_loaded(&self) -> bool {
        match self {
            LoadedRelation::BelongsTo { related, .. } | LoadedRelation::HasOne { related, .. } => {
                related.is_some()
            }
            LoadedRelation::HasMany { related, .. } => !related.is_empty(),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            LoadedRelation::BelongsTo { related, .. } | LoadedRelation::HasOne { related, .. } => {
                related.as_ref().map_or(Value::Null, |r| r.to_value())
            }
            LoadedRelation::HasMany { related, .. } => {
                Value::Array(related.iter().map(Record::to_value).collect())
            }
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// A single entity instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    table: String,
    key_name: String,
    attributes: Attributes,
    exists: bool,
    #[serde(skip)]
    relations: IndexMap<String, LoadedRelation>,
}

impl Record {
    /// Create a blank, not yet persisted record
    pub fn new(table: impl Into<String>, key_name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_name: key_name.into(),
            attributes: Attributes::new(),
            exists: false,
            relations: IndexMap::new(),
        }
    }

    /// Create a record that was read from storage
    pub fn existing(
        table: impl Into<String>,
        key_name: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            attributes,
            exists: true,
            ..Self::new(table, key_name)
        }
    }

    /// Builder: set an attribute
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Wrap in a shared handle
    pub fn into_shared(self) -> SharedRecord {
        Rc::new(RefCell::new(self))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Primary key value, if assigned
    pub fn key(&self) -> Option<&Value> {
        self.attributes.get(&self.key_name).filter(|v| !v.is_null())
    }

    /// Whether the record has been persisted
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Resolve a dotted path through loaded relations (`company.name`)
    pub fn get_path(&self, path: &str) -> Option<Value> {
        match path.split_once('.') {
            None => self.attributes.get(path).cloned(),
            Some((relation, rest)) => match self.relations.get(relation)? {
                LoadedRelation::BelongsTo { related, .. } | LoadedRelation::HasOne { related, .. } => {
                    related.as_ref()?.get_path(rest)
                }
                LoadedRelation::HasMany { related, .. } => Some(Value::Array(
                    related.iter().filter_map(|r| r.get_path(rest)).collect(),
                )),
            },
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.shift_remove(name)
    }

    /// Record that storage accepted this record
    pub fn mark_persisted(&mut self) {
        self.exists = true;
    }

    // ========================================================================
    // Relations
    // ========================================================================

    pub fn set_relation(&mut self, name: impl Into<String>, relation: LoadedRelation) {
        self.relations.insert(name.into(), relation);
    }

    pub fn relation(&self, name: &str) -> Option<&LoadedRelation> {
        self.relations.get(name)
    }

    pub fn relation_mut(&mut self, name: &str) -> Option<&mut LoadedRelation> {
        self.relations.get_mut(name)
    }

    pub fn relations(&self) -> &IndexMap<String, LoadedRelation> {
        &self.relations
    }

    /// Names of loaded relations of one kind, in load order
    pub fn relation_names(&self, kind: RelationKind) -> Vec<String> {
        self.relations
            .iter()
            .filter(|(_, r)| r.kind() == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Attributes and loaded relations as a JSON object
    pub fn to_value(&self) -> Value {
        let mut map: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, relation) in &self.relations {
            map.insert(name.clone(), relation.to_value());
        }
        Value::Object(map)
    }
}

// ============================================================================
// Tests
// ============================================================================
