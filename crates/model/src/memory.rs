//! In-memory storage backend
//!
//! `MemoryStore` keeps rows per table and can be loaded from and saved to a
//! JSON data file. `MemoryRepository` implements the `Repository` seam for
//! one model over a shared store: conditions, named scopes, ordering,
//! pagination, eager loading, timestamps and soft deletes.

use crate::definition::{CREATED_AT, DELETED_AT, ModelDefinition, UPDATED_AT};
use indexmap::IndexMap;
use perch_core::query::loosely_equal;
use perch_core::{
    AdminError, AdminResult, Attributes, Page, PresenceVerifier, Query, Record, Repository,
    Value,
};
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

/// Format used for `created_at` / `updated_at` / `deleted_at` values
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// MemoryStore
// ============================================================================

/// Storage behaviour of one table
#[derive(Debug, Clone, PartialEq, Eq)]
struct TableOptions {
    key_name: String,
    timestamps: bool,
    soft_deletes: bool,
}

#[derive(Debug, Default)]
struct Table {
    next_id: u64,
    rows: Vec<Attributes>,
}

/// Rows of every table, shared by all repositories of an admin
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RefCell<IndexMap<String, Table>>,
    options: RefCell<IndexMap<String, TableOptions>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the storage behaviour of a model's table
    pub fn define(&self, definition: &ModelDefinition) {
        self.options.borrow_mut().insert(
            definition.table.clone(),
            TableOptions {
                key_name: definition.key_name.clone(),
                timestamps: definition.timestamps,
                soft_deletes: definition.soft_deletes,
            },
        );
    }

    fn options_for(&self, table: &str, fallback_key: &str) -> TableOptions {
        self.options
            .borrow()
            .get(table)
            .cloned()
            .unwrap_or_else(|| TableOptions {
                key_name: fallback_key.to_string(),
                timestamps: false,
                soft_deletes: false,
            })
    }

    /// Insert a raw row, assigning a numeric key when absent
    pub fn insert(&self, table: &str, mut row: Attributes) -> Value {
        let options = self.options_for(table, "id");
        let mut tables = self.tables.borrow_mut();
        let entry = tables.entry(table.to_string()).or_default();

        let key = match row.get(&options.key_name).filter(|v| !v.is_null()) {
            Some(key) => {
                if let Some(n) = key.as_u64() {
                    entry.next_id = entry.next_id.max(n);
                }
                key.clone()
            }
            None => {
                entry.next_id += 1;
                let key = Value::from(entry.next_id);
                row.insert(options.key_name.clone(), key.clone());
                key
            }
        };

        entry.rows.push(row);
        key
    }

    /// Every row of a table, soft-deleted rows included
    pub fn rows(&self, table: &str) -> Vec<Attributes> {
        self.tables
            .borrow()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Rows of a table that are not soft-deleted
    pub fn visible_rows(&self, table: &str, with_trashed: bool) -> Vec<Attributes> {
        let soft_deletes = self.options_for(table, "id").soft_deletes;
        self.rows(table)
            .into_iter()
            .filter(|row| with_trashed || !soft_deletes || is_live(row))
            .collect()
    }

    pub fn count(&self, table: &str) -> usize {
        self.tables.borrow().get(table).map_or(0, |t| t.rows.len())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.borrow().keys().cloned().collect()
    }

    /// Insert or update a record, stamping timestamps and assigning its key
    pub fn save(&self, record: &mut Record) -> AdminResult<()> {
        let options = self.options_for(record.table(), record.key_name());
        let now = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();

        if options.timestamps {
            if !record.exists() {
                record.set(CREATED_AT, now.clone());
            }
            record.set(UPDATED_AT, now);
        }

        if record.exists() {
            let key = record.key().cloned().ok_or_else(|| {
                AdminError::persistence(format!(
                    "Existing '{}' record has no value for key '{}'",
                    record.table(),
                    record.key_name()
                ))
            })?;

            let mut tables = self.tables.borrow_mut();
            let row = tables
                .get_mut(record.table())
                .and_then(|t| {
                    t.rows.iter_mut().find(|row| {
                        row.get(record.key_name())
                            .is_some_and(|v| loosely_equal(v, &key))
                    })
                })
                .ok_or_else(|| AdminError::ModelNotFound {
                    model: record.table().to_string(),
                    key: perch_core::types::display_value(&key),
                })?;

            for (name, value) in record.attributes() {
                row.insert(name.clone(), value.clone());
            }
            tracing::info!("Updated {} #{}", record.table(), key);
        } else {
            let key = self.insert(record.table(), record.attributes().clone());
            record.set(record.key_name().to_string(), key.clone());
            tracing::info!("Inserted {} #{}", record.table(), key);
        }

        record.mark_persisted();
        Ok(())
    }

    /// Mark a row as deleted (`deleted_at`) or remove it when the table has
    /// no soft deletes
    pub fn delete(&self, table: &str, key: &Value) -> AdminResult<()> {
        let options = self.options_for(table, "id");
        let mut tables = self.tables.borrow_mut();
        let rows = &mut tables
            .get_mut(table)
            .ok_or_else(|| AdminError::ModelNotFound {
                model: table.to_string(),
                key: perch_core::types::display_value(key),
            })?
            .rows;

        let position = rows
            .iter()
            .position(|row| {
                row.get(&options.key_name)
                    .is_some_and(|v| loosely_equal(v, key))
            })
            .ok_or_else(|| AdminError::ModelNotFound {
                model: table.to_string(),
                key: perch_core::types::display_value(key),
            })?;

        if options.soft_deletes {
            let now = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
            rows[position].insert(DELETED_AT.to_string(), Value::String(now));
        } else {
            rows.remove(position);
        }
        Ok(())
    }

    // ========================================================================
    // JSON data files
    // ========================================================================

    /// Load rows from a JSON data file (`{"table": [{...}, ...]}`)
    pub fn load_json(&self, path: impl AsRef<Path>) -> AdminResult<()> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| AdminError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        self.load_json_str(&json).map_err(|e| match e {
            AdminError::Json(je) => AdminError::FileRead {
                path: path.to_path_buf(),
                message: format!("Invalid data file format: {}", je),
            },
            other => other,
        })
    }

    /// Load rows from a JSON string
    pub fn load_json_str(&self, json: &str) -> AdminResult<()> {
        let data: IndexMap<String, Vec<Attributes>> = serde_json::from_str(json)?;
        for (table, rows) in data {
            let count = rows.len();
            for row in rows {
                self.insert(&table, row);
            }
            tracing::debug!("Loaded {} row(s) into '{}'", count, table);
        }
        Ok(())
    }

    /// Save every table to a JSON data file
    pub fn save_json(&self, path: impl AsRef<Path>) -> AdminResult<()> {
        let path = path.as_ref();
        let data: IndexMap<String, Vec<Attributes>> = self
            .tables
            .borrow()
            .iter()
            .map(|(name, table)| (name.clone(), table.rows.clone()))
            .collect();

        let json = serde_json::to_string_pretty(&data).map_err(|e| AdminError::FileWrite {
            path: path.to_path_buf(),
            message: format!("Failed to serialize data: {}", e),
        })?;

        std::fs::write(path, json).map_err(|e| AdminError::FileWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        tracing::info!("Saved data to {}", path.display());
        Ok(())
    }
}

fn is_live(row: &Attributes) -> bool {
    row.get(DELETED_AT).is_none_or(Value::is_null)
}

// ============================================================================
// MemoryRepository
// ============================================================================

/// A named scope: row predicate receiving the scope arguments
pub type ScopeFn = Box<dyn Fn(&Attributes, &[Value]) -> bool>;

/// `Repository` for one model over a shared [`MemoryStore`]
pub struct MemoryRepository {
    store: Rc<MemoryStore>,
    definition: ModelDefinition,
    eager: RefCell<Vec<String>>,
    scopes: IndexMap<String, ScopeFn>,
    executed: Cell<usize>,
}

impl MemoryRepository {
    /// Create a repository and register the model's table with the store
    pub fn new(store: Rc<MemoryStore>, definition: ModelDefinition) -> Self {
        store.define(&definition);
        Self {
            store,
            definition,
            eager: RefCell::new(Vec::new()),
            scopes: IndexMap::new(),
            executed: Cell::new(0),
        }
    }

    /// Register a named scope
    pub fn with_scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(&Attributes, &[Value]) -> bool + 'static,
    {
        self.scopes.insert(name.into(), Box::new(scope));
        self
    }

    pub fn store(&self) -> &Rc<MemoryStore> {
        &self.store
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    /// Number of queries executed against the store
    pub fn executed_queries(&self) -> usize {
        self.executed.get()
    }

    /// Relations eager loaded on every query
    pub fn eager_relations(&self) -> Vec<String> {
        self.eager.borrow().clone()
    }

    fn select(&self, query: &Query) -> AdminResult<Vec<Attributes>> {
        self.executed.set(self.executed.get() + 1);

        let mut rows = Vec::new();
        for row in self.store.visible_rows(&self.definition.table, query.with_trashed) {
            if !query.matches(&row) {
                continue;
            }
            if self.matches_scopes(query, &row)? {
                rows.push(row);
            }
        }

        rows.sort_by(|a, b| query.compare(a, b));
        tracing::debug!(
            "Selected {} row(s) from '{}'",
            rows.len(),
            self.definition.table
        );
        Ok(rows)
    }

    fn matches_scopes(&self, query: &Query, row: &Attributes) -> AdminResult<bool> {
        for call in &query.scopes {
            let scope = self
                .scopes
                .get(&call.name)
                .ok_or_else(|| AdminError::UnknownScope {
                    table: self.definition.table.clone(),
                    scope: call.name.clone(),
                })?;
            if !scope(row, &call.args) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Build a record and attach the requested relations
    fn hydrate(&self, row: Attributes, eager: &[String]) -> AdminResult<Record> {
        let mut record = Record::existing(&self.definition.table, &self.definition.key_name, row);

        for name in eager {
            let relation = self.definition.relation(name).ok_or_else(|| {
                AdminError::relation(
                    name.as_str(),
                    format!("not defined on '{}'", self.definition.table),
                )
            })?;

            let parent_value = record
                .get(relation.parent_match_column())
                .cloned()
                .unwrap_or(Value::Null);

            let related = if parent_value.is_null() {
                Vec::new()
            } else {
                let match_column = relation.related_match_column();
                self.store
                    .visible_rows(&relation.related_table, false)
                    .into_iter()
                    .filter(|r| {
                        r.get(match_column)
                            .is_some_and(|v| loosely_equal(v, &parent_value))
                    })
                    .map(|r| Record::existing(&relation.related_table, &relation.related_key_name, r))
                    .collect()
            };

            record.set_relation(name.clone(), relation.load(related));
        }

        Ok(record)
    }
}

impl std::fmt::Debug for MemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRepository")
            .field("table", &self.definition.table)
            .field("eager", &self.eager.borrow())
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .field("executed", &self.executed.get())
            .finish()
    }
}

impl PresenceVerifier for MemoryRepository {
    fn count_matching(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        ignore: Option<(&str, &Value)>,
    ) -> AdminResult<usize> {
        let count = self
            .store
            .rows(table)
            .iter()
            .filter(|row| row.get(column).is_some_and(|v| loosely_equal(v, value)))
            .filter(|row| match ignore {
                Some((key_name, key)) => !row.get(key_name).is_some_and(|v| loosely_equal(v, key)),
                None => true,
            })
            .count();
        Ok(count)
    }
}

impl Repository for MemoryRepository {
    fn with(&self, relations: &[String]) {
        let mut eager = self.eager.borrow_mut();
        for relation in relations {
            if !eager.contains(relation) {
                eager.push(relation.clone());
            }
        }
    }

    fn query(&self) -> Query {
        let mut query = Query::new(&self.definition.table);
        query.with(self.eager.borrow().as_slice());
        query
    }

    fn find(&self, key: &Value) -> AdminResult<Option<Record>> {
        let mut query = self.query();
        query.where_eq(&self.definition.key_name, key.clone());
        let eager = query.eager.clone();
        match self.select(&query)?.into_iter().next() {
            Some(row) => Ok(Some(self.hydrate(row, &eager)?)),
            None => Ok(None),
        }
    }

    fn get(&self, query: &Query) -> AdminResult<Vec<Record>> {
        self.select(query)?
            .into_iter()
            .map(|row| self.hydrate(row, &query.eager))
            .collect()
    }

    fn paginate(&self, query: &Query, per_page: usize, page: usize) -> AdminResult<Page> {
        let page = page.max(1);
        let rows = self.select(query)?;
        let total = rows.len();

        // Past the addressable range the page is simply empty
        let Some(offset) = (page - 1).checked_mul(per_page) else {
            return Ok(Page {
                items: Vec::new(),
                total,
                per_page,
                current_page: page,
            });
        };

        let items = rows
            .into_iter()
            .skip(offset)
            .take(per_page)
            .map(|row| self.hydrate(row, &query.eager).map(Rc::new))
            .collect::<AdminResult<Vec<_>>>()?;

        Ok(Page {
            items,
            total,
            per_page,
            current_page: page,
        })
    }

    fn save(&self, record: &mut Record) -> AdminResult<()> {
        self.store.save(record)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationDefinition;
    use perch_core::{Direction, LoadedRelation, Operator};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(value: Value) -> Attributes {
        value
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    fn seeded() -> (Rc<MemoryStore>, MemoryRepository) {
        let store = Rc::new(MemoryStore::new());
        store.define(&ModelDefinition::new("companies"));
        store.insert("companies", row(json!({"name": "Engines Ltd"})));

        let users = ModelDefinition::new("users")
            .with_soft_deletes()
            .with_relation(RelationDefinition::belongs_to("company", "companies"));
        let repository = MemoryRepository::new(store.clone(), users)
            .with_scope("role", |row, args| {
                args.first().is_some_and(|role| row.get("role") == Some(role))
            });

        store.insert("users", row(json!({"name": "Ada", "role": "admin", "company_id": 1})));
        store.insert("users", row(json!({"name": "Grace", "role": "editor"})));
        store.insert(
            "users",
            row(json!({"name": "Linus", "role": "admin", "deleted_at": "2024-01-01 00:00:00"})),
        );
        (store, repository)
    }

    #[test]
    fn test_get_hides_soft_deleted_rows() {
        let (_, repository) = seeded();
        let names: Vec<_> = repository
            .get(&repository.query())
            .unwrap()
            .iter()
            .map(|r| r.get("name").cloned())
            .collect();
        assert_eq!(names, vec![Some(json!("Ada")), Some(json!("Grace"))]);

        let mut query = repository.query();
        query.with_trashed();
        assert_eq!(repository.get(&query).unwrap().len(), 3);
    }

    #[test]
    fn test_conditions_scopes_and_ordering() {
        let (_, repository) = seeded();
        let mut query = repository.query();
        query
            .scope("role", vec![json!("admin")])
            .with_trashed()
            .order_by("name", Direction::Desc);
        let names: Vec<_> = repository
            .get(&query)
            .unwrap()
            .iter()
            .map(|r| r.get("name").cloned())
            .collect();
        assert_eq!(names, vec![Some(json!("Linus")), Some(json!("Ada"))]);

        let mut query = repository.query();
        query.where_op("name", Operator::Like, "%gra%");
        assert_eq!(repository.get(&query).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_scope_is_an_error() {
        let (_, repository) = seeded();
        let mut query = repository.query();
        query.scope("popular", vec![]);
        let err = repository.get(&query).unwrap_err();
        assert!(matches!(err, AdminError::UnknownScope { ref scope, .. } if scope == "popular"));
    }

    #[test]
    fn test_paginate_slices_rows() {
        let (store, repository) = seeded();
        for i in 0..5 {
            store.insert("users", row(json!({"name": format!("User {}", i)})));
        }

        let page = repository.paginate(&repository.query(), 3, 2).unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.last_page(), 3);
        assert_eq!(repository.executed_queries(), 1);
    }

    #[test]
    fn test_paginate_beyond_last_page() {
        let (_, repository) = seeded();

        let page = repository.paginate(&repository.query(), 3, 9).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);

        let page = repository.paginate(&repository.query(), 3, usize::MAX).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.current_page, usize::MAX);
    }

    #[test]
    fn test_eager_loading_belongs_to() {
        let (_, repository) = seeded();
        repository.with(&["company".to_string()]);

        let ada = repository.find(&json!(1)).unwrap().unwrap();
        assert_eq!(ada.get_path("company.name"), Some(json!("Engines Ltd")));

        let grace = repository.find(&json!("2")).unwrap().unwrap();
        assert!(matches!(
            grace.relation("company"),
            Some(LoadedRelation::BelongsTo { related: None, .. })
        ));
    }

    #[test]
    fn test_save_inserts_and_updates_with_timestamps() {
        let store = Rc::new(MemoryStore::new());
        let repository =
            MemoryRepository::new(store.clone(), ModelDefinition::new("posts").with_timestamps());

        let mut post = repository.definition().new_record().with("title", "Draft");
        repository.save(&mut post).unwrap();
        assert!(post.exists());
        assert_eq!(post.key(), Some(&json!(1)));
        assert!(post.get(CREATED_AT).is_some());

        post.set("title", "Published");
        repository.save(&mut post).unwrap();
        assert_eq!(store.count("posts"), 1);
        assert_eq!(store.rows("posts")[0].get("title"), Some(&json!("Published")));
    }

    #[test]
    fn test_delete_soft_and_hard() {
        let (store, repository) = seeded();
        store.delete("users", &json!(2)).unwrap();
        assert_eq!(repository.get(&repository.query()).unwrap().len(), 1);
        assert_eq!(store.count("users"), 3);

        store.delete("companies", &json!(1)).unwrap();
        assert_eq!(store.count("companies"), 0);
        assert!(store.delete("companies", &json!(1)).is_err());
    }

    #[test]
    fn test_count_matching_ignores_row() {
        let (_, repository) = seeded();
        assert_eq!(
            repository.count_matching("users", "name", &json!("Ada"), None).unwrap(),
            1
        );
        assert_eq!(
            repository
                .count_matching("users", "name", &json!("Ada"), Some(("id", &json!(1))))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let (store, _) = seeded();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        store.save_json(&path).unwrap();

        let restored = MemoryStore::new();
        restored.load_json(&path).unwrap();
        assert_eq!(restored.table_names(), vec!["companies", "users"]);
        assert_eq!(restored.count("users"), 3);

        let next = restored.insert("users", Attributes::new());
        assert_eq!(next, json!(4));
    }

    #[test]
    fn test_load_json_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = MemoryStore::new().load_json(&path).unwrap_err();
        assert!(matches!(err, AdminError::FileRead { .. }));
    }
}
