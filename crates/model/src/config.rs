//! Declarative admin configuration
//!
//! The admin is described by a TOML document: global settings plus one
//! `[[models]]` table per managed entity with its relations, listing columns,
//! form fields, filters and scopes. Loading checks the whole document and
//! reports every problem at once.

use crate::definition::ModelDefinition;
use crate::relation::RelationDefinition;
use crate::validation::Rule;
use indexmap::IndexMap;
use perch_core::{AdminError, AdminResult, Operator, RelationKind, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Column kinds understood by the listing
pub const COLUMN_KINDS: &[&str] = &["text", "link", "control"];

/// Field kinds understood by the form
pub const FIELD_KINDS: &[&str] = &[
    "text", "textarea", "number", "checkbox", "select", "hidden", "upload",
];

// ============================================================================
// Document
// ============================================================================

/// Root of an admin configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub admin: AdminSettings,

    #[serde(default)]
    pub models: Vec<ModelSection>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl AdminConfig {
    pub fn model(&self, alias: &str) -> Option<&ModelSection> {
        self.models.iter().find(|m| m.alias == alias)
    }
}

/// `[admin]` settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSettings {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,

    /// Default page size of listings (0 disables pagination)
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    /// JSON data file, relative to the configuration file
    #[serde(default)]
    pub data: Option<PathBuf>,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            title: default_title(),
            url_prefix: default_url_prefix(),
            per_page: default_per_page(),
            data: None,
        }
    }
}

fn default_title() -> String {
    "Perch".to_string()
}

fn default_url_prefix() -> String {
    "/admin".to_string()
}

fn default_per_page() -> usize {
    25
}

fn default_true() -> bool {
    true
}

fn default_key() -> String {
    "id".to_string()
}

fn default_operator() -> String {
    "=".to_string()
}

// ============================================================================
// Model sections
// ============================================================================

/// One `[[models]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    pub alias: String,
    pub table: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default = "default_key")]
    pub key: String,

    #[serde(default)]
    pub timestamps: bool,

    #[serde(default)]
    pub soft_deletes: bool,

    #[serde(default = "default_true")]
    pub restorable: bool,

    #[serde(default = "default_true")]
    pub creatable: bool,

    #[serde(default = "default_true")]
    pub editable: bool,

    #[serde(default = "default_true")]
    pub deletable: bool,

    /// Relations eager loaded by the listing
    #[serde(default)]
    pub with: Vec<String>,

    /// Overrides `[admin] per_page`
    #[serde(default)]
    pub per_page: Option<usize>,

    #[serde(default)]
    pub relations: Vec<RelationSection>,

    #[serde(default)]
    pub columns: Vec<ColumnSection>,

    #[serde(default)]
    pub fields: Vec<FieldSection>,

    #[serde(default)]
    pub filters: Vec<FilterSection>,

    #[serde(default)]
    pub scopes: Vec<ScopeSection>,
}

impl ModelSection {
    /// Storage definition of the model
    pub fn definition(&self) -> ModelDefinition {
        let mut definition = ModelDefinition::new(&self.table).with_key_name(&self.key);
        if self.timestamps {
            definition = definition.with_timestamps();
        }
        if self.soft_deletes {
            definition = definition.with_soft_deletes();
        }
        self.relations
            .iter()
            .fold(definition, |def, rel| def.with_relation(rel.definition()))
    }
}

/// `[[models.relations]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSection {
    pub name: String,
    pub kind: RelationKind,
    pub table: String,

    #[serde(default)]
    pub foreign_key: Option<String>,

    /// Owner key (belongs-to) or local key (has-one / has-many)
    #[serde(default)]
    pub reference_key: Option<String>,

    /// Key column of the related table
    #[serde(default)]
    pub key: Option<String>,
}

impl RelationSection {
    pub fn definition(&self) -> RelationDefinition {
        let fallback_fk = || format!("{}_id", heck::ToSnakeCase::to_snake_case(self.name.as_str()));
        let mut relation = match self.kind {
            RelationKind::BelongsTo => RelationDefinition::belongs_to(&self.name, &self.table),
            RelationKind::HasOne => RelationDefinition::has_one(
                &self.name,
                &self.table,
                self.foreign_key.clone().unwrap_or_else(fallback_fk),
            ),
            RelationKind::HasMany => RelationDefinition::has_many(
                &self.name,
                &self.table,
                self.foreign_key.clone().unwrap_or_else(fallback_fk),
            ),
        };
        if let Some(fk) = &self.foreign_key {
            relation = relation.with_foreign_key(fk);
        }
        if let Some(reference) = &self.reference_key {
            relation = relation.with_reference_key(reference);
        }
        if let Some(key) = &self.key {
            relation = relation.with_related_key_name(key);
        }
        relation
    }
}

/// `[[models.columns]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSection {
    /// One of [`COLUMN_KINDS`]
    pub kind: String,

    /// Attribute or dotted relation path
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub orderable: bool,

    #[serde(default)]
    pub width: Option<String>,

    /// Column rendered after this one in the same cell
    #[serde(default)]
    pub append: Option<Box<ColumnSection>>,
}

/// `[[models.fields]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSection {
    /// One of [`FIELD_KINDS`]
    pub kind: String,
    pub name: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub rules: Vec<String>,

    /// Custom messages keyed by rule name
    #[serde(default)]
    pub messages: IndexMap<String, String>,

    /// Select options (value to label)
    #[serde(default)]
    pub options: IndexMap<String, String>,

    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub help: Option<String>,
}

/// `[[models.filters]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSection {
    /// Request key and column filtered on
    pub field: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default = "default_operator")]
    pub operator: String,
}

/// `[[models.scopes]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSection {
    pub name: String,
    pub column: String,

    #[serde(default = "default_operator")]
    pub operator: String,

    /// Compared value when the scope is applied without arguments
    #[serde(default)]
    pub value: Option<Value>,
}

// ============================================================================
// ConfigReport
// ============================================================================

/// A problem found in a configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Location (e.g., "models.users.fields.email")
    pub path: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.path, self.message)
    }
}

/// Outcome of checking a configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigReport {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ConfigReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigIssue::new(path, message));
    }

    pub fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigIssue::new(path, message));
    }

    /// Convert to a result (fails if any errors)
    pub fn into_result(self) -> AdminResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            let msg = self
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            Err(AdminError::invalid_config(msg))
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load, version-check and validate a configuration file
pub fn load_config(path: impl AsRef<Path>) -> AdminResult<AdminConfig> {
    checked(read_config(path)?)
}

/// Load and version-check a configuration file without validating it
pub fn read_config(path: impl AsRef<Path>) -> AdminResult<AdminConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AdminError::MissingConfig(path.display().to_string()));
    }

    let text = std::fs::read_to_string(path).map_err(|e| AdminError::FileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let config = parse_document(&text)?;
    tracing::info!(
        "Loaded configuration {} ({} model(s))",
        path.display(),
        config.models.len()
    );
    Ok(config)
}

/// Parse and validate a configuration document
pub fn parse_config(text: &str) -> AdminResult<AdminConfig> {
    checked(parse_document(text)?)
}

fn parse_document(text: &str) -> AdminResult<AdminConfig> {
    let config: AdminConfig = toml::from_str(text)?;
    if config.schema_version > SCHEMA_VERSION {
        return Err(AdminError::SchemaVersionMismatch {
            expected: SCHEMA_VERSION,
            found: config.schema_version,
        });
    }
    Ok(config)
}

fn checked(config: AdminConfig) -> AdminResult<AdminConfig> {
    let report = check_config(&config);
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
    report.into_result()?;
    Ok(config)
}

/// Check a configuration document without failing
pub fn check_config(config: &AdminConfig) -> ConfigReport {
    let mut report = ConfigReport::default();
    let mut aliases = HashSet::new();

    if config.admin.url_prefix.is_empty() || !config.admin.url_prefix.starts_with('/') {
        report.error("admin.url_prefix", "URL prefix must start with '/'");
    }

    for (index, model) in config.models.iter().enumerate() {
        let path = if model.alias.is_empty() {
            format!("models[{}]", index)
        } else {
            format!("models.{}", model.alias)
        };

        if model.alias.is_empty() {
            report.error(&path, "Model alias cannot be empty");
        } else if !aliases.insert(model.alias.as_str()) {
            report.error(&path, format!("Duplicate model alias '{}'", model.alias));
        }

        if model.table.is_empty() {
            report.error(&path, "Model table cannot be empty");
        }

        check_model(model, &path, &mut report);
    }

    if config.models.is_empty() {
        report.warning("models", "No models configured");
    }

    report
}

fn check_model(model: &ModelSection, path: &str, report: &mut ConfigReport) {
    let relations: HashSet<&str> = model.relations.iter().map(|r| r.name.as_str()).collect();

    for name in &model.with {
        let head = name.split('.').next().unwrap_or(name);
        if !relations.contains(head) {
            report.error(
                format!("{}.with", path),
                format!("Eager relation '{}' is not defined", name),
            );
        }
    }

    for relation in &model.relations {
        if relation.table.is_empty() {
            report.error(
                format!("{}.relations.{}", path, relation.name),
                "Relation table cannot be empty",
            );
        }
    }

    if model.columns.is_empty() {
        report.warning(format!("{}.columns", path), "No columns configured");
    }
    for (index, column) in model.columns.iter().enumerate() {
        check_column(column, &format!("{}.columns[{}]", path, index), &relations, report);
    }

    let mut fields = HashSet::new();
    for field in &model.fields {
        let field_path = format!("{}.fields.{}", path, field.name);
        if field.name.is_empty() {
            report.error(&field_path, "Field name cannot be empty");
        } else if !fields.insert(field.name.as_str()) {
            report.error(&field_path, format!("Duplicate field '{}'", field.name));
        }
        if !FIELD_KINDS.contains(&field.kind.as_str()) {
            report.error(&field_path, format!("Unknown field kind '{}'", field.kind));
        }
        for rule in &field.rules {
            if let Err(e) = Rule::parse(rule) {
                report.error(&field_path, e.to_string());
            }
        }
        if field.kind == "select" && field.options.is_empty() {
            report.warning(&field_path, "Select field has no options");
        }
    }

    for filter in &model.filters {
        if Operator::parse(&filter.operator).is_none() {
            report.error(
                format!("{}.filters.{}", path, filter.field),
                format!("Unknown operator '{}'", filter.operator),
            );
        }
    }

    for scope in &model.scopes {
        if Operator::parse(&scope.operator).is_none() {
            report.error(
                format!("{}.scopes.{}", path, scope.name),
                format!("Unknown operator '{}'", scope.operator),
            );
        }
    }
}

fn check_column(
    column: &ColumnSection,
    path: &str,
    relations: &HashSet<&str>,
    report: &mut ConfigReport,
) {
    if !COLUMN_KINDS.contains(&column.kind.as_str()) {
        report.error(path, format!("Unknown column kind '{}'", column.kind));
    }

    match (&column.name, column.kind.as_str()) {
        (None, "text" | "link") => report.error(path, "Column name is required"),
        (Some(name), _) => {
            if let Some((head, _)) = name.split_once('.') {
                if !relations.contains(head) {
                    report.warning(
                        path,
                        format!("Column '{}' refers to unknown relation '{}'", name, head),
                    );
                }
            }
        }
        _ => {}
    }

    if let Some(appended) = &column.append {
        check_column(appended, &format!("{}.append", path), relations, report);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
[admin]
title = "Backoffice"
per_page = 10

[[models]]
alias = "users"
table = "users"
soft_deletes = true
with = ["company"]

[[models.relations]]
name = "company"
kind = "belongs_to"
table = "companies"

[[models.columns]]
kind = "link"
name = "name"
orderable = true

[models.columns.append]
kind = "text"
name = "company.name"

[[models.fields]]
kind = "text"
name = "email"
rules = ["required", "email", "unique"]

[[models.filters]]
field = "company_id"
title = "Company"

[[models.scopes]]
name = "admins"
column = "role"
value = "admin"
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.admin.title, "Backoffice");
        assert_eq!(config.admin.url_prefix, "/admin");

        let users = config.model("users").unwrap();
        assert!(users.restorable);
        assert_eq!(users.columns[0].append.as_ref().unwrap().name.as_deref(), Some("company.name"));
        assert_eq!(users.filters[0].operator, "=");

        let definition = users.definition();
        assert!(definition.soft_deletes);
        assert_eq!(definition.relation("company").unwrap().foreign_key, "company_id");
    }

    #[test]
    fn test_reports_every_problem() {
        let config: AdminConfig = toml::from_str(
            r#"
[[models]]
alias = "users"
table = ""
with = ["team"]

[[models.columns]]
kind = "chart"

[[models.fields]]
kind = "text"
name = "age"
rules = ["between:1,2"]

[[models]]
alias = "users"
table = "people"
"#,
        )
        .unwrap();

        let report = check_config(&config);
        let messages: Vec<_> = report.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Model table cannot be empty",
                "Eager relation 'team' is not defined",
                "Unknown column kind 'chart'",
                "Invalid validation rule 'between:1,2'",
                "Duplicate model alias 'users'",
            ]
        );
        assert!(report.into_result().unwrap_err().is_fatal());
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let err = parse_config("schema_version = 99").unwrap_err();
        assert!(matches!(err, AdminError::SchemaVersionMismatch { found: 99, .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("admin.toml")).unwrap_err();
        assert!(matches!(err, AdminError::MissingConfig(_)));
    }

    #[test]
    fn test_read_skips_semantic_checks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.toml");
        std::fs::write(&path, "[[models]]\nalias = \"users\"\ntable = \"\"\n").unwrap();

        let config = read_config(&path).unwrap();
        assert_eq!(check_config(&config).errors.len(), 1);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_config(&path).unwrap().models.len(), 1);
    }
}
