//! Input fields

use super::{FormElement, ValidationSet};
use heck::ToTitleCase;
use indexmap::IndexMap;
use perch_core::{
    AdminError, AdminResult, LoadedRelation, Record, Request, SharedRecord, Value,
};
use perch_model::ModelDefinition;
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// FieldKind
// ============================================================================

/// Input control of a [`Field`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Checkbox,
    Select,
    Hidden,
    Upload,
}

impl FieldKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Some(FieldKind::Text),
            "textarea" => Some(FieldKind::Textarea),
            "number" => Some(FieldKind::Number),
            "checkbox" => Some(FieldKind::Checkbox),
            "select" => Some(FieldKind::Select),
            "hidden" => Some(FieldKind::Hidden),
            "upload" => Some(FieldKind::Upload),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Select => "select",
            FieldKind::Hidden => "hidden",
            FieldKind::Upload => "upload",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Field
// ============================================================================

/// A named input bound to a record attribute or a `relation.attribute` path
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    name: String,
    label: Option<String>,
    rules: Vec<String>,
    messages: IndexMap<String, String>,
    options: IndexMap<String, String>,
    default: Option<Value>,
    help: Option<String>,
    model: Option<SharedRecord>,
}

impl Field {
    pub fn new(kind: FieldKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            label: None,
            rules: Vec::new(),
            messages: IndexMap::new(),
            options: IndexMap::new(),
            default: None,
            help: None,
            model: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(FieldKind::Text, name)
    }

    pub fn textarea(name: impl Into<String>) -> Self {
        Self::new(FieldKind::Textarea, name)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(FieldKind::Number, name)
    }

    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::new(FieldKind::Checkbox, name)
    }

    pub fn select(name: impl Into<String>) -> Self {
        Self::new(FieldKind::Select, name)
    }

    pub fn hidden(name: impl Into<String>) -> Self {
        Self::new(FieldKind::Hidden, name)
    }

    pub fn upload(name: impl Into<String>) -> Self {
        Self::new(FieldKind::Upload, name)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add rules in the `name[:args]` grammar
    pub fn with_rules<S: AsRef<str>>(mut self, rules: &[S]) -> Self {
        self.rules
            .extend(rules.iter().map(|r| r.as_ref().to_string()));
        self
    }

    pub fn required(self) -> Self {
        self.with_rules(&["required"])
    }

    /// Custom message for one rule of this field
    pub fn with_message(mut self, rule: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(rule.into(), message.into());
        self
    }

    pub fn with_option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.insert(value.into(), label.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_kind(&self) -> FieldKind {
        self.kind
    }

    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.name.replace('.', " ").to_title_case())
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    fn is_required(&self) -> bool {
        self.rules.iter().any(|r| r == "required")
    }

    /// Value shown in the control: the bound attribute, else the default
    pub fn value(&self) -> Value {
        self.model
            .as_ref()
            .and_then(|m| m.borrow().get_path(&self.name))
            .filter(|v| !v.is_null())
            .or_else(|| self.default.clone())
            .unwrap_or(Value::Null)
    }

    /// Submitted value, converted for the control kind
    fn request_value(&self, request: &Request) -> Option<Value> {
        match self.kind {
            FieldKind::Checkbox => Some(Value::Bool(request.get(&self.name).is_some_and(truthy))),
            FieldKind::Number => request.get(&self.name).map(to_number),
            _ => request.get(&self.name).cloned(),
        }
    }
}

impl FormElement for Field {
    fn kind(&self) -> &'static str {
        self.kind.name()
    }

    fn set_model(&mut self, model: SharedRecord) {
        self.model = Some(model);
    }

    fn model(&self) -> Option<&SharedRecord> {
        self.model.as_ref()
    }

    fn validation(&self) -> ValidationSet {
        let mut set = ValidationSet::default();
        if !self.rules.is_empty() {
            set.rules.insert(self.name.clone(), self.rules.clone());
        }
        for (rule, message) in &self.messages {
            set.messages
                .insert(format!("{}.{}", self.name, rule), message.clone());
        }
        set.labels.insert(self.name.clone(), self.label());
        set
    }

    /// Absent input leaves the attribute untouched, except for checkboxes
    /// which submit nothing when unchecked
    fn save(&mut self, request: &Request, definition: &ModelDefinition) -> AdminResult<()> {
        let Some(value) = self.request_value(request) else {
            return Ok(());
        };
        let model = self.model.as_ref().ok_or_else(|| {
            AdminError::with_context(format!("field '{}'", self.name), "no record bound to element")
        })?;
        assign(&mut model.borrow_mut(), definition, &self.name, value)
    }

    fn is_upload(&self) -> bool {
        self.kind == FieldKind::Upload
    }

    fn to_value(&self) -> Value {
        let options: Vec<Value> = self
            .options
            .iter()
            .map(|(value, label)| json!({ "value": value, "label": label }))
            .collect();
        let value = self.value();

        json!({
            "kind": self.kind,
            "name": self.name,
            "label": self.label(),
            "value": value,
            "checked": truthy(&value),
            "required": self.is_required(),
            "help": self.help,
            "options": options,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(s.trim().to_lowercase().as_str(), "" | "0" | "false" | "off"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn to_number(value: &Value) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };
    let s = s.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::from(n);
    }
    s.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or_else(|| Value::String(s.to_string()), Value::Number)
}

/// Write a value to `attribute` or `relation.attribute`, attaching a blank
/// related record when the relation is not loaded yet
pub(crate) fn assign(
    record: &mut Record,
    definition: &ModelDefinition,
    path: &str,
    value: Value,
) -> AdminResult<()> {
    let Some((relation_name, attribute)) = path.split_once('.') else {
        record.set(path, value);
        return Ok(());
    };

    let relation = definition.relation(relation_name).ok_or_else(|| {
        AdminError::relation(relation_name, format!("not defined on '{}'", definition.table))
    })?;

    if !record
        .relation(relation_name)
        .is_some_and(LoadedRelation::is_loaded)
    {
        record.set_relation(relation_name, relation.load(vec![relation.new_related()]));
    }

    match record.relation_mut(relation_name) {
        Some(LoadedRelation::BelongsTo {
            related: Some(related),
            ..
        })
        | Some(LoadedRelation::HasOne {
            related: Some(related),
            ..
        }) => {
            related.set(attribute, value);
            Ok(())
        }
        _ => Err(AdminError::relation(
            relation_name,
            "nested values need a single related record",
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
