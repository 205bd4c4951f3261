//! Rule-based validator
//!
//! Implements `ValidationFactory` for the `name[:args]` rule grammar used by
//! form elements and configuration files. Rules for a field run in order;
//! an empty optional field skips every rule except `required`.

use indexmap::IndexMap;
use perch_core::types::display_value;
use perch_core::{
    AdminError, AdminResult, PresenceVerifier, ValidationErrors, ValidationFactory,
    ValidationInput, Validator, Value,
};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

static URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^\s/?#]+[^\s]*$").ok());

// ============================================================================
// Rule
// ============================================================================

/// A single parsed validation rule
#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    Min(f64),
    Max(f64),
    Numeric,
    Integer,
    Boolean,
    Email,
    Url,
    Uuid,
    In(Vec<String>),
    Regex(Regex),
    /// Value must not exist yet in the column (defaults to the field name)
    Unique(Option<String>),
}

impl Rule {
    /// Parse a rule from its `name[:args]` form
    pub fn parse(rule: &str) -> AdminResult<Self> {
        let rule = rule.trim();
        let (name, args) = match rule.split_once(':') {
            Some((name, args)) => (name, Some(args)),
            None => (rule, None),
        };
        let invalid = || AdminError::InvalidRule(rule.to_string());

        let parsed = match (name, args) {
            ("required", None) => Rule::Required,
            ("numeric", None) => Rule::Numeric,
            ("integer", None) => Rule::Integer,
            ("boolean", None) => Rule::Boolean,
            ("email", None) => Rule::Email,
            ("url", None) => Rule::Url,
            ("uuid", None) => Rule::Uuid,
            ("min", Some(n)) => Rule::Min(n.trim().parse().map_err(|_| invalid())?),
            ("max", Some(n)) => Rule::Max(n.trim().parse().map_err(|_| invalid())?),
            ("in", Some(list)) => Rule::In(list.split(',').map(|s| s.trim().to_string()).collect()),
            ("regex", Some(pattern)) => {
                let pattern = pattern
                    .strip_prefix('/')
                    .and_then(|p| p.strip_suffix('/'))
                    .unwrap_or(pattern);
                Rule::Regex(Regex::new(pattern).map_err(|_| invalid())?)
            }
            ("unique", None) => Rule::Unique(None),
            ("unique", Some(column)) if !column.trim().is_empty() => {
                Rule::Unique(Some(column.trim().to_string()))
            }
            _ => return Err(invalid()),
        };
        Ok(parsed)
    }

    /// Rule name, as used in `field.rule` message keys
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::Numeric => "numeric",
            Rule::Integer => "integer",
            Rule::Boolean => "boolean",
            Rule::Email => "email",
            Rule::Url => "url",
            Rule::Uuid => "uuid",
            Rule::In(_) => "in",
            Rule::Regex(_) => "regex",
            Rule::Unique(_) => "unique",
        }
    }
}

/// Parse a list of rules, failing on the first invalid one
pub fn parse_rules<S: AsRef<str>>(rules: &[S]) -> AdminResult<Vec<Rule>> {
    rules.iter().map(|r| Rule::parse(r.as_ref())).collect()
}

// ============================================================================
// RuleValidator
// ============================================================================

/// Validator produced by [`RuleValidatorFactory`]
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    errors: ValidationErrors,
}

impl Validator for RuleValidator {
    fn fails(&self) -> bool {
        !self.errors.is_empty()
    }

    fn errors(&self) -> &ValidationErrors {
        &self.errors
    }
}

/// Builds [`RuleValidator`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidatorFactory;

impl RuleValidatorFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ValidationFactory for RuleValidatorFactory {
    fn make(
        &self,
        input: ValidationInput,
        verifier: Option<&dyn PresenceVerifier>,
    ) -> AdminResult<Box<dyn Validator>> {
        let mut errors = ValidationErrors::new();

        for (field, rules) in &input.rules {
            let rules = parse_rules(rules)?;
            let value = input.data.get(field).unwrap_or(&Value::Null);
            let numeric = rules
                .iter()
                .any(|r| matches!(r, Rule::Numeric | Rule::Integer));

            if is_empty(value) {
                if rules.iter().any(|r| matches!(r, Rule::Required)) {
                    errors.add(field, message(&input, field, &Rule::Required, numeric));
                }
                continue;
            }

            for rule in &rules {
                if !check(rule, field, value, numeric, &input, verifier)? {
                    errors.add(field, message(&input, field, rule, numeric));
                }
            }
        }

        if !errors.is_empty() {
            tracing::debug!("Validation failed for {} field(s)", errors.len());
        }
        Ok(Box::new(RuleValidator { errors }))
    }
}

// ============================================================================
// Checks
// ============================================================================

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Size compared by `min`/`max`: numeric value, item count or char length
fn size(value: &Value, numeric: bool) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) if numeric => s.trim().parse().unwrap_or(0.0),
        Value::String(s) => s.chars().count() as f64,
        Value::Array(items) => items.len() as f64,
        _ => 0.0,
    }
}

fn check(
    rule: &Rule,
    field: &str,
    value: &Value,
    numeric: bool,
    input: &ValidationInput,
    verifier: Option<&dyn PresenceVerifier>,
) -> AdminResult<bool> {
    let text = display_value(value);
    let passed = match rule {
        Rule::Required => true,
        Rule::Min(min) => size(value, numeric) >= *min,
        Rule::Max(max) => size(value, numeric) <= *max,
        Rule::Numeric => as_number(value).is_some(),
        Rule::Integer => match value {
            Value::Number(n) => n.is_i64() || n.is_u64(),
            Value::String(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        },
        Rule::Boolean => {
            value.is_boolean() || matches!(text.as_str(), "0" | "1" | "true" | "false")
        }
        Rule::Email => EMAIL.as_ref().is_some_and(|re| re.is_match(&text)),
        Rule::Url => URL.as_ref().is_some_and(|re| re.is_match(&text)),
        Rule::Uuid => uuid::Uuid::parse_str(text.trim()).is_ok(),
        Rule::In(options) => options.iter().any(|o| *o == text),
        Rule::Regex(re) => re.is_match(&text),
        Rule::Unique(column) => {
            let Some(verifier) = verifier else {
                tracing::warn!("No presence verifier; skipping unique check on '{}'", field);
                return Ok(true);
            };
            let column = column.as_deref().unwrap_or(field);
            let ignore = input.ignore.as_ref().map(|(k, v)| (k.as_str(), v));
            verifier.count_matching(&input.table, column, value, ignore)? == 0
        }
    };
    Ok(passed)
}

// ============================================================================
// Messages
// ============================================================================

fn default_message(rule: &Rule, numeric: bool) -> String {
    match rule {
        Rule::Required => "The :attribute field is required.".to_string(),
        Rule::Min(min) if numeric => format!("The :attribute must be at least {}.", format_number(*min)),
        Rule::Min(min) => format!(
            "The :attribute must be at least {} characters.",
            format_number(*min)
        ),
        Rule::Max(max) if numeric => format!(
            "The :attribute may not be greater than {}.",
            format_number(*max)
        ),
        Rule::Max(max) => format!(
            "The :attribute may not be greater than {} characters.",
            format_number(*max)
        ),
        Rule::Numeric => "The :attribute must be a number.".to_string(),
        Rule::Integer => "The :attribute must be an integer.".to_string(),
        Rule::Boolean => "The :attribute field must be true or false.".to_string(),
        Rule::Email => "The :attribute must be a valid email address.".to_string(),
        Rule::Url | Rule::Regex(_) => "The :attribute format is invalid.".to_string(),
        Rule::Uuid => "The :attribute must be a valid UUID.".to_string(),
        Rule::In(_) => "The selected :attribute is invalid.".to_string(),
        Rule::Unique(_) => "The :attribute has already been taken.".to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Human label of a field: custom label, or the name with spaces
fn attribute_label(labels: &IndexMap<String, String>, field: &str) -> String {
    labels
        .get(field)
        .cloned()
        .unwrap_or_else(|| field.replace(['_', '.'], " "))
}

fn message(input: &ValidationInput, field: &str, rule: &Rule, numeric: bool) -> String {
    let template = input
        .messages
        .get(&format!("{}.{}", field, rule.name()))
        .cloned()
        .unwrap_or_else(|| default_message(rule, numeric));
    template.replace(":attribute", &attribute_label(&input.labels, field))
}

// ============================================================================
// Tests
// ============================================================================
