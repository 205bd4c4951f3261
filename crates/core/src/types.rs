//! Core types used throughout Perch Admin
//!
//! Identifiers, HTML attribute bags, request input and template placement
//! sections shared by displays, forms and their collaborators.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// Unique Identifiers
// ============================================================================

/// Identity of a display instance; extensions record their owner with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayId(pub uuid::Uuid);

impl DisplayId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for DisplayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a model configuration instance
///
/// Two configurations with the same alias are still distinct owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigurationId(pub uuid::Uuid);

impl ConfigurationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConfigurationId {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HtmlAttributes
// ============================================================================

/// Ordered bag of HTML attributes
///
/// `class` values accumulate as unique tokens; every other attribute is
/// replaced on set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HtmlAttributes {
    attributes: IndexMap<String, String>,
}

impl HtmlAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute (class tokens are merged)
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();

        if name == "class" {
            let entry = self.attributes.entry(name).or_default();
            for token in value.split_whitespace() {
                if !entry.split_whitespace().any(|existing| existing == token) {
                    if !entry.is_empty() {
                        entry.push(' ');
                    }
                    entry.push_str(token);
                }
            }
        } else {
            self.attributes.insert(name, value);
        }

        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Render as `name="value"` pairs separated by spaces
    pub fn to_html_string(&self) -> String {
        self.attributes
            .iter()
            .map(|(name, value)| format!("{}=\"{}\"", name, escape_html(value)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for HtmlAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html_string())
    }
}

// ============================================================================
// Request
// ============================================================================

/// Request input: ordered key/value access to query and form parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    input: IndexMap<String, Value>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request from string pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            input: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        }
    }

    /// Builder: add an input value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.input.insert(key.into(), value.into());
    }

    /// All input values
    pub fn all(&self) -> &IndexMap<String, Value> {
        &self.input
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.input.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.input.contains_key(key)
    }

    /// Input as a string, ignoring null values
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.input.get(key)? {
            Value::Null => None,
            value => Some(display_value(value)),
        }
    }

    /// Input as a positive integer (strings are parsed)
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        match self.input.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Input as a non-empty string
    pub fn filled(&self, key: &str) -> Option<String> {
        self.get_str(key).filter(|s| !s.trim().is_empty())
    }
}

// ============================================================================
// Placement Sections
// ============================================================================

/// A fragment rendered by a placeable extension, destined for a named slot
/// of the page template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Injection {
    pub placement: String,
    pub html: String,
}

impl Injection {
    pub fn new(placement: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            placement: placement.into(),
            html: html.into(),
        }
    }
}

/// Placement slots filled while rendering a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    slots: IndexMap<String, Vec<String>>,
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_injections(injections: impl IntoIterator<Item = Injection>) -> Self {
        let mut sections = Self::new();
        for injection in injections {
            sections.inject(injection.placement, injection.html);
        }
        sections
    }

    /// Append a fragment to a slot
    pub fn inject(&mut self, placement: impl Into<String>, html: impl Into<String>) {
        self.slots
            .entry(placement.into())
            .or_default()
            .push(html.into());
    }

    /// Contents of a slot (empty when nothing was injected)
    pub fn yield_slot(&self, placement: &str) -> String {
        self.slots
            .get(placement)
            .map(|fragments| fragments.concat())
            .unwrap_or_default()
    }

    pub fn placements(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Escape text for inclusion in HTML
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Human-facing string form of a value (strings unquoted, null empty)
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Encode parameters as a URL query string
pub fn encode_query<'a>(params: impl IntoIterator<Item = (&'a String, &'a Value)>) -> String {
    params
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(&display_value(v))))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
