//! Query descriptions and result sets
//!
//! A `Query` is plain data: display extensions modify it, repositories
//! execute it. Results come back as a flat list or a `Page`.

use crate::record::{Attributes, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::rc::Rc;

// ============================================================================
// Conditions
// ============================================================================

/// Comparison operator of a where clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive substring match; `%` wildcards are ignored
    Like,
    /// Value must be an array containing the attribute
    In,
}

impl Operator {
    /// Parse the short operator names used in configuration files
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "=" | "eq" => Some(Operator::Eq),
            "!=" | "<>" | "not_eq" => Some(Operator::NotEq),
            ">" | "gt" => Some(Operator::Gt),
            ">=" | "gte" => Some(Operator::Gte),
            "<" | "lt" => Some(Operator::Lt),
            "<=" | "lte" => Some(Operator::Lte),
            "like" => Some(Operator::Like),
            "in" => Some(Operator::In),
            _ => None,
        }
    }
}

/// A single where clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluate against a row's attributes (missing columns compare as null)
    pub fn matches(&self, attributes: &Attributes) -> bool {
        let actual = attributes.get(&self.column).unwrap_or(&Value::Null);
        match self.operator {
            Operator::Eq => loosely_equal(actual, &self.value),
            Operator::NotEq => !loosely_equal(actual, &self.value),
            Operator::Gt => compare_values(actual, &self.value) == Ordering::Greater,
            Operator::Gte => compare_values(actual, &self.value) != Ordering::Less,
            Operator::Lt => compare_values(actual, &self.value) == Ordering::Less,
            Operator::Lte => compare_values(actual, &self.value) != Ordering::Greater,
            Operator::Like => {
                let needle = crate::types::display_value(&self.value)
                    .trim_matches('%')
                    .to_lowercase();
                crate::types::display_value(actual)
                    .to_lowercase()
                    .contains(&needle)
            }
            Operator::In => match &self.value {
                Value::Array(items) => items.iter().any(|item| loosely_equal(actual, item)),
                other => loosely_equal(actual, other),
            },
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }
}

/// An ordering clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// A named scope invocation, resolved by the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeCall {
    pub name: String,
    pub args: Vec<Value>,
}

// ============================================================================
// Query
// ============================================================================

/// Description of a listing query against one table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    pub table: String,
    pub conditions: Vec<Condition>,
    pub orders: Vec<Order>,
    pub scopes: Vec<ScopeCall>,
    /// Relations to eager load onto each result
    pub eager: Vec<String>,
    /// Include soft-deleted rows
    pub with_trashed: bool,
}

impl Query {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn where_eq(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.where_op(column, Operator::Eq, value)
    }

    pub fn where_op(
        &mut self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.conditions.push(Condition::new(column, operator, value));
        self
    }

    pub fn order_by(&mut self, column: impl Into<String>, direction: Direction) -> &mut Self {
        self.orders.push(Order {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn scope(&mut self, name: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.scopes.push(ScopeCall {
            name: name.into(),
            args,
        });
        self
    }

    /// Add relations to eager load (duplicates are ignored)
    pub fn with<S: AsRef<str>>(&mut self, relations: &[S]) -> &mut Self {
        for relation in relations {
            let relation = relation.as_ref();
            if !self.eager.iter().any(|r| r == relation) {
                self.eager.push(relation.to_string());
            }
        }
        self
    }

    pub fn with_trashed(&mut self) -> &mut Self {
        self.with_trashed = true;
        self
    }

    /// Whether every condition matches the row
    pub fn matches(&self, attributes: &Attributes) -> bool {
        self.conditions.iter().all(|c| c.matches(attributes))
    }

    /// Ordering of two rows according to the order clauses
    pub fn compare(&self, a: &Attributes, b: &Attributes) -> Ordering {
        for order in &self.orders {
            let left = a.get(&order.column).unwrap_or(&Value::Null);
            let right = b.get(&order.column).unwrap_or(&Value::Null);
            let ordering = match order.direction {
                Direction::Asc => compare_values(left, right),
                Direction::Desc => compare_values(right, left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

// ============================================================================
// Results
// ============================================================================

/// One page of a paginated result
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Rc<Record>>,
    pub total: usize,
    pub per_page: usize,
    pub current_page: usize,
}

impl Page {
    pub fn last_page(&self) -> usize {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }

    /// Pagination metadata for templates
    pub fn meta(&self, page_name: &str) -> Value {
        json!({
            "total": self.total,
            "per_page": self.per_page,
            "current_page": self.current_page,
            "last_page": self.last_page(),
            "page_name": page_name,
        })
    }
}

/// Result of a display query
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    Paginated(Page),
    All(Vec<Rc<Record>>),
}

impl Collection {
    pub fn items(&self) -> &[Rc<Record>] {
        match self {
            Collection::Paginated(page) => &page.items,
            Collection::All(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn page(&self) -> Option<&Page> {
        match self {
            Collection::Paginated(page) => Some(page),
            Collection::All(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.items().iter().map(|r| r.to_value()).collect())
    }
}

// ============================================================================
// Value comparison
// ============================================================================

/// Total ordering over JSON values: null < bool < number < string < other
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::String(y)) | (Value::String(y), Value::Number(x))
            if y.trim().parse::<f64>().is_ok() =>
        {
            let n = x.as_f64().unwrap_or(0.0);
            let s = y.trim().parse::<f64>().unwrap_or(0.0);
            let ordering = n.partial_cmp(&s).unwrap_or(Ordering::Equal);
            if matches!(a, Value::Number(_)) {
                ordering
            } else {
                ordering.reverse()
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Equality that treats `"4"` and `4` as the same key
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            compare_values(a, b) == Ordering::Equal && rank_is_numeric(a, b)
        }
        _ => a == b,
    }
}

fn rank_is_numeric(a: &Value, b: &Value) -> bool {
    let s = match (a, b) {
        (Value::String(s), _) | (_, Value::String(s)) => s,
        _ => return true,
    };
    s.trim().parse::<f64>().is_ok()
}

// ============================================================================
// Tests
// ============================================================================
