//! Request-driven filters that narrow the listing and contribute to its title

use crate::extension::{DisplayExtension, ExtensionContext};
use perch_core::{AdminResult, DisplayId, Operator, Query, Request, Value};
use serde_json::json;
use std::any::Any;

/// A request-driven listing filter
pub trait Filter {
    /// Read the filter's value from the request
    fn initialize(&mut self, request: &Request) -> AdminResult<()>;

    fn is_active(&self) -> bool;

    /// Title fragment while active
    fn title(&self) -> Option<String>;

    fn apply(&self, query: &mut Query);

    fn to_value(&self) -> Value;
}

// ============================================================================
// FieldFilter
// ============================================================================

/// Filters a column by the request value under `field`
///
/// The title may contain `:value`, replaced by the active value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    field: String,
    column: String,
    operator: Operator,
    title: Option<String>,
    value: Option<String>,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            column: field.clone(),
            field,
            operator: Operator::Eq,
            title: None,
            value: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl Filter for FieldFilter {
    fn initialize(&mut self, request: &Request) -> AdminResult<()> {
        self.value = request.filled(&self.field);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.value.is_some()
    }

    fn title(&self) -> Option<String> {
        let value = self.value.as_deref()?;
        self.title.as_ref().map(|t| t.replace(":value", value))
    }

    fn apply(&self, query: &mut Query) {
        if let Some(value) = &self.value {
            query.where_op(&self.column, self.operator, value.as_str());
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "field": self.field,
            "title": self.title,
            "value": self.value,
            "active": self.is_active(),
        })
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Listing filters; active filter titles extend the display title
#[derive(Default)]
pub struct Filters {
    owner: Option<DisplayId>,
    filters: Vec<Box<dyn Filter>>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every filter
    pub fn set(&mut self, filters: Vec<Box<dyn Filter>>) -> &mut Self {
        self.filters = filters;
        self
    }

    pub fn push<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn all(&self) -> &[Box<dyn Filter>] {
        &self.filters
    }

    pub fn active(&self) -> impl Iterator<Item = &dyn Filter> {
        self.filters.iter().map(|f| f.as_ref()).filter(|f| f.is_active())
    }
}

impl std::fmt::Debug for Filters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filters")
            .field("owner", &self.owner)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl DisplayExtension for Filters {
    fn set_owner(&mut self, owner: DisplayId) {
        self.owner = Some(owner);
    }

    fn owner(&self) -> Option<DisplayId> {
        self.owner
    }

    fn initialize(&mut self, ctx: &ExtensionContext<'_>) -> AdminResult<()> {
        for filter in &mut self.filters {
            filter.initialize(ctx.request)?;
        }
        Ok(())
    }

    fn title(&self) -> Option<String> {
        let titles: Vec<String> = self.active().filter_map(|f| f.title()).collect();
        (!titles.is_empty()).then(|| titles.join(" | "))
    }

    fn modify_query(&self, query: &mut Query) {
        for filter in self.active() {
            filter.apply(query);
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "filters": self.filters.iter().map(|f| f.to_value()).collect::<Vec<_>>(),
            "active": self.active().count(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
