//! Per-column search inputs under the table

use crate::extension::{DisplayExtension, ExtensionContext};
use perch_core::{AdminResult, DisplayId, Operator, Query, Value};
use perch_model::ModelConfiguration;
use serde_json::json;
use std::any::Any;
use std::rc::Rc;

/// Per-column search input, read from `filter[<column>]`
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    column: String,
    operator: Operator,
    placeholder: Option<String>,
    value: Option<String>,
    configuration: Option<Rc<ModelConfiguration>>,
}

impl ColumnFilter {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: Operator::Like,
            placeholder: None,
            value: None,
            configuration: None,
        }
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Request key of the filter input
    pub fn request_key(&self) -> String {
        format!("filter[{}]", self.column)
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_model_configuration(&mut self, configuration: Rc<ModelConfiguration>) {
        self.configuration = Some(configuration);
    }

    pub fn to_value(&self) -> Value {
        json!({
            "column": self.column,
            "name": self.request_key(),
            "placeholder": self.placeholder.clone().unwrap_or_default(),
            "value": self.value.clone().unwrap_or_default(),
            "action": self.configuration.as_ref().map(|c| c.display_url()),
        })
    }
}

/// Column search inputs, placed into `table.footer`
#[derive(Debug)]
pub struct ColumnFilters {
    owner: Option<DisplayId>,
    filters: Vec<ColumnFilter>,
}

impl ColumnFilters {
    pub fn new() -> Self {
        Self {
            owner: None,
            filters: Vec::new(),
        }
    }

    /// Replace every column filter
    pub fn set(&mut self, filters: Vec<ColumnFilter>) -> &mut Self {
        self.filters = filters;
        self
    }

    pub fn push(&mut self, filter: ColumnFilter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn all(&self) -> &[ColumnFilter] {
        &self.filters
    }

    pub fn all_mut(&mut self) -> &mut [ColumnFilter] {
        &mut self.filters
    }
}

impl Default for ColumnFilters {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayExtension for ColumnFilters {
    fn set_owner(&mut self, owner: DisplayId) {
        self.owner = Some(owner);
    }

    fn owner(&self) -> Option<DisplayId> {
        self.owner
    }

    fn initialize(&mut self, ctx: &ExtensionContext<'_>) -> AdminResult<()> {
        for filter in &mut self.filters {
            filter.value = ctx.request.filled(&filter.request_key());
        }
        Ok(())
    }

    fn modify_query(&self, query: &mut Query) {
        for filter in &self.filters {
            if let Some(value) = &filter.value {
                query.where_op(&filter.column, filter.operator, value.as_str());
            }
        }
    }

    fn placement(&self) -> Option<&str> {
        Some("table.footer")
    }

    fn view(&self) -> Option<&str> {
        Some("display.extensions.column_filters")
    }

    fn to_value(&self) -> Value {
        json!({
            "filters": self.filters.iter().map(ColumnFilter::to_value).collect::<Vec<_>>(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
