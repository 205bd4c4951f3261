//! Table columns
//!
//! A column renders one cell of the current row. Columns form a singly
//! linked append chain: the appended column is rendered into the same cell
//! and receives the same row and model configuration.

mod control;
mod custom;
mod link;
mod text;

pub use control::Control;
pub use custom::Custom;
pub use link::Link;
pub use text::Text;

use perch_core::{AdminError, AdminResult, HtmlAttributes, Record, Value};
use perch_model::ModelConfiguration;
use serde_json::{Map, json};
use std::rc::Rc;

// ============================================================================
// TableHeader
// ============================================================================

/// Header cell of a column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableHeader {
    pub title: Option<String>,
    pub orderable: bool,
}

impl TableHeader {
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            orderable: false,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "title": self.title.clone().unwrap_or_default(),
            "orderable": self.orderable,
        })
    }
}

// ============================================================================
// ColumnBase
// ============================================================================

/// State shared by every column kind
#[derive(Default)]
pub struct ColumnBase {
    pub header: TableHeader,
    pub width: Option<String>,
    pub view: Option<String>,
    pub attributes: HtmlAttributes,
    model: Option<Rc<Record>>,
    configuration: Option<Rc<ModelConfiguration>>,
    append: Option<Box<dyn TableColumn>>,
}

impl ColumnBase {
    pub fn new(label: Option<String>) -> Self {
        Self {
            header: TableHeader::new(label),
            ..Default::default()
        }
    }

    pub fn model(&self) -> Option<&Rc<Record>> {
        self.model.as_ref()
    }

    pub fn configuration(&self) -> Option<&Rc<ModelConfiguration>> {
        self.configuration.as_ref()
    }

    pub fn appended(&self) -> Option<&dyn TableColumn> {
        self.append.as_deref()
    }

    /// Row currently bound, or an error naming the column view
    fn require_model(&self, view: &str) -> AdminResult<&Rc<Record>> {
        self.model
            .as_ref()
            .ok_or_else(|| AdminError::with_context(view, "no row bound to column"))
    }

    fn require_configuration(&self, view: &str) -> AdminResult<&Rc<ModelConfiguration>> {
        self.configuration
            .as_ref()
            .ok_or_else(|| AdminError::with_context(view, "no model configuration bound to column"))
    }
}

impl std::fmt::Debug for ColumnBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnBase")
            .field("header", &self.header)
            .field("width", &self.width)
            .field("view", &self.view)
            .field("has_model", &self.model.is_some())
            .field("has_append", &self.append.is_some())
            .finish()
    }
}

// ============================================================================
// TableColumn
// ============================================================================

/// A renderable table cell
pub trait TableColumn {
    fn base(&self) -> &ColumnBase;

    fn base_mut(&mut self) -> &mut ColumnBase;

    /// Short kind name; the default view is `column.<kind>`
    fn kind(&self) -> &'static str;

    /// Kind-specific payload for the bound row
    fn payload(&self, row: &Record, configuration: &ModelConfiguration) -> AdminResult<Value>;

    /// Column the listing sorts by when this column is ordered
    fn order_column(&self) -> Option<&str> {
        None
    }

    fn header(&self) -> &TableHeader {
        &self.base().header
    }

    fn is_orderable(&self) -> bool {
        self.base().header.orderable && self.order_column().is_some()
    }

    fn width(&self) -> Option<&str> {
        self.base().width.as_deref()
    }

    fn view(&self) -> String {
        self.base()
            .view
            .clone()
            .unwrap_or_else(|| format!("column.{}", self.kind()))
    }

    fn model(&self) -> Option<&Rc<Record>> {
        self.base().model()
    }

    /// Bind the row being rendered (cascades through the append chain)
    fn set_model(&mut self, row: Rc<Record>) {
        let base = self.base_mut();
        if let Some(append) = base.append.as_mut() {
            append.set_model(row.clone());
        }
        base.model = Some(row);
    }

    /// Bind the model configuration (cascades through the append chain)
    fn set_model_configuration(&mut self, configuration: Rc<ModelConfiguration>) {
        let base = self.base_mut();
        if let Some(append) = base.append.as_mut() {
            append.set_model_configuration(configuration.clone());
        }
        base.configuration = Some(configuration);
    }

    /// Attach a column rendered after this one in the same cell
    fn set_append(&mut self, column: Box<dyn TableColumn>) {
        self.base_mut().append = Some(column);
    }

    fn appended(&self) -> Option<&dyn TableColumn> {
        self.base().appended()
    }

    /// Payload of the view: shared fields merged with the kind payload
    fn to_value(&self) -> AdminResult<Value> {
        let view = self.view();
        let base = self.base();
        let row = base.require_model(&view)?;
        let configuration = base.require_configuration(&view)?;

        let append = match base.appended() {
            Some(column) => column.render()?,
            None => String::new(),
        };

        let mut map = Map::new();
        map.insert("attributes".into(), Value::String(base.attributes.to_html_string()));
        map.insert("width".into(), json!(base.width));
        map.insert("append".into(), Value::String(append));
        if let Value::Object(payload) = self.payload(row, configuration)? {
            map.extend(payload);
        }
        Ok(Value::Object(map))
    }

    /// Render the cell; never cached
    fn render(&self) -> AdminResult<String> {
        let view = self.view();
        let configuration = self.base().require_configuration(&view)?;
        configuration
            .template()
            .render_view(&view, &self.to_value()?)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    fn label(mut self, title: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.base_mut().header.title = Some(title.into());
        self
    }

    fn orderable(mut self, orderable: bool) -> Self
    where
        Self: Sized,
    {
        self.base_mut().header.orderable = orderable;
        self
    }

    fn with_width(mut self, width: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.base_mut().width = Some(width.into());
        self
    }

    fn with_view(mut self, view: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.base_mut().view = Some(view.into());
        self
    }

    fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.base_mut().attributes.set(name, value);
        self
    }

    fn append<C: TableColumn + 'static>(mut self, column: C) -> Self
    where
        Self: Sized,
    {
        self.set_append(Box::new(column));
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::configuration;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_model_propagates_same_rc_through_chain() {
        let mut column = Text::new("name").append(Text::new("email").append(Text::new("role")));
        let row = Rc::new(Record::new("users", "id").with("name", "Ada"));

        column.set_model(row.clone());

        let second = column.appended().unwrap();
        let third = second.appended().unwrap();
        assert!(Rc::ptr_eq(column.model().unwrap(), &row));
        assert!(Rc::ptr_eq(second.model().unwrap(), &row));
        assert!(Rc::ptr_eq(third.model().unwrap(), &row));
        assert_eq!(Rc::strong_count(&row), 4);
    }

    #[test]
    fn test_set_model_configuration_cascades() {
        let config = configuration();
        let mut column = Text::new("name").append(Link::new("email"));
        column.set_model_configuration(config.clone());

        assert!(column.appended().unwrap().base().configuration().unwrap().is_same(&config));
    }

    #[test]
    fn test_render_without_row_fails() {
        let mut column = Text::new("name");
        column.set_model_configuration(configuration());
        let err = column.render().unwrap_err();
        assert_eq!(err.to_string(), "column.text: no row bound to column");
    }

    #[test]
    fn test_render_is_not_cached() {
        let mut column = Text::new("name");
        column.set_model_configuration(configuration());

        column.set_model(Rc::new(Record::new("users", "id").with("name", "Ada")));
        let first = column.render().unwrap();
        column.set_model(Rc::new(Record::new("users", "id").with("name", "Grace")));
        let second = column.render().unwrap();

        assert!(first.contains("Ada"));
        assert!(second.contains("Grace"));
    }

    #[test]
    fn test_appended_column_renders_into_cell() {
        let mut column = Text::new("name").append(Text::new("email"));
        column.set_model_configuration(configuration());
        column.set_model(Rc::new(
            Record::new("users", "id")
                .with("name", "Ada")
                .with("email", "ada@example.com"),
        ));

        let value = column.to_value().unwrap();
        assert_eq!(value["value"], json!("Ada"));
        assert!(value["append"].as_str().unwrap().contains("ada@example.com"));
    }

    #[test]
    fn test_orderable_needs_order_column() {
        let text = Text::new("name").orderable(true);
        assert!(text.is_orderable());

        let custom = Custom::new(|_| "x".to_string()).orderable(true);
        assert!(!custom.is_orderable());
    }
}
