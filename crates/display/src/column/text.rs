//! Plain text column

use super::{ColumnBase, TableColumn};
use perch_core::types::display_value;
use perch_core::{AdminResult, Record, Value};
use perch_model::ModelConfiguration;
use serde_json::json;

/// Attribute value or dotted relation path (`company.name`)
#[derive(Debug)]
pub struct Text {
    base: ColumnBase,
    name: String,
}

impl Text {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let label = heck::ToTitleCase::to_title_case(name.replace('.', " ").as_str());
        Self {
            base: ColumnBase::new(Some(label)),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TableColumn for Text {
    fn base(&self) -> &ColumnBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ColumnBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "text"
    }

    /// Relation paths cannot be sorted in storage
    fn order_column(&self) -> Option<&str> {
        (!self.name.contains('.')).then_some(self.name.as_str())
    }

    fn payload(&self, row: &Record, _: &ModelConfiguration) -> AdminResult<Value> {
        let raw = row.get_path(&self.name).unwrap_or(Value::Null);
        Ok(json!({
            "name": self.name,
            "value": display_value(&raw),
            "raw": raw,
        }))
    }
}
