//! Edit-link column

use super::{ColumnBase, TableColumn};
use perch_core::types::display_value;
use perch_core::{AdminResult, Record, Value};
use perch_model::ModelConfiguration;
use serde_json::json;

/// Text linking to the row's edit form
#[derive(Debug)]
pub struct Link {
    base: ColumnBase,
    name: String,
}

impl Link {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let label = heck::ToTitleCase::to_title_case(name.replace('.', " ").as_str());
        Self {
            base: ColumnBase::new(Some(label)),
            name,
        }
    }
}

impl TableColumn for Link {
    fn base(&self) -> &ColumnBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ColumnBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "link"
    }

    fn order_column(&self) -> Option<&str> {
        (!self.name.contains('.')).then_some(self.name.as_str())
    }

    fn payload(&self, row: &Record, configuration: &ModelConfiguration) -> AdminResult<Value> {
        let raw = row.get_path(&self.name).unwrap_or(Value::Null);
        let url = match row.key() {
            Some(key) if configuration.is_editable() => Some(configuration.edit_url(key)),
            _ => None,
        };
        Ok(json!({
            "name": self.name,
            "value": display_value(&raw),
            "url": url,
        }))
    }
}
