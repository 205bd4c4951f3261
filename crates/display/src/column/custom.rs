//! Closure-rendered column

use super::{ColumnBase, TableColumn};
use perch_core::{AdminResult, Record, Value};
use perch_model::ModelConfiguration;
use serde_json::json;

type CellFn = Box<dyn Fn(&Record) -> String>;

/// Cell computed by a closure
pub struct Custom {
    base: ColumnBase,
    callback: CellFn,
}

impl Custom {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Record) -> String + 'static,
    {
        Self {
            base: ColumnBase::new(None),
            callback: Box::new(callback),
        }
    }
}

impl std::fmt::Debug for Custom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Custom").field("base", &self.base).finish()
    }
}

impl TableColumn for Custom {
    fn base(&self) -> &ColumnBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ColumnBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "custom"
    }

    fn payload(&self, row: &Record, _: &ModelConfiguration) -> AdminResult<Value> {
        Ok(json!({ "value": (self.callback)(row) }))
    }
}
