//! Row control buttons

use super::{ColumnBase, TableColumn};
use perch_core::{AdminResult, Record, Value};
use perch_model::ModelConfiguration;
use perch_model::definition::is_trashed;
use serde_json::json;

/// Edit, delete and restore buttons of a row
#[derive(Debug)]
pub struct Control {
    base: ColumnBase,
}

impl Control {
    pub fn new() -> Self {
        let mut base = ColumnBase::new(None);
        base.width = Some("50px".to_string());
        Self { base }
    }
}

impl Default for Control {
    fn default() -> Self {
        Self::new()
    }
}

impl TableColumn for Control {
    fn base(&self) -> &ColumnBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ColumnBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "control"
    }

    fn payload(&self, row: &Record, configuration: &ModelConfiguration) -> AdminResult<Value> {
        let Some(key) = row.key() else {
            return Ok(json!({ "edit_url": null, "delete_url": null, "restore_url": null }));
        };

        let trashed = is_trashed(row);
        let edit_url = (configuration.is_editable() && !trashed).then(|| configuration.edit_url(key));
        let delete_url =
            (configuration.is_deletable() && !trashed).then(|| configuration.delete_url(key));
        let restore_url =
            (configuration.is_restorable_model() && trashed).then(|| configuration.restore_url(key));

        Ok(json!({
            "edit_url": edit_url,
            "delete_url": delete_url,
            "restore_url": restore_url,
        }))
    }
}
