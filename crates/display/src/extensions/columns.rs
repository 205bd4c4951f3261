//! Table columns, header ordering and the row control column

use crate::column::{Control, TableColumn};
use crate::extension::{DisplayExtension, ExtensionContext};
use perch_core::{AdminResult, Direction, DisplayId, Query, Value};
use serde_json::json;
use std::any::Any;

/// Table columns plus the automatic controls column
///
/// Reads `order=<column>&dir=asc|desc` from the request and sorts by it when
/// the column is orderable.
pub struct Columns {
    owner: Option<DisplayId>,
    columns: Vec<Box<dyn TableColumn>>,
    control: Control,
    control_active: bool,
    ordering: Option<(String, Direction)>,
}

impl Columns {
    pub fn new(control: Control) -> Self {
        Self {
            owner: None,
            columns: Vec::new(),
            control,
            control_active: true,
            ordering: None,
        }
    }

    /// Replace every column
    pub fn set(&mut self, columns: Vec<Box<dyn TableColumn>>) -> &mut Self {
        self.columns = columns;
        self
    }

    pub fn push<C: TableColumn + 'static>(&mut self, column: C) -> &mut Self {
        self.columns.push(Box::new(column));
        self
    }

    /// Hide the controls column
    pub fn disable_controls(&mut self) -> &mut Self {
        self.control_active = false;
        self
    }

    pub fn is_control_active(&self) -> bool {
        self.control_active
    }

    /// Columns in render order, controls last
    pub fn all(&self) -> Vec<&dyn TableColumn> {
        let mut all: Vec<&dyn TableColumn> = self.columns.iter().map(|c| c.as_ref()).collect();
        if self.control_active {
            all.push(&self.control);
        }
        all
    }

    pub fn all_mut(&mut self) -> Vec<&mut dyn TableColumn> {
        let mut all: Vec<&mut dyn TableColumn> = Vec::with_capacity(self.columns.len() + 1);
        for column in self.columns.iter_mut() {
            all.push(column.as_mut());
        }
        if self.control_active {
            all.push(&mut self.control);
        }
        all
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Active request ordering
    pub fn ordering(&self) -> Option<(&str, Direction)> {
        self.ordering.as_ref().map(|(c, d)| (c.as_str(), *d))
    }

    pub fn headers(&self) -> Vec<Value> {
        self.all()
            .into_iter()
            .map(|column| {
                let mut header = column.header().to_value();
                let ordered = self
                    .ordering()
                    .filter(|(c, _)| column.is_orderable() && column.order_column() == Some(*c))
                    .map(|(_, d)| match d {
                        Direction::Asc => "asc",
                        Direction::Desc => "desc",
                    });
                header["orderable"] = json!(column.is_orderable());
                header["ordered"] = json!(ordered);
                header["width"] = json!(column.width());
                header
            })
            .collect()
    }
}

impl std::fmt::Debug for Columns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Columns")
            .field("owner", &self.owner)
            .field("columns", &self.columns.len())
            .field("control_active", &self.control_active)
            .field("ordering", &self.ordering)
            .finish()
    }
}

impl DisplayExtension for Columns {
    fn set_owner(&mut self, owner: DisplayId) {
        self.owner = Some(owner);
    }

    fn owner(&self) -> Option<DisplayId> {
        self.owner
    }

    fn initialize(&mut self, ctx: &ExtensionContext<'_>) -> AdminResult<()> {
        let Some(order) = ctx.request.filled("order") else {
            return Ok(());
        };

        let orderable = self
            .columns
            .iter()
            .any(|c| c.is_orderable() && c.order_column() == Some(order.as_str()));
        if orderable {
            let direction = ctx
                .request
                .get_str("dir")
                .map(|d| Direction::parse(&d))
                .unwrap_or_default();
            self.ordering = Some((order, direction));
        } else {
            tracing::debug!("Ignoring request order on non-orderable column '{}'", order);
        }
        Ok(())
    }

    fn modify_query(&self, query: &mut Query) {
        if let Some((column, direction)) = &self.ordering {
            query.order_by(column.clone(), *direction);
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "headers": self.headers(),
            "control": self.control_active,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
