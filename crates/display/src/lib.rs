//! # Perch Display
//!
//! Listing displays for Perch Admin.
//!
//! - **Display**: an ordered registry of named extensions with a two-phase
//!   render (extensions first, page template second)
//! - **DisplayTable**: paginated table listing with columns and column filters
//! - **Columns**: `Text`, `Link`, `Custom` and `Control` cells with append chains
//! - **Extensions**: actions, filters, apply, scopes, columns, column filters
//!

pub mod column;
pub mod display;
pub mod extension;
pub mod extensions;
pub mod table;
pub mod views;

pub use column::{ColumnBase, Control, Custom, Link, TableColumn, TableHeader, Text};
pub use display::Display;
pub use extension::{DisplayExtension, ExtensionContext};
pub use extensions::{
    Action, Actions, Apply, ColumnFilter, ColumnFilters, Columns, FieldFilter, Filter, Filters,
    Scopes,
};
pub use table::DisplayTable;
pub use views::register_default_views;
