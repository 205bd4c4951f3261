//! Builtin display extensions
//!
//! `Display` registers `actions`, `filters`, `apply` and `scopes`;
//! `DisplayTable` adds `columns` and `column_filters`.

mod actions;
mod apply;
mod column_filters;
mod columns;
mod filters;
mod scopes;

pub use actions::{Action, Actions};
pub use apply::{Apply, ApplyFn};
pub use column_filters::{ColumnFilter, ColumnFilters};
pub use columns::Columns;
pub use filters::{FieldFilter, Filter, Filters};
pub use scopes::Scopes;
