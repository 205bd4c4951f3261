//! Display extensions
//!
//! An extension is a named, pluggable behaviour attached to exactly one
//! display. It may contribute a title fragment, modify the listing query,
//! inject a rendered fragment into a placement of the page template, or be
//! rendered inline by the table view.

use perch_core::{AdminResult, DisplayId, Query, Request, Value};
use perch_model::ModelConfiguration;
use std::any::Any;
use std::rc::Rc;

/// What an extension sees while the display initializes
#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext<'a> {
    pub configuration: &'a Rc<ModelConfiguration>,
    pub request: &'a Request,
}

/// Behaviour attached to a display
pub trait DisplayExtension: Any {
    /// Bind the owning display; called by `Display::extend`
    fn set_owner(&mut self, owner: DisplayId);

    fn owner(&self) -> Option<DisplayId>;

    /// One-time setup, in registration order
    fn initialize(&mut self, _ctx: &ExtensionContext<'_>) -> AdminResult<()> {
        Ok(())
    }

    /// Fragment appended to the display title
    fn title(&self) -> Option<String> {
        None
    }

    fn modify_query(&self, _query: &mut Query) {}

    /// Placement slot of the page template, for placeable extensions
    fn placement(&self) -> Option<&str> {
        None
    }

    /// View rendered for placement or inline rendering
    fn view(&self) -> Option<&str> {
        None
    }

    /// Rendered inline by the table view, sorted by [`order`](Self::order)
    fn is_renderable(&self) -> bool {
        false
    }

    fn order(&self) -> i32 {
        0
    }

    fn to_value(&self) -> Value;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
