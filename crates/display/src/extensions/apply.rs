//! Closure query modifiers

use crate::extension::DisplayExtension;
use perch_core::{DisplayId, Query, Value};
use serde_json::json;
use std::any::Any;

/// An arbitrary query modifier
pub type ApplyFn = Box<dyn Fn(&mut Query)>;

/// Query closures run in registration order
#[derive(Default)]
pub struct Apply {
    owner: Option<DisplayId>,
    applies: Vec<ApplyFn>,
}

impl Apply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every modifier
    pub fn set(&mut self, applies: Vec<ApplyFn>) -> &mut Self {
        self.applies = applies;
        self
    }

    pub fn push<F>(&mut self, apply: F) -> &mut Self
    where
        F: Fn(&mut Query) + 'static,
    {
        self.applies.push(Box::new(apply));
        self
    }

    pub fn len(&self) -> usize {
        self.applies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applies.is_empty()
    }
}

impl std::fmt::Debug for Apply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Apply")
            .field("owner", &self.owner)
            .field("applies", &self.applies.len())
            .finish()
    }
}

impl DisplayExtension for Apply {
    fn set_owner(&mut self, owner: DisplayId) {
        self.owner = Some(owner);
    }

    fn owner(&self) -> Option<DisplayId> {
        self.owner
    }

    fn modify_query(&self, query: &mut Query) {
        for apply in &self.applies {
            apply(query);
        }
    }

    fn to_value(&self) -> Value {
        json!({ "count": self.applies.len() })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
