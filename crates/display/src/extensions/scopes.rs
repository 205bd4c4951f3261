//! Named scopes

use crate::extension::DisplayExtension;
use perch_core::{DisplayId, Query, ScopeCall, Value};
use serde_json::json;
use std::any::Any;

/// Named repository scopes applied to the listing query
#[derive(Debug, Default)]
pub struct Scopes {
    owner: Option<DisplayId>,
    scopes: Vec<ScopeCall>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every scope
    pub fn set(&mut self, scopes: Vec<ScopeCall>) -> &mut Self {
        self.scopes = scopes;
        self
    }

    pub fn push(&mut self, name: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.scopes.push(ScopeCall {
            name: name.into(),
            args,
        });
        self
    }

    pub fn all(&self) -> &[ScopeCall] {
        &self.scopes
    }
}

impl DisplayExtension for Scopes {
    fn set_owner(&mut self, owner: DisplayId) {
        self.owner = Some(owner);
    }

    fn owner(&self) -> Option<DisplayId> {
        self.owner
    }

    fn modify_query(&self, query: &mut Query) {
        for scope in &self.scopes {
            query.scope(scope.name.clone(), scope.args.clone());
        }
    }

    fn to_value(&self) -> Value {
        json!({ "scopes": self.scopes.iter().map(|s| s.name.as_str()).collect::<Vec<_>>() })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
