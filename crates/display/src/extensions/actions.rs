//! Bulk actions

use crate::extension::{DisplayExtension, ExtensionContext};
use perch_core::{AdminResult, DisplayId, Value};
use serde::Serialize;
use serde_json::json;
use std::any::Any;

/// A bulk action offered below the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub name: String,
    pub title: String,
    /// Target URL; defaults to `<display url>/actions/<name>`
    pub url: Option<String>,
    pub method: String,
}

impl Action {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            url: None,
            method: "post".to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }
}

/// Bulk actions, placed into `panel.footer`
#[derive(Debug)]
pub struct Actions {
    owner: Option<DisplayId>,
    actions: Vec<Action>,
    placement: String,
}

impl Actions {
    pub fn new() -> Self {
        Self {
            owner: None,
            actions: Vec::new(),
            placement: "panel.footer".to_string(),
        }
    }

    /// Replace every action
    pub fn set(&mut self, actions: Vec<Action>) -> &mut Self {
        self.actions = actions;
        self
    }

    pub fn push(&mut self, action: Action) -> &mut Self {
        self.actions.push(action);
        self
    }

    pub fn all(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn set_placement(&mut self, placement: impl Into<String>) -> &mut Self {
        self.placement = placement.into();
        self
    }
}

impl Default for Actions {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayExtension for Actions {
    fn set_owner(&mut self, owner: DisplayId) {
        self.owner = Some(owner);
    }

    fn owner(&self) -> Option<DisplayId> {
        self.owner
    }

    fn initialize(&mut self, ctx: &ExtensionContext<'_>) -> AdminResult<()> {
        let base = ctx.configuration.display_url();
        for action in &mut self.actions {
            if action.url.is_none() {
                action.url = Some(format!("{}/actions/{}", base, action.name));
            }
        }
        Ok(())
    }

    fn placement(&self) -> Option<&str> {
        Some(&self.placement)
    }

    fn view(&self) -> Option<&str> {
        Some("display.extensions.actions")
    }

    fn to_value(&self) -> Value {
        json!({
            "actions": self.actions,
            "placement": self.placement,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
