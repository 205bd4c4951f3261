//! Model lifecycle events
//!
//! Listeners observe a record at fixed points of the save pipeline. Listeners
//! of cancellable events may veto the save by returning `HookOutcome::Abort`.

use indexmap::IndexMap;
use perch_core::Record;
use serde::{Deserialize, Serialize};

// ============================================================================
// ModelEvent
// ============================================================================

/// Lifecycle points fired by the form save pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelEvent {
    Creating,
    Created,
    Updating,
    Updated,
    Saving,
    Saved,
}

impl ModelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ModelEvent::Creating => "creating",
            ModelEvent::Created => "created",
            ModelEvent::Updating => "updating",
            ModelEvent::Updated => "updated",
            ModelEvent::Saving => "saving",
            ModelEvent::Saved => "saved",
        }
    }

    /// Whether listeners can veto the save at this point
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            ModelEvent::Creating | ModelEvent::Updating | ModelEvent::Saving
        )
    }

    /// Pre-write event for a new or existing record
    pub fn before_write(exists: bool) -> Self {
        if exists {
            ModelEvent::Updating
        } else {
            ModelEvent::Creating
        }
    }

    /// Post-write event for a new or existing record
    pub fn after_write(exists: bool) -> Self {
        if exists {
            ModelEvent::Updated
        } else {
            ModelEvent::Created
        }
    }

    pub fn all() -> &'static [ModelEvent] {
        &[
            ModelEvent::Creating,
            ModelEvent::Created,
            ModelEvent::Updating,
            ModelEvent::Updated,
            ModelEvent::Saving,
            ModelEvent::Saved,
        ]
    }
}

impl std::fmt::Display for ModelEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// HookOutcome
// ============================================================================

/// Result of a lifecycle listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookOutcome {
    #[default]
    Proceed,
    Abort,
}

impl HookOutcome {
    pub fn is_abort(&self) -> bool {
        matches!(self, HookOutcome::Abort)
    }
}

/// A lifecycle listener
pub type Listener = Box<dyn Fn(&Record) -> HookOutcome>;

// ============================================================================
// EventHooks
// ============================================================================

/// Listeners per event, in registration order
#[derive(Default)]
pub struct EventHooks {
    listeners: IndexMap<ModelEvent, Vec<Listener>>,
}

impl EventHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn listen<F>(&mut self, event: ModelEvent, listener: F)
    where
        F: Fn(&Record) -> HookOutcome + 'static,
    {
        self.listeners
            .entry(event)
            .or_default()
            .push(Box::new(listener));
    }

    pub fn has_listeners(&self, event: ModelEvent) -> bool {
        self.listeners.get(&event).is_some_and(|l| !l.is_empty())
    }

    /// Run listeners for an event
    ///
    /// When `cancellable`, the first `Abort` stops dispatch and is returned.
    /// Otherwise every listener runs and the result is always `Proceed`.
    pub fn fire(&self, event: ModelEvent, cancellable: bool, record: &Record) -> HookOutcome {
        let Some(listeners) = self.listeners.get(&event) else {
            return HookOutcome::Proceed;
        };

        for listener in listeners {
            let outcome = listener(record);
            if cancellable && outcome.is_abort() {
                tracing::debug!("Listener vetoed '{}' on {}", event, record.table());
                return HookOutcome::Abort;
            }
        }

        HookOutcome::Proceed
    }
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<_> = self
            .listeners
            .iter()
            .map(|(event, l)| (event.name(), l.len()))
            .collect();
        f.debug_struct("EventHooks").field("listeners", &counts).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_cancellable_abort_stops_dispatch() {
        let calls = Rc::new(Cell::new(0));
        let mut hooks = EventHooks::new();

        let c = calls.clone();
        hooks.listen(ModelEvent::Saving, move |_| {
            c.set(c.get() + 1);
            HookOutcome::Abort
        });
        let c = calls.clone();
        hooks.listen(ModelEvent::Saving, move |_| {
            c.set(c.get() + 1);
            HookOutcome::Proceed
        });

        let record = Record::new("users", "id");
        assert_eq!(hooks.fire(ModelEvent::Saving, true, &record), HookOutcome::Abort);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_non_cancellable_ignores_abort() {
        let calls = Rc::new(Cell::new(0));
        let mut hooks = EventHooks::new();
        for _ in 0..2 {
            let c = calls.clone();
            hooks.listen(ModelEvent::Saved, move |_| {
                c.set(c.get() + 1);
                HookOutcome::Abort
            });
        }

        let record = Record::new("users", "id");
        assert_eq!(hooks.fire(ModelEvent::Saved, false, &record), HookOutcome::Proceed);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_event_selection() {
        assert_eq!(ModelEvent::before_write(true), ModelEvent::Updating);
        assert_eq!(ModelEvent::before_write(false), ModelEvent::Creating);
        assert_eq!(ModelEvent::after_write(false), ModelEvent::Created);
        assert!(ModelEvent::Saving.is_cancellable());
        assert!(!ModelEvent::Saved.is_cancellable());
    }
}
