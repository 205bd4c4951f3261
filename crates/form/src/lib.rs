//! # Perch Form
//!
//! Edit/create forms for Perch Admin: form elements bound to a shared
//! record, the button bar, and `FormDefault` with its ordered save pipeline
//! (validation, relation saving, lifecycle events).

pub mod buttons;
pub mod element;
pub mod form;
pub mod views;

pub use buttons::FormButtons;
pub use element::{Custom, Field, FieldKind, FormElement, FormElements, ValidationSet};
pub use form::{FormDefault, SaveOutcome};
pub use views::register_form_views;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::views::register_form_views;
    use perch_core::{Attributes, Templates};
    use perch_model::{
        HookOutcome, MemoryRepository, MemoryStore, ModelConfiguration,
        ModelConfigurationBuilder, ModelDefinition, ModelEvent, RelationDefinition,
    };
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn builder() -> (ModelConfigurationBuilder, Rc<MemoryStore>) {
        let store = Rc::new(MemoryStore::new());
        let definition = ModelDefinition::new("users")
            .with_relation(RelationDefinition::belongs_to("company", "companies"))
            .with_relation(RelationDefinition::has_many("posts", "posts", "user_id"));
        let repository = Rc::new(MemoryRepository::new(store.clone(), definition.clone()));

        let grace: Attributes = [
            ("name".to_string(), json!("Grace")),
            ("email".to_string(), json!("grace@example.com")),
        ]
        .into_iter()
        .collect();
        store.insert("users", grace);

        let mut templates = Templates::new("admin");
        register_form_views(&mut templates);

        let builder =
            ModelConfiguration::builder("users", definition, repository, Rc::new(templates));
        (builder, store)
    }

    /// Users configuration with one stored user (#1 Grace)
    pub fn configuration() -> (Rc<ModelConfiguration>, Rc<MemoryStore>) {
        let (builder, store) = builder();
        (builder.build_shared(), store)
    }

    /// Like [`configuration`], logging every fired event and aborting at
    /// `abort_at`
    pub fn configuration_with_hooks(
        log: Rc<RefCell<Vec<&'static str>>>,
        abort_at: Option<ModelEvent>,
    ) -> (Rc<ModelConfiguration>, Rc<MemoryStore>) {
        let (mut builder, store) = builder();
        for &event in ModelEvent::all() {
            let log = log.clone();
            builder = builder.on(event, move |_| {
                log.borrow_mut().push(event.name());
                if Some(event) == abort_at {
                    HookOutcome::Abort
                } else {
                    HookOutcome::Proceed
                }
            });
        }
        (builder.build_shared(), store)
    }
}
