//! Save pipeline against the in-memory store, driven through the registry

use perch_core::{LoadedRelation, Record, Renderable, Request, Templates};
use perch_form::{Custom, Field, FormDefault, FormElements, SaveOutcome, register_form_views};
use perch_model::{
    HookOutcome, MemoryRepository, MemoryStore, ModelConfiguration, ModelDefinition, ModelEvent,
    ModelRegistry, RelationDefinition,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::rc::Rc;

fn registry() -> (ModelRegistry, Rc<MemoryStore>) {
    let store = Rc::new(MemoryStore::new());
    let definition = ModelDefinition::new("authors")
        .with_timestamps()
        .with_relation(RelationDefinition::has_one("profile", "profiles", "author_id"));
    let repository = Rc::new(MemoryRepository::new(store.clone(), definition.clone()));

    let mut templates = Templates::new("admin");
    register_form_views(&mut templates);

    let mut registry = ModelRegistry::new();
    registry
        .register(
            ModelConfiguration::builder("authors", definition, repository, Rc::new(templates))
                .on(ModelEvent::Creating, |record| {
                    if record.get("name") == Some(&json!("blocked")) {
                        HookOutcome::Abort
                    } else {
                        HookOutcome::Proceed
                    }
                })
                .build(),
        )
        .unwrap();
    (registry, store)
}

fn form(registry: &ModelRegistry) -> FormDefault {
    let config = registry.get("authors").unwrap().clone();
    let mut form = FormDefault::new(config).with_element(
        FormElements::new()
            .with(Field::text("name").with_rules(&["required", "max:20"]))
            .with(Field::number("age").with_rules(&["integer", "min:0"]))
            .with(Field::checkbox("active"))
            .with(Field::textarea("profile.bio")),
    );
    form.initialize().unwrap();
    form
}

#[test]
fn test_create_with_has_one_relation() {
    let (registry, store) = registry();
    let config = registry.get("authors").unwrap().clone();
    let mut form = form(&registry);

    let request = Request::from_pairs([
        ("name", "Ada"),
        ("age", "36"),
        ("active", "1"),
        ("profile.bio", "Analyst"),
    ]);
    assert_eq!(form.save_form(&config, &request).unwrap(), SaveOutcome::Saved);

    let authors = store.rows("authors");
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].get("age"), Some(&json!(36)));
    assert_eq!(authors[0].get("active"), Some(&json!(true)));
    assert!(authors[0].get("created_at").is_some());

    let profiles = store.rows("profiles");
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].get("author_id"), authors[0].get("id"));
    assert_eq!(profiles[0].get("bio"), Some(&json!("Analyst")));
}

#[test]
fn test_creating_listener_aborts() {
    let (registry, store) = registry();
    let config = registry.get("authors").unwrap().clone();
    let mut form = form(&registry);

    let request = Request::new().with("name", "blocked").with("profile.bio", "x");
    let outcome = form.save_form(&config, &request).unwrap();

    assert_eq!(outcome, SaveOutcome::Aborted(ModelEvent::Creating));
    assert_eq!(store.count("authors"), 0);
    assert_eq!(store.count("profiles"), 0);
}

#[test]
fn test_invalid_input_reports_every_field() {
    let (registry, store) = registry();
    let config = registry.get("authors").unwrap().clone();
    let mut form = form(&registry);

    let request = Request::new().with("age", "-3");
    let SaveOutcome::Invalid(errors) = form.save_form(&config, &request).unwrap() else {
        panic!("expected validation errors");
    };
    assert!(errors.has("name"));
    assert_eq!(errors.first("age"), Some("The Age must be at least 0."));
    assert_eq!(store.count("authors"), 0);

    let html = form.render().unwrap();
    assert!(html.contains("alert-danger"));
    assert!(html.contains("name=\"age\""));
}

#[test]
fn test_invalid_input_never_saves_relations() {
    let (registry, store) = registry();
    let config = registry.get("authors").unwrap().clone();
    let mut form = form(&registry);

    let request = Request::new()
        .with("age", "-3")
        .with("profile.bio", "Analyst");
    let outcome = form.save_form(&config, &request).unwrap();

    assert!(matches!(outcome, SaveOutcome::Invalid(_)));
    assert_eq!(store.count("authors"), 0);
    assert_eq!(store.count("profiles"), 0);
    assert!(!form.model().unwrap().borrow().exists());
}

#[test]
fn test_edit_existing_record_updates_in_place() {
    let (registry, store) = registry();
    let config = registry.get("authors").unwrap().clone();
    store.insert(
        "authors",
        [("name".to_string(), json!("Grace")), ("age".to_string(), json!(85))]
            .into_iter()
            .collect(),
    );

    let mut form = FormDefault::new(config.clone())
        .with_element(Field::text("name").required())
        .with_element(Custom::new().with_callback(|record: &mut Record| {
            record.set_relation(
                "profile",
                LoadedRelation::HasOne {
                    foreign_key: "author_id".to_string(),
                    local_key: "id".to_string(),
                    related: Some(Box::new(Record::new("profiles", "id").with("bio", "Admiral"))),
                },
            );
        }));
    assert!(form.set_id(1).unwrap());
    form.initialize().unwrap();

    let outcome = form
        .save_form(&config, &Request::new().with("name", "Grace Hopper"))
        .unwrap();
    assert!(outcome.is_saved());

    let authors = store.rows("authors");
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].get("name"), Some(&json!("Grace Hopper")));
    assert_eq!(authors[0].get("age"), Some(&json!(85)));
    assert_eq!(store.rows("profiles")[0].get("author_id"), Some(&json!(1)));
}
