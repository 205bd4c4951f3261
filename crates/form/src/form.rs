//! FormDefault: the edit/create form of a model and its save pipeline
//!
//! Saving runs in a fixed order: bind, validate, check ownership, apply
//! element values, save belongs-to relations, fire `creating`/`updating` and
//! `saving`, persist, save has-one/has-many relations, run after-save hooks,
//! fire `created`/`updated` and `saved`. A cancellable listener returning
//! `HookOutcome::Abort` stops the pipeline before anything is persisted.

use crate::buttons::FormButtons;
use crate::element::{FormElement, FormElements};
use perch_core::{
    AdminError, AdminResult, HtmlAttributes, LoadedRelation, PresenceVerifier, Record,
    RelationKind, Renderable, Repository, Request, SharedRecord, ValidationErrors,
    ValidationFactory, ValidationInput, Value,
};
use perch_model::{ModelConfiguration, ModelEvent, RuleValidatorFactory};
use serde_json::json;
use std::rc::Rc;

// ============================================================================
// SaveOutcome
// ============================================================================

/// Result of [`FormDefault::save_form`]
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Record and relations persisted
    Saved,
    /// A listener vetoed the save at this event
    Aborted(ModelEvent),
    /// Submitted data failed validation; nothing was persisted
    Invalid(ValidationErrors),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

// ============================================================================
// FormDefault
// ============================================================================

/// Edit/create form bound to one model configuration
pub struct FormDefault {
    configuration: Rc<ModelConfiguration>,
    validation: Rc<dyn ValidationFactory>,
    elements: FormElements,
    buttons: FormButtons,
    model: Option<SharedRecord>,
    id: Option<Value>,
    action: Option<String>,
    attributes: HtmlAttributes,
    view: String,
    back_url: Option<String>,
    errors: ValidationErrors,
    initialized: bool,
}

impl FormDefault {
    /// Create a form validated by the builtin rule validator
    pub fn new(configuration: Rc<ModelConfiguration>) -> Self {
        Self::with_validation(configuration, Rc::new(RuleValidatorFactory::new()))
    }

    pub fn with_validation(
        configuration: Rc<ModelConfiguration>,
        validation: Rc<dyn ValidationFactory>,
    ) -> Self {
        Self {
            configuration,
            validation,
            elements: FormElements::new(),
            buttons: FormButtons::new(),
            model: None,
            id: None,
            action: None,
            attributes: HtmlAttributes::new(),
            view: "form.default".to_string(),
            back_url: None,
            errors: ValidationErrors::new(),
            initialized: false,
        }
    }

    // ========================================================================
    // Elements and buttons
    // ========================================================================

    pub fn elements(&self) -> &FormElements {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut FormElements {
        &mut self.elements
    }

    /// Builder: add an element
    pub fn with_element<E: FormElement + 'static>(mut self, element: E) -> Self {
        self.elements.push(element);
        self
    }

    pub fn buttons(&self) -> &FormButtons {
        &self.buttons
    }

    pub fn set_buttons(&mut self, buttons: FormButtons) -> &mut Self {
        self.buttons = buttons;
        if let Some(model) = self.model.clone() {
            self.buttons.set_model(model);
        }
        self
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn configuration(&self) -> &Rc<ModelConfiguration> {
        &self.configuration
    }

    pub fn repository(&self) -> &Rc<dyn Repository> {
        self.configuration.repository()
    }

    pub fn model(&self) -> Option<&SharedRecord> {
        self.model.as_ref()
    }

    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Keep the first action; the `action` attribute always reflects it
    pub fn set_action(&mut self, action: impl Into<String>) -> &mut Self {
        if self.action.is_none() {
            self.action = Some(action.into());
        }
        if let Some(action) = &self.action {
            self.attributes.set("action", action.as_str());
        }
        self
    }

    pub fn attributes(&self) -> &HtmlAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut HtmlAttributes {
        &mut self.attributes
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn set_view(&mut self, view: impl Into<String>) -> &mut Self {
        self.view = view.into();
        self
    }

    /// Where cancel and redirects lead (defaults to the listing)
    pub fn back_url(&self) -> String {
        self.back_url
            .clone()
            .unwrap_or_else(|| self.configuration.display_url())
    }

    pub fn set_back_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.back_url = Some(url.into());
        self
    }

    /// Errors of the last failed validation
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ========================================================================
    // Model binding
    // ========================================================================

    /// Bind a record and share it with every element and the buttons
    pub fn set_model(&mut self, model: SharedRecord) -> &mut Self {
        self.elements.set_model(model.clone());
        self.buttons.set_model(model.clone());
        self.model = Some(model);
        self
    }

    /// Load and bind the record with this key; only the first successful
    /// bind wins. Returns whether a record was bound.
    pub fn set_id(&mut self, id: impl Into<Value>) -> AdminResult<bool> {
        let id = id.into();
        if self.id.is_some() || id.is_null() {
            return Ok(false);
        }

        match self.repository().find(&id)? {
            Some(record) => {
                tracing::debug!("Bound {} #{} to form", self.configuration.alias(), id);
                self.id = Some(id);
                self.set_model(record.into_shared());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The bound record, binding a blank one first when needed
    fn bound_model(&mut self) -> SharedRecord {
        match &self.model {
            Some(model) => model.clone(),
            None => {
                let model = self.configuration.new_model().into_shared();
                self.set_model(model.clone());
                model
            }
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bind a blank record if needed, initialize elements and set the html
    /// attributes
    pub fn initialize(&mut self) -> AdminResult<()> {
        if self.initialized {
            tracing::warn!("Form for '{}' already initialized", self.configuration.alias());
            return Ok(());
        }

        self.bound_model();
        self.elements.initialize()?;

        if self.elements.is_upload() && !self.attributes.has("enctype") {
            self.attributes.set("enctype", "multipart/form-data");
        }
        self.attributes.set("method", "POST");
        self.buttons
            .set_model_configuration(self.configuration.clone());

        self.initialized = true;
        tracing::debug!("Initialized form for '{}'", self.configuration.alias());
        Ok(())
    }

    fn require_owner(&self, configuration: &ModelConfiguration) -> AdminResult<()> {
        if self.configuration.is_same(configuration) {
            Ok(())
        } else {
            Err(AdminError::ConfigurationMismatch {
                expected: self.configuration.alias().to_string(),
                found: configuration.alias().to_string(),
            })
        }
    }

    /// Validate request input against the elements' rules. Returns the
    /// errors, or `None` when the input passes.
    pub fn validate_form(
        &mut self,
        configuration: &ModelConfiguration,
        request: &Request,
    ) -> AdminResult<Option<ValidationErrors>> {
        self.require_owner(configuration)?;
        let model = self.bound_model();

        let set = self.elements.validation();
        let definition = self.configuration.definition();
        let ignore = {
            let record = model.borrow();
            record
                .exists()
                .then(|| record.key().map(|key| (record.key_name().to_string(), key.clone())))
                .flatten()
        };

        let input = ValidationInput {
            data: request.all().clone(),
            rules: set.rules,
            messages: set.messages,
            labels: set.labels,
            table: definition.table.clone(),
            ignore,
        };

        let repository: &dyn Repository = self.configuration.repository().as_ref();
        let verifier: &dyn PresenceVerifier = repository;
        let validator = self.validation.make(input, Some(verifier))?;

        if validator.fails() {
            self.errors = validator.errors().clone();
            tracing::debug!(
                "Validation failed for '{}': {} field(s)",
                self.configuration.alias(),
                self.errors.len()
            );
            return Ok(Some(self.errors.clone()));
        }

        self.errors = ValidationErrors::new();
        Ok(None)
    }

    /// Validate and persist the submitted request
    pub fn save_form(
        &mut self,
        configuration: &ModelConfiguration,
        request: &Request,
    ) -> AdminResult<SaveOutcome> {
        let model = self.bound_model();

        if let Some(errors) = self.validate_form(configuration, request)? {
            return Ok(SaveOutcome::Invalid(errors));
        }
        self.require_owner(configuration)?;

        let definition = self.configuration.definition().clone();
        self.elements.save(request, &definition)?;

        let repository = self.configuration.repository().clone();
        save_belongs_to(&mut model.borrow_mut(), repository.as_ref())?;

        let exists = model.borrow().exists();
        for event in [ModelEvent::before_write(exists), ModelEvent::Saving] {
            if self.configuration.fire_event(event, true, &model.borrow()).is_abort() {
                tracing::warn!(
                    "Save of '{}' aborted by '{}' listener",
                    self.configuration.alias(),
                    event
                );
                return Ok(SaveOutcome::Aborted(event));
            }
        }

        repository.save(&mut model.borrow_mut())?;
        save_has_one_or_many(&mut model.borrow_mut(), repository.as_ref())?;

        self.elements.after_save(request)?;

        for event in [ModelEvent::after_write(exists), ModelEvent::Saved] {
            self.configuration.fire_event(event, false, &model.borrow());
        }

        let record = model.borrow();
        tracing::info!(
            "Saved {} #{}",
            self.configuration.alias(),
            record.key().map(perch_core::types::display_value).unwrap_or_default()
        );
        Ok(SaveOutcome::Saved)
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub fn to_value(&self) -> AdminResult<Value> {
        let template = self.configuration.template();
        let errors: Value = self
            .errors
            .iter()
            .map(|(field, messages)| (field.clone(), json!(messages)))
            .collect::<serde_json::Map<_, _>>()
            .into();

        Ok(json!({
            "items": self.elements.render_items(template.as_ref())?,
            "instance": self.model.as_ref().map_or(Value::Null, |m| m.borrow().to_value()),
            "attributes": self.attributes.to_html_string(),
            "buttons": self.buttons.render(template.as_ref())?,
            "back_url": self.back_url(),
            "errors": errors,
        }))
    }
}

impl Renderable for FormDefault {
    fn render(&mut self) -> AdminResult<String> {
        let data = self.to_value()?;
        self.configuration.template().render_view(&self.view, &data)
    }
}

impl std::fmt::Debug for FormDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormDefault")
            .field("model", &self.configuration.alias())
            .field("elements", &self.elements)
            .field("id", &self.id)
            .field("action", &self.action)
            .field("initialized", &self.initialized)
            .finish()
    }
}

// ============================================================================
// Relation saving
// ============================================================================

/// Persist loaded belongs-to records and copy their keys onto the parent
fn save_belongs_to(record: &mut Record, repository: &dyn Repository) -> AdminResult<()> {
    for name in record.relation_names(RelationKind::BelongsTo) {
        let mut association = None;

        if let Some(LoadedRelation::BelongsTo {
            foreign_key,
            owner_key,
            related: Some(related),
        }) = record.relation_mut(&name)
        {
            repository
                .save(related)
                .map_err(|e| AdminError::relation(name.as_str(), e.to_string()))?;
            let key = related.get(owner_key.as_str()).cloned().unwrap_or(Value::Null);
            association = Some((foreign_key.clone(), key));
        }

        if let Some((foreign_key, key)) = association {
            tracing::debug!("Associated '{}' via {} = {}", name, foreign_key, key);
            record.set(foreign_key, key);
        }
    }
    Ok(())
}

/// Point has-one/has-many records at the parent and persist them
fn save_has_one_or_many(record: &mut Record, repository: &dyn Repository) -> AdminResult<()> {
    let mut names = record.relation_names(RelationKind::HasOne);
    names.extend(record.relation_names(RelationKind::HasMany));

    for name in names {
        let local_key = match record.relation(&name) {
            Some(LoadedRelation::HasOne { local_key, .. })
            | Some(LoadedRelation::HasMany { local_key, .. }) => local_key.clone(),
            _ => continue,
        };
        let parent_key = record.get(&local_key).cloned().ok_or_else(|| {
            AdminError::relation(name.as_str(), format!("parent has no value for '{}'", local_key))
        })?;

        let related: Vec<&mut Record> = match record.relation_mut(&name) {
            Some(LoadedRelation::HasOne {
                foreign_key,
                related: Some(related),
                ..
            }) => {
                related.set(foreign_key.as_str(), parent_key.clone());
                vec![&mut **related]
            }
            Some(LoadedRelation::HasMany {
                foreign_key,
                related,
                ..
            }) => {
                for item in related.iter_mut() {
                    item.set(foreign_key.as_str(), parent_key.clone());
                }
                related.iter_mut().collect()
            }
            _ => Vec::new(),
        };

        for item in related {
            repository
                .save(item)
                .map_err(|e| AdminError::relation(name.as_str(), e.to_string()))?;
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Custom, Field};
    use crate::test_support::{configuration, configuration_with_hooks};
    use perch_core::Record;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn user_form(config: Rc<ModelConfiguration>) -> FormDefault {
        FormDefault::new(config)
            .with_element(Field::text("name").required())
            .with_element(Field::text("email").with_rules(&["required", "email", "unique"]))
    }

    fn valid_request() -> Request {
        Request::new()
            .with("name", "Ada")
            .with("email", "ada@example.com")
    }

    #[test]
    fn test_initialize_sets_attributes_and_blank_model() {
        let mut form = user_form(configuration().0).with_element(Field::upload("avatar"));
        form.initialize().unwrap();

        assert!(!form.model().unwrap().borrow().exists());
        assert_eq!(form.attributes().get("method"), Some("POST"));
        assert_eq!(form.attributes().get("enctype"), Some("multipart/form-data"));
    }

    #[test]
    fn test_initialize_keeps_existing_enctype() {
        let mut form = user_form(configuration().0).with_element(Field::upload("avatar"));
        form.attributes_mut().set("enctype", "text/plain");
        form.initialize().unwrap();
        assert_eq!(form.attributes().get("enctype"), Some("text/plain"));
    }

    #[test]
    fn test_set_action_keeps_first() {
        let mut form = user_form(configuration().0);
        form.set_action("/admin/users/create");
        form.attributes_mut().remove("action");
        form.set_action("/elsewhere");

        assert_eq!(form.action(), Some("/admin/users/create"));
        assert_eq!(form.attributes().get("action"), Some("/admin/users/create"));
    }

    #[test]
    fn test_set_id_first_successful_bind_wins() {
        let (config, _) = configuration();
        let mut form = user_form(config);

        assert!(!form.set_id(99).unwrap());
        assert!(form.set_id(1).unwrap());
        assert!(!form.set_id(2).unwrap());

        assert_eq!(form.id(), Some(&json!(1)));
        assert_eq!(form.model().unwrap().borrow().get("name"), Some(&json!("Grace")));
    }

    #[test]
    fn test_save_creates_record() {
        let (config, store) = configuration();
        let mut form = user_form(config.clone());
        form.initialize().unwrap();

        let outcome = form.save_form(&config, &valid_request()).unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);

        let model = form.model().unwrap().borrow();
        assert!(model.exists());
        assert_eq!(model.key(), Some(&json!(2)));
        assert_eq!(store.count("users"), 2);
    }

    #[test]
    fn test_validation_failure_persists_nothing() {
        let (config, store) = configuration();
        let mut form = user_form(config.clone());
        form.initialize().unwrap();

        let request = Request::new().with("email", "grace@example.com");
        let SaveOutcome::Invalid(errors) = form.save_form(&config, &request).unwrap() else {
            panic!("expected validation failure");
        };

        assert_eq!(errors.first("name"), Some("The Name field is required."));
        assert_eq!(errors.first("email"), Some("The Email has already been taken."));
        assert_eq!(store.count("users"), 1);
        assert_eq!(form.errors(), &errors);
    }

    #[test]
    fn test_validation_failure_skips_relations_and_hooks() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let after_save = Rc::new(RefCell::new(false));
        let sink = after_save.clone();
        let (config, store) = configuration_with_hooks(log.clone(), None);
        let mut form = user_form(config.clone())
            .with_element(Field::text("company.name"))
            .with_element(Custom::new().with_callback(|record: &mut Record| {
                record.set_relation(
                    "posts",
                    LoadedRelation::HasMany {
                        foreign_key: "user_id".to_string(),
                        local_key: "id".to_string(),
                        related: vec![Record::new("posts", "id").with("title", "First")],
                    },
                );
            }))
            .with_element(Custom::new().with_after_save(move |_: &Record| {
                *sink.borrow_mut() = true;
            }));
        form.initialize().unwrap();

        let request = Request::new()
            .with("email", "not-an-email")
            .with("company.name", "Initech");
        let outcome = form.save_form(&config, &request).unwrap();

        assert!(matches!(outcome, SaveOutcome::Invalid(_)));
        assert_eq!(store.count("users"), 1);
        assert_eq!(store.count("companies"), 0);
        assert_eq!(store.count("posts"), 0);
        assert!(log.borrow().is_empty());
        assert!(!*after_save.borrow());
    }

    #[test]
    fn test_unique_ignores_bound_record() {
        let (config, store) = configuration();
        let mut form = user_form(config.clone());
        form.set_id(1).unwrap();

        let request = Request::new()
            .with("name", "Grace H.")
            .with("email", "grace@example.com");
        assert!(form.save_form(&config, &request).unwrap().is_saved());
        assert_eq!(store.count("users"), 1);
        assert_eq!(
            store.rows("users")[0].get("name"),
            Some(&json!("Grace H."))
        );
    }

    #[test]
    fn test_foreign_configuration_is_rejected() {
        let mut form = user_form(configuration().0);
        let (other, _) = configuration();

        let err = form.save_form(&other, &valid_request()).unwrap_err();
        assert!(matches!(err, AdminError::ConfigurationMismatch { .. }));
    }

    #[test]
    fn test_saving_abort_persists_nothing_and_skips_saved() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (config, store) = configuration_with_hooks(log.clone(), Some(ModelEvent::Saving));
        let mut form = user_form(config.clone());
        form.initialize().unwrap();

        let outcome = form.save_form(&config, &valid_request()).unwrap();
        assert_eq!(outcome, SaveOutcome::Aborted(ModelEvent::Saving));
        assert_eq!(*log.borrow(), vec!["creating", "saving"]);
        assert_eq!(store.count("users"), 1);
        assert!(!form.model().unwrap().borrow().exists());
    }

    #[test]
    fn test_events_fire_in_order_for_updates() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (config, _) = configuration_with_hooks(log.clone(), None);
        let mut form = user_form(config.clone());
        form.set_id(1).unwrap();

        let request = Request::new()
            .with("name", "Grace")
            .with("email", "grace@example.com");
        form.save_form(&config, &request).unwrap();
        assert_eq!(*log.borrow(), vec!["updating", "saving", "updated", "saved"]);
    }

    #[test]
    fn test_relations_save_around_parent() {
        let (config, store) = configuration();
        let mut form = user_form(config.clone())
            .with_element(Field::text("company.name"))
            .with_element(Custom::new().with_callback(|record: &mut Record| {
                record.set_relation(
                    "posts",
                    LoadedRelation::HasMany {
                        foreign_key: "user_id".to_string(),
                        local_key: "id".to_string(),
                        related: vec![
                            Record::new("posts", "id").with("title", "First"),
                            Record::new("posts", "id").with("title", "Second"),
                        ],
                    },
                );
            }));
        form.initialize().unwrap();

        let request = valid_request().with("company.name", "Initech");
        assert!(form.save_form(&config, &request).unwrap().is_saved());

        let companies = store.rows("companies");
        assert_eq!(companies.len(), 1);
        let company_id = companies[0].get("id").cloned().unwrap();

        let users = store.rows("users");
        assert_eq!(users[1].get("company_id"), Some(&company_id));

        let posts = store.rows("posts");
        assert_eq!(posts.len(), 2);
        for post in &posts {
            assert_eq!(post.get("user_id"), users[1].get("id"));
        }
    }

    #[test]
    fn test_after_save_sees_persisted_record() {
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        let (config, _) = configuration();
        let mut form = user_form(config.clone()).with_element(
            Custom::new().with_after_save(move |record: &Record| {
                *sink.borrow_mut() = record.key().cloned();
            }),
        );
        form.initialize().unwrap();
        form.save_form(&config, &valid_request()).unwrap();

        assert_eq!(*seen.borrow(), Some(json!(2)));
    }

    #[test]
    fn test_render_includes_items_buttons_and_errors() {
        let (config, _) = configuration();
        let mut form = user_form(config.clone());
        form.set_action("/admin/users/create");
        form.initialize().unwrap();
        form.save_form(&config, &Request::new()).unwrap();

        let html = form.render().unwrap();
        assert!(html.contains("action=\"/admin/users/create\""));
        assert!(html.contains("name=\"email\""));
        assert!(html.contains("The Name field is required."));
        assert!(html.contains("Save"));
        assert!(html.contains("href=\"/admin/users\""));
    }
}
