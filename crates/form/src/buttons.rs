//! Submit, cancel and delete buttons of a form

use perch_core::{AdminResult, SharedRecord, TemplateEngine, Value};
use perch_model::ModelConfiguration;
use serde_json::json;
use std::rc::Rc;

/// Button bar rendered below the form elements
#[derive(Debug, Clone)]
pub struct FormButtons {
    configuration: Option<Rc<ModelConfiguration>>,
    model: Option<SharedRecord>,
    save_text: String,
    save_and_close_text: String,
    cancel_text: String,
    delete_text: String,
    show_save_and_close: bool,
    show_cancel: bool,
}

impl FormButtons {
    pub fn new() -> Self {
        Self {
            configuration: None,
            model: None,
            save_text: "Save".to_string(),
            save_and_close_text: "Save and close".to_string(),
            cancel_text: "Cancel".to_string(),
            delete_text: "Delete".to_string(),
            show_save_and_close: true,
            show_cancel: true,
        }
    }

    pub fn with_save_text(mut self, text: impl Into<String>) -> Self {
        self.save_text = text.into();
        self
    }

    pub fn with_save_and_close_text(mut self, text: impl Into<String>) -> Self {
        self.save_and_close_text = text.into();
        self
    }

    pub fn with_cancel_text(mut self, text: impl Into<String>) -> Self {
        self.cancel_text = text.into();
        self
    }

    pub fn with_delete_text(mut self, text: impl Into<String>) -> Self {
        self.delete_text = text.into();
        self
    }

    pub fn hide_save_and_close(mut self) -> Self {
        self.show_save_and_close = false;
        self
    }

    pub fn hide_cancel(mut self) -> Self {
        self.show_cancel = false;
        self
    }

    pub fn set_model_configuration(&mut self, configuration: Rc<ModelConfiguration>) {
        self.configuration = Some(configuration);
    }

    pub fn set_model(&mut self, model: SharedRecord) {
        self.model = Some(model);
    }

    /// Delete URL when the bound record exists and may be deleted
    pub fn delete_url(&self) -> Option<String> {
        let configuration = self.configuration.as_ref()?;
        if !configuration.is_deletable() {
            return None;
        }
        let model = self.model.as_ref()?.borrow();
        if !model.exists() {
            return None;
        }
        model.key().map(|key| configuration.delete_url(key))
    }

    pub fn to_value(&self) -> Value {
        let cancel_url = self.configuration.as_ref().map(|c| c.display_url());
        json!({
            "save": self.save_text,
            "save_and_close": self.show_save_and_close.then_some(&self.save_and_close_text),
            "cancel": self.show_cancel.then(|| json!({ "text": self.cancel_text, "url": cancel_url })),
            "delete": self.delete_url().map(|url| json!({ "text": self.delete_text, "url": url })),
        })
    }

    pub fn render(&self, template: &dyn TemplateEngine) -> AdminResult<String> {
        template.render_view("form.buttons", &self.to_value())
    }
}

impl Default for FormButtons {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::{Record, Templates};
    use perch_model::{MemoryRepository, MemoryStore, ModelDefinition};
    use pretty_assertions::assert_eq;

    fn configuration(deletable: bool) -> Rc<ModelConfiguration> {
        let definition = ModelDefinition::new("users");
        let repository = Rc::new(MemoryRepository::new(
            Rc::new(MemoryStore::new()),
            definition.clone(),
        ));
        ModelConfiguration::builder("users", definition, repository, Rc::new(Templates::new("admin")))
            .deletable(deletable)
            .build_shared()
    }

    fn existing() -> SharedRecord {
        let mut record = Record::new("users", "id").with("id", 7);
        record.mark_persisted();
        record.into_shared()
    }

    #[test]
    fn test_delete_only_for_existing_deletable_records() {
        let mut buttons = FormButtons::new();
        buttons.set_model_configuration(configuration(true));

        buttons.set_model(Record::new("users", "id").into_shared());
        assert_eq!(buttons.delete_url(), None);

        buttons.set_model(existing());
        assert_eq!(buttons.delete_url().as_deref(), Some("/admin/users/7/delete"));

        buttons.set_model_configuration(configuration(false));
        assert_eq!(buttons.delete_url(), None);
    }

    #[test]
    fn test_to_value_shape() {
        let mut buttons = FormButtons::new().hide_save_and_close();
        buttons.set_model_configuration(configuration(true));

        let value = buttons.to_value();
        assert_eq!(value["save"], json!("Save"));
        assert_eq!(value["save_and_close"], Value::Null);
        assert_eq!(value["cancel"]["url"], json!("/admin/users"));
        assert_eq!(value["delete"], Value::Null);
    }
}
