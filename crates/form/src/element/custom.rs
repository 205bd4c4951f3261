//! Custom elements

use super::FormElement;
use perch_core::{AdminResult, Record, Request, SharedRecord, TemplateEngine, Value};
use perch_model::ModelDefinition;
use serde_json::json;

type DisplayFn = Box<dyn Fn(&Record) -> String>;
type SaveFn = Box<dyn Fn(&mut Record)>;
type AfterSaveFn = Box<dyn Fn(&Record)>;

/// What a custom element shows
enum Display {
    Html(String),
    Callback(DisplayFn),
}

/// Element rendered by a string or closure, saved by a callback
pub struct Custom {
    display: Display,
    callback: Option<SaveFn>,
    after_save: Option<AfterSaveFn>,
    model: Option<SharedRecord>,
}

impl Custom {
    pub fn new() -> Self {
        Self {
            display: Display::Html(String::new()),
            callback: None,
            after_save: None,
            model: None,
        }
    }

    /// Fixed html
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.display = Display::Html(html.into());
        self
    }

    /// Html computed from the bound record
    pub fn with_display<F>(mut self, display: F) -> Self
    where
        F: Fn(&Record) -> String + 'static,
    {
        self.display = Display::Callback(Box::new(display));
        self
    }

    /// Called with the bound record when the form applies values
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Record) + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Called with the persisted record
    pub fn with_after_save<F>(mut self, after_save: F) -> Self
    where
        F: Fn(&Record) + 'static,
    {
        self.after_save = Some(Box::new(after_save));
        self
    }

    pub fn display(&self) -> String {
        match &self.display {
            Display::Html(html) => html.clone(),
            Display::Callback(display) => match &self.model {
                Some(model) => display(&model.borrow()),
                None => String::new(),
            },
        }
    }
}

impl Default for Custom {
    fn default() -> Self {
        Self::new()
    }
}

impl FormElement for Custom {
    fn kind(&self) -> &'static str {
        "custom"
    }

    fn set_model(&mut self, model: SharedRecord) {
        self.model = Some(model);
    }

    fn model(&self) -> Option<&SharedRecord> {
        self.model.as_ref()
    }

    fn save(&mut self, _request: &Request, _definition: &ModelDefinition) -> AdminResult<()> {
        if let (Some(callback), Some(model)) = (&self.callback, &self.model) {
            callback(&mut model.borrow_mut());
        }
        Ok(())
    }

    fn after_save(&mut self, _request: &Request) -> AdminResult<()> {
        if let (Some(after_save), Some(model)) = (&self.after_save, &self.model) {
            after_save(&model.borrow());
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        json!({ "html": self.display() })
    }

    /// Rendered without a view
    fn render(&self, _template: &dyn TemplateEngine) -> AdminResult<String> {
        Ok(self.display())
    }
}

impl std::fmt::Debug for Custom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Custom")
            .field("has_callback", &self.callback.is_some())
            .field("has_after_save", &self.after_save.is_some())
            .field("has_model", &self.model.is_some())
            .finish()
    }
}
