//! Element groups

use super::{FormElement, ValidationSet};
use perch_core::{AdminResult, Request, SharedRecord, TemplateEngine, Value};
use perch_model::ModelDefinition;
use serde_json::json;

/// Ordered group of elements; every call fans out to the children
#[derive(Default)]
pub struct FormElements {
    elements: Vec<Box<dyn FormElement>>,
    model: Option<SharedRecord>,
}

impl FormElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, elements: Vec<Box<dyn FormElement>>) -> &mut Self {
        self.elements = elements;
        if let Some(model) = self.model.clone() {
            self.set_model(model);
        }
        self
    }

    /// Add an element, binding the group's record to it
    pub fn push<E: FormElement + 'static>(&mut self, element: E) -> &mut Self {
        self.push_boxed(Box::new(element))
    }

    pub fn push_boxed(&mut self, mut element: Box<dyn FormElement>) -> &mut Self {
        if let Some(model) = &self.model {
            element.set_model(model.clone());
        }
        self.elements.push(element);
        self
    }

    /// Builder form of [`push`](Self::push)
    pub fn with<E: FormElement + 'static>(mut self, element: E) -> Self {
        self.push(element);
        self
    }

    pub fn all(&self) -> &[Box<dyn FormElement>] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Render every child, in order
    pub fn render_items(&self, template: &dyn TemplateEngine) -> AdminResult<Vec<String>> {
        self.elements.iter().map(|e| e.render(template)).collect()
    }
}

impl FormElement for FormElements {
    fn kind(&self) -> &'static str {
        "group"
    }

    fn initialize(&mut self) -> AdminResult<()> {
        for element in &mut self.elements {
            element.initialize()?;
        }
        Ok(())
    }

    fn set_model(&mut self, model: SharedRecord) {
        for element in &mut self.elements {
            element.set_model(model.clone());
        }
        self.model = Some(model);
    }

    fn model(&self) -> Option<&SharedRecord> {
        self.model.as_ref()
    }

    fn validation(&self) -> ValidationSet {
        let mut set = ValidationSet::default();
        for element in &self.elements {
            set.merge(element.validation());
        }
        set
    }

    fn save(&mut self, request: &Request, definition: &ModelDefinition) -> AdminResult<()> {
        for element in &mut self.elements {
            element.save(request, definition)?;
        }
        Ok(())
    }

    fn after_save(&mut self, request: &Request) -> AdminResult<()> {
        for element in &mut self.elements {
            element.after_save(request)?;
        }
        Ok(())
    }

    fn is_upload(&self) -> bool {
        self.elements.iter().any(|e| e.is_upload())
    }

    fn to_value(&self) -> Value {
        json!({
            "items": self.elements.iter().map(|e| e.to_value()).collect::<Vec<_>>(),
        })
    }

    fn render(&self, template: &dyn TemplateEngine) -> AdminResult<String> {
        let items = self.render_items(template)?;
        template.render_view(&self.view(), &json!({ "items": items }))
    }
}

impl std::fmt::Debug for FormElements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormElements")
            .field("kinds", &self.elements.iter().map(|e| e.kind()).collect::<Vec<_>>())
            .field("has_model", &self.model.is_some())
            .finish()
    }
}
