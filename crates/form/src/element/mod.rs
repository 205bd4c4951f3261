//! Form elements
//!
//! Every element shares the record bound to its form. Binding a record on a
//! group binds it on every descendant, so saving applies each element's value
//! onto the same instance.

mod custom;
mod field;
mod group;

pub use custom::Custom;
pub use field::{Field, FieldKind};
pub use group::FormElements;

use indexmap::IndexMap;
use perch_core::{AdminResult, Request, SharedRecord, TemplateEngine, Value};
use perch_model::ModelDefinition;

/// Rules, custom messages and labels contributed by elements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationSet {
    pub rules: IndexMap<String, Vec<String>>,
    pub messages: IndexMap<String, String>,
    pub labels: IndexMap<String, String>,
}

impl ValidationSet {
    /// Merge another set; later entries win
    pub fn merge(&mut self, other: ValidationSet) {
        self.rules.extend(other.rules);
        self.messages.extend(other.messages);
        self.labels.extend(other.labels);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One control of an edit/create form
pub trait FormElement {
    /// Short kind name; the default view is `form.element.<kind>`
    fn kind(&self) -> &'static str;

    fn initialize(&mut self) -> AdminResult<()> {
        Ok(())
    }

    /// Bind the record being edited
    fn set_model(&mut self, model: SharedRecord);

    fn model(&self) -> Option<&SharedRecord>;

    /// Rules, messages and labels of this element and its children
    fn validation(&self) -> ValidationSet {
        ValidationSet::default()
    }

    /// Apply the submitted value onto the bound record
    fn save(&mut self, _request: &Request, _definition: &ModelDefinition) -> AdminResult<()> {
        Ok(())
    }

    /// Runs once the record has been persisted
    fn after_save(&mut self, _request: &Request) -> AdminResult<()> {
        Ok(())
    }

    /// Whether the element submits files
    fn is_upload(&self) -> bool {
        false
    }

    fn view(&self) -> String {
        format!("form.element.{}", self.kind())
    }

    fn to_value(&self) -> Value;

    fn render(&self, template: &dyn TemplateEngine) -> AdminResult<String> {
        template.render_view(&self.view(), &self.to_value())
    }
}
