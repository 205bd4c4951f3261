//! Display: the extension registry behind every listing
//!
//! A `Display` owns an ordered map of named extensions. Registering a name
//! twice replaces the earlier extension in place. Initialization runs once;
//! placeable extensions are rendered later by [`Display::collect_injections`]
//! and handed to the page template as sections.

use crate::extension::{DisplayExtension, ExtensionContext};
use crate::extensions::{Action, Actions, Apply, Filter, Filters, Scopes};
use indexmap::IndexMap;
use perch_core::{
    AdminError, AdminResult, DisplayId, HtmlAttributes, Injection, Query, Repository, Request,
    ScopeCall, TemplateEngine, Value,
};
use perch_model::ModelConfiguration;
use serde_json::{Map, json};
use std::rc::Rc;

/// Extension registry and shared listing state
pub struct Display {
    id: DisplayId,
    extensions: IndexMap<String, Box<dyn DisplayExtension>>,
    configuration: Rc<ModelConfiguration>,
    request: Request,
    view: String,
    title: Option<String>,
    attributes: HtmlAttributes,
    with: Vec<String>,
    initialized: bool,
}

impl Display {
    /// Create a display with the default `actions`, `filters`, `apply` and
    /// `scopes` extensions
    pub fn new(configuration: Rc<ModelConfiguration>, request: Request) -> Self {
        let mut display = Self {
            id: DisplayId::new(),
            extensions: IndexMap::new(),
            configuration,
            request,
            view: "display.default".to_string(),
            title: None,
            attributes: HtmlAttributes::new(),
            with: Vec::new(),
            initialized: false,
        };

        display.register("actions", Box::new(Actions::new()));
        display.register("filters", Box::new(Filters::new()));
        display.register("apply", Box::new(Apply::new()));
        display.register("scopes", Box::new(Scopes::new()));
        display
    }

    // ========================================================================
    // Extension registry
    // ========================================================================

    /// Register or replace an extension, binding this display as its owner
    pub fn register(&mut self, name: impl Into<String>, mut extension: Box<dyn DisplayExtension>) {
        let name = name.into();
        extension.set_owner(self.id);
        if self.extensions.insert(name.clone(), extension).is_some() {
            tracing::debug!("Replaced display extension '{}'", name);
        }
    }

    /// Register or replace an extension and return it typed
    pub fn extend<E: DisplayExtension>(&mut self, name: impl Into<String>, extension: E) -> AdminResult<&mut E> {
        let name = name.into();
        self.register(name.clone(), Box::new(extension));
        self.extension_as_mut::<E>(&name)
    }

    pub fn extensions(&self) -> &IndexMap<String, Box<dyn DisplayExtension>> {
        &self.extensions
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    pub fn extension(&self, name: &str) -> AdminResult<&dyn DisplayExtension> {
        self.extensions
            .get(name)
            .map(|e| e.as_ref())
            .ok_or_else(|| AdminError::ExtensionNotFound(name.to_string()))
    }

    pub fn extension_mut(&mut self, name: &str) -> AdminResult<&mut dyn DisplayExtension> {
        match self.extensions.get_mut(name) {
            Some(extension) => Ok(extension.as_mut()),
            None => Err(AdminError::ExtensionNotFound(name.to_string())),
        }
    }

    /// Registered extension downcast to its concrete type
    pub fn extension_as<T: DisplayExtension>(&self, name: &str) -> AdminResult<&T> {
        self.extension(name)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| AdminError::ExtensionType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn extension_as_mut<T: DisplayExtension>(&mut self, name: &str) -> AdminResult<&mut T> {
        self.extension_mut(name)?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| AdminError::ExtensionType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Resolve a `get<Name>` accessor (`getColumnFilters` -> `column_filters`)
    pub fn resolve_accessor(&self, accessor: &str) -> AdminResult<&dyn DisplayExtension> {
        let not_found = || AdminError::MethodNotFound(accessor.to_string());
        let suffix = accessor.strip_prefix("get").ok_or_else(not_found)?;
        let name = heck::ToSnakeCase::to_snake_case(suffix);
        self.extensions
            .get(&name)
            .map(|e| e.as_ref())
            .ok_or_else(not_found)
    }

    // ========================================================================
    // Typed accessors
    // ========================================================================

    pub fn actions(&self) -> AdminResult<&Actions> {
        self.extension_as("actions")
    }

    pub fn actions_mut(&mut self) -> AdminResult<&mut Actions> {
        self.extension_as_mut("actions")
    }

    pub fn set_actions(&mut self, actions: Vec<Action>) -> AdminResult<&mut Self> {
        self.actions_mut()?.set(actions);
        Ok(self)
    }

    pub fn filters(&self) -> AdminResult<&Filters> {
        self.extension_as("filters")
    }

    pub fn filters_mut(&mut self) -> AdminResult<&mut Filters> {
        self.extension_as_mut("filters")
    }

    pub fn set_filters(&mut self, filters: Vec<Box<dyn Filter>>) -> AdminResult<&mut Self> {
        self.filters_mut()?.set(filters);
        Ok(self)
    }

    pub fn apply(&self) -> AdminResult<&Apply> {
        self.extension_as("apply")
    }

    pub fn apply_mut(&mut self) -> AdminResult<&mut Apply> {
        self.extension_as_mut("apply")
    }

    /// Add a query modifier
    pub fn set_apply<F>(&mut self, apply: F) -> AdminResult<&mut Self>
    where
        F: Fn(&mut Query) + 'static,
    {
        self.apply_mut()?.push(apply);
        Ok(self)
    }

    pub fn scopes(&self) -> AdminResult<&Scopes> {
        self.extension_as("scopes")
    }

    pub fn scopes_mut(&mut self) -> AdminResult<&mut Scopes> {
        self.extension_as_mut("scopes")
    }

    pub fn set_scopes(&mut self, scopes: Vec<ScopeCall>) -> AdminResult<&mut Self> {
        self.scopes_mut()?.set(scopes);
        Ok(self)
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn id(&self) -> DisplayId {
        self.id
    }

    pub fn configuration(&self) -> &Rc<ModelConfiguration> {
        &self.configuration
    }

    pub fn repository(&self) -> &Rc<dyn Repository> {
        self.configuration.repository()
    }

    pub fn template(&self) -> &Rc<dyn TemplateEngine> {
        self.configuration.template()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn set_view(&mut self, view: impl Into<String>) -> &mut Self {
        self.view = view.into();
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Relations eager loaded by the listing
    pub fn with<S: AsRef<str>>(&mut self, relations: &[S]) -> &mut Self {
        self.with = relations.iter().map(|r| r.as_ref().to_string()).collect();
        self
    }

    pub fn eager_relations(&self) -> &[String] {
        &self.with
    }

    pub fn attributes(&self) -> &HtmlAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut HtmlAttributes {
        &mut self.attributes
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Apply eager loads and initialize every extension, once
    pub fn initialize(&mut self) -> AdminResult<()> {
        if self.initialized {
            tracing::warn!("Display for '{}' already initialized", self.configuration.alias());
            return Ok(());
        }

        self.configuration.repository().with(&self.with);

        let ctx = ExtensionContext {
            configuration: &self.configuration,
            request: &self.request,
        };
        for (name, extension) in self.extensions.iter_mut() {
            tracing::debug!("Initializing display extension '{}'", name);
            extension.initialize(&ctx)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Apply every extension's query modifier, in registration order
    pub fn modify_query(&self, query: &mut Query) {
        for extension in self.extensions.values() {
            extension.modify_query(query);
        }
    }

    /// Render placeable extensions into `(placement, html)` fragments
    pub fn collect_injections(&self) -> AdminResult<Vec<Injection>> {
        let template = self.template();
        let mut injections = Vec::new();

        for extension in self.extensions.values() {
            let (Some(placement), Some(view)) = (extension.placement(), extension.view()) else {
                continue;
            };
            let html = template.render_view(view, &extension.to_value())?;
            if !html.trim().is_empty() {
                injections.push(Injection::new(placement, html));
            }
        }

        Ok(injections)
    }

    /// Own title followed by every extension title, joined by `" | "`
    pub fn title(&self) -> String {
        std::iter::once(self.title.clone())
            .chain(self.extensions.values().map(|e| e.title()))
            .flatten()
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn to_value(&self) -> Value {
        let extensions: Map<String, Value> = self
            .extensions
            .iter()
            .map(|(name, e)| (name.clone(), e.to_value()))
            .collect();

        json!({
            "title": self.title(),
            "extensions": extensions,
            "attributes": self.attributes.to_html_string(),
        })
    }

    /// Render the display view without table data
    pub fn render(&self) -> AdminResult<String> {
        let sections = perch_core::Sections::from_injections(self.collect_injections()?);
        self.template().render(&self.view, &self.to_value(), &sections)
    }
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("id", &self.id)
            .field("model", &self.configuration.alias())
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .field("view", &self.view)
            .field("title", &self.title)
            .field("initialized", &self.initialized)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::FieldFilter;
    use crate::test_support::{configuration, seeded_configuration};
    use perch_core::types::Sections;
    use pretty_assertions::assert_eq;
    use std::any::Any;

    /// Extension with a fixed title and a counter
    #[derive(Debug, Default)]
    struct Badge {
        owner: Option<DisplayId>,
        title: Option<String>,
        initialized: usize,
    }

    impl Badge {
        fn titled(title: &str) -> Self {
            Self {
                title: Some(title.to_string()),
                ..Default::default()
            }
        }
    }

    impl DisplayExtension for Badge {
        fn set_owner(&mut self, owner: DisplayId) {
            self.owner = Some(owner);
        }

        fn owner(&self) -> Option<DisplayId> {
            self.owner
        }

        fn initialize(&mut self, _ctx: &ExtensionContext<'_>) -> AdminResult<()> {
            self.initialized += 1;
            Ok(())
        }

        fn title(&self) -> Option<String> {
            self.title.clone()
        }

        fn placement(&self) -> Option<&str> {
            Some("panel.heading")
        }

        fn view(&self) -> Option<&str> {
            Some("badge")
        }

        fn to_value(&self) -> Value {
            json!({ "title": self.title })
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_default_extensions_in_order() {
        let display = Display::new(configuration(), Request::new());
        let names: Vec<_> = display.extensions().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["actions", "filters", "apply", "scopes"]);
        for extension in display.extensions().values() {
            assert_eq!(extension.owner(), Some(display.id()));
        }
    }

    #[test]
    fn test_last_extend_wins_and_keeps_position() {
        let mut display = Display::new(configuration(), Request::new());
        display.extend("badge", Badge::titled("First")).unwrap();
        display.extend("filters", Badge::titled("Replacement")).unwrap();
        display.extend("badge", Badge::titled("Second")).unwrap();

        let names: Vec<_> = display.extensions().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["actions", "filters", "apply", "scopes", "badge"]);
        assert_eq!(
            display.extension_as::<Badge>("badge").unwrap().title.as_deref(),
            Some("Second")
        );
        assert_eq!(
            display.resolve_accessor("getBadge").unwrap().title().as_deref(),
            Some("Second")
        );
        assert!(matches!(
            display.filters(),
            Err(AdminError::ExtensionType { ref name, .. }) if name == "filters"
        ));
    }

    #[test]
    fn test_resolve_accessor() {
        let mut display = Display::new(configuration(), Request::new());
        display
            .extend("column_filters", crate::extensions::ColumnFilters::new())
            .unwrap();

        assert!(display.resolve_accessor("getColumnFilters").is_ok());
        assert!(display.resolve_accessor("getScopes").is_ok());

        match display.resolve_accessor("getUnknown") {
            Err(err) => assert_eq!(err.to_string(), "Call to undefined method [getUnknown]"),
            Ok(_) => panic!("getUnknown resolved to an extension"),
        }
        assert!(matches!(
            display.resolve_accessor("fetchScopes"),
            Err(AdminError::MethodNotFound(_))
        ));
    }

    #[test]
    fn test_title_joins_extension_titles() {
        let mut display = Display::new(configuration(), Request::new());
        display.set_title("Users");
        assert_eq!(display.title(), "Users");

        display.extend("badge", Badge::titled("Active")).unwrap();
        assert_eq!(display.title(), "Users | Active");

        display.extend("empty", Badge::titled("")).unwrap();
        assert_eq!(display.title(), "Users | Active");
    }

    #[test]
    fn test_title_includes_active_filters() {
        let request = Request::new().with("role", "admin");
        let mut display = Display::new(configuration(), request);
        display.set_title("Users");
        display
            .filters_mut()
            .unwrap()
            .push(FieldFilter::new("role").with_title("Role: :value"))
            .push(FieldFilter::new("company_id").with_title("Company"));
        display.initialize().unwrap();

        assert_eq!(display.title(), "Users | Role: admin");
    }

    #[test]
    fn test_initialize_runs_once() {
        let mut display = Display::new(configuration(), Request::new());
        display.extend("badge", Badge::titled("x")).unwrap();

        display.initialize().unwrap();
        display.initialize().unwrap();

        assert!(display.is_initialized());
        assert_eq!(display.extension_as::<Badge>("badge").unwrap().initialized, 1);
    }

    #[test]
    fn test_initialize_applies_eager_relations() {
        let (config, repository) = seeded_configuration();
        let mut display = Display::new(config, Request::new());
        display.with(&["company"]);
        display.initialize().unwrap();

        assert_eq!(repository.eager_relations(), vec!["company"]);
    }

    #[test]
    fn test_collect_injections_skips_empty_fragments() {
        let mut display = Display::new(configuration(), Request::new());
        display.extend("badge", Badge::titled("Active")).unwrap();
        display.initialize().unwrap();

        let injections = display.collect_injections().unwrap();
        assert_eq!(injections, vec![Injection::new("panel.heading", "<span>Active</span>")]);

        display.actions_mut().unwrap().push(Action::new("archive", "Archive"));
        let sections = Sections::from_injections(display.collect_injections().unwrap());
        assert!(sections.yield_slot("panel.footer").contains("Archive"));
    }

    #[test]
    fn test_to_value_shape() {
        let mut display = Display::new(configuration(), Request::new());
        display.set_title("Users").attributes_mut().set("class", "panel");

        let value = display.to_value();
        assert_eq!(value["title"], json!("Users"));
        assert_eq!(value["attributes"], json!("class=\"panel\""));
        assert_eq!(value["extensions"]["scopes"], json!({"scopes": []}));
    }
}
