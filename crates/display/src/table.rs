//! DisplayTable: paginated listing rendered as a table
//!
//! Adds the `columns` and `column_filters` extensions to a `Display`, builds
//! and memoizes the listing collection, and renders `display.table` with the
//! rendered cells and the placement sections of its extensions.

use crate::column::{Control, TableColumn};
use crate::display::Display;
use crate::extension::DisplayExtension;
use crate::extensions::{ColumnFilter, ColumnFilters, Columns};
use indexmap::IndexMap;
use perch_core::{
    AdminError, AdminResult, Collection, Record, Renderable, Request, Sections, Value,
};
use perch_model::ModelConfiguration;
use serde_json::json;
use std::cell::OnceCell;
use std::rc::Rc;

/// Default page size
pub const DEFAULT_PER_PAGE: usize = 25;

/// Default request parameter carrying the page number
pub const DEFAULT_PAGE_NAME: &str = "page";

/// Default label of the create button
pub const DEFAULT_NEW_ENTRY_TEXT: &str = "New Entry";

/// Table listing of a model
pub struct DisplayTable {
    display: Display,
    parameters: IndexMap<String, Value>,
    per_page: usize,
    page_name: String,
    collection: OnceCell<Collection>,
    new_entry_button_text: Option<String>,
}

impl DisplayTable {
    pub fn new(configuration: Rc<ModelConfiguration>, request: Request) -> Self {
        let mut display = Display::new(configuration, request);
        display.set_view("display.table");
        display.register("columns", Box::new(Columns::new(Control::new())));
        display.register("column_filters", Box::new(ColumnFilters::new()));

        Self {
            display,
            parameters: IndexMap::new(),
            per_page: DEFAULT_PER_PAGE,
            page_name: DEFAULT_PAGE_NAME.to_string(),
            collection: OnceCell::new(),
            new_entry_button_text: None,
        }
    }

    /// The underlying display
    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut Display {
        &mut self.display
    }

    pub fn configuration(&self) -> &Rc<ModelConfiguration> {
        self.display.configuration()
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.display.set_title(title);
        self
    }

    pub fn title(&self) -> String {
        self.display.title()
    }

    /// Relations eager loaded by the listing
    pub fn with<S: AsRef<str>>(&mut self, relations: &[S]) -> &mut Self {
        self.display.with(relations);
        self
    }

    /// Register or replace an extension and return it typed
    pub fn extend<E: DisplayExtension>(&mut self, name: impl Into<String>, extension: E) -> AdminResult<&mut E> {
        self.display.extend(name, extension)
    }

    // ========================================================================
    // Columns
    // ========================================================================

    pub fn columns(&self) -> AdminResult<&Columns> {
        self.display.extension_as("columns")
    }

    pub fn columns_mut(&mut self) -> AdminResult<&mut Columns> {
        self.display.extension_as_mut("columns")
    }

    pub fn set_columns(&mut self, columns: Vec<Box<dyn TableColumn>>) -> AdminResult<&mut Self> {
        self.columns_mut()?.set(columns);
        Ok(self)
    }

    pub fn column_filters(&self) -> AdminResult<&ColumnFilters> {
        self.display.extension_as("column_filters")
    }

    pub fn column_filters_mut(&mut self) -> AdminResult<&mut ColumnFilters> {
        self.display.extension_as_mut("column_filters")
    }

    pub fn set_column_filters(&mut self, filters: Vec<ColumnFilter>) -> AdminResult<&mut Self> {
        self.column_filters_mut()?.set(filters);
        Ok(self)
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Paginate by `per_page` rows, reading the page from `page_name`
    pub fn paginate(&mut self, per_page: usize, page_name: impl Into<String>) -> &mut Self {
        self.per_page = per_page;
        self.page_name = page_name.into();
        self
    }

    pub fn disable_pagination(&mut self) -> &mut Self {
        self.per_page = 0;
        self
    }

    pub fn use_pagination(&self) -> bool {
        self.per_page > 0
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn page_name(&self) -> &str {
        &self.page_name
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    pub fn parameters(&self) -> &IndexMap<String, Value> {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: IndexMap<String, Value>) -> &mut Self {
        self.parameters = parameters;
        self
    }

    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Create URL parameters: request input overridden by display parameters
    pub fn create_parameters(&self) -> IndexMap<String, Value> {
        let mut params = self.display.request().all().clone();
        for (key, value) in &self.parameters {
            params.insert(key.clone(), value.clone());
        }
        params
    }

    pub fn new_entry_button_text(&self) -> &str {
        self.new_entry_button_text
            .as_deref()
            .unwrap_or(DEFAULT_NEW_ENTRY_TEXT)
    }

    pub fn set_new_entry_button_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.new_entry_button_text = Some(text.into());
        self
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initialize the display, then wire soft deletes, columns and filters
    pub fn initialize(&mut self) -> AdminResult<()> {
        if self.display.is_initialized() {
            tracing::warn!("Table for '{}' already initialized", self.configuration().alias());
            return Ok(());
        }

        self.display.initialize()?;

        let configuration = self.configuration().clone();
        if configuration.is_restorable_model() {
            self.display.set_apply(|query| {
                query.with_trashed();
            })?;
        }

        for column in self.columns_mut()?.all_mut() {
            column.set_model_configuration(configuration.clone());
        }
        for filter in self.column_filters_mut()?.all_mut() {
            filter.set_model_configuration(configuration.clone());
        }

        self.display
            .attributes_mut()
            .set("class", "table table-striped");

        tracing::debug!("Initialized table for '{}'", configuration.alias());
        Ok(())
    }

    /// Query result, built once per table
    pub fn get_collection(&self) -> AdminResult<&Collection> {
        if let Some(collection) = self.collection.get() {
            return Ok(collection);
        }

        let repository = self.display.repository();
        let mut query = repository.query();
        self.display.modify_query(&mut query);

        let collection = if self.use_pagination() {
            let page = self
                .display
                .request()
                .get_usize(&self.page_name)
                .unwrap_or(1)
                .max(1);
            Collection::Paginated(repository.paginate(&query, self.per_page, page)?)
        } else {
            Collection::All(repository.get(&query)?.into_iter().map(Rc::new).collect())
        };

        tracing::debug!(
            "Loaded {} row(s) for '{}'",
            collection.len(),
            self.configuration().alias()
        );
        let _ = self.collection.set(collection);
        self.collection
            .get()
            .ok_or_else(|| AdminError::internal("collection was not stored"))
    }

    /// Render every cell of the collection, row by row
    fn render_rows(&mut self) -> AdminResult<Vec<Vec<String>>> {
        let items: Vec<Rc<Record>> = self.get_collection()?.items().to_vec();
        let columns = self.columns_mut()?;

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let mut cells = Vec::new();
            for column in columns.all_mut() {
                column.set_model(item.clone());
                cells.push(column.render()?);
            }
            rows.push(cells);
        }
        Ok(rows)
    }

    /// Renderable extensions, rendered and sorted by order
    fn render_extensions(&self) -> AdminResult<Vec<Value>> {
        let template = self.display.template();
        let mut rendered = Vec::new();

        for (name, extension) in self.display.extensions() {
            if !extension.is_renderable() {
                continue;
            }
            let Some(view) = extension.view() else {
                continue;
            };
            rendered.push((
                extension.order(),
                json!({
                    "name": name,
                    "order": extension.order(),
                    "html": template.render_view(view, &extension.to_value())?,
                }),
            ));
        }

        rendered.sort_by_key(|(order, _)| *order);
        Ok(rendered.into_iter().map(|(_, value)| value).collect())
    }

    /// Payload of the `display.table` view
    pub fn to_value(&mut self) -> AdminResult<Value> {
        let rows = self.render_rows()?;
        let extensions = self.render_extensions()?;
        let headers = self.columns()?.headers();
        let configuration = self.configuration().clone();
        let collection = self.get_collection()?;

        let mut value = self.display.to_value();
        value["renderables"] = Value::Array(extensions);
        value["creatable"] = json!(configuration.is_creatable());
        value["create_url"] = json!(configuration.create_url(&self.create_parameters()));
        value["new_entry_button_text"] = json!(self.new_entry_button_text());
        value["collection"] = collection.to_value();
        value["pagination"] = collection
            .page()
            .map_or(Value::Null, |page| page.meta(&self.page_name));
        value["headers"] = Value::Array(headers);
        value["rows"] = json!(rows);
        Ok(value)
    }
}

impl Renderable for DisplayTable {
    fn render(&mut self) -> AdminResult<String> {
        let data = self.to_value()?;
        let sections = Sections::from_injections(self.display.collect_injections()?);
        self.display
            .template()
            .render(self.display.view(), &data, &sections)
    }
}

impl std::fmt::Debug for DisplayTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayTable")
            .field("display", &self.display)
            .field("per_page", &self.per_page)
            .field("page_name", &self.page_name)
            .field("loaded", &self.collection.get().is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
