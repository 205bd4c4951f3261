//! Admin bootstrap
//!
//! Turns a loaded [`AdminConfig`] into live objects: one shared in-memory
//! store, one template set with every builtin view, and a registry holding a
//! model configuration per `[[models]]` entry. Listings and forms are built
//! per command from the same sections.

use perch_core::{
    AdminError, AdminResult, Attributes, Condition, Operator, Request, TemplateEngine, Templates,
    Value,
};
use perch_display::table::DEFAULT_PAGE_NAME;
use perch_display::{
    Control, DisplayTable, FieldFilter, Link, TableColumn, Text, register_default_views,
};
use perch_form::{Field, FieldKind, FormDefault, register_form_views};
use perch_model::config::{AdminSettings, ColumnSection, FieldSection, FilterSection, ScopeSection};
use perch_model::{
    AdminConfig, MemoryRepository, MemoryStore, ModelConfiguration, ModelRegistry, ModelSection,
    load_config,
};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Namespace of the builtin views
pub const VIEW_NAMESPACE: &str = "admin";

/// A configured admin backed by the in-memory store
#[derive(Debug)]
pub struct Admin {
    config: AdminConfig,
    registry: ModelRegistry,
    store: Rc<MemoryStore>,
    data_path: Option<PathBuf>,
}

impl Admin {
    /// Load a configuration file and its data file
    ///
    /// `data` overrides `[admin] data`, which is resolved relative to the
    /// configuration file.
    pub fn load(config_path: &Path, data: Option<&Path>) -> AdminResult<Self> {
        let config = load_config(config_path)?;
        let data_path = data.map(Path::to_path_buf).or_else(|| {
            let base = config_path.parent().unwrap_or_else(|| Path::new(""));
            config.admin.data.as_ref().map(|p| base.join(p))
        });
        Self::from_config(config, data_path)
    }

    pub fn from_config(config: AdminConfig, data_path: Option<PathBuf>) -> AdminResult<Self> {
        let store = Rc::new(MemoryStore::new());
        let templates: Rc<dyn TemplateEngine> = Rc::new(templates());

        let mut registry = ModelRegistry::new();
        for section in &config.models {
            registry.register(model_configuration(
                &config.admin,
                section,
                &store,
                templates.clone(),
            )?)?;
        }

        // tables are defined by now, so loaded rows get the right key column
        match &data_path {
            Some(path) if path.exists() => store.load_json(path)?,
            Some(path) => tracing::debug!("Data file {} does not exist yet", path.display()),
            None => tracing::debug!("No data file configured"),
        }

        tracing::info!("Bootstrapped admin '{}' with {} model(s)", config.admin.title, registry.len());
        Ok(Self {
            config,
            registry,
            store,
            data_path,
        })
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Rc<MemoryStore> {
        &self.store
    }

    pub fn data_path(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }

    /// Section and registered configuration of a model
    pub fn model(&self, alias: &str) -> AdminResult<(&ModelSection, Rc<ModelConfiguration>)> {
        let configuration = self.registry.get(alias)?.clone();
        let section = self
            .config
            .model(alias)
            .ok_or_else(|| AdminError::UnknownModel(alias.to_string()))?;
        Ok((section, configuration))
    }

    /// Listing of a model, not yet initialized
    pub fn table(
        &self,
        alias: &str,
        request: Request,
        scopes: &[String],
    ) -> AdminResult<DisplayTable> {
        let (section, configuration) = self.model(alias)?;
        let mut table = DisplayTable::new(configuration.clone(), request);
        table.set_title(configuration.title());
        table.with(&section.with);

        match section.per_page.unwrap_or(self.config.admin.per_page) {
            0 => table.disable_pagination(),
            per_page => table.paginate(per_page, DEFAULT_PAGE_NAME),
        };

        let columns = section
            .columns
            .iter()
            .map(build_column)
            .collect::<AdminResult<Vec<_>>>()?;
        let controls_placed = section.columns.iter().any(|c| c.kind == "control");
        let extension = table.columns_mut()?;
        extension.set(columns);
        if controls_placed {
            extension.disable_controls();
        }

        let filters = table.display_mut().filters_mut()?;
        for filter in &section.filters {
            filters.push(build_filter(filter)?);
        }

        let applied = table.display_mut().scopes_mut()?;
        for name in scopes {
            if !section.scopes.iter().any(|s| &s.name == name) {
                return Err(AdminError::UnknownScope {
                    table: section.table.clone(),
                    scope: name.clone(),
                });
            }
            applied.push(name.clone(), Vec::new());
        }

        Ok(table)
    }

    /// Initialized form of a model, bound to the record `id` when given
    pub fn form(&self, alias: &str, id: Option<&str>) -> AdminResult<FormDefault> {
        let (section, configuration) = self.model(alias)?;

        let mut form = FormDefault::new(configuration);
        for field in &section.fields {
            form.elements_mut().push(build_field(field)?);
        }
        if let Some(id) = id {
            if !form.set_id(parse_key(id))? {
                return Err(AdminError::ModelNotFound {
                    model: alias.to_string(),
                    key: id.to_string(),
                });
            }
        }
        form.initialize()?;
        Ok(form)
    }

    /// Write the store back to the data file; false when none is configured
    pub fn persist(&self) -> AdminResult<bool> {
        match &self.data_path {
            Some(path) => {
                self.store.save_json(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Template set with every builtin display, column and form view
pub fn templates() -> Templates {
    let mut templates = Templates::new(VIEW_NAMESPACE);
    register_default_views(&mut templates);
    register_form_views(&mut templates);
    templates
}

/// Record keys typed on the command line are numeric when they parse
pub fn parse_key(id: &str) -> Value {
    id.trim()
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(id.to_string()))
}

// ============================================================================
// Section builders
// ============================================================================

fn model_configuration(
    settings: &AdminSettings,
    section: &ModelSection,
    store: &Rc<MemoryStore>,
    template: Rc<dyn TemplateEngine>,
) -> AdminResult<ModelConfiguration> {
    let definition = section.definition();

    let mut repository = MemoryRepository::new(store.clone(), definition.clone());
    for scope in &section.scopes {
        repository = repository.with_scope(&scope.name, scope_predicate(scope)?);
    }

    let mut builder =
        ModelConfiguration::builder(&section.alias, definition, Rc::new(repository), template)
            .url_prefix(&settings.url_prefix)
            .creatable(section.creatable)
            .editable(section.editable)
            .deletable(section.deletable)
            .restorable(section.restorable);
    if let Some(title) = &section.title {
        builder = builder.title(title);
    }
    Ok(builder.build())
}

fn operator(s: &str) -> AdminResult<Operator> {
    Operator::parse(s).ok_or_else(|| AdminError::invalid_config(format!("Unknown operator '{}'", s)))
}

/// Scope comparing one column; the first scope argument overrides the
/// configured value
fn scope_predicate(
    scope: &ScopeSection,
) -> AdminResult<impl Fn(&Attributes, &[Value]) -> bool + 'static> {
    let operator = operator(&scope.operator)?;
    let column = scope.column.clone();
    let configured = scope.value.clone().unwrap_or(Value::Null);
    Ok(move |row: &Attributes, args: &[Value]| {
        let value = args.first().cloned().unwrap_or_else(|| configured.clone());
        Condition::new(column.as_str(), operator, value).matches(row)
    })
}

fn build_column(section: &ColumnSection) -> AdminResult<Box<dyn TableColumn>> {
    let name = || {
        section.name.clone().ok_or_else(|| {
            AdminError::invalid_config(format!("{} column requires a name", section.kind))
        })
    };

    let mut column: Box<dyn TableColumn> = match section.kind.as_str() {
        "text" => Box::new(Text::new(name()?)),
        "link" => Box::new(Link::new(name()?)),
        "control" => Box::new(Control::new()),
        other => {
            return Err(AdminError::invalid_config(format!("Unknown column kind '{}'", other)));
        }
    };

    let base = column.base_mut();
    if let Some(label) = &section.label {
        base.header.title = Some(label.clone());
    }
    base.header.orderable = section.orderable;
    if let Some(width) = &section.width {
        base.width = Some(width.clone());
    }

    if let Some(appended) = &section.append {
        column.set_append(build_column(appended)?);
    }
    Ok(column)
}

fn build_field(section: &FieldSection) -> AdminResult<Field> {
    let kind = FieldKind::parse(&section.kind).ok_or_else(|| {
        AdminError::invalid_config(format!("Unknown field kind '{}'", section.kind))
    })?;

    let mut field = Field::new(kind, &section.name).with_rules(&section.rules);
    if let Some(label) = &section.label {
        field = field.with_label(label);
    }
    for (rule, message) in &section.messages {
        field = field.with_message(rule, message);
    }
    for (value, label) in &section.options {
        field = field.with_option(value, label);
    }
    if let Some(default) = &section.default {
        field = field.with_default(default.clone());
    }
    if let Some(help) = &section.help {
        field = field.with_help(help);
    }
    Ok(field)
}

fn build_filter(section: &FilterSection) -> AdminResult<FieldFilter> {
    let mut filter = FieldFilter::new(&section.field).with_operator(operator(&section.operator)?);
    if let Some(title) = &section.title {
        filter = filter.with_title(title);
    }
    Ok(filter)
}

// ============================================================================
// Tests
// ============================================================================
