//! Command handlers
//!
//! Every handler writes its report to the given writer; failures that the
//! user must act on (invalid configuration, validation errors, aborted
//! saves) are returned as errors after the details are printed.

use crate::args::{Cli, Commands, ListArgs, SaveArgs, Target, form_request};
use crate::bootstrap::Admin;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use perch_core::Renderable;
use perch_core::types::display_value;
use perch_form::{FormDefault, SaveOutcome};
use perch_model::{check_config, read_config};
use std::io::Write;
use std::path::Path;

/// Run a parsed command line against stdout
pub fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }
    let stdout = std::io::stdout();
    execute(cli.command, &mut stdout.lock())
}

pub fn execute(command: Commands, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Check { config } => check(&config, out),
        Commands::List(args) => list(&args, out),
        Commands::Create(SaveArgs { target, values }) => save(&target, None, &values, out),
        Commands::Edit { target, id, values } => save(&target, Some(&id), &values, out),
        Commands::Form { target, id } => form(&target, id.as_deref(), out),
    }
}

fn load(target: &Target) -> Result<Admin> {
    Admin::load(&target.config, target.data.as_deref())
        .with_context(|| format!("Failed to load admin from {}", target.config.display()))
}

// ============================================================================
// check
// ============================================================================

fn check(path: &Path, out: &mut dyn Write) -> Result<()> {
    let config = read_config(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))?;
    let report = check_config(&config);

    for warning in &report.warnings {
        writeln!(out, "{} {}", "warning:".yellow().bold(), warning)?;
    }
    for error in &report.errors {
        writeln!(out, "{} {}", "error:".red().bold(), error)?;
    }
    if !report.is_valid() {
        bail!("{} error(s) in {}", report.errors.len(), path.display());
    }

    writeln!(
        out,
        "{} {} is valid ({} model(s))",
        "✓".green().bold(),
        path.display(),
        config.models.len()
    )?;
    for model in &config.models {
        writeln!(
            out,
            "  {} {} -> {} ({} column(s), {} field(s))",
            "•".dimmed(),
            model.alias.cyan(),
            model.table,
            model.columns.len(),
            model.fields.len()
        )?;
    }
    Ok(())
}

// ============================================================================
// list
// ============================================================================

fn list(args: &ListArgs, out: &mut dyn Write) -> Result<()> {
    let admin = load(&args.target)?;
    let mut table = admin.table(&args.target.alias, args.request(), &args.scopes)?;

    match args.per_page {
        Some(0) => {
            table.disable_pagination();
        }
        Some(per_page) => {
            let page_name = table.page_name().to_string();
            table.paginate(per_page, page_name);
        }
        None => {}
    }
    table.initialize()?;

    if args.json {
        let payload = table.to_value()?;
        writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
    } else {
        writeln!(out, "{}", table.render()?)?;
    }
    Ok(())
}

// ============================================================================
// create / edit
// ============================================================================

fn save(
    target: &Target,
    id: Option<&str>,
    values: &[(String, String)],
    out: &mut dyn Write,
) -> Result<()> {
    let admin = load(target)?;
    let mut form = admin.form(&target.alias, id)?;
    let (_, configuration) = admin.model(&target.alias)?;

    let outcome = form.save_form(&configuration, &form_request(values))?;
    let verb = if id.is_some() { "Updated" } else { "Created" };

    match outcome {
        SaveOutcome::Saved => {
            writeln!(
                out,
                "{} {} {} #{}",
                "✓".green().bold(),
                verb,
                configuration.alias().cyan(),
                saved_key(&form)
            )?;
            if admin.persist()? {
                if let Some(path) = admin.data_path() {
                    writeln!(out, "  {} {}", "wrote".dimmed(), path.display())?;
                }
            } else {
                writeln!(
                    out,
                    "  {}",
                    "no data file configured, changes were not written".yellow()
                )?;
            }
            Ok(())
        }
        SaveOutcome::Invalid(errors) => {
            for (field, messages) in errors.iter() {
                for message in messages {
                    writeln!(out, "{} {}: {}", "✗".red().bold(), field.bold(), message)?;
                }
            }
            bail!("{} field(s) failed validation", errors.len())
        }
        SaveOutcome::Aborted(event) => {
            bail!("Save of {} aborted by a '{}' listener", configuration.alias(), event)
        }
    }
}

fn saved_key(form: &FormDefault) -> String {
    form.model()
        .and_then(|model| model.borrow().key().map(display_value))
        .unwrap_or_default()
}

// ============================================================================
// form
// ============================================================================

fn form(target: &Target, id: Option<&str>, out: &mut dyn Write) -> Result<()> {
    let admin = load(target)?;
    let mut form = admin.form(&target.alias, id)?;
    writeln!(out, "{}", form.render()?)?;
    Ok(())
}
