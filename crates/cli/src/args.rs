//! Command-line arguments

use clap::{Args, Parser, Subcommand, ValueEnum};
use perch_core::Request;
use std::path::PathBuf;

/// Perch Admin command line
#[derive(Debug, Parser)]
#[command(name = "perch", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load and validate an admin configuration
    Check {
        /// Admin configuration file
        config: PathBuf,
    },

    /// Render the listing of a model
    List(ListArgs),

    /// Create a record through the form save pipeline
    Create(SaveArgs),

    /// Update an existing record through the form save pipeline
    Edit {
        #[command(flatten)]
        target: Target,

        /// Key of the record
        id: String,

        /// Submitted form input
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
    },

    /// Render the create form, or the edit form of a record
    Form {
        #[command(flatten)]
        target: Target,

        /// Key of the record to edit
        id: Option<String>,
    },
}

/// Configuration file, model alias and data file shared by model commands
#[derive(Debug, Clone, Args)]
pub struct Target {
    /// Admin configuration file
    pub config: PathBuf,

    /// Model alias
    pub alias: String,

    /// JSON data file (overrides `[admin] data`)
    #[arg(long, env = "PERCH_DATA")]
    pub data: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub target: Target,

    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Page size (0 lists every row)
    #[arg(long)]
    pub per_page: Option<usize>,

    /// Request input for field and column filters (`filter[title]=x`)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    /// Named scope to apply
    #[arg(long = "scope", value_name = "NAME")]
    pub scopes: Vec<String>,

    /// Orderable column to sort by
    #[arg(long)]
    pub order: Option<String>,

    #[arg(long, value_enum, default_value_t = SortDirection::Asc)]
    pub dir: SortDirection,

    /// Print the view payload as JSON instead of HTML
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    /// Request seen by the listing
    pub fn request(&self) -> Request {
        let mut request = Request::new();
        request.insert("page", self.page);
        for (key, value) in &self.filters {
            request.insert(key.clone(), value.clone());
        }
        if let Some(order) = &self.order {
            request.insert("order", order.clone());
            request.insert("dir", self.dir.as_str());
        }
        request
    }
}

#[derive(Debug, Clone, Args)]
pub struct SaveArgs {
    #[command(flatten)]
    pub target: Target,

    /// Submitted form input
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Form input as submitted by a browser: every value is a string
pub fn form_request(values: &[(String, String)]) -> Request {
    Request::from_pairs(values.iter().map(|(k, v)| (k.clone(), v.clone())))
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("name=Ada=Lovelace").unwrap(),
            ("name".to_string(), "Ada=Lovelace".to_string())
        );
        assert_eq!(parse_key_value("email=").unwrap().1, "");
        assert!(parse_key_value("=x").is_err());
        assert!(parse_key_value("name").is_err());
    }

    #[test]
    fn test_list_request() {
        let cli = Cli::try_parse_from([
            "perch", "list", "admin.toml", "posts", "--page", "2", "--filter", "status=draft",
            "--order", "title", "--dir", "desc",
        ])
        .unwrap();
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };

        let request = args.request();
        assert_eq!(request.get("page"), Some(&json!(2)));
        assert_eq!(request.get("status"), Some(&json!("draft")));
        assert_eq!(request.get("dir"), Some(&json!("desc")));
    }

    #[test]
    fn test_direction_only_with_order() {
        let cli = Cli::try_parse_from(["perch", "list", "admin.toml", "posts"]).unwrap();
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert!(!args.request().has("dir"));
    }

    #[test]
    fn test_edit_positionals() {
        let cli = Cli::try_parse_from([
            "perch", "edit", "admin.toml", "users", "7", "--set", "name=Grace",
        ])
        .unwrap();
        match cli.command {
            Commands::Edit { target, id, values } => {
                assert_eq!(target.alias, "users");
                assert_eq!(id, "7");
                assert_eq!(values.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
