//! Commands run in-process against a temporary configuration and data file

use perch_cli::{Cli, execute};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CONFIG: &str = r#"
[admin]
title = "Backoffice"
data = "data.json"
per_page = 10

[[models]]
alias = "companies"
table = "companies"

[[models.columns]]
kind = "text"
name = "name"

[[models]]
alias = "users"
table = "users"
title = "Users"
timestamps = true
soft_deletes = true
with = ["company"]

[[models.relations]]
name = "company"
kind = "belongs_to"
table = "companies"

[[models.columns]]
kind = "link"
name = "name"
orderable = true

[models.columns.append]
kind = "text"
name = "company.name"

[[models.columns]]
kind = "text"
name = "email"

[[models.fields]]
kind = "text"
name = "name"
rules = ["required", "max:50"]

[[models.fields]]
kind = "text"
name = "email"
rules = ["required", "email", "unique"]

[[models.fields]]
kind = "select"
name = "role"
default = "user"
options = { user = "User", admin = "Admin" }

[[models.filters]]
field = "role"
title = "Role: :value"

[[models.scopes]]
name = "admins"
column = "role"
value = "admin"
"#;

const DATA: &str = r#"{
    "companies": [{"id": 1, "name": "Initech"}],
    "users": [
        {"id": 1, "name": "Ada", "email": "ada@example.com", "role": "admin", "company_id": 1, "deleted_at": null},
        {"id": 2, "name": "Grace", "email": "grace@example.com", "role": "user", "company_id": 1, "deleted_at": null}
    ]
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("admin.toml"), CONFIG).unwrap();
        std::fs::write(dir.path().join("data.json"), DATA).unwrap();
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("admin.toml")
    }

    fn run(&self, args: &[&str]) -> (anyhow::Result<()>, String) {
        let config = self.config();
        let config = config.to_str().unwrap();
        let argv = std::iter::once("perch")
            .chain(args.iter().map(|&a| if a == "CONFIG" { config } else { a }));
        let cli = Cli::try_parse_from(argv).unwrap();

        let mut out = Vec::new();
        let result = execute(cli.command, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn users(&self) -> Vec<Value> {
        read_table(&self.dir.path().join("data.json"), "users")
    }
}

fn read_table(path: &Path, table: &str) -> Vec<Value> {
    let data: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    data[table].as_array().cloned().unwrap_or_default()
}

#[test]
fn test_check_lists_models() {
    let fixture = Fixture::new();
    let (result, out) = fixture.run(&["check", "CONFIG"]);
    result.unwrap();
    assert!(out.contains("is valid (2 model(s))"));
    assert!(out.contains("users -> users (2 column(s), 3 field(s))"));
}

#[test]
fn test_check_reports_every_error() {
    let fixture = Fixture::new();
    std::fs::write(
        fixture.config(),
        "[[models]]\nalias = \"users\"\ntable = \"\"\n\n[[models.columns]]\nkind = \"chart\"\n",
    )
    .unwrap();

    let (result, out) = fixture.run(&["check", "CONFIG"]);
    assert!(result.unwrap_err().to_string().starts_with("2 error(s)"));
    assert!(out.contains("error: [models.users] Model table cannot be empty"));
    assert!(out.contains("Unknown column kind 'chart'"));
}

#[test]
fn test_list_renders_rows_with_relations() {
    let fixture = Fixture::new();
    let (result, out) = fixture.run(&["list", "CONFIG", "users"]);
    result.unwrap();

    assert!(out.contains("<h1>Users</h1>"));
    assert!(out.contains("<a href=\"/admin/users/1/edit\">Ada</a></span><span>Initech</span>"));
    assert!(out.contains("/admin/users/2/delete"));
    assert!(out.contains("New Entry"));
}

#[test]
fn test_list_json_with_filter_and_order() {
    let fixture = Fixture::new();
    let (result, out) = fixture.run(&[
        "list", "CONFIG", "users", "--json", "--filter", "role=user", "--order", "name", "--dir",
        "desc",
    ]);
    result.unwrap();

    let payload: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(payload["title"], json!("Users | Role: user"));
    assert_eq!(payload["rows"].as_array().unwrap().len(), 1);
    assert_eq!(payload["headers"][0]["ordered"], json!("desc"));
    assert_eq!(payload["pagination"]["total"], json!(1));
}

#[test]
fn test_list_scope_and_page_size() {
    let fixture = Fixture::new();
    let (result, out) = fixture.run(&[
        "list", "CONFIG", "users", "--json", "--scope", "admins", "--per-page", "0",
    ]);
    result.unwrap();

    let payload: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(payload["pagination"], Value::Null);
    assert_eq!(payload["rows"].as_array().unwrap().len(), 1);
    assert!(payload["rows"][0][0].as_str().unwrap().contains("Ada"));
}

#[test]
fn test_list_unknown_model() {
    let fixture = Fixture::new();
    let (result, _) = fixture.run(&["list", "CONFIG", "posts"]);
    assert_eq!(result.unwrap_err().to_string(), "Unknown model alias: posts");
}

#[test]
fn test_create_writes_data_file() {
    let fixture = Fixture::new();
    let (result, out) = fixture.run(&[
        "create", "CONFIG", "users", "--set", "name=Linus", "--set", "email=linus@example.com",
    ]);
    result.unwrap();
    assert!(out.contains("Created users #3"));

    let users = fixture.users();
    assert_eq!(users.len(), 3);
    assert_eq!(users[2]["name"], json!("Linus"));
    assert!(users[2]["created_at"].is_string());
}

#[test]
fn test_create_reports_validation_errors() {
    let fixture = Fixture::new();
    let (result, out) = fixture.run(&["create", "CONFIG", "users", "--set", "email=ada@example.com"]);

    assert_eq!(result.unwrap_err().to_string(), "2 field(s) failed validation");
    assert!(out.contains("name: The Name field is required."));
    assert!(out.contains("email: The Email has already been taken."));
    assert_eq!(fixture.users().len(), 2);
}

#[test]
fn test_edit_updates_in_place() {
    let fixture = Fixture::new();
    let (result, out) = fixture.run(&[
        "edit", "CONFIG", "users", "2", "--set", "name=Grace Hopper", "--set",
        "email=grace@example.com",
    ]);
    result.unwrap();
    assert!(out.contains("Updated users #2"));

    let users = fixture.users();
    assert_eq!(users.len(), 2);
    assert_eq!(users[1]["name"], json!("Grace Hopper"));
    assert_eq!(users[1]["role"], json!("user"));
}

#[test]
fn test_edit_missing_record() {
    let fixture = Fixture::new();
    let (result, _) = fixture.run(&["edit", "CONFIG", "users", "9", "--set", "name=x"]);
    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("has no record with key 9"));
}

#[test]
fn test_form_renders_create_and_edit() {
    let fixture = Fixture::new();

    let (result, out) = fixture.run(&["form", "CONFIG", "users"]);
    result.unwrap();
    assert!(out.contains("name=\"email\""));
    assert!(out.contains("<option value=\"user\" selected>User</option>"));
    assert!(!out.contains("btn-danger"));

    let (result, out) = fixture.run(&["form", "CONFIG", "users", "1"]);
    result.unwrap();
    assert!(out.contains("value=\"ada@example.com\""));
    assert!(out.contains("/admin/users/1/delete"));
}
