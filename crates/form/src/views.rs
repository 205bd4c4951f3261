//! Builtin HTML views for forms, buttons and elements

use perch_core::template::{array_field, bool_field, str_field};
use perch_core::types::{display_value, escape_html};
use perch_core::{Templates, Value};
use std::fmt::Write;

/// Register the form, button and element views
pub fn register_form_views(templates: &mut Templates) -> &mut Templates {
    templates
        .register("form.default", |data, _| Ok(render_form(data)))
        .register("form.buttons", |data, _| Ok(render_buttons(data)))
        .register("form.element.group", |data, _| {
            Ok(format!(
                "<div class=\"form-elements\">{}</div>",
                joined(array_field(data, "items"))
            ))
        })
        .register("form.element.text", |data, _| Ok(render_input(data, "text")))
        .register("form.element.number", |data, _| Ok(render_input(data, "number")))
        .register("form.element.upload", |data, _| Ok(render_input(data, "file")))
        .register("form.element.hidden", |data, _| Ok(render_hidden(data)))
        .register("form.element.textarea", |data, _| Ok(render_textarea(data)))
        .register("form.element.checkbox", |data, _| Ok(render_checkbox(data)))
        .register("form.element.select", |data, _| Ok(render_select(data)))
}

fn joined(items: &[Value]) -> String {
    items.iter().filter_map(Value::as_str).collect()
}

fn value_of(data: &Value) -> String {
    data.get("value").map(display_value).unwrap_or_default()
}

fn label(data: &Value) -> String {
    let marker = if bool_field(data, "required") { " *" } else { "" };
    format!(
        "<label for=\"{}\">{}{}</label>",
        escape_html(str_field(data, "name")),
        escape_html(str_field(data, "label")),
        marker
    )
}

fn help(data: &Value) -> String {
    match str_field(data, "help") {
        "" => String::new(),
        text => format!("<p class=\"help-block\">{}</p>", escape_html(text)),
    }
}

fn group(data: &Value, control: String) -> String {
    format!("<div class=\"form-group\">{}{}{}</div>", label(data), control, help(data))
}

// ============================================================================
// Form
// ============================================================================

fn render_form(data: &Value) -> String {
    let mut html = String::new();

    if let Some(errors) = data.get("errors").and_then(Value::as_object).filter(|e| !e.is_empty()) {
        html.push_str("<ul class=\"alert alert-danger\">");
        for messages in errors.values() {
            for message in messages.as_array().map(Vec::as_slice).unwrap_or(&[]) {
                let _ = write!(html, "<li>{}</li>", escape_html(message.as_str().unwrap_or("")));
            }
        }
        html.push_str("</ul>");
    }

    let attributes = match str_field(data, "attributes") {
        "" => String::new(),
        attrs => format!(" {}", attrs),
    };
    let _ = write!(
        html,
        "<form{}>{}{}</form>",
        attributes,
        joined(array_field(data, "items")),
        str_field(data, "buttons"),
    );
    html
}

fn render_buttons(data: &Value) -> String {
    let mut html = String::from("<div class=\"form-buttons\">");
    let _ = write!(
        html,
        "<button type=\"submit\" name=\"next_action\" value=\"save_and_continue\">{}</button>",
        escape_html(str_field(data, "save"))
    );
    if let Some(text) = data.get("save_and_close").and_then(Value::as_str) {
        let _ = write!(
            html,
            "<button type=\"submit\" name=\"next_action\" value=\"save_and_close\">{}</button>",
            escape_html(text)
        );
    }
    if let Some(cancel) = data.get("cancel").filter(|c| !c.is_null()) {
        let _ = write!(
            html,
            "<a class=\"btn btn-link\" href=\"{}\">{}</a>",
            escape_html(str_field(cancel, "url")),
            escape_html(str_field(cancel, "text"))
        );
    }
    if let Some(delete) = data.get("delete").filter(|d| !d.is_null()) {
        let _ = write!(
            html,
            "<button type=\"submit\" formaction=\"{}\" class=\"btn btn-danger\">{}</button>",
            escape_html(str_field(delete, "url")),
            escape_html(str_field(delete, "text"))
        );
    }
    html.push_str("</div>");
    html
}

// ============================================================================
// Elements
// ============================================================================

fn render_input(data: &Value, input_type: &str) -> String {
    let value = match input_type {
        "file" => String::new(),
        _ => format!(" value=\"{}\"", escape_html(&value_of(data))),
    };
    group(
        data,
        format!(
            "<input type=\"{}\" id=\"{name}\" name=\"{name}\"{}>",
            input_type,
            value,
            name = escape_html(str_field(data, "name")),
        ),
    )
}

fn render_hidden(data: &Value) -> String {
    format!(
        "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
        escape_html(str_field(data, "name")),
        escape_html(&value_of(data))
    )
}

fn render_textarea(data: &Value) -> String {
    group(
        data,
        format!(
            "<textarea id=\"{name}\" name=\"{name}\">{}</textarea>",
            escape_html(&value_of(data)),
            name = escape_html(str_field(data, "name")),
        ),
    )
}

fn render_checkbox(data: &Value) -> String {
    let checked = if bool_field(data, "checked") { " checked" } else { "" };
    group(
        data,
        format!(
            "<input type=\"checkbox\" id=\"{name}\" name=\"{name}\" value=\"1\"{}>",
            checked,
            name = escape_html(str_field(data, "name")),
        ),
    )
}

fn render_select(data: &Value) -> String {
    let current = value_of(data);
    let mut options = String::new();
    for option in array_field(data, "options") {
        let value = str_field(option, "value");
        let selected = if value == current { " selected" } else { "" };
        let _ = write!(
            options,
            "<option value=\"{}\"{}>{}</option>",
            escape_html(value),
            selected,
            escape_html(str_field(option, "label"))
        );
    }
    group(
        data,
        format!(
            "<select id=\"{name}\" name=\"{name}\">{}</select>",
            options,
            name = escape_html(str_field(data, "name")),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::TemplateEngine;
    use serde_json::json;

    fn templates() -> Templates {
        let mut templates = Templates::new("admin");
        register_form_views(&mut templates);
        templates
    }

    #[test]
    fn test_select_marks_current_option() {
        let html = templates()
            .render_view(
                "form.element.select",
                &json!({
                    "name": "role",
                    "label": "Role",
                    "value": "admin",
                    "options": [{"value": "user", "label": "User"}, {"value": "admin", "label": "Admin"}],
                }),
            )
            .unwrap();
        assert!(html.contains("<option value=\"admin\" selected>Admin</option>"));
        assert!(html.contains("<option value=\"user\">User</option>"));
    }

    #[test]
    fn test_required_label_marker_and_escaping() {
        let html = templates()
            .render_view(
                "form.element.text",
                &json!({"name": "title", "label": "Title", "value": "<x>", "required": true}),
            )
            .unwrap();
        assert!(html.contains("Title *"));
        assert!(html.contains("value=\"&lt;x&gt;\""));
    }

    #[test]
    fn test_buttons_skip_missing_delete() {
        let html = templates()
            .render_view(
                "form.buttons",
                &json!({"save": "Save", "save_and_close": null, "cancel": null, "delete": null}),
            )
            .unwrap();
        assert!(html.contains(">Save</button>"));
        assert!(!html.contains("btn-danger"));
    }
}
