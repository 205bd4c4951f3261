//! Builtin HTML views for displays, extensions and columns

use perch_core::template::{array_field, bool_field, str_field};
use perch_core::types::escape_html;
use perch_core::{Sections, Templates, Value};
use std::fmt::Write;

/// Register the display, extension and column views
pub fn register_default_views(templates: &mut Templates) -> &mut Templates {
    templates
        .register("display.default", |data, sections| Ok(render_default(data, sections)))
        .register("display.table", |data, sections| Ok(render_table(data, sections)))
        .register("display.extensions.actions", |data, _| Ok(render_actions(data)))
        .register("display.extensions.column_filters", |data, _| {
            Ok(render_column_filters(data))
        })
        .register("column.text", |data, _| Ok(render_text(data)))
        .register("column.link", |data, _| Ok(render_link(data)))
        .register("column.custom", |data, _| Ok(render_custom(data)))
        .register("column.control", |data, _| Ok(render_control(data)))
}

/// Html attributes with a leading space, or nothing
fn attributes(data: &Value) -> String {
    match str_field(data, "attributes") {
        "" => String::new(),
        attrs => format!(" {}", attrs),
    }
}

fn heading(data: &Value, sections: &Sections) -> String {
    let mut html = String::new();
    let title = str_field(data, "title");
    if !title.is_empty() {
        let _ = write!(html, "<h1>{}</h1>", escape_html(title));
    }
    html.push_str(&sections.yield_slot("panel.heading"));
    html
}

// ============================================================================
// Displays
// ============================================================================

fn render_default(data: &Value, sections: &Sections) -> String {
    format!(
        "<div class=\"panel\"{}>{}<div class=\"panel-body\">{}</div><div class=\"panel-footer\">{}</div></div>",
        attributes(data),
        heading(data, sections),
        sections.yield_slot("panel.body"),
        sections.yield_slot("panel.footer"),
    )
}

fn render_table(data: &Value, sections: &Sections) -> String {
    let mut html = String::from("<div class=\"panel\">");
    html.push_str(&heading(data, sections));

    if bool_field(data, "creatable") {
        let _ = write!(
            html,
            "<a class=\"btn btn-primary\" href=\"{}\">{}</a>",
            escape_html(str_field(data, "create_url")),
            escape_html(str_field(data, "new_entry_button_text")),
        );
    }

    for renderable in array_field(data, "renderables") {
        html.push_str(str_field(renderable, "html"));
    }

    let _ = write!(html, "<table{}><thead><tr>", attributes(data));
    for header in array_field(data, "headers") {
        let width = match str_field(header, "width") {
            "" => String::new(),
            w => format!(" width=\"{}\"", escape_html(w)),
        };
        let ordered = match header.get("ordered").and_then(Value::as_str) {
            Some(dir) => format!(" data-order=\"{}\"", dir),
            None => String::new(),
        };
        let _ = write!(
            html,
            "<th{}{}>{}</th>",
            width,
            ordered,
            escape_html(str_field(header, "title"))
        );
    }
    html.push_str("</tr></thead><tbody>");

    for row in array_field(data, "rows") {
        html.push_str("<tr>");
        for cell in row.as_array().map(Vec::as_slice).unwrap_or(&[]) {
            let _ = write!(html, "<td>{}</td>", cell.as_str().unwrap_or(""));
        }
        html.push_str("</tr>");
    }

    let _ = write!(
        html,
        "</tbody><tfoot>{}</tfoot></table>",
        sections.yield_slot("table.footer")
    );

    if let Some(page) = data.get("pagination").filter(|p| !p.is_null()) {
        let _ = write!(
            html,
            "<nav class=\"pagination\">Page {} of {}</nav>",
            page["current_page"], page["last_page"]
        );
    }

    let _ = write!(
        html,
        "<div class=\"panel-footer\">{}</div></div>",
        sections.yield_slot("panel.footer")
    );
    html
}

// ============================================================================
// Extensions
// ============================================================================

fn render_actions(data: &Value) -> String {
    let actions = array_field(data, "actions");
    if actions.is_empty() {
        return String::new();
    }

    let mut html = String::from("<div class=\"display-actions\">");
    for action in actions {
        let _ = write!(
            html,
            "<form action=\"{}\" method=\"{}\"><button type=\"submit\" name=\"action\" value=\"{}\">{}</button></form>",
            escape_html(str_field(action, "url")),
            escape_html(str_field(action, "method")),
            escape_html(str_field(action, "name")),
            escape_html(str_field(action, "title")),
        );
    }
    html.push_str("</div>");
    html
}

fn render_column_filters(data: &Value) -> String {
    let filters = array_field(data, "filters");
    if filters.is_empty() {
        return String::new();
    }

    let mut html = String::from("<tr class=\"column-filters\">");
    for filter in filters {
        let _ = write!(
            html,
            "<td><form action=\"{}\" method=\"get\"><input type=\"text\" name=\"{}\" value=\"{}\" placeholder=\"{}\"></form></td>",
            escape_html(str_field(filter, "action")),
            escape_html(str_field(filter, "name")),
            escape_html(str_field(filter, "value")),
            escape_html(str_field(filter, "placeholder")),
        );
    }
    html.push_str("</tr>");
    html
}

// ============================================================================
// Columns
// ============================================================================

fn render_text(data: &Value) -> String {
    format!(
        "<span{}>{}</span>{}",
        attributes(data),
        escape_html(str_field(data, "value")),
        str_field(data, "append"),
    )
}

fn render_link(data: &Value) -> String {
    let value = escape_html(str_field(data, "value"));
    let inner = match str_field(data, "url") {
        "" => value,
        url => format!("<a href=\"{}\">{}</a>", escape_html(url), value),
    };
    format!("<span{}>{}</span>{}", attributes(data), inner, str_field(data, "append"))
}

fn render_custom(data: &Value) -> String {
    format!(
        "<span{}>{}</span>{}",
        attributes(data),
        str_field(data, "value"),
        str_field(data, "append"),
    )
}

fn render_control(data: &Value) -> String {
    let mut html = String::new();
    if let Some(url) = data.get("edit_url").and_then(Value::as_str) {
        let _ = write!(html, "<a class=\"btn btn-default\" href=\"{}\">Edit</a>", escape_html(url));
    }
    if let Some(url) = data.get("delete_url").and_then(Value::as_str) {
        let _ = write!(
            html,
            "<form action=\"{}\" method=\"post\"><button class=\"btn btn-danger\">Delete</button></form>",
            escape_html(url)
        );
    }
    if let Some(url) = data.get("restore_url").and_then(Value::as_str) {
        let _ = write!(
            html,
            "<form action=\"{}\" method=\"post\"><button class=\"btn btn-warning\">Restore</button></form>",
            escape_html(url)
        );
    }
    html.push_str(str_field(data, "append"));
    html
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::TemplateEngine;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn templates() -> Templates {
        let mut templates = Templates::new("admin");
        register_default_views(&mut templates);
        templates
    }

    #[test]
    fn test_empty_extensions_render_nothing() {
        let templates = templates();
        assert_eq!(
            templates
                .render_view("display.extensions.actions", &json!({"actions": []}))
                .unwrap(),
            ""
        );
        assert_eq!(
            templates
                .render_view("display.extensions.column_filters", &json!({"filters": []}))
                .unwrap(),
            ""
        );
    }

    #[test]
    fn test_text_column_escapes_value() {
        let html = templates()
            .render_view("column.text", &json!({"value": "<b>", "attributes": "", "append": ""}))
            .unwrap();
        assert_eq!(html, "<span>&lt;b&gt;</span>");
    }

    #[test]
    fn test_control_renders_available_buttons() {
        let html = templates()
            .render_view(
                "column.control",
                &json!({"edit_url": "/admin/users/1/edit", "delete_url": null, "restore_url": null}),
            )
            .unwrap();
        assert!(html.contains("/admin/users/1/edit"));
        assert!(!html.contains("Delete"));
    }

    #[test]
    fn test_table_yields_sections() {
        let mut sections = Sections::new();
        sections.inject("panel.footer", "<p>footer</p>");
        let html = templates()
            .render(
                "display.table",
                &json!({"title": "Users", "headers": [{"title": "Name"}], "rows": [["<span>Ada</span>"]]}),
                &sections,
            )
            .unwrap();
        assert!(html.contains("<h1>Users</h1>"));
        assert!(html.contains("<th>Name</th>"));
        assert!(html.contains("<td><span>Ada</span></td>"));
        assert!(html.contains("<p>footer</p>"));
    }
}
