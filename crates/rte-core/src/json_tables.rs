use serde_json::{Map, Value};

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn flush_rows(rendered: &mut String, rows: &mut Vec<String>) {
    if rows.is_empty() {
        return;
    }
    rendered.push_str("<table>");
    for row in rows.drain(..) {
        rendered.push_str(&row);
    }
    rendered.push_str("</table>");
}

/// Render a JSON error report as HTML tables for a ticket body.
///
/// Scalars become key/value rows, nested objects get an `<h4>` heading and
/// their own tables, and arrays render as a `<pre>` block of one item per line.
pub fn render_json_tables(object: &Map<String, Value>) -> String {
    let mut rendered = String::new();
    let mut rows = Vec::new();
    for (key, value) in object {
        match value {
            Value::Object(nested) => {
                flush_rows(&mut rendered, &mut rows);
                rendered.push_str(&format!("<h4>{}</h4>", escape_html(key)));
                rendered.push_str(&render_json_tables(nested));
            }
            Value::Array(items) => {
                flush_rows(&mut rendered, &mut rows);
                rendered.push_str(&format!("<h4>{}</h4>\n<pre>\n", escape_html(key)));
                for item in items {
                    rendered.push_str(&escape_html(&scalar_text(item)));
                    rendered.push('\n');
                }
                rendered.push_str("</pre>\n");
            }
            scalar => rows.push(format!(
                "<tr><th align=\"left\">{}</th><td align=\"left\">{}</td></tr>",
                escape_html(key),
                escape_html(&scalar_text(scalar))
            )),
        }
    }
    flush_rows(&mut rendered, &mut rows);
    rendered
}
