//! Variable substitution over JSON template trees
//!
//! Templates are ordinary [`serde_json::Value`]s. Strings anywhere in the tree
//! may reference variables as `$name` or `${name}`; `$$` produces a literal
//! dollar sign. Unknown variables are left in place untouched, so a template
//! written for one notification kind still renders for another.
//!
//! Mapping keys are never substituted, only values.

use super::NotificationContext;
use chrono::{DateTime, Local};
use serde_json::{Map, Value};

/// Flat variable set a template is rendered against
pub type Variables = Map<String, Value>;

/// Build the variable set for one notification
///
/// Starts from the timestamp fields (`timestamp`, `timestamp_iso`,
/// `timestamp_unix`), overlays every context key, then adds `<key>_json`
/// (pretty, two-space indent) and `<key>_string` (compact) for each
/// structured value.
pub fn build_variables(context: &NotificationContext, now: DateTime<Local>) -> Variables {
    let mut vars = Variables::new();
    vars.insert(
        "timestamp".to_string(),
        Value::String(now.format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    vars.insert("timestamp_iso".to_string(), Value::String(now.to_rfc3339()));
    vars.insert("timestamp_unix".to_string(), Value::from(now.timestamp()));

    for (key, value) in context.iter() {
        vars.insert(key.clone(), value.clone());
    }

    let structured: Vec<(String, Value)> = vars
        .iter()
        .filter(|(_, v)| v.is_object() || v.is_array())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for (key, value) in structured {
        let pretty = serde_json::to_string_pretty(&value).unwrap_or_default();
        let compact = value.to_string();
        vars.insert(format!("{key}_json"), Value::String(pretty));
        vars.insert(format!("{key}_string"), Value::String(compact));
    }

    vars
}

/// Substitute variables throughout a template tree
pub fn substitute(template: &Value, vars: &Variables) -> Value {
    match template {
        Value::String(s) => Value::String(render_str(s, vars)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, vars)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, vars)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Text a variable contributes when spliced into a string
///
/// Strings are used verbatim, `null` becomes empty, other scalars use their
/// JSON spelling, structured values are compact JSON.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Substitute variables in a single string
pub fn render_str(template: &str, vars: &Variables) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        if let Some(inner) = after.strip_prefix('{') {
            let len = identifier_len(inner);
            if len > 0 && inner[len..].starts_with('}') {
                let name = &inner[..len];
                match vars.get(name) {
                    Some(value) => out.push_str(&scalar_text(value)),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &inner[len + 1..];
                continue;
            }
        } else {
            let len = identifier_len(after);
            if len > 0 {
                let name = &after[..len];
                match vars.get(name) {
                    Some(value) => out.push_str(&scalar_text(value)),
                    None => {
                        out.push('$');
                        out.push_str(name);
                    }
                }
                rest = &after[len..];
                continue;
            }
        }

        // Not a placeholder
        out.push('$');
        rest = after;
    }

    out.push_str(rest);
    out
}

/// Length of the ASCII identifier (`[A-Za-z_][A-Za-z0-9_]*`) at the start of `s`
fn identifier_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return 0,
    }
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count()
}
