//! Brace-style name templates
//!
//! Subject lines and attachment file names are short one-line templates
//! such as `"Server status for {host} [{now_str}].zip"`. Placeholders are
//! looked up in a JSON context; dotted names walk into nested objects
//! (`{config.from}`). `{{` and `}}` produce literal braces.

use anyhow::{Result, anyhow, bail};
use serde_json::Value;

/// Substitute every `{name}` in `template` with its value from `context`.
///
/// Unknown names and unbalanced braces are errors, never blanks.
pub fn format_braces(template: &str, context: &Value) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    bail!("Unclosed '{{' in template {template:?}");
                }
                let name = name.trim();
                let value = lookup(context, name)
                    .ok_or_else(|| anyhow!("Unknown field '{name}' in template {template:?}"))?;
                output.push_str(&display_value(value));
            }
            '}' => bail!("Single '}}' encountered in template {template:?}"),
            c => output.push(c),
        }
    }

    Ok(output)
}

fn lookup<'a>(context: &'a Value, name: &str) -> Option<&'a Value> {
    if name.is_empty() {
        return None;
    }
    name.split('.').try_fold(context, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Value {
        json!({
            "host": "web-01",
            "now_str": "Sun Oct 18 09:30:00 2026",
            "label_slug": "disk-usage",
            "returncode": 0,
            "attachment_only": false,
            "config": { "from": "ops@example.com" },
            "command_results": [{ "label": "Disk" }],
        })
    }

    #[test]
    fn test_substitutes_fields() {
        let rendered =
            format_braces("Server status for {host} [{now_str}].zip", &context()).unwrap();
        assert_eq!(rendered, "Server status for web-01 [Sun Oct 18 09:30:00 2026].zip");
    }

    #[test]
    fn test_dotted_and_indexed_lookup() {
        let ctx = context();
        assert_eq!(format_braces("{config.from}", &ctx).unwrap(), "ops@example.com");
        assert_eq!(format_braces("{command_results.0.label}", &ctx).unwrap(), "Disk");
    }

    #[test]
    fn test_non_string_values() {
        let ctx = context();
        assert_eq!(
            format_braces("{label_slug}-{returncode}.txt", &ctx).unwrap(),
            "disk-usage-0.txt"
        );
        assert_eq!(format_braces("{attachment_only}", &ctx).unwrap(), "False");
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(format_braces("{{{host}}}", &context()).unwrap(), "{web-01}");
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let err = format_braces("{nope}.txt", &context()).unwrap_err();
        assert!(err.to_string().contains("Unknown field 'nope'"));
    }

    #[test]
    fn test_unbalanced_braces_are_errors() {
        assert!(format_braces("{host", &context()).is_err());
        assert!(format_braces("host}", &context()).is_err());
        assert!(format_braces("{}", &context()).is_err());
    }
}
