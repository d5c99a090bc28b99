//! dotenv codec
//!
//! Reading: `KEY=value` lines, `#` comments and blank lines are skipped, surrounding quotes are
//! removed. Every value is a string.
//!
//! Writing: one `KEY="value"` line per leaf. Nested keys are either flattened with `__`
//! ([DotenvStyle::Underscore]) or written as json (`KEY='{"a":1}'`, [DotenvStyle::Json]).
use crate::value::{Map, Value};

/// Separator for flattened keys
pub const KEY_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DotenvStyle {
    /// `section__key="value"`
    #[default]
    Underscore,
    /// `section='{"key":"value"}'`
    Json,
}

/// Parse dotenv text into a flat object of strings
pub fn parse_env(content: &str) -> Map {
    let mut result = Map::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        result.insert(key.to_string(), Value::String(unquote(value.trim())));
    }

    result
}

fn unquote(value: &str) -> String {
    let quoted = |quote: char| value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote);

    if quoted('"') {
        unescape(&value[1..value.len() - 1])
    } else if quoted('\'') {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => result.push('"'),
            Some('n') => result.push('\n'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

fn escape(value: &str) -> String {
    value
        .replace('"', "\\\"")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}

/// Render `tree` as dotenv lines
///
/// Null values are skipped. Anything but an object renders no lines.
pub fn generate_dotenv_lines(tree: &Value, style: DotenvStyle, prefix: Option<&str>) -> Vec<String> {
    let mut lines = vec![];
    if let Value::Object(map) = tree {
        write_entries(&mut lines, map, prefix.unwrap_or_default(), style);
    }
    lines
}

/// Render `tree` as dotenv text (no trailing newline)
pub fn generate_dotenv(tree: &Value, style: DotenvStyle, prefix: Option<&str>) -> String {
    generate_dotenv_lines(tree, style, prefix).join("\n")
}

fn write_entries(lines: &mut Vec<String>, map: &Map, prefix: &str, style: DotenvStyle) {
    for (key, value) in map {
        let key = format!("{prefix}{key}");
        match (value, style) {
            (Value::Null, _) => {}
            (Value::Object(nested), DotenvStyle::Underscore) => {
                write_entries(lines, nested, &format!("{key}{KEY_SEPARATOR}"), style)
            }
            (Value::Object(_) | Value::Array(_), DotenvStyle::Json) => {
                lines.push(format!("{key}='{}'", value.to_json()))
            }
            (scalar, _) => lines.push(format!("{key}=\"{}\"", escape(&scalar.to_text()))),
        }
    }
}
