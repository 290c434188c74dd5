//! Field normalization: plain-text cleanup, summary HTML filtering, and
//! coercions for loosely-typed import values.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde_json::Value;

/// Tags permitted in company summaries. Everything else is stripped; event
/// handlers, scripts and unknown attributes never survive the cleaner.
const SUMMARY_TAGS: &[&str] = &[
    "a", "abbr", "b", "blockquote", "br", "code", "del", "em", "h1", "h2", "h3", "h4", "h5", "h6",
    "hr", "i", "img", "li", "ol", "p", "pre", "s", "span", "strong", "sub", "sup", "u", "ul",
];

// Built once; ammonia's Builder is immutable after configuration.
static SUMMARY_CLEANER: Lazy<ammonia::Builder<'static>> = Lazy::new(|| {
    let mut cleaner = ammonia::Builder::default();
    cleaner.tags(SUMMARY_TAGS.iter().copied().collect::<HashSet<_>>());
    cleaner.link_rel(Some("noopener noreferrer"));
    cleaner
});

/// Sanitize rich text through the restrictive allowed-tag filter. The
/// result is safe to embed as markup without further escaping.
pub fn rich_text(input: &str) -> String {
    SUMMARY_CLEANER.clean(input).to_string()
}

/// Escape plain text for insertion into an HTML document.
pub fn escape(input: &str) -> String {
    ammonia::clean_text(input)
}

/// Sanitize a single-line text field: strip tags, drop control characters,
/// collapse whitespace runs, trim.
pub fn text_field(input: &str) -> String {
    let mut stripped = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => {
                if c.is_whitespace() {
                    stripped.push(' ');
                } else if !c.is_control() {
                    stripped.push(c);
                }
            }
            _ => {}
        }
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Coerce an integer-like JSON value. Numeric strings parse, floats
/// truncate, anything else is 0. No range clamp here.
pub fn int_like(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                .unwrap_or(0)
        }
        Value::Bool(b) => *b as i64,
        _ => 0,
    }
}

/// Coerce a boolean-like JSON value. Empty strings and `"0"` are false;
/// any other non-empty string is true. Numbers are true when non-zero.
pub fn bool_like(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

/// Coerce a value expected to be a sequence of strings. A lone scalar
/// becomes a one-element sequence; nested structures are dropped.
pub fn string_seq(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    }
}
