//! Recursive camelCase / snake_case key conversion for JSON values.
//!
//! # Design
//! The API speaks snake_case on the wire while the client normalizes every
//! decoded payload to camelCase. Conversion only ever touches object keys:
//! strings, numbers, booleans and nulls pass through unchanged, arrays are
//! walked element by element.
//!
//! Free-form maps (user metadata, for instance) must keep their keys
//! byte-for-byte, so callers can name keys to exclude. [`convert_keys`]
//! applies the exclusion list at the top level only; [`convert_keys_deep`]
//! applies it at every depth.

use serde_json::{Map, Value};

/// Target casing for [`convert_keys`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Camel,
    Snake,
}

impl Case {
    /// Convert a single key.
    pub fn apply(self, key: &str) -> String {
        match self {
            Case::Camel => to_camel_case(key),
            Case::Snake => to_snake_case(key),
        }
    }
}

/// Convert object keys recursively. Keys listed in `exclude` are skipped at
/// the top level: both the key and its value are copied verbatim.
pub fn convert_keys(value: &Value, case: Case, exclude: &[&str]) -> Value {
    convert(value, case, exclude, false)
}

/// Like [`convert_keys`], but the exclusion list is checked at every depth.
pub fn convert_keys_deep(value: &Value, case: Case, exclude: &[&str]) -> Value {
    convert(value, case, exclude, true)
}

fn convert(value: &Value, case: Case, exclude: &[&str], deep: bool) -> Value {
    let nested_exclude: &[&str] = if deep { exclude } else { &[] };
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                if exclude.contains(&key.as_str()) {
                    out.insert(key.clone(), inner.clone());
                    continue;
                }
                out.insert(case.apply(key), convert(inner, case, nested_exclude, deep));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| convert(item, case, nested_exclude, deep))
                .collect(),
        ),
        other => other.clone(),
    }
}

pub fn to_snake_case(key: &str) -> String {
    words(key)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, word) in words(key).iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Split a key into words on separators, lower→upper transitions,
/// letter→digit transitions and acronym boundaries (`HTMLParser`).
fn words(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() && c.is_ascii_digit())
                || (prev.is_ascii_digit() && c.is_uppercase())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
