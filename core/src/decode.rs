//! Decoding of successful responses.

use serde_json::Value;

use crate::case::{convert_keys_deep, Case};
use crate::http::HttpResponse;

/// Free-form response members whose keys are left as the server sent them.
const FREE_FORM_KEYS: &[&str] = &["metadata"];

/// Body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// `Content-Length: 0`. Not the same as a JSON `null` body.
    NoContent,
    /// Parsed JSON with camelCase keys.
    Json(Value),
    /// Raw MIME messages, and bodies that failed to parse as JSON.
    Text(String),
}

impl Decoded {
    pub fn into_json(self) -> Option<Value> {
        match self {
            Decoded::Json(value) => Some(value),
            _ => None,
        }
    }
}

pub fn decode(response: &HttpResponse) -> Decoded {
    if response.header("content-length").map(str::trim) == Some("0") {
        return Decoded::NoContent;
    }
    let is_rfc822 = response
        .header("content-type")
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("message/rfc822"));
    let text = response.text();
    if is_rfc822 {
        return Decoded::Text(text);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Decoded::Json(convert_keys_deep(&value, Case::Camel, FREE_FORM_KEYS)),
        Err(_) => Decoded::Text(text),
    }
}
