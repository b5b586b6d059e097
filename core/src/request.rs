//! Request construction: URL, query string, headers and body.
//!
//! # Design
//! `RequestOptions` is what a resource verb asks for; `RequestBuilder`
//! resolves it against the client configuration into an immutable
//! `HttpRequest`. Nothing here performs I/O.
//!
//! Precedence, lowest to highest:
//! - base URL: client `api_uri` < override `api_uri`
//! - headers: built-in defaults < client headers < call headers < override
//!   headers (names compared case-insensitively)
//! - timeout: client `timeout_secs` < override `timeout`
//!
//! Query and body keys are written in camelCase by callers and sent in
//! snake_case. Free-form `metadata` maps keep their keys.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Map, Value};
use url::Url;

use crate::case::{convert_keys_deep, to_snake_case, Case};
use crate::config::{ClientConfig, Overrides};
use crate::error::Error;
use crate::http::{FormPart, HttpBody, HttpMethod, HttpRequest};

/// Combined body and attachment size from which requests switch to
/// multipart encoding.
pub const MULTIPART_THRESHOLD: usize = 3 * 1024 * 1024;

pub const USER_AGENT: &str = concat!("Nylas Rust SDK v", env!("CARGO_PKG_VERSION"));

/// Query flag sent as `view=expanded` when true.
const EXPANDED_PARAM: &str = "expanded";

/// Body keys whose values are free-form and never case-converted.
const FREE_FORM_KEYS: &[&str] = &["metadata"];

/// A file sent with a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Bytes,
    pub content_id: Option<String>,
    pub is_inline: bool,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content: content.into(),
            content_id: None,
            is_inline: false,
        }
    }
}

/// What a single call asks for, before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub query: Option<Value>,
    pub body: Option<Value>,
    pub attachments: Vec<Attachment>,
    pub overrides: Option<Overrides>,
    /// Top-level query/body keys sent exactly as given.
    pub preserve_keys: Vec<String>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn overrides(mut self, overrides: Option<Overrides>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn preserve_key(mut self, key: impl Into<String>) -> Self {
        self.preserve_keys.push(key.into());
        self
    }
}

/// Resolves `RequestOptions` against a client configuration.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    config: &'a ClientConfig,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a ClientConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, options: &RequestOptions) -> Result<HttpRequest, Error> {
        let overrides = options.overrides.as_ref();

        let url = self.build_url(options)?;
        let mut headers = self.build_headers(options);
        let body = build_body(options)?;
        let has_content_type = headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
        if matches!(body, Some(HttpBody::Json(_))) && !has_content_type {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        let timeout = overrides
            .and_then(|o| o.timeout)
            .unwrap_or_else(|| self.config.timeout());

        Ok(HttpRequest {
            method: options.method,
            url: url.to_string(),
            headers,
            body,
            timeout,
        })
    }

    fn build_url(&self, options: &RequestOptions) -> Result<Url, Error> {
        let base = options
            .overrides
            .as_ref()
            .and_then(|o| o.api_uri.as_deref())
            .unwrap_or(&self.config.api_uri)
            .trim_end_matches('/');
        let raw = format!("{base}{}", options.path);
        let mut url = Url::parse(&raw).map_err(|source| Error::InvalidUrl { url: raw, source })?;

        if let Some(query) = &options.query {
            let pairs = encode_query(query, &options.preserve_keys);
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
        }
        Ok(url)
    }

    fn build_headers(&self, options: &RequestOptions) -> Vec<(String, String)> {
        let overrides = options.overrides.as_ref();
        let api_key = overrides
            .and_then(|o| o.api_key.as_deref())
            .unwrap_or(&self.config.api_key);

        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("Authorization".to_string(), format!("Bearer {api_key}")),
        ];
        let layers = [
            Some(&self.config.headers),
            Some(&options.headers),
            overrides.map(|o| &o.headers),
        ];
        for layer in layers.into_iter().flatten() {
            for (name, value) in layer {
                set_header(&mut headers, name, value);
            }
        }
        headers
    }
}

/// Replace a header case-insensitively, or append it.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(existing) => *existing = (name.to_string(), value.to_string()),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Flatten a query object into ordered `(key, value)` pairs.
///
/// Arrays repeat the key per element, keeping element order. Objects (such
/// as `metadata_pair`) become repeated `key=subkey:subvalue` pairs with the
/// subkeys left as given. `null` values are skipped, and `expanded: true`
/// becomes `view=expanded`.
pub fn encode_query(query: &Value, preserve_keys: &[String]) -> Vec<(String, String)> {
    let Some(map) = query.as_object() else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for (key, value) in map {
        if key == EXPANDED_PARAM {
            if value.as_bool() == Some(true) {
                pairs.push(("view".to_string(), "expanded".to_string()));
            }
            continue;
        }
        let key = if preserve_keys.iter().any(|k| k == key) {
            key.clone()
        } else {
            to_snake_case(key)
        };
        match value {
            Value::Null => {}
            Value::Object(sub) => {
                for (sub_key, sub_value) in sub {
                    if let Some(sub_value) = scalar(sub_value) {
                        pairs.push((key.clone(), format!("{sub_key}:{sub_value}")));
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    if let Some(item) = scalar(item) {
                        pairs.push((key.clone(), item));
                    }
                }
            }
            other => {
                if let Some(value) = scalar(other) {
                    pairs.push((key, value));
                }
            }
        }
    }
    pairs
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn build_body(options: &RequestOptions) -> Result<Option<HttpBody>, Error> {
    if options.body.is_none() && options.attachments.is_empty() {
        return Ok(None);
    }

    let mut exclude: Vec<&str> = FREE_FORM_KEYS.to_vec();
    exclude.extend(options.preserve_keys.iter().map(String::as_str));
    let payload = options.body.clone().unwrap_or_else(|| json!({}));
    let mut payload = convert_keys_deep(&payload, Case::Snake, &exclude);

    if options.attachments.is_empty() {
        return Ok(Some(HttpBody::Json(encode_json(&payload)?)));
    }

    let serialized = encode_json(&payload)?;
    let attachment_bytes: usize = options.attachments.iter().map(|a| a.content.len()).sum();
    let total = serialized.len() + attachment_bytes;

    match payload.as_object_mut() {
        Some(map) if total < MULTIPART_THRESHOLD => {
            map.insert(
                "attachments".to_string(),
                Value::Array(options.attachments.iter().map(inline_attachment).collect()),
            );
            Ok(Some(HttpBody::Json(encode_json(&payload)?)))
        }
        _ => Ok(Some(HttpBody::Multipart(multipart_parts(
            serialized,
            &options.attachments,
        )))),
    }
}

fn encode_json(value: &Value) -> Result<String, Error> {
    serde_json::to_string(value).map_err(Error::Decode)
}

fn inline_attachment(attachment: &Attachment) -> Value {
    let mut entry = Map::new();
    entry.insert("filename".into(), Value::from(attachment.filename.clone()));
    entry.insert("content_type".into(), Value::from(attachment.content_type.clone()));
    entry.insert("content".into(), Value::from(STANDARD.encode(&attachment.content)));
    entry.insert("size".into(), Value::from(attachment.content.len()));
    entry.insert("is_inline".into(), Value::from(attachment.is_inline));
    if let Some(content_id) = &attachment.content_id {
        entry.insert("content_id".into(), Value::from(content_id.clone()));
    }
    Value::Object(entry)
}

/// One `message` part with the JSON payload, then one part per attachment.
fn multipart_parts(message: String, attachments: &[Attachment]) -> Vec<FormPart> {
    let mut parts = Vec::with_capacity(attachments.len() + 1);
    parts.push(FormPart {
        name: "message".to_string(),
        filename: None,
        content_type: Some("application/json".to_string()),
        data: Bytes::from(message),
    });
    for (index, attachment) in attachments.iter().enumerate() {
        parts.push(FormPart {
            name: attachment
                .content_id
                .clone()
                .unwrap_or_else(|| format!("file{index}")),
            filename: Some(attachment.filename.clone()),
            content_type: Some(attachment.content_type.clone()),
            data: attachment.content.clone(),
        });
    }
    parts
}

/// Substitute `{name}` placeholders in a path template with percent-encoded
/// values. Values that are already encoded are left alone.
pub fn make_path_params(template: &str, params: &[(&str, &str)]) -> String {
    let mut path = template.to_string();
    for (name, value) in params {
        path = path.replace(&format!("{{{name}}}"), &encode_segment(value));
    }
    path
}

fn encode_segment(value: &str) -> String {
    if value.contains('%') {
        if let Ok(decoded) = urlencoding::decode(value) {
            if urlencoding::encode(&decoded) == value {
                return value.to_string();
            }
        }
    }
    urlencoding::encode(value).into_owned()
}
