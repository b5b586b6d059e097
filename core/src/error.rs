//! Error taxonomy and failing-response classification.
//!
//! # Design
//! Every failed call produces exactly one [`Error`]. Responses with a status
//! above 299 go through [`classify`], which picks the error shape from the
//! endpoint: the OAuth endpoints (`/connect/token`, `/connect/revoke`) answer
//! with a flat OAuth body, every other endpoint nests an `error` object.
//! Bodies matching neither shape are kept verbatim in
//! [`Error::Unclassified`] so nothing the server said is lost.
//!
//! Failures before any response exists are either an abort (deadline or
//! caller cancellation, both surfaced as [`Error::Timeout`]) or a plain
//! [`Error::Transport`].

use serde_json::Value;

use crate::attributes::AttributeError;
use crate::case::{convert_keys_deep, Case};
use crate::http::HttpResponse;

/// Boxed error used as the source of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Paths whose failures use the OAuth error body.
const OAUTH_PATHS: &[&str] = &["/connect/token", "/connect/revoke"];

/// Errors returned by every client operation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A non-OAuth endpoint returned a structured error.
    #[error("{}", .0.message)]
    Api(ApiError),

    /// An OAuth endpoint returned a structured error.
    #[error("{}", .0.error_description)]
    OAuth(OAuthError),

    /// The call was aborted by its deadline or by caller cancellation.
    #[error("request to {} timed out after {}ms", .0.url, .0.timeout_ms)]
    Timeout(SdkTimeoutError),

    /// The request failed before a response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server failed with a body of neither known shape.
    #[error("unexpected response (HTTP {status}): {body}")]
    Unclassified { status: u16, body: String },

    /// A successful response did not match the expected envelope.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

impl Error {
    /// HTTP status of the failing response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(e) => Some(e.status),
            Error::OAuth(e) => Some(e.status),
            Error::Unclassified { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// General API error, from a `{requestId, error: {type, message,
/// providerError?}}` body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub error_type: String,
    pub message: String,
    pub provider_error: Option<Value>,
    pub status: u16,
    pub request_id: Option<String>,
    pub flow_id: Option<String>,
}

/// OAuth endpoint error, from a `{requestId, error, errorCode,
/// errorDescription, errorUri}` body.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthError {
    pub error: String,
    pub error_code: Option<i64>,
    pub error_description: String,
    pub error_uri: Option<String>,
    pub status: u16,
    pub request_id: Option<String>,
    pub flow_id: Option<String>,
}

/// Raised when a call is aborted before the server answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkTimeoutError {
    pub url: String,
    pub timeout_ms: u64,
}

/// Failure of the transport itself (DNS, TLS, connection reset, ...).
#[derive(thiserror::Error, Debug)]
#[error("transport error: {message}")]
pub struct TransportError {
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Whether failures on `path` use the OAuth error body.
pub fn is_oauth_path(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path).trim_end_matches('/');
    OAUTH_PATHS.iter().any(|p| path.ends_with(p))
}

/// Map a failing response to one error variant.
pub fn classify(path: &str, response: &HttpResponse) -> Error {
    let status = response.status;
    let text = response.text();

    let parsed: Value = match serde_json::from_str(&text) {
        Ok(value @ Value::Object(_)) => value,
        _ => return Error::Unclassified { status, body: text },
    };
    // provider errors are free-form payloads from the upstream provider
    let body = convert_keys_deep(&parsed, Case::Camel, &["provider_error", "providerError"]);

    let request_id = body
        .get("requestId")
        .and_then(Value::as_str)
        .or_else(|| response.header("x-request-id"))
        .map(str::to_string);
    let flow_id = response.header("x-fastly-id").map(str::to_string);

    match body.get("error") {
        Some(Value::String(error)) if is_oauth_path(path) => Error::OAuth(OAuthError {
            error: error.clone(),
            error_code: body.get("errorCode").and_then(Value::as_i64),
            error_description: str_field(&body, "errorDescription").unwrap_or_default(),
            error_uri: str_field(&body, "errorUri"),
            status,
            request_id,
            flow_id,
        }),
        Some(Value::Object(inner)) => Error::Api(ApiError {
            error_type: inner
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            message: inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(text),
            provider_error: inner
                .get("providerError")
                .or_else(|| inner.get("provider_error"))
                .cloned(),
            status,
            request_id,
            flow_id,
        }),
        // An OAuth-style body outside the OAuth endpoints still binds to the
        // general shape.
        Some(Value::String(error)) => Error::Api(ApiError {
            error_type: error.clone(),
            message: str_field(&body, "errorDescription")
                .or_else(|| str_field(&body, "message"))
                .unwrap_or_else(|| error.clone()),
            provider_error: None,
            status,
            request_id,
            flow_id,
        }),
        _ => Error::Unclassified { status, body: text },
    }
}

fn str_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("x-fastly-id".to_string(), "flow-1".to_string())],
            body: Bytes::from(body.to_string()),
        }
    }

    const OAUTH_BODY: &str = r#"{
        "request_id": "req-1",
        "error": "invalid_grant",
        "error_code": 400,
        "error_description": "Code expired",
        "error_uri": "https://docs/errors/400"
    }"#;

    const API_BODY: &str = r#"{
        "request_id": "req-2",
        "error": {
            "type": "invalid_request",
            "message": "Calendar not found",
            "provider_error": {"error_code": "notFound"}
        }
    }"#;

    #[test]
    fn oauth_paths_bind_to_oauth_error() {
        for path in ["/v3/connect/token", "/v3/connect/revoke"] {
            let err = classify(path, &response(400, OAUTH_BODY));
            let Error::OAuth(e) = err else {
                panic!("expected OAuth error for {path}");
            };
            assert_eq!(e.error, "invalid_grant");
            assert_eq!(e.error_code, Some(400));
            assert_eq!(e.error_description, "Code expired");
            assert_eq!(e.error_uri.as_deref(), Some("https://docs/errors/400"));
            assert_eq!(e.request_id.as_deref(), Some("req-1"));
            assert_eq!(e.flow_id.as_deref(), Some("flow-1"));
        }
    }

    #[test]
    fn oauth_shaped_body_elsewhere_binds_to_api_error() {
        let err = classify("/v3/grants/abc/calendars", &response(400, OAUTH_BODY));
        let Error::Api(e) = err else {
            panic!("expected API error");
        };
        assert_eq!(e.error_type, "invalid_grant");
        assert_eq!(e.message, "Code expired");
        assert_eq!(e.status, 400);
    }

    #[test]
    fn general_body_binds_to_api_error() {
        let err = classify("/v3/grants/abc/calendars/x", &response(404, API_BODY));
        assert_eq!(err.to_string(), "Calendar not found");
        let Error::Api(e) = err else {
            panic!("expected API error");
        };
        assert_eq!(e.error_type, "invalid_request");
        // provider errors are free-form and keep their keys
        assert_eq!(e.provider_error, Some(serde_json::json!({"error_code": "notFound"})));
        assert_eq!(e.request_id.as_deref(), Some("req-2"));
    }

    #[test]
    fn oauth_message_is_the_description() {
        let err = classify("/v3/connect/token", &response(400, OAUTH_BODY));
        assert_eq!(err.to_string(), "Code expired");
    }

    #[test]
    fn unparseable_body_is_kept_verbatim() {
        let err = classify("/v3/grants", &response(502, "<html>Bad Gateway</html>"));
        match err {
            Error::Unclassified { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "<html>Bad Gateway</html>");
            }
            other => panic!("expected unclassified error, got {other:?}"),
        }
    }

    #[test]
    fn json_without_error_member_is_unclassified() {
        let err = classify("/v3/grants", &response(500, r#"{"oops":true}"#));
        assert!(matches!(err, Error::Unclassified { status: 500, .. }));
    }

    #[test]
    fn oauth_path_detection_ignores_query_and_trailing_slash() {
        assert!(is_oauth_path("/v3/connect/token/"));
        assert!(is_oauth_path("/v3/connect/revoke?token=abc"));
        assert!(!is_oauth_path("/v3/connect/auth"));
        assert!(!is_oauth_path("/v3/grants"));
    }
}
