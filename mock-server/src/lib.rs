//! In-memory stand-in for the v3 REST API, used by the client's
//! integration tests.
//!
//! Speaks the real wire format: snake_case JSON, `{request_id, data,
//! next_cursor?}` envelopes, both error body shapes, `page_token` cursors and
//! `metadata_pair` filters. Every list request is recorded so tests can
//! assert on the exact queries the client sent.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Page size when a list request names no limit.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Larger limits are capped to this many items per page.
pub const MAX_PAGE_SIZE: usize = 10;

/// Request bodies up to this size are accepted.
pub const BODY_LIMIT: usize = 32 * 1024 * 1024;

/// How long `/v3/slow` takes to answer.
pub const SLOW_DELAY: Duration = Duration::from_secs(5);

pub const FLOW_ID: &str = "mock-flow-id";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub grant_id: String,
    pub object: String,
    pub name: String,
    pub description: Option<String>,
    pub timezone: Option<String>,
    pub read_only: bool,
    pub is_primary: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCalendar {
    pub name: String,
    pub description: Option<String>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCalendar {
    pub name: Option<String>,
    pub description: Option<String>,
    pub timezone: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default)]
pub struct Store {
    /// Calendars in creation order.
    pub calendars: Vec<Calendar>,
    /// Query pairs of every list request, in arrival order.
    pub list_queries: Vec<Vec<(String, String)>>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with_db(Db::default())
}

pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route(
            "/v3/grants/{grant_id}/calendars",
            get(list_calendars).post(create_calendar),
        )
        .route(
            "/v3/grants/{grant_id}/calendars/{id}",
            get(get_calendar)
                .put(update_calendar)
                .patch(update_calendar)
                .delete(delete_calendar),
        )
        .route("/v3/grants/{grant_id}/messages/send", post(send_message))
        .route("/v3/grants/{grant_id}/messages/{id}/raw", get(raw_message))
        .route(
            "/v3/grants/{grant_id}/attachments/{id}/download",
            get(download_attachment),
        )
        .route("/v3/connect/token", post(oauth_failure))
        .route("/v3/connect/revoke", post(oauth_failure))
        .route("/v3/echo", get(echo).post(echo))
        .route("/v3/empty", post(empty))
        .route("/v3/slow", get(slow))
        .route("/v3/broken", get(broken))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_db(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_db(db)).await
}

fn request_id() -> String {
    Uuid::new_v4().to_string()
}

fn api_error(status: StatusCode, error_type: &str, message: &str) -> Response {
    let body = json!({
        "request_id": request_id(),
        "error": {"type": error_type, "message": message},
    });
    (status, [("x-fastly-id", FLOW_ID)], Json(body)).into_response()
}

fn not_found(id: &str) -> Response {
    api_error(
        StatusCode::NOT_FOUND,
        "not_found_error",
        &format!("calendar {id} not found"),
    )
}

fn parse_cursor(token: &str) -> Option<usize> {
    token.strip_prefix("cursor-")?.parse().ok()
}

async fn list_calendars(
    State(db): State<Db>,
    Path(grant_id): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let mut store = db.write().await;
    store.list_queries.push(pairs.clone());

    let mut limit = DEFAULT_PAGE_SIZE;
    let mut offset = 0;
    let mut filters = Vec::new();
    for (key, value) in &pairs {
        match key.as_str() {
            "limit" => match value.parse() {
                Ok(n) => limit = std::cmp::min(n, MAX_PAGE_SIZE),
                Err(_) => {
                    return api_error(StatusCode::BAD_REQUEST, "invalid_request_error", "bad limit")
                }
            },
            "page_token" => match parse_cursor(value) {
                Some(n) => offset = n,
                None => {
                    return api_error(
                        StatusCode::BAD_REQUEST,
                        "invalid_request_error",
                        "bad page_token",
                    )
                }
            },
            "metadata_pair" => {
                if let Some((k, v)) = value.split_once(':') {
                    filters.push((k.to_string(), v.to_string()));
                }
            }
            _ => {}
        }
    }

    let matching: Vec<&Calendar> = store
        .calendars
        .iter()
        .filter(|c| c.grant_id == grant_id)
        .filter(|c| {
            filters
                .iter()
                .all(|(k, v)| c.metadata.get(k).is_some_and(|m| m == v))
        })
        .collect();
    let page: Vec<&Calendar> = matching.iter().skip(offset).take(limit).copied().collect();
    let end = offset + page.len();

    let mut body = json!({"request_id": request_id(), "data": page});
    if end < matching.len() {
        body["next_cursor"] = Value::String(format!("cursor-{end}"));
    }
    Json(body).into_response()
}

async fn create_calendar(
    State(db): State<Db>,
    Path(grant_id): Path<String>,
    Json(input): Json<CreateCalendar>,
) -> Response {
    let calendar = Calendar {
        id: Uuid::new_v4().to_string(),
        grant_id,
        object: "calendar".to_string(),
        name: input.name,
        description: input.description,
        timezone: input.timezone,
        read_only: false,
        is_primary: false,
        metadata: input.metadata,
    };
    db.write().await.calendars.push(calendar.clone());
    Json(json!({"request_id": request_id(), "data": calendar})).into_response()
}

async fn get_calendar(
    State(db): State<Db>,
    Path((grant_id, id)): Path<(String, String)>,
) -> Response {
    let store = db.read().await;
    match store
        .calendars
        .iter()
        .find(|c| c.grant_id == grant_id && c.id == id)
    {
        Some(calendar) => {
            Json(json!({"request_id": request_id(), "data": calendar})).into_response()
        }
        None => not_found(&id),
    }
}

async fn update_calendar(
    State(db): State<Db>,
    Path((grant_id, id)): Path<(String, String)>,
    Json(input): Json<UpdateCalendar>,
) -> Response {
    let mut store = db.write().await;
    let Some(calendar) = store
        .calendars
        .iter_mut()
        .find(|c| c.grant_id == grant_id && c.id == id)
    else {
        return not_found(&id);
    };
    if let Some(name) = input.name {
        calendar.name = name;
    }
    if input.description.is_some() {
        calendar.description = input.description;
    }
    if input.timezone.is_some() {
        calendar.timezone = input.timezone;
    }
    if let Some(metadata) = input.metadata {
        calendar.metadata = metadata;
    }
    Json(json!({"request_id": request_id(), "data": calendar})).into_response()
}

async fn delete_calendar(
    State(db): State<Db>,
    Path((grant_id, id)): Path<(String, String)>,
) -> Response {
    let mut store = db.write().await;
    let before = store.calendars.len();
    store
        .calendars
        .retain(|c| !(c.grant_id == grant_id && c.id == id));
    if store.calendars.len() == before {
        return not_found(&id);
    }
    Json(json!({"request_id": request_id()})).into_response()
}

/// Echoes how the message arrived: as JSON, or as a multipart form.
async fn send_message(request: Request) -> Response {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if !is_multipart {
        return match Json::<Value>::from_request(request, &()).await {
            Ok(Json(message)) => Json(json!({
                "request_id": request_id(),
                "data": {"encoding": "json", "message": message},
            }))
            .into_response(),
            Err(rejection) => rejection.into_response(),
        };
    }

    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(multipart) => multipart,
        Err(rejection) => return rejection.into_response(),
    };
    let mut message = Value::Null;
    let mut parts = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(rejection) => return rejection.into_response(),
        };
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(rejection) => return rejection.into_response(),
        };
        if name == "message" {
            message = serde_json::from_slice(&data).unwrap_or(Value::Null);
        } else {
            parts.push(json!({
                "name": name,
                "filename": filename,
                "content_type": content_type,
                "size": data.len(),
            }));
        }
    }
    Json(json!({
        "request_id": request_id(),
        "data": {"encoding": "multipart", "message": message, "parts": parts},
    }))
    .into_response()
}

async fn raw_message(Path((_grant_id, id)): Path<(String, String)>) -> Response {
    let mime = format!(
        "Message-ID: <{id}@mock>\r\nSubject: {{\"not\": \"json\"}}\r\n\r\nHello from the mock server\r\n"
    );
    ([(header::CONTENT_TYPE, "message/rfc822")], mime).into_response()
}

async fn download_attachment(Path((_grant_id, id)): Path<(String, String)>) -> Response {
    let mut content = id.into_bytes();
    content.extend_from_slice(&[0, 159, 146, 150]);
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Bytes::from(content),
    )
        .into_response()
}

async fn oauth_failure() -> Response {
    let body = json!({
        "request_id": request_id(),
        "error": "invalid_grant",
        "error_code": 400,
        "error_description": "Code expired",
        "error_uri": "https://docs.example.com/errors/invalid_grant",
    });
    (StatusCode::BAD_REQUEST, [("x-fastly-id", FLOW_ID)], Json(body)).into_response()
}

async fn echo(headers: HeaderMap, Query(query): Query<Vec<(String, String)>>) -> Response {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    Json(json!({
        "request_id": request_id(),
        "data": {"headers": headers, "query": query},
    }))
    .into_response()
}

async fn empty() -> Response {
    (StatusCode::OK, [(header::CONTENT_LENGTH, "0")]).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({"request_id": request_id(), "data": {}})).into_response()
}

async fn broken() -> Response {
    (StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>").into_response()
}
