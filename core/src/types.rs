//! Response envelopes.
//!
//! # Design
//! The API wraps every successful payload in an envelope carrying the
//! request id: `{requestId, data}` for single items, `{requestId, data,
//! nextCursor?}` for lists and `{requestId}` for deletes. Envelopes are
//! read from the already camelCased [`Decoded`] body; `data` is then turned
//! into the caller's type through [`FromData`], which covers both raw JSON
//! and attribute-mapped [`Model`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::Model;
use crate::client::ApiClient;
use crate::decode::Decoded;
use crate::error::{Error, Result};

/// Conversion from an envelope's `data` member.
pub trait FromData: Sized + Send + 'static {
    fn from_data(data: Value, client: &ApiClient) -> Result<Self>;
}

impl FromData for Value {
    fn from_data(data: Value, _client: &ApiClient) -> Result<Self> {
        Ok(data)
    }
}

impl<M: Model> FromData for M {
    fn from_data(data: Value, client: &ApiClient) -> Result<Self> {
        Ok(M::from_json(Some(client.clone()), &data)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    pub request_id: Option<String>,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub request_id: Option<String>,
    pub data: Vec<T>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl Envelope {
    fn read(decoded: Decoded) -> Result<Self> {
        match decoded {
            Decoded::Json(value) => serde_json::from_value(value).map_err(Error::Decode),
            Decoded::NoContent => Err(shape_error("expected a JSON envelope, got no content")),
            Decoded::Text(_) => Err(shape_error("expected a JSON envelope, got text")),
        }
    }
}

fn shape_error(message: &str) -> Error {
    Error::Decode(<serde_json::Error as serde::de::Error>::custom(message))
}

impl<T: FromData> Response<T> {
    pub fn from_decoded(decoded: Decoded, client: &ApiClient) -> Result<Self> {
        let envelope = Envelope::read(decoded)?;
        Ok(Response {
            request_id: envelope.request_id,
            data: T::from_data(envelope.data, client)?,
        })
    }
}

impl<T: FromData> ListResponse<T> {
    pub fn from_decoded(decoded: Decoded, client: &ApiClient) -> Result<Self> {
        let envelope = Envelope::read(decoded)?;
        let items = match envelope.data {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            _ => return Err(shape_error("list data is not an array")),
        };
        let data = items
            .into_iter()
            .map(|item| T::from_data(item, client))
            .collect::<Result<Vec<T>>>()?;
        Ok(ListResponse {
            request_id: envelope.request_id,
            data,
            next_cursor: envelope.next_cursor,
        })
    }
}

impl DeleteResponse {
    /// A delete answered with no body still counts as success.
    pub fn from_decoded(decoded: Decoded) -> Result<Self> {
        match decoded {
            Decoded::Json(value) => serde_json::from_value(value).map_err(Error::Decode),
            Decoded::NoContent | Decoded::Text(_) => Ok(DeleteResponse { request_id: None }),
        }
    }
}
