//! Async client core for the Nylas v3 REST API.
//!
//! # Overview
//! Everything an endpoint wrapper needs sits below the resource layer:
//! request building, execution with deadlines, response decoding, error
//! classification, key-case normalization, declarative model mapping and
//! cursor pagination. Endpoint wrappers only supply paths.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`);
//!   the only I/O happens behind the [`Transport`] trait, so every other
//!   layer is deterministic and tested without sockets.
//! - `ApiClient` is an `Arc` handle over an immutable [`ClientConfig`];
//!   per-call [`Overrides`] shadow it and never write back.
//! - Wire JSON is snake_case, in-memory JSON is camelCase. Free-form
//!   `metadata` maps are never rewritten.
//! - Every failure is one [`Error`]; nothing is retried.

pub mod attributes;
pub mod case;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod pagination;
pub mod request;
pub mod resource;
pub mod transport;
pub mod types;

pub use attributes::{Attribute, AttributeError, AttributeKind, AttributeSet, EnumValue, Model};
pub use case::{convert_keys, convert_keys_deep, Case};
pub use client::ApiClient;
pub use config::{ClientConfig, Overrides, Region};
pub use decode::Decoded;
pub use error::{ApiError, Error, OAuthError, Result, SdkTimeoutError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use pagination::{List, Page, Pager};
pub use request::{make_path_params, Attachment, RequestOptions};
pub use resource::{Params, Resource};
pub use transport::{ReqwestTransport, Transport};
pub use types::{DeleteResponse, FromData, ListResponse, Response};
