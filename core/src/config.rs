//! Client configuration and per-call overrides.
//!
//! # Design
//! `ClientConfig` is fixed when the client is built. A call may carry
//! `Overrides`, which shadow individual settings for that one request and
//! never write back into the client. Loading configuration from files or the
//! environment is left to the embedding application; `ClientConfig`
//! implements `Deserialize` so any serde format works.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// API regions with a preset base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    pub fn api_uri(self) -> &'static str {
        match self {
            Region::Us => "https://api.us.nylas.com",
            Region::Eu => "https://api.eu.nylas.com",
        }
    }
}

/// Settings shared by every call made through one client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    #[serde(default = "default_api_uri")]
    pub api_uri: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_api_uri() -> String {
    Region::default().api_uri().to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_uri: default_api_uri(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_api_uri(mut self, api_uri: impl Into<String>) -> Self {
        self.api_uri = api_uri.into();
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.api_uri = region.api_uri().to_string();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-call settings that shadow the client configuration.
#[derive(Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub api_uri: Option<String>,
    pub timeout: Option<Duration>,
    pub headers: BTreeMap<String, String>,
    /// Cancelling this token aborts the call the same way a timeout does.
    pub cancellation: Option<CancellationToken>,
}

// The API key never appears in Debug output.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("api_uri", &self.api_uri)
            .field("timeout_secs", &self.timeout_secs)
            .field("headers", &self.headers)
            .finish()
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overrides")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_uri", &self.api_uri)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

impl Overrides {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn api_uri(mut self, api_uri: impl Into<String>) -> Self {
        self.api_uri = Some(api_uri.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}
