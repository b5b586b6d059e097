//! The API client: request execution with deadlines and cancellation.
//!
//! # Design
//! `ApiClient` is a cheap handle (`Arc` inside) holding the immutable
//! [`ClientConfig`] and a [`Transport`]. Every call builds its own
//! [`HttpRequest`], so concurrent calls share nothing mutable.
//!
//! A call races the transport against its deadline and, when the caller
//! supplied one, a cancellation token. Whichever fires first drops the
//! in-flight future; both aborts surface as [`Error::Timeout`]. Nothing is
//! retried.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::decode::{decode, Decoded};
use crate::error::{classify, Error, Result, SdkTimeoutError};
use crate::http::{HttpRequest, HttpResponse};
use crate::request::{RequestBuilder, RequestOptions};
use crate::transport::{ReqwestTransport, Transport};

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_uri", &self.inner.config.api_uri)
            .field("timeout_secs", &self.inner.config.timeout_secs)
            .field("transport", &self.inner.transport)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client over the default reqwest transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::default()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner { config, transport }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Resolve options into the request that [`execute`](Self::execute)
    /// would send.
    pub fn build_request(&self, options: &RequestOptions) -> Result<HttpRequest> {
        RequestBuilder::new(&self.inner.config).build(options)
    }

    /// Send one request and decode the successful body.
    pub async fn execute(&self, options: RequestOptions) -> Result<Decoded> {
        let response = self.round_trip(&options).await?;
        Ok(decode(&response))
    }

    /// Send one request and return the successful body undecoded.
    pub async fn execute_raw(&self, options: RequestOptions) -> Result<Bytes> {
        let response = self.round_trip(&options).await?;
        Ok(response.body)
    }

    async fn round_trip(&self, options: &RequestOptions) -> Result<HttpResponse> {
        let request = self.build_request(options)?;
        let cancellation = options
            .overrides
            .as_ref()
            .and_then(|o| o.cancellation.clone());
        let response = self.send(request, cancellation).await?;
        if response.status > 299 {
            warn!(
                path = %options.path,
                status = response.status,
                "request failed"
            );
            return Err(classify(&options.path, &response));
        }
        Ok(response)
    }

    async fn send(
        &self,
        request: HttpRequest,
        cancellation: Option<CancellationToken>,
    ) -> Result<HttpResponse> {
        let url = request.url.clone();
        let deadline = request.timeout;
        let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
        let aborted = || {
            Error::Timeout(SdkTimeoutError {
                url: url.clone(),
                timeout_ms,
            })
        };

        debug!(method = %request.method, url = %request.url, timeout_ms, "sending request");
        let call = tokio::time::timeout(deadline, self.inner.transport.send(request));
        let outcome = match cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(url = %url, "request cancelled");
                    return Err(aborted());
                }
                outcome = call => outcome,
            },
            None => call.await,
        };

        let response = outcome.map_err(|_| aborted())??;
        debug!(url = %url, status = response.status, "received response");
        Ok(response)
    }
}
