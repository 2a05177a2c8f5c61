//! Outbound HTTP client for forwarding requests to the upstream API.

use apiferry_common::constants::DEFAULT_UPSTREAM_TIMEOUT_SECS;
use apiferry_common::{ProxyError, Result};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

/// Client that issues the outbound request and exposes the upstream response
/// as a chunk stream without materializing the body.
///
/// Upstream certificate validation is disabled: the proxy explicitly
/// supports self-signed upstream certificates. The only enforced timeout is
/// the one configured here (connect + response headers); the streaming phase
/// itself is unbounded. The client never retries.
pub struct ForwardClient {
    client: reqwest::Client,
}

impl ForwardClient {
    /// Build a client with the given upstream timeout (default 600s).
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let timeout =
            timeout.unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS));
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Issue the outbound request. Returns once upstream status and headers
    /// are available; the body is consumed afterwards via
    /// [`UpstreamResponse::next_chunk`].
    pub async fn forward(
        &self,
        url: &str,
        method: &str,
        headers: &HashMap<String, String>,
        body: Option<String>,
    ) -> Result<UpstreamResponse> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| ProxyError::Upstream(format!("invalid method: {method}")))?;

        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        Ok(UpstreamResponse::new(response))
    }

    /// Release pooled connections. Dropping the client has the same effect;
    /// this exists for the explicit shutdown path.
    pub fn close(&self) {
        tracing::debug!("Forward client closed");
    }
}

/// Handle to an in-flight upstream response: status, headers, and a body
/// stream consumed exactly once, in order.
pub struct UpstreamResponse {
    status: u16,
    status_message: String,
    headers: HashMap<String, String>,
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("status_message", &self.status_message)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl UpstreamResponse {
    fn new(response: reqwest::Response) -> Self {
        let status = response.status();
        let status_message = status.canonical_reason().unwrap_or("").to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        Self {
            status: status.as_u16(),
            status_message,
            headers,
            stream: response.bytes_stream().boxed(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Upstream response headers, lowercase names.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Pull the next body chunk; `None` when the stream has ended.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self.stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(map_transport_error(e)),
            None => Ok(None),
        }
    }
}

/// Classify a transport failure into the proxy error taxonomy.
fn map_transport_error(e: reqwest::Error) -> ProxyError {
    if e.is_timeout() {
        ProxyError::Timeout(e.to_string())
    } else if e.is_connect() {
        ProxyError::Network(e.to_string())
    } else {
        ProxyError::Upstream(e.to_string())
    }
}
