//! Default values and header names for apiferry.
//!
//! Use these constants instead of magic strings so the header contract stays
//! consistent across the plugins, server, and tests.

/// Default timeout for the upstream request (connect + response headers).
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 600;

/// Loopback address the proxy listens on; the proxy never accepts
/// non-local connections.
pub const LISTEN_HOST: &str = "127.0.0.1";

/// Header carrying the per-request id.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Header carrying the per-process session id.
pub const HEADER_SESSION_ID: &str = "x-session-id";

/// Header carrying the integration id (SSO providers only).
pub const HEADER_INTEGRATION_ID: &str = "x-integration-id";

/// Header carrying the configured model name.
pub const HEADER_MODEL: &str = "x-model";

/// Header carrying the configured request timeout, in seconds.
pub const HEADER_TIMEOUT: &str = "x-request-timeout";

/// Header carrying the client-type label.
pub const HEADER_CLIENT_TYPE: &str = "x-client-type";

/// Inbound headers that must not be forwarded upstream.
pub const STRIPPED_REQUEST_HEADERS: [&str; 2] = ["host", "connection"];

/// Upstream headers that must not be copied onto the downstream response.
pub const STRIPPED_RESPONSE_HEADERS: [&str; 2] = ["transfer-encoding", "connection"];
