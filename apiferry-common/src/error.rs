//! Error types for apiferry

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for apiferry operations
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Authentication failed (e.g. missing SSO credentials)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Upstream unreachable or connection reset
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream deadline exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Upstream protocol-level failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Plugin not found in the registry
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unclassified internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    /// Stable machine-readable error kind, used in the JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication_error",
            Self::Network(_) => "network_error",
            Self::Timeout(_) => "timeout_error",
            Self::Upstream(_) => "upstream_error",
            Self::Config(_) => "config_error",
            Self::PluginNotFound(_) => "plugin_not_found",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status code this error maps to on the client-facing response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Authentication(_) => 401,
            Self::Network(_) | Self::Upstream(_) => 502,
            Self::Timeout(_) => 504,
            Self::Config(_) | Self::PluginNotFound(_) | Self::Io(_) | Self::Internal(_) => 500,
        }
    }

    /// Operational errors are expected in normal use (upstream hiccups) and
    /// are logged at low verbosity; everything else logs at error level.
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

/// Inner error object of the JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(flatten, skip_serializing_if = "serde_json::Map::is_empty", default)]
    pub context: serde_json::Map<String, serde_json::Value>,
}

/// Structured JSON body written to the client when a request fails before
/// any response bytes have been sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    #[serde(rename = "requestId")]
    pub request_id: String,
    /// RFC 3339 timestamp of when the error response was built
    pub timestamp: String,
}

impl ErrorBody {
    /// Normalize an error into the client-facing JSON shape.
    pub fn new(err: &ProxyError, request_id: &str) -> Self {
        Self {
            error: ErrorDetail {
                kind: err.kind().to_string(),
                message: err.to_string(),
                status_code: err.status_code(),
                context: serde_json::Map::new(),
            },
            request_id: request_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Attach an extra context field to the error object.
    #[must_use]
    pub fn with_context(mut self, key: &str, value: serde_json::Value) -> Self {
        self.error.context.insert(key.to_string(), value);
        self
    }

    /// Serialize to a JSON string. Serialization of this shape cannot fail;
    /// the fallback exists to keep the error path panic-free.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!(r#"{{"error":{{"kind":"internal_error","message":"error serialization failed","statusCode":500}},"requestId":"{}"}}"#, self.request_id))
    }
}
