//! Configuration types for the apiferry proxy server.
//!
//! These types provide type-safe configuration for embedding apiferry
//! in your applications.

use crate::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which kind of upstream provider the proxy fronts.
///
/// The only behavior keyed on this is whether SSO credentials are required
/// and whether the integration header is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// SSO-gated enterprise endpoint; requires session cookies
    Sso,
    /// Direct API-key endpoint; the client supplies its own auth header
    ApiKey,
}

impl Provider {
    /// Whether this provider requires SSO credentials before the proxy
    /// can start.
    pub fn requires_sso(self) -> bool {
        matches!(self, Self::Sso)
    }
}

impl std::str::FromStr for Provider {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sso" => Ok(Self::Sso),
            "api-key" | "apikey" => Ok(Self::ApiKey),
            other => Err(ProxyError::Config(format!("unknown provider: {other}"))),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sso => write!(f, "sso"),
            Self::ApiKey => write!(f, "api-key"),
        }
    }
}

/// Configuration for the proxy server.
///
/// Created once at process start and immutable for the server's lifetime.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the upstream API endpoint
    pub target_url: String,

    /// Fixed listen port; `None` asks the OS for an ephemeral port
    pub port: Option<u16>,

    /// Upstream provider kind
    pub provider: Provider,

    /// Integration id, injected as a header for SSO providers
    pub integration_id: Option<String>,

    /// Model name forwarded to the upstream
    pub model: Option<String>,

    /// Timeout applied to the upstream request (connect + headers)
    pub request_timeout: Option<Duration>,

    /// Client-type label forwarded to the upstream
    pub client_type: Option<String>,

    /// Session id reused across requests; generated per-process if absent
    pub session_id: Option<String>,
}

impl ProxyConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.target_url.is_empty() {
            return Err(ProxyError::Config("target_url is required".into()));
        }
        if !self.target_url.starts_with("http://") && !self.target_url.starts_with("https://") {
            return Err(ProxyError::Config(format!(
                "target_url must be an http(s) URL, got: {}",
                self.target_url
            )));
        }
        Ok(())
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            port: None,
            provider: Provider::ApiKey,
            integration_id: None,
            model: None,
            request_timeout: None,
            client_type: None,
            session_id: None,
        }
    }
}
