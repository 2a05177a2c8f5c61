//! Context types shared between the proxy server and plugins.

use apiferry_common::{ProxyConfig, Result};
use apiferry_observability::AnalyticsSink;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use uuid::Uuid;

/// SSO session cookies, supplied externally and read-only to the proxy.
///
/// Backed by a `BTreeMap` so cookie serialization is deterministic
/// (sorted by cookie name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsoCredentials {
    cookies: BTreeMap<String, String>,
}

impl SsoCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Serialize the cookie map into a single `Cookie` header value:
    /// `name=value` pairs joined by `"; "`.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl FromIterator<(String, String)> for SsoCredentials {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            cookies: iter.into_iter().collect(),
        }
    }
}

/// Source of SSO credentials, implemented by the embedding application.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored credentials, `None` when the user has no active
    /// SSO session, or an error when the store itself is unreadable.
    fn retrieve_sso_credentials(&self) -> Result<Option<SsoCredentials>>;
}

/// Shared context handed to each plugin factory at server start.
#[derive(Clone)]
pub struct PluginContext {
    pub config: Arc<ProxyConfig>,
    pub credentials: Option<SsoCredentials>,
    pub analytics: Option<Arc<dyn AnalyticsSink>>,
}

static PROCESS_SESSION_ID: OnceLock<String> = OnceLock::new();

/// Session id shared by every request in this process when the config does
/// not supply one.
pub fn process_session_id() -> &'static str {
    PROCESS_SESSION_ID.get_or_init(|| Uuid::new_v4().to_string())
}

/// Per-request state, built once per inbound request and discarded when the
/// request ends. The header map is the only channel by which request-stage
/// plugins affect the outbound request.
#[derive(Debug, Clone)]
pub struct ProxyContext {
    /// Unique id for this request
    pub request_id: String,
    /// Session id, from config or the process-wide generator
    pub session_id: String,
    /// Agent/client label
    pub agent: String,
    /// Inbound HTTP method
    pub method: String,
    /// Inbound request path (including query)
    pub path: String,
    /// Outbound header map (lowercase names), mutated by `on_request` hooks
    pub headers: HashMap<String, String>,
    /// Raw request body; present only for methods that carry one
    pub body: Option<String>,
    /// Resolved upstream URL, set once forwarding begins
    pub target_url: Option<String>,
    /// Monotonic start time, for latency measurement
    pub started_at: Instant,
    /// Wall-clock start time
    pub timestamp: DateTime<Utc>,
    /// Free-form plugin scratch space, scoped to this request
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ProxyContext {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        session_id: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            agent: agent.into(),
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: None,
            target_url: None,
            started_at: Instant::now(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Milliseconds elapsed since the request started.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Upstream status and headers, observed by `on_response_headers` before any
/// body byte is written to the client.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: u16,
    pub status_message: String,
    pub headers: HashMap<String, String>,
}

/// Final response shape, built once after the body has been fully streamed.
/// The body itself is never retained.
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    pub status: u16,
    pub status_message: String,
    pub headers: HashMap<String, String>,
    /// Total bytes written to the client
    pub bytes_sent: u64,
    /// Elapsed milliseconds from request start to stream completion
    pub duration_ms: u64,
}
