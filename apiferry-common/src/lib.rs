//! Common utilities and types for apiferry

pub mod config;
pub mod constants;
pub mod error;

pub use config::{Provider, ProxyConfig};
pub use constants::{
    DEFAULT_UPSTREAM_TIMEOUT_SECS, HEADER_CLIENT_TYPE, HEADER_INTEGRATION_ID, HEADER_MODEL,
    HEADER_REQUEST_ID, HEADER_SESSION_ID, HEADER_TIMEOUT, LISTEN_HOST,
};
pub use error::{ErrorBody, ErrorDetail, ProxyError, Result};
