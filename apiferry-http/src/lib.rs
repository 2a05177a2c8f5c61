//! HTTP forwarding client for apiferry.

pub mod client;
pub mod url;

pub use client::{ForwardClient, UpstreamResponse};
pub use url::join_url;
