//! # apiferry
//!
//! A local HTTP forwarding proxy that sits between a coding-assistant client
//! and a remote LLM API endpoint.
//!
//! ## Overview
//!
//! The proxy listens on loopback, forwards each request to a configured
//! upstream, and streams the response body back chunk by chunk without ever
//! buffering it. An ordered interceptor pipeline observes and transforms
//! traffic at five lifecycle points: request, response headers, response
//! chunk, response complete, and error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apiferry::prelude::*;
//!
//! # async fn example() -> apiferry::Result<()> {
//! let mut server = ProxyServer::builder()
//!     .config(ProxyConfig {
//!         target_url: "https://api.example.com/".to_string(),
//!         provider: Provider::ApiKey,
//!         ..Default::default()
//!     })
//!     .build()?;
//!
//! let addr = server.start().await?;
//! println!("proxying on {}", addr.url);
//! server.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! apiferry consists of several crates:
//!
//! - [`apiferry-common`] - Shared config, errors, and constants
//! - [`apiferry-plugin`] - Interceptor traits, registry, and built-in plugins
//! - [`apiferry-http`] - The streaming upstream client
//! - [`apiferry-observability`] - Logging setup and the analytics sink trait
//!
//! This crate ties them together into the embeddable [`ProxyServer`] and
//! re-exports the most commonly used items.

mod pipeline;
mod server;

pub use server::{ProxyAddr, ProxyServer, ProxyServerBuilder};

// Re-export subcrates
pub use apiferry_common as common;
pub use apiferry_http as http;
pub use apiferry_observability as observability;
pub use apiferry_plugin as plugin;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::{Provider, ProxyConfig, ProxyError, Result};
    pub use crate::observability::AnalyticsSink;
    pub use crate::plugin::{
        CredentialStore, Interceptor, PluginContext, PluginDescriptor, ProxyContext, ProxyPlugin,
        SsoCredentials,
    };
    pub use crate::{ProxyAddr, ProxyServer, ProxyServerBuilder};
}

// Convenience re-exports at crate root
pub use common::{Provider, ProxyConfig, ProxyError, Result};
pub use plugin::{
    CredentialStore, Interceptor, PluginContext, PluginDescriptor, PluginRegistry, ProxyContext,
    ProxyPlugin, SsoCredentials,
};
