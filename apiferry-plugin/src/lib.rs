//! # apiferry plugin system
//!
//! An ordered interceptor pipeline for the apiferry proxy. A [`ProxyPlugin`]
//! is a stateless descriptor (id, priority, dependencies) plus a factory; the
//! factory produces an [`Interceptor`], the stateful per-server-start object
//! that implements any subset of five lifecycle hooks:
//!
//! - `on_request` - mutate outbound headers before forwarding
//! - `on_response_headers` - observe upstream headers before any body byte
//! - `on_response_chunk` - transform or drop individual body chunks
//! - `on_response_complete` - final metadata after the stream ends
//! - `on_error` - request failures (not client aborts)
//!
//! Hooks run in priority order (ascending, registration order as tiebreak),
//! identically across all five stages. Hook failures are logged and
//! swallowed; a broken plugin never aborts a request.
//!
//! ## Creating a custom plugin
//!
//! ```rust
//! use apiferry_plugin::{
//!     HookResult, Interceptor, PluginContext, PluginDescriptor, ProxyContext, ProxyPlugin,
//! };
//! use async_trait::async_trait;
//!
//! struct StampPlugin;
//! struct StampInterceptor;
//!
//! impl ProxyPlugin for StampPlugin {
//!     fn descriptor(&self) -> PluginDescriptor {
//!         PluginDescriptor::new("stamp", "Stamp header", 50)
//!     }
//!
//!     fn create(
//!         &self,
//!         _ctx: &PluginContext,
//!     ) -> apiferry_common::Result<Box<dyn Interceptor>> {
//!         Ok(Box::new(StampInterceptor))
//!     }
//! }
//!
//! #[async_trait]
//! impl Interceptor for StampInterceptor {
//!     async fn on_request(&self, ctx: &mut ProxyContext) -> HookResult {
//!         ctx.headers.insert("x-stamp".into(), "1".into());
//!         Ok(())
//!     }
//! }
//! ```
//!
//! ## Built-in plugins
//!
//! - [`builtin::SsoAuthPlugin`] (priority 10) - serializes SSO cookies into
//!   the `Cookie` header; its factory fails without credentials
//! - [`builtin::HeaderInjectPlugin`] (priority 20) - request/session ids and
//!   conditional routing headers
//! - [`builtin::TelemetryPlugin`] (priority 100) - usage telemetry, disabled
//!   by default

pub mod builtin;
pub mod context;
pub mod registry;
pub mod traits;

pub use context::{
    process_session_id, CredentialStore, PluginContext, ProxyContext, ResponseHead,
    ResponseMetadata, SsoCredentials,
};
pub use registry::{PluginConfig, PluginConfigPatch, PluginRegistry};
pub use traits::{BoxError, HookResult, Interceptor, PluginDescriptor, ProxyPlugin};
