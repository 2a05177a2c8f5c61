use crate::context::{PluginContext, ProxyContext, ResponseHead, ResponseMetadata};
use apiferry_common::ProxyError;
use async_trait::async_trait;
use bytes::Bytes;

/// Boxed error type returned by interceptor hooks. Hook failures are always
/// logged and swallowed by the caller; they never abort a request.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for hook implementations.
pub type HookResult<T = ()> = std::result::Result<T, BoxError>;

/// Static metadata a plugin declares about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Stable id, unique within a registry
    pub id: String,
    /// Human-readable name for logs
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Execution priority, 0-1000; lower runs first
    pub priority: u16,
    /// Ids of plugins this one expects to run after
    pub dependencies: Vec<String>,
}

impl PluginDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, priority: u16) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            priority,
            dependencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }
}

/// Stateful per-server-start object produced by a plugin factory.
///
/// All five hooks have no-op defaults, so an interceptor implements only the
/// lifecycle stages it cares about. The server invokes interceptors in
/// priority order, identically across all five stages.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Before the request is forwarded. May mutate the context's header map;
    /// that map is the only channel to the outbound request.
    async fn on_request(&self, _ctx: &mut ProxyContext) -> HookResult {
        Ok(())
    }

    /// After upstream headers arrive, before any body byte is written to the
    /// client.
    async fn on_response_headers(
        &self,
        _ctx: &mut ProxyContext,
        _head: &ResponseHead,
    ) -> HookResult {
        Ok(())
    }

    /// For each body chunk. Return the (possibly transformed) chunk, or
    /// `None` to drop it; a dropped chunk short-circuits the remaining
    /// interceptors and nothing is written for it.
    async fn on_response_chunk(
        &self,
        _ctx: &mut ProxyContext,
        chunk: Bytes,
    ) -> HookResult<Option<Bytes>> {
        Ok(Some(chunk))
    }

    /// After the upstream stream has ended and the final metadata is known.
    async fn on_response_complete(
        &self,
        _ctx: &ProxyContext,
        _meta: &ResponseMetadata,
    ) -> HookResult {
        Ok(())
    }

    /// When the request fails at any stage. Not invoked for client aborts.
    async fn on_error(&self, _ctx: &ProxyContext, _err: &ProxyError) -> HookResult {
        Ok(())
    }
}

/// Stateless, registrable plugin: declared metadata plus a factory for
/// interceptors. The factory runs once per server start.
pub trait ProxyPlugin: Send + Sync {
    /// The plugin's declared metadata.
    fn descriptor(&self) -> PluginDescriptor;

    /// Build the per-server-start interceptor. A factory error is fatal only
    /// for the caller to decide; the registry logs it and continues.
    fn create(&self, ctx: &PluginContext) -> apiferry_common::Result<Box<dyn Interceptor>>;
}
