use crate::context::{PluginContext, ProxyContext, ResponseMetadata};
use crate::traits::{HookResult, Interceptor, PluginDescriptor, ProxyPlugin};
use apiferry_common::ProxyError;
use apiferry_observability::AnalyticsSink;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Priority of the telemetry plugin; runs last.
pub const TELEMETRY_PRIORITY: u16 = 100;

/// Records request/response/error telemetry, keyed by request id.
///
/// Registered disabled by default; the server enables it only when telemetry
/// is globally on. Records metadata only, never body content. The sink
/// contract is fire-and-forget, so nothing here can surface to the user.
pub struct TelemetryPlugin;

impl TelemetryPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TelemetryPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyPlugin for TelemetryPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new("telemetry", "Usage telemetry", TELEMETRY_PRIORITY)
    }

    fn create(&self, ctx: &PluginContext) -> apiferry_common::Result<Box<dyn Interceptor>> {
        let sink = ctx.analytics.clone().ok_or_else(|| {
            ProxyError::Config("telemetry plugin requires an analytics sink".into())
        })?;
        Ok(Box::new(TelemetryInterceptor { sink }))
    }
}

struct TelemetryInterceptor {
    sink: Arc<dyn AnalyticsSink>,
}

#[async_trait]
impl Interceptor for TelemetryInterceptor {
    async fn on_request(&self, ctx: &mut ProxyContext) -> HookResult {
        self.sink.track(
            "proxy_request",
            json!({
                "requestId": ctx.request_id,
                "sessionId": ctx.session_id,
                "agent": ctx.agent,
                "method": ctx.method,
                "path": ctx.path,
                "upstreamUrl": ctx.target_url,
                "bodyBytes": ctx.body.as_ref().map_or(0, String::len),
            }),
        );
        Ok(())
    }

    async fn on_response_complete(
        &self,
        ctx: &ProxyContext,
        meta: &ResponseMetadata,
    ) -> HookResult {
        self.sink.track(
            "proxy_response",
            json!({
                "requestId": ctx.request_id,
                "status": meta.status,
                "bytesSent": meta.bytes_sent,
                "durationMs": meta.duration_ms,
            }),
        );
        Ok(())
    }

    async fn on_error(&self, ctx: &ProxyContext, err: &ProxyError) -> HookResult {
        self.sink.track(
            "proxy_error",
            json!({
                "requestId": ctx.request_id,
                "kind": err.kind(),
                "message": err.to_string(),
            }),
        );
        Ok(())
    }
}
