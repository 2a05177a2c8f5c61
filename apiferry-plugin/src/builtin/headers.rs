use crate::context::{PluginContext, ProxyContext};
use crate::traits::{HookResult, Interceptor, PluginDescriptor, ProxyPlugin};
use apiferry_common::{constants, ProxyConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Priority of the header injection plugin; runs after auth.
pub const HEADERS_PRIORITY: u16 = 20;

/// Injects routing metadata headers onto the outbound request.
///
/// Request-id and session-id headers are always set; integration, model,
/// timeout, and client-type headers only when the corresponding config value
/// is present. Pure header construction, no failure modes.
pub struct HeaderInjectPlugin;

impl HeaderInjectPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeaderInjectPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyPlugin for HeaderInjectPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new("header-inject", "Routing header injection", HEADERS_PRIORITY)
            .with_dependencies(vec!["sso-auth".to_string()])
    }

    fn create(&self, ctx: &PluginContext) -> apiferry_common::Result<Box<dyn Interceptor>> {
        Ok(Box::new(HeaderInjectInterceptor {
            config: ctx.config.clone(),
        }))
    }
}

struct HeaderInjectInterceptor {
    config: Arc<ProxyConfig>,
}

#[async_trait]
impl Interceptor for HeaderInjectInterceptor {
    async fn on_request(&self, ctx: &mut ProxyContext) -> HookResult {
        ctx.headers.insert(
            constants::HEADER_REQUEST_ID.to_string(),
            ctx.request_id.clone(),
        );
        ctx.headers.insert(
            constants::HEADER_SESSION_ID.to_string(),
            ctx.session_id.clone(),
        );

        if self.config.provider.requires_sso() {
            if let Some(integration_id) = &self.config.integration_id {
                ctx.headers.insert(
                    constants::HEADER_INTEGRATION_ID.to_string(),
                    integration_id.clone(),
                );
            }
        }
        if let Some(model) = &self.config.model {
            ctx.headers
                .insert(constants::HEADER_MODEL.to_string(), model.clone());
        }
        if let Some(timeout) = self.config.request_timeout {
            ctx.headers.insert(
                constants::HEADER_TIMEOUT.to_string(),
                timeout.as_secs().to_string(),
            );
        }
        if let Some(client_type) = &self.config.client_type {
            ctx.headers
                .insert(constants::HEADER_CLIENT_TYPE.to_string(), client_type.clone());
        }
        Ok(())
    }
}
