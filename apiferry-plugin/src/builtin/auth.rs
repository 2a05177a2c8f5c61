use crate::context::{PluginContext, ProxyContext};
use crate::traits::{HookResult, Interceptor, PluginDescriptor, ProxyPlugin};
use apiferry_common::ProxyError;
use async_trait::async_trait;

/// Priority of the auth plugin; runs before all others.
pub const AUTH_PRIORITY: u16 = 10;

/// SSO cookie authentication plugin.
///
/// The factory fails without credentials. Callers must check for credentials
/// before relying on it.
pub struct SsoAuthPlugin;

impl SsoAuthPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SsoAuthPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyPlugin for SsoAuthPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new("sso-auth", "SSO cookie authentication", AUTH_PRIORITY)
    }

    fn create(&self, ctx: &PluginContext) -> apiferry_common::Result<Box<dyn Interceptor>> {
        let credentials = ctx
            .credentials
            .as_ref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ProxyError::Authentication("SSO credentials are required for sso-auth".into())
            })?;
        Ok(Box::new(SsoAuthInterceptor {
            cookie_header: credentials.cookie_header(),
        }))
    }
}

struct SsoAuthInterceptor {
    cookie_header: String,
}

#[async_trait]
impl Interceptor for SsoAuthInterceptor {
    async fn on_request(&self, ctx: &mut ProxyContext) -> HookResult {
        // Replaces any inbound Cookie header
        ctx.headers
            .insert("cookie".to_string(), self.cookie_header.clone());
        Ok(())
    }
}
