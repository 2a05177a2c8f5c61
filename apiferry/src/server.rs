//! Embeddable proxy server with builder pattern.
//!
//! # Example
//!
//! ```rust,no_run
//! use apiferry::ProxyServer;
//! use apiferry_common::{Provider, ProxyConfig};
//!
//! # async fn example() -> apiferry_common::Result<()> {
//! let mut server = ProxyServer::builder()
//!     .config(ProxyConfig {
//!         target_url: "https://api.example.com/".to_string(),
//!         provider: Provider::ApiKey,
//!         ..Default::default()
//!     })
//!     .build()?;
//!
//! let addr = server.start().await?;
//! println!("proxy listening on {}", addr.url);
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

use crate::pipeline::{handle_request, PipelineShared};
use apiferry_common::constants::LISTEN_HOST;
use apiferry_common::{ProxyConfig, ProxyError, Result};
use apiferry_http::ForwardClient;
use apiferry_observability::AnalyticsSink;
use apiferry_plugin::builtin::{HeaderInjectPlugin, SsoAuthPlugin, TelemetryPlugin};
use apiferry_plugin::{
    process_session_id, CredentialStore, PluginConfig, PluginContext, PluginRegistry, ProxyPlugin,
    SsoCredentials,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Where the started proxy is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAddr {
    pub port: u16,
    pub url: String,
}

/// A local forwarding proxy that can be embedded in your application.
///
/// Use [`ProxyServer::builder()`] to construct one.
pub struct ProxyServer {
    config: Arc<ProxyConfig>,
    registry: PluginRegistry,
    credential_store: Option<Arc<dyn CredentialStore>>,
    analytics: Option<Arc<dyn AnalyticsSink>>,
    client: Option<Arc<ForwardClient>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Builder for constructing a [`ProxyServer`] with ergonomic configuration.
#[derive(Default)]
pub struct ProxyServerBuilder {
    config: ProxyConfig,
    credential_store: Option<Arc<dyn CredentialStore>>,
    analytics: Option<Arc<dyn AnalyticsSink>>,
    telemetry: bool,
    extra_plugins: Vec<Arc<dyn ProxyPlugin>>,
}

impl ProxyServer {
    /// Create a new server builder.
    pub fn builder() -> ProxyServerBuilder {
        ProxyServerBuilder::default()
    }

    /// Start the proxy.
    ///
    /// Retrieves credentials, initializes the interceptor pipeline, binds
    /// the listener (falling back to an ephemeral port when the configured
    /// one is taken), and spawns the accept loop. Returns the bound address.
    ///
    /// # Errors
    ///
    /// Fails before any listener is opened when the server is already
    /// running, or when the provider requires SSO and no credentials are
    /// available.
    pub async fn start(&mut self) -> Result<ProxyAddr> {
        if self.task.is_some() {
            return Err(ProxyError::Internal("server already started".into()));
        }

        let credentials = match &self.credential_store {
            Some(store) => store.retrieve_sso_credentials()?,
            None => None,
        };
        if self.config.provider.requires_sso()
            && credentials.as_ref().is_none_or(SsoCredentials::is_empty)
        {
            return Err(ProxyError::Authentication(
                "no SSO credentials available; sign in before starting the proxy".into(),
            ));
        }

        let plugin_ctx = PluginContext {
            config: self.config.clone(),
            credentials,
            analytics: self.analytics.clone(),
        };
        let interceptors = Arc::new(self.registry.initialize(&plugin_ctx));
        info!(count = interceptors.len(), "Interceptor pipeline ready");

        let client = Arc::new(ForwardClient::new(self.config.request_timeout)?);
        self.client = Some(client.clone());

        let listener = bind_listener(self.config.port).await?;
        let port = listener.local_addr()?.port();
        let url = format!("http://{LISTEN_HOST}:{port}");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let session_id = self
            .config
            .session_id
            .clone()
            .unwrap_or_else(|| process_session_id().to_string());
        let agent = self
            .config
            .client_type
            .clone()
            .unwrap_or_else(|| "unknown".to_string());

        let shared = Arc::new(PipelineShared {
            config: self.config.clone(),
            client,
            interceptors,
            session_id,
            agent,
        });

        self.task = Some(tokio::spawn(accept_loop(listener, shared, shutdown_rx)));

        info!(port, url = %url, target = %self.config.target_url, "Proxy listening");
        Ok(ProxyAddr { port, url })
    }

    /// Stop the proxy: close the listener, flush analytics, release the
    /// HTTP client. In-flight streams finish on their own tasks.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        if let Some(sink) = &self.analytics {
            sink.flush();
        }
        if let Some(client) = self.client.take() {
            client.close();
        }
        info!("Proxy stopped");
    }

    /// Check if the proxy is currently running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Registry access for out-of-band control (enable/disable plugins
    /// between restarts).
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Mutable registry access; changes take effect at the next `start`.
    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }
}

impl Drop for ProxyServer {
    fn drop(&mut self) {
        // Best-effort signal shutdown on drop
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}

impl ProxyServerBuilder {
    /// Set the proxy configuration.
    #[must_use]
    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply the credential store consulted at `start`.
    #[must_use]
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    /// Supply the analytics sink used by the telemetry plugin.
    #[must_use]
    pub fn analytics(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = Some(sink);
        self
    }

    /// Globally enable telemetry. The telemetry plugin stays registered but
    /// disabled otherwise.
    #[must_use]
    pub fn telemetry(mut self, enabled: bool) -> Self {
        self.telemetry = enabled;
        self
    }

    /// Register an additional plugin alongside the built-ins.
    #[must_use]
    pub fn plugin(mut self, plugin: Arc<dyn ProxyPlugin>) -> Self {
        self.extra_plugins.push(plugin);
        self
    }

    /// Build the server with the configured options.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<ProxyServer> {
        self.config.validate()?;

        let mut registry = PluginRegistry::new();
        if self.config.provider.requires_sso() {
            registry.register(Arc::new(SsoAuthPlugin::new()));
        }
        registry.register(Arc::new(HeaderInjectPlugin::new()));

        // Registered disabled unless telemetry is globally on
        let telemetry = Arc::new(TelemetryPlugin::new());
        let priority = telemetry.descriptor().priority;
        registry.register_with(
            telemetry,
            PluginConfig {
                enabled: self.telemetry && self.analytics.is_some(),
                priority,
            },
        );

        for plugin in self.extra_plugins {
            registry.register(plugin);
        }

        Ok(ProxyServer {
            config: Arc::new(self.config),
            registry,
            credential_store: self.credential_store,
            analytics: self.analytics,
            client: None,
            shutdown_tx: None,
            task: None,
        })
    }
}

/// Bind the listener. Address-in-use on a fixed port is recoverable: fall
/// back to an OS-assigned ephemeral port instead of failing to start.
async fn bind_listener(port: Option<u16>) -> Result<TcpListener> {
    let requested = port.unwrap_or(0);
    match TcpListener::bind((LISTEN_HOST, requested)).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse && requested != 0 => {
            warn!(
                port = requested,
                "Configured port already in use, falling back to an ephemeral port"
            );
            Ok(TcpListener::bind((LISTEN_HOST, 0)).await?)
        }
        Err(e) => Err(e.into()),
    }
}

async fn accept_loop(
    listener: TcpListener,
    shared: Arc<PipelineShared>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _peer)) => {
                        let io = TokioIo::new(stream);
                        let shared = shared.clone();
                        tokio::spawn(async move {
                            let service = service_fn(move |req| handle_request(req, shared.clone()));
                            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                                // Client aborts surface here; keep them quiet
                                debug!("Connection ended: {err:?}");
                            }
                        });
                    }
                    Err(e) => error!("Accept failed: {e}"),
                }
            }
            _ = shutdown_rx.changed() => {
                info!("Proxy shutdown requested");
                return;
            }
        }
    }
}
