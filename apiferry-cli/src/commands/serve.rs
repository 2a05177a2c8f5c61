//! Serve subcommand implementation

use crate::credentials::EnvCredentialStore;
use anyhow::Result;
use apiferry::ProxyServer;
use apiferry_common::{Provider, ProxyConfig};
use apiferry_observability::{init_logging, TracingSink};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Base URL of the upstream API endpoint
    #[arg(long, env = "APIFERRY_TARGET_URL")]
    target_url: String,

    /// Listen port (omit for an OS-assigned ephemeral port)
    #[arg(long, env = "APIFERRY_PORT")]
    port: Option<u16>,

    /// Upstream provider kind: sso or api-key
    #[arg(long, default_value = "api-key", env = "APIFERRY_PROVIDER")]
    provider: Provider,

    /// Integration id header value (SSO providers only)
    #[arg(long, env = "APIFERRY_INTEGRATION_ID")]
    integration_id: Option<String>,

    /// Model name forwarded to the upstream
    #[arg(long, env = "APIFERRY_MODEL")]
    model: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, env = "APIFERRY_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Client-type label forwarded to the upstream
    #[arg(long, env = "APIFERRY_CLIENT_TYPE")]
    client_type: Option<String>,

    /// Session id reused across requests (generated if omitted)
    #[arg(long, env = "APIFERRY_SESSION_ID")]
    session_id: Option<String>,

    /// Enable the telemetry plugin
    #[arg(long, env = "APIFERRY_TELEMETRY")]
    telemetry: bool,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    init_logging();

    info!("Starting apiferry v{}", env!("CARGO_PKG_VERSION"));

    let config = ProxyConfig {
        target_url: args.target_url,
        port: args.port,
        provider: args.provider,
        integration_id: args.integration_id,
        model: args.model,
        request_timeout: args.timeout_secs.map(Duration::from_secs),
        client_type: args.client_type,
        session_id: args.session_id,
    };

    let mut builder = ProxyServer::builder()
        .config(config)
        .credential_store(Arc::new(EnvCredentialStore::new()));
    if args.telemetry {
        builder = builder.analytics(Arc::new(TracingSink)).telemetry(true);
    }

    let mut server = builder.build()?;
    let addr = server.start().await?;
    info!("Proxy ready on {}", addr.url);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    server.stop().await;

    Ok(())
}
