//! SSO cookie injection and credential gating.

use crate::{make_client, start_upstream, StaticStore};
use apiferry::{Provider, ProxyConfig, ProxyError, ProxyServer, SsoCredentials};
use std::sync::Arc;

fn sso_config(upstream: std::net::SocketAddr) -> ProxyConfig {
    ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::Sso,
        integration_id: Some("intg-7".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_cookie_header_injected_in_sorted_order() {
    let (upstream, _upstream_task) = start_upstream().await;

    let mut creds = SsoCredentials::new();
    // Deliberately inserted out of order
    creds.insert("b", "2");
    creds.insert("a", "1");

    let mut server = ProxyServer::builder()
        .config(sso_config(upstream))
        .credential_store(Arc::new(StaticStore(creds)))
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let echo: serde_json::Value = make_client()
        .post(format!("{}/v1/chat", addr.url))
        .body("{}")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echo["headers"]["cookie"], "a=1; b=2");
    assert_eq!(echo["headers"]["x-integration-id"], "intg-7");

    server.stop().await;
}

#[tokio::test]
async fn test_client_cookie_replaced_not_merged() {
    let (upstream, _upstream_task) = start_upstream().await;

    let mut creds = SsoCredentials::new();
    creds.insert("session", "srv");

    let mut server = ProxyServer::builder()
        .config(sso_config(upstream))
        .credential_store(Arc::new(StaticStore(creds)))
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let echo: serde_json::Value = make_client()
        .get(format!("{}/v1/models", addr.url))
        .header("cookie", "stale=1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echo["headers"]["cookie"], "session=srv");

    server.stop().await;
}

#[tokio::test]
async fn test_start_refused_without_credentials() {
    let (upstream, _upstream_task) = start_upstream().await;

    let mut server = ProxyServer::builder()
        .config(sso_config(upstream))
        .credential_store(Arc::new(StaticStore(SsoCredentials::new())))
        .build()
        .unwrap();

    let err = server.start().await.unwrap_err();
    assert!(matches!(err, ProxyError::Authentication(_)), "got {err:?}");
}

#[tokio::test]
async fn test_api_key_provider_does_not_touch_cookies() {
    let (upstream, _upstream_task) = start_upstream().await;

    let config = ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder().config(config).build().unwrap();
    let addr = server.start().await.unwrap();

    let echo: serde_json::Value = make_client()
        .get(format!("{}/v1/models", addr.url))
        .header("cookie", "mine=1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echo["headers"]["cookie"], "mine=1");

    server.stop().await;
}
