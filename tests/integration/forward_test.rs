//! End-to-end forwarding: path join, header passthrough, body relay.

use crate::{make_client, start_upstream};
use apiferry::{Provider, ProxyConfig, ProxyServer};

#[tokio::test]
async fn test_post_forwarded_with_single_slash_join() {
    let (upstream, _upstream_task) = start_upstream().await;

    // Trailing slash on the base plus a leading slash on the path must
    // still produce exactly one separator
    let config = ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder().config(config).build().unwrap();
    let addr = server.start().await.unwrap();

    let resp = make_client()
        .post(format!("{}/v1/chat", addr.url))
        .header("x-caller", "integration")
        .header("authorization", "Bearer sk-test")
        .body(r#"{"prompt":"hi"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let echo: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/v1/chat");
    assert_eq!(echo["body"], r#"{"prompt":"hi"}"#);

    // Client headers pass through verbatim
    assert_eq!(echo["headers"]["x-caller"], "integration");
    assert_eq!(echo["headers"]["authorization"], "Bearer sk-test");
    // The host header belongs to the upstream hop, not the proxy hop
    assert_eq!(echo["headers"]["host"], upstream.to_string());

    // The header plugin stamps identity headers on every request
    assert!(echo["headers"]["x-request-id"].is_string());
    assert!(echo["headers"]["x-session-id"].is_string());

    server.stop().await;
}

#[tokio::test]
async fn test_query_string_is_preserved() {
    let (upstream, _upstream_task) = start_upstream().await;

    let config = ProxyConfig {
        target_url: format!("http://{upstream}"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder().config(config).build().unwrap();
    let addr = server.start().await.unwrap();

    let resp = make_client()
        .get(format!("{}/v1/models?limit=5&after=m1", addr.url))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let echo: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(echo["method"], "GET");
    assert_eq!(echo["path"], "/v1/models?limit=5&after=m1");

    server.stop().await;
}

#[tokio::test]
async fn test_request_ids_differ_between_requests() {
    let (upstream, _upstream_task) = start_upstream().await;

    let config = ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder().config(config).build().unwrap();
    let addr = server.start().await.unwrap();
    let client = make_client();

    let first: serde_json::Value = client
        .get(format!("{}/v1/models", addr.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: serde_json::Value = client
        .get(format!("{}/v1/models", addr.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_ne!(
        first["headers"]["x-request-id"],
        second["headers"]["x-request-id"]
    );
    assert_eq!(
        first["headers"]["x-session-id"],
        second["headers"]["x-session-id"]
    );

    server.stop().await;
}
