//! Custom plugins driven through a live proxy.

use crate::{expected_stream_body, make_client, start_upstream};
use apiferry::{
    Interceptor, PluginContext, PluginDescriptor, Provider, ProxyConfig, ProxyContext,
    ProxyPlugin, ProxyServer,
};
use apiferry_observability::AnalyticsSink;
use apiferry_plugin::{HookResult, ResponseHead, ResponseMetadata};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct StampPlugin;
struct StampInterceptor;

impl ProxyPlugin for StampPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new("stamp", "Stamp header", 50)
    }

    fn create(&self, _ctx: &PluginContext) -> apiferry_common::Result<Box<dyn Interceptor>> {
        Ok(Box::new(StampInterceptor))
    }
}

#[async_trait]
impl Interceptor for StampInterceptor {
    async fn on_request(&self, ctx: &mut ProxyContext) -> HookResult {
        ctx.headers.insert("x-stamped".to_string(), "yes".to_string());
        Ok(())
    }
}

struct UpperPlugin;
struct UpperInterceptor;

impl ProxyPlugin for UpperPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new("upper", "Uppercase chunks", 60)
    }

    fn create(&self, _ctx: &PluginContext) -> apiferry_common::Result<Box<dyn Interceptor>> {
        Ok(Box::new(UpperInterceptor))
    }
}

#[async_trait]
impl Interceptor for UpperInterceptor {
    async fn on_response_chunk(
        &self,
        _ctx: &mut ProxyContext,
        chunk: Bytes,
    ) -> HookResult<Option<Bytes>> {
        Ok(Some(Bytes::from(
            String::from_utf8_lossy(&chunk).to_uppercase(),
        )))
    }
}

#[tokio::test]
async fn test_custom_plugin_mutates_outbound_headers() {
    let (upstream, _upstream_task) = start_upstream().await;

    let config = ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder()
        .config(config)
        .plugin(Arc::new(StampPlugin))
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let echo: serde_json::Value = make_client()
        .get(format!("{}/v1/models", addr.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echo["headers"]["x-stamped"], "yes");

    server.stop().await;
}

#[tokio::test]
async fn test_chunk_transform_applies_to_streamed_body() {
    let (upstream, _upstream_task) = start_upstream().await;

    let config = ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder()
        .config(config)
        .plugin(Arc::new(UpperPlugin))
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let resp = make_client()
        .get(format!("{}/stream", addr.url))
        .send()
        .await
        .unwrap();
    let mut body = String::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        body.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
    }
    assert_eq!(body, expected_stream_body().to_uppercase());

    server.stop().await;
}

struct FaultyPlugin;
struct FaultyInterceptor;

impl ProxyPlugin for FaultyPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new("faulty", "Hooks that always fail", 40)
    }

    fn create(&self, _ctx: &PluginContext) -> apiferry_common::Result<Box<dyn Interceptor>> {
        Ok(Box::new(FaultyInterceptor))
    }
}

#[async_trait]
impl Interceptor for FaultyInterceptor {
    async fn on_request(&self, _ctx: &mut ProxyContext) -> HookResult {
        Err("request hook failed".into())
    }

    async fn on_response_headers(
        &self,
        _ctx: &mut ProxyContext,
        _head: &ResponseHead,
    ) -> HookResult {
        Err("headers hook failed".into())
    }

    async fn on_response_complete(
        &self,
        _ctx: &ProxyContext,
        _meta: &ResponseMetadata,
    ) -> HookResult {
        Err("complete hook failed".into())
    }

    async fn on_error(&self, _ctx: &ProxyContext, _err: &apiferry::ProxyError) -> HookResult {
        Err("error hook failed".into())
    }
}

struct RecorderPlugin {
    log: Arc<Mutex<Vec<&'static str>>>,
}

struct RecorderInterceptor {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl ProxyPlugin for RecorderPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new("recorder", "Stage order recorder", 70)
    }

    fn create(&self, _ctx: &PluginContext) -> apiferry_common::Result<Box<dyn Interceptor>> {
        Ok(Box::new(RecorderInterceptor {
            log: self.log.clone(),
        }))
    }
}

#[async_trait]
impl Interceptor for RecorderInterceptor {
    async fn on_response_headers(
        &self,
        _ctx: &mut ProxyContext,
        _head: &ResponseHead,
    ) -> HookResult {
        self.log.lock().unwrap().push("headers");
        Ok(())
    }

    async fn on_response_chunk(
        &self,
        _ctx: &mut ProxyContext,
        chunk: Bytes,
    ) -> HookResult<Option<Bytes>> {
        self.log.lock().unwrap().push("chunk");
        Ok(Some(chunk))
    }

    async fn on_response_complete(
        &self,
        _ctx: &ProxyContext,
        _meta: &ResponseMetadata,
    ) -> HookResult {
        self.log.lock().unwrap().push("complete");
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl AnalyticsSink for RecordingSink {
    fn track(&self, event: &str, attributes: serde_json::Value) {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), attributes));
    }
}

#[tokio::test]
async fn test_failing_hooks_never_break_the_request() {
    let (upstream, _upstream_task) = start_upstream().await;

    let config = ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder()
        .config(config)
        .plugin(Arc::new(FaultyPlugin))
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    // Every non-chunk hook of the faulty plugin errors; the request must
    // still complete end to end
    let resp = make_client()
        .post(format!("{}/v1/chat", addr.url))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let echo: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(echo["path"], "/v1/chat");

    server.stop().await;
}

#[tokio::test]
async fn test_header_hooks_run_before_first_chunk() {
    let (upstream, _upstream_task) = start_upstream().await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let config = ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder()
        .config(config)
        .plugin(Arc::new(RecorderPlugin { log: log.clone() }))
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let resp = make_client()
        .get(format!("{}/stream", addr.url))
        .send()
        .await
        .unwrap();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        chunk.unwrap();
    }

    // The complete hook runs on the streaming task; give it a moment
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if log.lock().unwrap().last() == Some(&"complete") {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "complete hook never ran");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let log = log.lock().unwrap();
    assert_eq!(log.first(), Some(&"headers"));
    let chunks = log.iter().filter(|s| **s == "chunk").count();
    assert!(chunks >= 1);
    // headers, then only chunks, then complete
    assert!(log[1..log.len() - 1].iter().all(|s| *s == "chunk"));

    server.stop().await;
}

#[tokio::test]
async fn test_telemetry_records_resolved_upstream_url() {
    let (upstream, _upstream_task) = start_upstream().await;

    let sink = Arc::new(RecordingSink::default());
    let config = ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder()
        .config(config)
        .analytics(sink.clone())
        .telemetry(true)
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let resp = make_client()
        .post(format!("{}/v1/chat", addr.url))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let events = sink.events.lock().unwrap();
    let (event, attrs) = events.first().expect("telemetry event recorded");
    assert_eq!(event, "proxy_request");
    assert_eq!(
        attrs["upstreamUrl"],
        format!("http://{upstream}/v1/chat")
    );

    server.stop().await;
}

#[tokio::test]
async fn test_disabled_plugin_is_inert() {
    let (upstream, _upstream_task) = start_upstream().await;

    let config = ProxyConfig {
        target_url: format!("http://{upstream}/"),
        provider: Provider::ApiKey,
        ..Default::default()
    };
    let mut server = ProxyServer::builder()
        .config(config)
        .plugin(Arc::new(StampPlugin))
        .build()
        .unwrap();
    server.registry_mut().set_enabled("stamp", false).unwrap();
    let addr = server.start().await.unwrap();

    let echo: serde_json::Value = make_client()
        .get(format!("{}/v1/models", addr.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(echo["headers"].get("x-stamped").is_none());

    server.stop().await;
}
