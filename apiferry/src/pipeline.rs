//! Per-request lifecycle: context build, hook stages, upstream forward, and
//! the streaming copy loop.
//!
//! The body is never buffered: each upstream chunk passes through the
//! interceptor chain and is written to the client through a capacity-1
//! channel before the next chunk is pulled, bounding memory to one chunk.

use apiferry_common::constants::{STRIPPED_REQUEST_HEADERS, STRIPPED_RESPONSE_HEADERS};
use apiferry_common::{ErrorBody, ProxyConfig, ProxyError};
use apiferry_http::{join_url, ForwardClient, UpstreamResponse};
use apiferry_plugin::{BoxError, Interceptor, ProxyContext, ResponseHead, ResponseMetadata};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::{Request, Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

pub(crate) type BoxBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// State shared by every request for the lifetime of one server start.
/// The interceptor list is read-only after `initialize`.
pub(crate) struct PipelineShared {
    pub config: Arc<ProxyConfig>,
    pub client: Arc<ForwardClient>,
    pub interceptors: Arc<Vec<Box<dyn Interceptor>>>,
    pub session_id: String,
    pub agent: String,
}

/// Methods whose inbound body is read and forwarded.
fn method_carries_body(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH")
}

pub(crate) async fn handle_request(
    req: Request<Incoming>,
    shared: Arc<PipelineShared>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().as_str().to_string();
    let path = req
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str())
        .to_string();

    let mut ctx = ProxyContext::new(&method, &path, &shared.session_id, &shared.agent);

    // 1. Build context: copy headers verbatim, minus hop-by-hop ones
    let (parts, body) = req.into_parts();
    for (name, value) in &parts.headers {
        let name = name.as_str().to_ascii_lowercase();
        if STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            ctx.headers.insert(name, value.to_string());
        }
    }

    if method_carries_body(&method) {
        match body.collect().await {
            Ok(collected) => {
                let bytes = collected.to_bytes();
                ctx.body = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            Err(e) => {
                // The client went away while sending its body; nothing to answer
                debug!(request_id = %ctx.request_id, error = %e, "Failed to read inbound body");
                return Ok(empty_response(StatusCode::BAD_REQUEST));
            }
        }
    }

    // 2. Request hooks, best-effort. The upstream URL is resolved first so
    // request-stage hooks (telemetry) see it in the context.
    let url = join_url(&shared.config.target_url, &ctx.path);
    ctx.target_url = Some(url.clone());
    for interceptor in shared.interceptors.iter() {
        if let Err(e) = interceptor.on_request(&mut ctx).await {
            warn!(request_id = %ctx.request_id, error = %e, "on_request hook failed, skipping");
        }
    }

    // 3. Forward upstream
    debug!(request_id = %ctx.request_id, method = %ctx.method, url = %url, "Forwarding request");

    let upstream = match shared
        .client
        .forward(&url, &ctx.method, &ctx.headers, ctx.body.clone())
        .await
    {
        Ok(upstream) => upstream,
        Err(err) => return Ok(error_response(&shared, &ctx, &err).await),
    };

    // 4. Header hooks run before any body byte is written to the client
    let head = ResponseHead {
        status: upstream.status(),
        status_message: upstream.status_message().to_string(),
        headers: upstream.headers().clone(),
    };
    for interceptor in shared.interceptors.iter() {
        if let Err(e) = interceptor.on_response_headers(&mut ctx, &head).await {
            warn!(request_id = %ctx.request_id, error = %e, "on_response_headers hook failed, skipping");
        }
    }

    // 5. Stream the body chunk by chunk
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(head.status).unwrap_or(StatusCode::BAD_GATEWAY));
    for (name, value) in &head.headers {
        if STRIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        builder = builder.header(name, value);
    }

    // Capacity 1: the next chunk is not pulled until the previous write
    // completes, so memory stays bounded to one chunk. An `Err` on the
    // channel makes hyper abort the connection instead of ending the body.
    let (tx, rx) = mpsc::channel::<std::result::Result<Frame<Bytes>, BoxError>>(1);
    let interceptors = shared.interceptors.clone();
    tokio::spawn(stream_upstream_body(upstream, ctx, interceptors, head, tx));

    let stream_body = StreamBody::new(ReceiverStream::new(rx)).boxed();

    match builder.body(stream_body) {
        Ok(response) => Ok(response),
        Err(e) => {
            error!("Failed to build downstream response: {e}");
            Ok(empty_response(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

/// Copy loop: pull one chunk, run it through the hook chain, push it to the
/// client, repeat. Runs after status and headers are committed.
async fn stream_upstream_body(
    mut upstream: UpstreamResponse,
    mut ctx: ProxyContext,
    interceptors: Arc<Vec<Box<dyn Interceptor>>>,
    head: ResponseHead,
    tx: mpsc::Sender<std::result::Result<Frame<Bytes>, BoxError>>,
) {
    let mut bytes_sent: u64 = 0;
    loop {
        match upstream.next_chunk().await {
            Ok(Some(chunk)) => {
                let Some(out) = apply_chunk_hooks(&interceptors, &mut ctx, chunk).await else {
                    continue;
                };
                let len = out.len() as u64;
                if tx.send(Ok(Frame::data(out))).await.is_err() {
                    // Downstream disconnected: a user cancelling their
                    // session, not an error
                    debug!(request_id = %ctx.request_id, "Client disconnected, stopping stream");
                    return;
                }
                bytes_sent += len;
            }
            Ok(None) => {
                let meta = ResponseMetadata {
                    status: head.status,
                    status_message: head.status_message,
                    headers: head.headers,
                    bytes_sent,
                    duration_ms: ctx.elapsed_ms(),
                };
                for interceptor in interceptors.iter() {
                    if let Err(e) = interceptor.on_response_complete(&ctx, &meta).await {
                        warn!(request_id = %ctx.request_id, error = %e, "on_response_complete hook failed, skipping");
                    }
                }
                debug!(
                    request_id = %ctx.request_id,
                    status = meta.status,
                    bytes_sent = meta.bytes_sent,
                    duration_ms = meta.duration_ms,
                    "Request complete"
                );
                return;
            }
            Err(err) => {
                // Status and headers are already committed; surface the
                // failure on the body channel so the connection aborts
                // rather than ending the body as if it were complete
                run_error_hooks(&interceptors, &ctx, &err).await;
                log_proxy_error(&ctx, &err);
                let _ = tx.send(Err(err.into())).await;
                return;
            }
        }
    }
}

/// Run the chunk through every interceptor in priority order. A hook may
/// transform the chunk; the first hook to return `None` drops it and skips
/// the remaining hooks. A hook error passes the chunk through unmodified.
pub(crate) async fn apply_chunk_hooks(
    interceptors: &[Box<dyn Interceptor>],
    ctx: &mut ProxyContext,
    chunk: Bytes,
) -> Option<Bytes> {
    let mut current = chunk;
    for interceptor in interceptors {
        match interceptor.on_response_chunk(ctx, current.clone()).await {
            Ok(Some(next)) => current = next,
            Ok(None) => return None,
            Err(e) => {
                warn!(request_id = %ctx.request_id, error = %e, "on_response_chunk hook failed, passing chunk through");
            }
        }
    }
    Some(current)
}

async fn run_error_hooks(
    interceptors: &[Box<dyn Interceptor>],
    ctx: &ProxyContext,
    err: &ProxyError,
) {
    for interceptor in interceptors {
        if let Err(e) = interceptor.on_error(ctx, err).await {
            warn!(request_id = %ctx.request_id, error = %e, "on_error hook failed, skipping");
        }
    }
}

/// Operational errors (upstream hiccups the caller may retry) log quietly;
/// everything else logs loudly with full detail.
fn log_proxy_error(ctx: &ProxyContext, err: &ProxyError) {
    if err.is_operational() {
        debug!(request_id = %ctx.request_id, kind = err.kind(), error = %err, "Upstream request failed");
    } else {
        error!(request_id = %ctx.request_id, kind = err.kind(), error = %err, "Request failed");
    }
}

/// Full error path for failures before any response bytes are committed:
/// run `on_error` hooks, log, and answer with the normalized JSON body.
async fn error_response(
    shared: &PipelineShared,
    ctx: &ProxyContext,
    err: &ProxyError,
) -> Response<BoxBody> {
    run_error_hooks(&shared.interceptors, ctx, err).await;
    log_proxy_error(ctx, err);

    let body = ErrorBody::new(err, &ctx.request_id).to_json();
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(full_body(Bytes::from(body)))
    {
        Ok(response) => response,
        Err(_) => empty_response(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn full_body(bytes: Bytes) -> BoxBody {
    Full::new(bytes).map_err(|never| match never {}).boxed()
}

fn empty_response(status: StatusCode) -> Response<BoxBody> {
    #[allow(clippy::unwrap_used)]
    Response::builder()
        .status(status)
        .body(full_body(Bytes::new()))
        .unwrap()
}
