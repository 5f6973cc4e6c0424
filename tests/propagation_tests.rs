//! End-to-end propagation across a real loopback hop.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::{service_fn, ServiceBuilder, ServiceExt};

use paylog::context::{self, ContextKey, ContextSnapshot, RequestContext};
use paylog::http::CorrelationLayer;
use paylog::propagation::{AsyncPropagation, PropagationLayer, Propagator};

/// Downstream service reporting the propagation headers it received.
async fn start_downstream() -> SocketAddr {
    async fn headers(headers: HeaderMap) -> Json<Value> {
        let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        Json(json!({
            "correlation_id": get("x-correlation-id"),
            "transaction_id": get("x-transaction-id"),
            "user_id": get("x-user-id"),
        }))
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/headers", get(headers));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

#[tokio::test]
async fn test_inbound_id_reaches_downstream() {
    let downstream = start_downstream().await;
    let client = reqwest::Client::new();

    // Upstream handler calls downstream with its own context attached.
    async fn forward(State((client, url)): State<(reqwest::Client, String)>) -> Json<Value> {
        let request = Propagator::default().async_request(client.get(url), &ContextSnapshot::capture());
        Json(request.send().await.unwrap().json().await.unwrap())
    }
    let upstream = Router::new()
        .route("/forward", get(forward))
        .with_state((client, format!("http://{downstream}/headers")))
        .layer(CorrelationLayer::default());

    let response = upstream
        .oneshot(
            Request::get("/forward")
                .header("x-correlation-id", "abc-123")
                .header("x-transaction-id", "tx-7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let seen: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(seen["correlation_id"], "abc-123");
    assert_eq!(seen["transaction_id"], "tx-7");
    assert_eq!(seen["user_id"], Value::Null);
}

#[tokio::test]
async fn test_snapshot_survives_spawned_task() {
    let downstream = start_downstream().await;
    let client = reqwest::Client::new();
    let url = format!("http://{downstream}/headers");

    let ctx = RequestContext::new()
        .with(ContextKey::CorrelationId, "abc-123")
        .with(ContextKey::UserId, "u-1");
    let handle = context::scope(ctx, async move {
        let snapshot = context::snapshot();
        context::spawn_with(snapshot.clone(), async move {
            assert_eq!(context::get(ContextKey::CorrelationId).as_deref(), Some("abc-123"));
            let response = client.get(url).with_snapshot(&snapshot).send().await.unwrap();
            response.json::<Value>().await.unwrap()
        })
    })
    .await;

    let seen = handle.await.unwrap();
    assert_eq!(seen["correlation_id"], "abc-123");
    assert_eq!(seen["user_id"], "u-1");
}

#[test]
fn test_blocking_client_reads_live_context() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let downstream = runtime.block_on(start_downstream());

    let ctx = RequestContext::new().with(ContextKey::CorrelationId, "abc-123");
    let seen: Value = context::sync_scope(ctx, || {
        let client = reqwest::blocking::Client::new();
        Propagator::default()
            .blocking(client.get(format!("http://{downstream}/headers")))
            .send()
            .unwrap()
            .json()
            .unwrap()
    });
    assert_eq!(seen["correlation_id"], "abc-123");
}

#[tokio::test]
async fn test_tower_client_layer_stamps_headers() {
    let client = ServiceBuilder::new()
        .layer(PropagationLayer::new())
        .service(service_fn(|req: Request<()>| async move {
            Ok::<_, std::convert::Infallible>(
                req.headers()
                    .get("x-correlation-id")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            )
        }));

    let ctx = RequestContext::new().with(ContextKey::CorrelationId, "abc-123");
    let seen = context::scope(ctx, async {
        client.oneshot(Request::get("/ledger").body(()).unwrap()).await.unwrap()
    })
    .await;
    assert_eq!(seen.as_deref(), Some("abc-123"));
}
