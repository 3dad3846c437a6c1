//! Integration tests for the demo service.
//!
//! Uses `tower::ServiceExt::oneshot` against the axum router and a
//! memory-backed pipeline, so no port or broker is needed.

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use stile_core::config::{BrokerConfig, DispatcherConfig, MetricsConfig};
use stile_middleware::Options;
use stile_pipeline::{AccessPipeline, BrokerProducer, BrokerSink, MemorySink, PipelineMetrics};
use stile_server::{AppState, broker_producer, build_router};
use tower::ServiceExt; // .oneshot()

// ── Helpers ──────────────────────────────────────────────────

struct Harness {
    pipeline: AccessPipeline,
    sink: Arc<MemorySink>,
    metrics: Arc<PipelineMetrics>,
}

fn harness() -> Harness {
    let sink = Arc::new(MemorySink::new());
    let metrics = Arc::new(PipelineMetrics::new(true).unwrap());
    let broker = BrokerConfig {
        enabled: true,
        ..Default::default()
    };
    let for_connect = Arc::clone(&sink);
    let producer = BrokerProducer::start(&broker, Arc::clone(&metrics), move |_| {
        Ok(for_connect as Arc<dyn BrokerSink>)
    });
    let pipeline =
        AccessPipeline::start(&DispatcherConfig::default(), producer, Arc::clone(&metrics)).unwrap();
    Harness {
        pipeline,
        sink,
        metrics,
    }
}

fn app(h: &Harness) -> axum::Router {
    let options = Options {
        server_id: "test-node".into(),
        server_port: "8080".into(),
        ..Options::default()
    }
    .with_request_logger(h.pipeline.request_logger());
    let metrics = MetricsConfig {
        enabled: true,
        ..Default::default()
    };
    build_router(AppState::new(options, Arc::clone(&h.metrics)), &metrics)
}

fn post_order(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/orders")
        .header("content-type", "application/json")
        .header("trace.id", "it-1")
        .header("x-device-id", "D-42")
        .header("x-user-id", "1001")
        .header("x-user-name", "alice")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_for_messages(sink: &MemorySink, n: usize) {
    for _ in 0..200 {
        if sink.len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {n} broker messages, got {}", sink.len());
}

// ── Orders ───────────────────────────────────────────────────

#[tokio::test]
async fn create_order_publishes_access_record() {
    let h = harness();
    let resp = app(&h)
        .oneshot(post_order(r#"{"sku":"A-1","qty":2}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let reply = body_json(resp).await;
    assert_eq!(reply["id"], 1);
    assert_eq!(reply["sku"], "A-1");

    wait_for_messages(&h.sink, 1).await;
    let msg = &h.sink.messages()[0];
    assert_eq!(msg.key, "it-1");
    assert_eq!(msg.topic, "http-access");

    let record: serde_json::Value = serde_json::from_slice(&msg.payload).unwrap();
    assert_eq!(record["server_id"], "test-node");
    assert_eq!(record["request"]["path"], "/api/orders");
    assert_eq!(record["request"]["body"], r#"{"sku":"A-1","qty":2}"#);
    assert_eq!(record["response"]["status"], 200);
    assert_eq!(record["user_track_feature"]["device_id"], "D-42");
    assert_eq!(record["user_track_feature"]["user_id"], 1001);
    assert_eq!(record["user_track_feature"]["username"], "alice");

    h.pipeline.stop().await;
}

#[tokio::test]
async fn invalid_order_records_error_status() {
    let h = harness();
    let resp = app(&h)
        .oneshot(post_order(r#"{"sku":"","qty":0}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["reason"], "INVALID_ORDER");

    wait_for_messages(&h.sink, 1).await;
    let record: serde_json::Value = serde_json::from_slice(&h.sink.messages()[0].payload).unwrap();
    assert_eq!(record["response"]["status"], 400);
    h.pipeline.stop().await;
}

#[tokio::test]
async fn malformed_json_never_reaches_handler() {
    let h = harness();
    let resp = app(&h).oneshot(post_order("not json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let stats = h.pipeline.stop().await;
    assert_eq!(stats.accepted, 0);
    assert!(h.sink.is_empty());
}

// ── Health and metrics ───────────────────────────────────────

#[tokio::test]
async fn health_is_not_instrumented() {
    let h = harness();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app(&h).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.pipeline.stats().accepted, 0);
    h.pipeline.stop().await;
}

#[tokio::test]
async fn metrics_endpoint_reports_dispatch() {
    let h = harness();
    let router = app(&h);
    router
        .clone()
        .oneshot(post_order(r#"{"sku":"B","qty":1}"#))
        .await
        .unwrap();
    wait_for_messages(&h.sink, 1).await;

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("stile_dispatch_total{outcome=\"accepted\"} 1"));
    h.pipeline.stop().await;
}

// ── Producer wiring ──────────────────────────────────────────

#[cfg(not(feature = "kafka"))]
#[tokio::test]
async fn broker_enabled_without_kafka_feature_is_disabled() {
    let config = BrokerConfig {
        enabled: true,
        ..Default::default()
    };
    let producer = broker_producer(&config, Arc::new(PipelineMetrics::disabled()));
    assert!(!producer.is_enabled());
}
