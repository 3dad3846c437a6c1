use crate::orders::{CreateOrder, OrderError, OrderService};
use axum::body::to_bytes;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use stile_core::config::{BrokerConfig, MetricsConfig};
use stile_middleware::{AccessLog, Handler, HttpRequest, HttpTransport, Options, ServerContext, access_log};
use stile_pipeline::{BrokerProducer, PipelineMetrics};

/// Largest request body accepted by the order endpoint.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for the demo service.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<AccessLog<OrderService>>,
    pub metrics: Arc<PipelineMetrics>,
}

impl AppState {
    pub fn new(options: Options, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            orders: Arc::new(access_log(OrderService::default(), options)),
            metrics,
        }
    }
}

pub fn build_router(state: AppState, metrics: &MetricsConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/orders", post(create_order));
    if metrics.enabled {
        app = app.route(&metrics.path, get(metrics_handler));
    }
    app.with_state(state)
}

/// Build the broker producer for this binary's feature set.
pub fn broker_producer(config: &BrokerConfig, metrics: Arc<PipelineMetrics>) -> BrokerProducer {
    #[cfg(feature = "kafka")]
    {
        BrokerProducer::start(config, metrics, |reporter| {
            stile_pipeline::kafka::KafkaSink::connect(config, reporter)
        })
    }
    #[cfg(not(feature = "kafka"))]
    {
        if config.enabled {
            tracing::warn!("Built without the `kafka` feature, broker publishing disabled");
        }
        BrokerProducer::disabled(config, metrics)
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn create_order(State(state): State<AppState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };
    let order: CreateOrder = match serde_json::from_slice(&bytes) {
        Ok(order) => order,
        Err(e) => {
            let err = OrderError {
                code: 400,
                reason: "BAD_REQUEST".into(),
                message: e.to_string(),
            };
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    let ctx = ServerContext::new(HttpTransport::new(HttpRequest::from_parts(&parts, peer)));
    match state.orders.handle(&ctx, order).await {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => {
            let status = StatusCode::from_u16(err.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(err)).into_response()
        }
    }
}
