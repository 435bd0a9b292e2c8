//! HTTP API: scrape, health, readiness, index and push

use crate::health::HealthRegistry;
use crate::push::{self, PushState};
use crate::registry::MetricsRegistry;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::{info, warn};

pub const METRICS_PATH: &str = "/metrics";
pub const HEALTHZ_PATH: &str = "/healthz";
pub const READYZ_PATH: &str = "/readyz";

const INDEX_HTML: &str = r#"<html>
<head><title>Kube Metrics Server</title></head>
<body>
<h1>Kube Metrics</h1>
<ul>
<li><a href='/metrics'>metrics</a></li>
<li><a href='/healthz'>healthz</a></li>
</ul>
</body>
</html>"#;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: MetricsRegistry,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(registry: MetricsRegistry, health_registry: HealthRegistry) -> Self {
        Self {
            registry,
            health_registry,
        }
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Liveness: the process is up
async fn healthz() -> &'static str {
    "ok"
}

/// Readiness - 200 once every cache has synced, 503 before
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Gather every collector and render the text exposition format
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.registry.render() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.registry.content_type())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Create the API router; the push endpoint is mounted when `push` is given
pub fn create_router(state: Arc<AppState>, push: Option<PushState>) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route(METRICS_PATH, get(metrics))
        .route(HEALTHZ_PATH, get(healthz))
        .route(READYZ_PATH, get(readyz))
        .with_state(state);

    match push {
        Some(push_state) => router.merge(push::router(push_state)),
        None => router,
    }
}

/// Serve until `shutdown` resolves; in-flight requests are allowed to finish
pub async fn serve<F>(
    port: u16,
    state: Arc<AppState>,
    push: Option<PushState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state, push);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting metrics server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
