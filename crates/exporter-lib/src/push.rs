//! Push ingestion
//!
//! Accepts batches of externally produced metric points on `/v1/push`,
//! fills in the local hostname where a point has no endpoint, and hands
//! the batch to a [`MetricSink`] without waiting for the outcome.

use crate::models::MetricValue;
use crate::observability::ExporterMetrics;
use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Router};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const PUSH_PATH: &str = "/v1/push";
pub const BLANK_BODY: &str = "body is blank";
pub const DECODE_FAILED: &str = "cannot decode body";
pub const SUCCESS: &str = "success";

/// Downstream consumer of pushed batches. `send` must not block.
pub trait MetricSink: Send + Sync {
    fn send(&self, batch: Vec<MetricValue>);
}

/// Posts batches as JSON to a transfer endpoint from a detached task
pub struct TransferSink {
    url: String,
    client: reqwest::Client,
    metrics: ExporterMetrics,
}

impl TransferSink {
    pub fn new(url: impl Into<String>, metrics: ExporterMetrics) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
            metrics,
        })
    }
}

impl MetricSink for TransferSink {
    fn send(&self, batch: Vec<MetricValue>) {
        let request = self.client.post(&self.url).json(&batch);
        let url = self.url.clone();
        let count = batch.len();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            match request.send().await.and_then(|r| r.error_for_status()) {
                Ok(_) => debug!(url = %url, points = count, "Forwarded pushed metrics"),
                Err(e) => {
                    metrics.inc_push_rejected("forward_failed");
                    warn!(url = %url, points = count, error = %e, "Failed to forward pushed metrics");
                }
            }
        });
    }
}

/// Used when no transfer endpoint is configured
pub struct LogSink;

impl MetricSink for LogSink {
    fn send(&self, batch: Vec<MetricValue>) {
        debug!(points = batch.len(), "No transfer endpoint configured, dropping pushed metrics");
    }
}

#[derive(Clone)]
pub struct PushState {
    pub hostname: String,
    pub sink: Arc<dyn MetricSink>,
    pub metrics: ExporterMetrics,
}

impl PushState {
    pub fn new(hostname: impl Into<String>, sink: Arc<dyn MetricSink>, metrics: ExporterMetrics) -> Self {
        Self {
            hostname: hostname.into(),
            sink,
            metrics,
        }
    }
}

/// Decode a batch and default missing endpoints
pub fn prepare_batch(body: &[u8], hostname: &str) -> Result<Vec<MetricValue>, &'static str> {
    if body.is_empty() {
        return Err(BLANK_BODY);
    }
    let mut batch: Vec<MetricValue> = serde_json::from_slice(body).map_err(|_| DECODE_FAILED)?;
    for point in &mut batch {
        point.fill_endpoint(hostname);
    }
    Ok(batch)
}

async fn push(State(state): State<PushState>, body: Bytes) -> (StatusCode, &'static str) {
    match prepare_batch(&body, &state.hostname) {
        Ok(batch) => {
            state.metrics.inc_push_points(batch.len());
            state.sink.send(batch);
            (StatusCode::OK, SUCCESS)
        }
        Err(reason) => {
            let label = if reason == BLANK_BODY { "blank" } else { "decode" };
            state.metrics.inc_push_rejected(label);
            (StatusCode::BAD_REQUEST, reason)
        }
    }
}

/// Router serving the push endpoint
pub fn router(state: PushState) -> Router {
    Router::new().route(PUSH_PATH, post(push)).with_state(state)
}
