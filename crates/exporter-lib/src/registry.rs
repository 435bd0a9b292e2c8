//! Explicit metrics registry
//!
//! Built once at startup and handed to the HTTP server. Registration only
//! happens before serving, so gathering needs no extra coordination.

use crate::error::{ExporterError, Result};
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};

#[derive(Clone, Default)]
pub struct MetricsRegistry {
    registry: Registry,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Register a collector. A duplicate metric name is an error and
    /// should abort startup.
    pub fn register<C>(&self, collector: C) -> Result<()>
    where
        C: Collector + 'static,
    {
        self.registry
            .register(Box::new(collector))
            .map_err(ExporterError::Registration)
    }

    /// Run every collector once and merge the results by metric name
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Gather and render in the text exposition format
    pub fn render(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.gather(), &mut buffer)
            .map_err(ExporterError::Encode)?;
        Ok(buffer)
    }

    /// Content type matching [`MetricsRegistry::render`]
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
