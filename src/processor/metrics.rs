//! Prometheus metrics decorator for the processor.
//!
//! Wraps any [`Processor`] and records one counter increment and one latency
//! observation per completed request, labeled by service, method, HTTP
//! method, and status code. Transparent to the request outcome; new
//! cross-cutting concerns should follow the same wrap-the-processor shape.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use crate::domain::{ProcessRequest, ProviderProcessResponse};
use crate::Result;

use super::Processor;

const LABELS: [&str; 4] = ["service", "method", "http_method", "status_code"];

const LATENCY_BUCKETS: [f64; 14] = [
    0.001, 0.01, 0.1, 0.3, 0.6, 1.0, 3.0, 6.0, 9.0, 20.0, 30.0, 60.0, 90.0, 120.0,
];

/// Metrics-recording [`Processor`] wrapper
pub struct MetricsProcessor {
    next: Arc<dyn Processor>,
    requests: IntCounterVec,
    latency: HistogramVec,
}

impl MetricsProcessor {
    /// Wrap `next`, registering the metrics into `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error when a metric cannot be registered (e.g. name
    /// conflict).
    pub fn new(next: Arc<dyn Processor>, registry: &Registry) -> Result<Self> {
        let requests = IntCounterVec::new(
            Opts::new(
                "processor_request_count",
                "The total number of requests to processor",
            ),
            &LABELS,
        )?;
        registry.register(Box::new(requests.clone()))?;

        let latency = HistogramVec::new(
            HistogramOpts::new("processor_request_work_time", "Processor request work time")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &LABELS,
        )?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            next,
            requests,
            latency,
        })
    }
}

#[async_trait]
impl Processor for MetricsProcessor {
    async fn process(&self, request: ProcessRequest) -> ProviderProcessResponse {
        let started_at = Instant::now();

        let service = request.service.clone();
        let method = request.api_method.clone();
        let http_method = request.http_method;

        let response = self.next.process(request).await;

        let status_code = response.status_code.to_string();
        let labels = [
            service.as_str(),
            method.as_str(),
            http_method.as_str(),
            status_code.as_str(),
        ];

        self.requests.with_label_values(&labels).inc();
        self.latency
            .with_label_values(&labels)
            .observe(started_at.elapsed().as_secs_f64());

        response
    }
}
