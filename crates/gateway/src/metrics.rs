use crate::error::DetectError;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

/// Request-level instruments for `/detect`. Backed by the global meter,
/// which is a no-op until a `TelemetryGuard` installs a provider.
#[derive(Clone)]
pub struct DetectMetrics {
    requests: Counter<u64>,
    duration: Histogram<f64>,
    foods: Counter<u64>,
}

impl DetectMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];
        let duration = meter
            .f64_histogram("detect_duration_seconds")
            .with_description("Time to serve one /detect request (upload + decode + infer)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let requests = meter
            .u64_counter("detect_requests_total")
            .with_description("Total /detect requests by outcome")
            .build();
        let foods = meter
            .u64_counter("detect_foods_total")
            .with_description("Total food names returned")
            .build();

        Self {
            requests,
            duration,
            foods,
        }
    }

    pub fn record(&self, outcome: &Result<Vec<String>, DetectError>, elapsed: Duration) {
        let label = match outcome {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        let attributes = [KeyValue::new("outcome", label)];

        self.requests.add(1, &attributes);
        self.duration.record(elapsed.as_secs_f64(), &attributes);
        if let Ok(foods) = outcome {
            self.foods.add(foods.len() as u64, &[]);
        }
    }
}
