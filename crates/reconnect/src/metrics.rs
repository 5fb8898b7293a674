//! Metrics instrumentation for the reconnection loop.

use std::time::Instant;

/// Count a reconnection attempt.
pub fn increment_attempts() {
    metrics::counter!("reconnect_attempts", 1);
}

/// Count a retryable failure.
pub fn increment_failures() {
    metrics::counter!("reconnect_failures", 1);
}

/// Count a completed reconnection.
pub fn increment_successes() {
    metrics::counter!("reconnect_successes", 1);
}

/// Record health check latency.
pub fn record_health_check_latency(duration_ms: f64) {
    metrics::histogram!("health_check_latency", duration_ms);
}

/// Record reconnector latency.
pub fn record_reconnect_latency(duration_ms: f64) {
    metrics::histogram!("reconnect_latency", duration_ms);
}

/// RAII timer for automatic metric recording.
pub struct MetricTimer {
    start: Instant,
    metric_name: &'static str,
}

impl MetricTimer {
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }
}

impl Drop for MetricTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        match self.metric_name {
            "health_check_latency" => record_health_check_latency(duration_ms),
            "reconnect_latency" => record_reconnect_latency(duration_ms),
            _ => {}
        }
    }
}
