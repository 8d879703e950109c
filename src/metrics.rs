//! Operational counters for the screening service.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept per model
const LATENCY_WINDOW: usize = 1000;

/// Metrics collector for request handling and model calls
pub struct ServiceMetrics {
    /// Prediction requests that reached the models
    pub predictions_served: AtomicU64,
    /// Prediction requests rejected before any model ran
    pub requests_rejected: AtomicU64,
    /// Per-model call latencies (in microseconds) and failure counts
    models: RwLock<BTreeMap<String, ModelCalls>>,
    /// Start time for uptime
    start_time: Instant,
}

#[derive(Default)]
struct ModelCalls {
    calls: u64,
    failures: u64,
    times_us: Vec<u64>,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            models: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a request that was dispatched to the models
    pub fn record_prediction(&self) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request rejected during validation
    pub fn record_rejection(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one model call
    pub fn record_model_call(&self, model_name: &str, duration: Duration, failed: bool) {
        if let Ok(mut models) = self.models.write() {
            let entry = models.entry(model_name.to_string()).or_default();
            entry.calls += 1;
            if failed {
                entry.failures += 1;
            }
            entry.times_us.push(duration.as_micros() as u64);
            // Keep only the most recent window
            if entry.times_us.len() > LATENCY_WINDOW {
                entry.times_us.drain(0..LATENCY_WINDOW / 2);
            }
        }
    }

    /// Get per-model statistics
    pub fn get_model_stats(&self) -> BTreeMap<String, ModelStats> {
        let Ok(models) = self.models.read() else {
            return BTreeMap::new();
        };

        models
            .iter()
            .map(|(name, calls)| {
                let mut sorted = calls.times_us.clone();
                sorted.sort_unstable();
                let count = sorted.len();
                let (mean_us, p50_us, p99_us) = if count == 0 {
                    (0, 0, 0)
                } else {
                    (
                        sorted.iter().sum::<u64>() / count as u64,
                        sorted[count / 2],
                        sorted[((count as f64 * 0.99) as usize).min(count - 1)],
                    )
                };
                (
                    name.clone(),
                    ModelStats {
                        calls: calls.calls,
                        failures: calls.failures,
                        mean_us,
                        p50_us,
                        p99_us,
                    },
                )
            })
            .collect()
    }

    /// Seconds since the collector was created
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Snapshot suitable for the health endpoint
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            predictions_served: self.predictions_served.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            models: self.get_model_stats(),
        }
    }

    /// Log summary statistics
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!(
            predictions = snapshot.predictions_served,
            rejected = snapshot.requests_rejected,
            uptime_secs = snapshot.uptime_secs,
            "Service summary"
        );
        for (model, stats) in &snapshot.models {
            info!(
                model = %model,
                calls = stats.calls,
                failures = stats.failures,
                mean_us = stats.mean_us,
                p99_us = stats.p99_us,
                "Model call summary"
            );
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Model-specific statistics
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub calls: u64,
    pub failures: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

/// Point-in-time view of the service counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub predictions_served: u64,
    pub requests_rejected: u64,
    pub models: BTreeMap<String, ModelStats>,
}
