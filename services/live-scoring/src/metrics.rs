//! Observability and metrics for the live scoring service
//!
//! Atomic counters for commits, rejections, corrections and broadcast
//! health, plus a rolling latency window for commit percentiles. Exported
//! as a flat map for Prometheus-style exposition at `GET /metrics`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

pub struct ServiceMetrics {
    // Commits
    pub deliveries_committed: AtomicU64,
    pub deliveries_rejected: AtomicU64,
    pub duplicate_submissions: AtomicU64,
    pub commit_latency_ns: Mutex<LatencyTracker>,

    // Corrections
    pub corrections_applied: AtomicU64,
    pub corrections_rejected: AtomicU64,

    // Broadcasting
    pub snapshots_published: AtomicU64,
    pub subscribers_connected: AtomicU64,
    pub subscribers_disconnected_lag: AtomicU64,

    // View cache
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,

    // Replay
    pub replay_deliveries: AtomicU64,
    pub replay_duration_ms: AtomicU64,

    pub alerts: Mutex<Vec<Alert>>,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            deliveries_committed: AtomicU64::new(0),
            deliveries_rejected: AtomicU64::new(0),
            duplicate_submissions: AtomicU64::new(0),
            commit_latency_ns: Mutex::new(LatencyTracker::new(1000)),
            corrections_applied: AtomicU64::new(0),
            corrections_rejected: AtomicU64::new(0),
            snapshots_published: AtomicU64::new(0),
            subscribers_connected: AtomicU64::new(0),
            subscribers_disconnected_lag: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            replay_deliveries: AtomicU64::new(0),
            replay_duration_ms: AtomicU64::new(0),
            alerts: Mutex::new(Vec::new()),
        }
    }

    pub fn record_commit(&self, latency_ns: u64) {
        self.deliveries_committed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut tracker) = self.commit_latency_ns.lock() {
            tracker.record(latency_ns);
        }
    }

    pub fn record_rejection(&self) {
        self.deliveries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A re-submitted draft answered from the log.
    pub fn record_duplicate(&self) {
        self.duplicate_submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_correction(&self, applied: bool) {
        let counter = if applied {
            &self.corrections_applied
        } else {
            &self.corrections_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish(&self) {
        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_connected(&self) {
        self.subscribers_connected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_gone(&self) {
        let _ = self
            .subscribers_connected
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Subscriber dropped because its queue was full.
    pub fn record_lag_disconnect(&self) {
        self.subscribers_disconnected_lag.fetch_add(1, Ordering::Relaxed);
        self.subscriber_gone();
    }

    pub fn record_cache(&self, hit: bool) {
        let counter = if hit { &self.cache_hits } else { &self.cache_misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replay(&self, deliveries: u64, duration_ms: u64) {
        self.replay_deliveries.store(deliveries, Ordering::Relaxed);
        self.replay_duration_ms.store(duration_ms, Ordering::Relaxed);
    }

    pub fn commit_p99_ns(&self) -> Option<u64> {
        self.commit_latency_ns
            .lock()
            .ok()
            .and_then(|tracker| tracker.percentile(99))
    }

    /// Check alert thresholds and generate alerts.
    pub fn check_thresholds(&self, thresholds: &AlertThresholds) -> Vec<Alert> {
        let mut alerts = Vec::new();

        let rejected = self.deliveries_rejected.load(Ordering::Relaxed);
        if rejected > thresholds.max_rejections {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                metric: "deliveries_rejected".to_string(),
                message: format!(
                    "Deliveries rejected: {} > threshold {}",
                    rejected, thresholds.max_rejections
                ),
            });
        }

        let lagging = self.subscribers_disconnected_lag.load(Ordering::Relaxed);
        if lagging > thresholds.max_lag_disconnects {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                metric: "subscribers_disconnected_lag".to_string(),
                message: format!(
                    "Lagging subscribers disconnected: {} > threshold {}",
                    lagging, thresholds.max_lag_disconnects
                ),
            });
        }

        if let Some(p99) = self.commit_p99_ns() {
            if p99 > thresholds.max_commit_p99_ns {
                alerts.push(Alert {
                    level: AlertLevel::Warning,
                    metric: "commit_p99".to_string(),
                    message: format!(
                        "Commit p99: {}ns > threshold {}ns",
                        p99, thresholds.max_commit_p99_ns
                    ),
                });
            }
        }

        if let Ok(mut alert_store) = self.alerts.lock() {
            alert_store.extend(alerts.clone());
        }

        alerts
    }

    pub fn export(&self) -> BTreeMap<String, u64> {
        let counters = [
            ("deliveries_committed", &self.deliveries_committed),
            ("deliveries_rejected", &self.deliveries_rejected),
            ("duplicate_submissions", &self.duplicate_submissions),
            ("corrections_applied", &self.corrections_applied),
            ("corrections_rejected", &self.corrections_rejected),
            ("snapshots_published", &self.snapshots_published),
            ("subscribers_connected", &self.subscribers_connected),
            ("subscribers_disconnected_lag", &self.subscribers_disconnected_lag),
            ("cache_hits", &self.cache_hits),
            ("cache_misses", &self.cache_misses),
            ("replay_deliveries", &self.replay_deliveries),
            ("replay_duration_ms", &self.replay_duration_ms),
        ];
        let mut m: BTreeMap<String, u64> = counters
            .into_iter()
            .map(|(name, counter)| (name.to_string(), counter.load(Ordering::Relaxed)))
            .collect();
        if let Some(p99) = self.commit_p99_ns() {
            m.insert("commit_p99_ns".to_string(), p99);
        }
        m
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Rolling window of latency samples.
pub struct LatencyTracker {
    samples: Vec<u64>,
    max_samples: usize,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn record(&mut self, value: u64) {
        if self.samples.len() >= self.max_samples {
            self.samples.remove(0);
        }
        self.samples.push(value);
    }

    /// Percentile value (0-100).
    pub fn percentile(&self, p: usize) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        let idx = p.min(100) * (sorted.len() - 1) / 100;
        sorted.get(idx).copied()
    }

    pub fn average(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: u64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as u64)
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub metric: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AlertThresholds {
    pub max_rejections: u64,
    pub max_lag_disconnects: u64,
    /// Commit p99 in nanoseconds.
    pub max_commit_p99_ns: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            max_rejections: 100,
            max_lag_disconnects: 50,
            max_commit_p99_ns: 5_000_000,
        }
    }
}
