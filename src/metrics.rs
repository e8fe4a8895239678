use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for observability
///
/// Counters for the failover loop. Use `snapshot()` to get a point-in-time
/// view of all metrics, or the individual getters for specific values.
///
/// # Example
/// ```ignore
/// let metrics = manager.metrics();
///
/// println!("Failovers: {}", metrics.failovers());
///
/// let snapshot = metrics.snapshot();
/// ```
#[derive(Debug, Default)]
pub struct Metrics {
    connection_attempts_total: AtomicU64,
    connect_failures_total: AtomicU64,
    failovers_total: AtomicU64,
    resubscriptions_total: AtomicU64,
    resubscription_failures_total: AtomicU64,
    stale_events_total: AtomicU64,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Getters ==========

    /// Get total connection attempts (successful or not)
    pub fn connection_attempts(&self) -> u64 {
        self.connection_attempts_total.load(Ordering::Relaxed)
    }

    /// Get total connection attempts the connector refused
    pub fn connect_failures(&self) -> u64 {
        self.connect_failures_total.load(Ordering::Relaxed)
    }

    /// Get total failovers
    pub fn failovers(&self) -> u64 {
        self.failovers_total.load(Ordering::Relaxed)
    }

    /// Get total subscriptions re-acquired during replay
    pub fn resubscriptions(&self) -> u64 {
        self.resubscriptions_total.load(Ordering::Relaxed)
    }

    /// Get total replay re-subscriptions that failed
    pub fn resubscription_failures(&self) -> u64 {
        self.resubscription_failures_total.load(Ordering::Relaxed)
    }

    /// Get total notifications ignored because their connection was already replaced
    pub fn stale_events(&self) -> u64 {
        self.stale_events_total.load(Ordering::Relaxed)
    }

    // ========== Recording methods (called internally) ==========

    pub(crate) fn record_connection_attempt(&self) {
        self.connection_attempts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connect_failure(&self) {
        self.connect_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failover(&self) {
        self.failovers_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_resubscriptions(&self, count: usize) {
        self.resubscriptions_total
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_resubscription_failures(&self, count: usize) {
        self.resubscription_failures_total
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_event(&self) {
        self.stale_events_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot of all metrics for export
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connection_attempts_total: self.connection_attempts_total.load(Ordering::Acquire),
            connect_failures_total: self.connect_failures_total.load(Ordering::Acquire),
            failovers_total: self.failovers_total.load(Ordering::Acquire),
            resubscriptions_total: self.resubscriptions_total.load(Ordering::Acquire),
            resubscription_failures_total: self
                .resubscription_failures_total
                .load(Ordering::Acquire),
            stale_events_total: self.stale_events_total.load(Ordering::Acquire),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connection_attempts_total: u64,
    pub connect_failures_total: u64,
    pub failovers_total: u64,
    pub resubscriptions_total: u64,
    pub resubscription_failures_total: u64,
    pub stale_events_total: u64,
}
