//! Operation Metrics
//!
//! Running counters for store and client observability. Each component owns
//! an injected [`MetricsSink`] instance — there is no process-global
//! collector, so two stores (or a store and a client) never share counters
//! unless the caller hands them the same `Arc`.
//!
//! # Usage
//!
//! ```rust
//! use cardbox_core::metrics::MetricsSink;
//! use std::time::Duration;
//!
//! let sink = MetricsSink::new();
//! sink.record(Duration::from_millis(12), true);
//! sink.record(Duration::from_millis(40), false);
//!
//! let snapshot = sink.snapshot();
//! assert_eq!(snapshot.operations, 2);
//! assert_eq!(snapshot.errors, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time view of a sink's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total operations recorded
    pub operations: u64,
    /// Operations that ended in an error
    pub errors: u64,
    /// Cumulative wall-clock duration across all operations
    pub total_duration: Duration,
}

/// Thread-safe operation counters (operations, errors, cumulative duration).
///
/// Cheap to share behind an `Arc`; `record` is lock-free.
#[derive(Debug, Default)]
pub struct MetricsSink {
    operations: AtomicU64,
    errors: AtomicU64,
    total_duration_micros: AtomicU64,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed operation
    pub fn record(&self, duration: Duration, ok: bool) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.total_duration_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Read the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations: self.operations.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            total_duration: Duration::from_micros(
                self.total_duration_micros.load(Ordering::Relaxed),
            ),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.operations.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.total_duration_micros.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_operations_and_errors() {
        let sink = MetricsSink::new();
        sink.record(Duration::from_millis(10), true);
        sink.record(Duration::from_millis(20), false);
        sink.record(Duration::from_millis(30), true);

        let snap = sink.snapshot();
        assert_eq!(snap.operations, 3);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.total_duration, Duration::from_millis(60));
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let sink = MetricsSink::new();
        sink.record(Duration::from_millis(5), false);
        sink.reset();

        let snap = sink.snapshot();
        assert_eq!(snap.operations, 0);
        assert_eq!(snap.errors, 0);
        assert_eq!(snap.total_duration, Duration::ZERO);
    }

    #[test]
    fn test_two_sinks_are_independent() {
        let a = MetricsSink::new();
        let b = MetricsSink::new();
        a.record(Duration::from_millis(1), true);

        assert_eq!(a.snapshot().operations, 1);
        assert_eq!(b.snapshot().operations, 0);
    }
}
