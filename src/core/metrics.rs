//! Handler metrics for observability
//!
//! Counters for handlers that queue or buffer records, such as the threaded
//! wrapper: how many records went out, how many were dropped, and how often
//! the queue was full or the wrapped handler failed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for handler observability
///
/// # Example
///
/// ```
/// use rust_logbook::core::HandlerMetrics;
///
/// let metrics = HandlerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_handled();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_handled(), 1);
/// ```
#[derive(Debug)]
pub struct HandlerMetrics {
    /// Records discarded because the queue was full or closed
    dropped_count: AtomicU64,

    /// Records passed on to the wrapped handler
    total_handled: AtomicU64,

    queue_full_events: AtomicU64,

    /// Emit failures reported by the wrapped handler
    error_count: AtomicU64,
}

impl HandlerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            dropped_count: AtomicU64::new(0),
            total_handled: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_handled(&self) -> u64 {
        self.total_handled.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Record a dropped record; returns the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_handled(&self) -> u64 {
        self.total_handled.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_error(&self) -> u64 {
        self.error_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been processed.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_handled() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.dropped_count.store(0, Ordering::Relaxed);
        self.total_handled.store(0, Ordering::Relaxed);
        self.queue_full_events.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
    }
}

impl Default for HandlerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for HandlerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            dropped_count: AtomicU64::new(self.dropped_count()),
            total_handled: AtomicU64::new(self.total_handled()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            error_count: AtomicU64::new(self.error_count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = HandlerMetrics::new();
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.total_handled(), 0);
        assert_eq!(metrics.queue_full_events(), 0);
        assert_eq!(metrics.error_count(), 0);
    }

    #[test]
    fn test_record_returns_previous_value() {
        let metrics = HandlerMetrics::new();
        assert_eq!(metrics.record_dropped(), 0);
        assert_eq!(metrics.record_dropped(), 1);
        assert_eq!(metrics.dropped_count(), 2);
    }

    #[test]
    fn test_drop_rate() {
        let metrics = HandlerMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_handled();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }
        let rate = metrics.drop_rate();
        assert!((rate - 10.0).abs() < f64::EPSILON, "Drop rate was {}", rate);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let metrics = HandlerMetrics::new();
        metrics.record_error();
        let snapshot = metrics.clone();

        metrics.record_error();
        metrics.reset();
        assert_eq!(metrics.error_count(), 0);
        assert_eq!(snapshot.error_count(), 1);
    }
}
