//! Acquisition telemetry for observability and batch reporting.
//!
//! Lock-free atomic counters recorded by the batch driver, copied into
//! point-in-time snapshots for display:
//!
//! ```text
//! Batch driver ─────► PipelineMetrics ─────► TelemetrySnapshot ─────► views
//!                     (atomic counters)      (point-in-time copy)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a batch of acquisitions.
///
/// All methods are lock-free and safe to call from multiple threads.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    submitted: AtomicU64,
    acquired: AtomicU64,
    resolve_misses: AtomicU64,
    metadata_failures: AtomicU64,
    decode_failures: AtomicU64,
    transport_errors: AtomicU64,
    retries: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// An address was submitted to the pipeline.
    pub fn address_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// A run completed with an acquisition (decoded or not).
    pub fn acquisition_succeeded(&self) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
    }

    /// An address did not resolve to coordinates.
    pub fn resolve_miss(&self) {
        self.resolve_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A metadata request failed or reported a failing status.
    pub fn metadata_failure(&self) {
        self.metadata_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A fetched imagery body did not decode as an image.
    pub fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A provider round-trip failed in transport.
    pub fn transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A transient failure was retried.
    pub fn retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            acquired: self.acquired.load(Ordering::Relaxed),
            resolve_misses: self.resolve_misses.load(Ordering::Relaxed),
            metadata_failures: self.metadata_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub submitted: u64,
    pub acquired: u64,
    pub resolve_misses: u64,
    pub metadata_failures: u64,
    pub decode_failures: u64,
    pub transport_errors: u64,
    pub retries: u64,
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch: {} submitted, {} acquired, {} resolve misses, {} metadata failures, {} decode failures, {} transport errors, {} retries",
            self.submitted,
            self.acquired,
            self.resolve_misses,
            self.metadata_failures,
            self.decode_failures,
            self.transport_errors,
            self.retries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.snapshot(), TelemetrySnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = PipelineMetrics::new();
        metrics.address_submitted();
        metrics.address_submitted();
        metrics.acquisition_succeeded();
        metrics.resolve_miss();
        metrics.retry();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.submitted, 2);
        assert_eq!(snapshot.acquired, 1);
        assert_eq!(snapshot.resolve_misses, 1);
        assert_eq!(snapshot.retries, 1);
        assert_eq!(snapshot.metadata_failures, 0);
    }

    #[test]
    fn test_snapshot_display_summary() {
        let metrics = PipelineMetrics::new();
        metrics.address_submitted();
        metrics.acquisition_succeeded();

        let line = metrics.snapshot().to_string();
        assert!(line.contains("1 submitted"));
        assert!(line.contains("1 acquired"));
        assert!(line.contains("0 retries"));
    }
}
