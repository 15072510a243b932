//! Batch driver with an explicit retry/backoff layer.
//!
//! The pipeline itself implements no retries, timeouts or cancellation;
//! those belong to the caller wrapping it. This module is that caller
//! for the many-addresses case: it processes addresses skip-and-continue
//! (one failure never aborts the batch), retries only transient failures
//! under a [`RetryPolicy`], and records outcomes in
//! [`PipelineMetrics`](crate::telemetry::PipelineMetrics).
//!
//! # Example
//!
//! ```ignore
//! use siteview::batch::{BatchDriver, RetryPolicy};
//! use siteview::pipeline::AcquisitionPipeline;
//! use siteview::provider::ImagerySet;
//!
//! let pipeline = AcquisitionPipeline::from_config(&config)?;
//! let driver = BatchDriver::new(pipeline, ImagerySet::BirdseyeV2)
//!     .with_retry_policy(RetryPolicy::exponential(3));
//! let outcomes = driver.run(&addresses);
//! println!("{}", driver.metrics().snapshot());
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::{Acquire, Acquisition, PipelineError};
use crate::provider::ImagerySet;
use crate::telemetry::PipelineMetrics;

/// Default initial delay for exponential backoff (100ms).
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;

/// Default maximum delay for exponential backoff (30 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// How transient failures are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per address, including the first (minimum 1).
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub initial_delay: Duration,

    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,

    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// No retries: every failure is terminal for its address.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Exponential backoff with default delays.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the
    /// next one: `initial_delay * multiplier^(attempt - 1)`, capped at
    /// `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Per-address result of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The address as submitted.
    pub address: String,

    /// Attempts made for this address (at least 1).
    pub attempts: u32,

    /// Final result after retries.
    pub result: Result<Acquisition, PipelineError>,
}

impl BatchOutcome {
    /// Whether the address yielded an acquisition.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Processes many addresses through an acquisition pipeline.
pub struct BatchDriver<P: Acquire> {
    pipeline: P,
    imagery_set: ImagerySet,
    zoom_level: Option<u8>,
    retry_policy: RetryPolicy,
    metrics: Arc<PipelineMetrics>,
}

impl<P: Acquire> BatchDriver<P> {
    /// Creates a driver with no retries and fresh metrics.
    pub fn new(pipeline: P, imagery_set: ImagerySet) -> Self {
        Self {
            pipeline,
            imagery_set,
            zoom_level: None,
            retry_policy: RetryPolicy::none(),
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Sets the retry policy for transient failures.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Requests a fixed zoom level instead of metadata-derived midpoints.
    pub fn with_zoom_level(mut self, zoom_level: u8) -> Self {
        self.zoom_level = Some(zoom_level);
        self
    }

    /// The metrics recorded by this driver.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Processes every address, skip-and-continue.
    ///
    /// Transient failures (provider transport, absent metadata) are
    /// retried per the policy; an unresolvable address or a failing
    /// provider status is terminal for that address. The batch itself
    /// never aborts early.
    pub fn run(&self, addresses: &[String]) -> Vec<BatchOutcome> {
        addresses
            .iter()
            .map(|address| self.run_one(address))
            .collect()
    }

    fn run_one(&self, address: &str) -> BatchOutcome {
        self.metrics.address_submitted();

        let mut attempt = 1;
        loop {
            match self
                .pipeline
                .acquire(address, &self.imagery_set, self.zoom_level)
            {
                Ok(acquisition) => {
                    self.metrics.acquisition_succeeded();
                    if !acquisition.image.is_decoded() {
                        self.metrics.decode_failure();
                    }
                    tracing::debug!(address, attempt, "address acquired");
                    return BatchOutcome {
                        address: address.to_string(),
                        attempts: attempt,
                        result: Ok(acquisition),
                    };
                }
                Err(e) => {
                    self.record_failure(&e);

                    if e.is_transient() && attempt < self.retry_policy.max_attempts {
                        let delay = self.retry_policy.delay_for(attempt);
                        tracing::warn!(
                            address,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "transient failure, retrying"
                        );
                        self.metrics.retry();
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                        attempt += 1;
                        continue;
                    }

                    tracing::warn!(address, attempt, error = %e, "address failed");
                    return BatchOutcome {
                        address: address.to_string(),
                        attempts: attempt,
                        result: Err(e),
                    };
                }
            }
        }
    }

    fn record_failure(&self, error: &PipelineError) {
        match error {
            PipelineError::AddressResolution { .. } => self.metrics.resolve_miss(),
            PipelineError::Metadata { .. } | PipelineError::ZoomRangeUnavailable { .. } => {
                self.metrics.metadata_failure()
            }
            PipelineError::Provider(_) => self.metrics.transport_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::geocode::Coordinates;
    use crate::pipeline::ImageFetch;
    use crate::provider::{ImageryMetadata, ProviderError};

    fn acquisition() -> Acquisition {
        Acquisition {
            coordinates: Coordinates::new(47.61, -122.33).unwrap(),
            imagery_set: ImagerySet::BirdseyeV2,
            zoom_level: 15,
            metadata: ImageryMetadata {
                status_code: Some(200),
                ..Default::default()
            },
            image: ImageFetch::Decoded(image::DynamicImage::new_rgb8(1, 1)),
        }
    }

    fn transport_error() -> PipelineError {
        PipelineError::Provider(ProviderError::HttpError("timeout".to_string()))
    }

    /// Scripted pipeline: pops the next result per call.
    struct ScriptedPipeline {
        script: Mutex<Vec<Result<Acquisition, PipelineError>>>,
    }

    impl ScriptedPipeline {
        fn new(script: Vec<Result<Acquisition, PipelineError>>) -> Self {
            Self {
                script: Mutex::new(script),
            }
        }
    }

    impl Acquire for ScriptedPipeline {
        fn acquire(
            &self,
            _address: &str,
            _imagery_set: &ImagerySet,
            _zoom_level: Option<u8>,
        ) -> Result<Acquisition, PipelineError> {
            self.script
                .lock()
                .unwrap()
                .remove(0)
        }
    }

    fn addresses(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{} Main St", i + 1)).collect()
    }

    #[test]
    fn test_delay_for_grows_exponentially() {
        let policy = RetryPolicy::exponential(5);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_for_caps_at_max() {
        let policy = RetryPolicy::exponential(20);
        assert_eq!(policy.delay_for(15), Duration::from_secs(DEFAULT_MAX_DELAY_SECS));
    }

    #[test]
    fn test_none_policy_single_attempt() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_exponential_clamps_zero_attempts() {
        let policy = RetryPolicy::exponential(0);
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_driver_retries_transient_then_succeeds() {
        let pipeline = ScriptedPipeline::new(vec![
            Err(transport_error()),
            Err(transport_error()),
            Ok(acquisition()),
        ]);
        let driver = BatchDriver::new(pipeline, ImagerySet::BirdseyeV2).with_retry_policy(
            RetryPolicy::exponential(3).with_initial_delay(Duration::ZERO),
        );

        let outcomes = driver.run(&addresses(1));

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[0].attempts, 3);

        let snapshot = driver.metrics().snapshot();
        assert_eq!(snapshot.retries, 2);
        assert_eq!(snapshot.transport_errors, 2);
        assert_eq!(snapshot.acquired, 1);
    }

    #[test]
    fn test_driver_does_not_retry_address_resolution() {
        let pipeline = ScriptedPipeline::new(vec![Err(PipelineError::AddressResolution {
            address: "1 Main St".to_string(),
        })]);
        let driver = BatchDriver::new(pipeline, ImagerySet::BirdseyeV2).with_retry_policy(
            RetryPolicy::exponential(5).with_initial_delay(Duration::ZERO),
        );

        let outcomes = driver.run(&addresses(1));

        assert_eq!(outcomes[0].attempts, 1);
        assert!(!outcomes[0].is_success());
        assert_eq!(driver.metrics().snapshot().resolve_misses, 1);
        assert_eq!(driver.metrics().snapshot().retries, 0);
    }

    #[test]
    fn test_driver_exhausts_retry_budget() {
        let pipeline = ScriptedPipeline::new(vec![
            Err(transport_error()),
            Err(transport_error()),
            Err(transport_error()),
        ]);
        let driver = BatchDriver::new(pipeline, ImagerySet::BirdseyeV2).with_retry_policy(
            RetryPolicy::exponential(3).with_initial_delay(Duration::ZERO),
        );

        let outcomes = driver.run(&addresses(1));

        assert_eq!(outcomes[0].attempts, 3);
        assert!(!outcomes[0].is_success());
        assert_eq!(driver.metrics().snapshot().retries, 2);
    }

    #[test]
    fn test_batch_continues_past_failures() {
        // Address 1 fails terminally, address 2 succeeds, address 3 fails.
        let pipeline = ScriptedPipeline::new(vec![
            Err(PipelineError::AddressResolution {
                address: "1 Main St".to_string(),
            }),
            Ok(acquisition()),
            Err(transport_error()),
        ]);
        let driver = BatchDriver::new(pipeline, ImagerySet::BirdseyeV2);

        let outcomes = driver.run(&addresses(3));

        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].is_success());
        assert!(outcomes[1].is_success());
        assert!(!outcomes[2].is_success());

        let snapshot = driver.metrics().snapshot();
        assert_eq!(snapshot.submitted, 3);
        assert_eq!(snapshot.acquired, 1);
    }

    #[test]
    fn test_undecodable_acquisition_counts_decode_failure() {
        let mut undecodable = acquisition();
        undecodable.image = ImageFetch::Undecodable {
            bytes: b"<html></html>".to_vec(),
            reason: "unsupported format".to_string(),
        };
        let pipeline = ScriptedPipeline::new(vec![Ok(undecodable)]);
        let driver = BatchDriver::new(pipeline, ImagerySet::BirdseyeV2);

        let outcomes = driver.run(&addresses(1));

        assert!(outcomes[0].is_success());
        let snapshot = driver.metrics().snapshot();
        assert_eq!(snapshot.acquired, 1);
        assert_eq!(snapshot.decode_failures, 1);
    }
}
