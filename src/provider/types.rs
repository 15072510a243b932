//! Provider error types.

use thiserror::Error;

/// Errors that can occur when talking to the imagery or geocoding provider.
///
/// These are the low-level transport-tier failures; stage-level failures
/// (address not found, bad metadata status) are modeled by
/// [`PipelineError`](crate::pipeline::PipelineError).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport-level failure: connection, TLS, timeout, or an HTTP
    /// error status from the provider (including auth rejections).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The provider answered, but the body was not the expected JSON shape.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Requested zoom level outside the provider's supported range.
    #[error("Unsupported zoom level: {0}")]
    UnsupportedZoom(u8),

    /// Latitude or longitude was not a finite number.
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}
