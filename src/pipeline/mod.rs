//! The image acquisition pipeline.
//!
//! Deterministic three-stage conversion of a human-readable address into
//! a validated satellite image plus the metadata used to obtain it:
//!
//! ```text
//! address ──resolve──► Coordinates ──fetch_metadata──► ImageryMetadata
//!                                                           │
//!                                       zoom = midpoint(zoomMin, zoomMax)
//!                                                           │
//!                                  fetch_image ──► Acquisition (image + provenance)
//! ```
//!
//! # Failure policy
//!
//! The stage helpers fail soft: [`AcquisitionPipeline::resolve`] reports a
//! miss as `Ok(None)`, [`AcquisitionPipeline::fetch_metadata`] reports any
//! provider failure as `None`, and [`AcquisitionPipeline::fetch_image`]
//! reports an undecodable body as a tagged [`ImageFetch::Undecodable`]
//! value carrying the raw bytes. Partial information is still actionable
//! by a caller trying alternate imagery sets or zoom levels.
//!
//! [`AcquisitionPipeline::run`] fails hard: a complete pipeline run either
//! fully succeeds or returns a stage-labeled [`PipelineError`] with enough
//! context (address, coordinates, raw provider payload) to diagnose
//! without re-running. It never returns a partially filled result.
//!
//! # Concurrency
//!
//! Fully synchronous; each stage is one blocking round-trip performed
//! after the previous stage's result is available. No state is shared
//! between invocations, so the pipeline may be called repeatedly and from
//! multiple threads; the only shared resource is the credential set,
//! read-only after construction.

use image::DynamicImage;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::geocode::{BingGeocoder, Coordinates, Geocoder};
use crate::provider::{
    BingImageryProvider, HttpClient, ImageryMetadata, ImagerySet, ProviderError, ReqwestClient,
};

/// Errors raised by the orchestrator.
///
/// Each variant labels the stage that failed and carries the context
/// needed for diagnosis.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The address did not resolve to coordinates (a geocoding soft miss).
    #[error("could not resolve address to coordinates: {address:?}")]
    AddressResolution {
        /// The address as the caller supplied it.
        address: String,
    },

    /// The metadata call failed in transport (`response: None`) or the
    /// provider reported a failing status (`response: Some(..)`, kept
    /// whole for diagnosis).
    #[error("metadata request failed for {coordinates}: {response:?}")]
    Metadata {
        coordinates: Coordinates,
        response: Option<ImageryMetadata>,
    },

    /// No zoom level was requested and the metadata did not report the
    /// zoom bounds needed to derive one.
    #[error("metadata for {coordinates} reports no zoom range and no zoom level was requested")]
    ZoomRangeUnavailable { coordinates: Coordinates },

    /// A lower-level transport/auth failure not otherwise classified.
    #[error("provider request failed: {0}")]
    Provider(#[from] ProviderError),
}

impl PipelineError {
    /// Whether a retry could plausibly change the outcome.
    ///
    /// Transport-tier failures are transient; an unresolvable address or
    /// a failing provider status is terminal for the given input.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Provider(_) | PipelineError::Metadata { response: None, .. }
        )
    }
}

/// Outcome of decoding a fetched imagery body.
///
/// A body that fails to decode is not an error at this tier: the raw
/// bytes are kept so downstream code can inspect why decoding failed
/// (quota page, malformed body). The declared type never changes on the
/// failure path.
#[derive(Debug, Clone)]
pub enum ImageFetch {
    /// The body decoded as an image.
    Decoded(DynamicImage),

    /// The body could not be decoded; raw bytes retained for inspection.
    Undecodable {
        bytes: Vec<u8>,
        reason: String,
    },
}

impl ImageFetch {
    /// The decoded image, if there is one.
    pub fn as_image(&self) -> Option<&DynamicImage> {
        match self {
            ImageFetch::Decoded(image) => Some(image),
            ImageFetch::Undecodable { .. } => None,
        }
    }

    /// Whether the body decoded successfully.
    pub fn is_decoded(&self) -> bool {
        matches!(self, ImageFetch::Decoded(_))
    }
}

/// Terminal artifact of a successful pipeline run.
///
/// Bundles the image with the coordinates, imagery set, zoom level and
/// metadata actually used to fetch it, so callers can record provenance
/// alongside the pixel data.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub coordinates: Coordinates,
    pub imagery_set: ImagerySet,
    /// The zoom level actually used: caller-supplied, or derived from
    /// the metadata's zoom range.
    pub zoom_level: u8,
    pub metadata: ImageryMetadata,
    pub image: ImageFetch,
}

/// Trait for running the full acquisition, so batch drivers and tests
/// can stub the pipeline.
pub trait Acquire {
    /// Runs the full address-to-image acquisition.
    fn acquire(
        &self,
        address: &str,
        imagery_set: &ImagerySet,
        zoom_level: Option<u8>,
    ) -> Result<Acquisition, PipelineError>;
}

/// Midpoint of the advertised zoom range.
///
/// Integer division floors, so ties round toward the lower zoom level.
fn midpoint_zoom(zoom_min: u8, zoom_max: u8) -> u8 {
    ((u16::from(zoom_min) + u16::from(zoom_max)) / 2) as u8
}

/// The image acquisition pipeline.
///
/// Composes an injected geocoding capability with the imagery provider.
/// Stateless across invocations.
pub struct AcquisitionPipeline<G: Geocoder, C: HttpClient> {
    geocoder: G,
    provider: BingImageryProvider<C>,
}

impl AcquisitionPipeline<BingGeocoder<ReqwestClient>, ReqwestClient> {
    /// Wires a pipeline with real HTTP clients from configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ProviderError> {
        let client = ReqwestClient::with_timeout(config.http_timeout)?;
        let geocoder = BingGeocoder::new(client.clone(), config.credentials.bing_api_key.clone());
        let provider =
            BingImageryProvider::new(client, config.credentials.bing_api_key.clone());

        Ok(Self::new(geocoder, provider))
    }
}

impl<G: Geocoder, C: HttpClient> AcquisitionPipeline<G, C> {
    /// Creates a pipeline from an explicit geocoder and provider.
    pub fn new(geocoder: G, provider: BingImageryProvider<C>) -> Self {
        Self { geocoder, provider }
    }

    /// Resolves an address to coordinates.
    ///
    /// A blank address or an address the service does not know is a soft
    /// miss (`Ok(None)`), not an error; transport/auth failures from the
    /// geocoding capability propagate as [`ProviderError`].
    pub fn resolve(&self, address: &str) -> Result<Option<Coordinates>, ProviderError> {
        if address.trim().is_empty() {
            return Ok(None);
        }

        self.geocoder.geocode(address)
    }

    /// Fetches imagery metadata for the given location.
    ///
    /// Fail-soft boundary: any provider failure is logged and surfaced as
    /// `None` so the caller can decide how to react (try another imagery
    /// set, skip the address). The response is not validated here; status
    /// checking belongs to [`AcquisitionPipeline::run`].
    pub fn fetch_metadata(
        &self,
        coordinates: &Coordinates,
        imagery_set: &ImagerySet,
        zoom_level: Option<u8>,
    ) -> Option<ImageryMetadata> {
        match self.provider.metadata(coordinates, imagery_set, zoom_level) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!(
                    %coordinates,
                    %imagery_set,
                    error = %e,
                    "metadata request failed"
                );
                None
            }
        }
    }

    /// Fetches imagery at a concrete zoom level and decodes it.
    ///
    /// Transport failures propagate; a body that fetched but failed to
    /// decode is returned as [`ImageFetch::Undecodable`] with the raw
    /// bytes, after logging a diagnostic.
    pub fn fetch_image(
        &self,
        coordinates: &Coordinates,
        imagery_set: &ImagerySet,
        zoom_level: u8,
    ) -> Result<ImageFetch, ProviderError> {
        let bytes = self.provider.image(coordinates, imagery_set, zoom_level)?;

        match image::load_from_memory(&bytes) {
            Ok(image) => Ok(ImageFetch::Decoded(image)),
            Err(e) => {
                tracing::error!(
                    %coordinates,
                    %imagery_set,
                    zoom_level,
                    body_len = bytes.len(),
                    error = %e,
                    "imagery body did not decode as an image"
                );
                Ok(ImageFetch::Undecodable {
                    bytes,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Runs the full acquisition: resolve, validate metadata, select a
    /// zoom level, fetch the image.
    ///
    /// When `zoom_level` is `None`, the level is derived once as the
    /// floor midpoint of the metadata's `[zoomMin, zoomMax]` range and
    /// never mutated afterward.
    pub fn run(
        &self,
        address: &str,
        imagery_set: &ImagerySet,
        zoom_level: Option<u8>,
    ) -> Result<Acquisition, PipelineError> {
        let coordinates =
            self.resolve(address)?
                .ok_or_else(|| PipelineError::AddressResolution {
                    address: address.to_string(),
                })?;
        tracing::debug!(%coordinates, address, "address resolved");

        let metadata = match self.fetch_metadata(&coordinates, imagery_set, zoom_level) {
            Some(metadata) if metadata.status_ok() => metadata,
            response => {
                return Err(PipelineError::Metadata {
                    coordinates,
                    response,
                })
            }
        };

        let zoom_level = match zoom_level {
            Some(zoom) => zoom,
            None => {
                let (zoom_min, zoom_max) = metadata
                    .zoom_range()
                    .ok_or(PipelineError::ZoomRangeUnavailable { coordinates })?;
                midpoint_zoom(zoom_min, zoom_max)
            }
        };
        tracing::debug!(%coordinates, zoom_level, "zoom level selected");

        let image = self.fetch_image(&coordinates, imagery_set, zoom_level)?;

        Ok(Acquisition {
            coordinates,
            imagery_set: imagery_set.clone(),
            zoom_level,
            metadata,
            image,
        })
    }
}

impl<G: Geocoder, C: HttpClient> Acquire for AcquisitionPipeline<G, C> {
    fn acquire(
        &self,
        address: &str,
        imagery_set: &ImagerySet,
        zoom_level: Option<u8>,
    ) -> Result<Acquisition, PipelineError> {
        self.run(address, imagery_set, zoom_level)
    }
}
