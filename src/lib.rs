//! Siteview - satellite image acquisition for construction-progress monitoring
//!
//! This library resolves a free-text address to coordinates, negotiates a
//! zoom level with the imagery provider's metadata endpoint, and fetches a
//! validated satellite image with its provenance. It is the acquisition
//! stage of a construction-progress classification pipeline; labeling,
//! augmentation and model training are external collaborators.
//!
//! # Example
//!
//! ```ignore
//! use siteview::config::PipelineConfig;
//! use siteview::pipeline::AcquisitionPipeline;
//! use siteview::provider::ImagerySet;
//!
//! let config = PipelineConfig::from_env()?;
//! let pipeline = AcquisitionPipeline::from_config(&config)?;
//! let acquisition = pipeline.run("400 Broad St, Seattle", &ImagerySet::BirdseyeV2, None)?;
//!
//! if let Some(image) = acquisition.image.as_image() {
//!     println!(
//!         "fetched {}x{} at zoom {}",
//!         image.width(),
//!         image.height(),
//!         acquisition.zoom_level
//!     );
//! }
//! ```

pub mod batch;
pub mod config;
pub mod geocode;
pub mod pipeline;
pub mod provider;
pub mod telemetry;

pub use batch::{BatchDriver, BatchOutcome, RetryPolicy};
pub use config::{ConfigError, Credentials, PipelineConfig};
pub use geocode::{BingGeocoder, Coordinates, Geocoder};
pub use pipeline::{Acquire, Acquisition, AcquisitionPipeline, ImageFetch, PipelineError};
pub use provider::{
    BingImageryProvider, HttpClient, ImageryMetadata, ImagerySet, ProviderError, ReqwestClient,
};
pub use telemetry::{PipelineMetrics, TelemetrySnapshot};
