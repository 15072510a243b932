//! Pipeline configuration and provider credentials.
//!
//! Credentials come from the process environment and are read-only after
//! construction. There are no process-wide singletons: the config object
//! is built once and passed into
//! [`AcquisitionPipeline::from_config`](crate::pipeline::AcquisitionPipeline::from_config),
//! which owns its own clients from then on.

use std::time::Duration;

use thiserror::Error;

use crate::provider::ImagerySet;

/// Environment variable holding the Bing Maps API key.
///
/// The same key authenticates the geocoding, metadata and imagery
/// endpoints.
pub const BING_KEY_VAR: &str = "BING_API_KEY";

/// Environment variable holding the optional Google Maps API key.
pub const GOOGLE_KEY_VAR: &str = "GOOGLE_MAPS_API_KEY";

/// Default timeout for provider HTTP requests (in seconds).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),

    /// A required environment variable is set but blank.
    #[error("environment variable {0} is empty")]
    EmptyVar(&'static str),
}

/// Provider credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Bing Maps API key, used for geocoding, metadata and imagery.
    pub bing_api_key: String,

    /// Google Maps API key. Reserved for an alternate static-maps
    /// provider; the Bing pipeline does not use it.
    pub google_maps_api_key: Option<String>,
}

impl Credentials {
    /// Creates credentials from an explicit key (tests, embedding apps
    /// with their own config layer).
    pub fn new(bing_api_key: impl Into<String>) -> Self {
        Self {
            bing_api_key: bing_api_key.into(),
            google_maps_api_key: None,
        }
    }

    /// Adds the optional Google Maps key.
    pub fn with_google_maps_key(mut self, key: impl Into<String>) -> Self {
        self.google_maps_api_key = Some(key.into());
        self
    }

    /// Loads credentials from the process environment.
    ///
    /// `BING_API_KEY` is required; `GOOGLE_MAPS_API_KEY` is picked up
    /// when present and non-blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bing_api_key =
            std::env::var(BING_KEY_VAR).map_err(|_| ConfigError::MissingVar(BING_KEY_VAR))?;
        if bing_api_key.trim().is_empty() {
            return Err(ConfigError::EmptyVar(BING_KEY_VAR));
        }

        let google_maps_api_key = std::env::var(GOOGLE_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            bing_api_key,
            google_maps_api_key,
        })
    }
}

/// Top-level configuration for the acquisition pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Provider credentials.
    pub credentials: Credentials,

    /// Imagery set requested when the caller does not name one.
    pub imagery_set: ImagerySet,

    /// Timeout applied to every provider HTTP request.
    pub http_timeout: Duration,
}

impl PipelineConfig {
    /// Creates a pipeline config with default imagery set and timeout.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            imagery_set: ImagerySet::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Creates a pipeline config with credentials from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(Credentials::from_env()?))
    }

    /// Sets the default imagery set.
    pub fn with_imagery_set(mut self, imagery_set: ImagerySet) -> Self {
        self.imagery_set = imagery_set;
        self
    }

    /// Sets the HTTP timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}
