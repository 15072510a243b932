//! Address resolution.
//!
//! Turns a free-text address into [`Coordinates`] via the provider's
//! Locations endpoint. Resolution distinguishes two non-success outcomes:
//! a *soft miss* (`Ok(None)`) when the provider answered but found no
//! location with a latitude and longitude, and a transport/auth failure
//! (`Err`). Batch callers rely on the soft miss being a value so one
//! unresolvable address never aborts a whole run.

use std::fmt;

use serde::Deserialize;

use crate::provider::{HttpClient, ProviderError};

/// Base URL for geocoding requests.
const LOCATIONS_BASE_URL: &str = "https://dev.virtualearth.net/REST/v1/Locations";

/// A geographic position in decimal degrees.
///
/// Both components are guaranteed finite; construction rejects NaN and
/// infinities. The `Display` form is the `"lat,lng"` token the imagery
/// endpoints consume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Creates coordinates, rejecting non-finite components.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ProviderError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ProviderError::InvalidCoordinates(format!(
                "latitude and longitude must be finite, got ({}, {})",
                latitude, longitude
            )));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Trait for geocoding capabilities.
///
/// Implementations perform one lookup per call. `Ok(None)` is the soft
/// miss: the service answered but the address did not resolve. Transport
/// and authentication failures are errors.
pub trait Geocoder: Send + Sync {
    /// Resolves an address to coordinates, if the service knows it.
    fn geocode(&self, address: &str) -> Result<Option<Coordinates>, ProviderError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationsEnvelope {
    #[serde(default)]
    resource_sets: Vec<LocationResourceSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationResourceSet {
    #[serde(default)]
    resources: Vec<Location>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    #[serde(default)]
    point: Option<Point>,
}

#[derive(Debug, Deserialize)]
struct Point {
    /// `[latitude, longitude]` per the provider's Point convention.
    #[serde(default)]
    coordinates: Vec<f64>,
}

/// Geocoder backed by the Bing Maps Locations endpoint.
///
/// # Example
///
/// ```ignore
/// use siteview::geocode::{BingGeocoder, Geocoder};
/// use siteview::provider::ReqwestClient;
///
/// let client = ReqwestClient::new()?;
/// let geocoder = BingGeocoder::new(client, "YOUR_API_KEY".to_string());
/// let coordinates = geocoder.geocode("1 Main St, Springfield")?;
/// ```
pub struct BingGeocoder<C: HttpClient> {
    http_client: C,
    api_key: String,
}

impl<C: HttpClient> BingGeocoder<C> {
    /// Creates a new geocoder with the given API key.
    pub fn new(http_client: C, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
        }
    }

    /// Builds the Locations query URL with the address percent-encoded.
    fn build_url(&self, address: &str) -> Result<String, ProviderError> {
        let url = reqwest::Url::parse_with_params(
            LOCATIONS_BASE_URL,
            &[("q", address), ("key", self.api_key.as_str())],
        )
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid query: {}", e)))?;

        Ok(url.into())
    }
}

impl<C: HttpClient> Geocoder for BingGeocoder<C> {
    fn geocode(&self, address: &str) -> Result<Option<Coordinates>, ProviderError> {
        let url = self.build_url(address)?;
        let body = self.http_client.get(&url)?;

        let envelope: LocationsEnvelope = serde_json::from_slice(&body).map_err(|e| {
            ProviderError::MalformedResponse(format!("locations body is not valid JSON: {}", e))
        })?;

        // No resources, or a resource without a point, is a soft miss.
        let Some(location) = envelope
            .resource_sets
            .first()
            .and_then(|set| set.resources.first())
        else {
            return Ok(None);
        };

        let Some(point) = &location.point else {
            return Ok(None);
        };

        match point.coordinates[..] {
            [latitude, longitude, ..] => Coordinates::new(latitude, longitude).map(Some),
            _ => Ok(None),
        }
    }
}
