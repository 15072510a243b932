//! Bing Maps imagery provider.
//!
//! Uses the Bing Maps REST Imagery API with authentication via API key.
//! Two endpoints are consumed:
//!
//! - BasicMetadata: `https://dev.virtualearth.net/REST/v1/Imagery/BasicMetadata/{imagerySet}/{lat,lng}?key={API_KEY}`
//!   (with an optional `zoomLevel` query parameter)
//! - Map imagery: `https://dev.virtualearth.net/REST/v1/Imagery/Map/{imagerySet}/{lat,lng}/{zoom}?key={API_KEY}`
//!
//! The metadata request deliberately omits the zoom parameter unless the
//! caller supplied one: omission makes the provider report the zoom range
//! it supports at that location, which the pipeline uses to auto-select
//! a level.

use std::fmt;

use crate::geocode::Coordinates;
use crate::provider::{HttpClient, ProviderError};

use super::metadata::ImageryMetadata;

/// Base URL for imagery metadata requests.
const METADATA_BASE_URL: &str = "https://dev.virtualearth.net/REST/v1/Imagery/BasicMetadata";

/// Base URL for imagery requests.
const IMAGERY_BASE_URL: &str = "https://dev.virtualearth.net/REST/v1/Imagery/Map";

/// Minimum zoom level accepted by the imagery endpoints.
const MIN_ZOOM: u8 = 1;

/// Maximum zoom level accepted by the imagery endpoints.
/// Birdseye imagery sets report levels up to 23 in covered areas.
const MAX_ZOOM: u8 = 23;

/// Provider-defined imagery set identifier.
///
/// The provider treats this as an opaque path segment; the known variants
/// cover the sets the pipeline is used with, and `Custom` passes any other
/// identifier through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagerySet {
    /// Aerial (satellite) imagery.
    Aerial,
    /// Aerial imagery with road and label overlay.
    AerialWithLabels,
    /// Oblique birdseye imagery (legacy set).
    Birdseye,
    /// Oblique birdseye imagery, second generation.
    BirdseyeV2,
    /// Road map rendering.
    Road,
    /// Any other provider-defined identifier.
    Custom(String),
}

impl ImagerySet {
    /// The identifier as the provider expects it in URLs.
    pub fn as_str(&self) -> &str {
        match self {
            ImagerySet::Aerial => "Aerial",
            ImagerySet::AerialWithLabels => "AerialWithLabels",
            ImagerySet::Birdseye => "Birdseye",
            ImagerySet::BirdseyeV2 => "BirdseyeV2",
            ImagerySet::Road => "Road",
            ImagerySet::Custom(id) => id,
        }
    }
}

impl Default for ImagerySet {
    fn default() -> Self {
        ImagerySet::BirdseyeV2
    }
}

impl fmt::Display for ImagerySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bing Maps imagery provider.
///
/// Requires a valid Bing Maps API key. Holds no state besides the key and
/// the HTTP client; each call is one provider round-trip.
///
/// # Example
///
/// ```ignore
/// use siteview::provider::{BingImageryProvider, ReqwestClient};
///
/// let client = ReqwestClient::new()?;
/// let provider = BingImageryProvider::new(client, "YOUR_API_KEY".to_string());
/// ```
pub struct BingImageryProvider<C: HttpClient> {
    http_client: C,
    api_key: String,
}

impl<C: HttpClient> BingImageryProvider<C> {
    /// Creates a new Bing imagery provider with the given API key.
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client for making requests
    /// * `api_key` - Valid Bing Maps API key
    pub fn new(http_client: C, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
        }
    }

    /// Whether the provider accepts the given zoom level.
    pub fn supports_zoom(&self, zoom: u8) -> bool {
        (MIN_ZOOM..=MAX_ZOOM).contains(&zoom)
    }

    /// Builds the metadata URL, including the zoom parameter only when
    /// explicitly supplied.
    fn metadata_url(
        &self,
        coordinates: &Coordinates,
        imagery_set: &ImagerySet,
        zoom_level: Option<u8>,
    ) -> String {
        match zoom_level {
            Some(zoom) => format!(
                "{}/{}/{}?zoomLevel={}&key={}",
                METADATA_BASE_URL, imagery_set, coordinates, zoom, self.api_key
            ),
            None => format!(
                "{}/{}/{}?key={}",
                METADATA_BASE_URL, imagery_set, coordinates, self.api_key
            ),
        }
    }

    /// Builds the imagery URL for a concrete zoom level.
    fn imagery_url(
        &self,
        coordinates: &Coordinates,
        imagery_set: &ImagerySet,
        zoom_level: u8,
    ) -> String {
        format!(
            "{}/{}/{}/{}?key={}",
            IMAGERY_BASE_URL, imagery_set, coordinates, zoom_level, self.api_key
        )
    }

    /// Fetches and parses imagery metadata for the given location.
    ///
    /// Performs one GET against the BasicMetadata endpoint. The response
    /// is parsed but not validated; status checking is the orchestrator's
    /// job so that a failing envelope stays available for diagnosis.
    pub fn metadata(
        &self,
        coordinates: &Coordinates,
        imagery_set: &ImagerySet,
        zoom_level: Option<u8>,
    ) -> Result<ImageryMetadata, ProviderError> {
        if let Some(zoom) = zoom_level {
            if !self.supports_zoom(zoom) {
                return Err(ProviderError::UnsupportedZoom(zoom));
            }
        }

        let url = self.metadata_url(coordinates, imagery_set, zoom_level);
        let body = self.http_client.get(&url)?;

        serde_json::from_slice(&body).map_err(|e| {
            ProviderError::MalformedResponse(format!("metadata body is not valid JSON: {}", e))
        })
    }

    /// Fetches the raw imagery bytes for a concrete zoom level.
    ///
    /// The body is returned undecoded; the pipeline decides how to decode
    /// it and how to represent decode failures.
    pub fn image(
        &self,
        coordinates: &Coordinates,
        imagery_set: &ImagerySet,
        zoom_level: u8,
    ) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(zoom_level) {
            return Err(ProviderError::UnsupportedZoom(zoom_level));
        }

        let url = self.imagery_url(coordinates, imagery_set, zoom_level);
        self.http_client.get(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockHttpClient;

    fn coordinates() -> Coordinates {
        Coordinates::new(47.61, -122.33).unwrap()
    }

    #[test]
    fn test_imagery_set_identifiers() {
        assert_eq!(ImagerySet::Aerial.as_str(), "Aerial");
        assert_eq!(ImagerySet::BirdseyeV2.as_str(), "BirdseyeV2");
        assert_eq!(
            ImagerySet::Custom("OrdnanceSurvey".to_string()).as_str(),
            "OrdnanceSurvey"
        );
    }

    #[test]
    fn test_imagery_set_default() {
        assert_eq!(ImagerySet::default(), ImagerySet::BirdseyeV2);
    }

    #[test]
    fn test_metadata_url_without_zoom() {
        let mock_client = MockHttpClient {
            response: Ok(vec![]),
        };
        let provider = BingImageryProvider::new(mock_client, "test_key".to_string());

        let url = provider.metadata_url(&coordinates(), &ImagerySet::BirdseyeV2, None);
        assert_eq!(
            url,
            "https://dev.virtualearth.net/REST/v1/Imagery/BasicMetadata/BirdseyeV2/47.61,-122.33?key=test_key"
        );
    }

    #[test]
    fn test_metadata_url_with_zoom() {
        let mock_client = MockHttpClient {
            response: Ok(vec![]),
        };
        let provider = BingImageryProvider::new(mock_client, "test_key".to_string());

        let url = provider.metadata_url(&coordinates(), &ImagerySet::Aerial, Some(18));
        assert_eq!(
            url,
            "https://dev.virtualearth.net/REST/v1/Imagery/BasicMetadata/Aerial/47.61,-122.33?zoomLevel=18&key=test_key"
        );
    }

    #[test]
    fn test_imagery_url_construction() {
        let mock_client = MockHttpClient {
            response: Ok(vec![]),
        };
        let provider = BingImageryProvider::new(mock_client, "test_key".to_string());

        let url = provider.imagery_url(&coordinates(), &ImagerySet::BirdseyeV2, 15);
        assert_eq!(
            url,
            "https://dev.virtualearth.net/REST/v1/Imagery/Map/BirdseyeV2/47.61,-122.33/15?key=test_key"
        );
    }

    #[test]
    fn test_api_key_included_in_urls() {
        let mock_client = MockHttpClient {
            response: Ok(vec![]),
        };
        let provider = BingImageryProvider::new(mock_client, "secret_key_123".to_string());

        assert!(provider
            .metadata_url(&coordinates(), &ImagerySet::Aerial, None)
            .contains("key=secret_key_123"));
        assert!(provider
            .imagery_url(&coordinates(), &ImagerySet::Aerial, 10)
            .contains("key=secret_key_123"));
    }

    #[test]
    fn test_metadata_parses_envelope() {
        let body = br#"{"statusCode": 200, "resourceSets": [{"resources": [{"zoomMin": 12, "zoomMax": 20}]}]}"#;
        let mock_client = MockHttpClient {
            response: Ok(body.to_vec()),
        };
        let provider = BingImageryProvider::new(mock_client, "test_key".to_string());

        let metadata = provider
            .metadata(&coordinates(), &ImagerySet::BirdseyeV2, None)
            .unwrap();
        assert_eq!(metadata.status_code, Some(200));
        assert_eq!(metadata.zoom_range(), Some((12, 20)));
    }

    #[test]
    fn test_metadata_rejects_non_json_body() {
        let mock_client = MockHttpClient {
            response: Ok(b"<html>quota exceeded</html>".to_vec()),
        };
        let provider = BingImageryProvider::new(mock_client, "test_key".to_string());

        let result = provider.metadata(&coordinates(), &ImagerySet::BirdseyeV2, None);
        assert!(matches!(
            result,
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_metadata_unsupported_zoom() {
        let mock_client = MockHttpClient {
            response: Ok(vec![]),
        };
        let provider = BingImageryProvider::new(mock_client, "test_key".to_string());

        let result = provider.metadata(&coordinates(), &ImagerySet::Aerial, Some(24));
        assert!(matches!(result, Err(ProviderError::UnsupportedZoom(24))));
    }

    #[test]
    fn test_image_returns_raw_bytes() {
        let body = vec![0xFF, 0xD8, 0xFF, 0xE0];
        let mock_client = MockHttpClient {
            response: Ok(body.clone()),
        };
        let provider = BingImageryProvider::new(mock_client, "test_key".to_string());

        let result = provider.image(&coordinates(), &ImagerySet::Aerial, 15);
        assert_eq!(result.unwrap(), body);
    }

    #[test]
    fn test_image_unsupported_zoom() {
        let mock_client = MockHttpClient {
            response: Ok(vec![]),
        };
        let provider = BingImageryProvider::new(mock_client, "test_key".to_string());

        let result = provider.image(&coordinates(), &ImagerySet::Aerial, 0);
        assert!(matches!(result, Err(ProviderError::UnsupportedZoom(0))));
    }

    #[test]
    fn test_image_propagates_http_error() {
        let mock_client = MockHttpClient {
            response: Err(ProviderError::HttpError("Network error".to_string())),
        };
        let provider = BingImageryProvider::new(mock_client, "test_key".to_string());

        let result = provider.image(&coordinates(), &ImagerySet::Aerial, 15);
        assert!(matches!(result, Err(ProviderError::HttpError(_))));
    }
}
