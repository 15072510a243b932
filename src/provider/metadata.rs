//! Typed model of the imagery metadata envelope.
//!
//! The BasicMetadata endpoint answers with a REST envelope carrying a
//! status code and a list of resource sets; the first resource of the
//! first set describes the imagery available at the queried location,
//! including the supported zoom range. The orchestrator validates the
//! status and derives a zoom level from that range; this module only
//! models the shape and exposes the two accessors it needs.

use serde::Deserialize;
use serde_json::Value;

/// Imagery metadata returned by the provider's BasicMetadata endpoint.
///
/// Fields the pipeline does not model are retained in `extra` so that
/// failure diagnostics carry the full provider payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageryMetadata {
    /// Provider status code. A missing code is treated as failure.
    #[serde(default)]
    pub status_code: Option<u16>,

    #[serde(default)]
    pub status_description: Option<String>,

    #[serde(default)]
    pub resource_sets: Vec<ResourceSet>,

    /// Unmodeled envelope fields, kept for diagnostics.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One resource set of the metadata envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSet {
    #[serde(default)]
    pub estimated_total: Option<u64>,

    #[serde(default)]
    pub resources: Vec<ImageryResource>,
}

/// One imagery resource: zoom bounds and, where reported, tile dimensions
/// and imagery vintage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageryResource {
    #[serde(default)]
    pub zoom_min: Option<u8>,

    #[serde(default)]
    pub zoom_max: Option<u8>,

    #[serde(default)]
    pub image_width: Option<u32>,

    #[serde(default)]
    pub image_height: Option<u32>,

    #[serde(default)]
    pub vintage_start: Option<String>,

    #[serde(default)]
    pub vintage_end: Option<String>,
}

impl ImageryMetadata {
    /// Whether the provider reported a successful status.
    ///
    /// Uses the non-2xx convention: a missing status code or any code
    /// outside 200..300 counts as failure.
    pub fn status_ok(&self) -> bool {
        matches!(self.status_code, Some(code) if (200..300).contains(&code))
    }

    /// First resource of the first resource set, where the provider
    /// reports the imagery available at the queried location.
    pub fn first_resource(&self) -> Option<&ImageryResource> {
        self.resource_sets.first()?.resources.first()
    }

    /// The `[zoomMin, zoomMax]` range of the first resource.
    ///
    /// `None` when either bound is absent; the orchestrator needs both
    /// to auto-select a zoom level.
    pub fn zoom_range(&self) -> Option<(u8, u8)> {
        let resource = self.first_resource()?;
        Some((resource.zoom_min?, resource.zoom_max?))
    }
}
