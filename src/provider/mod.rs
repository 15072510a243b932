//! Imagery provider access
//!
//! This module provides the HTTP seam and the Bing Maps imagery provider
//! the acquisition pipeline runs against: a typed metadata endpoint
//! (status code, zoom range) and a raw imagery endpoint.

mod bing;
mod http;
mod metadata;
mod types;

pub use bing::{BingImageryProvider, ImagerySet};
pub use http::{HttpClient, ReqwestClient};
pub use metadata::{ImageryMetadata, ImageryResource, ResourceSet};
pub use types::ProviderError;

#[cfg(test)]
pub use http::tests::{MockHttpClient, RoutingHttpClient};
