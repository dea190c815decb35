//! The remote feature-layer seam.
//!
//! A [`RemoteLayerClient`] lists, deletes, and inserts features on a hosted
//! layer. It reports call-level failures as [`RemoteError`] and per-item
//! rejections through [`EditResults`].

mod error;
mod outcome;

pub use error::RemoteError;
pub use outcome::{DeleteResult, EditOutcome, EditResults, InsertResult, RemoteObjectId};

use std::fmt;
use std::ops::Deref;

use async_trait::async_trait;

use crate::FeatureSet;

/// Address of a hosted feature layer, without a trailing slash.
///
/// # Examples
/// ```
/// use trafficsync_core::LayerEndpoint;
///
/// let layer = LayerEndpoint::new("https://services.example/arcgis/rest/services/Traffic/FeatureServer/0/");
/// assert!(layer.as_str().ends_with("/0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerEndpoint(String);

impl LayerEndpoint {
    /// Wrap a layer URL, trimming any trailing slashes.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let mut endpoint = endpoint.into();
        let trimmed = endpoint.trim_end_matches('/').len();
        endpoint.truncate(trimmed);
        Self(endpoint)
    }

    /// Borrow the endpoint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the owned URL.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// URL of an operation under this layer, such as `query`.
    #[must_use]
    pub fn operation(&self, name: &str) -> String {
        format!("{}/{name}", self.0)
    }
}

impl From<&str> for LayerEndpoint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LayerEndpoint {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for LayerEndpoint {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for LayerEndpoint {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for LayerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attribute filter selecting which remote ids to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdFilter(String);

impl IdFilter {
    /// Filter matching every feature in the layer.
    #[must_use]
    pub fn match_all() -> Self {
        Self("1=1".to_owned())
    }

    /// A custom where-clause.
    pub fn new(clause: impl Into<String>) -> Self {
        Self(clause.into())
    }

    /// The where-clause text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for IdFilter {
    fn default() -> Self {
        Self::match_all()
    }
}

/// Operations the synchronizer needs from a hosted feature layer.
///
/// Each call addresses the layer through `layer`, so one client can serve
/// several layers. Implementations acquire credentials themselves.
#[async_trait(?Send)]
pub trait RemoteLayerClient {
    /// List the ids of every feature matching `filter`.
    async fn list_all_ids(
        &self,
        layer: &LayerEndpoint,
        filter: &IdFilter,
    ) -> Result<Vec<RemoteObjectId>, RemoteError>;

    /// Delete the given ids, reporting a per-id outcome.
    async fn delete_objects(
        &self,
        layer: &LayerEndpoint,
        ids: &[RemoteObjectId],
    ) -> Result<DeleteResult, RemoteError>;

    /// Insert `features`, reporting a per-feature outcome.
    async fn insert_features(
        &self,
        layer: &LayerEndpoint,
        features: &FeatureSet,
    ) -> Result<InsertResult, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://host/FeatureServer/0", "https://host/FeatureServer/0")]
    #[case("https://host/FeatureServer/0/", "https://host/FeatureServer/0")]
    #[case("https://host/FeatureServer/0///", "https://host/FeatureServer/0")]
    fn trims_trailing_slashes(#[case] raw: &str, #[case] expected: &str) {
        let layer = LayerEndpoint::from(raw);
        assert_eq!(layer.as_str(), expected);
        assert_eq!(layer.operation("query"), format!("{expected}/query"));
    }

    #[rstest]
    fn match_all_is_tautology() {
        assert_eq!(IdFilter::default().as_str(), "1=1");
    }
}
