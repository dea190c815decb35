//! Traffic feed retrieval and GeoJSON parsing.
//!
//! [`HttpFeedSource`] downloads a GeoJSON `FeatureCollection` and turns it
//! into a [`trafficsync_core::FeatureSet`]. Features whose geometry is not a
//! multi-line-string are skipped; a body that is not a feature collection at
//! all fails the fetch.

mod geojson;
mod properties;
mod source;

pub use geojson::{DEFAULT_SPEED_FIELD, FeedSchema, parse_feature_collection};
pub use source::{DEFAULT_USER_AGENT, HttpFeedSource, HttpFeedSourceConfig};

/// Feed sources for tests that exercise the real parser without a network.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::cell::RefCell;

    use async_trait::async_trait;
    use trafficsync_core::{FeatureSet, FeedError, FeedSource};

    use super::{FeedSchema, parse_feature_collection};

    /// Serves a fixed response body through [`parse_feature_collection`].
    #[derive(Debug)]
    pub struct BodyFeedSource {
        body: String,
        schema: FeedSchema,
        requests: RefCell<Vec<String>>,
    }

    impl BodyFeedSource {
        /// Serve `body` for every fetch using the default schema.
        pub fn new(body: impl Into<String>) -> Self {
            Self {
                body: body.into(),
                schema: FeedSchema::default(),
                requests: RefCell::new(Vec::new()),
            }
        }

        /// URLs requested so far.
        #[must_use]
        pub fn requests(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }
    }

    #[async_trait(?Send)]
    impl FeedSource for BodyFeedSource {
        async fn fetch(&self, url: &str) -> Result<FeatureSet, FeedError> {
            self.requests.borrow_mut().push(url.to_owned());
            parse_feature_collection(&self.body, &self.schema)
        }
    }
}
