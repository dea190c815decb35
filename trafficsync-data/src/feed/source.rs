//! HTTP implementation of [`FeedSource`].

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use reqwest::header::ACCEPT;
use trafficsync_core::{FeatureSet, FeedError, FeedSource};

use super::geojson::{FeedSchema, parse_feature_collection};
use crate::http::{ClientBuildError, TransportFailure, build_client};

/// Default user agent for feed requests.
pub const DEFAULT_USER_AGENT: &str = "trafficsync-feed/0.1";

/// Default feed request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`HttpFeedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFeedSourceConfig {
    /// Request timeout, applied to connecting and to the whole request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Properties every feature must carry.
    pub schema: FeedSchema,
}

impl Default for HttpFeedSourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            schema: FeedSchema::default(),
        }
    }
}

impl HttpFeedSourceConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the required feature properties.
    #[must_use]
    pub fn with_schema(mut self, schema: FeedSchema) -> Self {
        self.schema = schema;
        self
    }
}

/// Fetches the traffic feed over HTTP and parses it as GeoJSON.
///
/// The body is decoded using the charset declared by the response, so feeds
/// served as ISO-8859-15 arrive with their umlauts intact.
///
/// # Example
///
/// ```no_run
/// use trafficsync_core::FeedSource;
/// use trafficsync_data::feed::HttpFeedSource;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpFeedSource::new()?;
/// let features = source.fetch("http://stadtplan.bonn.de/geojson?Thema=19584").await?;
/// println!("{} segments", features.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpFeedSource {
    client: Client,
    config: HttpFeedSourceConfig,
}

impl HttpFeedSource {
    /// Create a source with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::with_config(HttpFeedSourceConfig::default())
    }

    /// Create a source with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_config(config: HttpFeedSourceConfig) -> Result<Self, ClientBuildError> {
        let client = build_client(&config.user_agent, config.timeout)?;
        Ok(Self { client, config })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &HttpFeedSourceConfig {
        &self.config
    }

    async fn download(&self, url: &str) -> Result<String, FeedError> {
        let convert =
            |err: &reqwest::Error| TransportFailure::classify(err).into_feed_error(url, self.config.timeout);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| convert(&err))?
            .error_for_status()
            .map_err(|err| convert(&err))?;
        debug!(
            "feed responded with {} ({:?})",
            response.status(),
            response.headers().get(reqwest::header::CONTENT_TYPE)
        );
        response.text().await.map_err(|err| convert(&err))
    }
}

/// Reject anything that is not an absolute URL before touching the network.
pub(crate) fn validate_feed_url(url: &str) -> Result<(), FeedError> {
    if url.trim().is_empty() {
        return Err(FeedError::InvalidUrl {
            url: url.to_owned(),
            reason: "the feed URL is empty".to_owned(),
        });
    }
    url::Url::parse(url)
        .map(drop)
        .map_err(|err| FeedError::InvalidUrl {
            url: url.to_owned(),
            reason: err.to_string(),
        })
}

#[async_trait(?Send)]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<FeatureSet, FeedError> {
        validate_feed_url(url)?;
        let body = self.download(url).await?;
        let features = parse_feature_collection(&body, &self.config.schema)?;
        info!("feed {url} returned {} usable features", features.len());
        Ok(features)
    }
}
