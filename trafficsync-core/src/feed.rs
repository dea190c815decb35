//! The feed-reading seam used by the synchronizer.
//!
//! A [`FeedSource`] turns a feed endpoint into a [`FeatureSet`]. The HTTP
//! implementation lives in `trafficsync-data`; tests use in-memory doubles.

use async_trait::async_trait;
use thiserror::Error;

use crate::{ErrorKind, FeatureSet};

/// Errors from [`FeedSource::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The endpoint was empty or not an absolute URL.
    #[error("invalid feed URL {url:?}: {reason}")]
    InvalidUrl {
        /// The rejected value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Timeout that elapsed, in seconds.
        timeout_secs: u64,
    },
    /// The connection failed before a response was received.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The feed answered with an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The body was not a usable feature collection.
    #[error("malformed feed body: {message}")]
    Parse {
        /// What was wrong with the body.
        message: String,
    },
}

impl FeedError {
    /// Build a [`FeedError::Parse`] from any message.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Classification used in pass results.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::InvalidUrl { .. }
            | Self::Timeout { .. }
            | Self::Network { .. }
            | Self::Http { .. } => ErrorKind::Transport,
        }
    }
}

/// Fetch and parse the traffic feed.
///
/// Implementations perform a single read per call, keep no cache, and drop
/// individual features whose geometry cannot be used rather than failing the
/// whole fetch. The returned set has no declared spatial reference.
#[async_trait(?Send)]
pub trait FeedSource {
    /// Fetch the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<FeatureSet, FeedError>;
}
