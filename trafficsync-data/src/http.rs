//! Shared HTTP plumbing for the feed source and the feature-service client.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use trafficsync_core::{FeedError, RemoteError};

/// Errors raised while constructing an HTTP-backed collaborator.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// A configured URL was not absolute.
    #[error("invalid {field} URL {value:?}: {source}")]
    InvalidUrl {
        /// Which setting held the URL.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
}

pub(crate) fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, ClientBuildError> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()?)
}

pub(crate) fn parse_absolute(field: &'static str, value: &str) -> Result<url::Url, ClientBuildError> {
    url::Url::parse(value).map_err(|source| ClientBuildError::InvalidUrl {
        field,
        value: value.to_owned(),
        source,
    })
}

/// Transport-level failure independent of which collaborator saw it.
#[derive(Debug)]
pub(crate) enum TransportFailure {
    Timeout,
    Http { status: u16, message: String },
    Network { message: String },
}

impl TransportFailure {
    pub(crate) fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = error.status() {
            return Self::Http {
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        Self::Network {
            message: error.to_string(),
        }
    }

    pub(crate) fn into_feed_error(self, url: &str, timeout: Duration) -> FeedError {
        let target = url.to_owned();
        match self {
            Self::Timeout => FeedError::Timeout {
                url: target,
                timeout_secs: timeout.as_secs(),
            },
            Self::Http { status, message } => FeedError::Http {
                url: target,
                status,
                message,
            },
            Self::Network { message } => FeedError::Network {
                url: target,
                message,
            },
        }
    }

    pub(crate) fn into_remote_error(self, url: &str, timeout: Duration) -> RemoteError {
        let target = url.to_owned();
        match self {
            Self::Timeout => RemoteError::Timeout {
                url: target,
                timeout_secs: timeout.as_secs(),
            },
            Self::Http { status, message } => RemoteError::Http {
                url: target,
                status,
                message,
            },
            Self::Network { message } => RemoteError::Network {
                url: target,
                message,
            },
        }
    }
}
