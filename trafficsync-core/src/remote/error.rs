use thiserror::Error;

/// Errors from [`crate::RemoteLayerClient`] calls.
///
/// These describe a failure of the call itself. Items the remote rejected
/// inside a completed batch are reported through
/// [`crate::EditResults`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Acquiring an access token failed.
    #[error("authentication against {portal} failed: {message}")]
    Authentication {
        /// Portal the token was requested from.
        portal: String,
        /// Failure description.
        message: String,
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
    /// The service answered with an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The service answered with an error payload.
    #[error("service error {code}: {message}")]
    Service {
        /// Service-specific error code.
        code: i64,
        /// Error description.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder error description.
        message: String,
    },
    /// A feature could not be encoded for submission.
    #[error("failed to encode edits: {message}")]
    Encode {
        /// Encoder error description.
        message: String,
    },
}
