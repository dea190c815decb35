//! Error types emitted by the trafficsync CLI.
//!
//! Keep this error type small; most helpers return `Result<_, CliError>` and
//! the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use thiserror::Error;
use trafficsync_core::SyncFailure;
use trafficsync_data::ClientBuildError;

/// Errors emitted by the trafficsync CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Long flag name.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// The configured source time zone is not an IANA zone name.
    #[error("unknown time zone {value:?}: {reason}")]
    InvalidTimeZone {
        /// Rejected zone name.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// A duration option was zero.
    #[error("--{field} must be a positive number of seconds")]
    InvalidDuration {
        /// Long flag name.
        field: &'static str,
    },
    /// Constructing an HTTP collaborator failed.
    #[error(transparent)]
    BuildClient(#[from] ClientBuildError),
    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Writing the pass summary failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// The synchronization pass failed.
    #[error("{0}")]
    PassFailed(SyncFailure),
}
