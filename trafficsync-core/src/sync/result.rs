//! Outcome types of a synchronization pass.

use std::fmt;

use crate::RemoteObjectId;

/// Classification of a failed pass or stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The feed or remote layer was unreachable or timed out.
    Transport,
    /// The feed body was malformed.
    Parse,
    /// A feature's coordinates could not be reconciled.
    Geometry,
    /// Listing remote ids failed.
    RemoteQuery,
    /// A delete or insert call failed, or individual items were rejected.
    RemoteMutation,
    /// The caller cancelled the pass.
    Cancelled,
    /// Anything else, including collaborator panics.
    Unknown,
}

impl ErrorKind {
    /// Stable name used in logs and user-facing messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "TransportError",
            Self::Parse => "ParseError",
            Self::Geometry => "GeometryError",
            Self::RemoteQuery => "RemoteQueryError",
            Self::RemoteMutation => "RemoteMutationError",
            Self::Cancelled => "Cancelled",
            Self::Unknown => "UnknownError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which batch a rejected item belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationPhase {
    /// Clearing the previous snapshot.
    Delete,
    /// Writing the new snapshot.
    Insert,
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delete => "delete",
            Self::Insert => "insert",
        })
    }
}

/// One item the remote layer rejected inside an otherwise completed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMutationError {
    /// Batch the item was part of.
    pub phase: MutationPhase,
    /// Id of the rejected item, when known.
    pub object_id: Option<RemoteObjectId>,
    /// Reason reported by the remote layer.
    pub message: String,
}

impl fmt::Display for RemoteMutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object_id {
            Some(id) => write!(f, "{} of object {id} rejected: {}", self.phase, self.message),
            None => write!(f, "{} rejected: {}", self.phase, self.message),
        }
    }
}

/// Counts reported by a successful pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncSummary {
    /// Features the remote layer confirmed as inserted.
    pub inserted: usize,
    /// Objects the remote layer confirmed as deleted.
    pub deleted: usize,
    /// Items rejected during the delete or insert batch.
    pub mutation_errors: Vec<RemoteMutationError>,
}

/// Why a pass failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl SyncFailure {
    /// Build a failure of `kind`.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of one synchronization pass.
///
/// # Examples
/// ```
/// use trafficsync_core::{SyncResult, SyncSummary};
///
/// let result = SyncResult::Success(SyncSummary { inserted: 2, ..SyncSummary::default() });
/// assert_eq!(result.inserted_count(), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    /// The delete and insert calls completed.
    Success(SyncSummary),
    /// The pass stopped early.
    Failure(SyncFailure),
}

impl SyncResult {
    /// Whether the pass succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Number of confirmed insertions for a successful pass.
    #[must_use]
    pub const fn inserted_count(&self) -> Option<usize> {
        match self {
            Self::Success(summary) => Some(summary.inserted),
            Self::Failure(_) => None,
        }
    }

    /// The failure, if the pass failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&SyncFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}
