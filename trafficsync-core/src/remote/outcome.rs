//! Identifiers and per-item outcomes reported by a remote layer.

use std::fmt;

/// Identifier assigned by the remote layer to a stored feature.
///
/// Only remote client implementations create these; the synchronizer reads
/// and deletes by id but never invents one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemoteObjectId(i64);

impl RemoteObjectId {
    /// Wrap a raw id received from the remote layer.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw id for wire encoding.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RemoteObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of applying one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Id the edit applied to, when the remote reported one.
    pub object_id: Option<RemoteObjectId>,
    /// Whether the remote accepted the edit.
    pub success: bool,
    /// Remote-supplied reason for a rejected edit.
    pub error: Option<String>,
}

impl EditOutcome {
    /// An accepted edit.
    #[must_use]
    pub const fn accepted(object_id: RemoteObjectId) -> Self {
        Self {
            object_id: Some(object_id),
            success: true,
            error: None,
        }
    }

    /// A rejected edit.
    pub fn rejected(object_id: Option<RemoteObjectId>, reason: impl Into<String>) -> Self {
        Self {
            object_id,
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// Per-item results of a batch edit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditResults {
    /// One outcome per submitted item, in submission order when the remote
    /// preserves it.
    pub outcomes: Vec<EditOutcome>,
}

impl EditResults {
    /// Wrap outcomes.
    #[must_use]
    pub const fn new(outcomes: Vec<EditOutcome>) -> Self {
        Self { outcomes }
    }

    /// Number of accepted edits.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.success).count()
    }

    /// Iterate over rejected edits.
    pub fn failures(&self) -> impl Iterator<Item = &EditOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.success)
    }
}

/// Per-id results of a batch deletion.
pub type DeleteResult = EditResults;

/// Per-feature results of a batch insertion.
pub type InsertResult = EditResults;
