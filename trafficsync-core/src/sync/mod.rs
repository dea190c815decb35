//! The replace-all synchronization pass and its outcome types.

mod observer;
mod result;
mod synchronizer;

pub use observer::PassObserver;
pub use result::{
    ErrorKind, MutationPhase, RemoteMutationError, SyncFailure, SyncResult, SyncSummary,
};
pub use synchronizer::{DEFAULT_STAGE_TIMEOUT, SyncOptions, Synchronizer};
