//! Core domain types and the replace-all pass for trafficsync.
//!
//! The crate is transport-agnostic. Fetching the feed and talking to the
//! remote layer happen behind the [`FeedSource`] and [`RemoteLayerClient`]
//! traits; `trafficsync-data` provides the HTTP implementations and the
//! `test-support` feature provides in-memory doubles.
//!
//! A pass runs fetch, normalize, list remote ids, delete all, insert all.
//! See [`Synchronizer`] for the failure semantics of each stage.

mod feature;
mod feed;
pub mod normalize;
mod remote;
mod spatial_reference;
mod sync;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use feature::{
    AttributeValue, Feature, FeatureSet, LineGeometry, Position, Properties, is_empty_point,
};
pub use feed::{FeedError, FeedSource};
pub use normalize::{
    CANONICAL_REFERENCE, DEFAULT_SOURCE_ZONE, DEFAULT_TIMESTAMP_FIELD, NormalizeError, Normalizer,
    TimestampPolicy,
};
pub use remote::{
    DeleteResult, EditOutcome, EditResults, IdFilter, InsertResult, LayerEndpoint, RemoteError,
    RemoteLayerClient, RemoteObjectId,
};
pub use spatial_reference::SpatialReference;
pub use sync::{
    DEFAULT_STAGE_TIMEOUT, ErrorKind, MutationPhase, PassObserver, RemoteMutationError,
    SyncFailure, SyncOptions, SyncResult, SyncSummary, Synchronizer,
};
pub use tokio_util::sync::CancellationToken;
