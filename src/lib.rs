//! Facade crate for the trafficsync layer synchronizer.
//!
//! This crate re-exports the core domain types and the replace-all pass, and
//! exposes the HTTP feed source and feature-service client behind the `http`
//! feature.

#![forbid(unsafe_code)]

pub use trafficsync_core::{
    AttributeValue, CancellationToken, ErrorKind, Feature, FeatureSet, FeedError, FeedSource,
    IdFilter, LayerEndpoint, LineGeometry, NormalizeError, Normalizer, PassObserver, RemoteError,
    RemoteLayerClient, RemoteObjectId, SpatialReference, SyncFailure, SyncOptions, SyncResult,
    SyncSummary, Synchronizer, TimestampPolicy,
};

#[cfg(feature = "http")]
pub use trafficsync_data::{
    ClientBuildError,
    feature_service::{FeatureServiceClient, FeatureServiceConfig},
    feed::{FeedSchema, HttpFeedSource, HttpFeedSourceConfig},
};
