//! HTTP collaborators for trafficsync.
//!
//! - [`feed::HttpFeedSource`] downloads and parses the GeoJSON traffic feed.
//! - [`feature_service::FeatureServiceClient`] lists, deletes, and inserts
//!   features on a hosted layer.
//!
//! Both plug into [`trafficsync_core::Synchronizer`].

pub mod feature_service;
pub mod feed;
mod http;

pub use http::ClientBuildError;
