//! Hosted feature-service layer client.
//!
//! [`FeatureServiceClient`] implements [`trafficsync_core::RemoteLayerClient`]
//! against the ArcGIS-style REST API: `query` for ids, `applyEdits` for
//! deletions and insertions, and OAuth2 app login for tokens.

mod client;
mod encode;
mod token;
mod wire;

pub use client::{DEFAULT_USER_AGENT, FeatureServiceClient, FeatureServiceConfig};
