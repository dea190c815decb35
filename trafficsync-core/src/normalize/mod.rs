//! Geometry and timestamp normalization.
//!
//! The [`Normalizer`] rewrites a freshly fetched [`FeatureSet`] into the
//! canonical form the remote layer expects:
//!
//! - every coordinate in WGS-84 and the set declared as WGS-84;
//! - the evaluation timestamp converted from the feed's local zone into UTC;
//! - blank vertices kept as the empty-point sentinel.
//!
//! Normalization is pure and idempotent. Features already in WGS-84 keep
//! their coordinates bit for bit, and timestamps that are already universal
//! are left alone, so a second pass over normalized output is a no-op.

mod error;
mod projection;
mod timestamp;

pub use error::NormalizeError;
pub use timestamp::{DEFAULT_SOURCE_ZONE, DEFAULT_TIMESTAMP_FIELD, TimestampPolicy};

use geo::Coord;

use crate::{AttributeValue, Feature, FeatureSet, LineGeometry, Position, SpatialReference};

/// Canonical reference all features are normalized into.
pub const CANONICAL_REFERENCE: SpatialReference = SpatialReference::WGS84;

/// Rewrites feature sets into canonical coordinates and universal time.
///
/// Normalization is all or nothing. A single vertex with one ordinate or a
/// non-finite ordinate, or one feature in an unsupported reference, fails
/// the whole set with [`NormalizeError`], and the pass that called it ends
/// as a geometry failure before the remote layer is touched. Features the
/// feed reader could not make sense of are dropped earlier and never reach
/// here.
///
/// # Examples
/// ```
/// use std::collections::HashMap;
/// use trafficsync_core::{
///     Feature, FeatureSet, LineGeometry, Normalizer, SpatialReference,
/// };
///
/// let feature = Feature::new(
///     LineGeometry::new(vec![vec![vec![7.1, 50.7], vec![7.2, 50.8]]], SpatialReference::WGS84),
///     HashMap::new(),
/// );
/// let set = FeatureSet::new(vec![feature]);
/// let normalizer = Normalizer::default();
///
/// let normalized = normalizer.normalize(&set)?;
/// assert_eq!(normalized.spatial_reference, Some(SpatialReference::WGS84));
/// assert_eq!(normalized.features, set.features);
/// # Ok::<(), trafficsync_core::NormalizeError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    timestamps: TimestampPolicy,
}

impl Normalizer {
    /// Create a normalizer using the supplied timestamp policy.
    #[must_use]
    pub const fn new(timestamps: TimestampPolicy) -> Self {
        Self { timestamps }
    }

    /// The timestamp policy in use.
    #[must_use]
    pub const fn timestamp_policy(&self) -> &TimestampPolicy {
        &self.timestamps
    }

    /// Return a normalized copy of `set`.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] when a position has a single ordinate or a
    /// non-finite ordinate, or when a feature's reference cannot be
    /// reprojected.
    pub fn normalize(&self, set: &FeatureSet) -> Result<FeatureSet, NormalizeError> {
        let features = set
            .features
            .iter()
            .enumerate()
            .map(|(index, feature)| self.normalize_feature(index, feature))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FeatureSet {
            features,
            spatial_reference: Some(CANONICAL_REFERENCE),
        })
    }

    /// Whether `set` is already in canonical form.
    #[must_use]
    pub fn is_normalized(&self, set: &FeatureSet) -> bool {
        set.spatial_reference == Some(CANONICAL_REFERENCE)
            && set.features.iter().all(|feature| {
                feature.geometry.spatial_reference.is_wgs84()
                    && !matches!(
                        feature.attribute(&self.timestamps.field),
                        Some(AttributeValue::LocalTime(_))
                    )
            })
    }

    fn normalize_feature(&self, index: usize, feature: &Feature) -> Result<Feature, NormalizeError> {
        let geometry = normalize_geometry(index, &feature.geometry)?;
        let mut properties = feature.properties.clone();
        let universal = match feature.attribute(&self.timestamps.field) {
            Some(AttributeValue::LocalTime(local)) => Some(self.timestamps.to_universal(*local)),
            _ => None,
        };
        if let Some(instant) = universal {
            properties.insert(
                self.timestamps.field.clone(),
                AttributeValue::UniversalTime(instant),
            );
        }
        Ok(Feature::new(geometry, properties))
    }
}

fn normalize_geometry(
    feature: usize,
    geometry: &LineGeometry,
) -> Result<LineGeometry, NormalizeError> {
    let source = geometry.spatial_reference;
    let reproject = if source.is_wgs84() {
        None
    } else if source.is_web_mercator() {
        Some(projection::web_mercator_to_wgs84 as fn(Coord<f64>) -> Coord<f64>)
    } else {
        return Err(NormalizeError::UnsupportedSpatialReference {
            feature,
            reference: source,
        });
    };

    let parts = geometry
        .parts
        .iter()
        .enumerate()
        .map(|(part, positions)| {
            positions
                .iter()
                .enumerate()
                .map(|(vertex, position)| {
                    let location = VertexLocation {
                        feature,
                        part,
                        vertex,
                    };
                    normalize_position(location, position, reproject)
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LineGeometry::new(parts, CANONICAL_REFERENCE))
}

#[derive(Debug, Clone, Copy)]
struct VertexLocation {
    feature: usize,
    part: usize,
    vertex: usize,
}

fn normalize_position(
    at: VertexLocation,
    position: &Position,
    reproject: Option<fn(Coord<f64>) -> Coord<f64>>,
) -> Result<Position, NormalizeError> {
    match position.as_slice() {
        [] => Ok(Vec::new()),
        [_] => Err(NormalizeError::DegeneratePosition {
            feature: at.feature,
            part: at.part,
            vertex: at.vertex,
            components: 1,
        }),
        [x, y, rest @ ..] => {
            if !position.iter().all(|ordinate| ordinate.is_finite()) {
                return Err(NormalizeError::NonFiniteOrdinate {
                    feature: at.feature,
                    part: at.part,
                    vertex: at.vertex,
                });
            }
            let Some(transform) = reproject else {
                return Ok(position.clone());
            };
            let projected = transform(Coord { x: *x, y: *y });
            let mut out = Vec::with_capacity(position.len());
            out.push(projected.x);
            out.push(projected.y);
            out.extend_from_slice(rest);
            Ok(out)
        }
    }
}
