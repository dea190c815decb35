use thiserror::Error;

use crate::{ErrorKind, SpatialReference};

/// Errors from [`crate::Normalizer::normalize`].
///
/// All variants abort normalization of the whole set and are reported as
/// [`ErrorKind::Geometry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// A position carried a single ordinate and cannot form a coordinate pair.
    #[error(
        "feature {feature} part {part} vertex {vertex} has {components} ordinate(s); \
         expected none or at least two"
    )]
    DegeneratePosition {
        /// Index of the feature within the set.
        feature: usize,
        /// Index of the part within the feature.
        part: usize,
        /// Index of the vertex within the part.
        vertex: usize,
        /// Number of ordinates found.
        components: usize,
    },
    /// A position contained `NaN` or an infinite ordinate.
    #[error("feature {feature} part {part} vertex {vertex} has a non-finite ordinate")]
    NonFiniteOrdinate {
        /// Index of the feature within the set.
        feature: usize,
        /// Index of the part within the feature.
        part: usize,
        /// Index of the vertex within the part.
        vertex: usize,
    },
    /// The feature's source reference cannot be reprojected to WGS-84.
    #[error("feature {feature} uses unsupported spatial reference {reference}")]
    UnsupportedSpatialReference {
        /// Index of the feature within the set.
        feature: usize,
        /// The offending reference.
        reference: SpatialReference,
    },
}

impl NormalizeError {
    /// Classification used in pass results.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Geometry
    }
}
