//! Road-segment features and the snapshots that carry them.
//!
//! A [`FeatureSet`] is created fresh by every feed fetch, normalized once and
//! handed to the remote layer. Nothing here is persisted between passes.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use geo::{Coord, LineString, MultiLineString};

use crate::SpatialReference;

/// One vertex as published by the feed.
///
/// Mirrors GeoJSON positions: `[x, y]` with optional trailing ordinates. An
/// empty position is the sentinel "empty point" for vertices the feed left
/// blank.
pub type Position = Vec<f64>;

/// Whether `position` is the empty-point sentinel.
#[must_use]
pub fn is_empty_point(position: &[f64]) -> bool {
    position.is_empty()
}

/// A multi-line-string geometry tagged with its spatial reference.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGeometry {
    /// Ordered parts, each an ordered sequence of positions.
    pub parts: Vec<Vec<Position>>,
    /// Reference the positions are expressed in.
    pub spatial_reference: SpatialReference,
}

impl LineGeometry {
    /// Construct a geometry from its parts.
    #[must_use]
    pub fn new(parts: Vec<Vec<Position>>, spatial_reference: SpatialReference) -> Self {
        Self {
            parts,
            spatial_reference,
        }
    }

    /// Total number of positions across all parts, sentinels included.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(Vec::len).sum()
    }

    /// Convert into a [`MultiLineString`], skipping empty points and
    /// ignoring ordinates beyond `x` and `y`.
    ///
    /// Positions with fewer than two ordinates are skipped as well; the
    /// normalizer rejects those before anything reaches a remote layer.
    #[must_use]
    pub fn to_multi_line_string(&self) -> MultiLineString<f64> {
        MultiLineString::new(
            self.parts
                .iter()
                .map(|part| {
                    LineString::new(
                        part.iter()
                            .filter_map(|position| match position.as_slice() {
                                [x, y, ..] => Some(Coord { x: *x, y: *y }),
                                _ => None,
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }
}

/// A single attribute value from a feature's property bag.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// JSON `null`.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Any numeric value.
    Number(f64),
    /// Free text.
    Text(String),
    /// Wall-clock time in the feed's documented local zone.
    LocalTime(NaiveDateTime),
    /// An absolute instant.
    UniversalTime(DateTime<Utc>),
}

impl AttributeValue {
    /// Return the numeric value, if any.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Return the universal instant, if the value carries one.
    #[must_use]
    pub fn as_universal_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::UniversalTime(value) => Some(*value),
            _ => None,
        }
    }
}

/// Open mapping from attribute name to value.
pub type Properties = HashMap<String, AttributeValue>;

/// One traffic-bearing road segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Line geometry of the segment.
    pub geometry: LineGeometry,
    /// Attribute bag, including speed and evaluation timestamp.
    pub properties: Properties,
}

impl Feature {
    /// Construct a feature.
    #[must_use]
    pub const fn new(geometry: LineGeometry, properties: Properties) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    /// Look up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.properties.get(name)
    }
}

/// The full snapshot produced by one feed fetch.
///
/// # Examples
/// ```
/// use trafficsync_core::FeatureSet;
///
/// let set = FeatureSet::default();
/// assert!(set.is_empty());
/// assert_eq!(set.spatial_reference, None);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSet {
    /// Features in feed order.
    pub features: Vec<Feature>,
    /// Declared reference of the whole set; `None` until normalized.
    pub spatial_reference: Option<SpatialReference>,
}

impl FeatureSet {
    /// Construct a set with no declared reference.
    #[must_use]
    pub const fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            spatial_reference: None,
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the set has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
