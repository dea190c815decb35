//! Strict GeoJSON feature-collection parsing for the traffic feed.
//!
//! Structural problems with the body fail the whole fetch. Problems confined
//! to one feature's geometry or timestamp drop that feature with a log entry.

use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use trafficsync_core::{
    DEFAULT_TIMESTAMP_FIELD, Feature, FeatureSet, FeedError, LineGeometry,
    Position, Properties, SpatialReference,
};

use super::properties::{convert_value, parse_timestamp};

/// Attribute carrying the traffic speed in the Bonn feed.
pub const DEFAULT_SPEED_FIELD: &str = "geschwindigkeit";

const FEATURE_COLLECTION: &str = "FeatureCollection";
const MULTI_LINE_STRING: &str = "MultiLineString";

/// Properties every feed feature must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSchema {
    /// Local evaluation timestamp.
    pub timestamp_field: String,
    /// Speed or classification value.
    pub speed_field: String,
}

impl Default for FeedSchema {
    fn default() -> Self {
        Self {
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_owned(),
            speed_field: DEFAULT_SPEED_FIELD.to_owned(),
        }
    }
}

impl FeedSchema {
    /// Override the timestamp attribute name.
    #[must_use]
    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }

    /// Override the speed attribute name.
    #[must_use]
    pub fn with_speed_field(mut self, field: impl Into<String>) -> Self {
        self.speed_field = field.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Option<Vec<Map<String, Value>>>,
    crs: Option<RawCrs>,
}

/// Pre-RFC 7946 coordinate reference member.
#[derive(Debug, Deserialize)]
struct RawCrs {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl RawCrs {
    fn spatial_reference(&self) -> Option<SpatialReference> {
        match self.kind.as_str() {
            "name" => self
                .properties
                .get("name")
                .and_then(Value::as_str)
                .and_then(SpatialReference::from_crs_name),
            "EPSG" => self
                .properties
                .get("code")
                .and_then(Value::as_u64)
                .and_then(|code| u32::try_from(code).ok())
                .map(SpatialReference::new),
            _ => None,
        }
    }
}

/// Parse a feed body into a [`FeatureSet`].
///
/// Features whose geometry is not a multi-line-string are skipped. The
/// returned set has no declared spatial reference; each feature carries the
/// reference named by the collection's `crs` member, or WGS-84 when absent.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] when the body is empty, is not a GeoJSON
/// feature collection, names an unknown `crs`, or contains a feature with a
/// missing or null geometry. A multi-line-string feature without a properties
/// object or a required property fails the fetch too.
///
/// # Examples
/// ```
/// use trafficsync_data::feed::{FeedSchema, parse_feature_collection};
///
/// let body = r#"{
///     "type": "FeatureCollection",
///     "features": [{
///         "type": "Feature",
///         "geometry": {"type": "MultiLineString", "coordinates": [[[7.1, 50.7], [7.2, 50.8]]]},
///         "properties": {"auswertezeit": "2019-02-12 09:15:00", "geschwindigkeit": 35}
///     }]
/// }"#;
/// let set = parse_feature_collection(body, &FeedSchema::default())?;
/// assert_eq!(set.len(), 1);
/// assert!(set.spatial_reference.is_none());
/// # Ok::<(), trafficsync_core::FeedError>(())
/// ```
pub fn parse_feature_collection(body: &str, schema: &FeedSchema) -> Result<FeatureSet, FeedError> {
    if body.trim().is_empty() {
        return Err(FeedError::parse("feed body is empty"));
    }
    let raw: RawCollection = serde_json::from_str(body)
        .map_err(|err| FeedError::parse(format!("feed body is not valid GeoJSON: {err}")))?;
    if raw.kind != FEATURE_COLLECTION {
        return Err(FeedError::parse(format!(
            "expected a {FEATURE_COLLECTION}, found {}",
            raw.kind
        )));
    }
    let reference = match &raw.crs {
        None => SpatialReference::WGS84,
        Some(crs) => crs.spatial_reference().ok_or_else(|| {
            FeedError::parse(format!("unsupported crs member of type {:?}", crs.kind))
        })?,
    };
    let raw_features = raw
        .features
        .ok_or_else(|| FeedError::parse("feature collection has no features array"))?;

    let mut features = Vec::with_capacity(raw_features.len());
    for (index, raw_feature) in raw_features.iter().enumerate() {
        if let Some(feature) = parse_feature(index, raw_feature, schema, reference)? {
            features.push(feature);
        }
    }
    debug!(
        "parsed {} of {} feed features",
        features.len(),
        raw_features.len()
    );
    Ok(FeatureSet::new(features))
}

fn parse_feature(
    index: usize,
    raw: &Map<String, Value>,
    schema: &FeedSchema,
    reference: SpatialReference,
) -> Result<Option<Feature>, FeedError> {
    let geometry = match raw.get("geometry") {
        None => return Err(FeedError::parse(format!("feature {index} has no geometry"))),
        Some(Value::Null) => {
            return Err(FeedError::parse(format!("feature {index} has a null geometry")));
        }
        Some(geometry) => geometry,
    };
    let geometry_type = geometry.get("type").and_then(Value::as_str).unwrap_or_default();
    if geometry_type != MULTI_LINE_STRING {
        debug!("dropping feature {index}: geometry type {geometry_type:?} is not {MULTI_LINE_STRING}");
        return Ok(None);
    }

    let raw_properties = raw
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| FeedError::parse(format!("feature {index} has no properties object")))?;
    for field in [&schema.timestamp_field, &schema.speed_field] {
        if !raw_properties.contains_key(field.as_str()) {
            return Err(FeedError::parse(format!(
                "feature {index} is missing required property {field:?}"
            )));
        }
    }

    let Some(parts) = decode_parts(geometry.get("coordinates")) else {
        warn!("dropping feature {index}: coordinates are not a multi-line-string");
        return Ok(None);
    };

    let mut properties = Properties::with_capacity(raw_properties.len());
    for (name, value) in raw_properties {
        let converted = if *name == schema.timestamp_field {
            let Some(stamp) = value.as_str().and_then(parse_timestamp) else {
                warn!("dropping feature {index}: unreadable timestamp {value}");
                return Ok(None);
            };
            stamp
        } else {
            convert_value(value)
        };
        properties.insert(name.clone(), converted);
    }

    Ok(Some(Feature::new(
        LineGeometry::new(parts, reference),
        properties,
    )))
}

fn decode_parts(coordinates: Option<&Value>) -> Option<Vec<Vec<Position>>> {
    coordinates.and_then(|value| Vec::<Vec<Position>>::deserialize(value).ok())
}
