//! Form-field encoding for `applyEdits`.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use trafficsync_core::{AttributeValue, Feature, FeatureSet, RemoteError, RemoteObjectId};

/// Layout of wall-clock values that were never resolved to an instant.
const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Serialize)]
struct SpatialReferenceWire {
    wkid: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PolylineWire {
    paths: Vec<Vec<[f64; 2]>>,
    spatial_reference: SpatialReferenceWire,
}

#[derive(Debug, Serialize)]
struct AddWire {
    geometry: PolylineWire,
    attributes: Map<String, Value>,
}

/// Encode ids for the `deletes` field.
pub(crate) fn encode_deletes(ids: &[RemoteObjectId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Encode features for the `adds` field.
///
/// Only `x` and `y` are sent. Empty points and parts left without vertices
/// are dropped.
pub(crate) fn encode_adds(features: &FeatureSet) -> Result<String, RemoteError> {
    let adds: Vec<AddWire> = features.features.iter().map(add_wire).collect();
    serde_json::to_string(&adds).map_err(|err| RemoteError::Encode {
        message: err.to_string(),
    })
}

fn add_wire(feature: &Feature) -> AddWire {
    let paths = feature
        .geometry
        .parts
        .iter()
        .map(|part| {
            part.iter()
                .filter_map(|position| match position.as_slice() {
                    [x, y, ..] => Some([*x, *y]),
                    _ => None,
                })
                .collect::<Vec<_>>()
        })
        .filter(|path| !path.is_empty())
        .collect();
    let attributes = feature
        .properties
        .iter()
        .map(|(name, value)| (name.clone(), attribute_value(value)))
        .collect();
    AddWire {
        geometry: PolylineWire {
            paths,
            spatial_reference: SpatialReferenceWire {
                wkid: feature.geometry.spatial_reference.wkid(),
            },
        },
        attributes,
    }
}

fn attribute_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::Number(number) => Number::from_f64(*number).map_or(Value::Null, Value::Number),
        AttributeValue::Text(text) => Value::String(text.clone()),
        AttributeValue::LocalTime(local) => Value::String(local.format(LOCAL_TIME_FORMAT).to_string()),
        AttributeValue::UniversalTime(instant) => Value::from(instant.timestamp_millis()),
    }
}
