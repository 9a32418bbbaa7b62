//! Record to GeoJSON Feature conversion.

use super::record::{FieldValue, Record};
use crate::geo::Geometry;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// GeoJSON `type` tag of a single feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureType {
    #[default]
    Feature,
}

/// GeoJSON `type` tag of a feature collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectionType {
    #[default]
    FeatureCollection,
}

/// GeoJSON Feature: `{type: "Feature", geometry, properties}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub geometry: Option<Geometry>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// GeoJSON FeatureCollection with request-specific metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection<M> {
    #[serde(rename = "type")]
    pub kind: CollectionType,
    pub features: Vec<Feature>,
    pub metadata: M,
}

impl<M> FeatureCollection<M> {
    pub fn new(features: Vec<Feature>, metadata: M) -> Self {
        Self {
            kind: CollectionType::FeatureCollection,
            features,
            metadata,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Converts a flat record into a GeoJSON Feature.
///
/// - `geometry_field` is removed and decoded into `Feature.geometry`; it must
///   already hold GeoJSON geometry text (as produced by `make_point`).
/// - `excluded_fields` (raw coordinates) are dropped.
/// - Every remaining field becomes a property via [`FieldValue::to_json`].
///
/// Never fails: an unreadable geometry yields `geometry: null`.
pub fn to_feature(mut record: Record, geometry_field: &str, excluded_fields: &[&str]) -> Feature {
    let geometry = record
        .take(geometry_field)
        .and_then(|value| decode_geometry(geometry_field, value));
    for field in excluded_fields {
        record.take(field);
    }

    let properties = record
        .into_iter()
        .map(|(name, value)| (name, value.to_json()))
        .collect::<Map<String, Value>>();

    Feature {
        kind: FeatureType::Feature,
        geometry,
        properties,
    }
}

fn decode_geometry(field: &str, value: FieldValue) -> Option<Geometry> {
    match value {
        FieldValue::Null => None,
        FieldValue::Text(text) => match serde_json::from_str::<Geometry>(&text) {
            Ok(geometry) => Some(geometry),
            Err(err) => {
                warn!(
                    "event=feature_encode module=feature status=degraded field={} error={}",
                    field, err
                );
                None
            }
        },
        other => {
            warn!(
                "event=feature_encode module=feature status=degraded field={} error=unexpected_kind kind={}",
                field,
                kind_name(&other)
            );
            None
        }
    }
}

fn kind_name(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Null => "null",
        FieldValue::Timestamp(_) => "timestamp",
        FieldValue::Integer(_) => "integer",
        FieldValue::Real(_) => "real",
        FieldValue::Text(_) => "text",
        FieldValue::Boolean(_) => "boolean",
        FieldValue::Other(_) => "other",
    }
}
