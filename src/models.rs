//! GeoJSON data model and associated functions and methods.
//!
//! The model is deliberately shallow: a feature collection is a tagged list of
//! features, each carrying a geometry and an opaque `properties` bag. Only the
//! coordinate sequences are ever interpreted; everything else round-trips
//! through serde untouched.

use serde::{Deserialize, Serialize};

use crate::error::AggregatorError;

/// Type tag of a GeoJSON feature collection.
pub const FEATURE_COLLECTION_TYPE: &str = "FeatureCollection";

/// A single GeoJSON position: longitude, latitude and an optional elevation.
///
/// The position order within a geometry carries temporal meaning for GPS
/// tracks and must be preserved by any processing.
pub type Position = Vec<f64>;

/// A GeoJSON geometry: a type tag (typically "LineString") and an ordered
/// sequence of positions.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Geometry {
    /// Geometry type tag.
    #[serde(rename = "type")]
    pub geometry_type: String,
    /// Ordered coordinate sequence.
    pub coordinates: Vec<Position>,
}

/// A GeoJSON feature.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Feature {
    /// Feature type tag.
    #[serde(rename = "type")]
    pub feature_type: String,
    /// The feature's geometry.
    pub geometry: Geometry,
    /// Opaque metadata. Never interpreted, must round-trip unchanged.
    /// Absent properties stay absent on encode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

/// A GeoJSON feature collection.
///
/// The yearly cumulative track file and each daily backlog file deserialise
/// into this type. Merging is append-only and order-preserving.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FeatureCollection {
    /// Collection type tag.
    #[serde(rename = "type")]
    pub collection_type: String,
    /// Ordered list of features.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Return a new, empty feature collection.
    pub fn new() -> Self {
        Self {
            collection_type: FEATURE_COLLECTION_TYPE.to_string(),
            features: Vec::new(),
        }
    }

    /// Decode a feature collection from GeoJSON text.
    ///
    /// Fails if the text is not a valid JSON document or does not contain a
    /// `features` sequence.
    ///
    /// # Arguments
    ///
    /// * `text`: GeoJSON document text
    pub fn from_geojson(text: &str) -> Result<Self, AggregatorError> {
        serde_json::from_str(text).map_err(AggregatorError::GeoJsonParse)
    }

    /// Encode the feature collection as GeoJSON text.
    pub fn to_geojson(&self) -> Result<String, AggregatorError> {
        serde_json::to_string(self).map_err(AggregatorError::GeoJsonSerialise)
    }

    /// Append all features of `other` to this collection, preserving order.
    ///
    /// # Arguments
    ///
    /// * `other`: The collection to drain features from
    pub fn append(&mut self, other: &mut FeatureCollection) {
        self.features.append(&mut other.features);
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}
