//! GeoJSON point encoding.
//!
//! Points are stored the way spherical geo indexes expect them:
//! `{"type": "Point", "coordinates": [longitude, latitude]}`.

use crate::{Coordinate, GeoError, Result};
use serde::{Deserialize, Serialize};

/// GeoJSON Point format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoJsonPoint {
    /// Should be "Point"
    #[serde(rename = "type")]
    pub point_type: Option<String>,
    /// [longitude, latitude] array
    pub coordinates: [f64; 2],
}

impl GeoJsonPoint {
    /// Encodes a coordinate, longitude first.
    pub fn from_coordinate(coord: &Coordinate) -> Self {
        Self {
            point_type: Some("Point".to_string()),
            coordinates: [coord.longitude, coord.latitude],
        }
    }

    /// Decodes back into latitude/longitude order.
    pub fn to_coordinate(&self) -> Coordinate {
        let [lng, lat] = self.coordinates;
        Coordinate::new(lat, lng)
    }

    /// The point as a JSON value, ready to be written to a document.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.point_type.as_deref().unwrap_or("Point"),
            "coordinates": self.coordinates,
        })
    }
}

/// Parse a GeoJSON point from a JSON value.
///
/// The value must be an object whose `coordinates` array holds exactly two
/// numbers; a `type` member, when present, must be `"Point"`. Range is not
/// checked here: stored points may be out of range and are repaired elsewhere.
///
/// # Example
/// ```
/// use nearby_geo::parse_geojson_point;
/// use serde_json::json;
///
/// let value = json!({"type": "Point", "coordinates": [90.41, 23.81]});
/// let coord = parse_geojson_point(&value).unwrap();
/// assert!((coord.latitude - 23.81).abs() < 0.0001);
///
/// assert!(parse_geojson_point(&json!({"coordinates": [1.0]})).is_err());
/// ```
pub fn parse_geojson_point(value: &serde_json::Value) -> Result<Coordinate> {
    let object = value
        .as_object()
        .ok_or_else(|| GeoError::InvalidGeoJson(format!("expected an object, got {value}")))?;

    if let Some(kind) = object.get("type") {
        if kind.as_str() != Some("Point") {
            return Err(GeoError::InvalidGeoJson(format!("expected type Point, got {kind}")));
        }
    }

    let coords = object
        .get("coordinates")
        .and_then(|c| c.as_array())
        .ok_or_else(|| GeoError::InvalidGeoJson("missing coordinates array".into()))?;

    if coords.len() != 2 {
        return Err(GeoError::InvalidGeoJson(format!(
            "expected 2 coordinates, got {}",
            coords.len()
        )));
    }

    let lng = coords[0]
        .as_f64()
        .ok_or_else(|| GeoError::InvalidGeoJson(format!("invalid longitude: {}", coords[0])))?;
    let lat = coords[1]
        .as_f64()
        .ok_or_else(|| GeoError::InvalidGeoJson(format!("invalid latitude: {}", coords[1])))?;

    Ok(Coordinate::new(lat, lng))
}
