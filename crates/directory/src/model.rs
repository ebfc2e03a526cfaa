//! User records and their location field.

use nearby_geo::{parse_geojson_point, Coordinate, GeoJsonPoint, GeoPoint};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque user identifier, owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The `location` field of a stored user, in whatever shape it was found.
///
/// Documents are read as they are, including legacy text and broken points,
/// so that the migration can see and repair them. Writes made through
/// [`crate::store::FieldUpdate`] only ever produce [`LocationField::GeoPoint`]
/// with an in-range coordinate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum LocationField {
    /// Field absent
    #[default]
    Missing,
    /// Legacy `"lat,lon"` text, possibly empty or garbage
    RawText(String),
    /// A GeoJSON point; the coordinate may be out of range
    GeoPoint(Coordinate),
    /// Any other value
    Malformed(Value),
}

impl LocationField {
    /// A location holding a canonical point.
    pub fn point(point: GeoPoint) -> Self {
        LocationField::GeoPoint(point.coordinate())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, LocationField::Missing)
    }

    /// The stored point, if it is present and in range.
    pub fn canonical(&self) -> Option<GeoPoint> {
        match self {
            LocationField::GeoPoint(coord) => GeoPoint::try_from(*coord).ok(),
            _ => None,
        }
    }
}

impl From<Value> for LocationField {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => LocationField::Missing,
            Value::String(text) => LocationField::RawText(text),
            other => match parse_geojson_point(&other) {
                Ok(coord) => LocationField::GeoPoint(coord),
                Err(_) => LocationField::Malformed(other),
            },
        }
    }
}

impl From<LocationField> for Value {
    fn from(field: LocationField) -> Self {
        match field {
            LocationField::Missing => Value::Null,
            LocationField::RawText(text) => Value::String(text),
            LocationField::GeoPoint(coord) => GeoJsonPoint::from_coordinate(&coord).to_value(),
            LocationField::Malformed(value) => value,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A stored user document.
///
/// Keys follow the document layout: `_id`, `username`, `email`, `location`,
/// `canReceiveMessages`, `isHidden`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocationRecord {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "LocationField::is_missing")]
    pub location: LocationField,
    #[serde(default = "default_true")]
    pub can_receive_messages: bool,
    #[serde(default)]
    pub is_hidden: bool,
}

impl UserLocationRecord {
    /// A visible, messageable user without a location.
    pub fn new(id: impl Into<UserId>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            location: LocationField::Missing,
            can_receive_messages: true,
            is_hidden: false,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: LocationField) -> Self {
        self.location = location;
        self
    }
}

/// A user found by a proximity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityResult {
    #[serde(flatten)]
    pub record: UserLocationRecord,
    /// Great-circle distance from the origin in kilometers
    pub distance_km: f64,
}

impl ProximityResult {
    pub fn id(&self) -> &UserId {
        &self.record.id
    }

    pub fn username(&self) -> &str {
        &self.record.username
    }
}
