//! Geospatial primitives for Nearby.
//!
//! This crate provides:
//! - Raw and canonical coordinate types
//! - Classification and repair of legacy `"lat,lon"` inputs
//! - Haversine distance calculations
//! - GeoJSON point encoding (longitude first)
//! - Batch radius queries with optional parallelism
//!
//! # Example
//!
//! ```
//! use nearby_geo::{haversine_distance, parse_location_text, Coordinate};
//!
//! // Longitude written first: the validator swaps it back.
//! let dhaka = parse_location_text("90.41, 23.81").unwrap();
//! assert_eq!(dhaka.latitude(), 23.81);
//!
//! let chittagong = Coordinate::new(22.3569, 91.7832);
//! let distance_km = haversine_distance(&dhaka.coordinate(), &chittagong);
//! assert!((distance_km - 214.0).abs() < 10.0);
//! ```

mod error;
mod geojson;
mod haversine;
pub mod batch;
pub mod validator;

pub use batch::{calculate_distances, within_radius_m, DistanceResult, LocationItem};
pub use error::{GeoError, GeoErrorCode, Result};
pub use geojson::{parse_geojson_point, GeoJsonPoint};
pub use haversine::{haversine_distance, haversine_distance_meters, EARTH_RADIUS_KM, EARTH_RADIUS_M};
pub use validator::{classify, parse_location_text, repair_point, Classification, PointRepair};

/// Returns true if `value` is a latitude in degrees (-90 to 90).
///
/// NaN and infinities are never in range.
#[inline]
pub fn is_latitude(value: f64) -> bool {
    (-90.0..=90.0).contains(&value)
}

/// Returns true if `value` is a longitude in degrees (-180 to 180).
#[inline]
pub fn is_longitude(value: f64) -> bool {
    (-180.0..=180.0).contains(&value)
}

/// A geographic coordinate as stored, which may be out of range.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90 when valid)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180 when valid)
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate without validating it.
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Returns true if both components are in range.
    #[inline]
    pub fn is_valid(&self) -> bool {
        is_latitude(self.latitude) && is_longitude(self.longitude)
    }

    /// The same pair with latitude and longitude exchanged.
    #[inline]
    pub fn swapped(&self) -> Self {
        Self::new(self.longitude, self.latitude)
    }

    /// Converts degrees to radians for internal calculations.
    #[inline]
    pub(crate) fn to_radians(&self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

/// A canonical geo-point.
///
/// Both components are guaranteed to be in range; the only ways to obtain one
/// are [`GeoPoint::new`], [`TryFrom<Coordinate>`] and the validator.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Coordinate", into = "Coordinate")]
pub struct GeoPoint(Coordinate);

impl GeoPoint {
    /// Creates a canonical point, rejecting out-of-range components.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        Self::try_from(Coordinate::new(latitude, longitude))
    }

    /// Wraps a pair the caller has already range-checked.
    #[inline]
    pub(crate) fn from_valid(latitude: f64, longitude: f64) -> Self {
        debug_assert!(is_latitude(latitude) && is_longitude(longitude));
        Self(Coordinate::new(latitude, longitude))
    }

    /// Latitude in degrees.
    #[inline]
    pub fn latitude(&self) -> f64 {
        self.0.latitude
    }

    /// Longitude in degrees.
    #[inline]
    pub fn longitude(&self) -> f64 {
        self.0.longitude
    }

    /// The underlying coordinate.
    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        self.0
    }
}

impl TryFrom<Coordinate> for GeoPoint {
    type Error = GeoError;

    fn try_from(coord: Coordinate) -> Result<Self> {
        if coord.is_valid() {
            Ok(Self(coord))
        } else {
            Err(GeoError::OutOfRange {
                latitude: coord.latitude,
                longitude: coord.longitude,
            })
        }
    }
}

impl From<GeoPoint> for Coordinate {
    fn from(point: GeoPoint) -> Self {
        point.0
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude(), self.longitude())
    }
}
