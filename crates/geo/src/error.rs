//! Error types for the geo crate.

use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur during geo operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Location text that is not two numeric values
    #[error("Malformed location: {0}")]
    MalformedInput(String),

    /// Neither `(lat, lon)` nor `(lon, lat)` is in range
    #[error("Neither ordering of ({first}, {second}) is a valid coordinate")]
    Unrecoverable {
        /// First value as written
        first: f64,
        /// Second value as written
        second: f64,
    },

    /// A latitude/longitude pair outside the valid ranges
    #[error("Coordinate out of range: latitude {latitude}, longitude {longitude}")]
    OutOfRange {
        /// Offending latitude
        latitude: f64,
        /// Offending longitude
        longitude: f64,
    },

    /// GeoJSON value that is not a two-element point
    #[error("Invalid GeoJSON point: {0}")]
    InvalidGeoJson(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Error code for integration with nearby-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Malformed location text
    MalformedInput = 10001,
    /// Both orderings out of range
    Unrecoverable = 10002,
    /// Coordinate out of range
    OutOfRange = 10003,
    /// Invalid GeoJSON point
    InvalidGeoJson = 10004,
    /// JSON parsing error
    JsonParsing = 10005,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::MalformedInput(_) => GeoErrorCode::MalformedInput,
            GeoError::Unrecoverable { .. } => GeoErrorCode::Unrecoverable,
            GeoError::OutOfRange { .. } => GeoErrorCode::OutOfRange,
            GeoError::InvalidGeoJson(_) => GeoErrorCode::InvalidGeoJson,
            GeoError::JsonError(_) => GeoErrorCode::JsonParsing,
        }
    }

    /// True for errors that mean "discard the field", never "abort".
    pub fn is_recoverable_by_discard(&self) -> bool {
        matches!(
            self,
            GeoError::MalformedInput(_) | GeoError::Unrecoverable { .. } | GeoError::OutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(GeoError::MalformedInput("x".into()).code() as u32, 10001);
        let err = GeoError::Unrecoverable { first: 200.0, second: 300.0 };
        assert_eq!(err.code(), GeoErrorCode::Unrecoverable);
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn test_discard_classification() {
        assert!(GeoError::MalformedInput("abc".into()).is_recoverable_by_discard());
        assert!(!GeoError::InvalidGeoJson("x".into()).is_recoverable_by_discard());
    }
}
