//! Classification and repair of coordinate candidates.
//!
//! Stored locations drifted over time: some are `"lat,lon"` text, some were
//! written longitude first, some hold values no ordering can explain. Every
//! function here is pure; callers decide what to persist.

use crate::{is_latitude, is_longitude, Coordinate, GeoError, GeoPoint, Result};

/// Outcome of classifying two numeric candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// The pair was already `(latitude, longitude)`.
    AsGiven(GeoPoint),
    /// The pair was `(longitude, latitude)` and has been swapped back.
    Swapped(GeoPoint),
    /// Neither ordering is in range.
    Unrecoverable,
}

impl Classification {
    /// The canonical point, if any ordering worked.
    pub fn point(self) -> Option<GeoPoint> {
        match self {
            Classification::AsGiven(point) | Classification::Swapped(point) => Some(point),
            Classification::Unrecoverable => None,
        }
    }

    /// True when the candidates had to be swapped.
    pub fn is_swapped(&self) -> bool {
        matches!(self, Classification::Swapped(_))
    }
}

/// Decides which of `first` and `second` is the latitude.
///
/// `(first, second)` read as `(lat, lon)` wins whenever it is in range, even if
/// the swapped reading would be in range too.
///
/// # Example
/// ```
/// use nearby_geo::{classify, Classification};
///
/// let swapped = classify(95.0, 40.0);
/// assert!(swapped.is_swapped());
/// assert_eq!(swapped.point().unwrap().latitude(), 40.0);
///
/// assert_eq!(classify(200.0, 300.0), Classification::Unrecoverable);
/// ```
pub fn classify(first: f64, second: f64) -> Classification {
    if is_latitude(first) && is_longitude(second) {
        Classification::AsGiven(GeoPoint::from_valid(first, second))
    } else if is_longitude(first) && is_latitude(second) {
        Classification::Swapped(GeoPoint::from_valid(second, first))
    } else {
        Classification::Unrecoverable
    }
}

/// Parses legacy `"<num>,<num>"` location text into a canonical point.
///
/// Exactly two comma-separated numeric tokens are required; surrounding
/// whitespace is ignored.
pub fn parse_location_text(text: &str) -> Result<GeoPoint> {
    if text.trim().is_empty() {
        return Err(GeoError::MalformedInput("empty location".into()));
    }

    let tokens: Vec<&str> = text.split(',').map(str::trim).collect();
    let [first, second] = tokens.as_slice() else {
        return Err(GeoError::MalformedInput(format!(
            "expected 2 comma-separated values, got {}",
            tokens.len()
        )));
    };

    let first = parse_token(first)?;
    let second = parse_token(second)?;

    classify(first, second)
        .point()
        .ok_or(GeoError::Unrecoverable { first, second })
}

fn parse_token(token: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| GeoError::MalformedInput(format!("not a number: {token:?}")))
}

/// Outcome of checking a stored geo-point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointRepair {
    /// Already in range; nothing to write.
    Valid(GeoPoint),
    /// Out of range, but exchanging latitude and longitude fixes it.
    Swapped(GeoPoint),
    /// Out of range in both orders.
    Unrecoverable,
}

/// Checks a stored point and tries a single swap when it is out of range.
pub fn repair_point(stored: Coordinate) -> PointRepair {
    if stored.is_valid() {
        return PointRepair::Valid(GeoPoint::from_valid(stored.latitude, stored.longitude));
    }

    let swapped = stored.swapped();
    if swapped.is_valid() {
        PointRepair::Swapped(GeoPoint::from_valid(swapped.latitude, swapped.longitude))
    } else {
        PointRepair::Unrecoverable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lat_lon_order_kept() {
        let result = classify(23.81, 90.41);
        assert!(matches!(result, Classification::AsGiven(_)));
        let point = result.point().unwrap();
        assert_eq!(point.latitude(), 23.81);
        assert_eq!(point.longitude(), 90.41);
    }

    #[test]
    fn test_swapped_order_detected() {
        let point = parse_location_text("95,40").unwrap();
        assert_eq!(point.latitude(), 40.0);
        assert_eq!(point.longitude(), 95.0);
    }

    #[test]
    fn test_both_orders_valid_prefers_lat_first() {
        let point = classify(40.0, 50.0).point().unwrap();
        assert_eq!(point.latitude(), 40.0);
        assert_eq!(point.longitude(), 50.0);
    }

    #[test]
    fn test_out_of_range_both_ways() {
        assert_eq!(classify(200.0, 300.0), Classification::Unrecoverable);
        let err = parse_location_text("200,300").unwrap_err();
        assert!(matches!(err, GeoError::Unrecoverable { .. }));
    }

    #[test]
    fn test_non_numeric_token() {
        let err = parse_location_text("abc,12").unwrap_err();
        assert!(matches!(err, GeoError::MalformedInput(_)));
    }

    #[test]
    fn test_token_count() {
        assert!(matches!(parse_location_text("12"), Err(GeoError::MalformedInput(_))));
        assert!(matches!(parse_location_text("1,2,3"), Err(GeoError::MalformedInput(_))));
        assert!(matches!(parse_location_text("1,2,"), Err(GeoError::MalformedInput(_))));
    }

    #[test]
    fn test_blank_input() {
        assert!(matches!(parse_location_text(""), Err(GeoError::MalformedInput(_))));
        assert!(matches!(parse_location_text("   "), Err(GeoError::MalformedInput(_))));
    }

    #[test]
    fn test_whitespace_trimmed() {
        let point = parse_location_text("  -33.86 ,  151.21 ").unwrap();
        assert_eq!(point.latitude(), -33.86);
        assert_eq!(point.longitude(), 151.21);
    }

    #[test]
    fn test_nan_is_unrecoverable() {
        assert_eq!(classify(f64::NAN, 10.0), Classification::Unrecoverable);
        assert!(parse_location_text("NaN,10").is_err());
    }

    #[test]
    fn test_repair_valid_point_untouched() {
        let stored = Coordinate::new(23.81, 90.41);
        assert!(matches!(repair_point(stored), PointRepair::Valid(p) if p.coordinate() == stored));
    }

    #[test]
    fn test_repair_swaps_once() {
        // Stored as latitude 120 / longitude 45; only the swapped reading is valid.
        let repaired = repair_point(Coordinate::new(120.0, 45.0));
        match repaired {
            PointRepair::Swapped(point) => {
                assert_eq!(point.latitude(), 45.0);
                assert_eq!(point.longitude(), 120.0);
            }
            other => panic!("expected swap, got {other:?}"),
        }
    }

    #[test]
    fn test_repair_unrecoverable() {
        assert_eq!(repair_point(Coordinate::new(100.0, 200.0)), PointRepair::Unrecoverable);
    }

    proptest! {
        #[test]
        fn classified_points_are_always_in_range(a in -400.0f64..400.0, b in -400.0f64..400.0) {
            if let Some(point) = classify(a, b).point() {
                prop_assert!(point.coordinate().is_valid());
            }
        }

        #[test]
        fn parsed_text_is_in_range_or_rejected(a in -400.0f64..400.0, b in -400.0f64..400.0) {
            match parse_location_text(&format!("{a},{b}")) {
                Ok(point) => prop_assert!(point.coordinate().is_valid()),
                Err(err) => prop_assert!(err.is_recoverable_by_discard()),
            }
        }

        #[test]
        fn repaired_points_are_in_range(lat in -400.0f64..400.0, lon in -400.0f64..400.0) {
            match repair_point(Coordinate::new(lat, lon)) {
                PointRepair::Valid(p) | PointRepair::Swapped(p) => prop_assert!(p.coordinate().is_valid()),
                PointRepair::Unrecoverable => {}
            }
        }
    }
}
