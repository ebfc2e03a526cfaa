//! Response shapes of the lookups that can center a search.
//!
//! An IP geolocation service answers `{"status", "lat", "lon", "message"}`;
//! a place-name search answers a list of candidates whose `lat`/`lon` may be
//! numbers or numeric strings. Both end up as a canonical [`GeoPoint`].

use crate::error::{DirectoryError, DirectoryResult};
use nearby_geo::GeoPoint;
use serde::{Deserialize, Deserializer};

/// Answer of an IP geolocation lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IpLookupResponse {
    pub status: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl IpLookupResponse {
    /// The located point. Only a `"success"` status with both coordinates
    /// counts.
    pub fn origin(&self) -> DirectoryResult<GeoPoint> {
        if self.status != "success" {
            let reason = self.message.as_deref().unwrap_or("unknown error");
            return Err(DirectoryError::LookupFailed(format!(
                "IP lookup returned {}: {reason}",
                self.status
            )));
        }

        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => GeoPoint::new(lat, lon)
                .map_err(|err| DirectoryError::LookupFailed(format!("IP lookup: {err}"))),
            _ => Err(DirectoryError::LookupFailed(
                "IP lookup succeeded without coordinates".into(),
            )),
        }
    }
}

/// One result of a place-name search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceCandidate {
    #[serde(deserialize_with = "number_or_string")]
    pub lat: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub lon: f64,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// The first candidate of a place search as a search origin.
///
/// # Example
/// ```
/// use nearby_directory::lookup::{first_place, PlaceCandidate};
///
/// let candidates: Vec<PlaceCandidate> =
///     serde_json::from_str(r#"[{"lat": "23.8103", "lon": "90.4125"}]"#).unwrap();
/// let origin = first_place(&candidates).unwrap();
/// assert_eq!(origin.latitude(), 23.8103);
/// ```
pub fn first_place(candidates: &[PlaceCandidate]) -> DirectoryResult<GeoPoint> {
    let first = candidates
        .first()
        .ok_or_else(|| DirectoryError::LookupFailed("no place matched".into()))?;

    GeoPoint::new(first.lat, first.lon)
        .map_err(|err| DirectoryError::LookupFailed(format!("place search: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_lookup_success() {
        let response: IpLookupResponse =
            serde_json::from_str(r#"{"status": "success", "lat": 23.81, "lon": 90.41}"#).unwrap();
        let origin = response.origin().unwrap();
        assert_eq!(origin.latitude(), 23.81);
        assert_eq!(origin.longitude(), 90.41);
    }

    #[test]
    fn test_ip_lookup_failure_carries_message() {
        let response: IpLookupResponse =
            serde_json::from_str(r#"{"status": "fail", "message": "private range"}"#).unwrap();
        let err = response.origin().unwrap_err();
        assert!(err.to_string().contains("private range"));
    }

    #[test]
    fn test_ip_lookup_out_of_range() {
        let response: IpLookupResponse =
            serde_json::from_str(r#"{"status": "success", "lat": 123.0, "lon": 10.0}"#).unwrap();
        assert!(matches!(response.origin(), Err(DirectoryError::LookupFailed(_))));
    }

    #[test]
    fn test_place_candidates_accept_numbers_and_strings() {
        let candidates: Vec<PlaceCandidate> = serde_json::from_str(
            r#"[{"lat": 52.52, "lon": "13.405", "display_name": "Berlin"}, {"lat": "0", "lon": "0"}]"#,
        )
        .unwrap();
        assert_eq!(candidates[0].lon, 13.405);
        assert_eq!(first_place(&candidates).unwrap().latitude(), 52.52);
    }

    #[test]
    fn test_no_place() {
        assert!(matches!(first_place(&[]), Err(DirectoryError::LookupFailed(_))));
    }

    #[test]
    fn test_non_numeric_place_is_rejected() {
        let parsed = serde_json::from_str::<Vec<PlaceCandidate>>(r#"[{"lat": "north", "lon": "1"}]"#);
        assert!(parsed.is_err());
    }
}
