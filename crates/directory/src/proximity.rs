//! Proximity search.
//!
//! The store answers "who is within this radius, nearest first"; everything
//! after that (distance bounds, ordering, dropping the searching user) happens
//! here, in that order.

use crate::error::{DirectoryError, DirectoryResult, OriginProblem};
use crate::model::{LocationField, ProximityResult, UserId, UserLocationRecord};
use crate::store::{UserFilter, UserStore};
use nearby_geo::GeoPoint;
use nearby_telemetry::Timer;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Radius used when none is given.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Optional distance window applied to search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceBounds {
    pub min_km: Option<f64>,
    pub max_km: Option<f64>,
}

impl DistanceBounds {
    pub fn new(min_km: Option<f64>, max_km: Option<f64>) -> Self {
        Self { min_km, max_km }
    }

    /// Reads bounds from form input. Blank or unreadable text means no bound.
    ///
    /// # Example
    /// ```
    /// use nearby_directory::proximity::DistanceBounds;
    ///
    /// let bounds = DistanceBounds::parse(Some(" 2 "), Some("five"));
    /// assert_eq!(bounds, DistanceBounds::new(Some(2.0), None));
    /// ```
    pub fn parse(min_text: Option<&str>, max_text: Option<&str>) -> Self {
        Self::new(parse_bound(min_text), parse_bound(max_text))
    }

    /// True if `distance_km` lies inside the window, bounds included.
    pub fn contains(&self, distance_km: f64) -> bool {
        self.min_km.is_none_or(|min| distance_km >= min)
            && self.max_km.is_none_or(|max| distance_km <= max)
    }
}

fn parse_bound(text: Option<&str>) -> Option<f64> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .and_then(|text| text.parse::<f64>().ok())
        .filter(|value| !value.is_nan())
}

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    DistanceAsc,
    DistanceDesc,
    /// Username A-Z, ignoring case
    NameAsc,
    /// Username Z-A, ignoring case
    NameDesc,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [
        SortMode::DistanceAsc,
        SortMode::DistanceDesc,
        SortMode::NameAsc,
        SortMode::NameDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::DistanceAsc => "distance-asc",
            SortMode::DistanceDesc => "distance-desc",
            SortMode::NameAsc => "name-asc",
            SortMode::NameDesc => "name-desc",
        }
    }

    fn compare(&self, a: &ProximityResult, b: &ProximityResult) -> Ordering {
        match self {
            SortMode::DistanceAsc => a.distance_km.total_cmp(&b.distance_km),
            SortMode::DistanceDesc => b.distance_km.total_cmp(&a.distance_km),
            SortMode::NameAsc => cmp_ignore_case(a.username(), b.username()),
            SortMode::NameDesc => cmp_ignore_case(b.username(), a.username()),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown sort mode name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown sort mode {0:?} (expected distance-asc, distance-desc, name-asc or name-desc)")]
pub struct ParseSortModeError(String);

impl FromStr for SortMode {
    type Err = ParseSortModeError;

    /// Accepts `distance-asc` style names as well as the labels shown to
    /// users, such as `Distance Asc` and `Name A-Z`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "distanceasc" | "distance" => Ok(SortMode::DistanceAsc),
            "distancedesc" => Ok(SortMode::DistanceDesc),
            "nameasc" | "nameaz" | "name" => Ok(SortMode::NameAsc),
            "namedesc" | "nameza" => Ok(SortMode::NameDesc),
            _ => Err(ParseSortModeError(s.to_string())),
        }
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Stable sort of `results` by `mode`.
pub fn sort_results(results: &mut [ProximityResult], mode: SortMode) {
    results.sort_by(|a, b| mode.compare(a, b));
}

/// Reads a radius in kilometers from user input.
///
/// # Example
/// ```
/// use nearby_directory::proximity::parse_radius;
///
/// assert_eq!(parse_radius(" 7.5 ").unwrap(), 7.5);
/// assert!(parse_radius("ten").is_err());
/// assert!(parse_radius("-1").is_err());
/// ```
pub fn parse_radius(text: &str) -> DirectoryResult<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|radius| check_radius(*radius))
        .ok_or_else(|| DirectoryError::InvalidRadius(text.to_string()))
}

fn check_radius(radius_km: f64) -> bool {
    radius_km.is_finite() && radius_km >= 0.0
}

/// Parameters of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub radius_km: f64,
    #[serde(default)]
    pub bounds: DistanceBounds,
    #[serde(default)]
    pub sort: SortMode,
}

impl SearchOptions {
    pub fn with_radius(radius_km: f64) -> Self {
        Self {
            radius_km,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn bounds(mut self, bounds: DistanceBounds) -> Self {
        self.bounds = bounds;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            bounds: DistanceBounds::default(),
            sort: SortMode::default(),
        }
    }
}

/// Where a search is centered.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOrigin {
    /// A user's stored location; that user is left out of the results.
    User(UserId),
    /// An explicit point, e.g. from an IP lookup, a place search or a map.
    Point {
        point: GeoPoint,
        exclude: Option<UserId>,
    },
}

impl SearchOrigin {
    fn excluded(&self) -> Option<&UserId> {
        match self {
            SearchOrigin::User(id) => Some(id),
            SearchOrigin::Point { exclude, .. } => exclude.as_ref(),
        }
    }
}

/// The usable search origin of a stored record.
pub fn origin_of(record: &UserLocationRecord) -> Result<GeoPoint, OriginProblem> {
    match &record.location {
        LocationField::Missing => Err(OriginProblem::NotSet),
        LocationField::RawText(_) => Err(OriginProblem::NotNormalized),
        LocationField::Malformed(_) => Err(OriginProblem::Malformed),
        LocationField::GeoPoint(coord) => {
            GeoPoint::try_from(*coord).map_err(|_| OriginProblem::OutOfRange)
        }
    }
}

/// Bounds, sorts and drops `exclude`, in that order.
pub fn refine(
    results: Vec<ProximityResult>,
    options: &SearchOptions,
    exclude: Option<&UserId>,
) -> Vec<ProximityResult> {
    let mut kept: Vec<ProximityResult> = results
        .into_iter()
        .filter(|result| options.bounds.contains(result.distance_km))
        .collect();
    sort_results(&mut kept, options.sort);
    if let Some(id) = exclude {
        kept.retain(|result| result.id() != id);
    }
    kept
}

/// Radius search over a shared store.
pub struct ProximityEngine<S: UserStore + ?Sized> {
    store: Arc<S>,
}

impl<S: UserStore + ?Sized> Clone for ProximityEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: UserStore + ?Sized> ProximityEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every user with a location within `radius_km` of the origin, nearest
    /// first. Nobody is excluded, including a user standing on the origin.
    pub fn find_within_radius(
        &self,
        origin_lat: f64,
        origin_lon: f64,
        radius_km: f64,
    ) -> DirectoryResult<Vec<ProximityResult>> {
        let origin = GeoPoint::new(origin_lat, origin_lon).map_err(DirectoryError::InvalidOrigin)?;
        self.find_within_radius_of(origin, radius_km)
    }

    /// [`find_within_radius`](Self::find_within_radius) from a canonical point.
    pub fn find_within_radius_of(
        &self,
        origin: GeoPoint,
        radius_km: f64,
    ) -> DirectoryResult<Vec<ProximityResult>> {
        if !check_radius(radius_km) {
            return Err(DirectoryError::InvalidRadius(radius_km.to_string()));
        }

        let hits = self.store.geo_near(origin, radius_km * 1000.0)?;
        Ok(hits
            .into_iter()
            .map(|hit| ProximityResult {
                record: hit.record,
                distance_km: hit.distance_m / 1000.0,
            })
            .collect())
    }

    /// Full search: resolve the origin, query, bound, sort, self-exclude.
    #[instrument(level = "debug", skip(self, options))]
    pub fn search(
        &self,
        origin: &SearchOrigin,
        options: &SearchOptions,
    ) -> DirectoryResult<Vec<ProximityResult>> {
        let _timer = Timer::start("nearby.search.duration_ms");

        let point = match origin {
            SearchOrigin::User(id) => self.user_origin(id)?,
            SearchOrigin::Point { point, .. } => *point,
        };

        let found = self.find_within_radius_of(point, options.radius_km)?;
        let found_count = found.len();
        let results = refine(found, options, origin.excluded());

        metrics::counter!("nearby.search.requests").increment(1);
        debug!(
            origin = %point,
            radius_km = options.radius_km,
            sort = %options.sort,
            found = found_count,
            returned = results.len(),
            "Proximity search"
        );

        Ok(results)
    }

    fn user_origin(&self, id: &UserId) -> DirectoryResult<GeoPoint> {
        let user = self
            .store
            .find_one(&UserFilter::Id(id.clone()))?
            .ok_or_else(|| DirectoryError::UserNotFound(id.clone()))?;

        origin_of(&user).map_err(|problem| DirectoryError::NoUsableOrigin {
            user: id.clone(),
            problem,
        })
    }
}
