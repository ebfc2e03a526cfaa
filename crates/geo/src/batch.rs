//! Batch distance calculations with optional parallelism.
//!
//! Backs the in-memory spherical nearest query: distances from one origin to
//! many keyed locations, optionally cut at a radius and ordered nearest first.

use crate::{haversine_distance, haversine_distance_meters, Coordinate};
use serde::{Deserialize, Serialize};

/// Result of a distance calculation for a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult<K> {
    /// The item key
    pub key: K,
    /// Calculated distance (Infinity if the location is out of range)
    pub distance: f64,
}

/// Input item for batch distance calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationItem<K> {
    /// Item key
    pub key: K,
    /// Stored location
    pub location: Coordinate,
}

impl<K> LocationItem<K> {
    /// Creates a new item.
    pub fn new(key: K, location: Coordinate) -> Self {
        Self { key, location }
    }
}

/// Calculate distances in kilometers from `origin` to every item.
///
/// Output order matches input order.
///
/// # Example
/// ```
/// use nearby_geo::{calculate_distances, Coordinate, LocationItem};
///
/// let items = vec![
///     LocationItem::new("dhaka", Coordinate::new(23.81, 90.41)),
///     LocationItem::new("broken", Coordinate::new(123.0, 400.0)),
/// ];
///
/// let results = calculate_distances(&Coordinate::new(23.81, 90.41), &items);
/// assert_eq!(results.len(), 2);
/// assert!(results[1].distance.is_infinite());
/// ```
pub fn calculate_distances<K>(origin: &Coordinate, items: &[LocationItem<K>]) -> Vec<DistanceResult<K>>
where
    K: Clone + Send + Sync,
{
    map_items(items, |item| single_distance(origin, item, haversine_distance))
}

/// Items within `max_distance_m` meters of `origin`, nearest first.
///
/// The sort is stable, so items at equal distance keep their input order.
pub fn within_radius_m<K>(
    origin: &Coordinate,
    items: &[LocationItem<K>],
    max_distance_m: f64,
) -> Vec<DistanceResult<K>>
where
    K: Clone + Send + Sync,
{
    let mut results = map_items(items, |item| {
        single_distance(origin, item, haversine_distance_meters)
    });

    results.retain(|r| r.distance <= max_distance_m);
    results.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    results
}

fn map_items<K, F>(items: &[LocationItem<K>], f: F) -> Vec<DistanceResult<K>>
where
    K: Clone + Send + Sync,
    F: Fn(&LocationItem<K>) -> DistanceResult<K> + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        items.par_iter().map(f).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        items.iter().map(f).collect()
    }
}

#[inline]
fn single_distance<K: Clone>(
    origin: &Coordinate,
    item: &LocationItem<K>,
    metric: fn(&Coordinate, &Coordinate) -> f64,
) -> DistanceResult<K> {
    let distance = if item.location.is_valid() {
        metric(origin, &item.location)
    } else {
        f64::INFINITY
    };

    DistanceResult {
        key: item.key.clone(),
        distance,
    }
}
