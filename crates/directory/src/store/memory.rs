//! In-memory user store.

use super::{
    Field, FieldUpdate, GeoNearHit, LocationKind, StoreError, StoreResult, UserFilter, UserStore,
};
use crate::model::{LocationField, UserId, UserLocationRecord};
use nearby_geo::{within_radius_m, GeoPoint, LocationItem};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// User store backed by a vector behind a read-write lock.
///
/// Records keep insertion order, which makes equal-distance hits come back in
/// a stable order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<UserLocationRecord>>,
    geo_indexed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `records`, ids taken as given.
    pub fn from_records(records: Vec<UserLocationRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            geo_indexed: AtomicBool::new(false),
        }
    }

    /// A copy of every record, in insertion order.
    pub fn snapshot(&self) -> StoreResult<Vec<UserLocationRecord>> {
        Ok(self.read()?.clone())
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Replaces every record, keeping the index flag.
    pub(super) fn restore(&self, records: Vec<UserLocationRecord>) -> StoreResult<()> {
        *self.write()? = records;
        Ok(())
    }

    /// True once a spherical index has been built on `location`.
    pub fn has_geo_index(&self) -> bool {
        self.geo_indexed.load(Ordering::Acquire)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<UserLocationRecord>>> {
        self.records.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<UserLocationRecord>>> {
        self.records.write().map_err(|_| StoreError::Poisoned)
    }
}

fn geometry_problem(record: &UserLocationRecord) -> Option<String> {
    match &record.location {
        LocationField::GeoPoint(coord) if !coord.is_valid() => Some(format!(
            "point ({}, {}) is out of range",
            coord.latitude, coord.longitude
        )),
        LocationField::Malformed(value) => Some(format!("not a GeoJSON point: {value}")),
        _ => None,
    }
}

impl UserStore for MemoryStore {
    fn find_by_location_kind(&self, kind: LocationKind) -> StoreResult<Vec<UserLocationRecord>> {
        Ok(self
            .read()?
            .iter()
            .filter(|record| kind.matches(&record.location))
            .cloned()
            .collect())
    }

    fn update_fields(&self, id: &UserId, update: &FieldUpdate) -> StoreResult<bool> {
        let mut records = self.write()?;
        match records.iter_mut().find(|record| &record.id == id) {
            Some(record) => {
                update.apply(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert(&self, mut record: UserLocationRecord) -> StoreResult<UserId> {
        let mut records = self.write()?;
        if record.id.is_empty() {
            record.id = UserId::generate();
        } else if records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }

        let id = record.id.clone();
        records.push(record);
        Ok(id)
    }

    fn delete_by_filter(&self, filter: &UserFilter) -> StoreResult<usize> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|record| !filter.matches(record));
        Ok(before - records.len())
    }

    fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<UserLocationRecord>> {
        Ok(self.read()?.iter().find(|record| filter.matches(record)).cloned())
    }

    fn find_many(&self, filter: &UserFilter) -> StoreResult<Vec<UserLocationRecord>> {
        Ok(self
            .read()?
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn geo_near(&self, origin: GeoPoint, max_distance_m: f64) -> StoreResult<Vec<GeoNearHit>> {
        let records = self.read()?;
        let items: Vec<LocationItem<usize>> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| match &record.location {
                LocationField::GeoPoint(coord) => Some(LocationItem::new(index, *coord)),
                _ => None,
            })
            .collect();

        Ok(within_radius_m(&origin.coordinate(), &items, max_distance_m)
            .into_iter()
            .map(|hit| GeoNearHit {
                record: records[hit.key].clone(),
                distance_m: hit.distance,
            })
            .collect())
    }

    fn create_geo_index(&self, field: Field) -> StoreResult<()> {
        if field != Field::Location {
            return Err(StoreError::UnsupportedIndex(field.key()));
        }

        let records = self.read()?;
        if let Some((record, reason)) = records
            .iter()
            .find_map(|record| geometry_problem(record).map(|reason| (record, reason)))
        {
            return Err(StoreError::InvalidGeometry {
                id: record.id.clone(),
                reason,
            });
        }

        self.geo_indexed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearby_geo::Coordinate;

    fn user(id: &str, location: LocationField) -> UserLocationRecord {
        UserLocationRecord::new(id, id, format!("{id}@example.com")).with_location(location)
    }

    fn at(lat: f64, lon: f64) -> LocationField {
        LocationField::point(GeoPoint::new(lat, lon).unwrap())
    }

    #[test]
    fn test_insert_generates_id() {
        let store = MemoryStore::new();
        let id = store.insert(UserLocationRecord::new("", "alice", "a@example.com")).unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.find_one(&UserFilter::Id(id)).unwrap().unwrap().username, "alice");
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let store = MemoryStore::new();
        store.insert(user("u1", LocationField::Missing)).unwrap();
        let err = store.insert(user("u1", LocationField::Missing)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(_)));
    }

    #[test]
    fn test_update_missing_record() {
        let store = MemoryStore::new();
        let updated = store
            .update_fields(&UserId::new("ghost"), &FieldUpdate::new().set_hidden(true))
            .unwrap();
        assert!(!updated);
    }

    #[test]
    fn test_find_by_location_kind() {
        let store = MemoryStore::from_records(vec![
            user("text", LocationField::RawText("1,2".into())),
            user("point", at(1.0, 2.0)),
            user("none", LocationField::Missing),
        ]);

        let text = store.find_by_location_kind(LocationKind::Text).unwrap();
        assert_eq!(text.len(), 1);
        assert_eq!(text[0].id.as_str(), "text");

        let objects = store.find_by_location_kind(LocationKind::Object).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id.as_str(), "point");
    }

    #[test]
    fn test_geo_near_orders_and_filters() {
        let store = MemoryStore::from_records(vec![
            user("far", at(23.95, 90.41)),
            user("near", at(23.82, 90.41)),
            user("text", LocationField::RawText("23.81,90.41".into())),
            user("broken", LocationField::GeoPoint(Coordinate::new(95.0, 40.0))),
            user("away", at(0.0, 0.0)),
        ]);

        let origin = GeoPoint::new(23.81, 90.41).unwrap();
        let hits = store.geo_near(origin, 20_000.0).unwrap();
        let ids: Vec<&str> = hits.iter().map(|hit| hit.record.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert!(hits[0].distance_m < hits[1].distance_m);
    }

    #[test]
    fn test_delete_by_filter() {
        let store = MemoryStore::from_records(vec![
            user("u1", LocationField::Missing),
            user("u2", LocationField::Missing),
        ]);
        assert_eq!(store.delete_by_filter(&UserFilter::Id(UserId::new("u1"))).unwrap(), 1);
        assert_eq!(store.delete_by_filter(&UserFilter::Id(UserId::new("u1"))).unwrap(), 0);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_geo_index_requires_clean_geometry() {
        let store = MemoryStore::from_records(vec![
            user("ok", at(1.0, 2.0)),
            user("bad", LocationField::GeoPoint(Coordinate::new(200.0, 300.0))),
        ]);

        let err = store.create_geo_index(Field::Location).unwrap_err();
        assert!(matches!(err, StoreError::InvalidGeometry { ref id, .. } if id.as_str() == "bad"));
        assert!(!store.has_geo_index());

        store.delete_by_filter(&UserFilter::Id(UserId::new("bad"))).unwrap();
        store.create_geo_index(Field::Location).unwrap();
        assert!(store.has_geo_index());
    }

    #[test]
    fn test_geo_index_on_other_field() {
        let store = MemoryStore::new();
        let err = store.create_geo_index(Field::Email).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedIndex("email")));
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let writer = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = writer.records.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(StoreError::Poisoned)));
        assert!(matches!(store.is_empty(), Err(StoreError::Poisoned)));
        assert!(matches!(store.snapshot(), Err(StoreError::Poisoned)));
    }
}
