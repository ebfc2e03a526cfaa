//! Store wrapper that fails chosen operations.

use super::{
    Field, FieldUpdate, GeoNearHit, LocationKind, MemoryStore, StoreError, StoreResult,
    UserFilter, UserStore,
};
use crate::model::{UserId, UserLocationRecord};
use nearby_geo::GeoPoint;
use std::collections::HashSet;

/// A [`MemoryStore`] that rejects writes to some ids, reports others as gone,
/// and can refuse to build the index.
pub(crate) struct FaultyStore {
    inner: MemoryStore,
    rejected: HashSet<UserId>,
    vanished: HashSet<UserId>,
    index_fails: bool,
}

impl FaultyStore {
    pub(crate) fn new(records: Vec<UserLocationRecord>) -> Self {
        Self {
            inner: MemoryStore::from_records(records),
            rejected: HashSet::new(),
            vanished: HashSet::new(),
            index_fails: false,
        }
    }

    /// `update_fields` on `id` returns an error.
    pub(crate) fn reject_writes_to(mut self, id: &str) -> Self {
        self.rejected.insert(UserId::new(id));
        self
    }

    /// `update_fields` on `id` matches nothing.
    pub(crate) fn vanish(mut self, id: &str) -> Self {
        self.vanished.insert(UserId::new(id));
        self
    }

    pub(crate) fn fail_index(mut self) -> Self {
        self.index_fails = true;
        self
    }

    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl UserStore for FaultyStore {
    fn find_by_location_kind(&self, kind: LocationKind) -> StoreResult<Vec<UserLocationRecord>> {
        self.inner.find_by_location_kind(kind)
    }

    fn update_fields(&self, id: &UserId, update: &FieldUpdate) -> StoreResult<bool> {
        if self.rejected.contains(id) {
            return Err(StoreError::Unavailable(format!("write to {id} rejected")));
        }
        if self.vanished.contains(id) {
            return Ok(false);
        }
        self.inner.update_fields(id, update)
    }

    fn insert(&self, record: UserLocationRecord) -> StoreResult<UserId> {
        self.inner.insert(record)
    }

    fn delete_by_filter(&self, filter: &UserFilter) -> StoreResult<usize> {
        self.inner.delete_by_filter(filter)
    }

    fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<UserLocationRecord>> {
        self.inner.find_one(filter)
    }

    fn find_many(&self, filter: &UserFilter) -> StoreResult<Vec<UserLocationRecord>> {
        self.inner.find_many(filter)
    }

    fn geo_near(&self, origin: GeoPoint, max_distance_m: f64) -> StoreResult<Vec<GeoNearHit>> {
        self.inner.geo_near(origin, max_distance_m)
    }

    fn create_geo_index(&self, field: Field) -> StoreResult<()> {
        if self.index_fails {
            return Err(StoreError::Unavailable("index build interrupted".into()));
        }
        self.inner.create_geo_index(field)
    }
}
