//! User store persisted as a JSON array of documents.

use super::{
    Field, FieldUpdate, GeoNearHit, LocationKind, MemoryStore, StoreError, StoreResult,
    UserFilter, UserStore,
};
use crate::model::{UserId, UserLocationRecord};
use nearby_geo::GeoPoint;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// A [`MemoryStore`] loaded from and written back to one JSON file.
///
/// Every successful mutation rewrites the whole file through a temporary file
/// in the same directory, so readers never see a half-written store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    flush_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str::<Vec<UserLocationRecord>>(&content)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(StoreError::Unavailable(format!(
                    "cannot read {}: {err}",
                    path.display()
                )))
            }
        };

        debug!(path = %path.display(), records = records.len(), "Opened user store");

        Ok(Self {
            path,
            inner: MemoryStore::from_records(records),
            flush_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of every record, in file order.
    pub fn snapshot(&self) -> StoreResult<Vec<UserLocationRecord>> {
        self.inner.snapshot()
    }

    /// Runs `mutate` and writes the file if it reports a change.
    ///
    /// When the write fails the in-memory records are put back, so memory
    /// never holds a change the file does not.
    fn mutate<T>(
        &self,
        mutate: impl FnOnce(&MemoryStore) -> StoreResult<T>,
        changed: impl FnOnce(&T) -> bool,
    ) -> StoreResult<T> {
        let _guard = self.flush_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let before = self.inner.snapshot()?;
        let outcome = mutate(&self.inner)?;
        if changed(&outcome) {
            if let Err(err) = self.flush() {
                warn!(path = %self.path.display(), error = %err, "Write failed, change rolled back");
                self.inner.restore(before)?;
                return Err(err);
            }
        }
        Ok(outcome)
    }

    fn flush(&self) -> StoreResult<()> {
        let records = self.inner.snapshot()?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, &records)?;
        file.write_all(b"\n")?;
        file.persist(&self.path).map_err(|err| StoreError::Io(err.error))?;

        debug!(path = %self.path.display(), records = records.len(), "Flushed user store");
        Ok(())
    }
}

impl UserStore for JsonFileStore {
    fn find_by_location_kind(&self, kind: LocationKind) -> StoreResult<Vec<UserLocationRecord>> {
        self.inner.find_by_location_kind(kind)
    }

    fn update_fields(&self, id: &UserId, update: &FieldUpdate) -> StoreResult<bool> {
        self.mutate(|store| store.update_fields(id, update), |updated| *updated)
    }

    fn insert(&self, record: UserLocationRecord) -> StoreResult<UserId> {
        self.mutate(|store| store.insert(record), |_| true)
    }

    fn delete_by_filter(&self, filter: &UserFilter) -> StoreResult<usize> {
        self.mutate(|store| store.delete_by_filter(filter), |removed| *removed > 0)
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

    /// Checks that every stored location can be indexed.
    ///
    /// The index itself lives in memory and is rebuilt on demand.
    fn create_geo_index(&self, field: Field) -> StoreResult<()> {
        self.inner.create_geo_index(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocationField;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("users.json")).unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_mutations_are_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");

        let store = JsonFileStore::open(&path).unwrap();
        let id = store
            .insert(UserLocationRecord::new("", "alice", "a@example.com"))
            .unwrap();
        let point = GeoPoint::new(23.81, 90.41).unwrap();
        assert!(store.update_fields(&id, &FieldUpdate::new().set_location(point)).unwrap());

        let reopened = JsonFileStore::open(&path).unwrap();
        let record = reopened.find_one(&UserFilter::Id(id)).unwrap().unwrap();
        assert_eq!(record.location.canonical(), Some(point));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["location"]["coordinates"][0], 90.41);
    }

    #[test]
    fn test_reads_legacy_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"[
                {"_id": "a", "username": "a", "email": "a@x", "location": "90.41,23.81"},
                {"_id": "b", "username": "b", "email": "b@x", "location": {"type": "Point", "coordinates": [1]}}
            ]"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let records = store.snapshot().unwrap();
        assert_eq!(records[0].location, LocationField::RawText("90.41,23.81".into()));
        assert!(matches!(records[1].location, LocationField::Malformed(_)));
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        let path = data.join("users.json");

        let store = JsonFileStore::open(&path).unwrap();
        let id = store
            .insert(UserLocationRecord::new("alice", "alice", "a@example.com"))
            .unwrap();

        std::fs::remove_dir_all(&data).unwrap();
        let point = GeoPoint::new(23.81, 90.41).unwrap();
        let err = store
            .update_fields(&id, &FieldUpdate::new().set_location(point))
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        let record = store.find_one(&UserFilter::Id(id.clone())).unwrap().unwrap();
        assert!(record.location.is_missing());

        std::fs::create_dir(&data).unwrap();
        store
            .insert(UserLocationRecord::new("bob", "bob", "b@example.com"))
            .unwrap();

        let reopened = JsonFileStore::open(&path).unwrap().snapshot().unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened[0].location.is_missing());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Json(_))));
    }
}
