//! Narrow document-store interface for user records.
//!
//! Only the operations the migration, profile writes and proximity search
//! need are exposed. Two implementations ship with the crate:
//! [`MemoryStore`] and [`JsonFileStore`].

mod file;
mod memory;
#[cfg(test)]
pub(crate) mod testing;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::model::{LocationField, UserId, UserLocationRecord};
use nearby_geo::GeoPoint;
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend cannot be reached or opened
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// I/O error
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document (de)serialization error
    #[error("Store document error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored location the spherical index cannot accept
    #[error("Invalid geometry for user {id}: {reason}")]
    InvalidGeometry { id: UserId, reason: String },

    /// Insert with an id that already exists
    #[error("Duplicate user id: {0}")]
    DuplicateId(UserId),

    /// Index requested on a field that holds no geometry
    #[error("Field {0} cannot carry a spherical index")]
    UnsupportedIndex(&'static str),

    /// A writer panicked while holding the store lock
    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for nearby_core::Error {
    fn from(err: StoreError) -> Self {
        use nearby_core::ErrorCode;

        match &err {
            StoreError::Unavailable(_) | StoreError::Io(_) | StoreError::Poisoned => {
                nearby_core::Error::store_unavailable(err.to_string()).with_source(err)
            }
            StoreError::InvalidGeometry { .. } => {
                nearby_core::Error::new(ErrorCode::InvalidGeometry, err.to_string())
                    .with_suggestion("Run `nearby index` to strip invalid locations first")
                    .with_source(err)
            }
            _ => nearby_core::Error::store(err.to_string()).with_source(err),
        }
    }
}

/// Which stored shape of `location` to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    /// Legacy text
    Text,
    /// Anything else that is present: points and malformed values
    Object,
}

impl LocationKind {
    /// Returns true if `field` has this kind.
    pub fn matches(&self, field: &LocationField) -> bool {
        match (self, field) {
            (_, LocationField::Missing) => false,
            (LocationKind::Text, LocationField::RawText(_)) => true,
            (LocationKind::Text, _) => false,
            (LocationKind::Object, LocationField::RawText(_)) => false,
            (LocationKind::Object, _) => true,
        }
    }
}

/// Writable record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Username,
    Email,
    Location,
    CanReceiveMessages,
    IsHidden,
}

impl Field {
    /// The document key.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Location => "location",
            Field::CanReceiveMessages => "canReceiveMessages",
            Field::IsHidden => "isHidden",
        }
    }
}

/// A set of field writes and removals applied atomically to one record.
///
/// Locations can only be set from a [`GeoPoint`], so nothing written through
/// an update is ever out of range.
///
/// # Example
/// ```
/// use nearby_directory::store::FieldUpdate;
/// use nearby_geo::GeoPoint;
///
/// let update = FieldUpdate::new()
///     .set_username("alice")
///     .set_location(GeoPoint::new(23.81, 90.41).unwrap());
/// assert!(!update.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    username: Option<String>,
    email: Option<String>,
    location: Option<Option<GeoPoint>>,
    can_receive_messages: Option<bool>,
    is_hidden: Option<bool>,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn set_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn set_location(mut self, point: GeoPoint) -> Self {
        self.location = Some(Some(point));
        self
    }

    #[must_use]
    pub fn unset_location(mut self) -> Self {
        self.location = Some(None);
        self
    }

    /// Sets or clears the location in one call.
    #[must_use]
    pub fn replace_location(self, point: Option<GeoPoint>) -> Self {
        match point {
            Some(point) => self.set_location(point),
            None => self.unset_location(),
        }
    }

    #[must_use]
    pub fn set_can_receive_messages(mut self, allowed: bool) -> Self {
        self.can_receive_messages = Some(allowed);
        self
    }

    #[must_use]
    pub fn set_hidden(mut self, hidden: bool) -> Self {
        self.is_hidden = Some(hidden);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.location.is_none()
            && self.can_receive_messages.is_none()
            && self.is_hidden.is_none()
    }

    /// Fields this update writes.
    pub fn set_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.username.is_some() {
            fields.push(Field::Username);
        }
        if self.email.is_some() {
            fields.push(Field::Email);
        }
        if matches!(self.location, Some(Some(_))) {
            fields.push(Field::Location);
        }
        if self.can_receive_messages.is_some() {
            fields.push(Field::CanReceiveMessages);
        }
        if self.is_hidden.is_some() {
            fields.push(Field::IsHidden);
        }
        fields
    }

    /// Fields this update removes.
    pub fn unset_fields(&self) -> Vec<Field> {
        match self.location {
            Some(None) => vec![Field::Location],
            _ => Vec::new(),
        }
    }

    /// Applies the update to an in-memory record.
    pub fn apply(&self, record: &mut UserLocationRecord) {
        if let Some(username) = &self.username {
            record.username.clone_from(username);
        }
        if let Some(email) = &self.email {
            record.email.clone_from(email);
        }
        match self.location {
            Some(Some(point)) => record.location = LocationField::point(point),
            Some(None) => record.location = LocationField::Missing,
            None => {}
        }
        if let Some(allowed) = self.can_receive_messages {
            record.can_receive_messages = allowed;
        }
        if let Some(hidden) = self.is_hidden {
            record.is_hidden = hidden;
        }
    }
}

/// Record selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(UserId),
    Username(String),
    /// Users whose `isHidden` flag is not set
    Visible,
    All,
}

impl UserFilter {
    pub fn matches(&self, record: &UserLocationRecord) -> bool {
        match self {
            UserFilter::Id(id) => &record.id == id,
            UserFilter::Username(name) => &record.username == name,
            UserFilter::Visible => !record.is_hidden,
            UserFilter::All => true,
        }
    }
}

/// One hit of a spherical nearest query.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNearHit {
    pub record: UserLocationRecord,
    /// Distance from the origin in meters
    pub distance_m: f64,
}

/// Storage operations used by the directory.
///
/// Implementations must be safe to share between threads; single-record
/// updates are atomic, nothing else is.
pub trait UserStore: Send + Sync {
    /// Records whose `location` currently has the given kind.
    fn find_by_location_kind(&self, kind: LocationKind) -> StoreResult<Vec<UserLocationRecord>>;

    /// Applies `update` to the record with `id`. Returns false if there is none.
    fn update_fields(&self, id: &UserId, update: &FieldUpdate) -> StoreResult<bool>;

    /// Stores a new record and returns its id.
    ///
    /// A record with an empty id gets a generated one.
    fn insert(&self, record: UserLocationRecord) -> StoreResult<UserId>;

    /// Removes matching records and returns how many were removed.
    fn delete_by_filter(&self, filter: &UserFilter) -> StoreResult<usize>;

    fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<UserLocationRecord>>;

    fn find_many(&self, filter: &UserFilter) -> StoreResult<Vec<UserLocationRecord>>;

    /// Records with an in-range point within `max_distance_m` meters of
    /// `origin`, nearest first.
    fn geo_near(&self, origin: GeoPoint, max_distance_m: f64) -> StoreResult<Vec<GeoNearHit>>;

    /// Builds a spherical index on `field`.
    ///
    /// Fails with [`StoreError::InvalidGeometry`] while any stored location is
    /// malformed or out of range.
    fn create_geo_index(&self, field: Field) -> StoreResult<()>;
}
