//! Profile writes and lookups.
//!
//! Locations typed by users go through the same validator as the migration:
//! an unreadable location is dropped from the write, never stored as text.

use crate::error::{DirectoryError, DirectoryResult};
use crate::model::{LocationField, UserId, UserLocationRecord};
use crate::store::{FieldUpdate, UserFilter, UserStore};
use nearby_geo::{parse_location_text, repair_point, GeoPoint, PointRepair};
use tracing::{debug, info, instrument};

/// Input for [`ProfileService::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub username: String,
    pub email: String,
    /// Legacy `"lat,lon"` text as typed
    pub location: Option<String>,
}

impl NewProfile {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// What [`ProfileService::update_profile`] does with the stored location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocationChange {
    /// Leave it as stored; legacy text and flipped points are repaired in place
    #[default]
    Keep,
    /// Replace it with typed `"lat,lon"` text; unreadable text removes it
    Set(String),
    /// Remove it
    Clear,
}

impl From<Option<String>> for LocationChange {
    fn from(text: Option<String>) -> Self {
        match text {
            Some(text) => Self::Set(text),
            None => Self::Clear,
        }
    }
}

/// Input for [`ProfileService::update_profile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub location: LocationChange,
}

/// Profile operations over a [`UserStore`].
pub struct ProfileService<'a, S: UserStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: UserStore + ?Sized> ProfileService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Creates a visible, messageable user.
    #[instrument(skip(self, profile), fields(username = %profile.username))]
    pub fn register(&self, profile: NewProfile) -> DirectoryResult<UserId> {
        let mut record = UserLocationRecord::new("", profile.username, profile.email);
        if let Some(point) = location_from_text(profile.location.as_deref()) {
            record.location = LocationField::point(point);
        }

        let id = self.store.insert(record)?;
        info!(user = %id, "Registered user");
        Ok(id)
    }

    /// Replaces username and email, and applies the location change, in one write.
    ///
    /// A stored location is only ever removed by [`LocationChange::Clear`] or
    /// by unreadable [`LocationChange::Set`] text.
    pub fn update_profile(&self, id: &UserId, profile: ProfileUpdate) -> DirectoryResult<()> {
        let update = FieldUpdate::new()
            .set_username(profile.username)
            .set_email(profile.email);
        let update = match profile.location {
            LocationChange::Keep => match repaired_location(&self.get(id)?.location) {
                Some(point) => update.set_location(point),
                None => update,
            },
            LocationChange::Set(text) => {
                update.replace_location(location_from_text(Some(text.as_str())))
            }
            LocationChange::Clear => update.unset_location(),
        };
        self.update(id, &update)
    }

    /// Hides or shows the user in listings.
    pub fn set_hidden(&self, id: &UserId, hidden: bool) -> DirectoryResult<()> {
        self.update(id, &FieldUpdate::new().set_hidden(hidden))
    }

    pub fn set_message_preference(&self, id: &UserId, allowed: bool) -> DirectoryResult<()> {
        self.update(id, &FieldUpdate::new().set_can_receive_messages(allowed))
    }

    pub fn delete(&self, id: &UserId) -> DirectoryResult<()> {
        match self.store.delete_by_filter(&UserFilter::Id(id.clone()))? {
            0 => Err(DirectoryError::UserNotFound(id.clone())),
            _ => {
                info!(user = %id, "Deleted user");
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &UserId) -> DirectoryResult<UserLocationRecord> {
        self.store
            .find_one(&UserFilter::Id(id.clone()))?
            .ok_or_else(|| DirectoryError::UserNotFound(id.clone()))
    }

    pub fn find_by_username(&self, username: &str) -> DirectoryResult<Option<UserLocationRecord>> {
        Ok(self.store.find_one(&UserFilter::Username(username.to_string()))?)
    }

    /// Every user not hidden from listings, except `viewer`.
    pub fn discoverable_users(&self, viewer: &UserId) -> DirectoryResult<Vec<UserLocationRecord>> {
        let mut users = self.store.find_many(&UserFilter::Visible)?;
        users.retain(|user| &user.id != viewer);
        Ok(users)
    }

    fn update(&self, id: &UserId, update: &FieldUpdate) -> DirectoryResult<()> {
        if self.store.update_fields(id, update)? {
            debug!(user = %id, fields = ?update.set_fields(), unset = ?update.unset_fields(), "Updated user");
            Ok(())
        } else {
            Err(DirectoryError::UserNotFound(id.clone()))
        }
    }
}

fn location_from_text(text: Option<&str>) -> Option<GeoPoint> {
    let text = text.filter(|text| !text.trim().is_empty())?;
    match parse_location_text(text) {
        Ok(point) => Some(point),
        Err(err) => {
            debug!(text, error = %err, "Dropping unreadable location");
            None
        }
    }
}

/// The canonical point for a stored location the normalizer would rewrite.
fn repaired_location(location: &LocationField) -> Option<GeoPoint> {
    match location {
        LocationField::RawText(text) => parse_location_text(text).ok(),
        LocationField::GeoPoint(coord) => match repair_point(*coord) {
            PointRepair::Swapped(point) => Some(point),
            PointRepair::Valid(_) | PointRepair::Unrecoverable => None,
        },
        LocationField::Missing | LocationField::Malformed(_) => None,
    }
}
