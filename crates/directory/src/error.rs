//! Error types for the directory crate.

use crate::model::UserId;
use crate::store::StoreError;
use nearby_core::ErrorCode;
use nearby_geo::GeoError;
use std::fmt;
use thiserror::Error;

/// Result type alias for directory operations.
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Why a user's stored location cannot serve as a search origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginProblem {
    /// No location field at all
    NotSet,
    /// Still legacy text; the migration has not run
    NotNormalized,
    /// An object that is not a two-number point
    Malformed,
    /// A point outside the coordinate ranges
    OutOfRange,
}

impl fmt::Display for OriginProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OriginProblem::NotSet => "location is not set",
            OriginProblem::NotNormalized => "location has not been normalized yet",
            OriginProblem::Malformed => "location data is invalid",
            OriginProblem::OutOfRange => "location is out of range",
        };
        f.write_str(text)
    }
}

/// Errors raised by profile, migration and search operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The searching user has no usable stored location
    #[error("No usable location for user {user}: {problem}")]
    NoUsableOrigin {
        /// The user who searched
        user: UserId,
        /// What is wrong with their location
        problem: OriginProblem,
    },

    /// An explicit origin point outside the coordinate ranges
    #[error("Invalid search origin: {0}")]
    InvalidOrigin(#[source] GeoError),

    /// Radius input that is not a non-negative number
    #[error("Invalid radius {0:?}: expected a non-negative number of kilometers")]
    InvalidRadius(String),

    /// No record with this id
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// IP or place lookup produced no usable point
    #[error("Location lookup failed: {0}")]
    LookupFailed(String),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error code for integration with nearby-core error handling.
/// Range: 11xxx for directory errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryErrorCode {
    /// No usable origin
    NoUsableOrigin = 11001,
    /// Invalid explicit origin
    InvalidOrigin = 11002,
    /// Invalid radius
    InvalidRadius = 11003,
    /// Unknown user
    UserNotFound = 11004,
    /// Lookup failure
    LookupFailed = 11005,
    /// Store failure
    Store = 11006,
}

impl DirectoryError {
    /// Returns the error code for this error.
    pub fn code(&self) -> DirectoryErrorCode {
        match self {
            DirectoryError::NoUsableOrigin { .. } => DirectoryErrorCode::NoUsableOrigin,
            DirectoryError::InvalidOrigin(_) => DirectoryErrorCode::InvalidOrigin,
            DirectoryError::InvalidRadius(_) => DirectoryErrorCode::InvalidRadius,
            DirectoryError::UserNotFound(_) => DirectoryErrorCode::UserNotFound,
            DirectoryError::LookupFailed(_) => DirectoryErrorCode::LookupFailed,
            DirectoryError::Store(_) => DirectoryErrorCode::Store,
        }
    }
}

impl From<DirectoryError> for nearby_core::Error {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NoUsableOrigin { user, problem } => {
                nearby_core::Error::no_usable_origin(user, problem)
            }
            DirectoryError::InvalidOrigin(source) => {
                nearby_core::Error::new(ErrorCode::LocationOutOfRange, source.to_string())
                    .with_suggestion("Latitude must be within -90..90 and longitude within -180..180")
            }
            DirectoryError::InvalidRadius(input) => nearby_core::Error::invalid_radius(input),
            DirectoryError::UserNotFound(id) => nearby_core::Error::record_not_found(id),
            DirectoryError::LookupFailed(message) => {
                nearby_core::Error::new(ErrorCode::LookupFailed, message)
            }
            DirectoryError::Store(store) => store.into(),
        }
    }
}
