//! User location records, location migration and proximity search.
//!
//! The pieces, leaves first:
//!
//! - [`store`]: the narrow document-store interface plus in-memory and JSON
//!   file implementations
//! - [`normalizer`]: the idempotent batch repair of stored locations
//! - [`index`]: geometry clean-up before building the spherical index
//! - [`profile`]: the profile write path, which validates locations the same way
//! - [`proximity`]: radius search with distance bounds, sort modes and
//!   self-exclusion
//! - [`refresh`]: a cancellable periodic re-search with at most one search in
//!   flight
//! - [`lookup`]: response shapes of IP and place-name lookups used as origins
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use nearby_directory::prelude::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! let profiles = ProfileService::new(store.as_ref());
//! let me = profiles.register(NewProfile::new("me", "me@example.com").with_location("23.81,90.41"))?;
//! profiles.register(NewProfile::new("near", "near@example.com").with_location("90.42,23.81"))?;
//!
//! let engine = ProximityEngine::new(Arc::clone(&store));
//! let results = engine.search(&SearchOrigin::User(me), &SearchOptions::with_radius(10.0))?;
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].record.username, "near");
//! # Ok::<(), nearby_directory::DirectoryError>(())
//! ```

pub mod error;
pub mod index;
pub mod lookup;
pub mod model;
pub mod normalizer;
pub mod profile;
pub mod proximity;
pub mod refresh;
pub mod store;

pub use error::{DirectoryError, DirectoryErrorCode, DirectoryResult, OriginProblem};
pub use model::{LocationField, ProximityResult, UserId, UserLocationRecord};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{DirectoryError, DirectoryResult, OriginProblem};
    pub use crate::index::{ensure_location_index, IndexReport};
    pub use crate::lookup::{first_place, IpLookupResponse, PlaceCandidate};
    pub use crate::model::{LocationField, ProximityResult, UserId, UserLocationRecord};
    pub use crate::normalizer::{LocationNormalizer, MigrationReport};
    pub use crate::profile::{LocationChange, NewProfile, ProfileService, ProfileUpdate};
    pub use crate::proximity::{
        parse_radius, DistanceBounds, ProximityEngine, SearchOptions, SearchOrigin, SortMode,
    };
    pub use crate::refresh::{LiveRefresh, RefreshOutcome};
    pub use crate::store::{
        FieldUpdate, JsonFileStore, LocationKind, MemoryStore, StoreError, UserFilter, UserStore,
    };
    pub use nearby_geo::GeoPoint;
}
