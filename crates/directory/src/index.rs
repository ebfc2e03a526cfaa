//! Spherical index maintenance.

use crate::error::DirectoryResult;
use crate::model::LocationField;
use crate::store::{Field, FieldUpdate, LocationKind, UserStore};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

/// Outcome of [`ensure_location_index`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Locations removed because the index cannot hold them
    pub stripped: usize,
    /// Removals the store rejected or that found no record
    pub strip_failures: usize,
    pub index_created: bool,
    /// Why the index was not created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Strips locations the spherical index rejects, then builds the index.
///
/// A point is stripped when it is out of range or not a point at all. Index
/// creation failure is logged and reported, never returned as an error.
#[instrument(skip(store))]
pub fn ensure_location_index<S: UserStore + ?Sized>(store: &S) -> DirectoryResult<IndexReport> {
    let mut report = IndexReport {
        stripped: 0,
        strip_failures: 0,
        index_created: false,
        error: None,
    };

    for record in store.find_by_location_kind(LocationKind::Object)? {
        let invalid = match &record.location {
            LocationField::GeoPoint(coord) => !coord.is_valid(),
            LocationField::Malformed(_) => true,
            _ => false,
        };
        if !invalid {
            continue;
        }

        match store.update_fields(&record.id, &FieldUpdate::new().unset_location()) {
            Ok(true) => {
                warn!(user = %record.id, "Removed invalid geo location");
                report.stripped += 1;
            }
            Ok(false) => {
                warn!(user = %record.id, "Record disappeared before its location was removed");
                report.strip_failures += 1;
            }
            Err(err) => {
                warn!(user = %record.id, error = %err, "Failed to remove invalid geo location");
                report.strip_failures += 1;
            }
        }
    }

    match store.create_geo_index(Field::Location) {
        Ok(()) => {
            info!(stripped = report.stripped, "Location index ready");
            report.index_created = true;
        }
        Err(err) => {
            error!(error = %err, "Failed to create location index");
            report.error = Some(err.to_string());
        }
    }

    Ok(report)
}
