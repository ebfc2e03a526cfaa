//! Batch repair of stored user locations.
//!
//! Two passes over the store:
//!
//! 1. legacy `"lat,lon"` text is parsed, ordered and written back as a point,
//!    or removed when it cannot be read;
//! 2. stored points that are out of range get one swap attempt, otherwise the
//!    location is removed. Objects that are not points are removed too.
//!
//! Running it again on a migrated store changes nothing.

use crate::error::DirectoryResult;
use crate::model::{LocationField, UserId};
use crate::store::{FieldUpdate, LocationKind, UserStore};
use chrono::{DateTime, Utc};
use nearby_geo::{parse_location_text, repair_point, Coordinate, GeoPoint, PointRepair};
use nearby_telemetry::Timer;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Counters of one migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Locations rewritten as a canonical point
    pub fixed: usize,
    /// Locations removed as unrecoverable
    pub removed: usize,
    /// Points already in range
    pub already_ok: usize,
    /// Writes the store rejected; the record keeps its old value
    pub failed: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MigrationReport {
    fn start(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            fixed: 0,
            removed: 0,
            already_ok: 0,
            failed: 0,
            dry_run,
            started_at: now,
            finished_at: now,
        }
    }

    /// Records examined in total.
    pub fn total(&self) -> usize {
        self.fixed + self.removed + self.already_ok + self.failed
    }

    /// True when the run found nothing to change.
    pub fn is_clean(&self) -> bool {
        self.fixed == 0 && self.removed == 0 && self.failed == 0
    }
}

enum Action {
    Keep,
    Set(GeoPoint),
    Unset,
}

/// Normalizes every stored location to a canonical point or removes it.
pub struct LocationNormalizer<'a, S: UserStore + ?Sized> {
    store: &'a S,
    dry_run: bool,
}

impl<'a, S: UserStore + ?Sized> LocationNormalizer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            dry_run: false,
        }
    }

    /// Computes the report without writing anything.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs both passes.
    ///
    /// Only failing to read the store aborts the run; a rejected write is
    /// logged, counted as failed and the run moves on.
    #[instrument(skip(self), fields(dry_run = self.dry_run))]
    pub fn run(&self) -> DirectoryResult<MigrationReport> {
        let _timer = Timer::start("nearby.migration.duration_ms");
        let mut report = MigrationReport::start(self.dry_run);
        info!(dry_run = self.dry_run, "Normalizing stored locations");

        let mut rewritten = HashSet::new();
        for record in self.store.find_by_location_kind(LocationKind::Text)? {
            let LocationField::RawText(text) = &record.location else {
                continue;
            };
            let action = plan_text(&record.id, text);
            if !matches!(action, Action::Keep) {
                rewritten.insert(record.id.clone());
            }
            self.apply(&record.id, action, &mut report);
        }

        for record in self.store.find_by_location_kind(LocationKind::Object)? {
            if rewritten.contains(&record.id) {
                continue;
            }
            let action = match &record.location {
                LocationField::GeoPoint(coord) => plan_point(&record.id, *coord),
                LocationField::Malformed(value) => {
                    debug!(user = %record.id, value = %value, "Location is not a point");
                    Action::Unset
                }
                _ => continue,
            };
            self.apply(&record.id, action, &mut report);
        }

        report.finished_at = Utc::now();
        metrics::counter!("nearby.migration.fixed").increment(report.fixed as u64);
        metrics::counter!("nearby.migration.removed").increment(report.removed as u64);
        metrics::counter!("nearby.migration.failed").increment(report.failed as u64);

        info!(
            fixed = report.fixed,
            removed = report.removed,
            already_ok = report.already_ok,
            failed = report.failed,
            dry_run = self.dry_run,
            "Location normalization finished"
        );

        Ok(report)
    }

    fn apply(&self, id: &UserId, action: Action, report: &mut MigrationReport) {
        match action {
            Action::Keep => report.already_ok += 1,
            Action::Set(point) => {
                if self.write(id, FieldUpdate::new().set_location(point)) {
                    report.fixed += 1;
                } else {
                    report.failed += 1;
                }
            }
            Action::Unset => {
                if self.write(id, FieldUpdate::new().unset_location()) {
                    report.removed += 1;
                } else {
                    report.failed += 1;
                }
            }
        }
    }

    fn write(&self, id: &UserId, update: FieldUpdate) -> bool {
        if self.dry_run {
            return true;
        }

        match self.store.update_fields(id, &update) {
            Ok(true) => true,
            Ok(false) => {
                warn!(user = %id, "Record disappeared during migration");
                false
            }
            Err(err) => {
                warn!(user = %id, error = %err, "Failed to write location");
                false
            }
        }
    }
}

fn plan_text(id: &UserId, text: &str) -> Action {
    match parse_location_text(text) {
        Ok(point) => {
            debug!(user = %id, text, point = %point, "Parsed location text");
            Action::Set(point)
        }
        Err(err) => {
            debug!(user = %id, text, error = %err, "Discarding unreadable location text");
            Action::Unset
        }
    }
}

fn plan_point(id: &UserId, stored: Coordinate) -> Action {
    match repair_point(stored) {
        PointRepair::Valid(_) => Action::Keep,
        PointRepair::Swapped(point) => {
            debug!(user = %id, point = %point, "Swapped latitude and longitude");
            Action::Set(point)
        }
        PointRepair::Unrecoverable => {
            debug!(
                user = %id,
                latitude = stored.latitude,
                longitude = stored.longitude,
                "Discarding out-of-range point"
            );
            Action::Unset
        }
    }
}
