//! Migrate and index commands

use super::Context;
use nearby_cli::output::Status;
use nearby_cli::progress;
use nearby_core::Result;
use nearby_directory::index::{ensure_location_index, IndexReport};
use nearby_directory::normalizer::{LocationNormalizer, MigrationReport};
use serde_json::json;

/// Normalize stored locations, then build the index unless told otherwise.
pub fn run(ctx: &Context, dry_run: bool, no_index: bool) -> Result<()> {
    let store = ctx.open_store()?;

    let spinner = (!ctx.json()).then(|| progress::spinner("Normalizing locations..."));
    let report = match LocationNormalizer::new(&store).dry_run(dry_run).run() {
        Ok(report) => {
            if let Some(pb) = &spinner {
                progress::finish_success(pb, "Locations normalized");
            }
            report
        }
        Err(err) => {
            if let Some(pb) = &spinner {
                progress::finish_error(pb, "Migration failed");
            }
            return Err(err.into());
        }
    };

    let build_index = !dry_run && !no_index && ctx.config.schema.migration.ensure_index;
    let index = if build_index {
        Some(ensure_location_index(&store)?)
    } else {
        None
    };

    if ctx.json() {
        return ctx.print_json(&json!({ "migration": report, "index": index }));
    }

    print_migration(&report);
    if let Some(index) = &index {
        print_index(index);
    }
    Ok(())
}

/// Strip invalid locations and build the index.
pub fn run_index(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let report = ensure_location_index(&store)?;

    if ctx.json() {
        return ctx.print_json(&report);
    }
    print_index(&report);
    Ok(())
}

fn print_migration(report: &MigrationReport) {
    let title = if report.dry_run {
        "Location migration (dry run)"
    } else {
        "Location migration"
    };
    Status::header(title);
    Status::counter("Fixed", report.fixed);
    Status::counter("Removed", report.removed);
    Status::counter("Already OK", report.already_ok);
    if report.failed > 0 {
        Status::counter("Failed", report.failed);
        Status::warning("Some records could not be written; run the migration again");
    }

    let elapsed = report.finished_at - report.started_at;
    if report.dry_run {
        Status::info("Dry run: nothing was written");
    } else if report.is_clean() {
        Status::success("All stored locations were already canonical");
    } else {
        Status::success(&format!(
            "Migrated {} locations in {} ms",
            report.fixed + report.removed,
            elapsed.num_milliseconds()
        ));
    }
}

fn print_index(report: &IndexReport) {
    if report.stripped > 0 {
        Status::info(&format!(
            "Removed {} invalid locations before indexing",
            report.stripped
        ));
    }
    if report.strip_failures > 0 {
        Status::warning(&format!(
            "{} invalid locations could not be removed",
            report.strip_failures
        ));
    }
    match (&report.index_created, &report.error) {
        (true, _) => Status::success("Location index ready"),
        (false, Some(error)) => Status::warning(&format!("Location index not created: {error}")),
        (false, None) => Status::warning("Location index not created"),
    }
}
