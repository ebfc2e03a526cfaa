//! Watch command: live refresh of a user's search

use super::search::{render, FilterArgs};
use super::Context;
use nearby_cli::output::Status;
use nearby_core::Result;
use nearby_directory::prelude::*;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Re-run the search every interval until Ctrl-C or `rounds` refreshes.
pub fn run(
    ctx: &Context,
    user: &str,
    filters: &FilterArgs,
    interval: Option<u64>,
    rounds: Option<u64>,
) -> Result<()> {
    let options = filters.options(&ctx.config.schema)?;
    let secs = interval.unwrap_or(ctx.config.schema.refresh.interval_secs).max(1);
    let period = Duration::from_secs(secs);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if !ctx.json() {
        Status::info(&format!("Refreshing every {secs}s, press Ctrl-C to stop"));
    }

    runtime.block_on(watch(
        ctx,
        ctx.store_path().to_path_buf(),
        UserId::new(user),
        options,
        period,
        rounds,
    ))
}

async fn watch(
    ctx: &Context,
    store_path: PathBuf,
    user: UserId,
    options: SearchOptions,
    period: Duration,
    rounds: Option<u64>,
) -> Result<()> {
    let origin = SearchOrigin::User(user);
    let rendered_options = options.clone();

    // Reopened on every tick so changes written by other processes show up.
    let (refresh, mut outcomes) = LiveRefresh::spawn(period, options, move |options| {
        let store = Arc::new(JsonFileStore::open(&store_path)?);
        ProximityEngine::new(store).search(&origin, options)
    });

    let mut delivered = 0u64;
    let outcome = loop {
        tokio::select! {
            next = outcomes.recv() => match next {
                Some(RefreshOutcome { sequence, result: Ok(results) }) => {
                    if let Err(err) = show(ctx, sequence, &results, &rendered_options) {
                        break Err(err);
                    }
                    delivered += 1;
                    if rounds.is_some_and(|limit| delivered >= limit) {
                        break Ok(());
                    }
                }
                Some(RefreshOutcome { result: Err(err), .. }) if is_fatal(&err) => {
                    break Err(err.into());
                }
                Some(RefreshOutcome { sequence, result: Err(err) }) => {
                    warn!(sequence, error = %err, "Refresh failed");
                    Status::warning(&format!("Refresh #{sequence} failed: {err}"));
                }
                None => break Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                if !ctx.json() {
                    Status::info("Stopped");
                }
                break Ok(());
            }
        }
    };

    refresh.shutdown().await;
    outcome
}

/// Errors that no later refresh can fix.
fn is_fatal(err: &DirectoryError) -> bool {
    matches!(
        err,
        DirectoryError::NoUsableOrigin { .. }
            | DirectoryError::UserNotFound(_)
            | DirectoryError::InvalidRadius(_)
    )
}

fn show(
    ctx: &Context,
    sequence: u64,
    results: &[ProximityResult],
    options: &SearchOptions,
) -> Result<()> {
    if ctx.json() {
        println!(
            "{}",
            serde_json::to_string(&json!({ "sequence": sequence, "results": results }))?
        );
        return Ok(());
    }

    let stamp = chrono::Local::now().format("%H:%M:%S");
    println!();
    println!("{}", format!("Refresh #{sequence} at {stamp}").dimmed());
    render(ctx, results, options)
}
