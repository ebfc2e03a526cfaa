//! Periodic re-search for an open result view.
//!
//! One task owns the timer. Each tick hands the search to the blocking pool
//! and waits for it, so a session never has more than one search in flight and
//! ticks that fall due meanwhile are skipped.

use crate::error::DirectoryResult;
use crate::model::ProximityResult;
use crate::proximity::SearchOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Undelivered outcomes kept; newer ones are dropped while the buffer is full.
const OUTCOME_BUFFER: usize = 8;

/// One completed refresh.
#[derive(Debug)]
pub struct RefreshOutcome {
    /// 1 for the first delivered outcome, increasing by one
    pub sequence: u64,
    pub result: DirectoryResult<Vec<ProximityResult>>,
}

/// Handle to a running refresh loop.
///
/// Dropping the handle without [`shutdown`](Self::shutdown) also stops the
/// loop, at its next wake-up.
pub struct LiveRefresh {
    enabled: watch::Sender<bool>,
    options: watch::Sender<SearchOptions>,
    task: JoinHandle<()>,
}

impl LiveRefresh {
    /// Starts refreshing every `period`, beginning immediately, enabled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(
        period: Duration,
        options: SearchOptions,
        search: F,
    ) -> (Self, mpsc::Receiver<RefreshOutcome>)
    where
        F: Fn(&SearchOptions) -> DirectoryResult<Vec<ProximityResult>> + Send + Sync + 'static,
    {
        let (enabled_tx, enabled_rx) = watch::channel(true);
        let (options_tx, options_rx) = watch::channel(options);
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_BUFFER);

        let task = tokio::spawn(run(
            period,
            Arc::new(search),
            enabled_rx,
            options_rx,
            outcome_tx,
        ));

        let handle = Self {
            enabled: enabled_tx,
            options: options_tx,
            task,
        };
        (handle, outcome_rx)
    }

    /// Turns refreshing on or off.
    ///
    /// Turning it off stops further ticks; a search already running finishes
    /// and its result is dropped.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.send_replace(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Replaces the search parameters used from the next tick on.
    pub fn set_options(&self, options: SearchOptions) {
        self.options.send_replace(options);
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(self) {
        let Self {
            enabled,
            options,
            task,
        } = self;
        drop(enabled);
        drop(options);
        if let Err(err) = task.await {
            warn!(error = %err, "Refresh task ended abnormally");
        }
    }
}

async fn run<F>(
    period: Duration,
    search: Arc<F>,
    mut enabled: watch::Receiver<bool>,
    options: watch::Receiver<SearchOptions>,
    outcomes: mpsc::Sender<RefreshOutcome>,
) where
    F: Fn(&SearchOptions) -> DirectoryResult<Vec<ProximityResult>> + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sequence = 0u64;

    loop {
        if !*enabled.borrow_and_update() {
            debug!("Live refresh paused");
            if enabled.changed().await.is_err() {
                break;
            }
            ticker.reset_immediately();
            continue;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            changed = enabled.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let params = options.borrow().clone();
        let task = Arc::clone(&search);
        let joined = tokio::task::spawn_blocking(move || task(&params)).await;

        if !*enabled.borrow() {
            debug!("Discarding refresh finished after pause");
            continue;
        }
        if enabled.has_changed().is_err() {
            break;
        }

        let result = match joined {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "Refresh search panicked");
                continue;
            }
        };

        sequence += 1;
        match outcomes.try_send(RefreshOutcome { sequence, result }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                sequence -= 1;
                debug!("Outcome receiver is behind; dropping refresh");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => break,
        }
    }

    debug!("Live refresh stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserLocationRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::{sleep, timeout};

    fn one_result(radius_km: f64) -> Vec<ProximityResult> {
        vec![ProximityResult {
            record: UserLocationRecord::new("u", "u", "u@example.com"),
            distance_km: radius_km,
        }]
    }

    async fn next(rx: &mut mpsc::Receiver<RefreshOutcome>) -> RefreshOutcome {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no outcome in time")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_delivers_in_sequence() {
        let (refresh, mut rx) = LiveRefresh::spawn(
            Duration::from_millis(20),
            SearchOptions::with_radius(3.0),
            |options| Ok(one_result(options.radius_km)),
        );

        for expected in 1..=3 {
            let outcome = next(&mut rx).await;
            assert_eq!(outcome.sequence, expected);
            assert_eq!(outcome.result.unwrap()[0].distance_km, 3.0);
        }

        refresh.shutdown().await;
    }

    #[tokio::test]
    async fn test_at_most_one_search_in_flight() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));

        let (refresh, mut rx) = LiveRefresh::spawn(
            Duration::from_millis(5),
            SearchOptions::default(),
            move |_| {
                let now = r.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(40));
                r.fetch_sub(1, Ordering::SeqCst);
                Ok(Vec::new())
            },
        );

        for _ in 0..3 {
            next(&mut rx).await;
        }
        refresh.shutdown().await;

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_stops_searching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let (refresh, mut rx) = LiveRefresh::spawn(
            Duration::from_millis(20),
            SearchOptions::default(),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            },
        );

        next(&mut rx).await;
        refresh.set_enabled(false);
        assert!(!refresh.is_enabled());

        sleep(Duration::from_millis(60)).await;
        while rx.try_recv().is_ok() {}
        let settled = calls.load(Ordering::SeqCst);

        sleep(Duration::from_millis(150)).await;
        assert_eq!(calls.load(Ordering::SeqCst), settled);
        assert!(rx.try_recv().is_err());

        refresh.set_enabled(true);
        next(&mut rx).await;
        assert!(calls.load(Ordering::SeqCst) > settled);

        refresh.shutdown().await;
    }

    #[tokio::test]
    async fn test_result_in_flight_when_disabled_is_dropped() {
        let (refresh, mut rx) = LiveRefresh::spawn(
            Duration::from_millis(10),
            SearchOptions::default(),
            |_| {
                std::thread::sleep(Duration::from_millis(100));
                Ok(Vec::new())
            },
        );

        sleep(Duration::from_millis(30)).await;
        refresh.set_enabled(false);
        sleep(Duration::from_millis(200)).await;

        assert!(rx.try_recv().is_err());
        refresh.shutdown().await;
    }

    #[tokio::test]
    async fn test_new_options_apply_to_next_tick() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        let (refresh, mut rx) = LiveRefresh::spawn(
            Duration::from_millis(20),
            SearchOptions::with_radius(1.0),
            move |options| {
                log.lock().unwrap().push(options.radius_km);
                Ok(Vec::new())
            },
        );

        next(&mut rx).await;
        refresh.set_options(SearchOptions::with_radius(25.0));

        loop {
            next(&mut rx).await;
            if seen.lock().unwrap().last() == Some(&25.0) {
                break;
            }
        }
        refresh.shutdown().await;

        assert_eq!(seen.lock().unwrap()[0], 1.0);
    }

    #[tokio::test]
    async fn test_errors_are_delivered() {
        let (refresh, mut rx) = LiveRefresh::spawn(
            Duration::from_millis(20),
            SearchOptions::default(),
            |_| Err(crate::DirectoryError::LookupFailed("offline".into())),
        );

        let outcome = next(&mut rx).await;
        assert!(outcome.result.is_err());
        refresh.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_while_paused() {
        let (refresh, _rx) =
            LiveRefresh::spawn(Duration::from_millis(20), SearchOptions::default(), |_| {
                Ok(Vec::new())
            });
        refresh.set_enabled(false);
        timeout(Duration::from_secs(5), refresh.shutdown())
            .await
            .expect("shutdown hung");
    }
}
