//! Periodic storage hygiene. Nothing here is needed for correctness:
//! session expiry and view expiry are always evaluated at read time.

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::{
    task::JoinHandle,
    time::{Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{db::Database, viewing::ViewTracker};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const PASS_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    pub finalized_views: usize,
    pub purged_sessions: usize,
}

#[derive(Clone)]
pub struct Housekeeper {
    db: Database,
    tracker: ViewTracker,
    session_expiry: ChronoDuration,
    interval: Duration,
}

impl Housekeeper {
    pub fn new(
        db: Database,
        tracker: ViewTracker,
        session_expiry: ChronoDuration,
        interval: Duration,
    ) -> Self {
        Self {
            db,
            tracker,
            session_expiry,
            interval,
        }
    }

    pub fn spawn(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel_token))
    }

    async fn run(self, cancel_token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pass = self.run_once();
                    match tokio::time::timeout(Duration::from_secs(PASS_TIMEOUT_SECS), pass).await {
                        Ok(Ok(report)) => {
                            if report != HousekeepingReport::default() {
                                log_info!(
                                    "housekeeping finalized {} views, purged {} sessions",
                                    report.finalized_views,
                                    report.purged_sessions
                                );
                            }
                        }
                        Ok(Err(err)) => log_error!("housekeeping pass failed: {err:?}"),
                        Err(_) => log_warn!("housekeeping pass timeout (> {}s)", PASS_TIMEOUT_SECS),
                    }
                }
                _ = cancel_token.cancelled() => {
                    log_info!("housekeeping loop shutting down");
                    break;
                }
            }
        }
    }

    /// Finalise durations of views past their sample window, then drop
    /// session rows that expired more than one expiry window ago.
    pub async fn run_once(&self) -> Result<HousekeepingReport> {
        let now = Utc::now();
        let mut report = HousekeepingReport::default();

        let stale = self
            .db
            .list_unfinalized_views_before(now - self.tracker.view_expiry())
            .await?;
        for view in stale {
            match self.tracker.finalize_duration(view.view_id.as_str()).await {
                Ok(_) => report.finalized_views += 1,
                Err(err) => log_warn!(
                    "could not finalize view {}..: {err}",
                    view.view_id.redacted()
                ),
            }
        }

        report.purged_sessions = self
            .db
            .purge_sessions_created_before(now - self.session_expiry * 2)
            .await?;

        Ok(report)
    }
}
