pub mod auth;
pub mod dashboard;
pub mod db;
pub mod engagement;
pub mod error;
pub mod housekeeping;
pub mod identity;
pub mod ingest;
pub mod settings;
mod utils;
pub mod viewing;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use auth::{AccountRules, Accounts, SessionStore};
use dashboard::DashboardEngine;
use db::Database;
use housekeeping::Housekeeper;
use identity::{IdentifierIssuer, NamespaceLocks};
use ingest::{FaceClassifier, Ingestor};
use settings::SettingsStore;
use tokio_util::sync::CancellationToken;
use viewing::ViewTracker;

const DEBUG_HOUSEKEEPING_SECS: u64 = 10;

/// Every service, wired over one database, one random source and one set of
/// namespace locks.
pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
    pub accounts: Accounts,
    pub sessions: SessionStore,
    pub views: ViewTracker,
    pub dashboards: DashboardEngine,
}

impl AppState {
    pub fn new(db: Database, settings: SettingsStore) -> Self {
        let issuer = IdentifierIssuer::from_clock();
        Self::with_issuer(db, settings, issuer)
    }

    /// Wire services around an explicit issuer, e.g. a seeded one in tests.
    pub fn with_issuer(db: Database, settings: SettingsStore, issuer: IdentifierIssuer) -> Self {
        let current = settings.current();
        let issuer = issuer.with_max_attempts(current.issue_attempts);
        let locks = Arc::new(NamespaceLocks::new());

        Self {
            accounts: Accounts::new(db.clone(), AccountRules::from_settings(&current)),
            sessions: SessionStore::new(db.clone(), issuer.clone(), Arc::clone(&locks), &current),
            views: ViewTracker::new(db.clone(), issuer, locks, &current),
            dashboards: DashboardEngine::new(db.clone(), &current),
            db,
            settings,
        }
    }

    pub fn ingestor(&self, classifier: Arc<dyn FaceClassifier>) -> Ingestor {
        Ingestor::new(self.views.clone(), classifier)
    }

    pub fn housekeeper(&self, debug_mode: bool) -> Housekeeper {
        let secs = if debug_mode {
            DEBUG_HOUSEKEEPING_SECS
        } else {
            self.settings.current().housekeeping_interval_secs.max(1)
        };
        Housekeeper::new(
            self.db.clone(),
            self.views.clone(),
            self.sessions.expiry(),
            Duration::from_secs(secs),
        )
    }
}

/// Open the data directory, start housekeeping and run until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("veea starting up...");

    let data_dir = std::env::var("VEEA_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("veea.sqlite3"))?;
    let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;
    let state = AppState::new(database, settings_store);

    let debug_mode = std::env::var("VEEA_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let cancel_token = CancellationToken::new();
    let housekeeping = state.housekeeper(debug_mode).spawn(cancel_token.clone());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    log::info!("shutdown requested");

    cancel_token.cancel();
    if let Err(err) = housekeeping.await {
        log::error!("housekeeping task ended abnormally: {err}");
    }
    Ok(())
}
