use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::engagement::EngagementScales;

/// Longest accepted expiry window, about ten years.
pub const MAX_EXPIRE_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be between 1 and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        max: i64,
    },

    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

/// Tunables for sessions, identifiers, watch-time and dashboards.
///
/// Every field has a default, so a partial or missing settings file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Login session lifetime, counted from the last (re)issue.
    pub session_expire_secs: i64,
    pub session_id_length: usize,
    /// How long samples may still be attributed to a viewing session.
    pub view_expire_secs: i64,
    pub view_id_length: usize,
    /// Candidate draws before identifier issuance gives up.
    pub issue_attempts: u32,
    /// Coverage bucket used by the watch-time estimator.
    pub bucket_width_secs: f64,
    /// Dashboard time-series window.
    pub window_width_secs: f64,
    pub housekeeping_interval_secs: u64,
    pub engagement: EngagementScales,
    pub username_max_len: usize,
    pub full_name_max_len: usize,
    pub reserved_usernames: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_expire_secs: 30 * 24 * 60 * 60,
            session_id_length: 128,
            view_expire_secs: 5 * 60 * 60,
            view_id_length: 64,
            issue_attempts: 5,
            bucket_width_secs: 5.0,
            window_width_secs: 5.0,
            housekeeping_interval_secs: 5 * 60,
            engagement: EngagementScales::default(),
            username_max_len: 10,
            full_name_max_len: 80,
            reserved_usernames: vec!["admin".into()],
        }
    }
}

impl Settings {
    /// Reject values that would make expiry arithmetic overflow or turn
    /// engagement and window math into NaN.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("session_expire_secs", self.session_expire_secs),
            ("view_expire_secs", self.view_expire_secs),
        ] {
            if !(1..=MAX_EXPIRE_SECS).contains(&value) {
                return Err(SettingsError::OutOfRange {
                    field,
                    value,
                    max: MAX_EXPIRE_SECS,
                });
            }
        }

        for (field, value) in [
            ("session_id_length", self.session_id_length),
            ("view_id_length", self.view_id_length),
            ("issue_attempts", self.issue_attempts as usize),
        ] {
            if value == 0 {
                return Err(SettingsError::OutOfRange {
                    field,
                    value: 0,
                    max: i64::MAX,
                });
            }
        }

        for (field, value) in [
            ("bucket_width_secs", self.bucket_width_secs),
            ("window_width_secs", self.window_width_secs),
            ("engagement.yaw", self.engagement.yaw),
            ("engagement.pitch", self.engagement.pitch),
            ("engagement.gaze_x", self.engagement.gaze_x),
            ("engagement.gaze_y", self.engagement.gaze_y),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::NotPositive { field, value });
            }
        }
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data: Settings = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            Settings::default()
        };
        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Snapshot of the current settings. Components copy what they need at
    /// construction time.
    pub fn current(&self) -> Settings {
        self.read().clone()
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: Settings = serde_json::from_str(&contents)?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.current(), Settings::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "view_expire_secs": 60, "engagement": { "yaw": 0.5 } }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().current();
        assert_eq!(settings.view_expire_secs, 60);
        assert_eq!(settings.engagement.yaw, 0.5);
        assert_eq!(settings.engagement.gaze_x, 300.0);
        assert_eq!(settings.session_id_length, 128);
    }

    #[test]
    fn zero_scale_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "engagement": { "gaze_y": 0 } }"#).unwrap();

        let err = SettingsStore::new(path).err().unwrap();
        assert_eq!(
            err.downcast_ref::<SettingsError>(),
            Some(&SettingsError::NotPositive {
                field: "engagement.gaze_y",
                value: 0.0
            })
        );
    }

    #[test]
    fn huge_expiry_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "session_expire_secs": 9223372036854775807 }"#).unwrap();

        let err = SettingsStore::new(path).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<SettingsError>(),
            Some(SettingsError::OutOfRange {
                field: "session_expire_secs",
                ..
            })
        ));
    }

    #[test]
    fn update_rejects_invalid_widths_and_keeps_the_old_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        let mut bad = store.current();
        bad.window_width_secs = -5.0;
        assert!(store.update(bad).is_err());
        assert_eq!(store.current().window_width_secs, 5.0);

        let mut bad = store.current();
        bad.view_expire_secs = 0;
        assert!(store.update(bad).is_err());
    }

    #[test]
    fn update_persists_and_reload_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut changed = store.current();
        changed.window_width_secs = 2.0;
        store.update(changed.clone()).unwrap();

        let other = SettingsStore::new(path).unwrap();
        assert_eq!(other.current(), changed);
        other.reload().unwrap();
        assert_eq!(other.current().window_width_secs, 2.0);
    }
}
