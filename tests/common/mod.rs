#![allow(dead_code)]

use tempfile::TempDir;
use veea_lib::{
    db::{Database, PersonReading, SampleInput},
    identity::IdentifierIssuer,
    settings::{Settings, SettingsStore},
    AppState,
};

/// An `AppState` over a throwaway data directory. Keep the harness alive for
/// the whole test; dropping it removes the database.
pub struct Harness {
    pub dir: TempDir,
    pub state: AppState,
}

pub fn harness() -> Harness {
    harness_with(Settings::default())
}

pub fn harness_with(settings: Settings) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SettingsStore::new(dir.path().join("settings.json")).expect("settings store");
    store.update(settings).expect("persist settings");

    let db = Database::new(dir.path().join("veea.sqlite3")).expect("open database");
    let state = AppState::with_issuer(db, store, IdentifierIssuer::with_seed(42));
    Harness { dir, state }
}

pub async fn user(state: &AppState, username: &str) -> i64 {
    state
        .accounts
        .create_user(username, "Test User", "hash", false)
        .await
        .expect("create user")
        .id
}

pub async fn video(state: &AppState, video_id: &str) {
    state
        .db
        .insert_video(video_id, "Test video")
        .await
        .expect("insert video");
}

pub fn sample(view_id: &str, offset_secs: f64) -> SampleInput {
    SampleInput {
        view_id: view_id.to_string(),
        offset_secs,
        state: 1,
        quality: "hd720".to_string(),
    }
}

/// A reading looking straight at the screen.
pub fn person(gender: f64, age: i64) -> PersonReading {
    PersonReading {
        gender,
        age,
        mood: 0.0,
        head_yaw: 0.0,
        head_pitch: 0.0,
        head_roll: 0.0,
        head_x: 0.0,
        head_y: 0.0,
        head_z: 0.0,
        gaze_x: 0.0,
        gaze_y: 0.0,
        happy: 0.0,
        surprised: 0.0,
        angry: 0.0,
        disgusted: 0.0,
        afraid: 0.0,
        sad: 0.0,
    }
}
