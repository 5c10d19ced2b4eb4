//! Viewing sessions and their playback samples.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identifier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewingSession {
    pub view_id: Identifier,
    pub user_id: i64,
    pub video_id: String,
    pub created_at: DateTime<Utc>,
    pub view_duration: f64,
    pub duration_final: bool,
}

impl ViewingSession {
    /// Samples may be attributed to the view only inside this window.
    pub fn accepts_samples(&self, window: Duration, now: DateTime<Utc>) -> bool {
        self.created_at >= now - window
    }
}

/// One playback tick as reported by the player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SampleInput {
    pub view_id: String,
    pub offset_secs: f64,
    pub state: i64,
    pub quality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub id: i64,
    pub view_id: String,
    pub offset_secs: f64,
    pub state: i64,
    pub quality: String,
    pub recorded_at: DateTime<Utc>,
}
