//! Login session rows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identifier;

/// One row per owner. Re-login rewrites the identifier in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: i64,
    pub session_id: Identifier,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Session {
    /// Expired once `created_at + window < now`, whatever the active flag.
    pub fn is_expired(&self, window: Duration, now: DateTime<Utc>) -> bool {
        self.created_at + window < now
    }

    pub fn is_live(&self, window: Duration, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(window, now)
    }
}
