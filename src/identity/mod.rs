//! Collision-avoiding random identifiers for login and viewing sessions.
//!
//! The issuer only draws candidates and checks them against a namespace. The
//! check-then-insert sequence is not atomic by itself: callers hold the
//! namespace's critical section from [`NamespaceLocks`] and perform the
//! check and the insert inside the same database task.

use std::{
    fmt,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Result;
use rand::{distributions::Alphanumeric, rngs::StdRng, Rng, SeedableRng};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::error::InternalError;

/// Default number of candidates drawn before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Namespace {
    Session,
    Viewing,
}

impl Namespace {
    fn existence_query(self) -> &'static str {
        match self {
            Namespace::Session => "SELECT 1 FROM sessions WHERE session_id = ?1 LIMIT 1",
            Namespace::Viewing => "SELECT 1 FROM viewing_sessions WHERE view_id = ?1 LIMIT 1",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Session => f.write_str("session"),
            Namespace::Viewing => f.write_str("view"),
        }
    }
}

/// Opaque fixed-length identifier over `[a-zA-Z0-9]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Short prefix for log lines; identifiers are bearer secrets.
    pub fn redacted(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("no unique {namespace} id after {attempts} attempts")]
    ExhaustedRetries { namespace: Namespace, attempts: u32 },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<IssueError> for InternalError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::ExhaustedRetries {
                namespace,
                attempts,
            } => InternalError::IdentifierSpaceExhausted {
                namespace,
                attempts,
            },
            IssueError::Storage(inner) => InternalError::Storage(inner),
        }
    }
}

/// Random identifier source shared by every issuer clone.
///
/// Seeded exactly once; clones share the same generator.
#[derive(Clone)]
pub struct IdentifierIssuer {
    rng: Arc<Mutex<StdRng>>,
    max_attempts: u32,
}

impl IdentifierIssuer {
    /// Seed from the wall clock. Call once at process start.
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(nanos)
    }

    /// Deterministic source, for tests and reproducible fixtures.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
            max_attempts: DEFAULT_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draw `length` characters uniformly from the 62-symbol alphabet.
    pub fn random_string(&self, length: usize) -> String {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (0..length)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect()
    }

    /// Draw candidates until `is_taken` reports a free one, or fail after
    /// the retry budget.
    pub fn issue_with<F>(
        &self,
        namespace: Namespace,
        length: usize,
        mut is_taken: F,
    ) -> Result<Identifier, IssueError>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        for _ in 0..self.max_attempts {
            let candidate = self.random_string(length);
            if !is_taken(&candidate)? {
                return Ok(Identifier(candidate));
            }
        }

        log::warn!(
            "identifier space exhausted for namespace {namespace} after {} attempts",
            self.max_attempts
        );
        Err(IssueError::ExhaustedRetries {
            namespace,
            attempts: self.max_attempts,
        })
    }

    /// Issue an identifier that no row in `namespace` currently carries.
    pub fn issue(
        &self,
        conn: &Connection,
        namespace: Namespace,
        length: usize,
    ) -> Result<Identifier, IssueError> {
        self.issue_with(namespace, length, |candidate| {
            let found: Option<i64> = conn
                .query_row(namespace.existence_query(), params![candidate], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }
}

/// One critical section per namespace. Login and view-start each serialise
/// their read-decide-write sequence here; the two never contend.
#[derive(Default)]
pub struct NamespaceLocks {
    session: AsyncMutex<()>,
    viewing: AsyncMutex<()>,
}

impl NamespaceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, namespace: Namespace) -> MutexGuard<'_, ()> {
        match namespace {
            Namespace::Session => self.session.lock().await,
            Namespace::Viewing => self.viewing.lock().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_strings_use_the_alphanumeric_alphabet() {
        let issuer = IdentifierIssuer::with_seed(7);
        let value = issuer.random_string(512);
        assert_eq!(value.len(), 512);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn same_seed_same_sequence() {
        let a = IdentifierIssuer::with_seed(42);
        let b = IdentifierIssuer::with_seed(42);
        assert_eq!(a.random_string(64), b.random_string(64));
    }

    #[test]
    fn clones_share_one_generator() {
        let issuer = IdentifierIssuer::with_seed(1);
        let clone = issuer.clone();
        let first = issuer.random_string(32);
        let second = clone.random_string(32);
        assert_ne!(first, second);
    }

    #[test]
    fn retries_past_collisions() {
        let issuer = IdentifierIssuer::with_seed(3);
        let mut calls = 0;
        let id = issuer
            .issue_with(Namespace::Viewing, 16, |_| {
                calls += 1;
                Ok(calls < 3)
            })
            .unwrap();
        assert_eq!(calls, 3);
        assert_eq!(id.as_str().len(), 16);
    }

    #[test]
    fn gives_up_after_the_retry_budget() {
        let issuer = IdentifierIssuer::with_seed(3);
        let mut calls = 0;
        let err = issuer
            .issue_with(Namespace::Session, 16, |_| {
                calls += 1;
                Ok(true)
            })
            .unwrap_err();
        assert_eq!(calls, DEFAULT_ATTEMPTS);
        assert!(matches!(
            err,
            IssueError::ExhaustedRetries {
                namespace: Namespace::Session,
                attempts: DEFAULT_ATTEMPTS
            }
        ));
    }

    #[test]
    fn issue_checks_the_namespace_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE viewing_sessions (view_id TEXT UNIQUE);")
            .unwrap();

        let issuer = IdentifierIssuer::with_seed(9);
        let mut seen = HashSet::new();
        for _ in 0..50 {
            // Two-character ids make collisions likely enough to exercise the check.
            match issuer.issue(&conn, Namespace::Viewing, 2) {
                Ok(id) => {
                    conn.execute(
                        "INSERT INTO viewing_sessions (view_id) VALUES (?1)",
                        params![id.as_str()],
                    )
                    .unwrap();
                    assert!(seen.insert(id));
                }
                Err(IssueError::ExhaustedRetries { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn redaction_keeps_a_short_prefix() {
        let id = Identifier::from("abcdefghijklmnop");
        assert_eq!(id.redacted(), "abcdefgh");
        assert_eq!(Identifier::from("abc").redacted(), "abc");
    }
}
