use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;

use crate::{
    db::{
        repositories::{
            sessions::{find_by_identifier, find_by_user, insert_session, reissue_session},
            users::user_exists,
        },
        Database, Session,
    },
    error::{InputError, InternalError, Result},
    identity::{Identifier, IdentifierIssuer, Namespace, NamespaceLocks},
    settings::Settings,
};

use super::{HashVerifier, LoginOutcome, SubjectSession};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Login sessions: one row per owner, lazily expired at read time.
#[derive(Clone)]
pub struct SessionStore {
    db: Database,
    issuer: IdentifierIssuer,
    locks: Arc<NamespaceLocks>,
    expiry: Duration,
    id_length: usize,
}

impl SessionStore {
    pub fn new(
        db: Database,
        issuer: IdentifierIssuer,
        locks: Arc<NamespaceLocks>,
        settings: &Settings,
    ) -> Self {
        Self {
            db,
            issuer,
            locks,
            expiry: Duration::seconds(settings.session_expire_secs),
            id_length: settings.session_id_length,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Log `user_id` in, reusing a live identifier when there is one.
    ///
    /// The lookup, the three-way decision and the write run as one task on
    /// the writer connection while the session namespace is held.
    pub async fn login(&self, user_id: i64) -> Result<(Identifier, LoginOutcome)> {
        let _guard = self.locks.lock(Namespace::Session).await;

        let issuer = self.issuer.clone();
        let expiry = self.expiry;
        let length = self.id_length;

        let (identifier, outcome) = self
            .db
            .execute(move |conn| {
                if !user_exists(conn, user_id)? {
                    return Err(InputError::UnknownUser(user_id).into());
                }

                let now = Utc::now();
                let state = classify(find_by_user(conn, user_id)?, expiry, now);
                match state {
                    SubjectSession::Live(identifier) => Ok((identifier, LoginOutcome::Reused)),
                    SubjectSession::Lapsed(_) => {
                        let identifier = issuer
                            .issue(conn, Namespace::Session, length)
                            .map_err(InternalError::from)?;
                        reissue_session(conn, user_id, &identifier, now)?;
                        Ok((identifier, LoginOutcome::Created))
                    }
                    SubjectSession::NoRow => {
                        let identifier = issuer
                            .issue(conn, Namespace::Session, length)
                            .map_err(InternalError::from)?;
                        insert_session(conn, user_id, &identifier, now)?;
                        Ok((identifier, LoginOutcome::Created))
                    }
                }
            })
            .await?;

        log_info!(
            "login user={} session={}.. outcome={:?}",
            user_id,
            identifier.redacted(),
            outcome
        );
        Ok((identifier, outcome))
    }

    /// Deactivate the session behind `identifier` if it is live. Unknown,
    /// expired and already inactive identifiers are a silent no-op.
    /// Returns whether a row was deactivated.
    pub async fn logout(&self, identifier: &str) -> Result<bool> {
        let expiry = self.expiry;
        let target = identifier.to_string();

        let deactivated = self
            .db
            .execute(move |conn| {
                let Some(session) = find_by_identifier(conn, &target)? else {
                    return Ok(false);
                };
                if !session.is_live(expiry, Utc::now()) {
                    return Ok(false);
                }
                let rows = conn.execute(
                    "UPDATE sessions SET is_active = 0 WHERE user_id = ?1 AND session_id = ?2",
                    params![session.user_id, target],
                )?;
                Ok(rows > 0)
            })
            .await?;

        if deactivated {
            log_info!("logout session={}..", Identifier::from(identifier).redacted());
        } else {
            log_debug!("logout ignored for a session that is not live");
        }
        Ok(deactivated)
    }

    /// Owner of `identifier` when its row is active and unexpired.
    /// Expired rows are reported as `None` and left untouched.
    pub async fn is_authenticated(&self, identifier: &str) -> Result<Option<i64>> {
        let expiry = self.expiry;
        let session = self.db.get_session_by_identifier(identifier).await?;
        Ok(session
            .filter(|session| session.is_live(expiry, Utc::now()))
            .map(|session| session.user_id))
    }

    /// State of `user_id`'s session row.
    pub async fn subject_state(&self, user_id: i64) -> Result<SubjectSession> {
        let session = self.db.get_session_for_user(user_id).await?;
        Ok(classify(session, self.expiry, Utc::now()))
    }

    /// Check a password through `verifier` and log in on success. Unknown
    /// usernames and rejected passwords are `None`, not errors.
    pub async fn login_with_password(
        &self,
        username: &str,
        password: &str,
        verifier: &dyn HashVerifier,
    ) -> Result<Option<(Identifier, LoginOutcome)>> {
        self.login_checked(username, password, verifier, false).await
    }

    /// Like [`SessionStore::login_with_password`], but only for admins.
    pub async fn login_admin(
        &self,
        username: &str,
        password: &str,
        verifier: &dyn HashVerifier,
    ) -> Result<Option<(Identifier, LoginOutcome)>> {
        self.login_checked(username, password, verifier, true).await
    }

    async fn login_checked(
        &self,
        username: &str,
        password: &str,
        verifier: &dyn HashVerifier,
        admin_only: bool,
    ) -> Result<Option<(Identifier, LoginOutcome)>> {
        let Some(credentials) = self.db.get_credentials(username).await? else {
            log_debug!("login rejected: unknown username");
            return Ok(None);
        };

        if admin_only && !credentials.is_admin {
            log_debug!("admin login rejected for a non-admin account");
            return Ok(None);
        }

        if !verifier.verify(&credentials.password_hash, password) {
            log_debug!("login rejected: password mismatch");
            return Ok(None);
        }

        self.login(credentials.user_id).await.map(Some)
    }
}

fn classify(
    session: Option<Session>,
    expiry: Duration,
    now: DateTime<Utc>,
) -> SubjectSession {
    match session {
        None => SubjectSession::NoRow,
        Some(session) if session.is_live(expiry, now) => SubjectSession::Live(session.session_id),
        Some(session) => SubjectSession::Lapsed(session.session_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(age_secs: i64, is_active: bool) -> Session {
        Session {
            user_id: 7,
            session_id: Identifier::from("abcdefgh"),
            created_at: Utc::now() - Duration::seconds(age_secs),
            is_active,
        }
    }

    #[test]
    fn classify_covers_all_three_states() {
        let window = Duration::seconds(100);
        let now = Utc::now();

        assert_eq!(classify(None, window, now), SubjectSession::NoRow);
        assert!(matches!(
            classify(Some(row(10, true)), window, now),
            SubjectSession::Live(_)
        ));
        assert!(matches!(
            classify(Some(row(10, false)), window, now),
            SubjectSession::Lapsed(_)
        ));
        assert!(matches!(
            classify(Some(row(500, true)), window, now),
            SubjectSession::Lapsed(_)
        ));
    }
}
