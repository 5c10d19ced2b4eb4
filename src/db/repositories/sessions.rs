use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, to_bool},
    models::Session,
};
use crate::identity::Identifier;

fn row_to_session(row: &Row) -> Result<Session> {
    let session_id: String = row.get("session_id")?;
    let created_at: String = row.get("created_at")?;
    let is_active: i64 = row.get("is_active")?;

    Ok(Session {
        user_id: row.get("user_id")?,
        session_id: Identifier::from(session_id),
        created_at: parse_datetime(&created_at, "created_at")?,
        is_active: to_bool(is_active),
    })
}

pub(crate) fn find_by_user(conn: &Connection, user_id: i64) -> Result<Option<Session>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, session_id, created_at, is_active
         FROM sessions
         WHERE user_id = ?1",
    )?;
    let mut rows = stmt.query(params![user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_session(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn find_by_identifier(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, session_id, created_at, is_active
         FROM sessions
         WHERE session_id = ?1",
    )?;
    let mut rows = stmt.query(params![session_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_session(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn insert_session(
    conn: &Connection,
    user_id: i64,
    session_id: &Identifier,
    created_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (user_id, session_id, created_at, is_active)
         VALUES (?1, ?2, ?3, 1)",
        params![user_id, session_id.as_str(), format_datetime(&created_at)],
    )?;
    Ok(())
}

/// Overwrite the owner's row with a fresh identifier and restart its clock.
pub(crate) fn reissue_session(
    conn: &Connection,
    user_id: i64,
    session_id: &Identifier,
    created_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE sessions
         SET session_id = ?1,
             created_at = ?2,
             is_active = 1
         WHERE user_id = ?3",
        params![session_id.as_str(), format_datetime(&created_at), user_id],
    )?;
    Ok(())
}

impl Database {
    pub async fn get_session_for_user(&self, user_id: i64) -> Result<Option<Session>> {
        self.query(move |conn| find_by_user(conn, user_id)).await
    }

    pub async fn get_session_by_identifier(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.query(move |conn| find_by_identifier(conn, &session_id))
            .await
    }

    /// Delete rows created before `cutoff`. Housekeeping only; expiry is
    /// always evaluated at read time.
    pub async fn purge_sessions_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM sessions WHERE created_at < ?1",
                params![format_datetime(&cutoff)],
            )?;
            Ok(rows_affected)
        })
        .await
    }

    /// Backdate a session row. Used to exercise expiry.
    pub async fn set_session_created_at(
        &self,
        user_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions SET created_at = ?1 WHERE user_id = ?2",
                params![format_datetime(&created_at), user_id],
            )?;
            Ok(())
        })
        .await
    }
}
