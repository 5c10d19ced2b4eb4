use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, to_bool},
    models::ViewingSession,
};
use crate::identity::Identifier;

const VIEW_COLUMNS: &str =
    "view_id, user_id, video_id, created_at, view_duration, duration_final";

fn row_to_view(row: &Row) -> Result<ViewingSession> {
    let view_id: String = row.get("view_id")?;
    let created_at: String = row.get("created_at")?;
    let duration_final: i64 = row.get("duration_final")?;

    Ok(ViewingSession {
        view_id: Identifier::from(view_id),
        user_id: row.get("user_id")?,
        video_id: row.get("video_id")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        view_duration: row.get("view_duration")?,
        duration_final: to_bool(duration_final),
    })
}

pub(crate) fn insert_view(
    conn: &Connection,
    view_id: &Identifier,
    user_id: i64,
    video_id: &str,
    created_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO viewing_sessions (view_id, user_id, video_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            view_id.as_str(),
            user_id,
            video_id,
            format_datetime(&created_at)
        ],
    )?;
    Ok(())
}

pub(crate) fn find_view(conn: &Connection, view_id: &str) -> Result<Option<ViewingSession>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VIEW_COLUMNS} FROM viewing_sessions WHERE view_id = ?1"
    ))?;
    let mut rows = stmt.query(params![view_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_view(row)?)),
        None => Ok(None),
    }
}

/// Every playback offset recorded for a view, in arrival order.
pub(crate) fn offsets_for_view(conn: &Connection, view_id: &str) -> Result<Vec<f64>> {
    let mut stmt = conn.prepare("SELECT offset_secs FROM samples WHERE view_id = ?1 ORDER BY id")?;
    let offsets = stmt
        .query_map(params![view_id], |row| row.get::<_, f64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(offsets)
}

pub(crate) fn set_view_duration(
    conn: &Connection,
    view_id: &str,
    duration: f64,
    finalize: bool,
) -> Result<()> {
    conn.execute(
        "UPDATE viewing_sessions
         SET view_duration = ?1,
             duration_final = MAX(duration_final, ?2)
         WHERE view_id = ?3",
        params![duration, i64::from(finalize), view_id],
    )?;
    Ok(())
}

impl Database {
    pub async fn get_view(&self, view_id: &str) -> Result<Option<ViewingSession>> {
        let view_id = view_id.to_string();
        self.query(move |conn| find_view(conn, &view_id)).await
    }

    pub async fn list_views_for_video(&self, video_id: &str) -> Result<Vec<ViewingSession>> {
        let video_id = video_id.to_string();
        self.query(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIEW_COLUMNS} FROM viewing_sessions
                 WHERE video_id = ?1
                 ORDER BY created_at ASC"
            ))?;
            let mut rows = stmt.query(params![video_id])?;
            let mut views = Vec::new();
            while let Some(row) = rows.next()? {
                views.push(row_to_view(row)?);
            }
            Ok(views)
        })
        .await
    }

    /// One account's view history, newest first.
    pub async fn list_views_for_user(&self, user_id: i64) -> Result<Vec<ViewingSession>> {
        self.query(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIEW_COLUMNS} FROM viewing_sessions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let mut rows = stmt.query(params![user_id])?;
            let mut views = Vec::new();
            while let Some(row) = rows.next()? {
                views.push(row_to_view(row)?);
            }
            Ok(views)
        })
        .await
    }

    /// Views created before `cutoff` whose duration has not been finalised.
    pub async fn list_unfinalized_views_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ViewingSession>> {
        self.query(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIEW_COLUMNS} FROM viewing_sessions
                 WHERE duration_final = 0 AND created_at < ?1
                 ORDER BY created_at ASC"
            ))?;
            let mut rows = stmt.query(params![format_datetime(&cutoff)])?;
            let mut views = Vec::new();
            while let Some(row) = rows.next()? {
                views.push(row_to_view(row)?);
            }
            Ok(views)
        })
        .await
    }

    /// Backdate a view. Used to exercise view expiry.
    pub async fn set_view_created_at(&self, view_id: &str, created_at: DateTime<Utc>) -> Result<()> {
        let view_id = view_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE viewing_sessions SET created_at = ?1 WHERE view_id = ?2",
                params![format_datetime(&created_at), view_id],
            )?;
            Ok(())
        })
        .await
    }
}
