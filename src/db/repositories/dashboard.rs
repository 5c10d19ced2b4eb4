//! Read-only aggregate queries behind the dashboards.
//!
//! Every function is a single statement, so each result is consistent as
//! of its own read. No cross-query snapshot is taken.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::dashboard::{Scope, Window};

const READINGS_IN_SCOPE: &str = "FROM affect_readings a
     JOIN samples s ON a.sample_id = s.id
     JOIN viewing_sessions v ON s.view_id = v.view_id";

const AFFECT_AVERAGES: &str = "AVG(a.mood), AVG(a.happy), AVG(a.surprised), AVG(a.angry),
     AVG(a.disgusted), AVG(a.afraid), AVG(a.sad), AVG(a.engagement)";

/// Per-dimension averages in `AffectMeans` field order; `None` when the
/// dimension had no rows.
pub type RawAverages = [Option<f64>; 8];

pub(crate) fn total_views(conn: &Connection, scope: &Scope) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM viewing_sessions v WHERE {}",
        scope.filter()
    );
    let count: i64 = conn.query_row(&sql, params![scope.key()], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

pub(crate) fn unique_visitors(conn: &Connection, scope: &Scope) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT(DISTINCT v.user_id) FROM viewing_sessions v WHERE {}",
        scope.filter()
    );
    let count: i64 = conn.query_row(&sql, params![scope.key()], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

/// Average stored duration over views whose duration is in `[0, upper]`.
pub(crate) fn average_view_duration(
    conn: &Connection,
    scope: &Scope,
    upper: f64,
) -> Result<Option<f64>> {
    let sql = format!(
        "SELECT AVG(v.view_duration) FROM viewing_sessions v
         WHERE {} AND v.view_duration >= 0 AND v.view_duration <= ?2",
        scope.filter()
    );
    let average: Option<f64> =
        conn.query_row(&sql, params![scope.key(), upper], |row| row.get(0))?;
    Ok(average)
}

/// (negative, positive) gender-signal counts. Exactly 0 is in neither.
pub(crate) fn gender_counts(conn: &Connection, scope: &Scope) -> Result<(u64, u64)> {
    let sql = format!(
        "SELECT COALESCE(SUM(a.gender < 0), 0), COALESCE(SUM(a.gender > 0), 0)
         {READINGS_IN_SCOPE}
         WHERE {}",
        scope.filter()
    );
    let (negative, positive): (i64, i64) =
        conn.query_row(&sql, params![scope.key()], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok((negative.max(0) as u64, positive.max(0) as u64))
}

/// Each distinct age seen among the readings, once.
pub(crate) fn distinct_ages(conn: &Connection, scope: &Scope) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT a.age {READINGS_IN_SCOPE}
         WHERE {}
         GROUP BY a.age",
        scope.filter()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![scope.key()], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn affect_averages(conn: &Connection, scope: &Scope) -> Result<RawAverages> {
    let sql = format!(
        "SELECT {AFFECT_AVERAGES} {READINGS_IN_SCOPE} WHERE {}",
        scope.filter()
    );
    let averages = conn.query_row(&sql, params![scope.key()], read_averages)?;
    Ok(averages)
}

/// Averages over readings whose sample offset lies in `[start, end)`.
pub(crate) fn window_affect_averages(
    conn: &Connection,
    scope: &Scope,
    window: Window,
) -> Result<RawAverages> {
    let sql = format!(
        "SELECT {AFFECT_AVERAGES} {READINGS_IN_SCOPE}
         WHERE {} AND s.offset_secs >= ?2 AND s.offset_secs < ?3",
        scope.filter()
    );
    let averages = conn.query_row(
        &sql,
        params![scope.key(), window.start, window.end],
        read_averages,
    )?;
    Ok(averages)
}

/// Distinct samples with an offset in `[start, end)`.
pub(crate) fn window_sample_count(conn: &Connection, scope: &Scope, window: Window) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT(DISTINCT s.id) FROM samples s
         JOIN viewing_sessions v ON s.view_id = v.view_id
         WHERE {} AND s.offset_secs >= ?2 AND s.offset_secs < ?3",
        scope.filter()
    );
    let count: i64 = conn.query_row(
        &sql,
        params![scope.key(), window.start, window.end],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

fn read_averages(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAverages> {
    let mut averages = [None; 8];
    for (idx, slot) in averages.iter_mut().enumerate() {
        *slot = row.get::<_, Option<f64>>(idx)?;
    }
    Ok(averages)
}
