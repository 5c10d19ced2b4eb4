use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::{AffectReading, PersonReading, Sample, SampleInput},
};

fn row_to_sample(row: &Row) -> Result<Sample> {
    let recorded_at: String = row.get("recorded_at")?;

    Ok(Sample {
        id: row.get("id")?,
        view_id: row.get("view_id")?,
        offset_secs: row.get("offset_secs")?,
        state: row.get("state")?,
        quality: row.get("quality")?,
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
    })
}

fn row_to_reading(row: &Row) -> Result<AffectReading> {
    Ok(AffectReading {
        sample_id: row.get("sample_id")?,
        person: PersonReading {
            gender: row.get("gender")?,
            age: row.get("age")?,
            mood: row.get("mood")?,
            head_yaw: row.get("head_yaw")?,
            head_pitch: row.get("head_pitch")?,
            head_roll: row.get("head_roll")?,
            head_x: row.get("head_x")?,
            head_y: row.get("head_y")?,
            head_z: row.get("head_z")?,
            gaze_x: row.get("gaze_x")?,
            gaze_y: row.get("gaze_y")?,
            happy: row.get("happy")?,
            surprised: row.get("surprised")?,
            angry: row.get("angry")?,
            disgusted: row.get("disgusted")?,
            afraid: row.get("afraid")?,
            sad: row.get("sad")?,
        },
        engagement: row.get("engagement")?,
    })
}

/// Samples are append-only; duplicates of (view, offset) are kept as sent.
pub(crate) fn insert_sample(
    conn: &Connection,
    sample: &SampleInput,
    recorded_at: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO samples (view_id, offset_secs, state, quality, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            sample.view_id,
            sample.offset_secs,
            sample.state,
            sample.quality,
            format_datetime(&recorded_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn sample_exists(conn: &Connection, sample_id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM samples WHERE id = ?1",
            params![sample_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn insert_reading(conn: &Connection, reading: &AffectReading) -> Result<i64> {
    let p = &reading.person;
    conn.execute(
        "INSERT INTO affect_readings (
            sample_id, gender, age, mood,
            head_yaw, head_pitch, head_roll, head_x, head_y, head_z,
            gaze_x, gaze_y,
            happy, surprised, angry, disgusted, afraid, sad,
            engagement
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            reading.sample_id,
            p.gender,
            p.age,
            p.mood,
            p.head_yaw,
            p.head_pitch,
            p.head_roll,
            p.head_x,
            p.head_y,
            p.head_z,
            p.gaze_x,
            p.gaze_y,
            p.happy,
            p.surprised,
            p.angry,
            p.disgusted,
            p.afraid,
            p.sad,
            reading.engagement,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    pub async fn get_samples_for_view(&self, view_id: &str) -> Result<Vec<Sample>> {
        let view_id = view_id.to_string();
        self.query(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, view_id, offset_secs, state, quality, recorded_at
                 FROM samples
                 WHERE view_id = ?1
                 ORDER BY id ASC",
            )?;
            let mut rows = stmt.query(params![view_id])?;
            let mut samples = Vec::new();
            while let Some(row) = rows.next()? {
                samples.push(row_to_sample(row)?);
            }
            Ok(samples)
        })
        .await
    }

    pub async fn get_readings_for_sample(&self, sample_id: i64) -> Result<Vec<AffectReading>> {
        self.query(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT sample_id, gender, age, mood,
                        head_yaw, head_pitch, head_roll, head_x, head_y, head_z,
                        gaze_x, gaze_y,
                        happy, surprised, angry, disgusted, afraid, sad,
                        engagement
                 FROM affect_readings
                 WHERE sample_id = ?1
                 ORDER BY id ASC",
            )?;
            let mut rows = stmt.query(params![sample_id])?;
            let mut readings = Vec::new();
            while let Some(row) = rows.next()? {
                readings.push(row_to_reading(row)?);
            }
            Ok(readings)
        })
        .await
    }
}
