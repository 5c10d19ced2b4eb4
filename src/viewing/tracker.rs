use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::{
    db::{
        repositories::{
            samples::{insert_reading, insert_sample, sample_exists},
            users::{user_exists, video_exists},
            viewing_sessions::{find_view, insert_view, offsets_for_view, set_view_duration},
        },
        AffectReading, Database, PersonReading, SampleInput,
    },
    engagement::EngagementScales,
    error::{InputError, InternalError, Result},
    identity::{Identifier, IdentifierIssuer, Namespace, NamespaceLocks},
    settings::Settings,
};

use super::estimate_duration;

const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_info};

/// Viewing sessions, their playback samples and attached affect readings.
#[derive(Clone)]
pub struct ViewTracker {
    db: Database,
    issuer: IdentifierIssuer,
    locks: Arc<NamespaceLocks>,
    view_expiry: Duration,
    id_length: usize,
    bucket_width: f64,
    scales: EngagementScales,
}

impl ViewTracker {
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
            view_expiry: Duration::seconds(settings.view_expire_secs),
            id_length: settings.view_id_length,
            bucket_width: settings.bucket_width_secs,
            scales: settings.engagement,
        }
    }

    pub fn view_expiry(&self) -> Duration {
        self.view_expiry
    }

    /// Open a viewing session for (`user_id`, `video_id`).
    pub async fn start_view(&self, user_id: i64, video_id: &str) -> Result<Identifier> {
        let _guard = self.locks.lock(Namespace::Viewing).await;

        let issuer = self.issuer.clone();
        let length = self.id_length;
        let video = video_id.to_string();

        let view_id = self
            .db
            .execute(move |conn| {
                if !user_exists(conn, user_id)? {
                    return Err(InputError::UnknownUser(user_id).into());
                }
                if !video_exists(conn, &video)? {
                    return Err(InputError::UnknownVideo(video).into());
                }

                let view_id = issuer
                    .issue(conn, Namespace::Viewing, length)
                    .map_err(InternalError::from)?;
                insert_view(conn, &view_id, user_id, &video, Utc::now())?;
                Ok(view_id)
            })
            .await?;

        log_info!(
            "view started user={} video={} view={}..",
            user_id,
            video_id,
            view_id.redacted()
        );
        Ok(view_id)
    }

    /// Append one playback sample and recompute the view's duration.
    ///
    /// The view must exist, belong to `video_id` and still be inside its
    /// expiry window, and the offset must be finite.
    pub async fn record_sample(&self, video_id: &str, sample: SampleInput) -> Result<i64> {
        if !sample.offset_secs.is_finite() {
            return Err(InputError::NonFinite("offset_secs").into());
        }

        let view_expiry = self.view_expiry;
        let bucket_width = self.bucket_width;
        let video = video_id.to_string();

        let sample_id = self
            .db
            .execute(move |conn| {
                let view = find_view(conn, &sample.view_id)?
                    .ok_or_else(|| InputError::UnknownView(sample.view_id.clone()))?;
                if view.video_id != video {
                    return Err(InputError::ViewVideoMismatch {
                        video_id: video,
                        view_id: sample.view_id,
                    }
                    .into());
                }
                if !view.accepts_samples(view_expiry, Utc::now()) {
                    return Err(InputError::ViewExpired(sample.view_id).into());
                }

                let tx = conn.transaction()?;
                let sample_id = insert_sample(&tx, &sample, Utc::now())?;
                recompute_duration(&tx, &sample.view_id, bucket_width, false)?;
                tx.commit()?;
                Ok(sample_id)
            })
            .await?;

        log_debug!("sample {} recorded", sample_id);
        Ok(sample_id)
    }

    /// Store one affect reading per detected person, all tied to
    /// `sample_id`. Engagement is always derived here. Nothing is stored
    /// when any reading carries a non-finite value.
    pub async fn record_readings(&self, sample_id: i64, people: &[PersonReading]) -> Result<usize> {
        let scales = self.scales;
        let mut readings = Vec::with_capacity(people.len());
        for person in people {
            if let Some(field) = person.non_finite_field() {
                return Err(InputError::NonFinite(field).into());
            }
            let reading = AffectReading::derive(sample_id, person.clone(), &scales);
            if !reading.engagement.is_finite() {
                return Err(InputError::NonFinite("engagement").into());
            }
            readings.push(reading);
        }

        let stored = self
            .db
            .execute(move |conn| {
                if !sample_exists(conn, sample_id)? {
                    return Err(InputError::UnknownSample(sample_id).into());
                }

                let tx = conn.transaction()?;
                for reading in &readings {
                    insert_reading(&tx, reading)
                        .with_context(|| format!("failed to store reading for sample {sample_id}"))?;
                }
                tx.commit()?;
                Ok(readings.len())
            })
            .await?;

        log_debug!("stored {} readings for sample {}", stored, sample_id);
        Ok(stored)
    }

    /// Recompute `view_id`'s duration from every sample it has.
    pub async fn refresh_duration(&self, view_id: &str) -> Result<f64> {
        self.write_duration(view_id, false).await
    }

    /// Recompute and mark the duration final. Used once the view has aged
    /// out of its sample window.
    pub async fn finalize_duration(&self, view_id: &str) -> Result<f64> {
        self.write_duration(view_id, true).await
    }

    async fn write_duration(&self, view_id: &str, finalize: bool) -> Result<f64> {
        let bucket_width = self.bucket_width;
        let target = view_id.to_string();

        let duration = self
            .db
            .execute(move |conn| {
                if find_view(conn, &target)?.is_none() {
                    return Err(InputError::UnknownView(target).into());
                }
                recompute_duration(conn, &target, bucket_width, finalize)
            })
            .await?;
        Ok(duration)
    }
}

fn recompute_duration(
    conn: &Connection,
    view_id: &str,
    bucket_width: f64,
    finalize: bool,
) -> anyhow::Result<f64> {
    let offsets = offsets_for_view(conn, view_id)?;
    let duration = estimate_duration(offsets, bucket_width);
    set_view_duration(conn, view_id, duration, finalize)?;
    Ok(duration)
}
