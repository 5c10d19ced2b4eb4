use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::{
    db::{repositories::dashboard as queries, Database},
    error::{InputError, Result},
    settings::Settings,
};

use super::{windows, AffectMeans, AgeHistogram, DashboardStats, Scope, Window};

/// Builds dashboards from stored samples and readings.
///
/// Each figure is consistent as of its own statement. A dashboard is not
/// one snapshot across all of its figures.
#[derive(Clone)]
pub struct DashboardEngine {
    db: Database,
    window_width: f64,
    max_video_duration: f64,
}

impl DashboardEngine {
    pub fn new(db: Database, settings: &Settings) -> Self {
        Self {
            db,
            window_width: settings.window_width_secs,
            max_video_duration: settings.view_expire_secs as f64,
        }
    }

    /// Aggregate every view of `video_id`.
    pub async fn video_dashboard(&self, video_id: &str, video_duration: f64) -> Result<DashboardStats> {
        self.check_duration(video_duration)?;
        if self.db.get_video(video_id).await?.is_none() {
            return Err(InputError::UnknownVideo(video_id.to_string()).into());
        }

        let scope = Scope::Video(video_id.to_string());
        let series = windows(video_duration, self.window_width)?;
        let stats = self
            .db
            .query(move |conn| {
                let total_views = queries::total_views(conn, &scope)?;
                let unique_visitors = queries::unique_visitors(conn, &scope)?;
                build_stats(conn, &scope, total_views, unique_visitors, video_duration, &series)
            })
            .await?;
        Ok(stats)
    }

    /// Aggregate one view. The view must belong to `video_id`.
    pub async fn view_dashboard(
        &self,
        video_id: &str,
        view_id: &str,
        video_duration: f64,
    ) -> Result<DashboardStats> {
        self.check_duration(video_duration)?;
        let Some(view) = self.db.get_view(view_id).await? else {
            return Err(InputError::UnknownView(view_id.to_string()).into());
        };
        if view.video_id != video_id {
            return Err(InputError::ViewVideoMismatch {
                video_id: video_id.to_string(),
                view_id: view_id.to_string(),
            }
            .into());
        }

        let scope = Scope::View(view_id.to_string());
        let series = windows(video_duration, self.window_width)?;
        let stats = self
            .db
            .query(move |conn| build_stats(conn, &scope, 1, 1, video_duration, &series))
            .await?;
        Ok(stats)
    }

    pub async fn total_views(&self, video_id: &str) -> Result<u64> {
        let scope = Scope::Video(video_id.to_string());
        Ok(self.db.query(move |conn| queries::total_views(conn, &scope)).await?)
    }

    pub async fn unique_visitors(&self, video_id: &str) -> Result<u64> {
        let scope = Scope::Video(video_id.to_string());
        Ok(self
            .db
            .query(move |conn| queries::unique_visitors(conn, &scope))
            .await?)
    }

    /// Mean duration over views whose duration lies in `[0, upper]`.
    /// `None` when there is no such view.
    pub async fn average_duration(&self, scope: Scope, upper: f64) -> Result<Option<f64>> {
        self.check_duration(upper)?;
        Ok(self
            .db
            .query(move |conn| queries::average_view_duration(conn, &scope, upper))
            .await?)
    }

    /// (male, female) reading counts. Unknown gender counts as neither.
    pub async fn gender_counts(&self, scope: Scope) -> Result<(u64, u64)> {
        Ok(self
            .db
            .query(move |conn| queries::gender_counts(conn, &scope))
            .await?)
    }

    pub async fn age_histogram(&self, scope: Scope) -> Result<AgeHistogram> {
        let ages = self
            .db
            .query(move |conn| queries::distinct_ages(conn, &scope))
            .await?;
        Ok(ages.into_iter().collect())
    }

    pub async fn affect_means(&self, scope: Scope) -> Result<AffectMeans> {
        let averages = self
            .db
            .query(move |conn| queries::affect_averages(conn, &scope))
            .await?;
        Ok(AffectMeans::from_averages(averages))
    }

    /// Means over readings whose sample offset lies in `window`.
    pub async fn window_means(&self, scope: Scope, window: Window) -> Result<AffectMeans> {
        let averages = self
            .db
            .query(move |conn| queries::window_affect_averages(conn, &scope, window))
            .await?;
        Ok(AffectMeans::from_averages(averages))
    }

    /// Distinct samples whose offset lies in `window`.
    pub async fn window_viewed_count(&self, scope: Scope, window: Window) -> Result<u64> {
        Ok(self
            .db
            .query(move |conn| queries::window_sample_count(conn, &scope, window))
            .await?)
    }

    fn check_duration(&self, video_duration: f64) -> Result<(), InputError> {
        if !video_duration.is_finite()
            || video_duration < 0.0
            || video_duration > self.max_video_duration
        {
            return Err(InputError::InvalidVideoDuration(video_duration));
        }
        Ok(())
    }
}

fn build_stats(
    conn: &Connection,
    scope: &Scope,
    total_views: u64,
    unique_visitors: u64,
    video_duration: f64,
    series: &[Window],
) -> anyhow::Result<DashboardStats> {
    let average = queries::average_view_duration(conn, scope, video_duration)?;
    let (male_count, female_count) = queries::gender_counts(conn, scope)?;
    let age_counts: AgeHistogram = queries::distinct_ages(conn, scope)?.into_iter().collect();
    let stats = AffectMeans::from_averages(queries::affect_averages(conn, scope)?);

    let mut instant_stats = BTreeMap::new();
    let mut instant_viewed_count = BTreeMap::new();
    for window in series {
        let means = AffectMeans::from_averages(queries::window_affect_averages(conn, scope, *window)?);
        let viewed = queries::window_sample_count(conn, scope, *window)?;
        instant_stats.insert(window.label(), means);
        instant_viewed_count.insert(window.label(), viewed);
    }

    Ok(DashboardStats {
        total_views,
        unique_visitors,
        avg_view_duration_present: average.is_some(),
        avg_view_duration: average.unwrap_or(0.0),
        male_count,
        female_count,
        age_counts,
        stats,
        instant_stats,
        instant_viewed_count,
    })
}
