use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::repositories::dashboard::RawAverages;

/// Mean of each affect dimension over a set of readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectMeans {
    pub mood: f64,
    pub happy: f64,
    pub surprised: f64,
    pub angry: f64,
    pub disgusted: f64,
    pub afraid: f64,
    pub sad: f64,
    pub engagement: f64,
}

impl AffectMeans {
    /// Mean engagement when there are no readings. Lower is more engaged,
    /// so "no signal" is not reported as attentive.
    pub const EMPTY_ENGAGEMENT: f64 = 1.0;

    /// Means of an empty set.
    pub fn empty() -> Self {
        Self::from_averages([None; 8])
    }

    pub fn from_averages(averages: RawAverages) -> Self {
        let [mood, happy, surprised, angry, disgusted, afraid, sad, engagement] = averages;
        Self {
            mood: mood.unwrap_or(0.0),
            happy: happy.unwrap_or(0.0),
            surprised: surprised.unwrap_or(0.0),
            angry: angry.unwrap_or(0.0),
            disgusted: disgusted.unwrap_or(0.0),
            afraid: afraid.unwrap_or(0.0),
            sad: sad.unwrap_or(0.0),
            engagement: engagement.unwrap_or(Self::EMPTY_ENGAGEMENT),
        }
    }
}

/// Distinct ages per band: `<18`, `18-30`, `31-50`, `>50`. Each age seen
/// adds one to its band however many readings carry it. Negative ages are
/// "unknown" and are left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AgeHistogram([u64; 4]);

impl AgeHistogram {
    pub fn band(age: i64) -> Option<usize> {
        match age {
            a if a < 0 => None,
            0..=17 => Some(0),
            18..=30 => Some(1),
            31..=50 => Some(2),
            _ => Some(3),
        }
    }

    pub fn add(&mut self, age: i64) {
        if let Some(band) = Self::band(age) {
            self.0[band] += 1;
        }
    }

    pub fn counts(&self) -> [u64; 4] {
        self.0
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

impl FromIterator<i64> for AgeHistogram {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut histogram = Self::default();
        for age in iter {
            histogram.add(age);
        }
        histogram
    }
}

/// Everything one dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_views: u64,
    pub unique_visitors: u64,
    /// False when no view had a duration inside `[0, video_duration]`.
    pub avg_view_duration_present: bool,
    pub avg_view_duration: f64,
    pub male_count: u64,
    pub female_count: u64,
    pub age_counts: AgeHistogram,
    pub stats: AffectMeans,
    /// Window midpoint label to the means inside that window.
    pub instant_stats: BTreeMap<String, AffectMeans>,
    /// Window midpoint label to the number of samples inside that window.
    pub instant_viewed_count: BTreeMap<String, u64>,
}
