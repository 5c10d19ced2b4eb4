//! Read-only dashboard aggregation over recorded samples and readings.

mod engine;
mod stats;

pub use engine::DashboardEngine;
pub use stats::{AffectMeans, AgeHistogram, DashboardStats};

use crate::error::InputError;

/// What a dashboard aggregates over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every viewing session of one video.
    Video(String),
    /// One viewing session.
    View(String),
}

impl Scope {
    /// SQL predicate on the `viewing_sessions v` alias, bound to `?1`.
    pub(crate) fn filter(&self) -> &'static str {
        match self {
            Scope::Video(_) => "v.video_id = ?1",
            Scope::View(_) => "v.view_id = ?1",
        }
    }

    pub(crate) fn key(&self) -> &str {
        match self {
            Scope::Video(video_id) => video_id,
            Scope::View(view_id) => view_id,
        }
    }
}

/// Half-open playback interval `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// Shortest decimal rendering of the midpoint ("2.5", "5").
    pub fn label(&self) -> String {
        self.midpoint().to_string()
    }
}

/// Slide a `width`-second window across `[0, duration)`. The last window
/// is clipped at `duration`.
pub fn windows(duration: f64, width: f64) -> Result<Vec<Window>, InputError> {
    if !width.is_finite() || width <= 0.0 {
        return Err(InputError::InvalidWindowWidth(width));
    }
    if !duration.is_finite() || duration < 0.0 {
        return Err(InputError::InvalidVideoDuration(duration));
    }

    let mut series = Vec::new();
    let mut index = 0u64;
    loop {
        let start = index as f64 * width;
        if start >= duration {
            break;
        }
        series.push(Window {
            start,
            end: (start + width).min(duration),
        });
        index += 1;
    }
    Ok(series)
}
