//! Attentiveness proxy derived from head pose and gaze.
//!
//! Each signal is divided by its comfortable operating range, so 1.0 after
//! normalisation sits at the edge of the attentive range, and the four
//! normalised values are combined under an L2 norm. Lower is more engaged.
//! The result is unbounded above: it is *not* a [0, 1] score, even though
//! dashboards display it next to bounded emotion scores.

use serde::{Deserialize, Serialize};

/// Per-axis normalisation. The defaults are inherited constants with no
/// documented derivation; keep them configurable rather than "fixing" them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngagementScales {
    pub yaw: f64,
    pub pitch: f64,
    pub gaze_x: f64,
    pub gaze_y: f64,
}

impl Default for EngagementScales {
    fn default() -> Self {
        Self {
            yaw: 0.2,
            pitch: 0.2,
            gaze_x: 300.0,
            gaze_y: 300.0,
        }
    }
}

impl EngagementScales {
    pub fn score(&self, yaw: f64, pitch: f64, gaze_x: f64, gaze_y: f64) -> f64 {
        norm2(&[
            yaw / self.yaw,
            pitch / self.pitch,
            gaze_x / self.gaze_x,
            gaze_y / self.gaze_y,
        ])
    }
}

/// Score with the default scales.
pub fn score(yaw: f64, pitch: f64, gaze_x: f64, gaze_y: f64) -> f64 {
    EngagementScales::default().score(yaw, pitch, gaze_x, gaze_y)
}

fn norm2(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}
