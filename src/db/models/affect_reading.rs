//! Per-person affect readings attached to a sample.

use serde::{Deserialize, Serialize};

use crate::engagement::EngagementScales;

/// One detected person in one snapshot, as delivered by the classifier.
/// Engagement is not part of the input; it is always derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonReading {
    /// Negative for male, positive for female, 0 when unknown.
    pub gender: f64,
    /// Negative values are sentinels for "unknown".
    pub age: i64,
    pub mood: f64,
    pub head_yaw: f64,
    pub head_pitch: f64,
    pub head_roll: f64,
    pub head_x: f64,
    pub head_y: f64,
    pub head_z: f64,
    pub gaze_x: f64,
    pub gaze_y: f64,
    pub happy: f64,
    pub surprised: f64,
    pub angry: f64,
    pub disgusted: f64,
    pub afraid: f64,
    pub sad: f64,
}

impl PersonReading {
    /// Name of the first field holding NaN or an infinity, if any.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("gender", self.gender),
            ("mood", self.mood),
            ("head_yaw", self.head_yaw),
            ("head_pitch", self.head_pitch),
            ("head_roll", self.head_roll),
            ("head_x", self.head_x),
            ("head_y", self.head_y),
            ("head_z", self.head_z),
            ("gaze_x", self.gaze_x),
            ("gaze_y", self.gaze_y),
            ("happy", self.happy),
            ("surprised", self.surprised),
            ("angry", self.angry),
            ("disgusted", self.disgusted),
            ("afraid", self.afraid),
            ("sad", self.sad),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(field, _)| field)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AffectReading {
    pub sample_id: i64,
    #[serde(flatten)]
    pub person: PersonReading,
    pub engagement: f64,
}

impl AffectReading {
    pub fn derive(sample_id: i64, person: PersonReading, scales: &EngagementScales) -> Self {
        let engagement = scales.score(
            person.head_yaw,
            person.head_pitch,
            person.gaze_x,
            person.gaze_y,
        );
        Self {
            sample_id,
            person,
            engagement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady() -> PersonReading {
        PersonReading {
            gender: 1.0,
            age: 30,
            mood: 0.1,
            head_yaw: 0.0,
            head_pitch: 0.0,
            head_roll: 0.0,
            head_x: 0.0,
            head_y: 0.0,
            head_z: 0.0,
            gaze_x: 0.0,
            gaze_y: 0.0,
            happy: 0.5,
            surprised: 0.0,
            angry: 0.0,
            disgusted: 0.0,
            afraid: 0.0,
            sad: 0.0,
        }
    }

    #[test]
    fn finite_reading_has_no_bad_field() {
        assert_eq!(steady().non_finite_field(), None);
    }

    #[test]
    fn reports_the_first_non_finite_field() {
        let mut reading = steady();
        reading.head_pitch = f64::NEG_INFINITY;
        reading.sad = f64::NAN;
        assert_eq!(reading.non_finite_field(), Some("head_pitch"));
    }
}
