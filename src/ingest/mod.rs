//! Per-tick telemetry intake: playback sample first, then the optional
//! snapshot goes through the face classifier.

mod classifier;
mod snapshot;

pub use classifier::{parse_reply, ClassifierReply, FaceClassifier};
pub use snapshot::decode_data_url;

use std::sync::Arc;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{
    db::{PersonReading, SampleInput},
    error::{InternalError, Result},
    viewing::ViewTracker,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// One playback tick as posted by the player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryTick {
    pub view_id: String,
    pub offset_secs: f64,
    pub state: i64,
    pub quality: String,
    /// `data:` URL of a webcam still, when the client captured one.
    #[serde(default)]
    pub snapshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum TickStatus {
    NoSnapshot,
    NoFaces,
    Classified { people: usize, stored: usize },
    /// The sample is recorded; only the affect part was lost.
    ClassificationUnavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub sample_id: i64,
    pub status: TickStatus,
}

#[derive(Clone)]
pub struct Ingestor {
    tracker: ViewTracker,
    classifier: Arc<dyn FaceClassifier>,
}

impl Ingestor {
    pub fn new(tracker: ViewTracker, classifier: Arc<dyn FaceClassifier>) -> Self {
        Self {
            tracker,
            classifier,
        }
    }

    /// Record `tick` against `video_id` and classify its snapshot.
    ///
    /// The sample is always recorded first. A malformed snapshot is then an
    /// `InvalidImage` error, and classifier failures never undo the sample.
    pub async fn ingest(&self, video_id: &str, tick: TelemetryTick) -> Result<IngestReport> {
        let sample = SampleInput {
            view_id: tick.view_id,
            offset_secs: tick.offset_secs,
            state: tick.state,
            quality: tick.quality,
        };
        let sample_id = self.tracker.record_sample(video_id, sample).await?;

        let Some(snapshot) = tick.snapshot else {
            return Ok(IngestReport {
                sample_id,
                status: TickStatus::NoSnapshot,
            });
        };
        let image = decode_data_url(&snapshot).map_err(|err| {
            log_debug!("sample {} kept, snapshot rejected: {}", sample_id, err);
            err
        })?;

        let status = match self.classify(image).await {
            Ok(ClassifierReply::NoFaces(message)) => {
                log_debug!("sample {} has no faces: {}", sample_id, message);
                TickStatus::NoFaces
            }
            Ok(ClassifierReply::People(people)) => {
                let stored = self.tracker.record_readings(sample_id, &people).await?;
                TickStatus::Classified {
                    people: people.len(),
                    stored,
                }
            }
            Err(err) => {
                log_warn!("classification unavailable for sample {}: {}", sample_id, err);
                TickStatus::ClassificationUnavailable {
                    reason: err.to_string(),
                }
            }
        };

        Ok(IngestReport { sample_id, status })
    }

    /// Attach already-structured readings to an existing sample.
    pub async fn ingest_readings(&self, sample_id: i64, people: &[PersonReading]) -> Result<usize> {
        self.tracker.record_readings(sample_id, people).await
    }

    async fn classify(&self, image: Vec<u8>) -> Result<ClassifierReply, InternalError> {
        let classifier = Arc::clone(&self.classifier);
        let body = tokio::task::spawn_blocking(move || classifier.classify(&image))
            .await
            .map_err(|err| InternalError::ClassifierUnavailable(anyhow!("classifier task failed: {err}")))?
            .map_err(InternalError::ClassifierUnavailable)?;
        parse_reply(&body)
    }
}
