use std::collections::BTreeSet;

/// Coverage-based watch-time estimate.
///
/// The offset axis is cut into buckets of `bucket_width` seconds; a bucket
/// counts once if any sample lands in it. Duplicates, arrival order and
/// bursts do not change the result. Offsets past the content length still
/// open buckets (no clamping). Negative or non-finite offsets are not
/// playback positions and are ignored.
#[derive(Debug, Clone)]
pub struct WatchTimeEstimator {
    bucket_width: f64,
    hit: BTreeSet<u64>,
}

impl WatchTimeEstimator {
    pub fn new(bucket_width: f64) -> Self {
        Self {
            bucket_width,
            hit: BTreeSet::new(),
        }
    }

    /// Record one sample. Returns true if it opened a new bucket.
    pub fn record(&mut self, offset_secs: f64) -> bool {
        match self.bucket_of(offset_secs) {
            Some(bucket) => self.hit.insert(bucket),
            None => false,
        }
    }

    pub fn extend<I>(&mut self, offsets: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for offset in offsets {
            self.record(offset);
        }
    }

    pub fn hit_buckets(&self) -> usize {
        self.hit.len()
    }

    pub fn watched_secs(&self) -> f64 {
        self.bucket_width * self.hit.len() as f64
    }

    fn bucket_of(&self, offset_secs: f64) -> Option<u64> {
        if !offset_secs.is_finite() || offset_secs < 0.0 || self.bucket_width <= 0.0 {
            return None;
        }
        Some((offset_secs / self.bucket_width).floor() as u64)
    }
}

/// One-shot estimate over an unordered sample set.
pub fn estimate_duration<I>(offsets: I, bucket_width: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut estimator = WatchTimeEstimator::new(bucket_width);
    estimator.extend(offsets);
    estimator.watched_secs()
}
