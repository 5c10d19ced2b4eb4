mod estimator;
mod tracker;

pub use estimator::{estimate_duration, WatchTimeEstimator};
pub use tracker::ViewTracker;
