pub mod baseline_history;
pub mod batch;
pub mod classifier;
pub mod detection;
pub mod results;
pub mod sipm;
pub mod thresholds;
pub mod workers;

pub use baseline_history::{BaselineComparison, BaselineStatistics, BaselineTracker};
pub use batch::{BatchRunner, ExecutionMode, dataset_acquisition, run_dataset};
pub use classifier::{Classification, Classifier, main_peak};
pub use detection::{DetectionParams, detect_capture};
pub use results::{
    CaptureResult, Category, ClassificationResult, PeakSet, RejectionReason, RunResult,
};
pub use sipm::{
    Quadrant, SiPMAnalyzer, SiPMMetrics, TemporalDistribution, TimedPeak, temporal_distribution,
    timed_peaks,
};
pub use thresholds::{DatasetThresholds, ThresholdEstimator};
