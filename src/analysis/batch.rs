use std::path::Path;

use super::classifier::Classifier;
use super::detection::{DetectionParams, detect_capture};
use super::results::{CaptureResult, Category, ClassificationResult, PeakSet, RunResult};
use super::thresholds::ThresholdEstimator;
use super::workers::{parallel_map, worker_count};
use crate::config::{AcquisitionConfig, AnalysisConfig, RunConfig};
use crate::constants::PARALLEL_CAPTURE_THRESHOLD;
use crate::error::Result;
use crate::signal_processing::central_band;
use crate::waveform::{Capture, WaveformStore, default_pattern, read_metadata};

/// How pass-1 detection is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Worker pool above the capture-count threshold, sequential otherwise
    #[default]
    Auto,
    Sequential,
    /// Worker pool of the given size regardless of capture count
    Parallel { workers: usize },
}

impl ExecutionMode {
    /// Number of workers to use for `jobs` captures; 1 means in-thread
    pub fn workers_for(&self, jobs: usize) -> usize {
        match *self {
            ExecutionMode::Auto if jobs > PARALLEL_CAPTURE_THRESHOLD => worker_count(jobs),
            ExecutionMode::Auto | ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel { workers } => workers.clamp(1, jobs.max(1)),
        }
    }
}

/// Two-pass classification of a whole dataset
///
/// Pass 1 detects peaks in every capture independently (saturation merge
/// and width filter included). The dataset thresholds are then estimated
/// once from the captures that survived pass 1, and pass 2 classifies each
/// capture against them. A failing capture is logged and excluded.
pub struct BatchRunner {
    config: RunConfig,
    execution: ExecutionMode,
}

impl BatchRunner {
    /// Fails with a configuration error before any capture is touched
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            execution: ExecutionMode::default(),
        })
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run(&self, store: &WaveformStore) -> Result<RunResult> {
        let captures = store.captures();
        let analysis = &self.config.analysis;
        let acquisition = self.config.acquisition;

        let params = DetectionParams::derive(&self.config, store.amplitude_extrema());
        log::info!(
            "Detection: prominence {:.2} mV, min width {} samples, min distance {} samples",
            params.prominence * 1000.0,
            params.min_width_samples,
            params.min_distance_samples
        );

        let mut excluded = Vec::new();
        let detected = self.detect_all(captures, &params);
        let mut survivors: Vec<(usize, PeakSet)> = Vec::with_capacity(detected.len());
        for (index, outcome) in detected {
            match outcome {
                Ok(peaks) => survivors.push((index, peaks)),
                Err(e) => {
                    log::warn!("Excluding {}: {}", captures[index].filename, e);
                    excluded.push(captures[index].filename.clone());
                }
            }
        }

        let estimator =
            ThresholdEstimator::new(acquisition, analysis.baseline_pct, analysis.max_dist_pct);
        let passed: Vec<&Capture> = survivors.iter().map(|(i, _)| &captures[*i]).collect();
        let thresholds = estimator.estimate(&passed);

        let classifier = Classifier::new(thresholds, acquisition, analysis);
        let mut classification = ClassificationResult::default();
        for (index, peaks) in survivors {
            let capture = &captures[index];
            match classifier.classify(capture, peaks) {
                Ok(c) => classification.push(CaptureResult {
                    index,
                    filename: capture.filename.clone(),
                    trigger_time: capture.trigger_time,
                    amplitudes: capture.amplitudes.clone(),
                    category: c.category,
                    peaks: c.peaks,
                    main_peak: c.main_peak,
                    afterpulse_intervals: c.afterpulse_intervals,
                }),
                Err(e) => {
                    log::warn!("Excluding {}: {}", capture.filename, e);
                    excluded.push(capture.filename.clone());
                }
            }
        }

        let afterpulse_intervals: Vec<f64> = classification
            .afterpulse
            .iter()
            .flat_map(|r| r.afterpulse_intervals.iter().copied())
            .collect();
        let afterpulse_band = central_band(&afterpulse_intervals, analysis.afterpulse_pct);

        let accepted: Vec<&Capture> = classification
            .accepted
            .iter()
            .map(|r| &captures[r.index])
            .collect();
        let accepted_baseline = (!accepted.is_empty())
            .then(|| estimator.baseline(&accepted, thresholds.signal_window));

        let total_valid_peaks = classification.total_valid_peaks();
        log::info!(
            "Classified {} captures: {} accepted, {} afterpulse, {} rejected, {} rejected afterpulse, {} excluded",
            classification.len(),
            classification.count(Category::Accepted),
            classification.count(Category::Afterpulse),
            classification.count(Category::Rejected),
            classification.count(Category::RejectedAfterpulse),
            excluded.len()
        );
        log::info!("Total valid peaks: {}", total_valid_peaks);
        if let Some(band) = accepted_baseline {
            log::info!(
                "Accepted-only baseline width: {:.3} mV",
                band.width() * 1000.0
            );
        }

        Ok(RunResult {
            acquisition,
            classification,
            thresholds,
            prominence: params.prominence,
            total_valid_peaks,
            afterpulse_intervals,
            afterpulse_band,
            accepted_baseline,
            excluded,
        })
    }

    fn detect_all(
        &self,
        captures: &[Capture],
        params: &DetectionParams,
    ) -> Vec<(usize, Result<PeakSet>)> {
        let workers = self.execution.workers_for(captures.len());
        if workers > 1 {
            log::info!(
                "Detecting peaks in {} captures on {} workers",
                captures.len(),
                workers
            );
            // Each worker gets its own copy of the parameters
            let params = *params;
            parallel_map(captures, workers, move |_, capture| {
                detect_capture(capture, &params)
            })
        } else {
            log::debug!("Detecting peaks in {} captures sequentially", captures.len());
            captures
                .iter()
                .enumerate()
                .map(|(i, capture)| (i, detect_capture(capture, params)))
                .collect()
        }
    }
}

/// Acquisition geometry of a dataset directory
///
/// Taken from `DATA.txt` when present; the sample count falls back to the
/// length of the first loaded capture.
pub fn dataset_acquisition(dir: &Path, store: &WaveformStore) -> Result<AcquisitionConfig> {
    let fallback_points = store.first_capture_len();
    Ok(match read_metadata(dir)? {
        Some(meta) => meta.to_acquisition(fallback_points),
        None => AcquisitionConfig {
            num_points: fallback_points.unwrap_or(AcquisitionConfig::default().num_points),
            ..AcquisitionConfig::default()
        },
    })
}

/// Load and classify a dataset directory in one call
///
/// `pattern` defaults to `<directory name>_*.txt`.
pub fn run_dataset(
    dir: &Path,
    pattern: Option<&str>,
    analysis: AnalysisConfig,
    execution: ExecutionMode,
) -> Result<RunResult> {
    RunConfig::new(analysis, AcquisitionConfig::default()).validate()?;

    let pattern = pattern
        .map(str::to_string)
        .unwrap_or_else(|| default_pattern(dir));
    let store = WaveformStore::load(dir, &pattern)?;
    let acquisition = dataset_acquisition(dir, &store)?;
    log::info!(
        "Acquisition: window {:.3} us, {} points, sample period {:.3} ns",
        acquisition.window_time * 1e6,
        acquisition.num_points,
        acquisition.sample_period() * 1e9
    );

    BatchRunner::new(RunConfig::new(analysis, acquisition))?
        .with_execution(execution)
        .run(&store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PeakFinderError;

    // 1000 samples over 10 us, trigger at sample 500
    fn config() -> RunConfig {
        let analysis = AnalysisConfig {
            width_time: 0.03e-6,
            min_dist_time: 0.02e-6,
            ..AnalysisConfig::default()
        };
        RunConfig::new(analysis, AcquisitionConfig::new(10e-6, 1000))
    }

    fn add_pulse(samples: &mut [f64], center: usize, amplitude: f64) {
        for k in 0..8usize {
            let v = amplitude * (1.0 - k as f64 / 8.0);
            samples[center + k] += v;
            if k > 0 {
                samples[center - k] += v;
            }
        }
    }

    fn noise(seed: usize, len: usize) -> Vec<f64> {
        // Deterministic small ripple in place of random noise
        (0..len)
            .map(|i| 0.0005 * (((i * 7 + seed * 13) % 11) as f64 / 10.0 - 0.5))
            .collect()
    }

    fn dataset(n: usize) -> Vec<Capture> {
        (0..n)
            .map(|i| {
                let mut samples = noise(i, 1000);
                add_pulse(&mut samples, 495 + (i % 10), 0.05);
                if i % 4 == 1 {
                    add_pulse(&mut samples, 750, 0.03);
                }
                Capture::new(format!("cap_{:03}.txt", i), i as f64 * 1e-3, samples)
            })
            .collect()
    }

    #[test]
    fn test_invalid_config_fails_before_run() {
        let mut config = config();
        config.analysis.baseline_pct = 101.0;
        assert!(matches!(
            BatchRunner::new(config),
            Err(PeakFinderError::Config(_))
        ));
    }

    #[test]
    fn test_execution_mode_workers() {
        assert_eq!(ExecutionMode::Auto.workers_for(10), 1);
        assert!(ExecutionMode::Auto.workers_for(100) >= 1);
        assert_eq!(ExecutionMode::Sequential.workers_for(100), 1);
        assert_eq!(ExecutionMode::Parallel { workers: 4 }.workers_for(2), 2);
        assert_eq!(ExecutionMode::Parallel { workers: 0 }.workers_for(10), 1);
    }

    #[test]
    fn test_run_partitions_dataset() {
        let store = WaveformStore::from_captures(dataset(20));
        let result = BatchRunner::new(config()).unwrap().run(&store).unwrap();

        assert_eq!(result.classification.len(), 20);
        assert_eq!(result.classification.count(Category::Afterpulse), 5);
        assert_eq!(result.classification.count(Category::Accepted), 15);
        assert_eq!(result.total_valid_peaks, 25);
        assert_eq!(result.afterpulse_intervals.len(), 5);
        assert!(result.afterpulse_band.is_some());
        assert!(result.accepted_baseline.is_some());
        assert!(result.excluded.is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let store = WaveformStore::from_captures(dataset(60));
        let sequential = BatchRunner::new(config())
            .unwrap()
            .with_execution(ExecutionMode::Sequential)
            .run(&store)
            .unwrap();
        let parallel = BatchRunner::new(config())
            .unwrap()
            .with_execution(ExecutionMode::Parallel { workers: 4 })
            .run(&store)
            .unwrap();

        assert_eq!(sequential.thresholds, parallel.thresholds);
        assert_eq!(sequential.total_valid_peaks, parallel.total_valid_peaks);
        for category in Category::ALL {
            assert_eq!(
                sequential.classification.list(category),
                parallel.classification.list(category)
            );
        }
    }

    #[test]
    fn test_failing_capture_excluded() {
        let mut captures = dataset(5);
        captures.push(Capture::new("empty.txt", 0.0, Vec::new()));
        let store = WaveformStore::from_captures(captures);
        let result = BatchRunner::new(config()).unwrap().run(&store).unwrap();

        assert_eq!(result.classification.len(), 5);
        assert_eq!(result.excluded, vec!["empty.txt".to_string()]);
        assert_eq!(result.classification.category_of("empty.txt"), None);
    }

    #[test]
    fn test_empty_store_runs_with_fallbacks() {
        let store = WaveformStore::from_captures(Vec::new());
        let result = BatchRunner::new(config()).unwrap().run(&store).unwrap();
        assert!(result.classification.is_empty());
        assert_eq!(result.total_valid_peaks, 0);
        assert!(result.afterpulse_band.is_none());
        assert!(result.accepted_baseline.is_none());
    }
}
