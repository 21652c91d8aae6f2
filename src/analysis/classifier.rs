use super::results::{Category, PeakSet, RejectionReason};
use super::thresholds::DatasetThresholds;
use crate::config::{AcquisitionConfig, AnalysisConfig};
use crate::error::{PeakFinderError, Result};
use crate::signal_processing::DownwardCrossingDetector;
use crate::waveform::Capture;

/// Classifier decision for one capture
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    pub peaks: PeakSet,
    pub main_peak: Option<usize>,
    pub afterpulse_intervals: Vec<f64>,
}

/// Pass-2 per-capture classification against dataset thresholds
///
/// Holds only copies of the run's read-only values, so one classifier can
/// be shared by reference across worker threads.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    thresholds: DatasetThresholds,
    acquisition: AcquisitionConfig,
    negative_trigger: f64,
    split_rejected_afterpulse: bool,
}

impl Classifier {
    pub fn new(
        thresholds: DatasetThresholds,
        acquisition: AcquisitionConfig,
        analysis: &AnalysisConfig,
    ) -> Self {
        Self {
            thresholds,
            acquisition,
            negative_trigger: analysis.negative_trigger_volts(),
            split_rejected_afterpulse: analysis.split_rejected_afterpulse,
        }
    }

    pub fn thresholds(&self) -> &DatasetThresholds {
        &self.thresholds
    }

    /// Classify one capture given its pass-1 peak set
    ///
    /// Perturbation is checked first and short-circuits everything else.
    /// The remaining valid peaks are filtered against the baseline, then
    /// the signal-arrival window decides the category.
    pub fn classify(&self, capture: &Capture, mut peaks: PeakSet) -> Result<Classification> {
        let Some((min, _)) = capture.extrema() else {
            return Err(PeakFinderError::CaptureAnalysis {
                file: capture.filename.clone(),
                reason: "empty amplitude sequence".to_string(),
            });
        };

        if let Some(crossings) = self.perturbation(&capture.amplitudes, min) {
            log::debug!(
                "{}: perturbation, {} crossings of {:.1} mV",
                capture.filename,
                crossings,
                self.negative_trigger * 1000.0
            );
            peaks.reject_all(RejectionReason::Perturbation { crossings });
            return Ok(Classification {
                category: Category::Rejected,
                peaks,
                main_peak: None,
                afterpulse_intervals: Vec::new(),
            });
        }

        let baseline_high = self.thresholds.baseline.high;
        for p in peaks.valid_peaks.clone() {
            let amplitude = capture.amplitudes[p];
            if amplitude <= baseline_high {
                log::trace!(
                    "{}: peak {} below baseline ({:.2} mV)",
                    capture.filename,
                    p,
                    amplitude * 1000.0
                );
                peaks.reject(
                    p,
                    RejectionReason::BelowBaseline {
                        amplitude,
                        baseline_high,
                    },
                );
            }
        }

        let window = self.thresholds.signal_window;
        let in_window = peaks
            .valid_peaks
            .iter()
            .any(|&p| window.contains(self.acquisition.local_time(p)));

        if !in_window {
            for p in peaks.valid_peaks.clone() {
                peaks.reject(
                    p,
                    RejectionReason::OutsideSignalWindow {
                        time: self.acquisition.local_time(p),
                        window,
                    },
                );
            }
            let category = if self.split_rejected_afterpulse && peaks.all_peaks.len() > 1 {
                Category::RejectedAfterpulse
            } else {
                Category::Rejected
            };
            log::debug!("{}: {}", capture.filename, category);
            return Ok(Classification {
                category,
                peaks,
                main_peak: None,
                afterpulse_intervals: Vec::new(),
            });
        }

        let main = main_peak(&peaks.valid_peaks, &capture.amplitudes);
        let (category, afterpulse_intervals) = match main {
            Some(main) if peaks.valid_peaks.len() > 1 => {
                let t_main = self.acquisition.local_time(main);
                let intervals = peaks
                    .valid_peaks
                    .iter()
                    .filter(|&&p| p != main)
                    .map(|&p| self.acquisition.local_time(p) - t_main)
                    .collect();
                (Category::Afterpulse, intervals)
            }
            _ => (Category::Accepted, Vec::new()),
        };
        log::debug!(
            "{}: {} with {} valid peaks",
            capture.filename,
            category,
            peaks.valid_peaks.len()
        );

        Ok(Classification {
            category,
            peaks,
            main_peak: main,
            afterpulse_intervals,
        })
    }

    /// Number of downward crossings when the capture is pathologically oscillating
    fn perturbation(&self, amplitudes: &[f64], min: f64) -> Option<usize> {
        if min >= self.negative_trigger {
            return None;
        }
        let crossings =
            DownwardCrossingDetector::new(self.negative_trigger).count_crossings(amplitudes);
        (crossings >= 2).then_some(crossings)
    }
}

/// Highest peak, the earliest on ties
pub fn main_peak(peaks: &[usize], amplitudes: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for &p in peaks {
        match best {
            Some(b) if amplitudes[p] <= amplitudes[b] => {}
            _ => best = Some(p),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_processing::Band;
    use approx::assert_relative_eq;

    // 1000 samples over 10 us: sample 500 sits at the trigger, 10 ns per sample
    fn acquisition() -> AcquisitionConfig {
        AcquisitionConfig::new(10e-6, 1000)
    }

    fn thresholds() -> DatasetThresholds {
        DatasetThresholds {
            baseline: Band::new(-0.002, 0.002),
            signal_window: Band::new(-0.5e-6, 0.5e-6),
        }
    }

    fn classifier(split: bool) -> Classifier {
        let analysis = AnalysisConfig {
            split_rejected_afterpulse: split,
            ..AnalysisConfig::default()
        };
        Classifier::new(thresholds(), acquisition(), &analysis)
    }

    fn peak_set(indices: &[usize]) -> PeakSet {
        PeakSet {
            all_peaks: indices.to_vec(),
            valid_peaks: indices.to_vec(),
            ..Default::default()
        }
    }

    fn capture_with(peaks: &[(usize, f64)]) -> Capture {
        let mut samples = vec![0.0; 1000];
        for &(i, a) in peaks {
            samples[i] = a;
        }
        Capture::new("c", 0.0, samples)
    }

    #[test]
    fn test_single_pulse_in_window_accepted() {
        let capture = capture_with(&[(510, 0.05)]);
        let result = classifier(false)
            .classify(&capture, peak_set(&[510]))
            .unwrap();
        assert_eq!(result.category, Category::Accepted);
        assert_eq!(result.peaks.valid_peaks, vec![510]);
        assert!(result.peaks.rejection_reasons.is_empty());
        assert_eq!(result.main_peak, Some(510));
    }

    #[test]
    fn test_later_pulse_outside_window_is_afterpulse() {
        let capture = capture_with(&[(500, 0.05), (800, 0.03)]);
        let result = classifier(false)
            .classify(&capture, peak_set(&[500, 800]))
            .unwrap();
        assert_eq!(result.category, Category::Afterpulse);
        assert_eq!(result.peaks.valid_peaks.len(), 2);
        assert_eq!(result.main_peak, Some(500));
        assert_eq!(result.afterpulse_intervals.len(), 1);
        assert_relative_eq!(result.afterpulse_intervals[0], 3e-6, epsilon = 1e-12);
    }

    #[test]
    fn test_noise_only_rejected_below_baseline() {
        let capture = capture_with(&[(200, 0.001), (600, 0.0015)]);
        let result = classifier(false)
            .classify(&capture, peak_set(&[200, 600]))
            .unwrap();
        assert_eq!(result.category, Category::Rejected);
        assert!(result.peaks.valid_peaks.is_empty());
        for p in [200, 600] {
            assert!(matches!(
                result.peaks.reason_for(p),
                Some(RejectionReason::BelowBaseline { .. })
            ));
        }
    }

    #[test]
    fn test_peak_at_baseline_edge_is_rejected() {
        let capture = capture_with(&[(500, 0.002)]);
        let result = classifier(false)
            .classify(&capture, peak_set(&[500]))
            .unwrap();
        assert_eq!(result.category, Category::Rejected);
    }

    #[test]
    fn test_three_crossings_is_perturbation() {
        let mut capture = capture_with(&[(500, 0.05), (700, 0.03)]);
        for i in [100, 300, 900] {
            capture.amplitudes[i] = -0.02;
        }
        let result = classifier(true)
            .classify(&capture, peak_set(&[500, 700]))
            .unwrap();
        assert_eq!(result.category, Category::Rejected);
        assert!(result.peaks.valid_peaks.is_empty());
        assert_eq!(result.peaks.rejection_reasons.len(), 2);
        assert!(
            result
                .peaks
                .rejection_reasons
                .values()
                .all(|r| *r == RejectionReason::Perturbation { crossings: 3 })
        );
    }

    #[test]
    fn test_single_negative_excursion_tolerated() {
        let mut capture = capture_with(&[(500, 0.05)]);
        for i in 100..110 {
            capture.amplitudes[i] = -0.03;
        }
        let result = classifier(false)
            .classify(&capture, peak_set(&[500]))
            .unwrap();
        assert_eq!(result.category, Category::Accepted);
    }

    #[test]
    fn test_minimum_above_trigger_never_perturbed() {
        let mut capture = capture_with(&[(500, 0.05)]);
        for i in [100, 300, 900] {
            capture.amplitudes[i] = -0.0099;
        }
        let result = classifier(false)
            .classify(&capture, peak_set(&[500]))
            .unwrap();
        assert_eq!(result.category, Category::Accepted);
    }

    #[test]
    fn test_outside_window_rejected_and_tagged() {
        let capture = capture_with(&[(100, 0.05)]);
        let result = classifier(false)
            .classify(&capture, peak_set(&[100]))
            .unwrap();
        assert_eq!(result.category, Category::Rejected);
        assert!(result.peaks.valid_peaks.is_empty());
        assert!(matches!(
            result.peaks.reason_for(100),
            Some(RejectionReason::OutsideSignalWindow { .. })
        ));
    }

    #[test]
    fn test_split_rejected_afterpulse() {
        let capture = capture_with(&[(100, 0.05), (150, 0.001)]);
        let rejected = classifier(false)
            .classify(&capture, peak_set(&[100, 150]))
            .unwrap();
        assert_eq!(rejected.category, Category::Rejected);

        let split = classifier(true)
            .classify(&capture, peak_set(&[100, 150]))
            .unwrap();
        assert_eq!(split.category, Category::RejectedAfterpulse);
    }

    #[test]
    fn test_no_peaks_rejected_without_reasons() {
        let capture = capture_with(&[]);
        let result = classifier(true).classify(&capture, PeakSet::default()).unwrap();
        assert_eq!(result.category, Category::Rejected);
        assert!(result.peaks.rejection_reasons.is_empty());
    }

    #[test]
    fn test_main_peak_tie_goes_to_earliest() {
        let capture = capture_with(&[(480, 0.05), (520, 0.05)]);
        let result = classifier(false)
            .classify(&capture, peak_set(&[480, 520]))
            .unwrap();
        assert_eq!(result.category, Category::Afterpulse);
        assert_eq!(result.main_peak, Some(480));
        assert_relative_eq!(result.afterpulse_intervals[0], 0.4e-6, epsilon = 1e-12);
    }

    #[test]
    fn test_main_peak_is_highest_even_if_later() {
        let capture = capture_with(&[(480, 0.03), (520, 0.06)]);
        let result = classifier(false)
            .classify(&capture, peak_set(&[480, 520]))
            .unwrap();
        assert_eq!(result.main_peak, Some(520));
        assert!(result.afterpulse_intervals[0] < 0.0);
    }

    #[test]
    fn test_empty_capture_is_error() {
        let capture = Capture::new("e", 0.0, Vec::new());
        assert!(
            classifier(false)
                .classify(&capture, PeakSet::default())
                .is_err()
        );
    }
}
