use super::results::{PeakSet, RejectionReason};
use crate::config::RunConfig;
use crate::constants::{FALLBACK_AMPLITUDE_RANGE, SATURATION_FRACTION};
use crate::error::{PeakFinderError, Result};
use crate::signal_processing::{PeakDetector, merge_saturated};
use crate::waveform::Capture;

/// Self-contained parameters of the per-capture detection stage
///
/// Derived once from the run configuration and dataset extrema, then copied
/// into every worker so no worker reads shared state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Minimum prominence (V)
    pub prominence: f64,
    /// Minimum width at half prominence (samples)
    pub min_width_samples: f64,
    /// Minimum spacing between peaks (samples, at least 1)
    pub min_distance_samples: usize,
    /// Amplitude at or above which a candidate is saturated (V)
    pub saturation_threshold: f64,
}

impl DetectionParams {
    /// Derive detection parameters from the configuration and dataset extrema
    ///
    /// Without usable extrema the prominence falls back to a fixed amplitude
    /// range and saturation merging is disabled.
    pub fn derive(config: &RunConfig, extrema: Option<(f64, f64)>) -> Self {
        let acq = &config.acquisition;
        let analysis = &config.analysis;

        let range = extrema
            .map(|(lo, hi)| hi - lo)
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(FALLBACK_AMPLITUDE_RANGE);

        let saturation_threshold = match extrema {
            Some((_, hi)) if hi > 0.0 => hi * SATURATION_FRACTION,
            _ => f64::INFINITY,
        };

        Self {
            prominence: analysis.prominence_pct / 100.0 * range,
            min_width_samples: acq.duration_to_samples(analysis.width_time) as f64,
            min_distance_samples: acq.duration_to_samples(analysis.min_dist_time).max(1),
            saturation_threshold,
        }
    }
}

/// Pass-1 detection of one capture
///
/// Raw peak search, then saturation merge on the unfiltered candidates,
/// then the width filter. Baseline and window filters are left to the
/// classifier because they need dataset-wide thresholds.
pub fn detect_capture(capture: &Capture, params: &DetectionParams) -> Result<PeakSet> {
    if capture.is_empty() {
        return Err(PeakFinderError::CaptureAnalysis {
            file: capture.filename.clone(),
            reason: "empty amplitude sequence".to_string(),
        });
    }
    if let Some(i) = capture.amplitudes.iter().position(|v| !v.is_finite()) {
        return Err(PeakFinderError::CaptureAnalysis {
            file: capture.filename.clone(),
            reason: format!("non-finite sample at index {}", i),
        });
    }

    let detector = PeakDetector::new(params.prominence, params.min_distance_samples);
    let mut peaks = PeakSet::from_properties(detector.detect(&capture.amplitudes));

    let merge = merge_saturated(
        &peaks.all_peaks,
        &capture.amplitudes,
        params.saturation_threshold,
    );
    if !merge.merged.is_empty() {
        let survivor = merge
            .kept
            .iter()
            .copied()
            .find(|&p| capture.amplitudes[p] >= params.saturation_threshold)
            .unwrap_or_default();
        log::debug!(
            "{}: merged {} saturated duplicates into peak {}",
            capture.filename,
            merge.merged.len(),
            survivor
        );
        for &p in &merge.merged {
            peaks.reject(p, RejectionReason::SaturationMerge { survivor });
        }
    }

    let candidates = peaks.valid_peaks.clone();
    for p in candidates {
        let width = peaks
            .properties_of(p)
            .and_then(|props| props.width)
            .map(|w| w.width);
        if let Some(width) = width
            && width < params.min_width_samples
        {
            log::trace!("{}: peak {} too narrow ({:.1})", capture.filename, p, width);
            peaks.reject(
                p,
                RejectionReason::WidthBelowMinimum {
                    width,
                    min_width: params.min_width_samples,
                },
            );
        }
    }

    Ok(peaks)
}
