use serde::Serialize;

use crate::config::AcquisitionConfig;
use crate::constants::{FALLBACK_BASELINE_HALF_WIDTH, FALLBACK_WINDOW_HALF_WIDTH};
use crate::signal_processing::{Band, central_band};
use crate::waveform::Capture;

/// Thresholds shared read-only by every capture of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatasetThresholds {
    /// Noise band (V); a peak at or below `baseline.high` is noise
    pub baseline: Band,
    /// Expected arrival time range of a primary pulse relative to the trigger (s)
    pub signal_window: Band,
}

/// Dataset-wide adaptive threshold estimation
///
/// The signal-arrival window is estimated first from each capture's time of
/// maximum. The baseline band is then taken from samples outside that window
/// only, so real pulses cannot bias the noise estimate.
pub struct ThresholdEstimator {
    acquisition: AcquisitionConfig,
    baseline_pct: f64,
    window_pct: f64,
}

impl ThresholdEstimator {
    pub fn new(acquisition: AcquisitionConfig, baseline_pct: f64, window_pct: f64) -> Self {
        Self {
            acquisition,
            baseline_pct,
            window_pct,
        }
    }

    pub fn estimate(&self, captures: &[&Capture]) -> DatasetThresholds {
        let times: Vec<f64> = captures
            .iter()
            .filter_map(|c| c.argmax())
            .map(|idx| self.acquisition.local_time(idx))
            .collect();

        let signal_window = self.signal_window(&times);
        let baseline = self.baseline(captures, signal_window);

        log::info!(
            "Signal window ({}%): {:.3} us to {:.3} us",
            self.window_pct,
            signal_window.low * 1e6,
            signal_window.high * 1e6
        );
        log::info!(
            "Baseline ({}%): {:.2} mV to {:.2} mV",
            self.baseline_pct,
            baseline.low * 1000.0,
            baseline.high * 1000.0
        );

        DatasetThresholds {
            baseline,
            signal_window,
        }
    }

    /// Central percentile band of the capture maxima times
    pub fn signal_window(&self, times_of_maximum: &[f64]) -> Band {
        central_band(times_of_maximum, self.window_pct).unwrap_or_else(|| {
            log::warn!("No capture maxima available, using default signal window");
            Band::around(0.0, FALLBACK_WINDOW_HALF_WIDTH)
        })
    }

    /// Central percentile band of all quiet-zone samples
    pub fn baseline(&self, captures: &[&Capture], signal_window: Band) -> Band {
        let quiet: Vec<f64> = captures
            .iter()
            .flat_map(|c| self.quiet_zone(c, signal_window))
            .collect();

        central_band(&quiet, self.baseline_pct).unwrap_or_else(|| {
            log::warn!("No quiet-zone samples available, using default baseline band");
            Band::around(0.0, FALLBACK_BASELINE_HALF_WIDTH)
        })
    }

    /// Samples before and after the signal window, concatenated
    pub fn quiet_zone<'a>(
        &self,
        capture: &'a Capture,
        signal_window: Band,
    ) -> impl Iterator<Item = f64> + 'a {
        let (start, end) = self.excluded_range(capture.len(), signal_window);
        capture.amplitudes[..start]
            .iter()
            .chain(capture.amplitudes[end..].iter())
            .copied()
    }

    /// Half-open sample range `[start, end)` whose times fall inside the window
    fn excluded_range(&self, len: usize, window: Band) -> (usize, usize) {
        // Window edges computed from sample times land within rounding of a sample
        const POSITION_TOLERANCE: f64 = 1e-6;
        let first = (self.acquisition.time_to_position(window.low) - POSITION_TOLERANCE).ceil();
        let last = (self.acquisition.time_to_position(window.high) + POSITION_TOLERANCE).floor();

        let start = first.clamp(0.0, len as f64) as usize;
        let end = (last + 1.0).clamp(start as f64, len as f64) as usize;
        (start, end)
    }
}
