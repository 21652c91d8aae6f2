//! SiPM characterisation from the temporal distribution of detected pulses.
//!
//! Every valid peak of the accepted and afterpulse captures is placed on a
//! global timeline using the capture trigger time. Consecutive peaks give a
//! time difference and the amplitude of the later peak; the pair is then
//! classified into one of four quadrants split by an amplitude and a time
//! threshold:
//!
//! | | `Δt >= T` | `Δt < T` |
//! |---|---|---|
//! | `A < A_th` | dark count | afterpulse |
//! | `A >= A_th` | crosstalk | afterpulse + crosstalk |

use serde::Serialize;

use super::results::RunResult;

/// One pulse on the global timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimedPeak {
    /// Absolute time (s)
    pub time: f64,
    /// Amplitude (V)
    pub amplitude: f64,
    pub filename: String,
    pub sample: usize,
}

/// Consecutive-peak intervals of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalDistribution {
    /// Time from each peak to the next one (s)
    pub delta_t: Vec<f64>,
    /// Amplitude of the later peak of each pair (mV)
    pub amplitudes_mv: Vec<f64>,
    /// The later peak of each pair
    pub peaks: Vec<TimedPeak>,
}

impl TemporalDistribution {
    pub fn len(&self) -> usize {
        self.delta_t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delta_t.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    DarkCount,
    Afterpulse,
    Crosstalk,
    AfterpulseCrosstalk,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SiPMMetrics {
    pub total_events: usize,
    pub dcr_count: usize,
    pub afterpulse_count: usize,
    pub crosstalk_count: usize,
    pub afterpulse_crosstalk_count: usize,

    pub afterpulse_pct: f64,
    pub crosstalk_pct: f64,
    pub afterpulse_crosstalk_pct: f64,

    /// Dark count rate as count over summed dark intervals (Hz)
    pub dcr_rate_total_hz: f64,
    /// Dark count rate as inverse of the mean dark interval (Hz)
    pub dcr_rate_avg_hz: f64,

    pub amplitude_threshold_mv: f64,
    pub time_threshold_s: f64,
}

/// Quadrant classifier for consecutive-pulse intervals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiPMAnalyzer {
    pub amplitude_threshold_mv: f64,
    pub time_threshold_s: f64,
}

impl Default for SiPMAnalyzer {
    fn default() -> Self {
        Self {
            amplitude_threshold_mv: 60.0,
            time_threshold_s: 100e-6,
        }
    }
}

impl SiPMAnalyzer {
    pub fn new(amplitude_threshold_mv: f64, time_threshold_s: f64) -> Self {
        Self {
            amplitude_threshold_mv,
            time_threshold_s,
        }
    }

    pub fn quadrant(&self, delta_t: f64, amplitude_mv: f64) -> Quadrant {
        let late = delta_t >= self.time_threshold_s;
        let high = amplitude_mv >= self.amplitude_threshold_mv;
        match (late, high) {
            (true, false) => Quadrant::DarkCount,
            (false, false) => Quadrant::Afterpulse,
            (true, true) => Quadrant::Crosstalk,
            (false, true) => Quadrant::AfterpulseCrosstalk,
        }
    }

    pub fn analyze(&self, delta_t: &[f64], amplitudes_mv: &[f64]) -> SiPMMetrics {
        let mut metrics = SiPMMetrics {
            amplitude_threshold_mv: self.amplitude_threshold_mv,
            time_threshold_s: self.time_threshold_s,
            ..Default::default()
        };

        let mut dcr_intervals = Vec::new();
        for (&dt, &amp) in delta_t.iter().zip(amplitudes_mv) {
            metrics.total_events += 1;
            match self.quadrant(dt, amp) {
                Quadrant::DarkCount => {
                    metrics.dcr_count += 1;
                    dcr_intervals.push(dt);
                }
                Quadrant::Afterpulse => metrics.afterpulse_count += 1,
                Quadrant::Crosstalk => metrics.crosstalk_count += 1,
                Quadrant::AfterpulseCrosstalk => metrics.afterpulse_crosstalk_count += 1,
            }
        }

        if metrics.total_events == 0 {
            return metrics;
        }

        let total = metrics.total_events as f64;
        metrics.afterpulse_pct = metrics.afterpulse_count as f64 / total * 100.0;
        metrics.crosstalk_pct = metrics.crosstalk_count as f64 / total * 100.0;
        metrics.afterpulse_crosstalk_pct =
            metrics.afterpulse_crosstalk_count as f64 / total * 100.0;

        if !dcr_intervals.is_empty() {
            let sum: f64 = dcr_intervals.iter().sum();
            if sum > 0.0 {
                metrics.dcr_rate_total_hz = dcr_intervals.len() as f64 / sum;
            }
            let mean = sum / dcr_intervals.len() as f64;
            if mean > 0.0 {
                metrics.dcr_rate_avg_hz = 1.0 / mean;
            }
        }

        metrics
    }
}

/// Valid peaks of accepted and afterpulse captures on the global timeline
///
/// Sorted by time; equal times keep dataset order.
pub fn timed_peaks(run: &RunResult) -> Vec<TimedPeak> {
    let acquisition = &run.acquisition;
    let period = acquisition.sample_period();
    let mut peaks: Vec<TimedPeak> = run
        .classification
        .accepted
        .iter()
        .chain(run.classification.afterpulse.iter())
        .flat_map(|r| {
            let start = r.trigger_time - acquisition.window_time / 2.0;
            r.peaks.valid_peaks.iter().map(move |&p| TimedPeak {
                time: start + p as f64 * period,
                amplitude: r.amplitudes[p],
                filename: r.filename.clone(),
                sample: p,
            })
        })
        .collect();
    peaks.sort_by(|a, b| a.time.total_cmp(&b.time));
    peaks
}

/// Consecutive time differences between the run's valid peaks
///
/// Fewer than two peaks give an empty distribution.
pub fn temporal_distribution(run: &RunResult) -> TemporalDistribution {
    let peaks = timed_peaks(run);
    if peaks.len() < 2 {
        log::warn!("Not enough peaks for a temporal distribution");
        return TemporalDistribution::default();
    }

    let mut dist = TemporalDistribution::default();
    for pair in peaks.windows(2) {
        dist.delta_t.push(pair[1].time - pair[0].time);
        dist.amplitudes_mv.push(pair[1].amplitude * 1000.0);
        dist.peaks.push(pair[1].clone());
    }
    dist
}
