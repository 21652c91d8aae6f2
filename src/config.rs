//! Configuration for a peak classification run.
//!
//! A run is driven by one immutable [`RunConfig`]: the analysis parameters
//! chosen by the user plus the acquisition geometry of the dataset. Nothing
//! in the pipeline mutates it, so analysing a second dataset (e.g. for
//! comparison) is simply a second call with a second value.
//!
//! ```
//! use peakfinder::config::{AcquisitionConfig, AnalysisConfig, RunConfig};
//!
//! let mut analysis = AnalysisConfig::default();
//! analysis.baseline_pct = 90.0;
//! let config = RunConfig::new(analysis, AcquisitionConfig::default());
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_NUM_POINTS, DEFAULT_WINDOW_TIME};
use crate::error::{PeakFinderError, Result};

/// Time specification in seconds
///
/// Parses plain seconds or a value with a unit suffix.
///
/// # Parsing formats
/// - `1e-7` or `1e-7s` - seconds
/// - `100ms` - milliseconds
/// - `0.2us` or `0.2µs` - microseconds
/// - `50ns` - nanoseconds
///
/// # Example
/// ```
/// use peakfinder::config::TimeValue;
///
/// let t: TimeValue = "0.2us".parse().unwrap();
/// assert!((t.as_secs() - 0.2e-6).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeValue(f64);

impl TimeValue {
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    pub fn as_micros(&self) -> f64 {
        self.0 * 1e6
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}us", self.as_micros())
    }
}

impl FromStr for TimeValue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        // Longest suffixes first so "ms" is not read as "s"
        let units: [(&str, f64); 6] = [
            ("ns", 1e-9),
            ("us", 1e-6),
            ("µs", 1e-6),
            ("μs", 1e-6),
            ("ms", 1e-3),
            ("s", 1.0),
        ];

        let (num, scale) = units
            .iter()
            .find_map(|(suffix, scale)| s.strip_suffix(suffix).map(|n| (n, *scale)))
            .unwrap_or((s, 1.0));

        let value: f64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid time: {}", s))?;
        if !value.is_finite() || value < 0.0 {
            return Err("time must be a non-negative number".to_string());
        }
        Ok(Self(value * scale))
    }
}

/// Analysis parameters for one batch run
///
/// Percentages are in the 0-100 range. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Detection prominence as a percentage of the dataset amplitude range
    pub prominence_pct: f64,
    /// Minimum pulse width at half prominence in seconds
    pub width_time: f64,
    /// Minimum spacing between peaks in seconds
    pub min_dist_time: f64,
    /// Central percentile covered by the baseline noise band
    pub baseline_pct: f64,
    /// Central percentile of capture maxima covered by the signal-arrival window
    pub max_dist_pct: f64,
    /// Central percentile of afterpulse intervals reported as the afterpulse band
    pub afterpulse_pct: f64,
    /// Negative trigger level for perturbation detection in millivolts
    pub negative_trigger_mv: f64,
    /// Report rejected multi-peak captures in their own category
    pub split_rejected_afterpulse: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            prominence_pct: 2.0,
            width_time: 0.2e-6,
            min_dist_time: 0.05e-6,
            baseline_pct: 85.0,
            max_dist_pct: 99.0,
            afterpulse_pct: 80.0,
            negative_trigger_mv: -10.0,
            split_rejected_afterpulse: false,
        }
    }
}

impl AnalysisConfig {
    /// Negative trigger level in volts
    pub fn negative_trigger_volts(&self) -> f64 {
        self.negative_trigger_mv / 1000.0
    }
}

/// Acquisition geometry shared by every capture of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Duration of one capture window in seconds
    pub window_time: f64,
    /// Nominal number of samples per capture
    pub num_points: usize,
    /// Oscilloscope trigger level in volts, if recorded
    pub trigger_voltage: Option<f64>,
    /// Oscilloscope sample rate in samples per second, if recorded
    pub sample_rate: Option<f64>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            window_time: DEFAULT_WINDOW_TIME,
            num_points: DEFAULT_NUM_POINTS,
            trigger_voltage: None,
            sample_rate: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn new(window_time: f64, num_points: usize) -> Self {
        Self {
            window_time,
            num_points,
            ..Self::default()
        }
    }

    /// Time between consecutive samples in seconds
    pub fn sample_period(&self) -> f64 {
        self.window_time / self.num_points as f64
    }

    /// Time of sample `index` relative to the trigger (window centre)
    pub fn local_time(&self, index: usize) -> f64 {
        index as f64 * self.sample_period() - self.window_time / 2.0
    }

    /// Fractional sample position of a time relative to the trigger
    pub fn time_to_position(&self, time: f64) -> f64 {
        (time + self.window_time / 2.0) / self.sample_period()
    }

    /// Convert a duration to a whole number of samples (truncating)
    pub fn duration_to_samples(&self, duration: f64) -> usize {
        (duration / self.sample_period()).floor().max(0.0) as usize
    }
}

/// Complete, immutable configuration of one run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunConfig {
    pub analysis: AnalysisConfig,
    pub acquisition: AcquisitionConfig,
}

impl RunConfig {
    pub fn new(analysis: AnalysisConfig, acquisition: AcquisitionConfig) -> Self {
        Self {
            analysis,
            acquisition,
        }
    }

    /// Reject structurally invalid configurations before any capture is touched
    pub fn validate(&self) -> Result<()> {
        let acq = &self.acquisition;
        if !acq.window_time.is_finite() || acq.window_time <= 0.0 {
            return Err(PeakFinderError::Config(format!(
                "window time must be positive, got {}",
                acq.window_time
            )));
        }
        if acq.num_points == 0 {
            return Err(PeakFinderError::Config(
                "number of points must be positive".to_string(),
            ));
        }
        let period = acq.sample_period();
        if !period.is_finite() || period <= 0.0 {
            return Err(PeakFinderError::Config(format!(
                "sample period must be positive, got {}",
                period
            )));
        }

        let a = &self.analysis;
        for (name, value) in [
            ("baseline percentile", a.baseline_pct),
            ("max-dist percentile", a.max_dist_pct),
            ("afterpulse percentile", a.afterpulse_pct),
        ] {
            check_percentage(name, value)?;
        }
        check_percentage("prominence percentage", a.prominence_pct)?;

        for (name, value) in [
            ("minimum width", a.width_time),
            ("minimum distance", a.min_dist_time),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PeakFinderError::Config(format!(
                    "{} must be a non-negative time, got {}",
                    name, value
                )));
            }
        }

        if !a.negative_trigger_mv.is_finite() {
            return Err(PeakFinderError::Config(
                "negative trigger must be finite".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_percentage(name: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(PeakFinderError::Config(format!(
            "{} must be between 0 and 100, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_value_plain_seconds() {
        let t: TimeValue = "1e-7".parse().unwrap();
        assert!((t.as_secs() - 1e-7).abs() < 1e-18);

        let t: TimeValue = "2s".parse().unwrap();
        assert!((t.as_secs() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_time_value_suffixes() {
        let t: TimeValue = "0.2us".parse().unwrap();
        assert!((t.as_secs() - 0.2e-6).abs() < 1e-15);

        let t: TimeValue = "0.2µs".parse().unwrap();
        assert!((t.as_secs() - 0.2e-6).abs() < 1e-15);

        let t: TimeValue = "50ns".parse().unwrap();
        assert!((t.as_secs() - 50e-9).abs() < 1e-15);

        let t: TimeValue = "100ms".parse().unwrap();
        assert!((t.as_secs() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_time_value_invalid() {
        assert!("abc".parse::<TimeValue>().is_err());
        assert!("-5us".parse::<TimeValue>().is_err());
        assert!("us".parse::<TimeValue>().is_err());
    }

    #[test]
    fn test_sample_period_and_local_time() {
        let acq = AcquisitionConfig::new(5e-6, 1000);
        assert!((acq.sample_period() - 5e-9).abs() < 1e-18);
        assert!((acq.local_time(0) + 2.5e-6).abs() < 1e-15);
        assert!(acq.local_time(500).abs() < 1e-15);
        assert!((acq.time_to_position(0.0) - 500.0).abs() < 1e-9);
        assert_eq!(acq.duration_to_samples(0.2e-6), 40);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_percentile_rejected() {
        let mut config = RunConfig::default();
        config.analysis.baseline_pct = 120.0;
        assert!(matches!(
            config.validate(),
            Err(PeakFinderError::Config(_))
        ));

        let mut config = RunConfig::default();
        config.analysis.max_dist_pct = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_acquisition_rejected() {
        let mut config = RunConfig::default();
        config.acquisition.window_time = 0.0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.acquisition.num_points = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analysis_config_from_toml() {
        let config: AnalysisConfig =
            toml::from_str("baseline_pct = 90.0\nnegative_trigger_mv = -15.0\n").unwrap();
        assert_eq!(config.baseline_pct, 90.0);
        assert_eq!(config.negative_trigger_mv, -15.0);
        assert_eq!(config.max_dist_pct, 99.0);
    }
}
