//! Oscilloscope metadata (`DATA.txt`) reader
//!
//! The acquisition software writes one `key: value unit` pair per line.
//! Only the keys needed to place samples on a timeline are read; unknown
//! lines are ignored.

use std::fs;
use std::path::Path;

use crate::config::AcquisitionConfig;
use crate::constants::{
    DEFAULT_NUM_POINTS, DEFAULT_WINDOW_TIME, DIVISIONS_PER_WINDOW, METADATA_FILE_NAME,
};
use crate::error::{PeakFinderError, Result};

const KEY_TIME_BASE: &str = "Time base scale:";
const KEY_TRIGGER: &str = "Trigger (0.5PE):";
const KEY_SAMPLE_RATE: &str = "Resolucion(SRATE):";
const KEY_NUM_POINTS: &str = "Num de puntos(real):";

/// Values found in a metadata file; absent keys stay `None`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AcquisitionMetadata {
    pub time_base_scale: Option<f64>,
    pub trigger_voltage: Option<f64>,
    pub sample_rate: Option<f64>,
    pub num_points: Option<usize>,
}

impl AcquisitionMetadata {
    /// Parse metadata text
    ///
    /// Lines whose value cannot be parsed are logged and skipped.
    pub fn parse(content: &str) -> Self {
        let mut meta = Self::default();

        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(v) = value_after(line, KEY_TIME_BASE) {
                meta.time_base_scale = parse_or_warn(v, KEY_TIME_BASE);
            } else if let Some(v) = value_after(line, KEY_TRIGGER) {
                meta.trigger_voltage = parse_or_warn(v, KEY_TRIGGER);
            } else if let Some(v) = value_after(line, KEY_SAMPLE_RATE) {
                meta.sample_rate = parse_or_warn(v, KEY_SAMPLE_RATE);
            } else if let Some(v) = value_after(line, KEY_NUM_POINTS) {
                meta.num_points = parse_or_warn::<f64>(v, KEY_NUM_POINTS)
                    .filter(|n| *n >= 1.0)
                    .map(|n| n as usize);
            }
        }

        meta
    }

    pub fn from_acquisition(acquisition: &AcquisitionConfig) -> Self {
        Self {
            time_base_scale: Some(acquisition.window_time / DIVISIONS_PER_WINDOW),
            trigger_voltage: acquisition.trigger_voltage,
            sample_rate: acquisition.sample_rate,
            num_points: Some(acquisition.num_points),
        }
    }

    /// Render in the acquisition software's layout; absent values are omitted
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some(v) = self.time_base_scale {
            out.push_str(&format!("{} {:e} s\n", KEY_TIME_BASE, v));
        }
        if let Some(v) = self.trigger_voltage {
            out.push_str(&format!("{} {} v\n", KEY_TRIGGER, v));
        }
        if let Some(v) = self.sample_rate {
            out.push_str(&format!("{} {:.1} Sa/s\n", KEY_SAMPLE_RATE, v));
        }
        if let Some(n) = self.num_points {
            out.push_str(&format!("{} {}\n", KEY_NUM_POINTS, n));
        }
        out
    }

    /// Window duration: the screen spans ten time-base divisions
    pub fn window_time(&self) -> Option<f64> {
        self.time_base_scale.map(|s| s * DIVISIONS_PER_WINDOW)
    }

    /// Build the acquisition geometry
    ///
    /// `fallback_points` is used when the metadata does not record a sample
    /// count (typically the length of the first parsed capture).
    pub fn to_acquisition(&self, fallback_points: Option<usize>) -> AcquisitionConfig {
        AcquisitionConfig {
            window_time: self.window_time().unwrap_or(DEFAULT_WINDOW_TIME),
            num_points: self
                .num_points
                .or(fallback_points.filter(|n| *n > 0))
                .unwrap_or(DEFAULT_NUM_POINTS),
            trigger_voltage: self.trigger_voltage,
            sample_rate: self.sample_rate,
        }
    }
}

/// Read `DATA.txt` from a dataset directory
///
/// Returns `Ok(None)` when the directory has no metadata file.
pub fn read_metadata(dir: &Path) -> Result<Option<AcquisitionMetadata>> {
    let path = dir.join(METADATA_FILE_NAME);
    if !path.exists() {
        log::warn!("{} not found in {}", METADATA_FILE_NAME, dir.display());
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|source| PeakFinderError::Io {
        path: path.clone(),
        source,
    })?;
    let meta = AcquisitionMetadata::parse(&content);

    log::info!(
        "Loaded {}: time base {:?} s, trigger {:?} V, points {:?}",
        METADATA_FILE_NAME,
        meta.time_base_scale,
        meta.trigger_voltage,
        meta.num_points
    );

    Ok(Some(meta))
}

fn value_after<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.find(key).map(|pos| line[pos + key.len()..].trim())
}

/// First whitespace-separated token, unit suffix dropped
fn parse_or_warn<T: std::str::FromStr>(value: &str, key: &str) -> Option<T> {
    let token = value.split_whitespace().next()?;
    match token.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring unparsable metadata value '{}' for '{}'", value, key);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Time base scale: 5e-07 s
Trigger (0.5PE): 0.004 v
Resolucion(SRATE): 50000000.0 Sa/s
Num de puntos(real): 4081
Operator: someone
";

    #[test]
    fn test_parse_all_keys() {
        let meta = AcquisitionMetadata::parse(SAMPLE);
        assert_eq!(meta.time_base_scale, Some(5e-7));
        assert_eq!(meta.trigger_voltage, Some(0.004));
        assert_eq!(meta.sample_rate, Some(50_000_000.0));
        assert_eq!(meta.num_points, Some(4081));
        assert!((meta.window_time().unwrap() - 5e-6).abs() < 1e-18);
    }

    #[test]
    fn test_missing_keys_fall_back() {
        let meta = AcquisitionMetadata::parse("Operator: someone\n");
        let acq = meta.to_acquisition(Some(1000));
        assert_eq!(acq.window_time, DEFAULT_WINDOW_TIME);
        assert_eq!(acq.num_points, 1000);

        let acq = meta.to_acquisition(None);
        assert_eq!(acq.num_points, DEFAULT_NUM_POINTS);
    }

    #[test]
    fn test_bad_value_ignored() {
        let meta = AcquisitionMetadata::parse("Time base scale: fast s\nNum de puntos(real): 2000.0\n");
        assert_eq!(meta.time_base_scale, None);
        assert_eq!(meta.num_points, Some(2000));
    }

    #[test]
    fn test_text_round_trip() {
        let mut acq = AcquisitionConfig::new(5e-6, 4081);
        acq.trigger_voltage = Some(0.004);
        acq.sample_rate = Some(5e8);
        let text = AcquisitionMetadata::from_acquisition(&acq).to_text();
        let back = AcquisitionMetadata::parse(&text).to_acquisition(None);

        assert!((back.window_time - 5e-6).abs() < 1e-15);
        assert_eq!(back.num_points, 4081);
        assert_eq!(back.trigger_voltage, Some(0.004));
        assert_eq!(back.sample_rate, Some(5e8));
    }
}
