mod csv;
mod json;
mod text;

use chrono::Utc;
use serde::Serialize;

use crate::analysis::{CaptureResult, Category, RunResult};
use crate::config::AcquisitionConfig;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Text,
    Csv,
    Json,
}

/// One report line per capture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureRow {
    pub filename: String,
    pub category: Category,
    pub valid_peaks: usize,
    pub all_peaks: usize,
    /// Main peak time relative to the trigger (us)
    pub main_time_us: Option<f64>,
    /// Main peak amplitude (mV)
    pub main_amplitude_mv: Option<f64>,
    /// `(sample, reason)` for every rejected candidate
    pub rejections: Vec<(usize, String)>,
}

impl CaptureRow {
    pub fn new(result: &CaptureResult, acquisition: &AcquisitionConfig) -> Self {
        Self {
            filename: result.filename.clone(),
            category: result.category,
            valid_peaks: result.peaks.valid_peaks.len(),
            all_peaks: result.peaks.all_peaks.len(),
            main_time_us: result.main_peak.map(|p| acquisition.local_time(p) * 1e6),
            main_amplitude_mv: result.main_peak.map(|p| result.amplitudes[p] * 1000.0),
            rejections: result
                .peaks
                .rejection_reasons
                .iter()
                .map(|(&p, reason)| (p, reason.to_string()))
                .collect(),
        }
    }
}

/// Dataset-level figures of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub captures: usize,
    pub accepted: usize,
    pub afterpulse: usize,
    pub rejected: usize,
    pub rejected_afterpulse: usize,
    pub excluded: usize,
    pub total_valid_peaks: usize,
    pub prominence_mv: f64,
    pub baseline_low_mv: f64,
    pub baseline_high_mv: f64,
    pub signal_window_low_us: f64,
    pub signal_window_high_us: f64,
    pub afterpulse_band_us: Option<(f64, f64)>,
    pub accepted_baseline_width_mv: Option<f64>,
}

impl RunSummary {
    pub fn new(run: &RunResult) -> Self {
        let c = &run.classification;
        let t = &run.thresholds;
        Self {
            timestamp: iso8601_timestamp(),
            captures: c.len(),
            accepted: c.count(Category::Accepted),
            afterpulse: c.count(Category::Afterpulse),
            rejected: c.count(Category::Rejected),
            rejected_afterpulse: c.count(Category::RejectedAfterpulse),
            excluded: run.excluded.len(),
            total_valid_peaks: run.total_valid_peaks,
            prominence_mv: run.prominence * 1000.0,
            baseline_low_mv: t.baseline.low * 1000.0,
            baseline_high_mv: t.baseline.high * 1000.0,
            signal_window_low_us: t.signal_window.low * 1e6,
            signal_window_high_us: t.signal_window.high * 1e6,
            afterpulse_band_us: run.afterpulse_band.map(|b| (b.low * 1e6, b.high * 1e6)),
            accepted_baseline_width_mv: run.accepted_baseline.map(|b| b.width() * 1000.0),
        }
    }
}

pub trait Formatter: Send {
    fn format(&self, row: &CaptureRow) -> String;

    fn summary(&self, summary: &RunSummary) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: ReportFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        ReportFormat::Text => Box::new(TextFormatter::new(verbose)),
        ReportFormat::Json => Box::new(JsonFormatter),
        ReportFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Full report: optional header, one line per capture in dataset order, summary
pub fn render_report(formatter: &dyn Formatter, run: &RunResult) -> Vec<String> {
    let mut lines = Vec::with_capacity(run.classification.len() + 2);
    if let Some(header) = formatter.header() {
        lines.push(header.to_string());
    }
    for result in run.classification.all() {
        lines.push(formatter.format(&CaptureRow::new(result, &run.acquisition)));
    }
    lines.push(formatter.summary(&RunSummary::new(run)));
    lines
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn fmt_opt(value: Option<f64>, precision: usize) -> Option<String> {
    value.map(|v| format!("{:.*}", precision, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ClassificationResult, DatasetThresholds, PeakSet, RejectionReason};
    use crate::signal_processing::Band;

    fn run() -> RunResult {
        let mut peaks = PeakSet {
            all_peaks: vec![500, 700],
            valid_peaks: vec![500, 700],
            ..Default::default()
        };
        peaks.reject(
            700,
            RejectionReason::BelowBaseline {
                amplitude: 0.001,
                baseline_high: 0.002,
            },
        );
        let mut amplitudes = vec![0.0; 1000];
        amplitudes[500] = 0.05;
        amplitudes[700] = 0.001;

        let mut classification = ClassificationResult::default();
        classification.push(CaptureResult {
            index: 0,
            filename: "run_001.txt".to_string(),
            trigger_time: 0.0,
            amplitudes,
            category: Category::Accepted,
            peaks,
            main_peak: Some(500),
            afterpulse_intervals: Vec::new(),
        });

        RunResult {
            acquisition: AcquisitionConfig::new(10e-6, 1000),
            classification,
            thresholds: DatasetThresholds {
                baseline: Band::new(-0.002, 0.002),
                signal_window: Band::new(-0.1e-6, 0.1e-6),
            },
            prominence: 0.001,
            total_valid_peaks: 1,
            afterpulse_intervals: Vec::new(),
            afterpulse_band: None,
            accepted_baseline: Some(Band::new(-0.001, 0.001)),
            excluded: vec!["bad.txt".to_string()],
        }
    }

    fn acquisition() -> AcquisitionConfig {
        AcquisitionConfig::new(10e-6, 1000)
    }

    #[test]
    fn test_capture_row() {
        let run = run();
        let row = CaptureRow::new(&run.classification.accepted[0], &acquisition());
        assert_eq!(row.valid_peaks, 1);
        assert_eq!(row.all_peaks, 2);
        assert!(row.main_time_us.unwrap().abs() < 1e-9);
        assert!((row.main_amplitude_mv.unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(row.rejections.len(), 1);
        assert_eq!(row.rejections[0].0, 700);
        assert!(row.rejections[0].1.starts_with("amplitude below baseline"));
    }

    #[test]
    fn test_summary() {
        let summary = RunSummary::new(&run());
        assert_eq!(summary.captures, 1);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.excluded, 1);
        assert!((summary.baseline_high_mv - 2.0).abs() < 1e-9);
        assert!((summary.accepted_baseline_width_mv.unwrap() - 2.0).abs() < 1e-9);
        assert!(summary.afterpulse_band_us.is_none());
    }

    #[test]
    fn test_render_report_all_formats() {
        let run = run();
        for format in [ReportFormat::Text, ReportFormat::Csv, ReportFormat::Json] {
            let formatter = create_formatter(format, true);
            let lines = render_report(formatter.as_ref(), &run);
            let expected = if formatter.header().is_some() { 3 } else { 2 };
            assert_eq!(lines.len(), expected, "{:?}", format);
            assert!(lines.iter().any(|l| l.contains("run_001.txt")));
        }
    }

    #[test]
    fn test_timestamp_format() {
        let ts = iso8601_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), 24);
    }
}
