use super::{CaptureRow, Formatter, RunSummary, fmt_opt};

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, row: &CaptureRow) -> String {
        let reasons: Vec<String> = row
            .rejections
            .iter()
            .map(|(sample, reason)| format!("{}: {}", sample, reason))
            .collect();
        format!(
            "{},{},{},{},{},{},\"{}\"",
            row.filename,
            row.category.as_str(),
            row.valid_peaks,
            row.all_peaks,
            fmt_opt(row.main_time_us, 4).unwrap_or_default(),
            fmt_opt(row.main_amplitude_mv, 3).unwrap_or_default(),
            reasons.join("; ").replace('"', "'")
        )
    }

    fn summary(&self, s: &RunSummary) -> String {
        format!(
            "# {},captures={},accepted={},afterpulse={},rejected={},rejected_afterpulse={},excluded={},total_valid_peaks={},baseline_mv={:.3}..{:.3},window_us={:.4}..{:.4}",
            s.timestamp,
            s.captures,
            s.accepted,
            s.afterpulse,
            s.rejected,
            s.rejected_afterpulse,
            s.excluded,
            s.total_valid_peaks,
            s.baseline_low_mv,
            s.baseline_high_mv,
            s.signal_window_low_us,
            s.signal_window_high_us
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some("filename,category,valid_peaks,all_peaks,main_time_us,main_amplitude_mv,rejections")
    }
}
