use super::{CaptureRow, Formatter, RunSummary, fmt_opt};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, row: &CaptureRow) -> String {
        let main = match (row.main_time_us, row.main_amplitude_mv) {
            (Some(t), Some(a)) => format!(" main: {:>8.3} us {:>7.2} mV", t, a),
            _ => String::new(),
        };
        let mut line = format!(
            "{:<32} {:<19} peaks: {}/{}{}",
            row.filename,
            row.category.as_str(),
            row.valid_peaks,
            row.all_peaks,
            main
        );
        if self.verbose {
            for (sample, reason) in &row.rejections {
                line.push_str(&format!("\n    [{:>5}] {}", sample, reason));
            }
        }
        line
    }

    fn summary(&self, s: &RunSummary) -> String {
        let mut lines = vec![
            format!("=== Summary ({}) ===", s.timestamp),
            format!(
                "Captures: {} (accepted {}, afterpulse {}, rejected {}, rejected afterpulse {}, excluded {})",
                s.captures, s.accepted, s.afterpulse, s.rejected, s.rejected_afterpulse, s.excluded
            ),
            format!("Total valid peaks: {}", s.total_valid_peaks),
            format!("Prominence: {:.3} mV", s.prominence_mv),
            format!(
                "Baseline: {:.3} mV to {:.3} mV",
                s.baseline_low_mv, s.baseline_high_mv
            ),
            format!(
                "Signal window: {:.4} us to {:.4} us",
                s.signal_window_low_us, s.signal_window_high_us
            ),
        ];
        if let Some((lo, hi)) = s.afterpulse_band_us {
            lines.push(format!("Afterpulse band: {:.4} us to {:.4} us", lo, hi));
        }
        if let Some(width) = fmt_opt(s.accepted_baseline_width_mv, 3) {
            lines.push(format!("Accepted baseline width: {} mV", width));
        }
        lines.join("\n")
    }
}
