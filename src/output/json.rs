use serde_json::json;

use super::{CaptureRow, Formatter, RunSummary};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, row: &CaptureRow) -> String {
        let rejections: Vec<_> = row
            .rejections
            .iter()
            .map(|(sample, reason)| json!({ "sample": sample, "reason": reason }))
            .collect();
        json!({
            "filename": row.filename,
            "category": row.category.as_str(),
            "valid_peaks": row.valid_peaks,
            "all_peaks": row.all_peaks,
            "main_time_us": row.main_time_us,
            "main_amplitude_mv": row.main_amplitude_mv,
            "rejections": rejections,
        })
        .to_string()
    }

    fn summary(&self, s: &RunSummary) -> String {
        json!({ "summary": s }).to_string()
    }
}
