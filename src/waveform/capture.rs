use std::fs;
use std::path::Path;

use crate::error::{PeakFinderError, Result};

/// One oscilloscope acquisition
///
/// Immutable after parsing. Sample `0` is the earliest sample of the window;
/// `trigger_time` is the absolute time of the window centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub filename: String,
    pub trigger_time: f64,
    pub amplitudes: Vec<f64>,
}

impl Capture {
    pub fn new(filename: impl Into<String>, trigger_time: f64, amplitudes: Vec<f64>) -> Self {
        Self {
            filename: filename.into(),
            trigger_time,
            amplitudes,
        }
    }

    /// Read and parse a capture file
    ///
    /// Unreadable files surface as [`PeakFinderError::CaptureParse`] so the
    /// loader can skip them like any other malformed file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let content = fs::read_to_string(path).map_err(|e| PeakFinderError::CaptureParse {
            file: filename.clone(),
            reason: e.to_string(),
        })?;

        Self::parse(&filename, &content)
    }

    /// Parse capture text
    ///
    /// Line 1 holds the trigger time, line 2 is a header/blank line that is
    /// skipped, every following non-blank line is one amplitude sample.
    pub fn parse(filename: &str, content: &str) -> Result<Self> {
        let parse_error = |reason: String| PeakFinderError::CaptureParse {
            file: filename.to_string(),
            reason,
        };

        let lines: Vec<&str> = content.lines().collect();
        if lines.len() < 3 {
            return Err(parse_error(format!(
                "file too short ({} lines, need at least 3)",
                lines.len()
            )));
        }

        let trigger_time = lines[0]
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .ok_or_else(|| parse_error(format!("invalid trigger time '{}'", lines[0].trim())))?;

        let amplitudes = lines[2..]
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 3, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .map(|(line_no, line)| {
                // `inf` and `NaN` parse as f64 but are not samples
                line.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        parse_error(format!("invalid sample '{}' on line {}", line, line_no))
                    })
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(Self {
            filename: filename.to_string(),
            trigger_time,
            amplitudes,
        })
    }

    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    /// True when every sample is a finite number
    pub fn is_finite(&self) -> bool {
        self.amplitudes.iter().all(|v| v.is_finite())
    }

    /// Minimum and maximum sample, `None` for an empty capture
    pub fn extrema(&self) -> Option<(f64, f64)> {
        if self.amplitudes.is_empty() {
            return None;
        }
        Some(self.amplitudes.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &v| (lo.min(v), hi.max(v)),
        ))
    }

    /// Index of the maximum sample (first occurrence wins)
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.amplitudes.iter().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }
}
