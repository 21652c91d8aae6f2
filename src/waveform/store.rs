use std::path::Path;

use super::{Capture, CaptureSource, DirectorySource};
use crate::config::AcquisitionConfig;
use crate::constants::DISPLAY_MARGIN_FRACTION;
use crate::error::Result;

/// Parsed captures of one dataset plus lightweight dataset-wide statistics
///
/// Statistics are computed once at construction from every non-empty
/// capture. They seed threshold estimation and plot scaling; they are not
/// the final per-run thresholds.
#[derive(Debug, Clone, Default)]
pub struct WaveformStore {
    captures: Vec<Capture>,
    extrema: Option<(f64, f64)>,
    argmax_indices: Vec<usize>,
}

impl WaveformStore {
    /// Load every capture in `dir` whose file name matches `pattern`
    ///
    /// Malformed files are logged and skipped.
    pub fn load<P: AsRef<Path>>(dir: P, pattern: &str) -> Result<Self> {
        Self::from_source(&DirectorySource::new(dir, pattern))
    }

    pub fn from_source(source: &dyn CaptureSource) -> Result<Self> {
        Ok(Self::from_captures(source.list_captures()?))
    }

    pub fn from_captures(captures: Vec<Capture>) -> Self {
        let mut extrema: Option<(f64, f64)> = None;
        let mut argmax_indices = Vec::with_capacity(captures.len());

        // Captures with non-finite samples fail detection later; they must not
        // move the dataset statistics
        for capture in captures.iter().filter(|c| c.is_finite()) {
            if let Some((lo, hi)) = capture.extrema() {
                extrema = Some(match extrema {
                    Some((glo, ghi)) => (glo.min(lo), ghi.max(hi)),
                    None => (lo, hi),
                });
            }
            if let Some(idx) = capture.argmax() {
                argmax_indices.push(idx);
            }
        }

        if let Some((lo, hi)) = extrema {
            log::info!(
                "Loaded {} captures, amplitude {:.2} mV to {:.2} mV",
                captures.len(),
                lo * 1000.0,
                hi * 1000.0
            );
        } else {
            log::warn!("No usable samples in {} captures", captures.len());
        }

        Self {
            captures,
            extrema,
            argmax_indices,
        }
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Length of the first non-empty capture, used when metadata lacks a point count
    pub fn first_capture_len(&self) -> Option<usize> {
        self.captures.iter().map(Capture::len).find(|&n| n > 0)
    }

    /// Global minimum and maximum sample over all captures
    pub fn amplitude_extrema(&self) -> Option<(f64, f64)> {
        self.extrema
    }

    /// Extrema padded on both sides for plot scaling
    pub fn display_range(&self) -> Option<(f64, f64)> {
        self.extrema.map(|(lo, hi)| {
            let margin = (hi - lo) * DISPLAY_MARGIN_FRACTION;
            (lo - margin, hi + margin)
        })
    }

    /// Time of each capture's maximum relative to its trigger, in capture order
    pub fn times_of_maximum(&self, acquisition: &AcquisitionConfig) -> Vec<f64> {
        self.argmax_indices
            .iter()
            .map(|&idx| acquisition.local_time(idx))
            .collect()
    }
}
