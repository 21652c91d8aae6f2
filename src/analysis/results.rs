//! Result types of a classification run.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::thresholds::DatasetThresholds;
use crate::config::AcquisitionConfig;
use crate::signal_processing::{Band, PeakProperties};

/// Output category of one capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Exactly one valid peak, inside the signal-arrival window
    Accepted,
    /// Several valid peaks, at least one inside the signal-arrival window
    Afterpulse,
    /// No primary pulse, or a perturbed capture
    Rejected,
    /// Rejected capture that had more than one candidate (optional split)
    RejectedAfterpulse,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Accepted,
        Category::Afterpulse,
        Category::Rejected,
        Category::RejectedAfterpulse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Accepted => "accepted",
            Category::Afterpulse => "afterpulse",
            Category::Rejected => "rejected",
            Category::RejectedAfterpulse => "rejected_afterpulse",
        }
    }

    /// Categories whose valid peaks count as detected pulses
    pub fn counts_peaks(&self) -> bool {
        matches!(self, Category::Accepted | Category::Afterpulse)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a candidate peak is not a valid pulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Duplicate detection of the saturated pulse at `survivor`
    SaturationMerge { survivor: usize },
    /// Width at half prominence below the minimum, both in samples
    WidthBelowMinimum { width: f64, min_width: f64 },
    /// Amplitude at or below the upper baseline edge, both in volts
    BelowBaseline { amplitude: f64, baseline_high: f64 },
    /// Valid amplitude but no primary pulse: peak time outside the window
    OutsideSignalWindow { time: f64, window: Band },
    /// Whole capture invalidated by repeated negative-trigger crossings
    Perturbation { crossings: usize },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::SaturationMerge { survivor } => {
                write!(f, "saturation merge (duplicate of peak at sample {})", survivor)
            }
            RejectionReason::WidthBelowMinimum { width, min_width } => write!(
                f,
                "width below minimum ({:.1} < {:.0} samples)",
                width, min_width
            ),
            RejectionReason::BelowBaseline {
                amplitude,
                baseline_high,
            } => write!(
                f,
                "amplitude below baseline by {:.2} mV ({:.2} mV <= {:.2} mV)",
                (baseline_high - amplitude) * 1000.0,
                amplitude * 1000.0,
                baseline_high * 1000.0
            ),
            RejectionReason::OutsideSignalWindow { time, window } => write!(
                f,
                "outside signal-arrival zone ({:.3} us not in [{:.3}, {:.3}] us)",
                time * 1e6,
                window.low * 1e6,
                window.high * 1e6
            ),
            RejectionReason::Perturbation { crossings } => write!(
                f,
                "perturbation: {} negative trigger crossings",
                crossings
            ),
        }
    }
}

/// Detection output for one capture under one configuration
///
/// `all_peaks` holds every raw candidate. `valid_peaks` is the subset still
/// considered a real pulse. Every candidate outside `valid_peaks` carries a
/// reason; rejection moves a peak out of `valid_peaks`, never back in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakSet {
    pub all_peaks: Vec<usize>,
    pub valid_peaks: Vec<usize>,
    pub rejection_reasons: BTreeMap<usize, RejectionReason>,
    pub properties: Vec<PeakProperties>,
}

impl PeakSet {
    /// Start from detector output with every candidate valid
    pub fn from_properties(properties: Vec<PeakProperties>) -> Self {
        let all_peaks: Vec<usize> = properties.iter().map(|p| p.index).collect();
        Self {
            valid_peaks: all_peaks.clone(),
            all_peaks,
            rejection_reasons: BTreeMap::new(),
            properties,
        }
    }

    /// Move `peak` out of the valid set, recording why
    pub fn reject(&mut self, peak: usize, reason: RejectionReason) {
        self.valid_peaks.retain(|&p| p != peak);
        self.rejection_reasons.insert(peak, reason);
    }

    /// Reject every candidate with the same reason
    pub fn reject_all(&mut self, reason: RejectionReason) {
        self.valid_peaks.clear();
        for &p in &self.all_peaks {
            self.rejection_reasons.insert(p, reason);
        }
    }

    pub fn properties_of(&self, peak: usize) -> Option<&PeakProperties> {
        self.properties.iter().find(|p| p.index == peak)
    }

    pub fn reason_for(&self, peak: usize) -> Option<&RejectionReason> {
        self.rejection_reasons.get(&peak)
    }

    /// Candidates that are not valid, increasing
    pub fn rejected_peaks(&self) -> Vec<usize> {
        self.all_peaks
            .iter()
            .copied()
            .filter(|p| !self.valid_peaks.contains(p))
            .collect()
    }
}

/// Final per-capture outcome
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    /// Position of the capture in the dataset
    pub index: usize,
    pub filename: String,
    pub trigger_time: f64,
    pub amplitudes: Vec<f64>,
    pub category: Category,
    pub peaks: PeakSet,
    /// Highest valid peak of an accepted or afterpulse capture
    pub main_peak: Option<usize>,
    /// Time of each non-main valid peak relative to the main peak (s)
    pub afterpulse_intervals: Vec<f64>,
}

/// Partition of a run's captures into categories
///
/// Each list preserves dataset order.
#[derive(Debug, Clone, Default)]
pub struct ClassificationResult {
    pub accepted: Vec<CaptureResult>,
    pub afterpulse: Vec<CaptureResult>,
    pub rejected: Vec<CaptureResult>,
    pub rejected_afterpulse: Vec<CaptureResult>,
}

impl ClassificationResult {
    pub fn push(&mut self, result: CaptureResult) {
        self.list_mut(result.category).push(result);
    }

    pub fn list(&self, category: Category) -> &[CaptureResult] {
        match category {
            Category::Accepted => &self.accepted,
            Category::Afterpulse => &self.afterpulse,
            Category::Rejected => &self.rejected,
            Category::RejectedAfterpulse => &self.rejected_afterpulse,
        }
    }

    fn list_mut(&mut self, category: Category) -> &mut Vec<CaptureResult> {
        match category {
            Category::Accepted => &mut self.accepted,
            Category::Afterpulse => &mut self.afterpulse,
            Category::Rejected => &mut self.rejected,
            Category::RejectedAfterpulse => &mut self.rejected_afterpulse,
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.list(category).len()
    }

    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|&c| self.count(c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every result, in dataset order
    pub fn all(&self) -> Vec<&CaptureResult> {
        let mut all: Vec<&CaptureResult> = Category::ALL
            .iter()
            .flat_map(|&c| self.list(c).iter())
            .collect();
        all.sort_by_key(|r| r.index);
        all
    }

    pub fn find(&self, filename: &str) -> Option<&CaptureResult> {
        Category::ALL
            .iter()
            .flat_map(|&c| self.list(c).iter())
            .find(|r| r.filename == filename)
    }

    pub fn category_of(&self, filename: &str) -> Option<Category> {
        self.find(filename).map(|r| r.category)
    }

    /// Valid peaks summed over accepted and afterpulse captures
    pub fn total_valid_peaks(&self) -> usize {
        self.accepted
            .iter()
            .chain(self.afterpulse.iter())
            .map(|r| r.peaks.valid_peaks.len())
            .sum()
    }
}

/// Everything a run produces for downstream consumers
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Geometry the run placed samples on
    pub acquisition: AcquisitionConfig,
    pub classification: ClassificationResult,
    pub thresholds: DatasetThresholds,
    /// Prominence threshold used for detection (V)
    pub prominence: f64,
    pub total_valid_peaks: usize,
    /// Afterpulse-to-main intervals of every afterpulse capture, dataset order
    pub afterpulse_intervals: Vec<f64>,
    pub afterpulse_band: Option<Band>,
    /// Baseline band recomputed from accepted captures only
    pub accepted_baseline: Option<Band>,
    /// Captures dropped by per-capture failures
    pub excluded: Vec<String>,
}
