use std::cmp::Ordering;

use serde::Serialize;

/// Closed interval `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Band of the given half-width around `center`
    pub fn around(center: f64, half_width: f64) -> Self {
        Self::new(center - half_width, center + half_width)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// Percentile of ascending data with linear interpolation between closest ranks
///
/// `pct` is in 0-100. Returns `None` for empty input.
pub fn percentile_sorted(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Two-sided band covering the central `coverage_pct` percent of the data
///
/// Low edge is the `(100 - coverage_pct) / 2` percentile, high edge the
/// complementary one. Widening `coverage_pct` never narrows the band.
pub fn central_band(values: &[f64], coverage_pct: f64) -> Option<Band> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let low_pct = (100.0 - coverage_pct) / 2.0;
    let high_pct = 100.0 - low_pct;
    Some(Band::new(
        percentile_sorted(&sorted, low_pct)?,
        percentile_sorted(&sorted, high_pct)?,
    ))
}
