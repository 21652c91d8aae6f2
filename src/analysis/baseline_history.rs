use std::collections::VecDeque;

use rolling_stats::Stats;
use serde::Serialize;

use crate::constants::BASELINE_HISTORY_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineStatistics {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
}

/// Latest baseline width against the mean of the earlier ones
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineComparison {
    pub current: f64,
    pub historical_mean: f64,
    /// Absolute relative change (%)
    pub percentage: f64,
    /// A narrower baseline is an improvement
    pub improved: bool,
}

/// History of accepted-only baseline widths (mV) across runs
///
/// Oldest values are dropped beyond the history limit.
#[derive(Debug, Clone, Default)]
pub struct BaselineTracker {
    history: VecDeque<f64>,
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut tracker = Self::new();
        for v in values {
            tracker.add(v);
        }
        tracker
    }

    pub fn add(&mut self, width_mv: f64) {
        self.history.push_back(width_mv);
        while self.history.len() > BASELINE_HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn statistics(&self) -> Option<BaselineStatistics> {
        let last = *self.history.back()?;
        let mut stats: Stats<f64> = Stats::new();
        for &v in &self.history {
            stats.update(v);
        }
        Some(BaselineStatistics {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
            last,
        })
    }

    /// `None` with fewer than two values or a zero historical mean
    pub fn comparison(&self) -> Option<BaselineComparison> {
        if self.history.len() < 2 {
            return None;
        }
        let current = *self.history.back()?;
        let previous = self.history.len() - 1;
        let historical_mean = self.history.iter().take(previous).sum::<f64>() / previous as f64;
        if historical_mean == 0.0 {
            return None;
        }

        let change = current - historical_mean;
        Some(BaselineComparison {
            current,
            historical_mean,
            percentage: (change / historical_mean * 100.0).abs(),
            improved: change < 0.0,
        })
    }
}
