/// Downward threshold-crossing detector
///
/// Counts transitions from at-or-above the threshold to below it. A signal
/// that starts below the threshold has not crossed it; it must first rise
/// back to the threshold before the next dip counts.
pub struct DownwardCrossingDetector {
    threshold: f64,
    above: Option<bool>,
}

impl DownwardCrossingDetector {
    /// Create a new detector
    ///
    /// # Arguments
    /// * `threshold` - Level in volts (negative for undershoot detection)
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            above: None,
        }
    }

    /// Feed the next sample; returns `true` on a downward crossing
    pub fn detect_crossing(&mut self, sample: f64) -> bool {
        let above = sample >= self.threshold;
        let crossed = self.above == Some(true) && !above;
        self.above = Some(above);
        crossed
    }

    /// Count downward crossings in a buffer
    pub fn count_crossings(&mut self, buffer: &[f64]) -> usize {
        buffer
            .iter()
            .filter(|&&sample| self.detect_crossing(sample))
            .count()
    }
}
