/// Outcome of collapsing duplicate detections of one clipped pulse
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaturationMerge {
    /// Surviving candidates, increasing
    pub kept: Vec<usize>,
    /// Candidates discarded as duplicates of the kept saturated peak, increasing
    pub merged: Vec<usize>,
}

/// Collapse multiple saturated candidates into the single highest one
///
/// A clipped pulse forms a plateau that peak search may split into several
/// close maxima. When more than one candidate reaches `threshold`, only the
/// highest of them survives (the earliest on ties). Candidates below the
/// threshold are never touched. Idempotent.
pub fn merge_saturated(peaks: &[usize], amplitudes: &[f64], threshold: f64) -> SaturationMerge {
    let saturated: Vec<usize> = peaks
        .iter()
        .copied()
        .filter(|&p| amplitudes[p] >= threshold)
        .collect();

    if saturated.len() <= 1 {
        return SaturationMerge {
            kept: peaks.to_vec(),
            merged: Vec::new(),
        };
    }

    let mut survivor = saturated[0];
    for &p in &saturated[1..] {
        if amplitudes[p] > amplitudes[survivor] {
            survivor = p;
        }
    }

    let (kept, merged) = peaks
        .iter()
        .partition(|&&p| p == survivor || amplitudes[p] < threshold);

    SaturationMerge { kept, merged }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_saturated_collapse_to_highest() {
        let mut amps = vec![0.0; 20];
        amps[5] = 0.96;
        amps[7] = 0.99;
        amps[9] = 0.97;
        amps[15] = 0.3;
        let result = merge_saturated(&[5, 7, 9, 15], &amps, 0.95);
        assert_eq!(result.kept, vec![7, 15]);
        assert_eq!(result.merged, vec![5, 9]);
    }

    #[test]
    fn test_single_saturated_is_noop() {
        let amps = vec![0.0, 1.0, 0.0, 0.5, 0.0];
        let result = merge_saturated(&[1, 3], &amps, 0.95);
        assert_eq!(result.kept, vec![1, 3]);
        assert!(result.merged.is_empty());
    }

    #[test]
    fn test_tie_keeps_earliest() {
        let amps = vec![0.0, 1.0, 0.0, 1.0, 0.0];
        let result = merge_saturated(&[1, 3], &amps, 0.95);
        assert_eq!(result.kept, vec![1]);
        assert_eq!(result.merged, vec![3]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let amps = vec![0.0, 0.97, 0.0, 0.99, 0.0, 0.2, 0.0, 0.96];
        let first = merge_saturated(&[1, 3, 5, 7], &amps, 0.95);
        let second = merge_saturated(&first.kept, &amps, 0.95);
        assert_eq!(second.kept, first.kept);
        assert!(second.merged.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let result = merge_saturated(&[], &[], 0.95);
        assert!(result.kept.is_empty());
        assert!(result.merged.is_empty());
    }
}
