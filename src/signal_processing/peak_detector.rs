use std::cmp::Ordering;

use crate::constants::WIDTH_REL_HEIGHT;

/// Width of a peak measured at a fraction of its prominence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakWidth {
    /// Width in samples (interpolated)
    pub width: f64,
    /// Amplitude level the width was evaluated at
    pub height: f64,
    /// Interpolated left crossing position
    pub left_ip: f64,
    /// Interpolated right crossing position
    pub right_ip: f64,
}

/// Per-peak properties reported by the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakProperties {
    pub index: usize,
    pub height: f64,
    pub prominence: f64,
    pub left_base: usize,
    pub right_base: usize,
    /// Absent when the width could not be evaluated
    pub width: Option<PeakWidth>,
}

/// Local-maximum peak search with height, distance and prominence criteria
///
/// Detection never filters by width: widths are only measured, so that
/// later stages (saturation merge, width filter) see the full candidate set.
pub struct PeakDetector {
    prominence: f64,
    min_distance_samples: usize,
}

impl PeakDetector {
    /// Create a peak detector
    ///
    /// # Arguments
    /// * `prominence` - Minimum prominence in volts
    /// * `min_distance_samples` - Minimum spacing between retained peaks (at least 1)
    pub fn new(prominence: f64, min_distance_samples: usize) -> Self {
        Self {
            prominence,
            min_distance_samples: min_distance_samples.max(1),
        }
    }

    /// Find all peaks in a buffer
    ///
    /// Returns properties for every candidate, in increasing index order.
    pub fn detect(&self, samples: &[f64]) -> Vec<PeakProperties> {
        // Height floor of 0 V
        let mut peaks = local_maxima(samples);
        peaks.retain(|&i| samples[i] >= 0.0);

        if self.min_distance_samples > 1 {
            peaks = select_by_distance(&peaks, samples, self.min_distance_samples);
        }

        peaks
            .into_iter()
            .filter_map(|index| {
                let (prominence, left_base, right_base) = prominence_at(samples, index);
                if prominence < self.prominence {
                    return None;
                }
                let width = width_at(
                    samples,
                    index,
                    prominence,
                    left_base,
                    right_base,
                    WIDTH_REL_HEIGHT,
                );
                Some(PeakProperties {
                    index,
                    height: samples[index],
                    prominence,
                    left_base,
                    right_base,
                    width,
                })
            })
            .collect()
    }
}

/// Indices of local maxima; a flat top resolves to its middle sample
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if x.len() < 3 {
        return maxima;
    }

    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                let right_edge = ahead - 1;
                maxima.push((i + right_edge) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    maxima
}

/// Keep higher peaks first, dropping any peak closer than `distance` to a kept one
fn select_by_distance(peaks: &[usize], x: &[f64], distance: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..peaks.len()).collect();
    ranked.sort_by(|&a, &b| {
        x[peaks[b]]
            .partial_cmp(&x[peaks[a]])
            .unwrap_or(Ordering::Equal)
    });

    let mut keep = vec![true; peaks.len()];
    for &j in &ranked {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter(|(_, kept)| *kept)
        .map(|(&p, _)| p)
        .collect()
}

/// Prominence and bases of the peak at `peak`
///
/// Each side is scanned until a strictly higher sample or the edge; the
/// lowest point on each side is a base, and the higher base sets the reference.
fn prominence_at(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let peak_val = x[peak];

    let mut left_min = peak_val;
    let mut left_base = peak;
    for i in (0..peak).rev() {
        if x[i] > peak_val {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
    }

    let mut right_min = peak_val;
    let mut right_base = peak;
    for (i, &v) in x.iter().enumerate().skip(peak + 1) {
        if v > peak_val {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = i;
        }
    }

    (peak_val - left_min.max(right_min), left_base, right_base)
}

/// Width at `rel_height` of the prominence, interpolating both crossings
fn width_at(
    x: &[f64],
    peak: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
    rel_height: f64,
) -> Option<PeakWidth> {
    if !prominence.is_finite() {
        return None;
    }
    let height = x[peak] - prominence * rel_height;

    let mut l = peak;
    while l > left_base && height < x[l] {
        l -= 1;
    }
    let mut left_ip = l as f64;
    if x[l] < height {
        left_ip += (height - x[l]) / (x[l + 1] - x[l]);
    }

    let mut r = peak;
    while r < right_base && height < x[r] {
        r += 1;
    }
    let mut right_ip = r as f64;
    if x[r] < height {
        right_ip -= (height - x[r]) / (x[r - 1] - x[r]);
    }

    Some(PeakWidth {
        width: right_ip - left_ip,
        height,
        left_ip,
        right_ip,
    })
}
