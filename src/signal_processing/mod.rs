pub mod crossing;
pub mod peak_detector;
pub mod percentile;
pub mod saturation;

pub use crossing::DownwardCrossingDetector;
pub use peak_detector::{PeakDetector, PeakProperties, PeakWidth};
pub use percentile::{Band, central_band, percentile_sorted};
pub use saturation::{SaturationMerge, merge_saturated};
