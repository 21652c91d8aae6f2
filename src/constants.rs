//! Numeric constants for the classification pipeline
//!
//! Fallback values used when a dataset is too small or degenerate to
//! estimate a threshold, plus the fixed policy constants of the batch run.

/// Fraction of the global maximum amplitude above which a peak counts as saturated.
pub const SATURATION_FRACTION: f64 = 0.95;

/// Amplitude range (V) used to derive the prominence threshold when the
/// dataset provides no usable extrema.
pub const FALLBACK_AMPLITUDE_RANGE: f64 = 0.01;

/// Half-width (s) of the signal-arrival window used when no capture maxima exist.
pub const FALLBACK_WINDOW_HALF_WIDTH: f64 = 0.1e-6;

/// Half-width (V) of the baseline band used when no quiet-zone samples exist.
pub const FALLBACK_BASELINE_HALF_WIDTH: f64 = 1e-3;

/// Padding applied on each side of the amplitude extrema for display scaling.
pub const DISPLAY_MARGIN_FRACTION: f64 = 0.1;

/// Captures above this count are detected on the worker pool.
pub const PARALLEL_CAPTURE_THRESHOLD: usize = 50;

/// Upper bound on detection workers regardless of available cores.
pub const MAX_WORKERS: usize = 8;

/// Relative height at which peak widths are measured (half prominence).
pub const WIDTH_REL_HEIGHT: f64 = 0.5;

/// Oscilloscope window spans ten horizontal divisions of the time base.
pub const DIVISIONS_PER_WINDOW: f64 = 10.0;

/// Default window duration (s) when no metadata file is present.
pub const DEFAULT_WINDOW_TIME: f64 = 5e-6;

/// Default sample count per capture when neither metadata nor data provide one.
pub const DEFAULT_NUM_POINTS: usize = 4081;

/// Name of the oscilloscope metadata file inside a dataset directory.
pub const METADATA_FILE_NAME: &str = "DATA.txt";

/// Maximum number of values kept by the baseline drift tracker.
pub const BASELINE_HISTORY_LIMIT: usize = 1000;
