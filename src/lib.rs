pub mod analysis;
pub mod config;
pub mod constants;
pub mod error;
pub mod output;
pub mod signal_processing;
pub mod waveform;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use analysis::{BatchRunner, ExecutionMode, RunResult, run_dataset};
pub use config::{AcquisitionConfig, AnalysisConfig, RunConfig};
pub use error::{PeakFinderError, Result};
pub use waveform::{Capture, WaveformStore};
