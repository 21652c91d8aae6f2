use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeakFinderError {
    #[error("Failed to parse capture {file}: {reason}")]
    CaptureParse { file: String, reason: String },

    #[error("Analysis failed for capture {file}: {reason}")]
    CaptureAnalysis { file: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PeakFinderError {
    /// Per-file and per-capture failures never abort a batch.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PeakFinderError::CaptureParse { .. } | PeakFinderError::CaptureAnalysis { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PeakFinderError>;
