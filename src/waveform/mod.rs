pub mod capture;
pub mod metadata;
pub mod source;
pub mod store;

pub use capture::Capture;
pub use metadata::{AcquisitionMetadata, read_metadata};
pub use source::{CaptureSource, DirectorySource, default_pattern, wildcard_match};
pub use store::WaveformStore;
