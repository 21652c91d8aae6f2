mod dataset;
mod noise;
mod pulse;

pub use dataset::{CaptureSpec, DatasetGenerator, capture_text, write_dataset};
pub use noise::{NoiseConfig, SpikeConfig, apply_noise, apply_noise_with, create_rng};
pub use pulse::{Ringing, SiPMPulse, clip};
