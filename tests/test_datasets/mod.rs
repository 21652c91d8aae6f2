//! Synthetic dataset directories for integration tests
//!
//! Every dataset is written to its own directory under the system temp dir.
//! The last path component equals the file prefix, so the default
//! `<directory name>_*.txt` pattern picks the captures up.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use peakfinder::config::{AcquisitionConfig, AnalysisConfig};
use peakfinder::simulation::{
    CaptureSpec, DatasetGenerator, NoiseConfig, Ringing, SiPMPulse, write_dataset,
};

/// Removes the dataset directory when dropped
pub struct TempDataset {
    root: PathBuf,
    dir: PathBuf,
    pub files: Vec<PathBuf>,
}

impl TempDataset {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Drop an extra file into the dataset directory
    pub fn add_file(&self, name: &str, content: &str) {
        fs::write(self.dir.join(name), content).expect("write extra file");
    }
}

impl Drop for TempDataset {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// 5 us window, 1001 samples (about 5 ns per sample)
pub fn acquisition() -> AcquisitionConfig {
    AcquisitionConfig::new(5e-6, 1001)
}

/// Defaults tuned to the short synthetic pulses
///
/// The signal window spans every capture maximum.
pub fn analysis() -> AnalysisConfig {
    AnalysisConfig {
        width_time: 0.05e-6,
        max_dist_pct: 100.0,
        ..AnalysisConfig::default()
    }
}

pub fn noise(seed: u64) -> NoiseConfig {
    NoiseConfig::default()
        .with_seed(seed)
        .with_baseline_sigma(0.1e-3)
}

/// Small deterministic spread of arrival times around the trigger
pub fn arrival(i: usize) -> f64 {
    ((i % 5) as f64 - 2.0) * 10e-9
}

pub fn trigger_time(i: usize) -> f64 {
    (i + 1) as f64 * 1e-3
}

pub fn single(i: usize, amplitude: f64) -> CaptureSpec {
    CaptureSpec::new(trigger_time(i)).with_pulse(SiPMPulse::new(amplitude, arrival(i)))
}

/// 50 mV primary and a 25 mV afterpulse 1 us later
pub fn afterpulse(i: usize) -> CaptureSpec {
    single(i, 0.05).with_pulse(SiPMPulse::new(0.025, arrival(i) + 1e-6))
}

/// Normal primary followed by ringing that swings far below -10 mV
pub fn perturbed(i: usize) -> CaptureSpec {
    single(i, 0.05).with_ringing(Ringing {
        amplitude: 0.03,
        frequency_hz: 2e6,
        start: 0.5e-6,
        decay_time: 2e-6,
    })
}

/// Only pulse arrives long after the trigger
pub fn dark(i: usize) -> CaptureSpec {
    CaptureSpec::new(trigger_time(i)).with_pulse(SiPMPulse::new(0.05, 1.5e-6))
}

/// `singles` accepted-like, then `afterpulses`, then `perturbations`
pub fn mixed_specs(singles: usize, afterpulses: usize, perturbations: usize) -> Vec<CaptureSpec> {
    let mut specs = Vec::new();
    let mut i = 0;
    for _ in 0..singles {
        specs.push(single(i, 0.05));
        i += 1;
    }
    for _ in 0..afterpulses {
        specs.push(afterpulse(i));
        i += 1;
    }
    for _ in 0..perturbations {
        specs.push(perturbed(i));
        i += 1;
    }
    specs
}

/// Render and write a dataset named `name` under a directory unique to `test`
pub fn write(test: &str, name: &str, generator: &DatasetGenerator, specs: &[CaptureSpec]) -> TempDataset {
    let root = std::env::temp_dir().join(format!(
        "peakfinder_it_{}_{}",
        std::process::id(),
        test
    ));
    let dir = root.join(name);
    let _ = fs::remove_dir_all(&root);

    let captures = generator.generate(name, specs);
    let files = write_dataset(&dir, &captures, &acquisition()).expect("write dataset");
    TempDataset { root, dir, files }
}

pub fn generator(seed: u64) -> DatasetGenerator {
    DatasetGenerator::new(acquisition(), noise(seed))
}
