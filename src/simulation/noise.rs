use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    /// Gaussian baseline noise standard deviation (V)
    pub baseline_sigma: Option<f64>,
    /// Constant baseline offset (V)
    pub offset: Option<f64>,
    /// Random single-sample spikes
    pub spikes: Option<SpikeConfig>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct SpikeConfig {
    /// Probability per sample
    pub probability: f64,
    pub amplitude: f64,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_baseline_sigma(mut self, sigma: f64) -> Self {
        self.baseline_sigma = Some(sigma);
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_spikes(mut self, probability: f64, amplitude: f64) -> Self {
        self.spikes = Some(SpikeConfig {
            probability,
            amplitude,
        });
        self
    }
}

pub fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

fn apply_baseline_noise(signal: &mut [f64], sigma: f64, rng: &mut ChaCha8Rng) {
    if sigma <= 0.0 {
        return;
    }
    let normal = match Normal::new(0.0, sigma) {
        Ok(n) => n,
        Err(_) => return,
    };
    for sample in signal.iter_mut() {
        *sample += normal.sample(rng);
    }
}

fn apply_spikes(signal: &mut [f64], config: &SpikeConfig, rng: &mut ChaCha8Rng) {
    if config.probability <= 0.0 {
        return;
    }
    for sample in signal.iter_mut() {
        if rng.random::<f64>() < config.probability {
            *sample += config.amplitude;
        }
    }
}

/// Add the configured noise to a clean capture, drawing from `rng`
pub fn apply_noise_with(signal: &mut [f64], config: &NoiseConfig, rng: &mut ChaCha8Rng) {
    if let Some(offset) = config.offset {
        for sample in signal.iter_mut() {
            *sample += offset;
        }
    }

    if let Some(sigma) = config.baseline_sigma {
        apply_baseline_noise(signal, sigma, rng);
    }

    if let Some(ref spikes) = config.spikes {
        apply_spikes(signal, spikes, rng);
    }
}

/// Noisy copy of a clean capture, seeded from the configuration
pub fn apply_noise(clean: &[f64], config: &NoiseConfig) -> Vec<f64> {
    let mut signal = clean.to_vec();
    let mut rng = create_rng(config.seed);
    apply_noise_with(&mut signal, config, &mut rng);
    signal
}
