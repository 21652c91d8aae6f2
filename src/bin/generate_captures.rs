use anyhow::{Context, Result};
use clap::Parser;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use peakfinder::config::{AcquisitionConfig, TimeValue};
use peakfinder::simulation::{
    CaptureSpec, DatasetGenerator, NoiseConfig, Ringing, SiPMPulse, create_rng, write_dataset,
};

#[derive(Parser, Debug)]
#[command(name = "generate_captures")]
#[command(about = "Generate synthetic SiPM oscilloscope capture datasets")]
struct Args {
    /// TOML noise configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory; its name is the default file prefix
    #[arg(short, long, default_value = "data/synthetic")]
    output_dir: PathBuf,

    /// Number of captures
    #[arg(short = 'n', long, default_value_t = 100)]
    captures: usize,

    /// Base seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Capture window duration (e.g., "5us")
    #[arg(long, default_value = "5us")]
    window: TimeValue,

    /// Samples per capture
    #[arg(long, default_value_t = 1001)]
    points: usize,

    /// Primary pulse amplitude in mV
    #[arg(long, default_value_t = 50.0)]
    amplitude: f64,

    /// Spread of the primary pulse arrival time (e.g., "20ns")
    #[arg(long, default_value = "20ns")]
    jitter: TimeValue,

    /// Baseline noise standard deviation in mV (CLI override)
    #[arg(long)]
    noise: Option<f64>,

    /// Digitiser full scale in mV; pulses above it are clipped
    #[arg(long)]
    clip: Option<f64>,

    /// Fraction of captures with an afterpulse
    #[arg(long, default_value_t = 0.2)]
    afterpulse_fraction: f64,

    /// Fraction of captures with oscillatory ringing
    #[arg(long, default_value_t = 0.05)]
    perturbed_fraction: f64,

    /// Fraction of captures whose only pulse is outside the trigger window
    #[arg(long, default_value_t = 0.05)]
    dark_fraction: f64,

    /// Mean time between triggers (e.g., "1ms")
    #[arg(long, default_value = "1ms")]
    trigger_interval: TimeValue,

    /// Output filename prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Generate manifest.json
    #[arg(long)]
    manifest: bool,
}

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    noise: Option<NoiseConfig>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
enum CaptureKind {
    Single,
    Afterpulse,
    Dark,
    Perturbed,
}

#[derive(Debug, Serialize)]
struct ManifestEntry {
    file: String,
    kind: CaptureKind,
    trigger_time: f64,
}

#[derive(Debug, Serialize)]
struct Manifest {
    window_time: f64,
    num_points: usize,
    seed: u64,
    files: Vec<ManifestEntry>,
}

fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn build_noise_config(toml: &TomlConfig, args: &Args, seed: u64) -> NoiseConfig {
    let mut config = toml.noise.clone().unwrap_or_default().with_seed(seed);
    if let Some(sigma_mv) = args.noise {
        config.baseline_sigma = Some(sigma_mv / 1000.0);
    } else if config.baseline_sigma.is_none() {
        config.baseline_sigma = Some(0.5e-3);
    }
    config
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init();

    let toml_config = match args.config {
        Some(ref path) => load_toml_config(path)?,
        None => TomlConfig::default(),
    };

    let seed = args.seed.unwrap_or(0);
    let noise = build_noise_config(&toml_config, &args, seed);
    let acquisition = AcquisitionConfig::new(args.window.as_secs(), args.points);

    let prefix = match args.prefix {
        Some(ref p) => p.clone(),
        None => args
            .output_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "capture".to_string()),
    };

    // Scenario choices use their own stream so noise settings do not shift them
    let mut rng = create_rng(Some(seed.wrapping_add(1)));
    let amplitude = args.amplitude / 1000.0;
    let window = args.window.as_secs();
    let mut kinds = Vec::with_capacity(args.captures);
    let mut specs = Vec::with_capacity(args.captures);
    let mut trigger_time = 0.0;

    for _ in 0..args.captures {
        trigger_time += args.trigger_interval.as_secs() * (0.5 + rng.random::<f64>());
        let arrival = (rng.random::<f64>() - 0.5) * 2.0 * args.jitter.as_secs();
        let roll = rng.random::<f64>();

        let (kind, spec) = if roll < args.perturbed_fraction {
            let spec = CaptureSpec::new(trigger_time)
                .with_pulse(SiPMPulse::new(amplitude, arrival))
                .with_ringing(Ringing {
                    amplitude: amplitude.max(0.03),
                    frequency_hz: 8.0 / window,
                    start: arrival,
                    decay_time: window,
                });
            (CaptureKind::Perturbed, spec)
        } else if roll < args.perturbed_fraction + args.dark_fraction {
            let offset = window * (0.2 + 0.25 * rng.random::<f64>());
            let spec = CaptureSpec::new(trigger_time).with_pulse(SiPMPulse::new(amplitude, offset));
            (CaptureKind::Dark, spec)
        } else if roll < args.perturbed_fraction + args.dark_fraction + args.afterpulse_fraction {
            let delay = window * (0.1 + 0.3 * rng.random::<f64>());
            let spec = CaptureSpec::new(trigger_time)
                .with_pulse(SiPMPulse::new(amplitude, arrival))
                .with_pulse(SiPMPulse::new(amplitude * 0.6, arrival + delay));
            (CaptureKind::Afterpulse, spec)
        } else {
            let spec = CaptureSpec::new(trigger_time).with_pulse(SiPMPulse::new(amplitude, arrival));
            (CaptureKind::Single, spec)
        };
        kinds.push(kind);
        specs.push(spec);
    }

    let mut generator = DatasetGenerator::new(acquisition, noise);
    if let Some(clip_mv) = args.clip {
        generator = generator.with_clip_level(clip_mv / 1000.0);
    }
    let captures = generator.generate(&prefix, &specs);
    write_dataset(&args.output_dir, &captures, &acquisition)
        .context("Failed to write dataset")?;

    if args.manifest {
        let manifest = Manifest {
            window_time: acquisition.window_time,
            num_points: acquisition.num_points,
            seed,
            files: captures
                .iter()
                .zip(&kinds)
                .map(|(c, &kind)| ManifestEntry {
                    file: c.filename.clone(),
                    kind,
                    trigger_time: c.trigger_time,
                })
                .collect(),
        };
        let manifest_path = args.output_dir.join("manifest.json");
        let manifest_json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(&manifest_path, manifest_json).context("Failed to write manifest")?;
        eprintln!("Manifest written to: {}", manifest_path.display());
    }

    eprintln!(
        "Generated {} captures in {}",
        captures.len(),
        args.output_dir.display()
    );
    Ok(())
}
