use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use peakfinder::analysis::{
    BaselineTracker, ExecutionMode, SiPMAnalyzer, run_dataset, temporal_distribution,
};
use peakfinder::config::{AnalysisConfig, TimeValue};
use peakfinder::output::{ReportFormat, create_formatter, render_report};

#[derive(Parser, Debug)]
#[command(name = "peakfinder")]
#[command(about = "Detect and classify SiPM pulses in oscilloscope capture datasets", long_about = None)]
struct Args {
    /// Dataset directories; later ones are compared against earlier ones
    #[arg(required = true)]
    dirs: Vec<PathBuf>,

    /// Capture file pattern (default: "<directory name>_*.txt")
    #[arg(short, long)]
    pattern: Option<String>,

    /// TOML file with analysis parameters; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: ReportFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Detection prominence as a percentage of the amplitude range
    #[arg(long)]
    prominence: Option<f64>,

    /// Minimum pulse width (e.g., "0.2us", "200ns")
    #[arg(long)]
    width: Option<TimeValue>,

    /// Minimum spacing between peaks (e.g., "50ns")
    #[arg(long)]
    min_dist: Option<TimeValue>,

    /// Baseline band percentile
    #[arg(long)]
    baseline_pct: Option<f64>,

    /// Signal-arrival window percentile
    #[arg(long)]
    max_dist_pct: Option<f64>,

    /// Afterpulse interval band percentile
    #[arg(long)]
    afterpulse_pct: Option<f64>,

    /// Perturbation trigger level in mV
    #[arg(long, allow_hyphen_values = true)]
    negative_trigger: Option<f64>,

    /// Report rejected multi-peak captures as rejected_afterpulse
    #[arg(long)]
    split_rejected: bool,

    /// Detect peaks in-thread regardless of dataset size
    #[arg(long, conflicts_with = "workers")]
    sequential: bool,

    /// Number of detection workers (default: automatic)
    #[arg(long)]
    workers: Option<usize>,

    /// Print SiPM crosstalk, afterpulse and dark count metrics
    #[arg(long)]
    sipm: bool,

    /// SiPM amplitude threshold in mV
    #[arg(long, default_value = "60")]
    sipm_amplitude: f64,

    /// SiPM time threshold (e.g., "100us")
    #[arg(long, default_value = "100us")]
    sipm_time: TimeValue,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let analysis = analysis_config(&args)?;
    let execution = match (args.sequential, args.workers) {
        (true, _) => ExecutionMode::Sequential,
        (false, Some(workers)) => ExecutionMode::Parallel { workers },
        (false, None) => ExecutionMode::Auto,
    };

    let formatter = create_formatter(args.format, args.verbose > 0);
    let mut tracker = BaselineTracker::new();

    for dir in &args.dirs {
        let run = run_dataset(dir, args.pattern.as_deref(), analysis, execution)
            .with_context(|| format!("analyzing {}", dir.display()))?;

        for line in render_report(formatter.as_ref(), &run) {
            println!("{}", line);
        }

        if args.sipm {
            let dist = temporal_distribution(&run);
            let metrics = SiPMAnalyzer::new(args.sipm_amplitude, args.sipm_time.as_secs())
                .analyze(&dist.delta_t, &dist.amplitudes_mv);
            match args.format {
                ReportFormat::Json => println!("{}", serde_json::json!({ "sipm": metrics })),
                _ => {
                    println!();
                    println!("SiPM metrics for {} ({} events):", dir.display(), metrics.total_events);
                    println!("  Afterpulse: {:.2}%", metrics.afterpulse_pct);
                    println!("  Crosstalk: {:.2}%", metrics.crosstalk_pct);
                    println!(
                        "  Afterpulse + crosstalk: {:.2}%",
                        metrics.afterpulse_crosstalk_pct
                    );
                    println!(
                        "  DCR: {:.1} Hz (total), {:.1} Hz (mean interval)",
                        metrics.dcr_rate_total_hz, metrics.dcr_rate_avg_hz
                    );
                }
            }
        }

        if let Some(band) = run.accepted_baseline {
            tracker.add(band.width() * 1000.0);
            match (tracker.comparison(), args.format) {
                (None, _) => {}
                (Some(cmp), ReportFormat::Json) => {
                    println!("{}", serde_json::json!({ "baseline": cmp }))
                }
                (Some(cmp), _) => println!(
                    "Baseline width {:.3} mV vs {:.3} mV before: {} by {:.1}%",
                    cmp.current,
                    cmp.historical_mean,
                    if cmp.improved { "improved" } else { "worse" },
                    cmp.percentage
                ),
            }
        }
    }

    Ok(())
}

fn analysis_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(v) = args.prominence {
        config.prominence_pct = v;
    }
    if let Some(v) = args.width {
        config.width_time = v.as_secs();
    }
    if let Some(v) = args.min_dist {
        config.min_dist_time = v.as_secs();
    }
    if let Some(v) = args.baseline_pct {
        config.baseline_pct = v;
    }
    if let Some(v) = args.max_dist_pct {
        config.max_dist_pct = v;
    }
    if let Some(v) = args.afterpulse_pct {
        config.afterpulse_pct = v;
    }
    if let Some(v) = args.negative_trigger {
        config.negative_trigger_mv = v;
    }
    if args.split_rejected {
        config.split_rejected_afterpulse = true;
    }

    Ok(config)
}
