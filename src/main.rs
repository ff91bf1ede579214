// src/main.rs

use clap::Parser;
use sample_cutter::cutter::{cut_files, CutterConfig};
use std::path::PathBuf;

/// Cut individual samples (instrument hits) out of audio recordings
///
/// A sample starts when a half-wave peak reaches threshold-in and ends
/// after a number of consecutive half-waves stay below threshold-out.
/// Levels are fractions of full scale (-1.0 to +1.0).
#[derive(Parser, Debug)]
#[command(name = "sample-cutter")]
#[command(version, about = "Cut individual samples out of audio recordings", long_about = None)]
struct Args {
    /// Input audio files (WAV, FLAC, AIFF, ...)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Channel number for zero-crossing detection [default: 0]
    #[arg(long)]
    channel_for_zero_crossing_detection: Option<usize>,

    /// Any value > 0 and <= 1 [default: 0.03]
    #[arg(long)]
    threshold_in: Option<f64>,

    /// Any value > 0 and < threshold-in [default: 0.0003]
    #[arg(long)]
    threshold_out: Option<f64>,

    /// Consecutive half-waves with peak < threshold-out that end a sample [default: 100]
    #[arg(long)]
    threshold_out_reached_count: Option<usize>,

    /// Frames to prepend before the initial zero-crossing [default: 88, ~2ms at 44.1kHz]
    #[arg(long)]
    lead_in: Option<usize>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// JSON config file; command-line options override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a JSON report of the written files to stdout
    #[arg(long)]
    json: bool,

    /// Show detailed information
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn cutter_config(&self) -> anyhow::Result<CutterConfig> {
        let mut config = match &self.config {
            Some(path) => CutterConfig::from_json_file(path)?,
            None => CutterConfig::default(),
        };

        if let Some(channel) = self.channel_for_zero_crossing_detection {
            config.zero_crossing_channel = channel;
        }
        if let Some(level) = self.threshold_in {
            config.threshold_in = level;
        }
        if let Some(level) = self.threshold_out {
            config.threshold_out = level;
        }
        if let Some(count) = self.threshold_out_reached_count {
            config.threshold_out_reached_count = count;
        }
        if let Some(frames) = self.lead_in {
            config.lead_in_frames = frames;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "sample_cutter=debug"
    } else {
        "sample_cutter=info"
    };

    // Initialize tracing with environment filter support
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.cutter_config()?;
    tracing::debug!("Using {:?}", config);

    let start_time = std::time::Instant::now();
    let reports = cut_files(args.files.as_slice(), &config, &args.output_dir)?;

    let written: usize = reports.iter().map(|r| r.segments.len()).sum();
    tracing::info!(
        "Done: {} sample(s) from {} file(s) in {:.2}s",
        written,
        reports.len(),
        start_time.elapsed().as_secs_f64()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}
