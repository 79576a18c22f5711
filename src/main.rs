use anyhow::{Context, Result};
use batch_normalizer::codec::{EncodeSettings, SystemCodec, DEFAULT_FFMPEG};
use batch_normalizer::loudness::PeakGuard;
use batch_normalizer::model::{NormalizationJob, RunReport, DEFAULT_TARGET_DBFS};
use batch_normalizer::validation::verify_outputs;
use batch_normalizer::{NormalizeConfig, NormalizePipeline};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "batch-normalizer")]
#[command(about = "Normalize MP3 and OGG files to a consistent loudness", long_about = None)]
struct Args {
    /// Directory containing the audio files (scanned recursively)
    #[arg(short = 'i', long)]
    input: String,

    /// Directory for normalized files (must differ from the input)
    #[arg(short = 'o', long)]
    output: String,

    /// Target loudness in dBFS
    #[arg(short = 't', long, default_value_t = DEFAULT_TARGET_DBFS, allow_hyphen_values = true)]
    target_dbfs: f64,

    /// What to do when the gain would push peaks past full scale
    #[arg(long, value_enum, default_value_t = PeakGuardArg::Clip)]
    peak_guard: PeakGuardArg,

    /// MP3 bitrate in kbps (default: ffmpeg's)
    #[arg(long)]
    mp3_bitrate: Option<u32>,

    /// Vorbis quality from -1 to 10 (default: ffmpeg's)
    #[arg(long, allow_hyphen_values = true)]
    ogg_quality: Option<f32>,

    /// ffmpeg executable
    #[arg(long, default_value = DEFAULT_FFMPEG)]
    ffmpeg: String,

    /// Measure files and report gains without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Re-read written files and check they reached the target
    #[arg(long)]
    verify: bool,

    /// Allowed deviation from the target when verifying (dB)
    #[arg(long, default_value = "0.5")]
    tolerance: f64,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PeakGuardArg {
    /// Apply the gain unconditionally
    None,
    /// Clamp samples at full scale
    Clip,
    /// Reduce the gain so peaks stay at full scale
    Limit,
    /// Fail files that would clip
    Reject,
}

impl From<PeakGuardArg> for PeakGuard {
    fn from(arg: PeakGuardArg) -> Self {
        match arg {
            PeakGuardArg::None => PeakGuard::None,
            PeakGuardArg::Clip => PeakGuard::Clip,
            PeakGuardArg::Limit => PeakGuard::Limit,
            PeakGuardArg::Reject => PeakGuard::Reject,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::info!("Audio Normalization");
    log::info!("===================");
    log::info!("Original files are NOT modified. Normalized files are saved in the output directory.");

    // Expand ~ in paths
    let input = PathBuf::from(shellexpand::tilde(&args.input).as_ref());
    let output = PathBuf::from(shellexpand::tilde(&args.output).as_ref());

    let job = NormalizationJob::new(input, output, args.target_dbfs).map_err(|e| {
        log::error!("{}", e);
        e
    })?;

    let config = NormalizeConfig::new(job)
        .with_peak_guard(args.peak_guard.into())
        .with_dry_run(args.dry_run);

    let codec = SystemCodec::new()
        .with_ffmpeg(&args.ffmpeg)
        .with_settings(EncodeSettings {
            mp3_bitrate_kbps: args.mp3_bitrate,
            ogg_quality: args.ogg_quality,
        });

    let pipeline = NormalizePipeline::new(config, codec.clone());
    let report = pipeline.run().map_err(|e| {
        log::error!("{:#}", e);
        e
    })?;

    print_summary(&report);

    if let Some(path) = &args.report {
        let path = PathBuf::from(shellexpand::tilde(path).as_ref());
        write_report(&report, &path)?;
        log::info!("Run report written to: {}", path.display());
    }

    if args.verify && !args.dry_run {
        let verification = verify_outputs(&codec, &report, args.tolerance);
        if !verification.passed() {
            log::warn!("Verification found files off target; see warnings above");
        }
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    log::info!("Normalization process finished.");
    if report.aborted {
        log::warn!(
            "Run aborted after {} file(s); remaining files were not visited",
            report.total()
        );
    }
    log::info!("Successfully processed: {} file(s)", report.processed);
    log::info!("Failed to process: {} file(s)", report.failed);
    for failure in &report.failures {
        log::debug!("  {:?}: {}", failure.kind, failure.message);
    }
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write run report: {}", path.display()))?;
    Ok(())
}
