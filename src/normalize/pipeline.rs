//! Batch normalization loop

use super::config::NormalizeConfig;
use super::organizer::OutputOrganizer;
use crate::codec::AudioCodec;
use crate::discovery::{find_audio_files, DiscoveredFile};
use crate::error::{NormalizeError, NormalizeResult};
use crate::loudness::{apply_gain, gain_to_target, measure_dbfs, peak_dbfs};
use crate::model::{NormalizedFile, RunReport};
use anyhow::{Context, Result};

/// Main normalization pipeline
pub struct NormalizePipeline<C: AudioCodec> {
    config: NormalizeConfig,
    organizer: OutputOrganizer,
    codec: C,
}

impl<C: AudioCodec> NormalizePipeline<C> {
    pub fn new(config: NormalizeConfig, codec: C) -> Self {
        let organizer = OutputOrganizer::new(
            config.job.input_root().to_path_buf(),
            config.job.output_root().to_path_buf(),
        );

        Self {
            config,
            organizer,
            codec,
        }
    }

    /// Run the whole batch
    ///
    /// Per-file failures are recorded in the report and never stop the
    /// batch, except a missing toolchain on the very first file. Errors
    /// returned from here mean nothing was processed: the toolchain probe
    /// failed or the output directory could not be created.
    pub fn run(&self) -> Result<RunReport> {
        let job = &self.config.job;
        let mut report = RunReport::new(job.target_dbfs());

        if self.config.dry_run {
            log::info!("Dry run: files are measured but nothing is written");
        } else {
            self.codec
                .probe()
                .context("Audio toolchain check failed")?;
            self.organizer.init()?;
        }

        let exclude = job.output_inside_input().then(|| job.output_root());
        let files = find_audio_files(job.input_root(), exclude);

        if files.is_empty() {
            log::info!("No MP3 or OGG files found in the input directory (and its subdirectories).");
            report.finish();
            return Ok(report);
        }

        log::info!("Found {} audio file(s) to process.", files.len());
        log::info!("Target loudness: {:.1} dBFS", job.target_dbfs());

        let total = files.len();
        for (i, file) in files.iter().enumerate() {
            log::info!("[{}/{}] Processing: {}", i + 1, total, file.path.display());

            match self.process_file(file) {
                Ok(normalized) => {
                    match &normalized.output {
                        Some(output) => log::info!(
                            "Normalized {:.2} dBFS -> {:.2} dBFS (gain {:+.2} dB), saved to: {}",
                            normalized.measured_dbfs,
                            normalized.measured_dbfs + normalized.applied_gain_db,
                            normalized.applied_gain_db,
                            output.display()
                        ),
                        None => log::info!(
                            "Measured {:.2} dBFS, would apply {:+.2} dB",
                            normalized.measured_dbfs,
                            normalized.applied_gain_db
                        ),
                    }
                    report.record_success(normalized);
                }
                Err(e) => {
                    report.record_failure(&file.path, &e);
                    match &e {
                        NormalizeError::Decode { .. } => log::warn!(
                            "Could not decode {}. It might be corrupted or not a valid audio file: {}",
                            file.path.display(),
                            e
                        ),
                        NormalizeError::ToolchainMissing { .. } => {
                            log::warn!("Could not process {}: {}", file.path.display(), e);
                            if report.processed == 0 && report.failed == 1 {
                                log::error!("Aborting due to missing audio toolchain.");
                                report.aborted = true;
                                break;
                            }
                        }
                        _ => log::warn!(
                            "Failed to process {}: {}",
                            file.path.display(),
                            e
                        ),
                    }
                }
            }
        }

        report.finish();
        Ok(report)
    }

    /// Decode, measure, apply gain and (unless dry-running) encode one file
    fn process_file(&self, file: &DiscoveredFile) -> NormalizeResult<NormalizedFile> {
        let mut buffer = self.codec.decode(&file.path, file.format)?;

        let measured_dbfs = measure_dbfs(&buffer);
        log::debug!(
            "Measured {:.2} dBFS, peak {:.2} dBFS",
            measured_dbfs,
            peak_dbfs(&buffer)
        );
        if !measured_dbfs.is_finite() {
            log::warn!("{} is silent, leaving its level unchanged", file.path.display());
        }

        let requested_gain_db = gain_to_target(self.config.job.target_dbfs(), measured_dbfs);
        let outcome = apply_gain(&mut buffer, requested_gain_db, self.config.peak_guard)?;

        if outcome.clipped_samples > 0 {
            log::warn!(
                "{} sample(s) clipped at full scale in {}",
                outcome.clipped_samples,
                file.path.display()
            );
        }

        let mut normalized = NormalizedFile {
            source: file.path.clone(),
            output: None,
            format: file.format,
            measured_dbfs,
            requested_gain_db,
            applied_gain_db: outcome.applied_gain_db,
            clipped_samples: outcome.clipped_samples,
        };

        if self.config.dry_run {
            return Ok(normalized);
        }

        let dest = self.organizer.output_path(&file.path).ok_or_else(|| {
            NormalizeError::Validation(format!(
                "{} has no output path distinct from itself",
                file.path.display()
            ))
        })?;
        self.organizer.prepare_parent(&dest)?;

        self.codec.encode(&buffer, &file.path, &dest, file.format)?;
        log::debug!("Wrote {}", dest.display());

        normalized.output = Some(dest);
        Ok(normalized)
    }
}
