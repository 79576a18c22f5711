//! Post-run loudness verification

use crate::codec::AudioCodec;
use crate::loudness::measure_dbfs;
use crate::model::{AudioFormat, RunReport};
use serde::Serialize;
use std::path::PathBuf;

/// Loudness check for one written file
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedFile {
    pub path: PathBuf,
    pub measured_dbfs: f64,
    pub deviation_db: f64,
    pub within_tolerance: bool,
}

/// Result of verifying a run's outputs
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub target_dbfs: f64,
    pub tolerance_db: f64,
    pub files: Vec<VerifiedFile>,

    /// Outputs that could not be decoded again
    pub unreadable: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn out_of_tolerance(&self) -> usize {
        self.files.iter().filter(|f| !f.within_tolerance).count()
    }

    /// True when every output decoded and landed within tolerance
    pub fn passed(&self) -> bool {
        self.unreadable.is_empty() && self.out_of_tolerance() == 0
    }
}

/// Re-decode every output of `report` and compare its loudness to the target
///
/// Clipped or limited files are expected to land below the target, so
/// deviations are logged rather than treated as errors. Outputs that fail to
/// decode are listed in `unreadable`. Silent sources are skipped since they
/// are never brought to the target.
pub fn verify_outputs<C: AudioCodec>(
    codec: &C,
    report: &RunReport,
    tolerance_db: f64,
) -> VerifyReport {
    log::info!(
        "Verifying {} output file(s) against {:.1} dBFS (±{:.2} dB)",
        report.files.len(),
        report.target_dbfs,
        tolerance_db
    );

    let mut result = VerifyReport {
        target_dbfs: report.target_dbfs,
        tolerance_db,
        files: Vec::new(),
        unreadable: Vec::new(),
    };

    for file in &report.files {
        let Some(output) = &file.output else {
            continue;
        };
        if !file.measured_dbfs.is_finite() {
            log::debug!("Skipping silent file {}", output.display());
            continue;
        }

        let format = AudioFormat::from_path(output).unwrap_or(file.format);
        let buffer = match codec.decode(output, format) {
            Ok(b) => b,
            Err(e) => {
                log::error!("Could not re-read {}: {}", output.display(), e);
                result.unreadable.push(output.clone());
                continue;
            }
        };

        let measured_dbfs = measure_dbfs(&buffer);
        let deviation_db = measured_dbfs - report.target_dbfs;
        let within_tolerance = deviation_db.abs() <= tolerance_db;

        if within_tolerance {
            log::debug!("{}: {:.2} dBFS", output.display(), measured_dbfs);
        } else {
            log::warn!(
                "{}: {:.2} dBFS is {:+.2} dB off target{}",
                output.display(),
                measured_dbfs,
                deviation_db,
                if file.clipped_samples > 0 || file.applied_gain_db < file.requested_gain_db {
                    " (peak guard engaged)"
                } else {
                    ""
                }
            );
        }

        result.files.push(VerifiedFile {
            path: output.clone(),
            measured_dbfs,
            deviation_db,
            within_tolerance,
        });
    }

    if result.passed() {
        log::info!("All {} output file(s) within tolerance", result.files.len());
    } else {
        log::warn!(
            "{} file(s) out of tolerance, {} unreadable",
            result.out_of_tolerance(),
            result.unreadable.len()
        );
    }

    result
}
