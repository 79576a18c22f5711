use super::AudioFormat;
use crate::error::{FailureKind, NormalizeError};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A file that was normalized (or measured, in a dry run)
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedFile {
    pub source: PathBuf,

    /// Destination path; None in a dry run
    pub output: Option<PathBuf>,

    pub format: AudioFormat,

    /// Loudness of the decoded source
    pub measured_dbfs: f64,

    /// Gain needed to reach the target
    pub requested_gain_db: f64,

    /// Gain actually applied after the peak guard
    pub applied_gain_db: f64,

    /// Samples clamped to full scale
    pub clipped_samples: usize,
}

/// A file that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target_dbfs: f64,
    pub processed: usize,
    pub failed: usize,

    /// Set when the run stopped before visiting every file
    pub aborted: bool,

    pub files: Vec<NormalizedFile>,
    pub failures: Vec<FileFailure>,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl RunReport {
    pub fn new(target_dbfs: f64) -> Self {
        Self {
            target_dbfs,
            processed: 0,
            failed: 0,
            aborted: false,
            files: Vec::new(),
            failures: Vec::new(),
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn record_success(&mut self, file: NormalizedFile) {
        self.processed += 1;
        self.files.push(file);
    }

    pub fn record_failure(&mut self, path: &Path, error: &NormalizeError) {
        self.failed += 1;
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    /// Files visited so far
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }

    /// Paths of every written output file
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().filter_map(|f| f.output.as_deref())
    }
}
