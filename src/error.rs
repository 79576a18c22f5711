//! Error taxonomy for the normalizer
//!
//! Per-file failures are classified so the pipeline can decide whether to
//! continue, and so the run report can tell decode problems apart from a
//! missing toolchain.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while validating a job or processing a single file
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The job cannot start (missing input directory, input == output, ...)
    #[error("{0}")]
    Validation(String),

    /// The file's audio data is corrupt, truncated or unsupported
    #[error("could not decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// The external encoder executable could not be located
    #[error("audio toolchain not found: {program} (is ffmpeg installed and on PATH?)")]
    ToolchainMissing { program: String },

    /// The encoder ran but did not produce an output file
    #[error("could not encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    /// The peak guard refused a gain that would push samples past full scale
    #[error("gain of {gain_db:+.2} dB would clip (peak {peak_dbfs:.2} dBFS)")]
    WouldClip { gain_db: f64, peak_dbfs: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NormalizeError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Encode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Category used in the run report
    pub fn kind(&self) -> FailureKind {
        match self {
            NormalizeError::Decode { .. } => FailureKind::Decode,
            NormalizeError::ToolchainMissing { .. } => FailureKind::ToolchainMissing,
            NormalizeError::Encode { .. } => FailureKind::Encode,
            NormalizeError::WouldClip { .. } => FailureKind::Clipping,
            NormalizeError::Validation(_) | NormalizeError::Io(_) => FailureKind::Unexpected,
        }
    }
}

/// Failure category recorded for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Decode,
    ToolchainMissing,
    Encode,
    Clipping,
    Unexpected,
}

/// Result alias for codec and pipeline operations
pub type NormalizeResult<T> = std::result::Result<T, NormalizeError>;
