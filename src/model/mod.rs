//! Data model for a normalization run
//!
//! Audio buffers, the immutable job description and the report that the
//! pipeline hands back at the end of a run.

mod audio;
mod job;
mod report;

pub use audio::{AudioBuffer, AudioFormat};
pub use job::{NormalizationJob, DEFAULT_TARGET_DBFS};
pub use report::{FileFailure, NormalizedFile, RunReport};
