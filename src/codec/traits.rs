//! Codec trait definitions

use crate::error::NormalizeResult;
use crate::model::{AudioBuffer, AudioFormat};
use std::path::Path;

/// Decode/encode capability used by the pipeline
///
/// The pipeline only depends on this trait, so the real symphonia + ffmpeg
/// implementation can be swapped out in tests.
pub trait AudioCodec {
    /// Check that the encode toolchain is usable
    ///
    /// Called once before a batch starts.
    fn probe(&self) -> NormalizeResult<()>;

    /// Decode a file into interleaved PCM
    fn decode(&self, path: &Path, format: AudioFormat) -> NormalizeResult<AudioBuffer>;

    /// Encode `buffer` into `dest` using `format`
    ///
    /// `source` is the original file, used to carry over its metadata tags.
    fn encode(
        &self,
        buffer: &AudioBuffer,
        source: &Path,
        dest: &Path,
        format: AudioFormat,
    ) -> NormalizeResult<()>;
}
