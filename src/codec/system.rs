//! Production codec: symphonia for decoding, ffmpeg for encoding

use super::decoder::decode_file;
use super::ffmpeg::{EncodeSettings, FfmpegEncoder};
use super::traits::AudioCodec;
use crate::error::NormalizeResult;
use crate::model::{AudioBuffer, AudioFormat};
use std::ffi::OsString;
use std::path::Path;

/// Codec backed by the system toolchain
#[derive(Debug, Clone, Default)]
pub struct SystemCodec {
    encoder: FfmpegEncoder,
}

impl SystemCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ffmpeg executable instead of the one on PATH
    pub fn with_ffmpeg(mut self, program: impl Into<OsString>) -> Self {
        self.encoder = FfmpegEncoder::new(program);
        self
    }

    pub fn with_settings(mut self, settings: EncodeSettings) -> Self {
        self.encoder = self.encoder.with_settings(settings);
        self
    }
}

impl AudioCodec for SystemCodec {
    fn probe(&self) -> NormalizeResult<()> {
        self.encoder.probe()
    }

    fn decode(&self, path: &Path, format: AudioFormat) -> NormalizeResult<AudioBuffer> {
        decode_file(path, format)
    }

    fn encode(
        &self,
        buffer: &AudioBuffer,
        source: &Path,
        dest: &Path,
        format: AudioFormat,
    ) -> NormalizeResult<()> {
        self.encoder.encode(buffer, source, dest, format)
    }
}
