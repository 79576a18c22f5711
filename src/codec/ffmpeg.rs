//! Encoding through the ffmpeg command-line tool
//!
//! The gain-adjusted buffer is written to a temporary 32-bit float WAV and
//! handed to ffmpeg together with the original file, whose tags are mapped
//! onto the output minus any ReplayGain/R128 values.

use crate::error::{NormalizeError, NormalizeResult};
use crate::model::{AudioBuffer, AudioFormat};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Output};

/// Default executable looked up on PATH
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Loudness tags that no longer describe the file once gain is applied
const STALE_GAIN_TAGS: [&str; 6] = [
    "REPLAYGAIN_TRACK_GAIN",
    "REPLAYGAIN_TRACK_PEAK",
    "REPLAYGAIN_ALBUM_GAIN",
    "REPLAYGAIN_ALBUM_PEAK",
    "R128_TRACK_GAIN",
    "R128_ALBUM_GAIN",
];

/// Encoder quality settings (None = ffmpeg's defaults)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeSettings {
    /// Constant MP3 bitrate in kbps
    pub mp3_bitrate_kbps: Option<u32>,

    /// Vorbis quality, -1.0 to 10.0
    pub ogg_quality: Option<f32>,
}

/// Encoder that shells out to ffmpeg
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: OsString,
    settings: EncodeSettings,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            settings: EncodeSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EncodeSettings) -> Self {
        self.settings = settings;
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Run ffmpeg, mapping "executable not found" to a toolchain error
    fn run(&self, args: &[OsString]) -> NormalizeResult<Output> {
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => NormalizeError::ToolchainMissing {
                    program: self.program_name(),
                },
                _ => NormalizeError::Io(e),
            })
    }

    /// Check that ffmpeg can be executed
    pub fn probe(&self) -> NormalizeResult<()> {
        let output = self.run(&[OsString::from("-hide_banner"), OsString::from("-version")])?;
        if !output.status.success() {
            return Err(NormalizeError::ToolchainMissing {
                program: self.program_name(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = stdout.lines().next() {
            log::info!("Using {}", first_line);
        }
        Ok(())
    }

    /// Encode `buffer` to `dest`, copying tags from `source`
    pub fn encode(
        &self,
        buffer: &AudioBuffer,
        source: &Path,
        dest: &Path,
        format: AudioFormat,
    ) -> NormalizeResult<()> {
        let wav = tempfile::Builder::new()
            .prefix("batch-normalizer-")
            .suffix(".wav")
            .tempfile()?;

        write_float_wav(buffer, wav.path()).map_err(|e| NormalizeError::encode(dest, e))?;

        let args = build_args(wav.path(), source, dest, format, &self.settings);
        log::debug!("Running {} {:?}", self.program_name(), args);

        let output = self.run(&args)?;
        if !output.status.success() {
            // Do not leave a truncated file behind
            let _ = std::fs::remove_file(dest);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NormalizeError::encode(
                dest,
                format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(())
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG)
    }
}

/// Write the buffer as a 32-bit float WAV so no headroom is lost before encoding
fn write_float_wav(buffer: &AudioBuffer, path: &Path) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in &buffer.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

/// ffmpeg arguments for one encode
fn build_args(
    wav: &Path,
    source: &Path,
    dest: &Path,
    format: AudioFormat,
    settings: &EncodeSettings,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        wav.into(),
        "-i".into(),
        source.into(),
        "-map".into(),
        "0:a".into(),
        "-map_metadata".into(),
        "1".into(),
    ];

    // Vorbis comments live on the stream, not the container
    let metadata_target = match format {
        AudioFormat::Mp3 => "-metadata",
        AudioFormat::Ogg => "-metadata:s:a:0",
    };
    if format == AudioFormat::Ogg {
        args.extend(["-map_metadata:s:a:0", "1:s:a:0"].map(OsString::from));
    }
    for tag in STALE_GAIN_TAGS {
        args.push(metadata_target.into());
        args.push(format!("{}=", tag).into());
    }

    match format {
        AudioFormat::Mp3 => {
            args.extend(["-c:a", "libmp3lame"].map(OsString::from));
            if let Some(kbps) = settings.mp3_bitrate_kbps {
                args.push("-b:a".into());
                args.push(format!("{}k", kbps).into());
            }
            args.extend(["-id3v2_version", "3"].map(OsString::from));
        }
        AudioFormat::Ogg => {
            args.extend(["-c:a", "libvorbis"].map(OsString::from));
            if let Some(quality) = settings.ogg_quality {
                args.push("-q:a".into());
                args.push(quality.clamp(-1.0, 10.0).to_string().into());
            }
        }
    }

    args.push("-f".into());
    args.push(format.extension().into());
    args.push(dest.into());
    args
}
