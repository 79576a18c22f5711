//! In-process decoding with symphonia

use crate::error::{NormalizeError, NormalizeResult};
use crate::model::{AudioBuffer, AudioFormat};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode an audio file to interleaved f32 samples
///
/// Every channel and every frame is kept. Corrupt packets are skipped as
/// long as at least some audio decodes; a file that yields nothing is a
/// decode error.
pub fn decode_file(path: &Path, format: AudioFormat) -> NormalizeResult<AudioBuffer> {
    log::debug!("Decoding {} file: {:?}", format, path);

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let format_opts = format_options();
    let metadata_opts = MetadataOptions::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| NormalizeError::decode(path, format!("unrecognized container: {}", e)))?;

    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| NormalizeError::decode(path, "no audio track found"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| NormalizeError::decode(path, "no sample rate in audio track"))?;

    let dec_opts = DecoderOptions::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .map_err(|e| NormalizeError::decode(path, format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channels: Option<u16> = None;
    let mut bad_packets = 0usize;

    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                log::warn!("Error reading packet in {:?}: {}", path, e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                bad_packets += 1;
                log::debug!("Skipping corrupt packet in {:?}: {}", path, e);
                continue;
            }
            Err(e) => return Err(NormalizeError::decode(path, e)),
        };

        let spec = *decoded.spec();
        let packet_channels = spec.channels.count() as u16;
        match channels {
            None => channels = Some(packet_channels),
            Some(c) if c != packet_channels => {
                return Err(NormalizeError::decode(
                    path,
                    format!("channel count changed from {} to {}", c, packet_channels),
                ));
            }
            Some(_) => {}
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if bad_packets > 0 {
        log::warn!("{} corrupt packet(s) skipped in {:?}", bad_packets, path);
    }

    let channels = match channels {
        Some(c) if !samples.is_empty() => c,
        _ => return Err(NormalizeError::decode(path, "no audio data decoded")),
    };

    let buffer = AudioBuffer::new(samples, channels, sample_rate);
    log::debug!(
        "Decoded {} frames ({:.1}s) at {}Hz, {} channel(s)",
        buffer.frames(),
        buffer.duration_secs(),
        sample_rate,
        channels
    );

    Ok(buffer)
}

/// Gapless mode trims encoder delay and padding, so repeated runs do not
/// accumulate leading silence
fn format_options() -> FormatOptions {
    FormatOptions {
        enable_gapless: true,
        ..Default::default()
    }
}
