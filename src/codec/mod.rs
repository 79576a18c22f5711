//! Audio decode/encode layer
//!
//! Decoding runs in-process with symphonia. Encoding back to MP3/OGG is
//! delegated to ffmpeg, which is the external toolchain the tool depends on.

mod decoder;
mod ffmpeg;
mod system;
mod traits;

pub use decoder::decode_file;
pub use ffmpeg::{EncodeSettings, FfmpegEncoder, DEFAULT_FFMPEG};
pub use system::SystemCodec;
pub use traits::AudioCodec;
