//! Batch Normalizer - loudness normalization for MP3/OGG libraries
//!
//! This library walks a directory tree, rescales every MP3 and OGG file to a
//! target average loudness and writes the results to a mirrored output tree.

pub mod codec;
pub mod discovery;
pub mod error;
pub mod loudness;
pub mod model;
pub mod normalize;
pub mod validation;

pub use error::{FailureKind, NormalizeError};
pub use normalize::config::NormalizeConfig;
pub use normalize::pipeline::NormalizePipeline;
