//! Normalization orchestration and output tree layout

pub mod config;
pub mod organizer;
pub mod pipeline;

pub use config::NormalizeConfig;
pub use organizer::OutputOrganizer;
pub use pipeline::NormalizePipeline;
