//! Validation utilities
//!
//! Decodes written outputs again to confirm they reached the target level.

mod verify;

pub use verify::{verify_outputs, VerifiedFile, VerifyReport};
