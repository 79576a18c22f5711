//! Normalization configuration

use crate::loudness::PeakGuard;
use crate::model::NormalizationJob;

/// Configuration for a normalization run
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    /// Validated input/output roots and target level
    pub job: NormalizationJob,

    /// Policy for gains that would exceed full scale
    pub peak_guard: PeakGuard,

    /// Measure and report only; nothing is written
    pub dry_run: bool,
}

impl NormalizeConfig {
    pub fn new(job: NormalizationJob) -> Self {
        Self {
            job,
            peak_guard: PeakGuard::default(),
            dry_run: false,
        }
    }

    pub fn with_peak_guard(mut self, guard: PeakGuard) -> Self {
        self.peak_guard = guard;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
