//! Loudness measurement and gain application
//!
//! Loudness is the RMS level of all interleaved samples expressed in dBFS,
//! so a full-scale square wave measures 0 dBFS and a full-scale sine about
//! -3.01 dBFS.

use crate::error::{NormalizeError, NormalizeResult};
use crate::model::AudioBuffer;

/// What to do when the requested gain would push samples past full scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeakGuard {
    /// Apply the gain unconditionally; samples may exceed 1.0
    None,
    /// Hard-clamp samples to [-1.0, 1.0]
    #[default]
    Clip,
    /// Lower the gain so the loudest sample lands at full scale
    Limit,
    /// Refuse to process the file
    Reject,
}

/// Result of applying gain to a buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainOutcome {
    pub applied_gain_db: f64,
    pub clipped_samples: usize,
}

/// Convert a linear amplitude ratio to decibels
pub fn ratio_to_db(ratio: f64) -> f64 {
    if ratio <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * ratio.log10()
    }
}

/// Convert decibels to a linear amplitude ratio
pub fn db_to_ratio(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Average loudness of the buffer in dBFS
///
/// Returns negative infinity for silent or empty buffers.
pub fn measure_dbfs(buffer: &AudioBuffer) -> f64 {
    ratio_to_db(rms(&buffer.samples))
}

/// Highest absolute sample value in dBFS
pub fn peak_dbfs(buffer: &AudioBuffer) -> f64 {
    ratio_to_db(peak(&buffer.samples))
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

fn peak(samples: &[f32]) -> f64 {
    samples
        .iter()
        .fold(0.0f64, |acc, &s| acc.max((s as f64).abs()))
}

/// Gain in dB that moves `measured_dbfs` to `target_dbfs`
///
/// Silent input (negative infinity) gets no gain.
pub fn gain_to_target(target_dbfs: f64, measured_dbfs: f64) -> f64 {
    if measured_dbfs.is_finite() {
        target_dbfs - measured_dbfs
    } else {
        0.0
    }
}

/// Scale the buffer in place by `gain_db`, honouring the peak guard
pub fn apply_gain(buffer: &mut AudioBuffer, gain_db: f64, guard: PeakGuard) -> NormalizeResult<GainOutcome> {
    let peak = peak(&buffer.samples);
    let mut factor = db_to_ratio(gain_db);
    let overshoot = peak * factor > 1.0;

    match guard {
        PeakGuard::Reject if overshoot => {
            return Err(NormalizeError::WouldClip {
                gain_db,
                peak_dbfs: ratio_to_db(peak),
            });
        }
        PeakGuard::Limit if overshoot => {
            factor = 1.0 / peak;
            log::debug!(
                "Limiting gain from {:+.2} dB to {:+.2} dB to stay below full scale",
                gain_db,
                ratio_to_db(factor)
            );
        }
        _ => {}
    }

    let factor_f32 = factor as f32;
    let mut clipped_samples = 0;
    for sample in buffer.samples.iter_mut() {
        let scaled = *sample * factor_f32;
        *sample = if guard == PeakGuard::Clip && scaled.abs() > 1.0 {
            clipped_samples += 1;
            scaled.clamp(-1.0, 1.0)
        } else {
            scaled
        };
    }

    Ok(GainOutcome {
        applied_gain_db: ratio_to_db(factor),
        clipped_samples,
    })
}
