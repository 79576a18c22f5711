use batch_normalizer::codec::AudioCodec;
use batch_normalizer::error::NormalizeResult;
use batch_normalizer::loudness::{measure_dbfs, PeakGuard};
use batch_normalizer::model::{AudioBuffer, AudioFormat, NormalizationJob, DEFAULT_TARGET_DBFS};
use batch_normalizer::validation::verify_outputs;
use batch_normalizer::{FailureKind, NormalizeConfig, NormalizeError, NormalizePipeline};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Codec storing raw PCM: channels (u16 LE), sample rate (u32 LE), f32 LE samples
#[derive(Clone, Default)]
struct RawCodec {
    /// Encoding fails with a missing toolchain for paths containing this
    missing_toolchain_for: Option<&'static str>,
    /// Probe reports a missing toolchain
    probe_fails: bool,
}

impl AudioCodec for RawCodec {
    fn probe(&self) -> NormalizeResult<()> {
        if self.probe_fails {
            return Err(NormalizeError::ToolchainMissing {
                program: "ffmpeg".to_string(),
            });
        }
        Ok(())
    }

    fn decode(&self, path: &Path, _format: AudioFormat) -> NormalizeResult<AudioBuffer> {
        let bytes = fs::read(path)?;
        if bytes.len() < 6 || (bytes.len() - 6) % 4 != 0 {
            return Err(NormalizeError::decode(path, "bad raw stream"));
        }
        let channels = u16::from_le_bytes([bytes[0], bytes[1]]);
        let sample_rate = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        let samples = bytes[6..]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(AudioBuffer::new(samples, channels, sample_rate))
    }

    fn encode(
        &self,
        buffer: &AudioBuffer,
        _source: &Path,
        dest: &Path,
        _format: AudioFormat,
    ) -> NormalizeResult<()> {
        if let Some(pattern) = self.missing_toolchain_for {
            if dest.to_string_lossy().contains(pattern) {
                return Err(NormalizeError::ToolchainMissing {
                    program: "ffmpeg".to_string(),
                });
            }
        }
        write_raw(dest, buffer);
        Ok(())
    }
}

fn write_raw(path: &Path, buffer: &AudioBuffer) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&buffer.channels.to_le_bytes());
    bytes.extend_from_slice(&buffer.sample_rate.to_le_bytes());
    for s in &buffer.samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Stereo square wave measuring exactly `dbfs`
fn write_tone(path: &Path, dbfs: f64) {
    let amplitude = 10f64.powf(dbfs / 20.0) as f32;
    let samples = (0..8000)
        .map(|i| if (i / 2) % 2 == 0 { amplitude } else { -amplitude })
        .collect();
    write_raw(path, &AudioBuffer::new(samples, 2, 8000));
}

fn loudness_of(path: &Path) -> f64 {
    let buffer = RawCodec::default().decode(path, AudioFormat::Mp3).unwrap();
    measure_dbfs(&buffer)
}

fn pipeline(input: &Path, output: &Path, codec: RawCodec) -> NormalizePipeline<RawCodec> {
    let job = NormalizationJob::new(input.to_path_buf(), output.to_path_buf(), DEFAULT_TARGET_DBFS)
        .expect("valid job");
    NormalizePipeline::new(NormalizeConfig::new(job), codec)
}

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let input = temp.path().join("input");
    let output = temp.path().join("output");
    fs::create_dir_all(&input).unwrap();
    (temp, input, output)
}

#[test]
fn test_normalizes_to_target_and_mirrors_tree() {
    let (_temp, input, output) = setup();
    write_tone(&input.join("a.mp3"), -30.0);
    write_tone(&input.join("sub/b.ogg"), -10.0);
    fs::write(input.join("sub/notes.txt"), b"ignored").unwrap();

    let report = pipeline(&input, &output, RawCodec::default()).run().unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 0);
    assert!(!report.aborted);

    assert!((loudness_of(&output.join("a.mp3")) + 20.0).abs() < 0.01);
    assert!((loudness_of(&output.join("sub/b.ogg")) + 20.0).abs() < 0.01);
    assert!(!output.join("sub/notes.txt").exists());

    let a = report.files.iter().find(|f| f.source.ends_with("a.mp3")).unwrap();
    assert!((a.measured_dbfs + 30.0).abs() < 0.01);
    assert!((a.requested_gain_db - 10.0).abs() < 0.01);
}

#[test]
fn test_second_pass_needs_no_gain() {
    let (temp, input, output) = setup();
    write_tone(&input.join("a.mp3"), -33.0);

    pipeline(&input, &output, RawCodec::default()).run().unwrap();
    let second = pipeline(&output, &temp.path().join("again"), RawCodec::default())
        .run()
        .unwrap();

    assert_eq!(second.processed, 1);
    assert!(second.files[0].requested_gain_db.abs() < 0.01);
}

#[test]
fn test_empty_input_produces_empty_report() {
    let (_temp, input, output) = setup();

    let report = pipeline(&input, &output, RawCodec::default()).run().unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(report.failed, 0);
    assert!(report.files.is_empty());
}

#[test]
fn test_same_directory_refuses_to_start() {
    let (_temp, input, _output) = setup();
    write_tone(&input.join("a.mp3"), -30.0);

    let result = NormalizationJob::new(input.clone(), input.clone(), DEFAULT_TARGET_DBFS);

    assert!(matches!(result, Err(NormalizeError::Validation(_))));
    assert_eq!(fs::read_dir(&input).unwrap().count(), 1);
}

#[test]
fn test_parent_dir_alias_of_input_leaves_sources_untouched() {
    let (temp, input, _output) = setup();
    write_tone(&input.join("a.mp3"), -30.0);
    let before = fs::read(input.join("a.mp3")).unwrap();

    let aliased = temp.path().join("missing/../input");
    let result = NormalizationJob::new(input.clone(), aliased, DEFAULT_TARGET_DBFS);

    assert!(matches!(result, Err(NormalizeError::Validation(_))));
    assert_eq!(fs::read(input.join("a.mp3")).unwrap(), before);
    assert!((loudness_of(&input.join("a.mp3")) + 30.0).abs() < 0.01);
    assert!(!temp.path().join("missing").exists());
}

#[test]
fn test_corrupt_file_fails_once_and_batch_continues() {
    let (_temp, input, output) = setup();
    write_tone(&input.join("a.mp3"), -30.0);
    fs::write(input.join("b.mp3"), b"garbage").unwrap();
    write_tone(&input.join("c.ogg"), -12.0);

    let report = pipeline(&input, &output, RawCodec::default()).run().unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::Decode);
    assert!(report.failures[0].path.ends_with("b.mp3"));
    assert!(output.join("c.ogg").exists());
    assert!(!output.join("b.mp3").exists());
}

#[test]
fn test_missing_toolchain_on_first_file_aborts() {
    let (_temp, input, output) = setup();
    write_tone(&input.join("a.mp3"), -30.0);
    write_tone(&input.join("b.mp3"), -30.0);

    let codec = RawCodec {
        missing_toolchain_for: Some(""),
        probe_fails: false,
    };
    let report = pipeline(&input, &output, codec).run().unwrap();

    assert!(report.aborted);
    assert_eq!(report.processed, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::ToolchainMissing);
}

#[test]
fn test_missing_toolchain_after_success_continues() {
    let (_temp, input, output) = setup();
    write_tone(&input.join("a.mp3"), -30.0);
    write_tone(&input.join("b.ogg"), -30.0);
    write_tone(&input.join("c.mp3"), -30.0);

    let codec = RawCodec {
        missing_toolchain_for: Some("b.ogg"),
        probe_fails: false,
    };
    let report = pipeline(&input, &output, codec).run().unwrap();

    assert!(!report.aborted);
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
}

#[test]
fn test_failed_probe_touches_nothing() {
    let (_temp, input, output) = setup();
    write_tone(&input.join("a.mp3"), -30.0);

    let codec = RawCodec {
        missing_toolchain_for: None,
        probe_fails: true,
    };
    let result = pipeline(&input, &output, codec).run();

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<NormalizeError>(),
        Some(NormalizeError::ToolchainMissing { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn test_dry_run_writes_nothing() {
    let (_temp, input, output) = setup();
    write_tone(&input.join("a.mp3"), -26.0);

    let job = NormalizationJob::new(input.clone(), output.clone(), -16.0).unwrap();
    let config = NormalizeConfig::new(job).with_dry_run(true);
    let codec = RawCodec {
        missing_toolchain_for: None,
        probe_fails: true,
    };
    let report = NormalizePipeline::new(config, codec).run().unwrap();

    assert_eq!(report.processed, 1);
    assert!(report.files[0].output.is_none());
    assert!((report.files[0].requested_gain_db - 10.0).abs() < 0.01);
    assert!(!output.exists());
}

#[test]
fn test_reject_guard_fails_loud_gain() {
    let (_temp, input, output) = setup();
    // Square wave at -40 dBFS has its peak at -40 dBFS too, so +20 dB is safe
    write_tone(&input.join("safe.mp3"), -40.0);
    // A single spike drives the peak far above the RMS level
    let mut samples = vec![0.001f32; 4000];
    samples[0] = 0.9;
    write_raw(&input.join("spiky.mp3"), &AudioBuffer::new(samples, 1, 8000));

    let job = NormalizationJob::new(input.clone(), output.clone(), DEFAULT_TARGET_DBFS).unwrap();
    let config = NormalizeConfig::new(job).with_peak_guard(PeakGuard::Reject);
    let report = NormalizePipeline::new(config, RawCodec::default()).run().unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::Clipping);
    assert!(output.join("safe.mp3").exists());
}

#[test]
fn test_output_inside_input_is_not_rediscovered() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().to_path_buf();
    let output = input.join("normalized");
    write_tone(&input.join("a.mp3"), -30.0);

    pipeline(&input, &output, RawCodec::default()).run().unwrap();
    let second = pipeline(&input, &output, RawCodec::default()).run().unwrap();

    assert_eq!(second.processed, 1);
    assert!(!output.join("normalized").exists());
}

#[test]
fn test_verify_outputs_within_tolerance() {
    let (_temp, input, output) = setup();
    write_tone(&input.join("a.mp3"), -30.0);
    write_tone(&input.join("sub/b.ogg"), -10.0);

    let codec = RawCodec::default();
    let report = pipeline(&input, &output, codec.clone()).run().unwrap();
    let verification = verify_outputs(&codec, &report, 0.1);

    assert!(verification.passed());
    assert_eq!(verification.files.len(), 2);
}

#[test]
fn test_verify_lists_unreadable_outputs() {
    let (_temp, input, output) = setup();
    write_tone(&input.join("a.mp3"), -30.0);
    write_tone(&input.join("b.mp3"), -25.0);

    let codec = RawCodec::default();
    let report = pipeline(&input, &output, codec.clone()).run().unwrap();
    fs::write(output.join("b.mp3"), b"damaged").unwrap();
    let verification = verify_outputs(&codec, &report, 0.1);

    assert!(!verification.passed());
    assert_eq!(verification.files.len(), 1);
    assert_eq!(verification.unreadable.len(), 1);
    assert!(verification.unreadable[0].ends_with("b.mp3"));
}

#[test]
fn test_verify_flags_clipped_output() {
    let (_temp, input, output) = setup();
    let mut samples = vec![0.001f32; 4000];
    samples[0] = 0.9;
    write_raw(&input.join("spiky.mp3"), &AudioBuffer::new(samples, 1, 8000));

    let job = NormalizationJob::new(input.clone(), output.clone(), DEFAULT_TARGET_DBFS).unwrap();
    let config = NormalizeConfig::new(job).with_peak_guard(PeakGuard::Limit);
    let codec = RawCodec::default();
    let report = NormalizePipeline::new(config, codec.clone()).run().unwrap();
    let verification = verify_outputs(&codec, &report, 0.5);

    assert_eq!(report.processed, 1);
    assert_eq!(verification.out_of_tolerance(), 1);
    assert!(verification.files[0].deviation_db < 0.0);
}
