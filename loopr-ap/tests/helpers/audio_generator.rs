//! Audio test fixture generation
//!
//! Deterministic tones, either as in-memory tracks or as WAV files on disk
//! for exercising the decode path.

use hound::{WavSpec, WavWriter};
use loopr_ap::audio::Track;
use std::f32::consts::PI;
use std::path::Path;

/// Sample rate for in-memory test tracks. Low to keep buffers small.
pub const TEST_SAMPLE_RATE: u32 = 8000;

/// Interleaved sine samples
pub fn sine_samples(
    seconds: f64,
    sample_rate: u32,
    channels: u16,
    frequency_hz: f32,
    amplitude: f32,
) -> Vec<f32> {
    let frames = (seconds * sample_rate as f64).round() as usize;
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = amplitude * (2.0 * PI * frequency_hz * t).sin();
        for _ in 0..channels {
            samples.push(value);
        }
    }
    samples
}

/// Mono 440 Hz track of `seconds` length at [`TEST_SAMPLE_RATE`]
pub fn sine_track(name: &str, seconds: f64) -> Track {
    Track::new(
        name,
        sine_samples(seconds, TEST_SAMPLE_RATE, 1, 440.0, 0.5),
        TEST_SAMPLE_RATE,
        1,
    )
}

/// Write a 16-bit sine WAV file
///
/// # Example
/// ```no_run
/// # use std::path::Path;
/// // 1 second of 440 Hz stereo at 44.1 kHz
/// generate_sine_wav(Path::new("/tmp/sine.wav"), 1.0, 44100, 2)?;
/// # Ok::<(), hound::Error>(())
/// ```
pub fn generate_sine_wav(
    path: &Path,
    seconds: f64,
    sample_rate: u32,
    channels: u16,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for sample in sine_samples(seconds, sample_rate, channels, 440.0, 0.5) {
        writer.write_sample((sample * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
