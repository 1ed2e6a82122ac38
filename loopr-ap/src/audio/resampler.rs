//! Sample rate conversion using rubato
//!
//! Every loaded track is converted to the output rate once, at load time, so
//! the sink and the tempo subsystem only ever see one rate.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Whole-buffer resampler.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved audio from `input_rate` to `output_rate`.
    ///
    /// Returns a copy without resampling when the rates already match or the
    /// input is empty.
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate || input.is_empty() {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }
        if input_rate == 0 || channels == 0 {
            return Err(Error::Load(format!(
                "Cannot resample: rate={} channels={}",
                input_rate, channels
            )));
        }

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            input_rate, output_rate, channels
        );

        // rubato works on planar buffers
        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input[0].len();

        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            input_frames,
            channels as usize,
        )
        .map_err(|e| Error::Load(format!("Failed to create resampler: {}", e)))?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Load(format!("Resampling failed: {}", e)))?;

        let output = Self::interleave(planar_output);
        debug!(
            "Resampled {} input frames to {} output frames",
            input_frames,
            output.len() / channels as usize
        );
        Ok(output)
    }

    /// `[L, R, L, R, ...]` -> `[[L, L, ...], [R, R, ...]]`
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let num_channels = channels as usize;
        let num_frames = samples.len() / num_channels;
        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];

        for frame in samples.chunks_exact(num_channels) {
            for (ch, sample) in frame.iter().enumerate() {
                planar[ch].push(*sample);
            }
        }
        planar
    }

    /// `[[L, L, ...], [R, R, ...]]` -> `[L, R, L, R, ...]`
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        if planar.is_empty() {
            return Vec::new();
        }
        let num_channels = planar.len();
        let num_frames = planar[0].len();
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }
        interleaved
    }
}
