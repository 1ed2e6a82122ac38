//! Audio file decoding using symphonia
//!
//! Decodes WAV, FLAC, MP3, OGG Vorbis and AAC/M4A files completely into RAM
//! and resamples them to the output rate.

use crate::audio::resampler::Resampler;
use crate::audio::types::Track;
use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// Decode `path` and resample it to `output_rate`.
///
/// # Errors
/// `Error::Load` when the file cannot be opened, has no audio track, or
/// decodes to zero frames.
pub fn load_track(path: &Path, output_rate: u32) -> Result<Track> {
    let (samples, sample_rate, channels) = decode_file(path)?;
    let samples = Resampler::resample(&samples, sample_rate, output_rate, channels)?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "track".to_string());

    let track = Track::new(name, samples, output_rate, channels).with_path(path);
    info!(
        "Loaded {} ({:.2}s, {}Hz, {} ch)",
        path.display(),
        track.duration_seconds(),
        output_rate,
        channels
    );
    Ok(track)
}

/// Decode an entire file to interleaved f32.
///
/// Returns `(samples, source_sample_rate, channels)`.
pub fn decode_file(path: &Path) -> Result<(Vec<f32>, u32, u16)> {
    debug!("Decoding entire file: {}", path.display());

    let file = std::fs::File::open(path)
        .map_err(|e| Error::Load(format!("Failed to open file {}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Load(format!("Failed to probe format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Load("No audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| Error::Load("Sample rate not found".to_string()))?;
    let channels = codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| Error::Load("Channel count not found".to_string()))?;

    debug!("Audio format: sample_rate={}, channels={}", sample_rate, channels);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Load(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                debug!("Reached end of file");
                break;
            }
            Err(e) => {
                warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
                });
                // a later packet may be larger than the first one
                if buf.capacity() < decoded.capacity() * decoded.spec().channels.count() {
                    *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                }
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Decode error: {}", e);
                continue;
            }
            Err(e) => {
                return Err(Error::Load(format!("Decoder failed: {}", e)));
            }
        }
    }

    if samples.is_empty() {
        return Err(Error::Load(format!(
            "No audio decoded from {}",
            path.display()
        )));
    }

    debug!(
        "Decoded {} samples ({} frames)",
        samples.len(),
        samples.len() / channels as usize
    );
    Ok((samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_load_error() {
        let result = decode_file(Path::new("/nonexistent/song.wav"));
        assert!(matches!(result, Err(Error::Load(_))));
    }

    #[test]
    fn test_garbage_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp3");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0x13u8; 512]).unwrap();

        assert!(matches!(load_track(&path, 44100), Err(Error::Load(_))));
    }
}
