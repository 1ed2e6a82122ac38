//! WAV file I/O using hound
//!
//! Exported loop regions are written as 16-bit PCM. The same helpers move
//! audio to and from the external time-stretch program.

use crate::error::{Error, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tracing::debug;

/// Upper bound on `_n` collision suffixes tried by [`create_unique`]
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Write interleaved f32 samples as 16-bit PCM WAV.
pub fn write_wav<W>(writer: W, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()>
where
    W: Write + std::io::Seek,
{
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut wav = WavWriter::new(writer, spec)
        .map_err(|e| Error::Export(format!("Failed to start WAV: {}", e)))?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        wav.write_sample(value)
            .map_err(|e| Error::Export(format!("Failed to write sample: {}", e)))?;
    }
    wav.finalize()
        .map_err(|e| Error::Export(format!("Failed to finalize WAV: {}", e)))?;
    Ok(())
}

/// Write a WAV file at `path`, replacing any existing file.
pub fn write_wav_file(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let file = File::create(path)?;
    write_wav(BufWriter::new(file), samples, sample_rate, channels)
}

/// Read a WAV file into interleaved f32.
///
/// Returns `(samples, sample_rate, channels)`.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32, u16)> {
    let reader = WavReader::open(path)
        .map_err(|e| Error::Load(format!("Failed to open WAV {}: {}", path.display(), e)))?;
    let spec = reader.spec();

    let samples: std::result::Result<Vec<f32>, hound::Error> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect(),
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect()
        }
    };
    let samples =
        samples.map_err(|e| Error::Load(format!("Failed to read WAV {}: {}", path.display(), e)))?;

    Ok((samples, spec.sample_rate, spec.channels))
}

/// Create `{dir}/{base}_{stamp}.wav`, or the first free `{base}_{stamp}_{n}.wav`.
///
/// Files are opened with create-new semantics so two exports can never
/// claim the same name. Returns the open file and its file name.
pub fn create_unique(dir: &Path, base: &str, stamp: &str) -> Result<(File, String)> {
    std::fs::create_dir_all(dir)?;

    for n in 0..=MAX_COLLISION_SUFFIX {
        let name = if n == 0 {
            format!("{}_{}.wav", base, stamp)
        } else {
            format!("{}_{}_{}.wav", base, stamp, n)
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&name))
        {
            Ok(file) => {
                debug!("Created export file {}", name);
                return Ok((file, name));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::Export(format!(
        "No free file name for {}_{} in {}",
        base,
        stamp,
        dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_keeps_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let samples = vec![0.0, 0.5, -0.5, 1.0, 0.25, -1.0];

        write_wav_file(&path, &samples, 22050, 2).unwrap();
        let (read, rate, channels) = read_wav(&path).unwrap();

        assert_eq!(rate, 22050);
        assert_eq!(channels, 2);
        assert_eq!(read.len(), samples.len());
        for (a, b) in read.iter().zip(&samples) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_create_unique_adds_suffix() {
        let dir = tempfile::tempdir().unwrap();

        let (_, first) = create_unique(dir.path(), "song", "0002").unwrap();
        let (_, second) = create_unique(dir.path(), "song", "0002").unwrap();
        let (_, third) = create_unique(dir.path(), "song", "0002").unwrap();

        assert_eq!(first, "song_0002.wav");
        assert_eq!(second, "song_0002_1.wav");
        assert_eq!(third, "song_0002_2.wav");
    }

    #[test]
    fn test_create_unique_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let (_, name) = create_unique(&nested, "x", "0100").unwrap();
        assert!(nested.join(name).exists());
    }
}
