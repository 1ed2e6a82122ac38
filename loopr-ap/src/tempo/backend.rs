//! Time-stretch backends
//!
//! A backend changes a buffer's duration without changing its pitch. The
//! stretch is always a pre-pass over a complete buffer, never inline with
//! playback.

use crate::audio::writer::{read_wav, write_wav_file};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often a running stretch process is checked for completion
const PROCESS_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Above this tempo change (in percent) the quick algorithm is used
const QUICK_MODE_THRESHOLD: f64 = 20.0;

/// Duration ratio for a tempo percentage: 80% -> 1.25 (longer, slower).
pub fn ratio_for_percent(percent: u16) -> f64 {
    100.0 / percent.max(1) as f64
}

/// Pitch-preserving duration change
pub trait StretchBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Return `samples` stretched to roughly `len * ratio` samples.
    ///
    /// `ratio` > 1.0 lengthens (slower), < 1.0 shortens (faster).
    ///
    /// # Errors
    /// `StretchUnavailable` when the backend cannot run at all,
    /// `StretchFailure` when this particular stretch failed.
    fn stretch(&self, samples: &[f32], sample_rate: u32, channels: u16, ratio: f64)
        -> Result<Vec<f32>>;
}

/// Backend used when time-stretching is disabled.
#[derive(Debug, Default)]
pub struct PassthroughBackend;

impl StretchBackend for PassthroughBackend {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn stretch(&self, _: &[f32], _: u32, _: u16, _: f64) -> Result<Vec<f32>> {
        Err(Error::StretchUnavailable(
            "time-stretch is disabled".to_string(),
        ))
    }
}

/// Stretch through the external `soundstretch` program (SoundTouch).
pub struct SoundStretchBackend {
    program: PathBuf,
    timeout: Duration,
    available: bool,
}

impl SoundStretchBackend {
    /// Create a backend, probing once whether `program` can be run.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        let program = program.into();
        let available = Self::probe(&program);
        if available {
            info!("Time-stretch available via {}", program.display());
        } else {
            warn!(
                "Time-stretch program {} not found, tempo changes disabled",
                program.display()
            );
        }
        Self {
            program,
            timeout,
            available,
        }
    }

    /// True if `program` can be spawned. `soundstretch` without arguments
    /// prints usage and exits non-zero, so only the spawn is checked.
    fn probe(program: &Path) -> bool {
        Command::new(program)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .is_ok()
    }

    /// `-tempo=` argument for a duration ratio: ratio 1.25 -> "-tempo=-20.0"
    fn tempo_arg(ratio: f64) -> (String, f64) {
        let change = 100.0 / ratio - 100.0;
        (format!("-tempo={:.1}", change), change)
    }

    fn run(&self, input: &Path, output: &Path, ratio: f64) -> Result<()> {
        let (tempo_arg, change) = Self::tempo_arg(ratio);

        let mut cmd = Command::new(&self.program);
        cmd.arg(input).arg(output).arg(&tempo_arg);
        if change.abs() > QUICK_MODE_THRESHOLD {
            cmd.arg("-quick");
        }
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        debug!("Running {:?}", cmd);
        let mut child = cmd.spawn().map_err(|e| {
            Error::StretchUnavailable(format!("Failed to run {}: {}", self.program.display(), e))
        })?;

        let started = Instant::now();
        loop {
            match child.try_wait()? {
                Some(status) if status.success() => return Ok(()),
                Some(status) => {
                    return Err(Error::StretchFailure(format!(
                        "{} exited with {}",
                        self.program.display(),
                        status
                    )));
                }
                None if started.elapsed() > self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::StretchFailure(format!(
                        "{} timed out after {:?}",
                        self.program.display(),
                        self.timeout
                    )));
                }
                None => std::thread::sleep(PROCESS_POLL_INTERVAL),
            }
        }
    }
}

impl StretchBackend for SoundStretchBackend {
    fn name(&self) -> &str {
        "soundstretch"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn stretch(
        &self,
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
        ratio: f64,
    ) -> Result<Vec<f32>> {
        if !self.available {
            return Err(Error::StretchUnavailable(format!(
                "{} is not installed",
                self.program.display()
            )));
        }

        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("in.wav");
        let output = scratch.path().join("out.wav");

        write_wav_file(&input, samples, sample_rate, channels)
            .map_err(|e| Error::StretchFailure(e.to_string()))?;
        self.run(&input, &output, ratio)?;

        let (stretched, _, out_channels) =
            read_wav(&output).map_err(|e| Error::StretchFailure(e.to_string()))?;
        if out_channels != channels {
            return Err(Error::StretchFailure(format!(
                "channel count changed from {} to {}",
                channels, out_channels
            )));
        }

        debug!(
            "Stretched {} -> {} samples (ratio {:.3})",
            samples.len(),
            stretched.len(),
            ratio
        );
        Ok(stretched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_for_percent() {
        assert!((ratio_for_percent(100) - 1.0).abs() < 1e-12);
        assert!((ratio_for_percent(80) - 1.25).abs() < 1e-12);
        assert!((ratio_for_percent(200) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tempo_arg_is_percent_change() {
        let (arg, change) = SoundStretchBackend::tempo_arg(1.25);
        assert_eq!(arg, "-tempo=-20.0");
        assert!((change + 20.0).abs() < 1e-9);

        let (arg, _) = SoundStretchBackend::tempo_arg(0.5);
        assert_eq!(arg, "-tempo=100.0");
    }

    #[test]
    fn test_passthrough_is_unavailable() {
        let backend = PassthroughBackend;
        assert!(!backend.is_available());
        assert!(matches!(
            backend.stretch(&[0.0; 4], 44100, 2, 1.25),
            Err(Error::StretchUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let backend = SoundStretchBackend::new(
            "/nonexistent/bin/soundstretch",
            Duration::from_secs(1),
        );
        assert!(!backend.is_available());
        assert!(matches!(
            backend.stretch(&[0.0; 4], 44100, 2, 1.25),
            Err(Error::StretchUnavailable(_))
        ));
    }
}
