//! Audio output
//!
//! The playback worker talks to an [`AudioSink`]: it submits one section at
//! a time, polls `is_active()` to learn when the section has drained, and
//! calls `stop()` to cut it short. Position is never read back from the sink.
//!
//! `CpalSink` plays through a real device. `NullSink` discards audio but
//! stays active for the section's real-time duration, for headless runs.

use crate::audio::types::SinkBuffer;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Destination for decoded audio sections
pub trait AudioSink: Send {
    /// Begin playing `buffer`, replacing anything currently playing.
    fn start(&mut self, buffer: SinkBuffer) -> Result<()>;

    /// Stop immediately. Stopping an idle sink is not an error.
    fn stop(&mut self) -> Result<()>;

    /// True while submitted audio is still being played.
    fn is_active(&self) -> bool;

    /// True once the underlying device has reported a failure.
    fn has_error(&self) -> bool {
        false
    }

    fn name(&self) -> String;
}

/// Section being played by the device callback
struct Playhead {
    buffer: SinkBuffer,
    cursor: usize,
}

/// State shared between the sink handle and the device callback
#[derive(Default)]
struct SinkShared {
    playhead: Mutex<Option<Playhead>>,
    active: AtomicBool,
    error_flag: AtomicBool,
}

/// Output through a cpal device.
///
/// The cpal `Stream` is created on and owned by a dedicated output thread,
/// so the handle itself can move between threads.
pub struct CpalSink {
    shared: Arc<SinkShared>,
    device_name: String,
    sample_rate: u32,
    shutdown_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// List available output device names.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::Sink(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();
        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open `device_name` (or the default device) and start a silent stream.
    ///
    /// Falls back to the default device when the requested one is missing.
    pub fn open(device_name: Option<&str>, buffer_size: Option<u32>) -> Result<Self> {
        let shared = Arc::new(SinkShared::default());
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(String, u32)>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_shared = Arc::clone(&shared);
        let requested = device_name.map(str::to_string);
        let thread = std::thread::Builder::new()
            .name("loopr-audio-out".to_string())
            .spawn(move || {
                let stream = match open_stream(requested.as_deref(), buffer_size, thread_shared) {
                    Ok((stream, name, rate)) => {
                        let _ = ready_tx.send(Ok((name, rate)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // hold the stream until the handle is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("Audio output thread exiting");
            })?;

        let (device_name, sample_rate) = ready_rx
            .recv()
            .map_err(|_| Error::Sink("Audio output thread exited during setup".to_string()))??;

        info!("Audio output ready: {} @ {}Hz", device_name, sample_rate);
        Ok(Self {
            shared,
            device_name,
            sample_rate,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Device sample rate; tracks should be resampled to this.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl AudioSink for CpalSink {
    fn start(&mut self, buffer: SinkBuffer) -> Result<()> {
        if self.has_error() {
            return Err(Error::Sink(format!(
                "Audio device '{}' reported an error",
                self.device_name
            )));
        }
        let mut playhead = self
            .shared
            .playhead
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let cursor = buffer.start_frame;
        let has_audio = buffer.frame_count() > 0;
        *playhead = Some(Playhead { buffer, cursor });
        self.shared.active.store(has_audio, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut playhead = self
            .shared
            .playhead
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *playhead = None;
        self.shared.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    fn has_error(&self) -> bool {
        self.shared.error_flag.load(Ordering::SeqCst)
    }

    fn name(&self) -> String {
        self.device_name.clone()
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown_tx.take();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn open_stream(
    device_name: Option<&str>,
    buffer_size: Option<u32>,
    shared: Arc<SinkShared>,
) -> Result<(Stream, String, u32)> {
    let (device, name) = select_device(device_name)?;
    let (mut config, sample_format) = best_config(&device)?;

    if let Some(size) = buffer_size {
        config.buffer_size = cpal::BufferSize::Fixed(size);
        debug!("Using requested buffer size: {} frames", size);
    }

    debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
        config.sample_rate.0, config.channels, sample_format, config.buffer_size
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, shared)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, shared)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, shared)?,
        other => {
            return Err(Error::Sink(format!("Unsupported sample format: {:?}", other)));
        }
    };
    stream
        .play()
        .map_err(|e| Error::Sink(format!("Failed to start stream: {}", e)))?;

    Ok((stream, name, config.sample_rate.0))
}

fn select_device(device_name: Option<&str>) -> Result<(Device, String)> {
    let host = cpal::default_host();

    if let Some(name) = device_name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::Sink(format!("Failed to enumerate devices: {}", e)))?;
        if let Some(dev) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            info!("Found requested audio device: {}", name);
            return Ok((dev, name.to_string()));
        }
        warn!(
            "Requested device '{}' not found, falling back to default device",
            name
        );
    }

    let dev = host
        .default_output_device()
        .ok_or_else(|| Error::Sink("No default output device found".to_string()))?;
    let name = dev.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using default audio device: {}", name);
    Ok((dev, name))
}

/// Prefer 44.1kHz stereo f32, otherwise the device default.
fn best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
    let mut supported = device
        .supported_output_configs()
        .map_err(|e| Error::Sink(format!("Failed to get device configs: {}", e)))?;

    let preferred = supported.find(|config| {
        config.channels() == 2
            && config.min_sample_rate().0 <= 44100
            && config.max_sample_rate().0 >= 44100
            && config.sample_format() == SampleFormat::F32
    });
    if let Some(config) = preferred {
        let format = config.sample_format();
        return Ok((config.with_sample_rate(cpal::SampleRate(44100)).config(), format));
    }

    let config = device
        .default_output_config()
        .map_err(|e| Error::Sink(format!("Failed to get default config: {}", e)))?;
    let format = config.sample_format();
    Ok((config.config(), format))
}

fn build_stream<T>(device: &Device, config: &StreamConfig, shared: Arc<SinkShared>) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let out_channels = config.channels as usize;
    let error_shared = Arc::clone(&shared);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut guard = shared.playhead.lock().unwrap_or_else(PoisonError::into_inner);
                let mut exhausted = false;

                for frame in data.chunks_mut(out_channels) {
                    match guard.as_mut() {
                        Some(head) if head.cursor < head.buffer.end_frame => {
                            let src_channels = head.buffer.channels.max(1) as usize;
                            let base = head.cursor * src_channels;
                            for (ch, out) in frame.iter_mut().enumerate() {
                                let idx = base + ch.min(src_channels - 1);
                                let sample = head.buffer.samples.get(idx).copied().unwrap_or(0.0);
                                *out = T::from_sample(sample.clamp(-1.0, 1.0));
                            }
                            head.cursor += 1;
                        }
                        Some(_) => {
                            exhausted = true;
                            frame.fill(T::EQUILIBRIUM);
                        }
                        None => frame.fill(T::EQUILIBRIUM),
                    }
                }

                if exhausted {
                    *guard = None;
                    shared.active.store(false, Ordering::SeqCst);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_shared.error_flag.store(true, Ordering::SeqCst);
                error_shared.active.store(false, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| Error::Sink(format!("Failed to build stream: {}", e)))
}

/// Silent sink that stays active for the real-time length of each section.
#[derive(Debug, Default)]
pub struct NullSink {
    playing_until: Option<Instant>,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for NullSink {
    fn start(&mut self, buffer: SinkBuffer) -> Result<()> {
        let length: Duration = buffer.duration();
        self.playing_until = Some(Instant::now() + length);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.playing_until = None;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.playing_until.is_some_and(|until| Instant::now() < until)
    }

    fn name(&self) -> String {
        "null".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(frames: usize, rate: u32) -> SinkBuffer {
        SinkBuffer {
            samples: Arc::new(vec![0.0; frames * 2]),
            start_frame: 0,
            end_frame: frames,
            sample_rate: rate,
            channels: 2,
        }
    }

    #[test]
    fn test_null_sink_is_active_for_section_length() {
        let mut sink = NullSink::new();
        assert!(!sink.is_active());

        sink.start(section(100, 1000)).unwrap();
        assert!(sink.is_active());

        std::thread::sleep(Duration::from_millis(150));
        assert!(!sink.is_active());
    }

    #[test]
    fn test_null_sink_stop_is_immediate() {
        let mut sink = NullSink::new();
        sink.start(section(44100, 44100)).unwrap();
        sink.stop().unwrap();
        assert!(!sink.is_active());
        // stopping twice is fine
        sink.stop().unwrap();
    }

    #[test]
    fn test_null_sink_empty_section_is_inactive() {
        let mut sink = NullSink::new();
        sink.start(section(0, 44100)).unwrap();
        assert!(!sink.is_active());
        assert!(!sink.has_error());
    }
}
