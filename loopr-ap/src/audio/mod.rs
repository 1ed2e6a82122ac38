//! Audio I/O: decoding, resampling, output sinks and WAV files

pub mod decoder;
pub mod output;
pub mod resampler;
pub mod types;
pub mod writer;

pub use decoder::load_track;
pub use output::{AudioSink, CpalSink, NullSink};
pub use resampler::Resampler;
pub use types::{SinkBuffer, Track};
