//! Leaf nodes that produce audio: procedural waveforms and preloaded
//! clips.

pub mod buffer;
pub mod waveform;

pub use buffer::BufferSource;
pub use waveform::{Waveform, WaveformSource};
