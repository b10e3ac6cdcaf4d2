//! Real-time audio mixing and resampling.
//!
//! Audio flows through a graph of [`node::AudioNode`]s pulled by an
//! [`output::AudioOutputLayer`] render thread, which converts the planar
//! f32 blocks to the device byte format and hands them to an
//! [`backend::AudioOutputBackend`].

pub mod backend;
pub mod config;
pub mod control;
pub mod convert;
pub mod dsp;
pub mod effects;
pub mod format;
pub mod mixer;
pub mod node;
pub mod output;
pub mod resample;
pub mod sample;
pub mod sources;

pub type SamplesCount = usize;
pub type SampleRate = usize;
pub type ChannelsCount = usize;

/// All graph processing is done in normalized f32 samples.
/// Conversion to the device format happens at the very edge.
pub type SampleType = f32;
