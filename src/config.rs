//! Explicit configuration values passed to constructors. There is no
//! global state; two mixers can run with different settings in the same
//! process.

use crate::resample::ResampleMethodKind;
use crate::SamplesCount;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResamplerConfig {
    pub method: ResampleMethodKind,
    pub quality: usize,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        ResamplerConfig {
            method: ResampleMethodKind::Linear,
            quality: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerConfig {
    pub enable_effects: bool,
    pub swap_channels: bool,
    pub reverse_polarity: bool,
    /// When set, an input that renders the wrong number of samples is an
    /// error; otherwise only the overlapping region is mixed.
    pub check_length_mismatch: bool,
    /// Resampler used for per-input playback speed.
    pub resampler: ResamplerConfig,
}

impl Default for MixerConfig {
    fn default() -> Self {
        MixerConfig {
            enable_effects: true,
            swap_channels: false,
            reverse_polarity: false,
            check_length_mismatch: true,
            resampler: ResamplerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Samples per channel rendered in one block.
    pub render_buffer_size: SamplesCount,
    /// Capacity of the control-to-render event queue.
    pub event_queue_capacity: usize,
    /// Resampler bridging the graph rate and the device rate.
    pub resampler: ResamplerConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            render_buffer_size: 1024,
            event_queue_capacity: 256,
            resampler: ResamplerConfig::default(),
        }
    }
}
