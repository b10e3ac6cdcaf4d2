//! Output backends: the byte-level device contract plus the cpal
//! implementation and an in-memory one for tests.

pub mod cpal;
pub mod dummy;

pub use self::cpal::CpalOutputBackend;
pub use dummy::DummyOutputBackend;

use crate::format::AudioFormat;
use crate::{ChannelsCount, SampleRate, SamplesCount};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The operation requires an open backend.
    NotOpen,
    AlreadyOpen,
    DefaultDeviceNotFound,
    NotSupportedStreamParameters(SampleRate, ChannelsCount, SamplesCount),
    FetchConfigFailed(::cpal::SupportedStreamConfigsError),
    BuildStreamFailed(::cpal::BuildStreamError),
    StartStreamFailed(::cpal::PlayStreamError),
    PauseStreamFailed(::cpal::PauseStreamError),
    InvalidBufferSize(SamplesCount),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotOpen => write!(f, "Backend is not open"),
            BackendError::AlreadyOpen => write!(f, "Backend is already open"),
            BackendError::DefaultDeviceNotFound => write!(f, "Default output device not found"),
            BackendError::NotSupportedStreamParameters(sample_rate, channels, buffer_size) => {
                write!(
                    f,
                    "Stream parameters not supported: sample_rate: {}, channels: {}, buffer_size: {}",
                    sample_rate, channels, buffer_size
                )
            }
            BackendError::FetchConfigFailed(err) => write!(f, "Failed to fetch config: {}", err),
            BackendError::BuildStreamFailed(err) => write!(f, "Failed to build stream: {}", err),
            BackendError::StartStreamFailed(err) => write!(f, "Failed to start stream: {}", err),
            BackendError::PauseStreamFailed(err) => write!(f, "Failed to pause stream: {}", err),
            BackendError::InvalidBufferSize(size) => write!(f, "Invalid buffer size: {}", size),
        }
    }
}

impl std::error::Error for BackendError {}

/// A byte-level audio output device.
///
/// `open` negotiates; the returned format is what the device actually
/// runs at and is the format `write` expects bytes in. Every other
/// operation fails with [`BackendError::NotOpen`] until `open` succeeds.
pub trait AudioOutputBackend: Send {
    /// Opens the device as close to `format` as it supports, with an
    /// internal buffer of `buffer_size` frames.
    fn open(
        &mut self,
        format: &AudioFormat,
        buffer_size: SamplesCount,
    ) -> Result<AudioFormat, BackendError>;

    /// Starts playback. Written data is only audible after this.
    fn start(&mut self) -> Result<(), BackendError>;

    /// Pauses playback, keeping buffered data.
    fn stop(&mut self) -> Result<(), BackendError>;

    /// Queues interleaved bytes in the opened format. Returns how many
    /// bytes were accepted; zero means the buffer is currently full.
    fn write(&mut self, data: &[u8]) -> Result<usize, BackendError>;

    /// Discards data queued but not yet played.
    fn flush(&mut self) -> Result<(), BackendError>;

    /// Blocks until the queue has drained.
    fn drain(&mut self) -> Result<(), BackendError>;

    fn close(&mut self) -> Result<(), BackendError>;

    /// Frames that can currently be written without blocking.
    fn available(&self) -> Result<SamplesCount, BackendError>;

    /// Total buffer capacity in frames.
    fn buffer_size(&self) -> Result<SamplesCount, BackendError>;

    /// Frames handed to the device since `open`.
    fn frame_position(&self) -> Result<u64, BackendError>;

    /// Current queue depth expressed as microseconds of audio.
    fn latency_micros(&self) -> Result<u64, BackendError>;

    fn is_open(&self) -> bool;
}
