use super::{AudioOutputBackend, BackendError};
use crate::format::{AudioFormat, Encoding};
use crate::SamplesCount;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, info, warn};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// cpal-backed output device. `write` pushes f32 samples into a lock-free
/// ring buffer; the device callback pops them and zero-fills on underrun.
///
/// cpal only deals in native sample types, so whatever format is
/// requested, the stream opens as 32-bit float at the device's
/// endianness and the negotiated rate/channel count is reported back.
pub struct CpalOutputBackend {
    device: cpal::Device,
    opened: Option<OpenedStream>,
}

struct OpenedStream {
    format: AudioFormat,
    stream: cpal::Stream,
    producer: HeapProd<f32>,
    started: bool,
    buffer_frames: SamplesCount,
    frames_played: Arc<AtomicU64>,
}

// Internal CPAL implementation has weird issues with Send on some
// platforms. The stream is only ever driven from the control side of
// the output layer, never concurrently.
unsafe impl Send for CpalOutputBackend {}

impl CpalOutputBackend {
    pub fn new() -> Result<Self, BackendError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(BackendError::DefaultDeviceNotFound)?;
        Ok(CpalOutputBackend {
            device,
            opened: None,
        })
    }

    fn opened_mut(&mut self) -> Result<&mut OpenedStream, BackendError> {
        self.opened.as_mut().ok_or(BackendError::NotOpen)
    }

    fn opened_ref(&self) -> Result<&OpenedStream, BackendError> {
        self.opened.as_ref().ok_or(BackendError::NotOpen)
    }
}

impl AudioOutputBackend for CpalOutputBackend {
    fn open(
        &mut self,
        format: &AudioFormat,
        buffer_size: SamplesCount,
    ) -> Result<AudioFormat, BackendError> {
        if self.opened.is_some() {
            return Err(BackendError::AlreadyOpen);
        }
        if buffer_size == 0 {
            return Err(BackendError::InvalidBufferSize(buffer_size));
        }

        let requested_rate = cpal::SampleRate(format.sample_rate() as u32);
        let supported_configs = self
            .device
            .supported_output_configs()
            .map_err(BackendError::FetchConfigFailed)?;

        let mut selected: Option<cpal::StreamConfig> = None;
        for config in supported_configs {
            debug!(
                "Supported config: sample_format: {:?}, sample_rate: {}-{}, channels: {}, buffer_size: {:?}",
                config.sample_format(),
                config.min_sample_rate().0,
                config.max_sample_rate().0,
                config.channels(),
                config.buffer_size()
            );

            let sample_format_ok = config.sample_format() == cpal::SampleFormat::F32;
            let sample_rate_ok = config.min_sample_rate() <= requested_rate
                && requested_rate <= config.max_sample_rate();
            let channels_ok = config.channels() as usize == format.channels();
            let buffer_size_ok = match config.buffer_size() {
                cpal::SupportedBufferSize::Range { min, max } => {
                    buffer_size >= *min as usize && buffer_size <= *max as usize
                }
                cpal::SupportedBufferSize::Unknown => continue,
            };

            if sample_format_ok && sample_rate_ok && channels_ok && buffer_size_ok {
                selected = Some(cpal::StreamConfig {
                    channels: config.channels(),
                    sample_rate: requested_rate,
                    buffer_size: cpal::BufferSize::Fixed(buffer_size as u32),
                });
                break;
            }
        }

        let config = selected.ok_or(BackendError::NotSupportedStreamParameters(
            format.sample_rate(),
            format.channels(),
            buffer_size,
        ))?;

        let channels = config.channels as usize;
        let opened_format = AudioFormat::new(
            config.sample_rate.0 as usize,
            32,
            channels,
            Encoding::PcmFloat,
            cfg!(target_endian = "big"),
        )
        .map_err(|_| {
            BackendError::NotSupportedStreamParameters(
                format.sample_rate(),
                format.channels(),
                buffer_size,
            )
        })?;

        let (producer, mut consumer) = HeapRb::<f32>::new(buffer_size * channels).split();
        let frames_played = Arc::new(AtomicU64::new(0));
        let callback_frames = frames_played.clone();
        let callback = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let read = consumer.pop_slice(data);
            if read < data.len() {
                data[read..].fill(0.0);
                warn!("Output underrun: got {} of {} samples", read, data.len());
            }
            callback_frames.fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
        };
        let err_fn = |err| warn!("Output stream error: {}", err);

        info!("Opening output stream: {}", opened_format);
        let stream = self
            .device
            .build_output_stream(&config, callback, err_fn, None)
            .map_err(BackendError::BuildStreamFailed)?;

        self.opened = Some(OpenedStream {
            format: opened_format,
            stream,
            producer,
            started: false,
            buffer_frames: buffer_size,
            frames_played,
        });
        Ok(opened_format)
    }

    fn start(&mut self) -> Result<(), BackendError> {
        let opened = self.opened_mut()?;
        opened
            .stream
            .play()
            .map_err(BackendError::StartStreamFailed)?;
        opened.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        let opened = self.opened_mut()?;
        opened
            .stream
            .pause()
            .map_err(BackendError::PauseStreamFailed)?;
        opened.started = false;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, BackendError> {
        let opened = self.opened_mut()?;
        let big_endian = opened.format.is_big_endian();
        let mut accepted = 0;
        for chunk in data.chunks_exact(4) {
            let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
            let sample = if big_endian {
                f32::from_be_bytes(bytes)
            } else {
                f32::from_le_bytes(bytes)
            };
            if opened.producer.try_push(sample).is_err() {
                break;
            }
            accepted += 4;
        }
        Ok(accepted)
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        // The consumer half lives inside the device callback, which
        // drains the ring on its own; there is no queue beyond it that
        // could be discarded here.
        self.opened_ref()?;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), BackendError> {
        let opened = self.opened_ref()?;
        if !opened.started {
            return Ok(());
        }
        while opened.producer.occupied_len() > 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        let opened = self.opened.take().ok_or(BackendError::NotOpen)?;
        if opened.started {
            if let Err(err) = opened.stream.pause() {
                warn!("Failed to pause stream on close: {}", err);
            }
        }
        // Dropping the stream releases the device.
        Ok(())
    }

    fn available(&self) -> Result<SamplesCount, BackendError> {
        let opened = self.opened_ref()?;
        Ok(opened.producer.vacant_len() / opened.format.channels())
    }

    fn buffer_size(&self) -> Result<SamplesCount, BackendError> {
        Ok(self.opened_ref()?.buffer_frames)
    }

    fn frame_position(&self) -> Result<u64, BackendError> {
        Ok(self.opened_ref()?.frames_played.load(Ordering::Relaxed))
    }

    fn latency_micros(&self) -> Result<u64, BackendError> {
        let opened = self.opened_ref()?;
        let queued_frames = opened.producer.occupied_len() / opened.format.channels();
        Ok(queued_frames as u64 * 1_000_000 / opened.format.sample_rate() as u64)
    }

    fn is_open(&self) -> bool {
        self.opened.is_some()
    }
}
