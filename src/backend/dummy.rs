use super::{AudioOutputBackend, BackendError};
use crate::format::AudioFormat;
use crate::SamplesCount;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory backend that accepts everything it is given. Used in tests
/// and anywhere audio should be rendered without a device.
pub struct DummyOutputBackend {
    opened: Option<AudioFormat>,
    started: bool,
    buffer_size: SamplesCount,
    frames_written: Arc<AtomicU64>,
}

/// Cheap observer for a [`DummyOutputBackend`] that has been boxed away.
#[derive(Clone)]
pub struct DummyProbe {
    frames_written: Arc<AtomicU64>,
}

impl DummyProbe {
    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }
}

impl DummyOutputBackend {
    pub fn new() -> Self {
        DummyOutputBackend {
            opened: None,
            started: false,
            buffer_size: 0,
            frames_written: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn probe(&self) -> DummyProbe {
        DummyProbe {
            frames_written: self.frames_written.clone(),
        }
    }

    fn opened(&self) -> Result<&AudioFormat, BackendError> {
        self.opened.as_ref().ok_or(BackendError::NotOpen)
    }
}

impl Default for DummyOutputBackend {
    fn default() -> Self {
        DummyOutputBackend::new()
    }
}

impl AudioOutputBackend for DummyOutputBackend {
    fn open(
        &mut self,
        format: &AudioFormat,
        buffer_size: SamplesCount,
    ) -> Result<AudioFormat, BackendError> {
        if self.opened.is_some() {
            return Err(BackendError::AlreadyOpen);
        }
        if buffer_size == 0 {
            return Err(BackendError::InvalidBufferSize(0));
        }
        self.opened = Some(*format);
        self.buffer_size = buffer_size;
        self.frames_written.store(0, Ordering::Relaxed);
        Ok(*format)
    }

    fn start(&mut self) -> Result<(), BackendError> {
        self.opened()?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.opened()?;
        self.started = false;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, BackendError> {
        let frame_size = self.opened()?.frame_size();
        self.frames_written
            .fetch_add((data.len() / frame_size) as u64, Ordering::Relaxed);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        self.opened()?;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), BackendError> {
        self.opened()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.opened()?;
        self.opened = None;
        self.started = false;
        Ok(())
    }

    fn available(&self) -> Result<SamplesCount, BackendError> {
        self.opened()?;
        Ok(self.buffer_size)
    }

    fn buffer_size(&self) -> Result<SamplesCount, BackendError> {
        self.opened()?;
        Ok(self.buffer_size)
    }

    fn frame_position(&self) -> Result<u64, BackendError> {
        self.opened()?;
        Ok(self.frames_written.load(Ordering::Relaxed))
    }

    fn latency_micros(&self) -> Result<u64, BackendError> {
        self.opened()?;
        Ok(0)
    }

    fn is_open(&self) -> bool {
        self.opened.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_fails_before_open() {
        let mut backend = DummyOutputBackend::new();
        assert!(!backend.is_open());
        assert_eq!(backend.start().unwrap_err(), BackendError::NotOpen);
        assert_eq!(backend.stop().unwrap_err(), BackendError::NotOpen);
        assert_eq!(backend.write(&[0u8; 4]).unwrap_err(), BackendError::NotOpen);
        assert_eq!(backend.flush().unwrap_err(), BackendError::NotOpen);
        assert_eq!(backend.drain().unwrap_err(), BackendError::NotOpen);
        assert_eq!(backend.close().unwrap_err(), BackendError::NotOpen);
        assert_eq!(backend.available().unwrap_err(), BackendError::NotOpen);
        assert_eq!(backend.buffer_size().unwrap_err(), BackendError::NotOpen);
        assert_eq!(
            backend.frame_position().unwrap_err(),
            BackendError::NotOpen
        );
        assert_eq!(
            backend.latency_micros().unwrap_err(),
            BackendError::NotOpen
        );
    }

    #[test]
    fn tracks_written_frames() {
        let mut backend = DummyOutputBackend::new();
        let probe = backend.probe();
        let format = AudioFormat::CD_QUALITY;
        backend.open(&format, 1024).unwrap();
        backend.start().unwrap();
        // 16-bit stereo: 4 bytes per frame.
        backend.write(&[0u8; 400]).unwrap();
        assert_eq!(probe.frames_written(), 100);
        assert_eq!(backend.frame_position().unwrap(), 100);
    }

    #[test]
    fn double_open_is_rejected() {
        let mut backend = DummyOutputBackend::new();
        backend.open(&AudioFormat::CD_QUALITY, 256).unwrap();
        assert_eq!(
            backend.open(&AudioFormat::CD_QUALITY, 256).unwrap_err(),
            BackendError::AlreadyOpen
        );
    }

    #[test]
    fn close_makes_it_reusable() {
        let mut backend = DummyOutputBackend::new();
        backend.open(&AudioFormat::CD_QUALITY, 256).unwrap();
        backend.close().unwrap();
        assert!(!backend.is_open());
        backend.open(&AudioFormat::CD_QUALITY, 256).unwrap();
        assert!(backend.is_open());
    }
}
