//! `AudioOutputLayer`: owns a backend and a swappable root node, and runs
//! the render thread that pulls blocks from the graph, converts them to
//! the device byte format and feeds the backend.

use crate::backend::{AudioOutputBackend, BackendError};
use crate::config::OutputConfig;
use crate::convert;
use crate::format::AudioFormat;
use crate::node::{NodeEvent, NodeHandle};
use crate::resample::{AudioResampler, ResampleError};
use crate::sample;
use crate::SamplesCount;
use arc_swap::ArcSwapOption;
use crossbeam_queue::ArrayQueue;
use log::{debug, error, info, warn};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

const RENDER_THREAD_NAME: &str = "audio-render";

#[derive(Debug, Clone, PartialEq)]
pub enum OutputError {
    NotOpen,
    AlreadyStarted,
    InvalidBufferSize(SamplesCount),
    Backend(BackendError),
    InvalidResampler(ResampleError),
    FailedToSpawnRenderThread,
}

impl Display for OutputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::NotOpen => write!(f, "Output layer is not open"),
            OutputError::AlreadyStarted => write!(f, "Output layer is already started"),
            OutputError::InvalidBufferSize(size) => write!(f, "Invalid buffer size: {}", size),
            OutputError::Backend(err) => write!(f, "Backend error: {}", err),
            OutputError::InvalidResampler(err) => write!(f, "Invalid resampler: {}", err),
            OutputError::FailedToSpawnRenderThread => {
                write!(f, "Failed to spawn the render thread")
            }
        }
    }
}

impl std::error::Error for OutputError {}

impl From<BackendError> for OutputError {
    fn from(err: BackendError) -> Self {
        OutputError::Backend(err)
    }
}

type SharedBackend = Arc<Mutex<Box<dyn AudioOutputBackend>>>;

// A poisoned backend lock only means a render thread panicked mid-call;
// the backend itself is still the best handle we have for cleanup.
fn lock_backend(backend: &SharedBackend) -> MutexGuard<'_, Box<dyn AudioOutputBackend>> {
    match backend.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct AudioOutputLayer {
    backend: SharedBackend,
    root: Arc<ArcSwapOption<NodeHandle>>,
    events: Arc<ArrayQueue<NodeEvent>>,
    resampler: AudioResampler,
    config: OutputConfig,
    /// Rate the graph renders at; negotiated at `open`.
    source_format: Option<AudioFormat>,
    /// Format the backend actually runs at.
    opened_format: Option<AudioFormat>,
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AudioOutputLayer {
    pub fn new(
        backend: Box<dyn AudioOutputBackend>,
        config: OutputConfig,
    ) -> Result<Self, OutputError> {
        if config.render_buffer_size == 0 {
            return Err(OutputError::InvalidBufferSize(0));
        }
        let resampler =
            AudioResampler::with_config(&config.resampler).map_err(OutputError::InvalidResampler)?;
        Ok(AudioOutputLayer {
            backend: Arc::new(Mutex::new(backend)),
            root: Arc::new(ArcSwapOption::from(None)),
            events: Arc::new(ArrayQueue::new(config.event_queue_capacity)),
            resampler,
            config,
            source_format: None,
            opened_format: None,
            stop_signal: Arc::new(AtomicBool::new(false)),
            thread: None,
        })
    }

    /// Opens the backend. The graph renders at `format`'s rate and
    /// channel count; if the device settles on a different rate the
    /// render thread resamples every block to bridge the gap.
    pub fn open(
        &mut self,
        format: AudioFormat,
        buffer_size: SamplesCount,
    ) -> Result<(), OutputError> {
        let opened = lock_backend(&self.backend).open(&format, buffer_size)?;
        if opened.sample_rate() != format.sample_rate() {
            info!(
                "Device runs at {} Hz, graph at {} Hz; resampling in between",
                opened.sample_rate(),
                format.sample_rate()
            );
        }
        self.source_format = Some(format);
        self.opened_format = Some(opened);
        Ok(())
    }

    /// Swaps the root node. Takes effect at the next block boundary.
    pub fn set_root(&self, root: NodeHandle) {
        self.root.store(Some(Arc::new(root)));
    }

    pub fn clear_root(&self) {
        self.root.store(None);
    }

    /// Queues an event for delivery on the render thread before the next
    /// block. Returns false (and drops the event) if the queue is full.
    pub fn push_event(&self, event: NodeEvent) -> bool {
        if self.events.push(event).is_err() {
            warn!("Event queue is full, dropping event");
            return false;
        }
        true
    }

    pub fn start(&mut self) -> Result<(), OutputError> {
        let source_format = self.source_format.ok_or(OutputError::NotOpen)?;
        let opened_format = self.opened_format.ok_or(OutputError::NotOpen)?;
        if self.thread.is_some() {
            return Err(OutputError::AlreadyStarted);
        }

        lock_backend(&self.backend).start()?;
        self.stop_signal.store(false, Ordering::Release);

        let worker = RenderWorker {
            backend: self.backend.clone(),
            root: self.root.clone(),
            events: self.events.clone(),
            resampler: self.resampler.clone(),
            stop_signal: self.stop_signal.clone(),
            source_format,
            opened_format,
            block_size: self.config.render_buffer_size,
        };
        let thread = std::thread::Builder::new()
            .name(RENDER_THREAD_NAME.into())
            .spawn(move || worker.run())
            .map_err(|_| OutputError::FailedToSpawnRenderThread)?;
        self.thread = Some(thread);
        Ok(())
    }

    /// Signals the render thread, waits for it to finish its block and
    /// pauses the backend.
    pub fn stop(&mut self) -> Result<(), OutputError> {
        self.stop_signal.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Render thread panicked");
            }
        }
        lock_backend(&self.backend).stop()?;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), OutputError> {
        if self.thread.is_some() {
            self.stop()?;
        }
        lock_backend(&self.backend).close()?;
        self.source_format = None;
        self.opened_format = None;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.opened_format.is_some()
    }

    pub fn frame_position(&self) -> Result<u64, OutputError> {
        Ok(lock_backend(&self.backend).frame_position()?)
    }

    pub fn latency_micros(&self) -> Result<u64, OutputError> {
        Ok(lock_backend(&self.backend).latency_micros()?)
    }
}

impl Drop for AudioOutputLayer {
    fn drop(&mut self) {
        debug!("Dropping output layer");
        self.stop_signal.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        if self.opened_format.is_some() {
            if let Err(err) = lock_backend(&self.backend).close() {
                warn!("Failed to close backend on drop: {}", err);
            }
        }
    }
}

struct RenderWorker {
    backend: SharedBackend,
    root: Arc<ArcSwapOption<NodeHandle>>,
    events: Arc<ArrayQueue<NodeEvent>>,
    resampler: AudioResampler,
    stop_signal: Arc<AtomicBool>,
    source_format: AudioFormat,
    opened_format: AudioFormat,
    block_size: SamplesCount,
}

impl RenderWorker {
    fn run(self) {
        let channels = self.opened_format.channels();
        let source_rate = self.source_format.sample_rate();
        let device_rate = self.opened_format.sample_rate();
        let block_micros =
            (self.block_size as u64 * 1_000_000 / source_rate as u64).max(1);
        let mut buffer = vec![vec![0.0f32; self.block_size]; channels];

        info!(
            "Render thread running: {} frames per block, {} -> {} Hz",
            self.block_size, source_rate, device_rate
        );

        loop {
            if self.stop_signal.load(Ordering::Acquire) {
                debug!("Received stop signal");
                break;
            }

            let root = self.root.load_full();
            let root = match root {
                Some(root) => root,
                None => {
                    // Nothing to render; wait out one block.
                    std::thread::sleep(Duration::from_micros(block_micros));
                    continue;
                }
            };

            // Deliver pending parameter changes between blocks.
            while let Some(event) = self.events.pop() {
                root.get_mut().dispatch(&event);
            }

            sample::silence(&mut buffer);
            if let Err(err) = root.get_mut().render(&mut buffer, source_rate) {
                // A failed block is never written to the device.
                error!("Render failed: {}", err);
                std::thread::sleep(Duration::from_micros(block_micros));
                continue;
            }

            let bytes = if source_rate == device_rate {
                convert::from_samples(&buffer, &self.opened_format)
            } else {
                match self
                    .resampler
                    .resample_rate(&buffer, source_rate, device_rate)
                {
                    Ok(resampled) => convert::from_samples(&resampled, &self.opened_format),
                    Err(err) => {
                        error!("Rate conversion failed: {}", err);
                        continue;
                    }
                }
            };
            let bytes = match bytes {
                Ok(bytes) => bytes,
                Err(err) => {
                    error!("Sample conversion failed: {}", err);
                    continue;
                }
            };

            // Push the block out, yielding while the device buffer is full.
            let mut written = 0;
            while written < bytes.len() {
                if self.stop_signal.load(Ordering::Acquire) {
                    return;
                }
                match lock_backend(&self.backend).write(&bytes[written..]) {
                    Ok(0) => std::thread::sleep(Duration::from_millis(1)),
                    Ok(n) => written += n,
                    Err(err) => {
                        error!("Backend write failed: {}", err);
                        return;
                    }
                }
            }
        }
    }
}
