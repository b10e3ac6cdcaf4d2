//! Graph node plumbing: the `AudioNode` trait, shared node handles and
//! the control-to-render event type.

use crate::resample::ResampleError;
use crate::sources::buffer::BufferSourceEvent;
use crate::sources::waveform::WaveformEvent;
use crate::{SampleRate, SamplesCount};
use std::cell::UnsafeCell;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-unique node identity, used for cycle checks and event routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        NodeId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    InvalidSampleRate(SampleRate),
    EmptyBuffer,
    LengthMismatch {
        expected: SamplesCount,
        actual: SamplesCount,
    },
    Resample(ResampleError),
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::InvalidSampleRate(rate) => {
                write!(f, "Invalid sample rate: {}", rate)
            }
            RenderError::EmptyBuffer => write!(f, "Empty sample buffer"),
            RenderError::LengthMismatch { expected, actual } => {
                write!(
                    f,
                    "Channel length mismatch: expected {}, got {}",
                    expected, actual
                )
            }
            RenderError::Resample(err) => write!(f, "Resampling failed: {}", err),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<ResampleError> for RenderError {
    fn from(err: ResampleError) -> Self {
        RenderError::Resample(err)
    }
}

/// Parameter change routed from the control side to a node, delivered on
/// the render thread between blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvent {
    pub target: NodeId,
    pub kind: NodeEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEventKind {
    Waveform(WaveformEvent),
    Buffer(BufferSourceEvent),
}

/// A node in the audio graph.
///
/// `render` overwrites `samples` (planar, one `Vec<f32>` per channel)
/// with a full block at `sample_rate`. It is only ever called from the
/// render thread, which is why it takes `&mut self`.
pub trait AudioNode: Send {
    fn node_id(&self) -> NodeId;

    fn render(
        &mut self,
        samples: &mut [Vec<f32>],
        sample_rate: SampleRate,
    ) -> Result<(), RenderError>;

    /// Events are broadcast down the graph; nodes ignore events that are
    /// not addressed to them.
    fn dispatch(&mut self, _event: &NodeEvent) {}

    /// True if `target` is this node or reachable through its inputs.
    /// Containers walk their children; leaves use the identity default.
    fn reaches(&self, target: NodeId) -> bool {
        self.node_id() == target
    }
}

/// Interior-mutable node storage.
///
/// `&mut` access is only taken by the render thread (and by graph
/// mutation paths that never overlap with an active render of the same
/// node), which is the invariant behind the Send/Sync assertions.
pub(crate) struct NodeCell {
    node: UnsafeCell<Box<dyn AudioNode>>,
}

unsafe impl Send for NodeCell {}
unsafe impl Sync for NodeCell {}

impl NodeCell {
    fn new<T: AudioNode + 'static>(node: T) -> Self {
        NodeCell {
            node: UnsafeCell::new(Box::new(node)),
        }
    }

    #[allow(clippy::mut_from_ref)]
    pub(crate) fn get_mut(&self) -> &mut dyn AudioNode {
        unsafe { &mut **self.node.get() }
    }

    pub(crate) fn get(&self) -> &dyn AudioNode {
        unsafe { &**self.node.get() }
    }
}

/// Cheaply cloneable reference to a node in the graph.
///
/// The node id is cached here so identity checks never touch the cell.
#[derive(Clone)]
pub struct NodeHandle {
    cell: Arc<NodeCell>,
    id: NodeId,
}

impl NodeHandle {
    pub fn new<T: AudioNode + 'static>(node: T) -> Self {
        let id = node.node_id();
        NodeHandle {
            cell: Arc::new(NodeCell::new(node)),
            id,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn get(&self) -> &dyn AudioNode {
        self.cell.get()
    }

    #[allow(clippy::mut_from_ref)]
    pub(crate) fn get_mut(&self) -> &mut dyn AudioNode {
        self.cell.get_mut()
    }
}
