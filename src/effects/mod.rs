//! Effects processed in order by the mixer after its inputs are summed.

mod low_pass;
mod saturator;

pub use low_pass::LowPassEffect;
pub use saturator::SaturatorEffect;

use crate::control::{BoolControl, FloatControl};
use crate::node::{NodeEvent, NodeId, RenderError};
use crate::SampleRate;
use std::cell::UnsafeCell;
use std::sync::Arc;

/// Controls every effect carries: a bypass toggle and a dry/wet mix.
///
/// Clone shares the underlying atomics, so a clone kept on the control
/// side stays live after the effect moves into a mixer.
#[derive(Clone)]
pub struct EffectControls {
    pub enable: Arc<BoolControl>,
    pub mix_level: Arc<FloatControl>,
}

impl EffectControls {
    pub fn new() -> Self {
        EffectControls {
            enable: BoolControl::new("Enable", true),
            mix_level: FloatControl::new("Mix Level", 0.0, 1.0, 1.0),
        }
    }
}

impl Default for EffectControls {
    fn default() -> Self {
        EffectControls::new()
    }
}

/// An in-place audio transform. `render` mutates the block without
/// changing its shape; it only runs on the render thread.
pub trait AudioEffect: Send {
    fn node_id(&self) -> NodeId;

    fn controls(&self) -> &EffectControls;

    fn render(
        &mut self,
        samples: &mut [Vec<f32>],
        sample_rate: SampleRate,
    ) -> Result<(), RenderError>;

    fn dispatch(&mut self, _event: &NodeEvent) {}
}

struct EffectCell {
    effect: UnsafeCell<Box<dyn AudioEffect>>,
}

// &mut access only happens on the render thread, same contract as NodeCell.
unsafe impl Send for EffectCell {}
unsafe impl Sync for EffectCell {}

/// Shared reference to an effect in a mixer chain. The chain controls are
/// duplicated here so the render loop can read enable/mix without going
/// through the cell.
#[derive(Clone)]
pub struct EffectHandle {
    cell: Arc<EffectCell>,
    id: NodeId,
    controls: EffectControls,
}

impl EffectHandle {
    pub fn new<T: AudioEffect + 'static>(effect: T) -> Self {
        let id = effect.node_id();
        let controls = effect.controls().clone();
        EffectHandle {
            cell: Arc::new(EffectCell {
                effect: UnsafeCell::new(Box::new(effect)),
            }),
            id,
            controls,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn controls(&self) -> &EffectControls {
        &self.controls
    }

    #[allow(clippy::mut_from_ref)]
    pub(crate) fn get_mut(&self) -> &mut dyn AudioEffect {
        unsafe { &mut **self.cell.effect.get() }
    }
}
