use super::{AudioEffect, EffectControls};
use crate::control::FloatControl;
use crate::node::{NodeId, RenderError};
use crate::SampleRate;
use std::sync::Arc;

/// One-pole low-pass filter with an atomically adjustable cutoff.
pub struct LowPassEffect {
    id: NodeId,
    controls: EffectControls,
    cutoff: Arc<FloatControl>,
    // y[n-1] per channel
    state: Vec<f32>,
}

impl LowPassEffect {
    pub fn new(cutoff_hz: f32) -> Self {
        LowPassEffect {
            id: NodeId::next(),
            controls: EffectControls::new(),
            cutoff: FloatControl::new("Cutoff", 10.0, 22000.0, cutoff_hz),
            state: Vec::new(),
        }
    }

    /// Keep a clone of this before handing the effect to a mixer.
    pub fn cutoff_control(&self) -> Arc<FloatControl> {
        self.cutoff.clone()
    }
}

impl AudioEffect for LowPassEffect {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn controls(&self) -> &EffectControls {
        &self.controls
    }

    fn render(
        &mut self,
        samples: &mut [Vec<f32>],
        sample_rate: SampleRate,
    ) -> Result<(), RenderError> {
        if sample_rate == 0 {
            return Err(RenderError::InvalidSampleRate(0));
        }
        self.state.resize(samples.len(), 0.0);

        let dt = 1.0 / sample_rate as f32;
        let rc = 1.0 / (2.0 * std::f32::consts::PI * self.cutoff.get());
        let alpha = dt / (rc + dt);

        for (channel, previous) in samples.iter_mut().zip(self.state.iter_mut()) {
            let mut y = *previous;
            for sample in channel.iter_mut() {
                y += alpha * (*sample - y);
                *sample = y;
            }
            *previous = y;
        }
        Ok(())
    }
}
