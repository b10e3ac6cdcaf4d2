use super::{AudioEffect, EffectControls};
use crate::control::FloatControl;
use crate::node::{NodeId, RenderError};
use crate::SampleRate;
use std::sync::Arc;

/// Soft saturation: `tanh(x * drive)` normalized so a full-scale input
/// still maps to full scale.
pub struct SaturatorEffect {
    id: NodeId,
    controls: EffectControls,
    drive: Arc<FloatControl>,
}

impl SaturatorEffect {
    pub fn new(drive: f32) -> Self {
        SaturatorEffect {
            id: NodeId::next(),
            controls: EffectControls::new(),
            drive: FloatControl::new("Drive", 0.1, 10.0, drive),
        }
    }

    pub fn drive_control(&self) -> Arc<FloatControl> {
        self.drive.clone()
    }
}

impl AudioEffect for SaturatorEffect {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn controls(&self) -> &EffectControls {
        &self.controls
    }

    fn render(
        &mut self,
        samples: &mut [Vec<f32>],
        _sample_rate: SampleRate,
    ) -> Result<(), RenderError> {
        let drive = self.drive.get();
        let norm = drive.tanh();
        for channel in samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = (*sample * drive).tanh() / norm;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_maps_to_full_scale() {
        let mut effect = SaturatorEffect::new(3.0);
        let mut samples = vec![vec![1.0f32, -1.0]];
        effect.render(&mut samples, 44100).unwrap();
        assert!((samples[0][0] - 1.0).abs() < 1e-6);
        assert!((samples[0][1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn compresses_peaks_more_than_quiet_parts() {
        let mut effect = SaturatorEffect::new(5.0);
        let mut samples = vec![vec![0.1f32, 0.9]];
        effect.render(&mut samples, 44100).unwrap();
        let quiet_gain = samples[0][0] / 0.1;
        let loud_gain = samples[0][1] / 0.9;
        assert!(quiet_gain > loud_gain);
    }

    #[test]
    fn never_exceeds_unity() {
        let mut effect = SaturatorEffect::new(10.0);
        let mut samples = vec![(0..100).map(|i| i as f32 / 50.0 - 1.0).collect::<Vec<f32>>()];
        effect.render(&mut samples, 44100).unwrap();
        for &sample in &samples[0] {
            assert!(sample.abs() <= 1.0 + 1e-6);
        }
    }
}
