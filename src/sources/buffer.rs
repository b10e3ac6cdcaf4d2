use crate::config::ResamplerConfig;
use crate::control::FloatControl;
use crate::node::{AudioNode, NodeEvent, NodeEventKind, NodeId, RenderError};
use crate::resample::{AudioResampler, ResampleError};
use crate::{SampleRate, SamplesCount};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum BufferSourceEvent {
    SetLooping(bool),
    Seek(SamplesCount),
}

/// Plays a preloaded planar clip recorded at its own rate, resampling on
/// the fly when the graph runs at a different one.
pub struct BufferSource {
    id: NodeId,
    clip: Vec<Vec<f32>>,
    native_rate: SampleRate,
    position: SamplesCount,
    looping: bool,
    gain: Arc<FloatControl>,
    resampler: AudioResampler,
    scratch: Vec<Vec<f32>>,
}

// Manual impl: the resampler holds a trait object and the clip itself is
// not worth printing.
impl std::fmt::Debug for BufferSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSource")
            .field("id", &self.id)
            .field("channels", &self.clip.len())
            .field("length", &self.clip[0].len())
            .field("native_rate", &self.native_rate)
            .field("position", &self.position)
            .field("looping", &self.looping)
            .finish_non_exhaustive()
    }
}

impl BufferSource {
    /// `clip` is one Vec per channel, all the same non-zero length.
    pub fn new(
        clip: Vec<Vec<f32>>,
        native_rate: SampleRate,
        config: &ResamplerConfig,
    ) -> Result<Self, ResampleError> {
        if clip.is_empty() || clip[0].is_empty() {
            return Err(ResampleError::EmptyBuffer);
        }
        let length = clip[0].len();
        for channel in clip.iter() {
            if channel.len() != length {
                return Err(ResampleError::ChannelLengthMismatch {
                    expected: length,
                    actual: channel.len(),
                });
            }
        }
        if native_rate == 0 {
            return Err(ResampleError::InvalidLength(0));
        }
        Ok(BufferSource {
            id: NodeId::next(),
            clip,
            native_rate,
            position: 0,
            looping: false,
            gain: FloatControl::new("Gain", 0.0, 2.0, 1.0),
            resampler: AudioResampler::with_config(config)?,
            scratch: Vec::new(),
        })
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn gain_control(&self) -> Arc<FloatControl> {
        self.gain.clone()
    }

    /// True once a non-looping clip has been played to the end.
    pub fn is_finished(&self) -> bool {
        !self.looping && self.position >= self.clip[0].len()
    }

    fn clip_sample(&self, channel: usize, index: SamplesCount) -> f32 {
        let source = &self.clip[channel.min(self.clip.len() - 1)];
        if self.looping {
            source[index % source.len()]
        } else if index < source.len() {
            source[index]
        } else {
            0.0
        }
    }

    fn fill_scratch(&mut self, channels: usize, length: SamplesCount) {
        self.scratch.resize(channels, Vec::new());
        for channel in self.scratch.iter_mut() {
            channel.resize(length, 0.0);
        }
        for ch in 0..channels {
            for i in 0..length {
                let value = self.clip_sample(ch, self.position + i);
                self.scratch[ch][i] = value;
            }
        }
    }
}

impl AudioNode for BufferSource {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn render(
        &mut self,
        samples: &mut [Vec<f32>],
        sample_rate: SampleRate,
    ) -> Result<(), RenderError> {
        if sample_rate == 0 {
            return Err(RenderError::InvalidSampleRate(0));
        }
        if samples.is_empty() || samples[0].is_empty() {
            return Err(RenderError::EmptyBuffer);
        }

        let channels = samples.len();
        let out_length = samples[0].len();
        // How many native-rate samples this block consumes.
        let native_length = if sample_rate == self.native_rate {
            out_length
        } else {
            ((out_length as u64 * self.native_rate as u64) / sample_rate as u64).max(1)
                as SamplesCount
        };

        self.fill_scratch(channels, native_length);
        let gain = self.gain.get();

        if native_length == out_length {
            for (dst, src) in samples.iter_mut().zip(self.scratch.iter()) {
                for (d, s) in dst.iter_mut().zip(src.iter()) {
                    *d = *s * gain;
                }
            }
        } else {
            let resampled = self.resampler.resample(&self.scratch, out_length)?;
            for (dst, src) in samples.iter_mut().zip(resampled.iter()) {
                for (d, s) in dst.iter_mut().zip(src.iter()) {
                    *d = *s * gain;
                }
            }
        }

        if self.looping {
            self.position = (self.position + native_length) % self.clip[0].len();
        } else {
            self.position = (self.position + native_length).min(self.clip[0].len());
        }
        Ok(())
    }

    fn dispatch(&mut self, event: &NodeEvent) {
        if event.target != self.id {
            return;
        }
        if let NodeEventKind::Buffer(kind) = &event.kind {
            match kind {
                BufferSourceEvent::SetLooping(looping) => self.looping = *looping,
                BufferSourceEvent::Seek(position) => {
                    self.position = (*position).min(self.clip[0].len());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_clip(length: usize) -> Vec<Vec<f32>> {
        vec![(0..length).map(|i| i as f32 / length as f32).collect()]
    }

    fn source(clip: Vec<Vec<f32>>, rate: SampleRate) -> BufferSource {
        BufferSource::new(clip, rate, &ResamplerConfig::default()).unwrap()
    }

    #[test]
    fn plays_clip_then_silence() {
        let mut src = source(ramp_clip(100), 44100);
        let mut samples = vec![vec![1.0f32; 150]];
        src.render(&mut samples, 44100).unwrap();
        assert_eq!(samples[0][0], 0.0);
        assert!((samples[0][50] - 0.5).abs() < 1e-6);
        assert!(samples[0][100..].iter().all(|&s| s == 0.0));
        assert!(src.is_finished());
    }

    #[test]
    fn looping_wraps_around() {
        let mut src = source(ramp_clip(64), 44100);
        src.set_looping(true);
        let mut samples = vec![vec![0.0f32; 128]];
        src.render(&mut samples, 44100).unwrap();
        assert_eq!(samples[0][0], samples[0][64]);
        assert!(!src.is_finished());
    }

    #[test]
    fn mono_clip_feeds_all_channels() {
        let mut src = source(ramp_clip(64), 44100);
        let mut samples = vec![vec![0.0f32; 64]; 2];
        src.render(&mut samples, 44100).unwrap();
        assert_eq!(samples[0], samples[1]);
    }

    #[test]
    fn rate_mismatch_resamples() {
        // A 22050 Hz clip rendered at 44100 Hz is consumed at half speed.
        let mut src = source(ramp_clip(1000), 22050);
        let mut samples = vec![vec![0.0f32; 200]];
        src.render(&mut samples, 44100).unwrap();
        assert_eq!(src.position, 100);
        assert!(samples[0].iter().all(|s| s.is_finite()));
    }

    #[test]
    fn seek_event_moves_position() {
        let mut src = source(ramp_clip(100), 44100);
        let event = NodeEvent {
            target: src.node_id(),
            kind: NodeEventKind::Buffer(BufferSourceEvent::Seek(50)),
        };
        src.dispatch(&event);
        let mut samples = vec![vec![0.0f32; 10]];
        src.render(&mut samples, 44100).unwrap();
        assert!((samples[0][0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn debug_summarizes_the_clip() {
        let src = source(ramp_clip(64), 44100);
        let text = format!("{:?}", src);
        assert!(text.contains("native_rate: 44100"), "{}", text);
        assert!(text.contains("length: 64"), "{}", text);
    }

    #[test]
    fn rejects_malformed_clip() {
        assert_eq!(
            BufferSource::new(vec![], 44100, &ResamplerConfig::default()).unwrap_err(),
            ResampleError::EmptyBuffer
        );
        assert_eq!(
            BufferSource::new(
                vec![vec![0.0; 4], vec![0.0; 3]],
                44100,
                &ResamplerConfig::default()
            )
            .unwrap_err(),
            ResampleError::ChannelLengthMismatch {
                expected: 4,
                actual: 3
            }
        );
    }
}
