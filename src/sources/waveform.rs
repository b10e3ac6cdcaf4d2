use crate::control::FloatControl;
use crate::node::{AudioNode, NodeEvent, NodeEventKind, NodeId, RenderError};
use crate::SampleRate;
use std::sync::Arc;
use tinyrand::{Rand, Wyrand};

/// Allows generating audio samples on the fly,
/// for example, a sine wave generator.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    Silence,
    WhiteNoise,
    Sine(f32),
    Square(f32),
    Triangle(f32),
    Sawtooth(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaveformEvent {
    SetWaveform(Waveform),
}

pub struct WaveformSource {
    id: NodeId,
    waveform: Waveform,
    amplitude: Arc<FloatControl>,
    // Absolute sample position, so phase is continuous across blocks.
    position: u64,
    rng: Wyrand,
}

fn sine(frequency: f32, time: f32) -> f32 {
    (2.0 * std::f32::consts::PI * frequency * time).sin()
}

fn square(frequency: f32, time: f32) -> f32 {
    if (frequency * time) % 1.0 < 0.5 {
        1.0
    } else {
        -1.0
    }
}

fn triangle(frequency: f32, time: f32) -> f32 {
    let phase = frequency * time - (frequency * time).floor();
    4.0 * (phase - 0.5).abs() - 1.0
}

fn sawtooth(frequency: f32, time: f32) -> f32 {
    (frequency * time) % 1.0 * 2.0 - 1.0
}

impl WaveformSource {
    pub fn new(waveform: Waveform) -> Self {
        WaveformSource {
            id: NodeId::next(),
            waveform,
            amplitude: FloatControl::new("Amplitude", 0.0, 1.0, 1.0),
            position: 0,
            rng: Wyrand::default(),
        }
    }

    /// Keep a clone of this before handing the source to a mixer.
    pub fn amplitude_control(&self) -> Arc<FloatControl> {
        self.amplitude.clone()
    }
}

impl AudioNode for WaveformSource {
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
        if samples.is_empty() {
            return Err(RenderError::EmptyBuffer);
        }

        let amplitude = self.amplitude.get();
        let length = samples[0].len();
        match self.waveform {
            Waveform::Silence => {
                for channel in samples.iter_mut() {
                    channel.fill(0.0);
                }
            }
            Waveform::WhiteNoise => {
                for channel in samples.iter_mut() {
                    for sample in channel.iter_mut() {
                        let noise = self.rng.next_u32() as f32 / u32::MAX as f32 * 2.0 - 1.0;
                        *sample = noise * amplitude;
                    }
                }
            }
            Waveform::Sine(freq)
            | Waveform::Square(freq)
            | Waveform::Triangle(freq)
            | Waveform::Sawtooth(freq) => {
                let generator = match self.waveform {
                    Waveform::Sine(_) => sine,
                    Waveform::Square(_) => square,
                    Waveform::Triangle(_) => triangle,
                    _ => sawtooth,
                };
                for i in 0..length {
                    let time = (self.position + i as u64) as f32 / sample_rate as f32;
                    let value = generator(freq, time) * amplitude;
                    for channel in samples.iter_mut() {
                        channel[i] = value;
                    }
                }
            }
        }

        self.position += length as u64;
        Ok(())
    }

    fn dispatch(&mut self, event: &NodeEvent) {
        if event.target != self.id {
            return;
        }
        if let NodeEventKind::Waveform(WaveformEvent::SetWaveform(waveform)) = &event.kind {
            self.waveform = waveform.clone();
        }
    }
}
