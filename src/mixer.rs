//! `AudioMixer`: a mixing node that sums an arbitrary set of inputs,
//! runs them through an ordered effect chain and applies its own
//! gain/pan stage. Mixers nest freely as long as the graph stays acyclic.
//!
//! Topology lives in `ArcSwap`ped lists: mutations clone-and-swap on the
//! control side, the render thread only ever loads a snapshot. Nothing
//! on the render path takes a lock.

use crate::config::MixerConfig;
use crate::control::{AudioControl, BoolControl, FloatControl};
use crate::dsp;
use crate::effects::EffectHandle;
use crate::node::{AudioNode, NodeEvent, NodeHandle, NodeId, RenderError};
use crate::resample::{AudioResampler, ResampleError};
use crate::sample;
use crate::{SampleRate, SamplesCount};
use arc_swap::ArcSwap;
use log::error;
use std::cell::UnsafeCell;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum MixerError {
    /// A mixer can never be its own input.
    SelfInput,
    /// Adding the input would close a loop in the graph.
    CycleDetected,
    InvalidSpeed(f32),
    InvalidResampler(ResampleError),
}

impl Display for MixerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MixerError::SelfInput => write!(f, "A mixer cannot be added to itself"),
            MixerError::CycleDetected => {
                write!(f, "Adding this input would create a cycle in the graph")
            }
            MixerError::InvalidSpeed(speed) => write!(f, "Invalid playback speed: {}", speed),
            MixerError::InvalidResampler(err) => write!(f, "Invalid resampler: {}", err),
        }
    }
}

impl std::error::Error for MixerError {}

// Edge insertions across *all* mixers serialize here, so a reachability
// check and the publish that follows are atomic with respect to other
// control threads. The render path never touches this lock.
static TOPOLOGY_LOCK: Mutex<()> = Mutex::new(());

#[derive(Clone)]
struct InputSlot {
    node: NodeHandle,
    /// 1.0 plays as-is; 2.0 consumes the input twice as fast.
    speed: f32,
}

/// Scratch buffers owned by the render thread.
struct RenderState {
    input: Vec<Vec<f32>>,
    mixed: Vec<Vec<f32>>,
    dry: Vec<Vec<f32>>,
}

impl RenderState {
    fn new() -> Self {
        RenderState {
            input: Vec::new(),
            mixed: Vec::new(),
            dry: Vec::new(),
        }
    }
}

fn resize(buffer: &mut Vec<Vec<f32>>, channels: usize, length: SamplesCount) {
    buffer.resize(channels, Vec::new());
    for channel in buffer.iter_mut() {
        channel.clear();
        channel.resize(length, 0.0);
    }
}

struct MixerInner {
    id: NodeId,
    inputs: ArcSwap<Vec<InputSlot>>,
    effects: ArcSwap<Vec<EffectHandle>>,
    pre_gain: Arc<FloatControl>,
    post_gain: Arc<FloatControl>,
    pan: Arc<FloatControl>,
    enable_effects: Arc<BoolControl>,
    swap_channels: Arc<BoolControl>,
    reverse_polarity: Arc<BoolControl>,
    check_length_mismatch: bool,
    resampler: AudioResampler,
    state: UnsafeCell<RenderState>,
}

// The render state is only touched by render(), which runs exclusively
// on the render thread; everything else in here is atomics and ArcSwap.
unsafe impl Send for MixerInner {}
unsafe impl Sync for MixerInner {}

/// Cloning shares the underlying mixer, so a clone kept on the control
/// side can keep mutating topology and controls after another clone has
/// been wrapped into a [`NodeHandle`] and added to a parent.
#[derive(Clone)]
pub struct AudioMixer {
    inner: Arc<MixerInner>,
}

impl AudioMixer {
    pub fn new(config: MixerConfig) -> Result<Self, MixerError> {
        let resampler =
            AudioResampler::with_config(&config.resampler).map_err(MixerError::InvalidResampler)?;
        Ok(AudioMixer {
            inner: Arc::new(MixerInner {
                id: NodeId::next(),
                inputs: ArcSwap::from_pointee(Vec::new()),
                effects: ArcSwap::from_pointee(Vec::new()),
                pre_gain: FloatControl::new("Pre-Gain", 0.0, 4.0, 1.0),
                post_gain: FloatControl::new("Post-Gain", 0.0, 4.0, 1.0),
                pan: FloatControl::new("Pan", -1.0, 1.0, 0.0),
                enable_effects: BoolControl::new("Enable Effects", config.enable_effects),
                swap_channels: BoolControl::new("Swap Channels", config.swap_channels),
                reverse_polarity: BoolControl::new("Reverse Polarity", config.reverse_polarity),
                check_length_mismatch: config.check_length_mismatch,
                resampler,
                state: UnsafeCell::new(RenderState::new()),
            }),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.inner.id
    }

    /// Wraps a clone of this mixer for use as another node's input.
    pub fn handle(&self) -> NodeHandle {
        NodeHandle::new(self.clone())
    }

    pub fn add_input(&self, input: NodeHandle) -> Result<(), MixerError> {
        self.add_input_with_speed(input, 1.0)
    }

    /// Adds an input played at the given speed. The cycle check walks the
    /// candidate's whole input graph before anything is published.
    pub fn add_input_with_speed(&self, input: NodeHandle, speed: f32) -> Result<(), MixerError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(MixerError::InvalidSpeed(speed));
        }
        if input.node_id() == self.inner.id {
            error!("Rejected mixer {} as its own input", self.inner.id);
            return Err(MixerError::SelfInput);
        }

        // Held until the edge is published; a poisoned lock only means
        // another control thread panicked mid-mutation.
        let _topology = TOPOLOGY_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if input.get().reaches(self.inner.id) {
            error!(
                "Rejected input {}: it already reaches mixer {}",
                input.node_id(),
                self.inner.id
            );
            return Err(MixerError::CycleDetected);
        }

        let slot = InputSlot { node: input, speed };
        self.inner.inputs.rcu(|inputs| {
            let mut next = (**inputs).clone();
            next.push(slot.clone());
            next
        });
        Ok(())
    }

    /// Removes the input with the given id. Returns false if it was not
    /// connected.
    pub fn remove_input(&self, id: NodeId) -> bool {
        let present = self.inner.inputs.load().iter().any(|s| s.node.node_id() == id);
        if present {
            self.inner.inputs.rcu(|inputs| {
                inputs
                    .iter()
                    .filter(|slot| slot.node.node_id() != id)
                    .cloned()
                    .collect::<Vec<_>>()
            });
        }
        present
    }

    /// Appends an effect to the end of the chain. Effects run in
    /// insertion order.
    pub fn add_effect(&self, effect: EffectHandle) {
        self.inner.effects.rcu(|effects| {
            let mut next = (**effects).clone();
            next.push(effect.clone());
            next
        });
    }

    pub fn remove_effect(&self, id: NodeId) -> bool {
        let present = self.inner.effects.load().iter().any(|e| e.node_id() == id);
        if present {
            self.inner.effects.rcu(|effects| {
                effects
                    .iter()
                    .filter(|effect| effect.node_id() != id)
                    .cloned()
                    .collect::<Vec<_>>()
            });
        }
        present
    }

    pub fn input_ids(&self) -> Vec<NodeId> {
        self.inner
            .inputs
            .load()
            .iter()
            .map(|slot| slot.node.node_id())
            .collect()
    }

    pub fn effect_ids(&self) -> Vec<NodeId> {
        self.inner
            .effects
            .load()
            .iter()
            .map(|effect| effect.node_id())
            .collect()
    }

    pub fn pre_gain(&self) -> Arc<FloatControl> {
        self.inner.pre_gain.clone()
    }

    pub fn post_gain(&self) -> Arc<FloatControl> {
        self.inner.post_gain.clone()
    }

    pub fn pan(&self) -> Arc<FloatControl> {
        self.inner.pan.clone()
    }

    pub fn enable_effects(&self) -> Arc<BoolControl> {
        self.inner.enable_effects.clone()
    }

    pub fn swap_channels(&self) -> Arc<BoolControl> {
        self.inner.swap_channels.clone()
    }

    pub fn reverse_polarity(&self) -> Arc<BoolControl> {
        self.inner.reverse_polarity.clone()
    }

    pub fn controls(&self) -> Vec<AudioControl> {
        vec![
            AudioControl::Float(self.inner.pre_gain.clone()),
            AudioControl::Float(self.inner.post_gain.clone()),
            AudioControl::Float(self.inner.pan.clone()),
            AudioControl::Bool(self.inner.enable_effects.clone()),
            AudioControl::Bool(self.inner.swap_channels.clone()),
            AudioControl::Bool(self.inner.reverse_polarity.clone()),
        ]
    }

    fn render_input(
        slot: &InputSlot,
        state: &mut RenderState,
        channels: usize,
        length: SamplesCount,
        sample_rate: SampleRate,
        check_length: bool,
        resampler: &AudioResampler,
    ) -> Result<(), RenderError> {
        // At speed s the input must produce s times the samples, which
        // are then squeezed back to the block length.
        let source_length = if slot.speed == 1.0 {
            length
        } else {
            (((length as f64) * slot.speed as f64).round() as SamplesCount).max(1)
        };

        resize(&mut state.input, channels, source_length);
        slot.node.get_mut().render(&mut state.input, sample_rate)?;

        if check_length {
            for channel in state.input.iter() {
                if channel.len() != source_length {
                    return Err(RenderError::LengthMismatch {
                        expected: source_length,
                        actual: channel.len(),
                    });
                }
            }
        }

        if source_length == length {
            dsp::add_into(&mut state.mixed, &state.input);
        } else {
            let resampled = resampler
                .resample(&state.input, length)
                .map_err(RenderError::Resample)?;
            dsp::add_into(&mut state.mixed, &resampled);
        }
        Ok(())
    }
}

impl AudioNode for AudioMixer {
    fn node_id(&self) -> NodeId {
        self.inner.id
    }

    fn reaches(&self, target: NodeId) -> bool {
        if self.inner.id == target {
            return true;
        }
        self.inner
            .inputs
            .load()
            .iter()
            .any(|slot| slot.node.get().reaches(target))
    }

    fn dispatch(&mut self, event: &NodeEvent) {
        for slot in self.inner.inputs.load().iter() {
            slot.node.get_mut().dispatch(event);
        }
        for effect in self.inner.effects.load().iter() {
            effect.get_mut().dispatch(event);
        }
    }

    fn render(
        &mut self,
        samples: &mut [Vec<f32>],
        sample_rate: SampleRate,
    ) -> Result<(), RenderError> {
        if sample_rate == 0 {
            return Err(RenderError::InvalidSampleRate(0));
        }
        let length = sample::check_shape(samples)?;
        let channels = samples.len();

        // Exclusive by the render-thread contract on MixerInner.
        let state = unsafe { &mut *self.inner.state.get() };
        resize(&mut state.mixed, channels, length);

        let inputs = self.inner.inputs.load();
        for slot in inputs.iter() {
            AudioMixer::render_input(
                slot,
                state,
                channels,
                length,
                sample_rate,
                self.inner.check_length_mismatch,
                &self.inner.resampler,
            )?;
        }

        dsp::apply_gain_pan(&mut state.mixed, self.inner.pre_gain.get(), 0.0);

        if self.inner.enable_effects.get() {
            let effects = self.inner.effects.load();
            for effect in effects.iter() {
                let controls = effect.controls();
                if !controls.enable.get() {
                    continue;
                }
                let mix = controls.mix_level.get();
                if mix <= 0.0 {
                    continue;
                }
                if mix >= 1.0 {
                    effect.get_mut().render(&mut state.mixed, sample_rate)?;
                } else {
                    // Dry/wet blend: keep a copy, process, interpolate.
                    let RenderState { mixed, dry, .. } = state;
                    resize(dry, channels, length);
                    for (dry_ch, mixed_ch) in dry.iter_mut().zip(mixed.iter()) {
                        dry_ch.copy_from_slice(mixed_ch);
                    }
                    effect.get_mut().render(mixed, sample_rate)?;
                    for (mixed_ch, dry_ch) in mixed.iter_mut().zip(dry.iter()) {
                        for (wet, dry_sample) in mixed_ch.iter_mut().zip(dry_ch.iter()) {
                            *wet = dry_sample + (*wet - dry_sample) * mix;
                        }
                    }
                }
            }
        }

        if self.inner.swap_channels.get() {
            dsp::swap_channels(&mut state.mixed);
        }
        if self.inner.reverse_polarity.get() {
            dsp::reverse_polarity(&mut state.mixed);
        }
        dsp::apply_gain_pan(
            &mut state.mixed,
            self.inner.post_gain.get(),
            self.inner.pan.get(),
        );

        for (dst, src) in samples.iter_mut().zip(state.mixed.iter()) {
            dst.copy_from_slice(src);
        }
        Ok(())
    }
}
