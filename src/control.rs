//! Lock-free parameter controls shared between the control side and the
//! render thread. Values are plain atomics; no listeners, no locks.

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// A named float parameter clamped to a fixed range.
///
/// The value is stored as f32 bits in an `AtomicU32`, so reads on the
/// render thread never block.
pub struct FloatControl {
    name: &'static str,
    min: f32,
    max: f32,
    bits: AtomicU32,
}

impl FloatControl {
    pub fn new(name: &'static str, min: f32, max: f32, value: f32) -> Arc<Self> {
        let clamped = value.clamp(min, max);
        Arc::new(FloatControl {
            name,
            min,
            max,
            bits: AtomicU32::new(clamped.to_bits()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Out-of-range and NaN values are clamped into `[min, max]`.
    pub fn set(&self, value: f32) {
        let clamped = if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        };
        self.bits.store(clamped.to_bits(), Ordering::Relaxed);
    }

    /// Current value mapped into `[0, 1]`.
    pub fn normalized(&self) -> f32 {
        if self.max == self.min {
            return 0.0;
        }
        (self.get() - self.min) / (self.max - self.min)
    }
}

impl Display for FloatControl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (range {}..{})",
            self.name,
            self.get(),
            self.min,
            self.max
        )
    }
}

/// A named boolean toggle backed by an `AtomicBool`.
pub struct BoolControl {
    name: &'static str,
    value: AtomicBool,
}

impl BoolControl {
    pub fn new(name: &'static str, value: bool) -> Arc<Self> {
        Arc::new(BoolControl {
            name,
            value: AtomicBool::new(value),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> bool {
        self.value.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Relaxed);
    }
}

impl Display for BoolControl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.get())
    }
}

/// Tagged control reference, so a node can list its parameters without
/// any downcasting on the caller side.
#[derive(Clone)]
pub enum AudioControl {
    Float(Arc<FloatControl>),
    Bool(Arc<BoolControl>),
}

impl AudioControl {
    pub fn name(&self) -> &'static str {
        match self {
            AudioControl::Float(control) => control.name(),
            AudioControl::Bool(control) => control.name(),
        }
    }
}
