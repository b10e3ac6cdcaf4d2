//! Sample-rate conversion: interchangeable single-channel kernels behind
//! the `ResampleMethod` trait and the planar `AudioResampler` driver.

mod cubic;
mod lanczos;
mod linear;
mod nearest;
mod phase_vocoder;

pub use cubic::CubicResampler;
pub use lanczos::LanczosResampler;
pub use linear::LinearResampler;
pub use nearest::NearestResampler;
pub use phase_vocoder::PhaseVocoderResampler;

use crate::{SamplesCount, SampleRate};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Lowest accepted quality setting. Kernels are free to ignore the knob,
/// but the driver rejects anything below this.
pub const MIN_QUALITY: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum ResampleError {
    InvalidQuality(usize),
    InvalidSpeed(f32),
    InvalidLength(SamplesCount),
    EmptyBuffer,
    ChannelLengthMismatch {
        expected: SamplesCount,
        actual: SamplesCount,
    },
}

impl Display for ResampleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleError::InvalidQuality(quality) => {
                write!(f, "Invalid quality: {} (minimum {})", quality, MIN_QUALITY)
            }
            ResampleError::InvalidSpeed(speed) => write!(f, "Invalid speed: {}", speed),
            ResampleError::InvalidLength(length) => {
                write!(f, "Invalid target length: {}", length)
            }
            ResampleError::EmptyBuffer => write!(f, "Empty sample buffer"),
            ResampleError::ChannelLengthMismatch { expected, actual } => {
                write!(
                    f,
                    "Channel length mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for ResampleError {}

/// A single-channel resampling kernel.
///
/// `input` is never empty and `output` is pre-sized to the target length;
/// the kernel fills it completely. `quality` trades cost for fidelity,
/// with kernel-specific meaning (taps for Lanczos, FFT order for the
/// phase vocoder).
pub trait ResampleMethod: Send + Sync {
    fn resample(&self, input: &[f32], output: &mut [f32], quality: usize);
}

/// Which kernel an [`AudioResampler`] should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleMethodKind {
    Nearest,
    Linear,
    Cubic,
    Lanczos,
    PhaseVocoder,
}

impl ResampleMethodKind {
    pub fn build(self) -> Arc<dyn ResampleMethod> {
        match self {
            ResampleMethodKind::Nearest => Arc::new(NearestResampler),
            ResampleMethodKind::Linear => Arc::new(LinearResampler),
            ResampleMethodKind::Cubic => Arc::new(CubicResampler),
            ResampleMethodKind::Lanczos => Arc::new(LanczosResampler),
            ResampleMethodKind::PhaseVocoder => Arc::new(PhaseVocoderResampler),
        }
    }
}

/// Planar-buffer resampling driver. Validates shapes, applies the
/// identity fast path and runs the kernel once per channel.
#[derive(Clone)]
pub struct AudioResampler {
    method: Arc<dyn ResampleMethod>,
    quality: usize,
}

// Manual impl: the kernel is a trait object.
impl Debug for AudioResampler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioResampler")
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}

impl AudioResampler {
    pub fn new(method: Arc<dyn ResampleMethod>, quality: usize) -> Result<Self, ResampleError> {
        if quality < MIN_QUALITY {
            return Err(ResampleError::InvalidQuality(quality));
        }
        Ok(AudioResampler { method, quality })
    }

    pub fn with_config(config: &crate::config::ResamplerConfig) -> Result<Self, ResampleError> {
        AudioResampler::new(config.method.build(), config.quality)
    }

    pub fn quality(&self) -> usize {
        self.quality
    }

    pub fn set_quality(&mut self, quality: usize) -> Result<(), ResampleError> {
        if quality < MIN_QUALITY {
            return Err(ResampleError::InvalidQuality(quality));
        }
        self.quality = quality;
        Ok(())
    }

    pub fn set_method(&mut self, method: Arc<dyn ResampleMethod>) {
        self.method = method;
    }

    /// Resamples every channel to exactly `new_length` samples.
    ///
    /// Equal input and output lengths short-circuit to a copy without
    /// touching the kernel.
    pub fn resample(
        &self,
        samples: &[Vec<f32>],
        new_length: SamplesCount,
    ) -> Result<Vec<Vec<f32>>, ResampleError> {
        let length = self.validate(samples)?;
        if new_length == 0 {
            return Err(ResampleError::InvalidLength(0));
        }
        if new_length == length {
            return Ok(samples.to_vec());
        }

        let mut resampled = Vec::with_capacity(samples.len());
        for channel in samples.iter() {
            let mut out = vec![0.0f32; new_length];
            self.method.resample(channel, &mut out, self.quality);
            resampled.push(out);
        }
        Ok(resampled)
    }

    /// Resamples by a playback-speed factor: speed 2.0 halves the length
    /// (`new_length = floor(length / speed)`). The target length is
    /// clamped to at least one sample, so an extreme speed shortens the
    /// output to a single sample instead of failing with `InvalidLength`.
    pub fn resample_speed(
        &self,
        samples: &[Vec<f32>],
        speed: f32,
    ) -> Result<Vec<Vec<f32>>, ResampleError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ResampleError::InvalidSpeed(speed));
        }
        let length = self.validate(samples)?;
        let new_length = ((length as f64 / speed as f64).floor() as SamplesCount).max(1);
        self.resample(samples, new_length)
    }

    /// Convenience for rate conversion: scales the length by
    /// `to_rate / from_rate`.
    pub fn resample_rate(
        &self,
        samples: &[Vec<f32>],
        from_rate: SampleRate,
        to_rate: SampleRate,
    ) -> Result<Vec<Vec<f32>>, ResampleError> {
        if from_rate == 0 || to_rate == 0 {
            return Err(ResampleError::InvalidLength(0));
        }
        if from_rate == to_rate {
            return Ok(samples.to_vec());
        }
        let length = self.validate(samples)?;
        let new_length = ((length as u64 * to_rate as u64) / from_rate as u64).max(1);
        self.resample(samples, new_length as SamplesCount)
    }

    fn validate(&self, samples: &[Vec<f32>]) -> Result<SamplesCount, ResampleError> {
        if samples.is_empty() {
            return Err(ResampleError::EmptyBuffer);
        }
        let expected = samples[0].len();
        for channel in samples.iter() {
            if channel.len() != expected {
                return Err(ResampleError::ChannelLengthMismatch {
                    expected,
                    actual: channel.len(),
                });
            }
        }
        if expected == 0 {
            return Err(ResampleError::EmptyBuffer);
        }
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResamplerConfig;
    use std::f32::consts::PI;

    fn sine(len: usize, period: f32) -> Vec<f32> {
        (0..len).map(|i| (2.0 * PI * i as f32 / period).sin()).collect()
    }

    fn driver(kind: ResampleMethodKind, quality: usize) -> AudioResampler {
        AudioResampler::new(kind.build(), quality).unwrap()
    }

    #[test]
    fn rejects_quality_below_minimum() {
        let err = AudioResampler::new(ResampleMethodKind::Linear.build(), 0).unwrap_err();
        assert_eq!(err, ResampleError::InvalidQuality(0));
    }

    #[test]
    fn output_length_is_exact() {
        let input = vec![sine(1000, 20.0)];
        for kind in [
            ResampleMethodKind::Nearest,
            ResampleMethodKind::Linear,
            ResampleMethodKind::Cubic,
            ResampleMethodKind::Lanczos,
            ResampleMethodKind::PhaseVocoder,
        ] {
            let resampler = driver(kind, 6);
            for &target in &[1usize, 2, 333, 999, 1000, 1001, 2000] {
                let out = resampler.resample(&input, target).unwrap();
                assert_eq!(out[0].len(), target, "{:?} -> {}", kind, target);
                assert!(out[0].iter().all(|s| s.is_finite()));
            }
        }
    }

    #[test]
    fn identity_is_a_copy() {
        let input = vec![sine(128, 16.0), sine(128, 8.0)];
        let resampler = driver(ResampleMethodKind::Lanczos, 3);
        let out = resampler.resample(&input, 128).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn speed_two_halves_length() {
        let input = vec![vec![0.0f32; 1000]];
        let resampler = driver(ResampleMethodKind::Linear, 2);
        let out = resampler.resample_speed(&input, 2.0).unwrap();
        assert_eq!(out[0].len(), 500);
    }

    #[test]
    fn speed_zero_is_rejected() {
        let input = vec![vec![0.0f32; 100]];
        let resampler = driver(ResampleMethodKind::Linear, 2);
        assert_eq!(
            resampler.resample_speed(&input, 0.0).unwrap_err(),
            ResampleError::InvalidSpeed(0.0)
        );
        assert!(matches!(
            resampler.resample_speed(&input, f32::NAN).unwrap_err(),
            ResampleError::InvalidSpeed(_)
        ));
        assert_eq!(
            resampler.resample_speed(&input, -1.0).unwrap_err(),
            ResampleError::InvalidSpeed(-1.0)
        );
    }

    #[test]
    fn extreme_speed_keeps_one_sample() {
        let input = vec![vec![0.25f32; 10]];
        let resampler = driver(ResampleMethodKind::Nearest, 1);
        let out = resampler.resample_speed(&input, 1000.0).unwrap();
        assert_eq!(out[0].len(), 1);
    }

    #[test]
    fn zero_target_length_is_rejected() {
        let input = vec![vec![0.0f32; 100]];
        let resampler = driver(ResampleMethodKind::Linear, 2);
        assert_eq!(
            resampler.resample(&input, 0).unwrap_err(),
            ResampleError::InvalidLength(0)
        );
    }

    #[test]
    fn shape_errors() {
        let resampler = driver(ResampleMethodKind::Linear, 2);
        assert_eq!(
            resampler.resample(&[], 10).unwrap_err(),
            ResampleError::EmptyBuffer
        );
        assert_eq!(
            resampler.resample(&[vec![], vec![]], 10).unwrap_err(),
            ResampleError::EmptyBuffer
        );
        assert_eq!(
            resampler
                .resample(&[vec![0.0; 4], vec![0.0; 3]], 10)
                .unwrap_err(),
            ResampleError::ChannelLengthMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn rate_conversion_scales_length() {
        let input = vec![vec![0.0f32; 441]];
        let resampler = driver(ResampleMethodKind::Linear, 2);
        let out = resampler.resample_rate(&input, 44100, 48000).unwrap();
        assert_eq!(out[0].len(), 480);
    }

    #[test]
    fn up_then_down_approximates_identity() {
        // A smooth signal upsampled 2x and back should come out close to
        // the original away from the block edges.
        let input = vec![sine(1000, 25.0)];
        let resampler = driver(ResampleMethodKind::Linear, 2);
        let up = resampler.resample(&input, 2000).unwrap();
        let down = resampler.resample(&up, 1000).unwrap();
        for i in 50..950 {
            assert!(
                (down[0][i] - input[0][i]).abs() < 0.1,
                "sample {}: {} vs {}",
                i,
                down[0][i],
                input[0][i]
            );
        }
    }

    #[test]
    fn debug_shows_quality() {
        let resampler = driver(ResampleMethodKind::Linear, 3);
        let text = format!("{:?}", resampler);
        assert!(text.contains("quality: 3"), "{}", text);
    }

    #[test]
    fn config_default_builds() {
        let resampler = AudioResampler::with_config(&ResamplerConfig::default()).unwrap();
        assert_eq!(resampler.quality(), 2);
    }
}
