//! Planar-buffer shape helpers shared by the mixer, the resampler driver
//! and the output layer.

use crate::node::RenderError;
use crate::SamplesCount;

/// Returns the shared channel length if every channel has the same one.
pub fn uniform_len(samples: &[Vec<f32>]) -> Option<SamplesCount> {
    let first = samples.first()?.len();
    if samples.iter().all(|channel| channel.len() == first) {
        Some(first)
    } else {
        None
    }
}

/// Shape check used at render entry points: non-empty buffer, non-empty
/// channels, all channels the same length.
pub fn check_shape(samples: &[Vec<f32>]) -> Result<SamplesCount, RenderError> {
    if samples.is_empty() {
        return Err(RenderError::EmptyBuffer);
    }
    let expected = samples[0].len();
    for channel in samples.iter() {
        if channel.len() != expected {
            return Err(RenderError::LengthMismatch {
                expected,
                actual: channel.len(),
            });
        }
    }
    if expected == 0 {
        return Err(RenderError::EmptyBuffer);
    }
    Ok(expected)
}

pub fn silence(samples: &mut [Vec<f32>]) {
    for channel in samples.iter_mut() {
        channel.fill(0.0);
    }
}

/// Planar to interleaved. `out` must hold `channels * length` samples.
pub fn interleave(samples: &[Vec<f32>], out: &mut [f32]) {
    let channels = samples.len();
    debug_assert!(channels > 0);
    debug_assert_eq!(out.len(), channels * samples[0].len());
    for (frame, chunk) in out.chunks_exact_mut(channels).enumerate() {
        for (ch, slot) in chunk.iter_mut().enumerate() {
            *slot = samples[ch][frame];
        }
    }
}

/// Interleaved to planar. Channel vectors keep their current lengths.
pub fn deinterleave(data: &[f32], samples: &mut [Vec<f32>]) {
    let channels = samples.len();
    debug_assert!(channels > 0);
    debug_assert_eq!(data.len(), channels * samples[0].len());
    for (frame, chunk) in data.chunks_exact(channels).enumerate() {
        for (ch, &value) in chunk.iter().enumerate() {
            samples[ch][frame] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_len_detects_mismatch() {
        assert_eq!(uniform_len(&[vec![0.0; 4], vec![0.0; 4]]), Some(4));
        assert_eq!(uniform_len(&[vec![0.0; 4], vec![0.0; 3]]), None);
        assert_eq!(uniform_len(&[]), None);
    }

    #[test]
    fn check_shape_rejects_empty() {
        assert_eq!(check_shape(&[]), Err(RenderError::EmptyBuffer));
        assert_eq!(check_shape(&[vec![], vec![]]), Err(RenderError::EmptyBuffer));
    }

    #[test]
    fn check_shape_reports_lengths() {
        let err = check_shape(&[vec![0.0; 8], vec![0.0; 6]]).unwrap_err();
        assert_eq!(
            err,
            RenderError::LengthMismatch {
                expected: 8,
                actual: 6
            }
        );
    }

    #[test]
    fn interleave_round_trip() {
        let planar = vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]];
        let mut inter = vec![0.0; 6];
        interleave(&planar, &mut inter);
        assert_eq!(inter, vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);

        let mut back = vec![vec![0.0; 3]; 2];
        deinterleave(&inter, &mut back);
        assert_eq!(back, planar);
    }
}
