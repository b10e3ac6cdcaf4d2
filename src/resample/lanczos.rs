use super::ResampleMethod;
use std::f32::consts::PI;

/// Windowed-sinc (Lanczos) resampling. `quality` is the window half-width
/// `a`: the kernel sums `2a` taps around each output position.
///
/// Samples outside the input are treated as zero rather than replicated,
/// so the first and last `a` output samples taper toward zero.
pub struct LanczosResampler;

/// Lanczos kernel: `sinc(x) * sinc(x / a)` for `|x| < a`, zero beyond,
/// one at the center.
pub(crate) fn kernel(x: f32, a: usize) -> f32 {
    if x == 0.0 {
        return 1.0;
    }
    let a = a as f32;
    if x.abs() >= a {
        return 0.0;
    }
    let px = PI * x;
    a * (px.sin() * (px / a).sin()) / (px * px)
}

impl ResampleMethod for LanczosResampler {
    fn resample(&self, input: &[f32], output: &mut [f32], quality: usize) {
        let a = quality.max(1);
        let scale = input.len() as f32 / output.len() as f32;
        for (i, out) in output.iter_mut().enumerate() {
            let position = i as f32 * scale;
            let center = position.floor() as isize;
            let mut acc = 0.0f32;
            for j in (1 - a as isize)..=(a as isize) {
                let index = center + j;
                if index < 0 || index >= input.len() as isize {
                    continue;
                }
                acc += input[index as usize] * kernel(position - index as f32, a);
            }
            *out = acc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_center_is_one() {
        for a in 1..=5 {
            assert_eq!(kernel(0.0, a), 1.0);
        }
    }

    #[test]
    fn kernel_vanishes_outside_window() {
        assert_eq!(kernel(3.0, 3), 0.0);
        assert_eq!(kernel(-3.5, 3), 0.0);
    }

    #[test]
    fn kernel_is_zero_at_integer_offsets() {
        for x in 1..3 {
            assert!(kernel(x as f32, 3).abs() < 1e-6);
        }
    }

    #[test]
    fn identity_positions_reproduce_input() {
        // With an integer scale of 1 every output lands on a knot, where
        // the kernel reduces to the identity.
        let input = vec![0.1, -0.4, 0.8, 0.2, -0.9, 0.5];
        let mut output = vec![0.0; 6];
        LanczosResampler.resample(&input, &mut output, 3);
        for (a, b) in output.iter().zip(input.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn interior_upsample_tracks_signal() {
        let input: Vec<f32> = (0..64)
            .map(|i| (2.0 * PI * i as f32 / 16.0).sin())
            .collect();
        let mut output = vec![0.0; 128];
        LanczosResampler.resample(&input, &mut output, 3);
        for i in 12..116 {
            let expected = (2.0 * PI * (i as f32 * 0.5) / 16.0).sin();
            assert!(
                (output[i] - expected).abs() < 0.05,
                "sample {}: {} vs {}",
                i,
                output[i],
                expected
            );
        }
    }
}
