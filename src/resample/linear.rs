use super::ResampleMethod;

/// Linear interpolation between the two neighboring samples. The last
/// input sample is replicated at the right edge.
pub struct LinearResampler;

impl ResampleMethod for LinearResampler {
    fn resample(&self, input: &[f32], output: &mut [f32], _quality: usize) {
        let last = input.len() - 1;
        let scale = input.len() as f32 / output.len() as f32;
        for (i, out) in output.iter_mut().enumerate() {
            let position = i as f32 * scale;
            let index = (position as usize).min(last);
            let next = (index + 1).min(last);
            let fraction = position - index as f32;
            *out = input[index] + (input[next] - input[index]) * fraction;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_midpoints() {
        let input = vec![0.0, 1.0];
        let mut output = vec![0.0; 4];
        LinearResampler.resample(&input, &mut output, 1);
        assert_eq!(output[0], 0.0);
        assert!((output[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn never_overshoots_input_range() {
        let input = vec![0.0, 1.0, -1.0, 0.5, -0.25, 0.75];
        let mut output = vec![0.0; 23];
        LinearResampler.resample(&input, &mut output, 1);
        for &sample in &output {
            assert!((-1.0..=1.0).contains(&sample));
        }
    }

    #[test]
    fn constant_input_stays_constant() {
        let input = vec![0.7; 16];
        let mut output = vec![0.0; 41];
        LinearResampler.resample(&input, &mut output, 1);
        for &sample in &output {
            assert!((sample - 0.7).abs() < 1e-6);
        }
    }
}
