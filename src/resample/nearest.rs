use super::ResampleMethod;

/// Nearest-neighbor resampling. Cheapest kernel, audible aliasing; meant
/// for previews and non-audio data.
pub struct NearestResampler;

impl ResampleMethod for NearestResampler {
    fn resample(&self, input: &[f32], output: &mut [f32], _quality: usize) {
        let scale = input.len() as f32 / output.len() as f32;
        let last = input.len() - 1;
        for (i, out) in output.iter_mut().enumerate() {
            let index = (i as f32 * scale).round() as usize;
            *out = input[index.min(last)];
        }
    }
}
