use super::ResampleMethod;

/// Catmull-Rom interpolation over a four-sample window. Out-of-range
/// taps clamp to the nearest edge sample.
pub struct CubicResampler;

fn tap(input: &[f32], index: isize) -> f32 {
    let clamped = index.clamp(0, input.len() as isize - 1) as usize;
    input[clamped]
}

fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

impl ResampleMethod for CubicResampler {
    fn resample(&self, input: &[f32], output: &mut [f32], _quality: usize) {
        let scale = input.len() as f32 / output.len() as f32;
        for (i, out) in output.iter_mut().enumerate() {
            let position = i as f32 * scale;
            let index = position.floor() as isize;
            let t = position - index as f32;
            *out = catmull_rom(
                tap(input, index - 1),
                tap(input, index),
                tap(input, index + 1),
                tap(input, index + 2),
                t,
            );
        }
    }
}
