//! Small DSP building blocks used by the mixer and the resamplers.

use std::f32::consts::PI;

/// Periodic Hann window of the given size.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
        .collect()
}

/// Adds `src` into `dst`, channel by channel, over the overlapping region.
pub fn add_into(dst: &mut [Vec<f32>], src: &[Vec<f32>]) {
    for (dst_ch, src_ch) in dst.iter_mut().zip(src.iter()) {
        for (d, s) in dst_ch.iter_mut().zip(src_ch.iter()) {
            *d += *s;
        }
    }
}

/// Applies gain and constant-power pan in place.
///
/// Pan is in `[-1, 1]` and only affects the first two channels; extra
/// channels get plain gain. The pan law maps `[-1, 1]` onto a quarter
/// circle, so left² + right² stays constant.
pub fn apply_gain_pan(samples: &mut [Vec<f32>], gain: f32, pan: f32) {
    if gain == 1.0 && pan == 0.0 {
        return;
    }

    if pan == 0.0 || samples.len() < 2 {
        for channel in samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
        return;
    }

    let angle = (pan + 1.0) * PI / 4.0;
    let left = gain * angle.cos();
    let right = gain * angle.sin();
    for (ch, channel) in samples.iter_mut().enumerate() {
        let factor = match ch {
            0 => left,
            1 => right,
            _ => gain,
        };
        for sample in channel.iter_mut() {
            *sample *= factor;
        }
    }
}

/// Reverses the channel order (left/right swap for stereo).
pub fn swap_channels(samples: &mut [Vec<f32>]) {
    samples.reverse();
}

/// Flips the sign of every sample.
pub fn reverse_polarity(samples: &mut [Vec<f32>]) {
    for channel in samples.iter_mut() {
        for sample in channel.iter_mut() {
            *sample = -*sample;
        }
    }
}
