use super::ResampleMethod;
use crate::dsp::hann_window;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

const TWO_PI: f32 = 2.0 * PI;

/// STFT-based time stretcher. `quality` is the FFT order: the frame size
/// is `1 << quality`, the analysis hop a quarter frame.
///
/// Unlike the interpolating kernels this one rescales time while keeping
/// pitch, so it only makes sense for larger stretches; for plain rate
/// conversion prefer Lanczos.
///
/// Inputs shorter than one frame produce silence.
pub struct PhaseVocoderResampler;

fn wrap_phase(phase: f32) -> f32 {
    ((phase + PI) % TWO_PI) - PI
}

impl ResampleMethod for PhaseVocoderResampler {
    fn resample(&self, input: &[f32], output: &mut [f32], quality: usize) {
        let frame = 1usize << quality;
        let target = output.len();
        output.fill(0.0);

        let analysis_hop = frame / 4;
        if analysis_hop == 0 || input.len() < frame {
            return;
        }
        let ratio = target as f32 / input.len() as f32;
        let synthesis_hop = ((analysis_hop as f32 * ratio).round() as usize).max(1);
        let frames = (input.len() - frame) / analysis_hop;
        let half = frame / 2;

        let window = hann_window(frame);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame);
        let ifft = planner.plan_fft_inverse(frame);

        let mut spectrum = vec![Complex::new(0.0f32, 0.0); frame];
        let mut magnitude = vec![0.0f32; half + 1];
        let mut phase = vec![0.0f32; half + 1];
        let mut previous_phase = vec![0.0f32; half + 1];
        let mut accumulated_phase = vec![0.0f32; half + 1];
        // Overlap-add buffer with one frame of slack past the target.
        let mut overlap = vec![0.0f32; target + frame];

        let inverse_norm = 1.0 / frame as f32;
        // Hann windows at the synthesis hop overlap to a squared sum of
        // 0.375 * frame / hop; dividing by it keeps unity gain.
        let overlap_gain = synthesis_hop as f32 / (0.375 * frame as f32);
        for index in 0..frames {
            let in_pos = index * analysis_hop;
            let out_pos = index * synthesis_hop;
            if out_pos + frame > overlap.len() {
                break;
            }

            for i in 0..frame {
                spectrum[i] = Complex::new(input[in_pos + i] * window[i], 0.0);
            }
            fft.process(&mut spectrum);

            for k in 0..=half {
                magnitude[k] = spectrum[k].norm();
                phase[k] = spectrum[k].im.atan2(spectrum[k].re);
            }

            // Phase propagation: unwrap the deviation from the bin's
            // expected advance, then accumulate at the synthesis hop.
            for k in 0..=half {
                let expected = TWO_PI * analysis_hop as f32 * k as f32 / frame as f32;
                let deviation = wrap_phase(phase[k] - previous_phase[k] - expected);
                let frequency = TWO_PI * k as f32 / frame as f32 + deviation / analysis_hop as f32;
                accumulated_phase[k] += synthesis_hop as f32 * frequency;
                previous_phase[k] = phase[k];
            }

            for k in 0..=half {
                let re = magnitude[k] * accumulated_phase[k].cos();
                let im = magnitude[k] * accumulated_phase[k].sin();
                spectrum[k] = Complex::new(re, im);
                // Keep the spectrum Hermitian so the inverse is real.
                if k > 0 && k < half {
                    spectrum[frame - k] = Complex::new(re, -im);
                }
            }
            ifft.process(&mut spectrum);

            for i in 0..frame {
                // rustfft's inverse is unnormalized, hence the 1/frame.
                overlap[out_pos + i] += spectrum[i].re * inverse_norm * window[i] * overlap_gain;
            }
        }

        output.copy_from_slice(&overlap[..target]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_stays_within_pi() {
        for &x in &[0.0f32, 1.0, -1.0, 4.0, 10.0] {
            let wrapped = wrap_phase(x);
            assert!(wrapped.abs() <= TWO_PI);
            // Wrapping preserves the angle modulo a full turn.
            let turns = (x - wrapped) / TWO_PI;
            assert!((turns - turns.round()).abs() < 1e-3);
        }
    }

    #[test]
    fn short_input_produces_silence() {
        let input = vec![1.0f32; 10];
        let mut output = vec![0.5f32; 20];
        PhaseVocoderResampler.resample(&input, &mut output, 6);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn output_is_finite_and_sized() {
        let input: Vec<f32> = (0..2000)
            .map(|i| (TWO_PI * i as f32 / 50.0).sin())
            .collect();
        for &target in &[500usize, 1000, 4000] {
            let mut output = vec![0.0f32; target];
            PhaseVocoderResampler.resample(&input, &mut output, 7);
            assert_eq!(output.len(), target);
            assert!(output.iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn stretch_preserves_energy_presence() {
        // A steady tone stretched 2x should still carry signal in the
        // middle of the output, not silence.
        let input: Vec<f32> = (0..4096)
            .map(|i| (TWO_PI * i as f32 / 32.0).sin())
            .collect();
        let mut output = vec![0.0f32; 8192];
        PhaseVocoderResampler.resample(&input, &mut output, 8);
        let mid = &output[3000..5000];
        let rms = (mid.iter().map(|s| s * s).sum::<f32>() / mid.len() as f32).sqrt();
        assert!(rms > 0.01, "mid-stretch rms {}", rms);
    }
}
