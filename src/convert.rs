//! Conversion between the graph's planar f32 blocks and interleaved
//! device byte streams: PCM signed/unsigned 8..32-bit (24-bit via the
//! `i24` crate), float 32/64, A-law and u-law, both endiannesses.

use crate::format::{AudioFormat, Encoding};
use crate::{ChannelsCount, SamplesCount};
use i24::I24;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    EmptyBuffer,
    ChannelLengthMismatch {
        expected: SamplesCount,
        actual: SamplesCount,
    },
    ChannelsMismatch {
        expected: ChannelsCount,
        actual: ChannelsCount,
    },
    /// Byte stream does not contain a whole number of frames.
    TruncatedData {
        len: usize,
        frame_size: usize,
    },
    UnsupportedFormat(AudioFormat),
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::EmptyBuffer => write!(f, "Empty sample buffer"),
            ConvertError::ChannelLengthMismatch { expected, actual } => {
                write!(
                    f,
                    "Channel length mismatch: expected {}, got {}",
                    expected, actual
                )
            }
            ConvertError::ChannelsMismatch { expected, actual } => {
                write!(
                    f,
                    "Channels count mismatch: format has {}, buffer has {}",
                    expected, actual
                )
            }
            ConvertError::TruncatedData { len, frame_size } => {
                write!(
                    f,
                    "Byte stream of {} bytes is not a multiple of the {}-byte frame",
                    len, frame_size
                )
            }
            ConvertError::UnsupportedFormat(format) => {
                write!(f, "Unsupported format: {}", format)
            }
        }
    }
}

impl std::error::Error for ConvertError {}

fn ensure_supported(format: &AudioFormat) -> Result<(), ConvertError> {
    let supported = match format.encoding() {
        Encoding::PcmSigned | Encoding::PcmUnsigned => {
            matches!(format.bits_per_sample(), 8 | 16 | 24 | 32)
        }
        Encoding::PcmFloat => matches!(format.bits_per_sample(), 32 | 64),
        Encoding::Alaw | Encoding::Ulaw => format.bits_per_sample() == 8,
    };
    if supported {
        Ok(())
    } else {
        Err(ConvertError::UnsupportedFormat(*format))
    }
}

/// Converts a planar f32 block into an interleaved byte stream in the
/// given format. Samples are clamped to `[-1, 1]` first.
pub fn from_samples(samples: &[Vec<f32>], format: &AudioFormat) -> Result<Vec<u8>, ConvertError> {
    ensure_supported(format)?;
    if samples.is_empty() || samples[0].is_empty() {
        return Err(ConvertError::EmptyBuffer);
    }
    let length = samples[0].len();
    for channel in samples.iter() {
        if channel.len() != length {
            return Err(ConvertError::ChannelLengthMismatch {
                expected: length,
                actual: channel.len(),
            });
        }
    }
    if samples.len() != format.channels() {
        return Err(ConvertError::ChannelsMismatch {
            expected: format.channels(),
            actual: samples.len(),
        });
    }

    let step = format.bytes_per_sample();
    let mut out = vec![0u8; length * format.frame_size()];
    let mut offset = 0;
    for frame in 0..length {
        for channel in samples.iter() {
            encode_sample(channel[frame], format, &mut out[offset..offset + step]);
            offset += step;
        }
    }
    Ok(out)
}

/// Converts an interleaved byte stream into a planar f32 block.
pub fn to_samples(data: &[u8], format: &AudioFormat) -> Result<Vec<Vec<f32>>, ConvertError> {
    ensure_supported(format)?;
    let frame_size = format.frame_size();
    if data.is_empty() {
        return Err(ConvertError::EmptyBuffer);
    }
    if data.len() % frame_size != 0 {
        return Err(ConvertError::TruncatedData {
            len: data.len(),
            frame_size,
        });
    }

    let frames = data.len() / frame_size;
    let step = format.bytes_per_sample();
    let mut samples = vec![vec![0.0f32; frames]; format.channels()];
    let mut offset = 0;
    for frame in 0..frames {
        for channel in samples.iter_mut() {
            channel[frame] = decode_sample(&data[offset..offset + step], format);
            offset += step;
        }
    }
    Ok(samples)
}

fn encode_sample(value: f32, format: &AudioFormat, out: &mut [u8]) {
    let value = value.clamp(-1.0, 1.0);
    match format.encoding() {
        Encoding::PcmSigned => encode_signed(value, format, out),
        Encoding::PcmUnsigned => encode_unsigned(value, format, out),
        Encoding::PcmFloat => match format.bits_per_sample() {
            32 => out.copy_from_slice(&endian_bytes_f32(value, format.is_big_endian())),
            _ => out.copy_from_slice(&endian_bytes_f64(value as f64, format.is_big_endian())),
        },
        Encoding::Alaw => out[0] = companded_byte(alaw_compress(value)),
        Encoding::Ulaw => out[0] = companded_byte(ulaw_compress(value)),
    }
}

fn decode_sample(bytes: &[u8], format: &AudioFormat) -> f32 {
    match format.encoding() {
        Encoding::PcmSigned => decode_signed(bytes, format),
        Encoding::PcmUnsigned => decode_unsigned(bytes, format),
        Encoding::PcmFloat => match format.bits_per_sample() {
            32 => endian_f32(bytes, format.is_big_endian()),
            _ => endian_f64(bytes, format.is_big_endian()) as f32,
        },
        Encoding::Alaw => alaw_expand(companded_value(bytes[0])),
        Encoding::Ulaw => ulaw_expand(companded_value(bytes[0])),
    }
}

fn encode_signed(value: f32, format: &AudioFormat, out: &mut [u8]) {
    let bits = format.bits_per_sample() as u32;
    let full = 2f64.powi(bits as i32 - 1);
    let scaled = ((value as f64 * full).round() as i64).clamp(-full as i64, full as i64 - 1);
    match bits {
        24 if format.is_big_endian() => {
            let bytes = (scaled as i32).to_be_bytes();
            out.copy_from_slice(&bytes[1..]);
        }
        24 => {
            let bytes = (scaled as i32).to_le_bytes();
            out.copy_from_slice(&bytes[..3]);
        }
        _ => write_int(scaled as u64, out, format.is_big_endian()),
    }
}

fn decode_signed(bytes: &[u8], format: &AudioFormat) -> f32 {
    let bits = format.bits_per_sample() as u32;
    let full = 2f64.powi(bits as i32 - 1);
    let raw: i64 = match bits {
        24 => {
            let triple = [bytes[0], bytes[1], bytes[2]];
            let sample = if format.is_big_endian() {
                I24::from_be_bytes(triple)
            } else {
                I24::from_le_bytes(triple)
            };
            sample.to_i32() as i64
        }
        _ => {
            // Sign-extend from the sample width.
            let unsigned = read_int(bytes, format.is_big_endian());
            let shift = 64 - bits;
            ((unsigned << shift) as i64) >> shift
        }
    };
    ((raw as f64 / full) as f32).clamp(-1.0, 1.0)
}

fn encode_unsigned(value: f32, format: &AudioFormat, out: &mut [u8]) {
    let bits = format.bits_per_sample() as u32;
    let max = 2f64.powi(bits as i32) - 1.0;
    let scaled = ((value as f64 + 1.0) / 2.0 * max).round().clamp(0.0, max) as u64;
    write_int(scaled, out, format.is_big_endian());
}

fn decode_unsigned(bytes: &[u8], format: &AudioFormat) -> f32 {
    let bits = format.bits_per_sample() as u32;
    let max = 2f64.powi(bits as i32) - 1.0;
    let raw = read_int(bytes, format.is_big_endian());
    ((raw as f64 / max * 2.0 - 1.0) as f32).clamp(-1.0, 1.0)
}

fn write_int(value: u64, out: &mut [u8], big_endian: bool) {
    let n = out.len();
    if big_endian {
        out.copy_from_slice(&value.to_be_bytes()[8 - n..]);
    } else {
        out.copy_from_slice(&value.to_le_bytes()[..n]);
    }
}

fn read_int(bytes: &[u8], big_endian: bool) -> u64 {
    let mut value = 0u64;
    if big_endian {
        for &b in bytes {
            value = (value << 8) | b as u64;
        }
    } else {
        for &b in bytes.iter().rev() {
            value = (value << 8) | b as u64;
        }
    }
    value
}

fn endian_bytes_f32(value: f32, big_endian: bool) -> [u8; 4] {
    if big_endian {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    }
}

fn endian_bytes_f64(value: f64, big_endian: bool) -> [u8; 8] {
    if big_endian {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    }
}

fn endian_f32(bytes: &[u8], big_endian: bool) -> f32 {
    let arr = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if big_endian {
        f32::from_be_bytes(arr)
    } else {
        f32::from_le_bytes(arr)
    }
}

fn endian_f64(bytes: &[u8], big_endian: bool) -> f64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    if big_endian {
        f64::from_be_bytes(arr)
    } else {
        f64::from_le_bytes(arr)
    }
}

// Continuous-curve companding. The compressed value in [-1, 1] is stored
// as a single unsigned byte.

const ULAW_MU: f32 = 255.0;
const ALAW_A: f32 = 87.6;

fn ulaw_compress(value: f32) -> f32 {
    value.signum() * (1.0 + ULAW_MU * value.abs()).ln() / (1.0 + ULAW_MU).ln()
}

fn ulaw_expand(value: f32) -> f32 {
    value.signum() * ((1.0 + ULAW_MU).powf(value.abs()) - 1.0) / ULAW_MU
}

fn alaw_compress(value: f32) -> f32 {
    let abs = value.abs();
    let denom = 1.0 + ALAW_A.ln();
    let compressed = if abs < 1.0 / ALAW_A {
        ALAW_A * abs / denom
    } else {
        (1.0 + (ALAW_A * abs).ln()) / denom
    };
    value.signum() * compressed
}

fn alaw_expand(value: f32) -> f32 {
    let abs = value.abs();
    let denom = 1.0 + ALAW_A.ln();
    let expanded = if abs < 1.0 / denom {
        abs * denom / ALAW_A
    } else {
        (abs * denom - 1.0).exp() / ALAW_A
    };
    value.signum() * expanded
}

fn companded_byte(value: f32) -> u8 {
    ((value.clamp(-1.0, 1.0) + 1.0) / 2.0 * 255.0).round() as u8
}

fn companded_value(byte: u8) -> f32 {
    byte as f32 / 255.0 * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(format: &AudioFormat, tolerance: f32) {
        let samples: Vec<Vec<f32>> = (0..format.channels())
            .map(|ch| {
                (0..64)
                    .map(|i| ((i + ch * 17) as f32 / 32.0 - 1.0).clamp(-1.0, 1.0))
                    .collect()
            })
            .collect();
        let bytes = from_samples(&samples, format).unwrap();
        assert_eq!(bytes.len(), 64 * format.frame_size());
        let back = to_samples(&bytes, format).unwrap();
        for (original, decoded) in samples.iter().zip(back.iter()) {
            for (&a, &b) in original.iter().zip(decoded.iter()) {
                assert!(
                    (a - b).abs() <= tolerance,
                    "{}: {} vs {}",
                    format,
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn pcm_signed_round_trips() {
        for &bits in &[8u16, 16, 24, 32] {
            for &big in &[false, true] {
                let format =
                    AudioFormat::new(44100, bits, 2, Encoding::PcmSigned, big).unwrap();
                round_trip(&format, 2.0 / 2f32.powi(bits as i32 - 1));
            }
        }
    }

    #[test]
    fn pcm_unsigned_round_trips() {
        let format = AudioFormat::new(44100, 8, 1, Encoding::PcmUnsigned, false).unwrap();
        round_trip(&format, 1.0 / 127.0);
    }

    #[test]
    fn float_round_trips_exactly() {
        let format = AudioFormat::new(48000, 32, 2, Encoding::PcmFloat, false).unwrap();
        round_trip(&format, 0.0);
        let format = AudioFormat::new(48000, 64, 2, Encoding::PcmFloat, true).unwrap();
        round_trip(&format, 1e-7);
    }

    #[test]
    fn companding_round_trips_coarsely() {
        let ulaw = AudioFormat::new(8000, 8, 1, Encoding::Ulaw, false).unwrap();
        round_trip(&ulaw, 0.05);
        let alaw = AudioFormat::new(8000, 8, 1, Encoding::Alaw, false).unwrap();
        round_trip(&alaw, 0.05);
    }

    #[test]
    fn companding_is_monotonic() {
        let mut prev = f32::NEG_INFINITY;
        for i in 0..=100 {
            let x = i as f32 / 50.0 - 1.0;
            let y = ulaw_compress(x);
            assert!(y >= prev);
            prev = y;
        }
    }

    #[test]
    fn signed_16_known_values() {
        let format = AudioFormat::new(44100, 16, 1, Encoding::PcmSigned, false).unwrap();
        let bytes = from_samples(&[vec![1.0, -1.0, 0.0]], &format).unwrap();
        assert_eq!(&bytes[0..2], &i16::MAX.to_le_bytes());
        assert_eq!(&bytes[2..4], &i16::MIN.to_le_bytes());
        assert_eq!(&bytes[4..6], &0i16.to_le_bytes());
    }

    #[test]
    fn signed_24_known_values() {
        let format = AudioFormat::new(44100, 24, 1, Encoding::PcmSigned, false).unwrap();
        let bytes = from_samples(&[vec![1.0, -1.0, 0.0]], &format).unwrap();
        assert_eq!(&bytes[0..3], &[0xFF, 0xFF, 0x7F]);
        assert_eq!(&bytes[3..6], &[0x00, 0x00, 0x80]);
        assert_eq!(&bytes[6..9], &[0x00, 0x00, 0x00]);

        let back = to_samples(&bytes, &format).unwrap();
        assert!((back[0][0] - 1.0).abs() < 1e-6);
        assert!((back[0][1] + 1.0).abs() < 1e-6);
        assert_eq!(back[0][2], 0.0);
    }

    #[test]
    fn big_endian_reverses_byte_order() {
        let le = AudioFormat::new(44100, 16, 1, Encoding::PcmSigned, false).unwrap();
        let be = AudioFormat::new(44100, 16, 1, Encoding::PcmSigned, true).unwrap();
        let a = from_samples(&[vec![0.5]], &le).unwrap();
        let b = from_samples(&[vec![0.5]], &be).unwrap();
        assert_eq!(a[0], b[1]);
        assert_eq!(a[1], b[0]);
    }

    #[test]
    fn rejects_channel_mismatch() {
        let format = AudioFormat::new(44100, 16, 2, Encoding::PcmSigned, false).unwrap();
        let err = from_samples(&[vec![0.0; 4]], &format).unwrap_err();
        assert_eq!(
            err,
            ConvertError::ChannelsMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn rejects_truncated_stream() {
        let format = AudioFormat::new(44100, 16, 2, Encoding::PcmSigned, false).unwrap();
        let err = to_samples(&[0u8; 6], &format).unwrap_err();
        assert_eq!(
            err,
            ConvertError::TruncatedData {
                len: 6,
                frame_size: 4
            }
        );
    }

    #[test]
    fn rejects_unsupported_width() {
        let format = AudioFormat::new(44100, 16, 1, Encoding::Ulaw, false).unwrap();
        let err = from_samples(&[vec![0.0]], &format).unwrap_err();
        assert_eq!(err, ConvertError::UnsupportedFormat(format));
    }
}
