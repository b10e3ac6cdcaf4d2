use crate::{ChannelsCount, SampleRate};
use std::fmt::{Display, Formatter};

/// How samples are laid out in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    PcmSigned,
    PcmUnsigned,
    PcmFloat,
    Alaw,
    Ulaw,
}

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::PcmSigned => write!(f, "PCM signed"),
            Encoding::PcmUnsigned => write!(f, "PCM unsigned"),
            Encoding::PcmFloat => write!(f, "PCM float"),
            Encoding::Alaw => write!(f, "A-law"),
            Encoding::Ulaw => write!(f, "U-law"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    InvalidSampleRate(SampleRate),
    InvalidBitsPerSample(u16),
    InvalidChannels(ChannelsCount),
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::InvalidSampleRate(rate) => {
                write!(f, "Invalid sample rate: {}", rate)
            }
            FormatError::InvalidBitsPerSample(bits) => {
                write!(f, "Invalid bits per sample: {}", bits)
            }
            FormatError::InvalidChannels(channels) => {
                write!(f, "Invalid channels count: {}", channels)
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// Immutable description of a byte-level audio stream.
///
/// Frame size and byte rate are derived, never stored, so a format can
/// not be constructed in an inconsistent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    sample_rate: SampleRate,
    bits_per_sample: u16,
    channels: ChannelsCount,
    encoding: Encoding,
    big_endian: bool,
}

impl AudioFormat {
    /// CD-quality stereo PCM, little-endian.
    pub const CD_QUALITY: AudioFormat = AudioFormat {
        sample_rate: 44100,
        bits_per_sample: 16,
        channels: 2,
        encoding: Encoding::PcmSigned,
        big_endian: false,
    };

    /// Stereo float at 48 kHz, the format the cpal backend opens natively.
    pub const DEVICE_FLOAT: AudioFormat = AudioFormat {
        sample_rate: 48000,
        bits_per_sample: 32,
        channels: 2,
        encoding: Encoding::PcmFloat,
        big_endian: cfg!(target_endian = "big"),
    };

    pub fn new(
        sample_rate: SampleRate,
        bits_per_sample: u16,
        channels: ChannelsCount,
        encoding: Encoding,
        big_endian: bool,
    ) -> Result<Self, FormatError> {
        if sample_rate == 0 {
            return Err(FormatError::InvalidSampleRate(sample_rate));
        }
        // Whole bytes only. The converter addresses samples byte-wise.
        if bits_per_sample == 0 || bits_per_sample % 8 != 0 || bits_per_sample > 64 {
            return Err(FormatError::InvalidBitsPerSample(bits_per_sample));
        }
        if channels == 0 {
            return Err(FormatError::InvalidChannels(channels));
        }
        Ok(AudioFormat {
            sample_rate,
            bits_per_sample,
            channels,
            encoding,
            big_endian,
        })
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    pub fn channels(&self) -> ChannelsCount {
        self.channels
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    /// Bytes occupied by one frame (one sample for every channel).
    pub fn frame_size(&self) -> usize {
        self.bytes_per_sample() * self.channels
    }

    /// Bytes consumed per second of audio.
    pub fn byte_rate(&self) -> usize {
        self.frame_size() * self.sample_rate
    }

    pub fn is_mono(&self) -> bool {
        self.channels == 1
    }

    pub fn is_stereo(&self) -> bool {
        self.channels == 2
    }

    pub fn with_sample_rate(self, sample_rate: SampleRate) -> Result<Self, FormatError> {
        AudioFormat::new(
            sample_rate,
            self.bits_per_sample,
            self.channels,
            self.encoding,
            self.big_endian,
        )
    }

    pub fn with_channels(self, channels: ChannelsCount) -> Result<Self, FormatError> {
        AudioFormat::new(
            self.sample_rate,
            self.bits_per_sample,
            channels,
            self.encoding,
            self.big_endian,
        )
    }
}

impl Display for AudioFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-bit {} Hz, {} channel(s), {}",
            self.encoding,
            self.bits_per_sample,
            self.sample_rate,
            self.channels,
            if self.big_endian {
                "big-endian"
            } else {
                "little-endian"
            }
        )
    }
}
