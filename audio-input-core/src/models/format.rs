use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Encoding of a single PCM sample. All multi-byte encodings are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    U8,
    I8,
    I16,
    I32,
    F32,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
        }
    }

    pub fn bits_per_sample(self) -> u16 {
        (self.bytes_per_sample() * 8) as u16
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32)
    }
}

/// How channel samples are laid out across buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    /// One buffer, channels interleaved frame by frame.
    Interleaved,
    /// One buffer per channel.
    Planar,
}

/// Description of an uncompressed PCM stream.
///
/// For PCM a packet is one frame of a single buffer, so for planar streams
/// `bytes_per_packet` is one sample while `bytes_per_frame` spans every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
    pub layout: ChannelLayout,
}

impl StreamFormat {
    pub fn new(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
            layout: ChannelLayout::Interleaved,
        }
    }

    pub fn planar(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
            layout: ChannelLayout::Planar,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }

    pub fn is_interleaved(&self) -> bool {
        self.layout == ChannelLayout::Interleaved
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.sample_format.bits_per_sample()
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.sample_format.bytes_per_sample()
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    pub fn bytes_per_packet(&self) -> usize {
        match self.layout {
            ChannelLayout::Interleaved => self.bytes_per_frame(),
            ChannelLayout::Planar => self.bytes_per_sample(),
        }
    }

    /// Number of buffers a frame batch in this format carries.
    pub fn buffer_count(&self) -> usize {
        match self.layout {
            ChannelLayout::Interleaved => 1,
            ChannelLayout::Planar => self.channels as usize,
        }
    }

    pub fn frames_to_bytes(&self, frames: usize) -> usize {
        frames * self.bytes_per_frame()
    }

    pub fn bytes_to_frames(&self, bytes: usize) -> usize {
        match self.bytes_per_frame() {
            0 => 0,
            bpf => bytes / bpf,
        }
    }

    pub fn duration_of_frames(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(frames * 1_000_000 / self.sample_rate as u64)
    }

    pub fn duration_of_bytes(&self, bytes: usize) -> Duration {
        self.duration_of_frames(self.bytes_to_frames(bytes) as u64)
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{:?}/{:?}",
            self.sample_rate, self.channels, self.sample_format, self.layout
        )
    }
}
