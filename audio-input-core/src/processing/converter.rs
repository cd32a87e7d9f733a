//! Streaming PCM conversion and the adapter that drives it into the ring.

use std::collections::VecDeque;

use super::packet_feeder::PacketFeeder;
use super::ring_buffer::RingWriter;
use super::sample::{decode_sample, encode_sample};
use crate::models::error::CaptureError;
use crate::models::format::StreamFormat;
use crate::traits::format_converter::{FormatConverter, PacketSource};

/// Conversion stage between the hardware format and the requested format.
pub enum Conversion {
    /// Formats are treated as identical; batches are copied raw.
    NoConversion,
    Streaming(Box<dyn FormatConverter>),
}

impl Conversion {
    /// Builds the stage for `input` → `output`.
    ///
    /// A converter that cannot be constructed is logged and replaced by the
    /// raw copy path; the session keeps working with mismatched formats.
    pub fn between(input: &StreamFormat, output: &StreamFormat) -> Self {
        if input == output {
            return Self::NoConversion;
        }
        match PcmConverter::new(*input, *output) {
            Ok(converter) => Self::Streaming(Box::new(converter)),
            Err(e) => {
                log::warn!("Unable to create converter {} -> {}: {}", input, output, e);
                Self::NoConversion
            }
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming(_))
    }

    pub fn reset(&mut self) {
        if let Self::Streaming(converter) = self {
            converter.reset();
        }
    }
}

/// Runs `converter` over the feeder, committing its output to the ring.
///
/// Loops over ring write regions until the feeder is exhausted or the ring has
/// no free region. Returns the bytes committed.
pub fn convert_into_ring(
    converter: &mut dyn FormatConverter,
    feeder: &mut PacketFeeder<'_>,
    writer: &mut RingWriter,
) -> Result<usize, CaptureError> {
    let available = writer.free();
    let mut copied = 0;

    while !feeder.is_empty() {
        let region = writer.acquire_write_region(available - copied);
        if region.is_empty() {
            writer.release_write_region(0);
            break;
        }

        let written = match converter.fill(feeder, region) {
            Ok(n) => n,
            Err(e) => {
                writer.release_write_region(0);
                return Err(e);
            }
        };
        writer.release_write_region(written);
        copied += written;

        if written == 0 {
            break;
        }
    }

    Ok(copied)
}

/// Streaming linear-interpolation resampler over interleaved float frames.
struct LinearResampler {
    /// Input frames advanced per output frame.
    step: f64,
    phase: f64,
    previous: Vec<f32>,
    primed: bool,
}

impl LinearResampler {
    fn new(input_rate: u32, output_rate: u32, channels: usize) -> Self {
        Self {
            step: input_rate as f64 / output_rate as f64,
            phase: 0.0,
            previous: vec![0.0; channels],
            primed: false,
        }
    }

    fn push(&mut self, frame: &[f32], out: &mut VecDeque<f32>) {
        if !self.primed {
            self.previous.copy_from_slice(frame);
            self.primed = true;
            return;
        }
        while self.phase < 1.0 {
            let t = self.phase as f32;
            for (prev, next) in self.previous.iter().zip(frame) {
                out.push_back(prev + (next - prev) * t);
            }
            self.phase += self.step;
        }
        self.phase -= 1.0;
        self.previous.copy_from_slice(frame);
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.primed = false;
    }
}

/// PCM converter covering sample encoding, layout, channel count and rate.
///
/// Input is decoded one frame at a time to `f32`, mapped to the output channel
/// count, resampled when the rates differ and queued. `fill` drains the queue
/// into the destination window and pulls more input only once the queue holds
/// less than one frame.
pub struct PcmConverter {
    input: StreamFormat,
    output: StreamFormat,
    resampler: Option<LinearResampler>,
    input_frame: Vec<f32>,
    mapped_frame: Vec<f32>,
    pending: VecDeque<f32>,
    staged: Vec<f32>,
}

impl PcmConverter {
    pub fn new(input: StreamFormat, output: StreamFormat) -> Result<Self, CaptureError> {
        if !input.is_valid() {
            return Err(CaptureError::UnsupportedFormat(format!("invalid input format {}", input)));
        }
        if !output.is_valid() {
            return Err(CaptureError::UnsupportedFormat(format!("invalid output format {}", output)));
        }

        let out_channels = output.channels as usize;
        let resampler = (input.sample_rate != output.sample_rate)
            .then(|| LinearResampler::new(input.sample_rate, output.sample_rate, out_channels));

        Ok(Self {
            input,
            output,
            resampler,
            input_frame: vec![0.0; input.channels as usize],
            mapped_frame: vec![0.0; out_channels],
            pending: VecDeque::with_capacity(out_channels * 64),
            staged: Vec::new(),
        })
    }

    /// Input frames needed to produce `frames` output frames.
    fn input_frames_for(&self, frames: usize) -> usize {
        let ratio = self.input.sample_rate as f64 / self.output.sample_rate as f64;
        ((frames as f64 * ratio).ceil() as usize).max(1)
    }

    fn decode_frame(&mut self, window_buffers: &[&[u8]], packet: usize) {
        let format = self.input.sample_format;
        let bps = self.input.bytes_per_sample();
        if self.input.is_interleaved() {
            let base = packet * self.input.bytes_per_frame();
            for (c, value) in self.input_frame.iter_mut().enumerate() {
                *value = decode_sample(format, &window_buffers[0][base + c * bps..]);
            }
        } else {
            for (c, value) in self.input_frame.iter_mut().enumerate() {
                *value = decode_sample(format, &window_buffers[c][packet * bps..]);
            }
        }
    }

    fn map_channels(&mut self) {
        let input = &self.input_frame;
        let output = &mut self.mapped_frame;
        if input.len() == output.len() {
            output.copy_from_slice(input);
        } else if output.len() == 1 {
            output[0] = input.iter().sum::<f32>() / input.len() as f32;
        } else if input.len() == 1 {
            output.fill(input[0]);
        } else {
            let common = input.len().min(output.len());
            output[..common].copy_from_slice(&input[..common]);
            output[common..].fill(0.0);
        }
    }

    fn queue_frame(&mut self) {
        match &mut self.resampler {
            Some(resampler) => resampler.push(&self.mapped_frame, &mut self.pending),
            None => self.pending.extend(self.mapped_frame.iter().copied()),
        }
    }

    fn encode_staged(&self, output: &mut [u8], frames: usize) {
        let channels = self.output.channels as usize;
        let format = self.output.sample_format;
        let bps = self.output.bytes_per_sample();
        for (index, value) in self.staged.iter().enumerate() {
            let (frame, channel) = (index / channels, index % channels);
            let offset = if self.output.is_interleaved() {
                index * bps
            } else {
                (channel * frames + frame) * bps
            };
            encode_sample(format, *value, &mut output[offset..offset + bps]);
        }
    }
}

impl FormatConverter for PcmConverter {
    fn input_format(&self) -> &StreamFormat {
        &self.input
    }

    fn output_format(&self) -> &StreamFormat {
        &self.output
    }

    fn fill(&mut self, source: &mut dyn PacketSource<'_>, output: &mut [u8]) -> Result<usize, CaptureError> {
        let channels = self.output.channels as usize;
        let capacity = output.len() / self.output.bytes_per_frame();
        self.staged.clear();

        let mut frames = 0;
        let mut buffers: Vec<&[u8]> = Vec::with_capacity(self.input.buffer_count());
        while frames < capacity {
            while frames < capacity && self.pending.len() >= channels {
                self.staged.extend(self.pending.drain(..channels));
                frames += 1;
            }
            if frames == capacity {
                break;
            }

            let wanted = self.input_frames_for(capacity - frames);
            let Some(window) = source.feed(wanted) else {
                break;
            };
            if window.buffer_count() != self.input.buffer_count() {
                return Err(CaptureError::ConversionFailed(format!(
                    "expected {} input buffers, got {}",
                    self.input.buffer_count(),
                    window.buffer_count()
                )));
            }
            buffers.clear();
            buffers.extend((0..window.buffer_count()).map(|i| window.buffer(i)));
            for packet in 0..window.packets() {
                self.decode_frame(&buffers, packet);
                self.map_channels();
                self.queue_frame();
            }
        }

        self.encode_staged(output, frames);
        Ok(frames * self.output.bytes_per_frame())
    }

    fn has_pending(&self) -> bool {
        self.pending.len() >= self.output.channels as usize
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.staged.clear();
        if let Some(resampler) = &mut self.resampler {
            resampler.reset();
        }
    }
}
