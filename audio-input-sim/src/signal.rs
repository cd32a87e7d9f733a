//! Synthetic frame producers for the simulated devices.
//!
//! A [`SignalSource`] plays the role of the hardware's "render into this
//! buffer list" call: every render fills the batch with the next frames of a
//! test signal, encoded in whatever format the batch carries.

use std::f32::consts::TAU;

use audio_input_core::models::error::CaptureError;
use audio_input_core::models::format::{SampleFormat, StreamFormat};
use audio_input_core::processing::frame_batch::FrameBatch;
use audio_input_core::processing::sample::encode_sample;
use audio_input_core::traits::input_device::RenderSource;

/// Waveform produced by a [`SignalSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Silence,
    /// Every sample holds the same normalized value.
    Constant(f32),
    Sine { frequency: f32, amplitude: f32 },
    /// Raw interleaved frames in the batch's sample format, played once.
    /// Silence follows once the data runs out.
    Pcm(Vec<u8>),
}

/// Deterministic [`RenderSource`] for simulated hardware.
pub struct SignalSource {
    signal: Signal,
    /// Frames produced since creation.
    position: u64,
    renders: usize,
    fail_after: Option<usize>,
    short_by: usize,
}

impl SignalSource {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            position: 0,
            renders: 0,
            fail_after: None,
            short_by: 0,
        }
    }

    pub fn silence() -> Self {
        Self::new(Signal::Silence)
    }

    pub fn constant(value: f32) -> Self {
        Self::new(Signal::Constant(value))
    }

    pub fn sine(frequency: f32, amplitude: f32) -> Self {
        Self::new(Signal::Sine { frequency, amplitude })
    }

    pub fn pcm(data: Vec<u8>) -> Self {
        Self::new(Signal::Pcm(data))
    }

    /// Fails every render after the first `renders` succeed.
    pub fn fail_after(mut self, renders: usize) -> Self {
        self.fail_after = Some(renders);
        self
    }

    /// Renders `frames` fewer frames than requested each cycle.
    pub fn short_by(mut self, frames: usize) -> Self {
        self.short_by = frames;
        self
    }

    /// Frames produced so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn sample(&self, format: &StreamFormat, frame: u64) -> f32 {
        match self.signal {
            Signal::Silence | Signal::Pcm(_) => 0.0,
            Signal::Constant(value) => value,
            Signal::Sine { frequency, amplitude } => {
                let rate = format.sample_rate.max(1) as f64;
                let phase = (frame as f64 * frequency as f64 / rate).fract() as f32;
                amplitude * (TAU * phase).sin()
            }
        }
    }

    fn render_pcm(data: &[u8], position: u64, batch: &mut FrameBatch<'_>, frames: usize) {
        let format = *batch.format();
        let bps = format.bytes_per_sample();
        let bpf = format.bytes_per_frame();
        let channels = format.channels as usize;
        let silence = silence_byte(format.sample_format);

        for f in 0..frames {
            let src = (position as usize + f) * bpf;
            let frame = data.get(src..src + bpf);
            if format.is_interleaved() {
                let out = &mut batch.data_mut(0)[f * bpf..(f + 1) * bpf];
                match frame {
                    Some(frame) => out.copy_from_slice(frame),
                    None => out.fill(silence),
                }
            } else {
                for c in 0..channels {
                    let out = &mut batch.data_mut(c)[f * bps..(f + 1) * bps];
                    match frame {
                        Some(frame) => out.copy_from_slice(&frame[c * bps..(c + 1) * bps]),
                        None => out.fill(silence),
                    }
                }
            }
        }
    }
}

impl RenderSource for SignalSource {
    fn render(&mut self, batch: &mut FrameBatch<'_>, frames: usize) -> Result<usize, CaptureError> {
        if self.fail_after.is_some_and(|n| self.renders >= n) {
            return Err(CaptureError::RenderFailed(format!(
                "simulated failure after {} renders",
                self.renders
            )));
        }
        self.renders += 1;

        let frames = frames.saturating_sub(self.short_by);
        let format = *batch.format();

        if let Signal::Pcm(data) = &self.signal {
            Self::render_pcm(data, self.position, batch, frames);
        } else {
            let bps = format.bytes_per_sample();
            let channels = format.channels as usize;
            for f in 0..frames {
                let value = self.sample(&format, self.position + f as u64);
                for c in 0..channels {
                    let (buffer, offset) = if format.is_interleaved() {
                        (0, (f * channels + c) * bps)
                    } else {
                        (c, f * bps)
                    };
                    encode_sample(format.sample_format, value, &mut batch.data_mut(buffer)[offset..offset + bps]);
                }
            }
        }

        self.position += frames as u64;
        Ok(frames)
    }
}

fn silence_byte(format: SampleFormat) -> u8 {
    if format == SampleFormat::U8 {
        128
    } else {
        0
    }
}
