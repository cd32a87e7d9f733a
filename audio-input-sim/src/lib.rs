//! # audio-input-sim
//!
//! Simulated audio input backend for audio-input-core.
//!
//! Provides:
//! - `ClockedDevice`: Delivers one render callback per period on a dedicated thread
//! - `ManualDevice`: Runs render callbacks only when its `ManualTrigger` ticks
//! - `SignalSource`: Silence, constant, sine or raw PCM frames for either device
//!
//! ## Usage
//! ```no_run
//! use audio_input_core::{AudioInput, InputConfiguration, SampleFormat, StreamFormat};
//! use audio_input_sim::{ClockedDevice, SignalSource};
//!
//! let format = StreamFormat::new(48000, 2, SampleFormat::I16);
//! let device = ClockedDevice::new(format).with_source(SignalSource::sine(440.0, 0.5));
//! let mut input = AudioInput::new(device, format, InputConfiguration::default());
//! let stream = input.start();
//! assert!(stream.is_some());
//! ```

pub mod clocked_device;
pub mod manual_device;
pub mod signal;

pub use clocked_device::ClockedDevice;
pub use manual_device::{ManualDevice, ManualTrigger};
pub use signal::{Signal, SignalSource};
