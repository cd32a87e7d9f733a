//! # audio-input-core
//!
//! Platform-agnostic audio input core library.
//!
//! Captures PCM frames from a realtime hardware callback, converts sample
//! format and rate, applies gain, and buffers the result in a lock-free ring
//! for a consumer reading at its own pace or a sink flushed periodically.
//! Platform backends implement the `AudioInputDevice` trait and plug into the
//! generic `AudioInput` session.
//!
//! ## Architecture
//!
//! ```text
//! audio-input-core (this crate)
//! ├── traits/       ← AudioInputDevice, RenderSource, FormatConverter, ByteSink, InputDelegate
//! ├── models/       ← StreamFormat, InputState, InputError, CaptureError, InputConfiguration, etc.
//! ├── processing/   ← FrameBatch, RingBuffer, PacketFeeder, PcmConverter, InputBuffer, WAV headers
//! ├── session/      ← AudioInput (state machine), InputStream, EventDispatcher
//! └── storage/      ← WavFileSink, metadata
//! ```
//!
//! ## Data flow
//!
//! ```text
//! [device callback] → InputBuffer::render_from_device
//!                       ├─ FrameBatch ← RenderSource::render
//!                       ├─ volume
//!                       └─ PacketFeeder → PcmConverter ─┐
//!                          (or raw copy) ───────────────┴→ RingBuffer
//! RingBuffer → InputStream::read (pull) | flush timer → ByteSink (push)
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::InputConfiguration;
pub use models::device::{DeviceDescriptor, DeviceMode, TransportType};
pub use models::error::{CaptureError, SinkError};
pub use models::event::InputEvent;
pub use models::format::{ChannelLayout, SampleFormat, StreamFormat};
pub use models::recording_result::{RecordingMetadata, RecordingSummary};
pub use models::state::{InputError, InputState};
pub use processing::frame_batch::FrameBatch;
pub use processing::input_buffer::InputBuffer;
pub use processing::ring_buffer::{RingBuffer, RingReader, RingWriter};
pub use session::audio_input::AudioInput;
pub use session::dispatcher::EventDispatcher;
pub use session::stream::InputStream;
pub use storage::wav_sink::WavFileSink;
pub use traits::byte_sink::{ByteSink, WriteSink};
pub use traits::format_converter::FormatConverter;
pub use traits::input_delegate::InputDelegate;
pub use traits::input_device::{AudioInputDevice, HostClock, RenderCallback, RenderFlow, RenderSource};
