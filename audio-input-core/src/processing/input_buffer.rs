use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use super::converter::{convert_into_ring, Conversion};
use super::frame_batch::FrameBatch;
use super::packet_feeder::PacketFeeder;
use super::ring_buffer::{RingBuffer, RingReader, RingWriter};
use super::sample::scale_samples;
use super::timer::PeriodicTimer;
use crate::models::error::CaptureError;
use crate::models::event::{post_low_priority, InputEvent};
use crate::models::format::StreamFormat;
use crate::traits::byte_sink::ByteSink;
use crate::traits::input_device::RenderSource;

/// State touched only by the render callback.
struct RenderStage {
    batch: FrameBatch<'static>,
    conversion: Conversion,
    writer: RingWriter,
}

/// State touched only by the consumer side (reads, flushes).
struct DrainStage {
    reader: RingReader,
    sink: Option<Box<dyn ByteSink>>,
}

/// Capture buffer manager.
///
/// Sits between the render callback and the consumer: each hardware period is
/// rendered into a frame batch, scaled by the volume, converted (or copied
/// raw) into the ring, and later drained either by `read_bytes` (pull mode) or
/// by a periodic flush into a sink (push mode).
///
/// The render half is entered with `try_lock` and never waits; the drain half
/// is a plain mutex used from control threads only.
pub struct InputBuffer {
    render: Mutex<RenderStage>,
    drain: Mutex<DrainStage>,
    input_format: StreamFormat,
    output_format: StreamFormat,
    period_size: usize,
    volume: AtomicU64,
    pull_mode: AtomicBool,
    device_error: AtomicBool,
    flush_halted: AtomicBool,
    ready_pending: AtomicBool,
    events: Sender<InputEvent>,
    flush_timer: Mutex<Option<PeriodicTimer>>,
}

impl InputBuffer {
    /// Creates a manager with a ring of `ring_capacity` bytes.
    ///
    /// `period_size` is one hardware period in output bytes; the frame batch
    /// is sized for one period of input frames.
    pub fn new(
        ring_capacity: usize,
        period_size: usize,
        input_format: StreamFormat,
        output_format: StreamFormat,
        events: Sender<InputEvent>,
    ) -> Self {
        let period_size = period_size.max(1);
        let period_frames = period_size / output_format.bytes_per_frame().max(1);
        let (writer, reader) = RingBuffer::with_capacity(ring_capacity);

        Self {
            render: Mutex::new(RenderStage {
                batch: FrameBatch::with_capacity(input_format, period_frames),
                conversion: Conversion::between(&input_format, &output_format),
                writer,
            }),
            drain: Mutex::new(DrainStage { reader, sink: None }),
            input_format,
            output_format,
            period_size,
            volume: AtomicU64::new(1.0f64.to_bits()),
            pull_mode: AtomicBool::new(true),
            device_error: AtomicBool::new(false),
            flush_halted: AtomicBool::new(false),
            ready_pending: AtomicBool::new(false),
            events,
            flush_timer: Mutex::new(None),
        }
    }

    /// Renders one hardware period into the ring. Called from the render callback.
    ///
    /// Returns the output frames committed. Zero means the ring had no room.
    pub fn render_from_device(&self, source: &mut dyn RenderSource, frames: usize) -> Result<usize, CaptureError> {
        let mut stage = self.render.try_lock().ok_or(CaptureError::RenderBusy)?;
        let stage = &mut *stage;

        let prepared = stage.batch.reset(frames);
        let rendered = source.render(&mut stage.batch, prepared)?.min(prepared);
        let bytes = rendered * stage.batch.packet_size();
        for i in 0..stage.batch.buffer_count() {
            stage.batch.set_byte_size(i, bytes);
        }

        let gain = self.volume();
        if gain != 1.0 {
            let sample_format = self.input_format.sample_format;
            for i in 0..stage.batch.buffer_count() {
                scale_samples(sample_format, gain, stage.batch.data_mut(i));
            }
        }

        let copied = match &mut stage.conversion {
            Conversion::Streaming(converter) => {
                let mut feeder = PacketFeeder::new(&stage.batch);
                convert_into_ring(converter.as_mut(), &mut feeder, &mut stage.writer)?
            }
            Conversion::NoConversion => {
                let free = stage.writer.free();
                let mut budget = free - free % self.input_format.bytes_per_frame().max(1);
                let mut copied = 0;
                for i in 0..stage.batch.buffer_count() {
                    let data = stage.batch.data(i);
                    let len = data.len().min(budget);
                    copied += stage.writer.write(&data[..len]);
                    budget -= len;
                }
                copied
            }
        };

        let written = copied / self.output_format.bytes_per_frame().max(1);
        if written > 0 && self.is_pull_mode() {
            self.announce_ready_read();
        }
        Ok(written)
    }

    /// Queues one `ReadyRead` per batch of unread data.
    ///
    /// Further renders stay silent until the reader drains, so a consumer that
    /// reads late sees a single event rather than one per period.
    fn announce_ready_read(&self) {
        if self.ready_pending.swap(true, Ordering::AcqRel) {
            return;
        }
        if !post_low_priority(&self.events, InputEvent::ReadyRead) {
            self.ready_pending.store(false, Ordering::Release);
        }
    }

    /// Drains buffered bytes into `out`, in whole periods only.
    ///
    /// The request is clamped to what is buffered and rounded down to a
    /// multiple of the period size, so less than one buffered period yields 0.
    pub fn read_bytes(&self, out: &mut [u8]) -> usize {
        let mut drain = self.drain.lock();
        self.ready_pending.store(false, Ordering::Release);
        let len = out.len().min(drain.reader.used());
        let len = len - len % self.period_size;
        drain.reader.read(&mut out[..len])
    }

    /// Sets the push-mode sink; `None` switches to pull mode.
    pub fn set_flush_device(&self, sink: Option<Box<dyn ByteSink>>) {
        let mut drain = self.drain.lock();
        self.pull_mode.store(sink.is_none(), Ordering::Release);
        drain.sink = sink;
    }

    /// Lets the sink finalize after a full flush. Errors are logged.
    pub fn finish_flush_device(&self) {
        let mut drain = self.drain.lock();
        if let Some(sink) = drain.sink.as_mut() {
            if let Err(e) = sink.finish() {
                log::error!("Failed to finish sink: {}", e);
            }
        }
    }

    /// Pushes buffered bytes to the sink.
    ///
    /// With `all` every buffered byte goes out; otherwise only whole periods.
    /// A sink error sets the persistent device-error flag and ends the flush
    /// timer; nothing is retried until `reset`.
    pub fn flush(&self, all: bool) {
        let mut drain = self.drain.lock();
        let drain = &mut *drain;
        let Some(sink) = drain.sink.as_mut() else {
            return;
        };

        let used = drain.reader.used();
        let to_flush = if all { used } else { used - used % self.period_size };
        let mut flushed = 0;

        while !self.has_device_error() && flushed < to_flush {
            let region = drain.reader.acquire_read_region(to_flush - flushed);
            let len = region.len();
            if len == 0 {
                drain.reader.release_read_region(0);
                break;
            }
            match sink.write(region) {
                Ok(written) => {
                    let written = written.min(len);
                    drain.reader.release_read_region(written);
                    flushed += written;
                    if written == 0 {
                        break;
                    }
                }
                Err(e) => {
                    drain.reader.release_read_region(0);
                    log::error!("Flush to sink failed: {}", e);
                    self.device_error.store(true, Ordering::Release);
                    self.flush_halted.store(true, Ordering::Release);
                }
            }
        }
    }

    /// Starts flushing to the sink every period. No-op in pull mode.
    pub fn start_flush_timer(self: &Arc<Self>) -> Result<(), CaptureError> {
        if self.is_pull_mode() {
            return Ok(());
        }
        let mut slot = self.flush_timer.lock();
        if let Some(mut previous) = slot.take() {
            previous.stop();
        }
        self.flush_halted.store(false, Ordering::Release);

        let buffer: Weak<Self> = Arc::downgrade(self);
        let period = self.period_time().max(Duration::from_millis(1));
        let timer = PeriodicTimer::start("input-flush", period, move || {
            let Some(buffer) = buffer.upgrade() else {
                return ControlFlow::Break(());
            };
            if buffer.flush_halted.load(Ordering::Acquire) {
                return ControlFlow::Break(());
            }
            buffer.flush(false);
            if buffer.has_device_error() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        *slot = Some(timer);
        Ok(())
    }

    /// Stops the flush timer, waiting for an in-flight flush.
    pub fn stop_flush_timer(&self) {
        let timer = self.flush_timer.lock().take();
        if let Some(mut timer) = timer {
            timer.stop();
        }
    }

    /// Asks the flush timer to end at its next tick without waiting.
    /// Safe to call from the render callback.
    pub fn halt_flush_timer(&self) {
        self.flush_halted.store(true, Ordering::Release);
    }

    pub fn is_flush_timer_running(&self) -> bool {
        self.flush_timer.lock().as_ref().is_some_and(|t| t.is_running())
    }

    /// Discards buffered data, converter state and the device-error flag.
    ///
    /// Must not race a render callback; the session halts the device first.
    pub fn reset(&self) {
        let mut render = self.render.lock();
        let mut drain = self.drain.lock();
        let render = &mut *render;
        drain.reader.reset(&mut render.writer);
        render.conversion.reset();
        self.device_error.store(false, Ordering::Release);
        self.ready_pending.store(false, Ordering::Release);
    }

    pub fn set_volume(&self, volume: f64) {
        self.volume.store(volume.to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f64 {
        f64::from_bits(self.volume.load(Ordering::Relaxed))
    }

    /// Bytes buffered and not yet read or flushed.
    pub fn used(&self) -> usize {
        self.drain.lock().reader.used()
    }

    pub fn free(&self) -> usize {
        self.drain.lock().reader.free()
    }

    pub fn capacity(&self) -> usize {
        self.drain.lock().reader.capacity()
    }

    pub fn period_size(&self) -> usize {
        self.period_size
    }

    /// Duration of one period in the output format.
    pub fn period_time(&self) -> Duration {
        self.output_format.duration_of_bytes(self.period_size)
    }

    pub fn input_format(&self) -> &StreamFormat {
        &self.input_format
    }

    pub fn output_format(&self) -> &StreamFormat {
        &self.output_format
    }

    pub fn is_converting(&self) -> bool {
        self.render.lock().conversion.is_streaming()
    }

    pub fn has_device_error(&self) -> bool {
        self.device_error.load(Ordering::Acquire)
    }

    pub fn is_pull_mode(&self) -> bool {
        self.pull_mode.load(Ordering::Acquire)
    }
}
