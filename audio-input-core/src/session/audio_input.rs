use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};

use super::stream::InputStream;
use crate::models::config::InputConfiguration;
use crate::models::error::CaptureError;
use crate::models::event::{post_low_priority, InputEvent};
use crate::models::format::StreamFormat;
use crate::models::state::{AtomicInputError, AtomicInputState, InputError, InputState};
use crate::processing::input_buffer::InputBuffer;
use crate::processing::timer::PeriodicTimer;
use crate::traits::byte_sink::ByteSink;
use crate::traits::input_device::{AudioInputDevice, HostClock, RenderCallback, RenderFlow, RenderSource};

// Render-thread handshake values.
const THREAD_RUNNING: u8 = 0;
const THREAD_STOP_REQUESTED: u8 = 1;
const THREAD_STOPPED: u8 = 2;

/// State shared between the control side and the render callback.
struct SessionShared {
    state: Arc<AtomicInputState>,
    error: AtomicInputError,
    thread_state: AtomicU8,
    total_frames: AtomicU64,
    halt_ack: Mutex<bool>,
    halt_cv: Condvar,
    events: Sender<InputEvent>,
}

impl SessionShared {
    /// Body of the render callback.
    fn on_render(&self, buffer: &InputBuffer, source: &mut dyn RenderSource, frames: usize) -> RenderFlow {
        match self.thread_state.load(Ordering::Acquire) {
            THREAD_STOP_REQUESTED => {
                self.acknowledge_halt();
                return RenderFlow::Halt;
            }
            THREAD_STOPPED => return RenderFlow::Halt,
            _ => {}
        }

        match buffer.render_from_device(source, frames) {
            Ok(0) => {
                self.device_full();
                RenderFlow::Continue
            }
            Ok(written) => {
                self.total_frames.fetch_add(written as u64, Ordering::Relaxed);
                self.device_active();
                RenderFlow::Continue
            }
            Err(e) => self.device_error(buffer, &e),
        }
    }

    fn acknowledge_halt(&self) {
        self.thread_state.store(THREAD_STOPPED, Ordering::Release);
        let mut acked = self.halt_ack.lock();
        *acked = true;
        self.halt_cv.notify_one();
    }

    fn device_active(&self) {
        if self.state.transition(InputState::Idle, InputState::Active) {
            self.post_state(InputState::Active);
        }
    }

    fn device_full(&self) {
        if self.state.transition(InputState::Active, InputState::Idle) {
            self.error.store(InputError::UnderrunError);
            self.post_state(InputState::Idle);
        }
    }

    /// Only a flowing session is torn down; an error while Idle is ignored.
    fn device_error(&self, buffer: &InputBuffer, error: &CaptureError) -> RenderFlow {
        if !self.state.transition(InputState::Active, InputState::Stopped) {
            return RenderFlow::Continue;
        }
        self.error.store(InputError::IoError);
        self.thread_state.store(THREAD_STOPPED, Ordering::Release);
        buffer.halt_flush_timer();
        log::error!("Audio input device error: {}", error);
        self.post_state(InputState::Stopped);
        RenderFlow::Halt
    }

    /// Queues a state change without blocking. Used from the render callback.
    fn post_state(&self, state: InputState) {
        let _ = self.events.try_send(InputEvent::StateChanged {
            state,
            error: self.error.load(),
        });
    }

    /// Records a control-side state change and queues its notification.
    fn set_state(&self, state: InputState, error: InputError) {
        self.error.store(error);
        self.state.store(state);
        log::debug!("Audio input state -> {:?} ({:?})", state, error);
        let event = InputEvent::StateChanged { state, error };
        if let Err(TrySendError::Full(event)) = self.events.try_send(event) {
            log::warn!("Input event queue full, dropping {:?}", event);
        }
    }
}

/// Audio input capture session.
///
/// Owns a platform device and, once opened, the capture buffer manager fed by
/// the device's render callback. Capture runs in one of two modes:
/// - pull: `start()` returns an [`InputStream`] the application reads from,
/// - push: `start_with_sink()` flushes buffered audio into a sink every period.
///
/// Failures never surface as `Result`s: control operations return `bool` or
/// `Option` and leave an [`InputError`] code behind. State changes, including
/// those caused by the render callback, are queued to [`events`](Self::events).
pub struct AudioInput<D: AudioInputDevice> {
    device: D,
    config: InputConfiguration,
    format: StreamFormat,
    device_format: Option<StreamFormat>,
    buffer: Option<Arc<InputBuffer>>,
    shared: Arc<SessionShared>,
    events: Receiver<InputEvent>,
    clock: HostClock,
    start_time: Duration,
    notify_timer: Option<PeriodicTimer>,
    notify_interval_ms: u64,
    buffer_size: usize,
    period_size: usize,
    volume: f64,
    usable: bool,
    is_open: bool,
}

impl<D: AudioInputDevice> AudioInput<D> {
    /// Creates a stopped session for `device`, capturing in `format`.
    ///
    /// An output-mode device or an invalid configuration leaves the session
    /// with `OpenError`, and every later `open()` fails.
    pub fn new(device: D, format: StreamFormat, config: InputConfiguration) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(config.event_capacity.max(1));
        let shared = Arc::new(SessionShared {
            state: Arc::new(AtomicInputState::new(InputState::Stopped)),
            error: AtomicInputError::new(InputError::NoError),
            thread_state: AtomicU8::new(THREAD_STOPPED),
            total_frames: AtomicU64::new(0),
            halt_ack: Mutex::new(false),
            halt_cv: Condvar::new(),
            events: tx,
        });

        let mut usable = true;
        if !device.descriptor().is_input() {
            log::warn!("Device {} is not an input device", device.descriptor().id);
            usable = false;
        }
        if let Err(e) = config.validate() {
            log::warn!("Invalid input configuration: {}", e);
            usable = false;
        }
        if !usable {
            shared.error.store(InputError::OpenError);
        }

        Self {
            clock: device.host_clock(),
            device,
            format,
            device_format: None,
            buffer: None,
            shared,
            events: rx,
            start_time: Duration::ZERO,
            notify_timer: None,
            notify_interval_ms: config.notify_interval_ms,
            buffer_size: config.buffer_size,
            period_size: 0,
            volume: config.volume,
            usable,
            is_open: false,
            config,
        }
    }

    /// Negotiates the hardware format and period, allocates the buffer
    /// manager and registers the render callback. Idempotent once open.
    pub fn open(&mut self) -> bool {
        if self.is_open {
            return true;
        }
        if !self.usable {
            self.shared.error.store(InputError::OpenError);
            return false;
        }
        match self.try_open() {
            Ok(()) => {
                self.is_open = true;
                true
            }
            Err(e) => {
                log::warn!("Failed to open audio input {}: {}", self.device.descriptor().id, e);
                self.shared.error.store(InputError::OpenError);
                false
            }
        }
    }

    fn try_open(&mut self) -> Result<(), CaptureError> {
        let device_format = if self.format == self.device.descriptor().preferred_format {
            self.format
        } else {
            self.device.native_format()?
        };
        if !device_format.is_valid() {
            return Err(CaptureError::UnsupportedFormat(format!("device format {}", device_format)));
        }

        let bytes_per_frame = self.format.bytes_per_frame();
        if bytes_per_frame == 0 || self.format.sample_rate == 0 {
            return Err(CaptureError::UnsupportedFormat(format!("requested format {}", self.format)));
        }

        let range = self.device.period_frame_range()?;
        let frames = (self.buffer_size / bytes_per_frame).max(*range.start()).min(*range.end());
        if frames == 0 {
            return Err(CaptureError::ConfigurationFailed("empty period size range".into()));
        }

        let period_size = frames * bytes_per_frame;
        let buffer = Arc::new(InputBuffer::new(
            period_size * self.config.ring_periods,
            period_size,
            device_format,
            self.format,
            self.shared.events.clone(),
        ));
        buffer.set_volume(self.volume);

        let callback = render_callback(Arc::clone(&self.shared), Arc::clone(&buffer));
        self.device.configure(&device_format, frames, callback)?;

        log::info!(
            "Opened audio input {}: device {} -> stream {}, period {} frames",
            self.device.descriptor().id,
            device_format,
            self.format,
            frames
        );
        self.period_size = period_size;
        self.buffer_size = period_size;
        self.device_format = Some(device_format);
        self.buffer = Some(buffer);
        Ok(())
    }

    /// Stops capture and releases the device and the buffer manager.
    pub fn close(&mut self) {
        self.stop();
        self.stop_timers();
        if self.is_open {
            self.device.close();
            self.buffer = None;
            self.device_format = None;
            self.is_open = false;
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Changes the requested format. Ignored unless Stopped.
    ///
    /// An open session is closed so the next start renegotiates.
    pub fn set_format(&mut self, format: StreamFormat) {
        if self.state() != InputState::Stopped || format == self.format {
            return;
        }
        self.format = format;
        if self.is_open {
            self.close();
        }
    }

    /// The format the hardware was configured with, once open.
    pub fn device_format(&self) -> Option<StreamFormat> {
        self.device_format
    }

    /// Starts capture in pull mode.
    ///
    /// Returns the stream to read captured bytes from, or `None` with
    /// `OpenError` set when the format is unsupported or open fails.
    pub fn start(&mut self) -> Option<InputStream> {
        if !self.start_capture(None) {
            return None;
        }
        self.buffer
            .as_ref()
            .map(|b| InputStream::new(Arc::clone(b), Arc::clone(&self.shared.state)))
    }

    /// Starts capture in push mode, flushing into `sink` every period.
    pub fn start_with_sink(&mut self, sink: Box<dyn ByteSink>) -> bool {
        self.start_capture(Some(sink))
    }

    fn start_capture(&mut self, sink: Option<Box<dyn ByteSink>>) -> bool {
        if !self.device.is_format_supported(&self.format) || !self.open() {
            self.shared.state.store(InputState::Stopped);
            self.shared.error.store(InputError::OpenError);
            return false;
        }

        self.reset();
        let Some(buffer) = self.buffer.clone() else {
            return false;
        };
        buffer.reset();
        buffer.set_flush_device(sink);

        self.start_time = (self.clock)();
        self.shared.total_frames.store(0, Ordering::Relaxed);
        self.shared.set_state(InputState::Idle, InputError::NoError);

        if let Err(e) = self.thread_start() {
            log::error!("Failed to start audio input device: {}", e);
            self.stop_timers();
            self.shared.set_state(InputState::Stopped, InputError::OpenError);
            return false;
        }
        true
    }

    /// Halts capture, flushes everything buffered to the sink and clears the error.
    pub fn stop(&mut self) {
        if self.state() == InputState::Stopped {
            return;
        }
        self.thread_stop();
        if let Some(buffer) = &self.buffer {
            buffer.flush(true);
            buffer.finish_flush_device();
        }
        self.shared.set_state(InputState::Stopped, InputError::NoError);
    }

    /// Halts capture and discards buffered data instead of flushing it.
    pub fn reset(&mut self) {
        if self.state() == InputState::Stopped {
            return;
        }
        self.thread_stop();
        if let Some(buffer) = &self.buffer {
            buffer.reset();
        }
        self.shared.set_state(InputState::Stopped, InputError::NoError);
    }

    /// Pauses an Idle or Active session. No-op otherwise.
    pub fn suspend(&mut self) {
        if !self.state().is_running() {
            return;
        }
        self.thread_stop();
        self.shared.set_state(InputState::Suspended, InputError::NoError);
    }

    /// Restarts a Suspended session. No-op otherwise.
    pub fn resume(&mut self) {
        if self.state() != InputState::Suspended {
            return;
        }
        self.shared.set_state(InputState::Active, InputError::NoError);
        if let Err(e) = self.thread_start() {
            log::error!("Failed to resume audio input device: {}", e);
            self.stop_timers();
            self.shared.set_state(InputState::Stopped, InputError::IoError);
        }
    }

    /// Bytes buffered and not yet read.
    pub fn bytes_ready(&self) -> usize {
        self.buffer.as_ref().map_or(0, |b| b.used())
    }

    /// Bytes in one hardware period; 0 until opened.
    pub fn period_size(&self) -> usize {
        self.period_size
    }

    /// Requests a period size in bytes, applied at the next open.
    pub fn set_buffer_size(&mut self, size: usize) {
        self.buffer_size = size;
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Sets the `Notify` interval. Negative values clamp to 0, which disables it.
    pub fn set_notify_interval(&mut self, milliseconds: i64) {
        let milliseconds = milliseconds.max(0) as u64;
        if milliseconds == self.notify_interval_ms {
            return;
        }
        self.notify_interval_ms = milliseconds;
        if self.notify_timer.is_some() {
            self.stop_notify_timer();
            self.start_notify_timer();
        }
    }

    pub fn notify_interval(&self) -> u64 {
        self.notify_interval_ms
    }

    /// Audio captured since start, in microseconds of the requested format.
    pub fn processed_usecs(&self) -> u64 {
        processed_usecs(&self.shared, self.format.sample_rate)
    }

    /// Host time since start in microseconds; 0 while Stopped.
    pub fn elapsed_usecs(&self) -> u64 {
        if self.state() == InputState::Stopped {
            return 0;
        }
        ((self.clock)().saturating_sub(self.start_time)).as_micros() as u64
    }

    pub fn error(&self) -> InputError {
        self.shared.error.load()
    }

    pub fn state(&self) -> InputState {
        self.shared.state.load()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Sets the linear gain. Kept across opens; no clamping is applied.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
        if let Some(buffer) = &self.buffer {
            buffer.set_volume(volume);
        }
    }

    /// Receiver for this session's notifications.
    ///
    /// Every clone drains the same queue; each event reaches one receiver.
    pub fn events(&self) -> Receiver<InputEvent> {
        self.events.clone()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    fn thread_start(&mut self) -> Result<(), CaptureError> {
        self.start_timers();
        self.shared.thread_state.store(THREAD_RUNNING, Ordering::Release);
        self.device.start()
    }

    fn thread_stop(&mut self) {
        self.stop_timers();
        self.halt_device();
    }

    /// Asks the render callback to halt and waits for its acknowledgment,
    /// bounded by the configured halt timeout, then stops the device.
    fn halt_device(&mut self) {
        let shared = Arc::clone(&self.shared);
        *shared.halt_ack.lock() = false;

        if shared
            .thread_state
            .compare_exchange(THREAD_RUNNING, THREAD_STOP_REQUESTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.device.request_callback();

            let timeout = self.config.halt_timeout();
            let deadline = Instant::now() + timeout;
            let mut acked = shared.halt_ack.lock();
            while !*acked {
                if shared.halt_cv.wait_until(&mut acked, deadline).timed_out() {
                    log::warn!("Render callback did not acknowledge halt within {:?}; stopping device", timeout);
                    break;
                }
            }
            drop(acked);
            shared.thread_state.store(THREAD_STOPPED, Ordering::Release);
        }

        if let Err(e) = self.device.stop() {
            log::warn!("Failed to stop audio input device: {}", e);
        }
    }

    fn start_timers(&mut self) {
        if let Some(buffer) = &self.buffer {
            if let Err(e) = buffer.start_flush_timer() {
                log::warn!("Failed to start flush timer: {}", e);
            }
        }
        self.start_notify_timer();
    }

    fn stop_timers(&mut self) {
        if let Some(buffer) = &self.buffer {
            buffer.stop_flush_timer();
        }
        self.stop_notify_timer();
    }

    fn start_notify_timer(&mut self) {
        self.stop_notify_timer();
        if self.notify_interval_ms == 0 {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.clock);
        let start_time = self.start_time;
        let sample_rate = self.format.sample_rate;
        let interval = Duration::from_millis(self.notify_interval_ms);

        let timer = PeriodicTimer::start("input-notify", interval, move || {
            if shared.state.load() == InputState::Stopped {
                return ControlFlow::Break(());
            }
            let event = InputEvent::Notify {
                processed_usecs: processed_usecs(&shared, sample_rate),
                elapsed_usecs: clock().saturating_sub(start_time).as_micros() as u64,
            };
            post_low_priority(&shared.events, event);
            ControlFlow::Continue(())
        });
        match timer {
            Ok(timer) => self.notify_timer = Some(timer),
            Err(e) => log::warn!("Failed to start notify timer: {}", e),
        }
    }

    fn stop_notify_timer(&mut self) {
        if let Some(mut timer) = self.notify_timer.take() {
            timer.stop();
        }
    }
}

impl<D: AudioInputDevice> Drop for AudioInput<D> {
    fn drop(&mut self) {
        self.close();
    }
}

fn render_callback(shared: Arc<SessionShared>, buffer: Arc<InputBuffer>) -> RenderCallback {
    Arc::new(move |source: &mut dyn RenderSource, frames: usize| shared.on_render(&buffer, source, frames))
}

fn processed_usecs(shared: &SessionShared, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    let frames = shared.total_frames.load(Ordering::Relaxed) as u128;
    (frames * 1_000_000 / sample_rate as u128) as u64
}
