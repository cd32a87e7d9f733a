//! Sample-clock driven input device.
//!
//! Delivers one render callback per hardware period on a dedicated thread,
//! paced by the wall clock the way a sound card's interrupt would be.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use audio_input_core::models::device::{DeviceDescriptor, TransportType};
use audio_input_core::models::error::CaptureError;
use audio_input_core::models::format::StreamFormat;
use audio_input_core::traits::input_device::{
    AudioInputDevice, HostClock, RenderCallback, RenderFlow, RenderSource,
};

use crate::signal::SignalSource;

/// Simulated sound card capturing from a [`RenderSource`].
///
/// `start` spawns the render thread; the thread exits when `stop` is called
/// or when the callback returns [`RenderFlow::Halt`].
pub struct ClockedDevice {
    descriptor: DeviceDescriptor,
    source: Arc<Mutex<Box<dyn RenderSource>>>,
    callback: Option<RenderCallback>,
    format: Option<StreamFormat>,
    period_frames: usize,
    epoch: Instant,
    running: Arc<AtomicBool>,
    render_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ClockedDevice {
    /// Creates a virtual input device with native `format`, producing silence.
    pub fn new(format: StreamFormat) -> Self {
        let mut descriptor = DeviceDescriptor::input("clocked-input", "Simulated Input", format);
        descriptor.transport_type = Some(TransportType::Virtual);
        Self {
            descriptor,
            source: Arc::new(Mutex::new(Box::new(SignalSource::silence()))),
            callback: None,
            format: None,
            period_frames: 0,
            epoch: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            render_handle: Mutex::new(None),
        }
    }

    pub fn with_source(self, source: impl RenderSource + 'static) -> Self {
        *self.source.lock() = Box::new(source);
        self
    }

    pub fn with_period_frames(mut self, range: RangeInclusive<usize>) -> Self {
        self.descriptor.period_frames = range;
        self
    }

    /// Whether the render thread is delivering callbacks.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn join_render_thread(&self) {
        if let Some(handle) = self.render_handle.lock().take() {
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
        }
    }
}

impl AudioInputDevice for ClockedDevice {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn is_format_supported(&self, format: &StreamFormat) -> bool {
        format.is_valid()
    }

    fn native_format(&self) -> Result<StreamFormat, CaptureError> {
        Ok(self.descriptor.preferred_format)
    }

    fn configure(
        &mut self,
        format: &StreamFormat,
        period_frames: usize,
        callback: RenderCallback,
    ) -> Result<(), CaptureError> {
        if self.is_running() {
            return Err(CaptureError::ConfigurationFailed("device is running".into()));
        }
        if !self.descriptor.period_frames.contains(&period_frames) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "period of {} frames outside {:?}",
                period_frames, self.descriptor.period_frames
            )));
        }
        self.format = Some(*format);
        self.period_frames = period_frames;
        self.callback = Some(callback);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        let (Some(callback), Some(format)) = (self.callback.clone(), self.format) else {
            return Err(CaptureError::ConfigurationFailed("device not configured".into()));
        };
        // A previous run may have ended on its own after a halt.
        self.join_render_thread();

        let frames = self.period_frames;
        let period = format.duration_of_frames(frames as u64).max(Duration::from_micros(100));
        let source = Arc::clone(&self.source);

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("clocked-input-render".into())
            .spawn(move || {
                render_loop(&running, &source, &callback, frames, period);
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::Unknown(format!("failed to spawn render thread: {}", e))
            })?;

        *self.render_handle.lock() = Some(handle);
        log::debug!("Clocked device started: {} frames every {:?}", frames, period);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        self.join_render_thread();
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.stop();
        self.callback = None;
        self.format = None;
    }

    fn host_clock(&self) -> HostClock {
        let epoch = self.epoch;
        Arc::new(move || epoch.elapsed())
    }
}

impl Drop for ClockedDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// Calls `callback` once per period until stopped or halted.
fn render_loop(
    running: &AtomicBool,
    source: &Mutex<Box<dyn RenderSource>>,
    callback: &RenderCallback,
    frames: usize,
    period: Duration,
) {
    let mut next = Instant::now() + period;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        next += period;

        let mut source = source.lock();
        if callback(source.as_mut(), frames) == RenderFlow::Halt {
            break;
        }
    }
}
