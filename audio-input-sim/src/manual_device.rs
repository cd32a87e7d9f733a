//! Input device driven explicitly by the caller.
//!
//! No thread delivers callbacks: a [`ManualTrigger`] runs one render cycle
//! per `tick`, synchronously on the calling thread, and advances the host
//! clock by the frames delivered. Useful for deterministic tests of the
//! session state machine.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use audio_input_core::models::device::{DeviceDescriptor, DeviceMode};
use audio_input_core::models::error::CaptureError;
use audio_input_core::models::format::StreamFormat;
use audio_input_core::traits::input_device::{
    AudioInputDevice, HostClock, RenderCallback, RenderFlow, RenderSource,
};

use crate::signal::SignalSource;

struct ManualState {
    source: Box<dyn RenderSource>,
    callback: Option<RenderCallback>,
    format: Option<StreamFormat>,
    period_frames: usize,
    running: bool,
    callbacks: u64,
}

struct ManualShared {
    state: Mutex<ManualState>,
    clock_usecs: AtomicU64,
    fail_start: AtomicBool,
}

impl ManualShared {
    /// Runs one render cycle if the device is running.
    fn run_cycle(&self, frames: Option<usize>) -> Option<RenderFlow> {
        let mut state = self.state.lock();
        if !state.running {
            return None;
        }
        let callback = state.callback.clone()?;
        let frames = frames.unwrap_or(state.period_frames);
        let sample_rate = state.format.map_or(0, |f| f.sample_rate);

        let flow = callback(state.source.as_mut(), frames);
        state.callbacks += 1;
        if flow == RenderFlow::Halt {
            state.running = false;
        }
        drop(state);

        if sample_rate > 0 {
            let usecs = frames as u64 * 1_000_000 / sample_rate as u64;
            self.clock_usecs.fetch_add(usecs, Ordering::SeqCst);
        }
        Some(flow)
    }
}

/// Simulated input device whose callbacks run only when triggered.
pub struct ManualDevice {
    descriptor: DeviceDescriptor,
    native_format: StreamFormat,
    supported: Option<Vec<StreamFormat>>,
    fail_configure: bool,
    shared: Arc<ManualShared>,
}

impl ManualDevice {
    /// Creates an input device producing silence natively in `format`.
    pub fn new(format: StreamFormat) -> Self {
        Self {
            descriptor: DeviceDescriptor::input("manual-input", "Manual Input", format),
            native_format: format,
            supported: None,
            fail_configure: false,
            shared: Arc::new(ManualShared {
                state: Mutex::new(ManualState {
                    source: Box::new(SignalSource::silence()),
                    callback: None,
                    format: None,
                    period_frames: 0,
                    running: false,
                    callbacks: 0,
                }),
                clock_usecs: AtomicU64::new(0),
                fail_start: AtomicBool::new(false),
            }),
        }
    }

    /// Replaces the frame producer.
    pub fn with_source(self, source: impl RenderSource + 'static) -> Self {
        self.shared.state.lock().source = Box::new(source);
        self
    }

    /// Reports a native format different from the preferred one.
    pub fn with_native_format(mut self, format: StreamFormat) -> Self {
        self.native_format = format;
        self
    }

    /// Restricts the formats reported as supported. All valid formats are by default.
    pub fn with_supported_formats(mut self, formats: Vec<StreamFormat>) -> Self {
        self.supported = Some(formats);
        self
    }

    pub fn with_period_frames(mut self, min: usize, max: usize) -> Self {
        self.descriptor.period_frames = min..=max;
        self
    }

    /// Describes the device as an output device.
    pub fn output(mut self) -> Self {
        self.descriptor.mode = DeviceMode::Output;
        self
    }

    pub fn fail_configure(mut self) -> Self {
        self.fail_configure = true;
        self
    }

    /// Handle for driving the device after it moves into a session.
    pub fn trigger(&self) -> ManualTrigger {
        ManualTrigger {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl AudioInputDevice for ManualDevice {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn is_format_supported(&self, format: &StreamFormat) -> bool {
        format.is_valid() && self.supported.as_ref().is_none_or(|list| list.contains(format))
    }

    fn native_format(&self) -> Result<StreamFormat, CaptureError> {
        Ok(self.native_format)
    }

    fn configure(
        &mut self,
        format: &StreamFormat,
        period_frames: usize,
        callback: RenderCallback,
    ) -> Result<(), CaptureError> {
        if self.fail_configure {
            return Err(CaptureError::ConfigurationFailed("simulated configure failure".into()));
        }
        let mut state = self.shared.state.lock();
        state.format = Some(*format);
        state.period_frames = period_frames;
        state.callback = Some(callback);
        log::debug!("Manual device configured: {} x {} frames", format, period_frames);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.shared.fail_start.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceNotAvailable);
        }
        let mut state = self.shared.state.lock();
        if state.callback.is_none() {
            return Err(CaptureError::ConfigurationFailed("device not configured".into()));
        }
        state.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.shared.state.lock().running = false;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.shared.state.lock();
        state.running = false;
        state.callback = None;
        state.format = None;
    }

    fn host_clock(&self) -> HostClock {
        let shared = Arc::clone(&self.shared);
        Arc::new(move || Duration::from_micros(shared.clock_usecs.load(Ordering::SeqCst)))
    }

    fn request_callback(&mut self) {
        self.shared.run_cycle(None);
    }
}

/// Drives a [`ManualDevice`] from the test side.
#[derive(Clone)]
pub struct ManualTrigger {
    shared: Arc<ManualShared>,
}

impl ManualTrigger {
    /// Runs one render cycle of `frames` frames.
    ///
    /// Returns `None` when the device is not running.
    pub fn tick(&self, frames: usize) -> Option<RenderFlow> {
        self.shared.run_cycle(Some(frames))
    }

    /// Runs one render cycle of the configured period.
    pub fn tick_period(&self) -> Option<RenderFlow> {
        self.shared.run_cycle(None)
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Render cycles run since creation, including halt acknowledgments.
    pub fn callback_count(&self) -> u64 {
        self.shared.state.lock().callbacks
    }

    pub fn period_frames(&self) -> usize {
        self.shared.state.lock().period_frames
    }

    /// The format the device was configured with, while configured.
    pub fn configured_format(&self) -> Option<StreamFormat> {
        self.shared.state.lock().format
    }

    pub fn advance_clock(&self, by: Duration) {
        self.shared.clock_usecs.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    /// Makes subsequent `start` calls fail.
    pub fn set_fail_start(&self, fail: bool) {
        self.shared.fail_start.store(fail, Ordering::SeqCst);
    }
}
