use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use crate::models::device::DeviceDescriptor;
use crate::models::error::CaptureError;
use crate::models::format::StreamFormat;
use crate::processing::frame_batch::FrameBatch;

/// What the device should do after a render callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFlow {
    Continue,
    /// Stop delivering callbacks until the device is started again.
    Halt,
}

/// Producer of hardware frames for one render cycle.
///
/// Stands in for the platform's "render into this buffer list" call.
pub trait RenderSource: Send {
    /// Fills `batch` with up to `frames` frames and returns the count rendered.
    fn render(&mut self, batch: &mut FrameBatch<'_>, frames: usize) -> Result<usize, CaptureError>;
}

/// Callback invoked once per hardware period.
///
/// Parameters:
/// - `source`: Renders this period's frames into a batch on request.
/// - `frames`: Number of frames the hardware has ready.
///
/// The callback fires on the device's realtime thread; it must not block.
pub type RenderCallback = Arc<dyn Fn(&mut dyn RenderSource, usize) -> RenderFlow + Send + Sync + 'static>;

/// Monotonic host clock of a device, readable from any thread.
pub type HostClock = Arc<dyn Fn() -> Duration + Send + Sync + 'static>;

/// Platform hook for an audio input unit.
///
/// Implemented by:
/// - `ClockedDevice` (sample-clock driven thread)
/// - `ManualDevice` (driven explicitly, for deterministic tests)
pub trait AudioInputDevice: Send {
    /// Static information about the device.
    fn descriptor(&self) -> &DeviceDescriptor;

    fn is_format_supported(&self, format: &StreamFormat) -> bool;

    /// The format the device produces natively.
    fn native_format(&self) -> Result<StreamFormat, CaptureError>;

    /// Supported hardware period sizes in frames.
    fn period_frame_range(&self) -> Result<RangeInclusive<usize>, CaptureError> {
        Ok(self.descriptor().period_frames.clone())
    }

    /// Applies the negotiated format and period size and registers `callback`.
    fn configure(
        &mut self,
        format: &StreamFormat,
        period_frames: usize,
        callback: RenderCallback,
    ) -> Result<(), CaptureError>;

    /// Starts delivering callbacks.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stops delivering callbacks. Stopping a stopped device is a no-op.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Stops the device and unregisters the callback.
    fn close(&mut self);

    /// The device's host clock, used for elapsed-time reporting.
    fn host_clock(&self) -> HostClock;

    /// Prompts the device to run one more callback soon.
    ///
    /// Called while a halt is pending so the callback can acknowledge it.
    /// Devices whose callbacks already run on their own cadence ignore this.
    fn request_callback(&mut self) {}
}
