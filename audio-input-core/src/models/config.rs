use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Default size in bytes requested for one hardware period.
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

/// Configuration for an audio input session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfiguration {
    /// Bytes requested for one hardware period (default: 4096). The device
    /// clamps this to its supported period range at open.
    pub buffer_size: usize,

    /// Ring buffer capacity in periods (default: 4).
    pub ring_periods: usize,

    /// Interval between `Notify` events in milliseconds (default: 1000, 0 = disabled).
    pub notify_interval_ms: u64,

    /// Initial linear gain (default: 1.0).
    pub volume: f64,

    /// Capacity of the notification queue (default: 64).
    ///
    /// `ReadyRead` and `Notify` only use the lower half; the rest is kept for
    /// state changes.
    pub event_capacity: usize,

    /// How long a control call waits for the render callback to acknowledge a
    /// halt before stopping the device anyway (default: 2000).
    pub halt_timeout_ms: u64,
}

impl InputConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_size == 0 {
            return Err("buffer size must be positive".into());
        }
        if self.ring_periods < 2 {
            return Err(format!("ring must hold at least 2 periods, got {}", self.ring_periods));
        }
        if !self.volume.is_finite() {
            return Err(format!("volume must be finite, got {}", self.volume));
        }
        if self.event_capacity == 0 {
            return Err("event capacity must be positive".into());
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid configuration: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn notify_interval(&self) -> Duration {
        Duration::from_millis(self.notify_interval_ms)
    }

    pub fn halt_timeout(&self) -> Duration {
        Duration::from_millis(self.halt_timeout_ms)
    }
}

impl Default for InputConfiguration {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            ring_periods: 4,
            notify_interval_ms: 1000,
            volume: 1.0,
            event_capacity: 64,
            halt_timeout_ms: 2000,
        }
    }
}
