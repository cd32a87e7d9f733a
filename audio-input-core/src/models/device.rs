use std::ops::RangeInclusive;

use super::format::StreamFormat;

/// Direction a device was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceMode {
    Input,
    Output,
}

/// Transport type for an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    BuiltIn,
    Bluetooth,
    Usb,
    Virtual,
    Unknown,
}

/// Static description of an audio device, as handed over by device enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: String,
    pub mode: DeviceMode,
    pub transport_type: Option<TransportType>,
    /// The format the device produces without conversion.
    pub preferred_format: StreamFormat,
    /// Supported hardware period sizes, in frames.
    pub period_frames: RangeInclusive<usize>,
}

impl DeviceDescriptor {
    pub fn input(id: impl Into<String>, name: impl Into<String>, preferred_format: StreamFormat) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mode: DeviceMode::Input,
            transport_type: None,
            preferred_format,
            period_frames: 64..=8192,
        }
    }

    pub fn is_input(&self) -> bool {
        self.mode == DeviceMode::Input
    }
}
