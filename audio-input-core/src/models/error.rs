use thiserror::Error;

/// Errors raised by collaborators and the realtime data path.
///
/// These never escape the session's control API directly: `AudioInput`
/// folds them into an `InputError` code and a state transition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available")]
    DeviceNotAvailable,

    #[error("unsupported stream format: {0}")]
    UnsupportedFormat(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("hardware render failed: {0}")]
    RenderFailed(String),

    #[error("format conversion failed: {0}")]
    ConversionFailed(String),

    #[error("overlapping render callbacks")]
    RenderBusy,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Errors returned by a [`ByteSink`](crate::traits::byte_sink::ByteSink) write.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("sink closed")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_error_display() {
        let err = CaptureError::ConfigurationFailed("period range".into());
        assert_eq!(err.to_string(), "configuration failed: period range");
        assert_eq!(CaptureError::RenderBusy.to_string(), "overlapping render callbacks");
    }

    #[test]
    fn sink_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: SinkError = io.into();
        assert!(err.to_string().contains("pipe closed"));
    }
}
