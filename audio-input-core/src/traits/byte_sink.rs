use std::io::{ErrorKind, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::SinkError;

/// Destination for push-mode capture.
///
/// `write` may accept fewer bytes than offered; the caller retries the rest
/// on the next flush. An error is final for the current capture.
pub trait ByteSink: Send {
    fn write(&mut self, data: &[u8]) -> Result<usize, SinkError>;

    /// Called once capture stops and all buffered bytes have been flushed.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A shared sink stays reachable by the caller after it is handed to a
/// session, e.g. to finalize a recording once capture stops.
impl<S: ByteSink> ByteSink for Arc<Mutex<S>> {
    fn write(&mut self, data: &[u8]) -> Result<usize, SinkError> {
        self.lock().write(data)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.lock().finish()
    }
}

/// Adapts any [`std::io::Write`] into a [`ByteSink`].
pub struct WriteSink<W: Write + Send> {
    inner: W,
}

impl<W: Write + Send> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> ByteSink for WriteSink<W> {
    fn write(&mut self, data: &[u8]) -> Result<usize, SinkError> {
        loop {
            match self.inner.write(data) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.inner.flush()?;
        Ok(())
    }
}
