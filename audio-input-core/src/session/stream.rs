use std::io;
use std::sync::Arc;

use crate::models::state::{AtomicInputState, InputState};
use crate::processing::input_buffer::InputBuffer;

/// Pull-mode handle returned by [`AudioInput::start`](super::audio_input::AudioInput::start).
///
/// [`read_bytes`](Self::read_bytes) drains whole periods only and returns 0
/// when no full period is buffered yet. Through [`io::Read`] the stream is
/// non-blocking: an empty read of a live session fails with
/// [`io::ErrorKind::WouldBlock`] (wait for `InputEvent::ReadyRead` and retry),
/// and `Ok(0)` means the session has stopped and every whole period has been
/// read. A trailing partial period left at stop is not delivered. Buffers
/// shorter than a period are served from one period held by the stream.
/// The stream is sequential and cannot seek.
pub struct InputStream {
    buffer: Arc<InputBuffer>,
    state: Arc<AtomicInputState>,
    carry: Vec<u8>,
    carry_pos: usize,
}

impl InputStream {
    pub(crate) fn new(buffer: Arc<InputBuffer>, state: Arc<AtomicInputState>) -> Self {
        Self {
            buffer,
            state,
            carry: Vec::new(),
            carry_pos: 0,
        }
    }

    /// Bytes buffered and not yet read, including any held by the stream.
    pub fn bytes_ready(&self) -> usize {
        self.buffer.used() + self.carried()
    }

    pub fn period_size(&self) -> usize {
        self.buffer.period_size()
    }

    /// Copies whole buffered periods into `out`.
    ///
    /// Bytes left over from a short [`io::Read`] call come out first, on
    /// their own.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> usize {
        if self.carried() > 0 {
            return self.take_carry(out);
        }
        self.buffer.read_bytes(out)
    }

    fn carried(&self) -> usize {
        self.carry.len() - self.carry_pos
    }

    fn take_carry(&mut self, out: &mut [u8]) -> usize {
        let rest = &self.carry[self.carry_pos..];
        let n = rest.len().min(out.len());
        out[..n].copy_from_slice(&rest[..n]);
        self.carry_pos += n;
        n
    }

    /// Pulls one period into the carry for a read shorter than a period.
    fn refill_carry(&mut self) {
        self.carry.resize(self.period_size(), 0);
        let n = self.buffer.read_bytes(&mut self.carry);
        self.carry.truncate(n);
        self.carry_pos = 0;
    }
}

impl io::Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // Sampled before reading: once stopped, no render can add more.
        let stopped = self.state.load() == InputState::Stopped;
        if self.carried() == 0 && buf.len() < self.period_size() {
            self.refill_carry();
        }
        match self.read_bytes(buf) {
            0 if stopped => Ok(0),
            0 => Err(io::ErrorKind::WouldBlock.into()),
            n => Ok(n),
        }
    }
}
