use crate::models::format::StreamFormat;

/// Memory behind one buffer of a [`FrameBatch`].
enum BatchMemory<'a> {
    /// Scratch allocated once and reused every render cycle.
    Owned(Vec<u8>),
    /// Caller-supplied memory.
    Borrowed(&'a mut [u8]),
}

impl BatchMemory<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(v) => v,
            Self::Borrowed(s) => s,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Self::Owned(v) => v,
            Self::Borrowed(s) => s,
        }
    }
}

struct BatchBuffer<'a> {
    memory: BatchMemory<'a>,
    /// Valid bytes at the start of `memory`.
    byte_size: usize,
}

/// View over the channel buffers of one hardware period.
///
/// Interleaved formats carry a single buffer; planar formats carry one buffer
/// per channel. The buffer count and channel mapping never change after
/// construction. A platform hook fills the batch through
/// [`RenderSource::render`](crate::traits::input_device::RenderSource::render).
pub struct FrameBatch<'a> {
    format: StreamFormat,
    buffers: Vec<BatchBuffer<'a>>,
}

impl FrameBatch<'static> {
    /// Allocates scratch for up to `frames` frames per buffer.
    pub fn with_capacity(format: StreamFormat, frames: usize) -> Self {
        let bytes = frames * format.bytes_per_packet();
        let buffers = (0..format.buffer_count())
            .map(|_| BatchBuffer {
                memory: BatchMemory::Owned(vec![0u8; bytes]),
                byte_size: 0,
            })
            .collect();
        Self { format, buffers }
    }
}

impl<'a> FrameBatch<'a> {
    /// Wraps caller memory, one slice per buffer. Each slice is fully valid.
    ///
    /// # Panics
    /// Panics if the slice count does not match the format's buffer count.
    pub fn borrowed(format: StreamFormat, slices: Vec<&'a mut [u8]>) -> Self {
        assert_eq!(
            slices.len(),
            format.buffer_count(),
            "buffer count does not match stream format"
        );
        let buffers = slices
            .into_iter()
            .map(|s| BatchBuffer {
                byte_size: s.len(),
                memory: BatchMemory::Borrowed(s),
            })
            .collect();
        Self { format, buffers }
    }

    /// Prepares the batch for a new cycle of `frames` frames.
    ///
    /// The valid size of every buffer becomes `frames` packets, clamped to the
    /// memory available. Returns the frame count actually prepared.
    pub fn reset(&mut self, frames: usize) -> usize {
        let packet = self.format.bytes_per_packet();
        let mut prepared = frames;
        for buffer in &mut self.buffers {
            let room = buffer.memory.as_slice().len();
            buffer.byte_size = (frames * packet).min(room - room % packet.max(1));
            prepared = prepared.min(buffer.byte_size / packet.max(1));
        }
        prepared
    }

    pub fn format(&self) -> &StreamFormat {
        &self.format
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Valid bytes of buffer `index`.
    pub fn data(&self, index: usize) -> &[u8] {
        let buffer = &self.buffers[index];
        &buffer.memory.as_slice()[..buffer.byte_size]
    }

    pub fn data_mut(&mut self, index: usize) -> &mut [u8] {
        let buffer = &mut self.buffers[index];
        let size = buffer.byte_size;
        &mut buffer.memory.as_mut_slice()[..size]
    }

    pub fn byte_size(&self, index: usize) -> usize {
        self.buffers[index].byte_size
    }

    /// Shrinks the valid size of buffer `index`, e.g. after a short render.
    pub fn set_byte_size(&mut self, index: usize, size: usize) {
        let buffer = &mut self.buffers[index];
        buffer.byte_size = size.min(buffer.memory.as_slice().len());
    }

    /// Bytes per packet within one buffer.
    pub fn packet_size(&self) -> usize {
        self.format.bytes_per_packet()
    }

    pub fn packet_count(&self) -> usize {
        match self.packet_size() {
            0 => 0,
            size => self.byte_size(0) / size,
        }
    }

    /// For PCM one packet per buffer is one frame.
    pub fn frame_count(&self) -> usize {
        self.packet_count()
    }

    /// Total valid bytes across all buffers.
    pub fn total_bytes(&self) -> usize {
        self.buffers.iter().map(|b| b.byte_size).sum()
    }
}
