use super::frame_batch::FrameBatch;
use crate::traits::format_converter::PacketSource;

/// Zero-copy slice of consecutive packets handed to a converter.
#[derive(Clone, Copy)]
pub struct PacketWindow<'a> {
    batch: &'a FrameBatch<'a>,
    first_packet: usize,
    packets: usize,
}

impl<'a> PacketWindow<'a> {
    pub fn packets(&self) -> usize {
        self.packets
    }

    pub fn buffer_count(&self) -> usize {
        self.batch.buffer_count()
    }

    /// The window's bytes within buffer `index`.
    pub fn buffer(&self, index: usize) -> &'a [u8] {
        let size = self.batch.packet_size();
        let start = self.first_packet * size;
        &self.batch.data(index)[start..start + self.packets * size]
    }

    pub fn byte_size(&self) -> usize {
        self.packets * self.batch.packet_size()
    }
}

/// Sequential cursor over a frame batch, handing out bounded packet windows.
///
/// The cursor only moves forward; a new feeder is built for every render cycle.
pub struct PacketFeeder<'a> {
    batch: &'a FrameBatch<'a>,
    total_packets: usize,
    position: usize,
}

impl<'a> PacketFeeder<'a> {
    pub fn new(batch: &'a FrameBatch<'a>) -> Self {
        Self {
            batch,
            total_packets: batch.packet_count(),
            position: 0,
        }
    }

    /// Hands out up to `max_packets` packets, or `None` once exhausted.
    ///
    /// Exhaustion is not an error: the converter treats it as end of input
    /// for this cycle. Calls after exhaustion keep returning `None`.
    pub fn feed(&mut self, max_packets: usize) -> Option<PacketWindow<'a>> {
        if self.position == self.total_packets {
            return None;
        }
        let packets = max_packets.min(self.total_packets - self.position);
        let window = PacketWindow {
            batch: self.batch,
            first_packet: self.position,
            packets,
        };
        self.position += packets;
        Some(window)
    }

    pub fn is_empty(&self) -> bool {
        self.position == self.total_packets
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total_packets(&self) -> usize {
        self.total_packets
    }
}

impl<'a> PacketSource<'a> for PacketFeeder<'a> {
    fn feed(&mut self, max_packets: usize) -> Option<PacketWindow<'a>> {
        PacketFeeder::feed(self, max_packets)
    }
}
