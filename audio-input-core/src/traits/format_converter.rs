use crate::models::error::CaptureError;
use crate::models::format::StreamFormat;
use crate::processing::packet_feeder::PacketWindow;

/// Pull-side input of a streaming converter.
///
/// `feed` returns `None` when no more input is available this cycle; the
/// converter must treat that as end of input for now, not as a failure.
pub trait PacketSource<'a> {
    fn feed(&mut self, max_packets: usize) -> Option<PacketWindow<'a>>;
}

/// Streaming PCM format/rate converter driven by a pull protocol.
///
/// Each `fill` offers a bounded destination window; the converter pulls
/// input from `source` whenever it needs more, and stops when the window is
/// full or the source is exhausted. Converted frames that did not fit are
/// kept and emitted first on the next call.
pub trait FormatConverter: Send {
    fn input_format(&self) -> &StreamFormat;

    fn output_format(&self) -> &StreamFormat;

    /// Converts into `output`, returning the bytes written (whole output packets only).
    fn fill(&mut self, source: &mut dyn PacketSource<'_>, output: &mut [u8]) -> Result<usize, CaptureError>;

    /// Whether converted frames are waiting from an earlier call.
    fn has_pending(&self) -> bool;

    /// Drops carried state (pending frames, interpolation history).
    fn reset(&mut self);
}
