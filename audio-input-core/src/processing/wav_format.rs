//! RIFF/WAV header generation for recorded streams.

use crate::models::error::CaptureError;
use crate::models::format::{SampleFormat, StreamFormat};

/// Size of the canonical WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

/// Checks that `format` can be stored as canonical WAV.
///
/// WAV stores interleaved frames; 8-bit samples must be unsigned.
pub fn check_format(format: &StreamFormat) -> Result<(), CaptureError> {
    if !format.is_valid() {
        return Err(CaptureError::UnsupportedFormat(format!("invalid format {}", format)));
    }
    if !format.is_interleaved() {
        return Err(CaptureError::UnsupportedFormat("WAV requires interleaved frames".into()));
    }
    if format.sample_format == SampleFormat::I8 {
        return Err(CaptureError::UnsupportedFormat("WAV has no signed 8-bit encoding".into()));
    }
    Ok(())
}

/// Generates the 44-byte header for `format`.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16
/// [20-21]  format code (1 = PCM, 3 = IEEE float)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate
/// [32-33]  block_align
/// [34-35]  bits per sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &StreamFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = format.bytes_per_frame() as u16;
    let byte_rate = format.sample_rate * block_align as u32;
    let format_code = if format.sample_format.is_float() {
        FORMAT_IEEE_FLOAT
    } else {
        FORMAT_PCM
    };

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&36u32.saturating_add(data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&format_code.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample().to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// Patches the RIFF chunk size (offset 4) and data size (offset 40).
///
/// Sizes past 4 GiB saturate; such files are not valid canonical WAV.
pub fn patch_sizes(header: &mut [u8], data_size: u64) {
    let data_size = u32::try_from(data_size).unwrap_or(u32::MAX);
    header[4..8].copy_from_slice(&36u32.saturating_add(data_size).to_le_bytes());
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
}
