//! Per-sample PCM codecs and in-place gain.
//!
//! Decoding normalizes every encoding to `f32` in `[-1.0, 1.0)`; encoding
//! clamps back into the integer range. Floats are never clamped.

use crate::models::format::SampleFormat;

/// Decodes the first sample of `bytes` to a normalized float.
#[inline]
pub fn decode_sample(format: SampleFormat, bytes: &[u8]) -> f32 {
    match format {
        SampleFormat::U8 => (bytes[0] as f32 - 128.0) / 128.0,
        SampleFormat::I8 => bytes[0] as i8 as f32 / 128.0,
        SampleFormat::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0,
        SampleFormat::I32 => {
            i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32 / 2_147_483_648.0
        }
        SampleFormat::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    }
}

/// Encodes a normalized float into the first sample of `out`.
#[inline]
pub fn encode_sample(format: SampleFormat, value: f32, out: &mut [u8]) {
    match format {
        SampleFormat::U8 => {
            out[0] = (value * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8;
        }
        SampleFormat::I8 => {
            out[0] = (value * 128.0).round().clamp(-128.0, 127.0) as i8 as u8;
        }
        SampleFormat::I16 => {
            let v = (value * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
            out[..2].copy_from_slice(&v.to_le_bytes());
        }
        SampleFormat::I32 => {
            let v = (value as f64 * 2_147_483_648.0)
                .round()
                .clamp(-2_147_483_648.0, 2_147_483_647.0) as i32;
            out[..4].copy_from_slice(&v.to_le_bytes());
        }
        SampleFormat::F32 => out[..4].copy_from_slice(&value.to_le_bytes()),
    }
}

/// Multiplies every sample in `data` by `gain`, in place.
///
/// A gain of exactly 1.0 returns without touching the data. Integer
/// encodings saturate; `U8` scales around its 128 midpoint so 0.0 yields
/// silence for every encoding. A trailing partial sample is left as is.
pub fn scale_samples(format: SampleFormat, gain: f64, data: &mut [u8]) {
    if gain == 1.0 {
        return;
    }
    if gain == 0.0 {
        let whole = data.len() - data.len() % format.bytes_per_sample();
        let silence = if format == SampleFormat::U8 { 128 } else { 0 };
        data[..whole].fill(silence);
        return;
    }
    match format {
        SampleFormat::U8 => {
            for b in data.iter_mut() {
                let centered = *b as f64 - 128.0;
                *b = (centered * gain + 128.0).round().clamp(0.0, 255.0) as u8;
            }
        }
        SampleFormat::I8 => {
            for b in data.iter_mut() {
                *b = ((*b as i8) as f64 * gain).round().clamp(-128.0, 127.0) as i8 as u8;
            }
        }
        SampleFormat::I16 => {
            for chunk in data.chunks_exact_mut(2) {
                let s = i16::from_le_bytes([chunk[0], chunk[1]]) as f64;
                let v = (s * gain).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
                chunk.copy_from_slice(&v.to_le_bytes());
            }
        }
        SampleFormat::I32 => {
            for chunk in data.chunks_exact_mut(4) {
                let s = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64;
                let v = (s * gain).round().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
                chunk.copy_from_slice(&v.to_le_bytes());
            }
        }
        SampleFormat::F32 => {
            let gain = gain as f32;
            for chunk in data.chunks_exact_mut(4) {
                let s = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                chunk.copy_from_slice(&(s * gain).to_le_bytes());
            }
        }
    }
}
