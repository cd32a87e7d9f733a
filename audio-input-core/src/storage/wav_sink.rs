use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::metadata::write_metadata;
use crate::models::error::{CaptureError, SinkError};
use crate::models::format::StreamFormat;
use crate::models::recording_result::{RecordingMetadata, RecordingSummary};
use crate::processing::wav_format;
use crate::traits::byte_sink::ByteSink;

/// Push-mode sink recording captured bytes to a WAV file.
///
/// ## File Format
/// ```text
/// [44-byte WAV header, sizes patched on finalize]
/// [interleaved PCM frames in the session's stream format]
/// ```
///
/// `finalize` patches the header, computes a SHA-256 of the finished file and
/// writes a `.metadata.json` sidecar. Hand the sink to a session wrapped in
/// `Arc<Mutex<_>>` to keep access for finalizing after capture stops.
pub struct WavFileSink {
    file_path: PathBuf,
    format: StreamFormat,
    file: Option<BufWriter<File>>,
    data_bytes: u64,
}

impl WavFileSink {
    /// Creates the file (and missing parent directories) and writes a placeholder header.
    pub fn create(file_path: impl Into<PathBuf>, format: StreamFormat) -> Result<Self, CaptureError> {
        wav_format::check_format(&format)?;
        let file_path = file_path.into();

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
        }
        let file =
            File::create(&file_path).map_err(|e| CaptureError::StorageError(format!("failed to create file: {}", e)))?;

        let mut file = BufWriter::new(file);
        file.write_all(&wav_format::generate_wav_header(&format, 0))
            .map_err(|e| CaptureError::StorageError(format!("failed to write header: {}", e)))?;

        Ok(Self {
            file_path,
            format,
            file: Some(file),
            data_bytes: 0,
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn format(&self) -> &StreamFormat {
        &self.format
    }

    /// Audio bytes written so far, excluding the header.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn is_finalized(&self) -> bool {
        self.file.is_none()
    }

    /// Completes the file and returns its summary. Further writes fail with `Closed`.
    pub fn finalize(&mut self) -> Result<RecordingSummary, CaptureError> {
        let mut writer = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("recording already finalized".into()))?;
        writer.flush().map_err(|e| CaptureError::StorageError(e.to_string()))?;
        let mut file = writer.into_inner().map_err(|e| CaptureError::StorageError(e.to_string()))?;

        let mut header = wav_format::generate_wav_header(&self.format, 0);
        wav_format::patch_sizes(&mut header, self.data_bytes);
        file.seek(SeekFrom::Start(0))
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.write_all(&header)
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.sync_all().map_err(|e| CaptureError::StorageError(e.to_string()))?;
        drop(file);

        let checksum = sha256_file(&self.file_path)?;
        let metadata = RecordingMetadata::new(
            self.format,
            &self.file_path.to_string_lossy(),
            self.data_bytes,
            &checksum,
        );
        write_metadata(&metadata, &self.file_path)?;
        log::info!(
            "Finalized recording {} ({} bytes)",
            self.file_path.display(),
            self.data_bytes
        );

        Ok(RecordingSummary {
            file_path: self.file_path.clone(),
            duration_secs: metadata.duration_secs,
            data_bytes: self.data_bytes,
            checksum,
            metadata,
        })
    }
}

impl ByteSink for WavFileSink {
    fn write(&mut self, data: &[u8]) -> Result<usize, SinkError> {
        let file = self.file.as_mut().ok_or(SinkError::Closed)?;
        file.write_all(data)?;
        self.data_bytes += data.len() as u64;
        Ok(data.len())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data =
        fs::read(path).map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::SampleFormat;
    use crate::storage::metadata::read_metadata;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("audio_input_wav_{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn writes_patched_wav() {
        let dir = temp_dir();
        let path = dir.join("take.wav");
        let format = StreamFormat::new(48000, 2, SampleFormat::I16);

        let mut sink = WavFileSink::create(&path, format).unwrap();
        assert_eq!(sink.write(&[1u8; 16]).unwrap(), 16);
        assert_eq!(sink.write(&[2u8; 8]).unwrap(), 8);
        sink.finish().unwrap();

        let summary = sink.finalize().unwrap();
        assert_eq!(summary.data_bytes, 24);
        assert_eq!(summary.checksum.len(), 64);
        assert!((summary.duration_secs - 6.0 / 48000.0).abs() < 1e-9);

        let data = fs::read(&path).unwrap();
        assert_eq!(data.len(), 44 + 24);
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([data[40], data[41], data[42], data[43]]), 24);
        assert_eq!(u32::from_le_bytes([data[4], data[5], data[6], data[7]]), 36 + 24);
        assert_eq!(&data[44..60], &[1u8; 16]);

        let metadata = read_metadata(&path).unwrap();
        assert_eq!(metadata.checksum, summary.checksum);
        assert_eq!(metadata.format, format);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn checksum_matches_file_contents() {
        let dir = temp_dir();
        let path = dir.join("sum.wav");
        let mut sink = WavFileSink::create(&path, StreamFormat::new(8000, 1, SampleFormat::U8)).unwrap();
        sink.write(&[128u8; 10]).unwrap();
        let summary = sink.finalize().unwrap();

        let expected = hex_encode(&Sha256::digest(fs::read(&path).unwrap()));
        assert_eq!(summary.checksum, expected);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn writes_after_finalize_are_rejected() {
        let dir = temp_dir();
        let mut sink = WavFileSink::create(dir.join("closed.wav"), StreamFormat::new(8000, 1, SampleFormat::U8)).unwrap();
        sink.finalize().unwrap();
        assert!(sink.is_finalized());
        assert!(matches!(sink.write(&[0]), Err(SinkError::Closed)));
        assert!(sink.finalize().is_err());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn planar_format_is_rejected() {
        let dir = temp_dir();
        let result = WavFileSink::create(dir.join("planar.wav"), StreamFormat::planar(48000, 2, SampleFormat::F32));
        assert!(matches!(result, Err(CaptureError::UnsupportedFormat(_))));
    }
}
