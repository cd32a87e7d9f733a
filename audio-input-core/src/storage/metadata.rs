use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Path of the JSON sidecar for `recording_path`: `take.wav` → `take.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, CaptureError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json).map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| CaptureError::StorageError(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::{SampleFormat, StreamFormat};

    #[test]
    fn sidecar_round_trip() {
        let dir = std::env::temp_dir().join(format!("audio_input_meta_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let recording = dir.join("take.wav");

        let format = StreamFormat::new(44100, 2, SampleFormat::I16);
        let metadata = RecordingMetadata::new(format, &recording.to_string_lossy(), 176400, "abc123");
        let written = write_metadata(&metadata, &recording).unwrap();
        assert_eq!(written, dir.join("take.metadata.json"));

        let loaded = read_metadata(&recording).unwrap();
        assert_eq!(loaded, metadata);
        assert!((loaded.duration_secs - 1.0).abs() < 1e-9);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_sidecar_is_storage_error() {
        let path = std::env::temp_dir().join(format!("missing_{}.wav", uuid::Uuid::new_v4()));
        assert!(matches!(read_metadata(&path), Err(CaptureError::StorageError(_))));
    }
}
