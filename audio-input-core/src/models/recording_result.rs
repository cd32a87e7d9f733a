use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::format::StreamFormat;

/// Result returned when a WAV recording sink is finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub data_bytes: u64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Metadata stored alongside a recording as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub format: StreamFormat,
    pub duration_secs: f64,
    pub data_bytes: u64,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn new(format: StreamFormat, file_path: &str, data_bytes: u64, checksum: &str) -> Self {
        let duration_secs = format.duration_of_bytes(data_bytes as usize).as_secs_f64();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: file_path.to_string(),
            format,
            duration_secs,
            data_bytes,
            checksum: checksum.to_string(),
        }
    }
}
