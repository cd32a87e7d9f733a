pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod format;
pub mod recording_result;
pub mod state;
