use crate::models::state::{InputError, InputState};

/// Observer for audio input notifications.
///
/// Methods are called from the event dispatcher thread, never from the
/// realtime render callback.
pub trait InputDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: InputState, error: InputError);

    /// Called every notify interval while the session is running.
    fn on_notify(&self, _processed_usecs: u64, _elapsed_usecs: u64) {}

    /// Called when new data can be read (pull mode).
    fn on_ready_read(&self) {}
}
