use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::models::error::CaptureError;
use crate::models::event::InputEvent;
use crate::traits::input_delegate::InputDelegate;

/// Delivers queued [`InputEvent`]s to an [`InputDelegate`] on a dedicated thread.
///
/// Keeps delegate code off the render callback: the callback only enqueues,
/// this thread calls out.
pub struct EventDispatcher {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl EventDispatcher {
    pub fn spawn(events: Receiver<InputEvent>, delegate: Arc<dyn InputDelegate>) -> Result<Self, CaptureError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("input-events".into())
            .spawn(move || {
                while flag.load(Ordering::SeqCst) {
                    match events.recv_timeout(Duration::from_millis(100)) {
                        Ok(event) => dispatch(delegate.as_ref(), event),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn event thread: {}", e)))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stops dispatching. Events still queued stay in the channel.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Input event dispatcher panicked");
            }
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch(delegate: &dyn InputDelegate, event: InputEvent) {
    match event {
        InputEvent::StateChanged { state, error } => delegate.on_state_changed(state, error),
        InputEvent::Notify {
            processed_usecs,
            elapsed_usecs,
        } => delegate.on_notify(processed_usecs, elapsed_usecs),
        InputEvent::ReadyRead => delegate.on_ready_read(),
    }
}
