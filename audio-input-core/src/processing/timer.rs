use std::ops::ControlFlow;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::models::error::CaptureError;

/// Runs a tick closure on a dedicated thread at a fixed period.
///
/// The closure stops the timer by returning `ControlFlow::Break`. Stopping
/// from the owner disconnects the stop channel, which wakes the thread
/// immediately instead of waiting out the current period.
pub struct PeriodicTimer {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PeriodicTimer {
    pub fn start<F>(name: &str, period: Duration, mut tick: F) -> Result<Self, CaptureError>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        if tick().is_break() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn {} thread: {}", name, e)))?;

        Ok(Self {
            name: name.into(),
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Whether the timer thread is still ticking.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the timer and waits for an in-flight tick to finish.
    ///
    /// Called from the timer's own thread (e.g. when the owner is dropped by
    /// the tick) this only disconnects; the thread exits after the tick.
    pub fn stop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::error!("{} thread panicked", self.name);
            }
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
