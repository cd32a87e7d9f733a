use crossbeam_channel::Sender;

use super::state::{InputError, InputState};

/// Notifications emitted by an audio input session.
///
/// Events are queued from the render callback and the session timers and
/// consumed on the application's own thread, never delivered synchronously
/// from the realtime context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// The session changed state. `error` is the code current at the change.
    StateChanged { state: InputState, error: InputError },

    /// Periodic progress notification, sent every notify interval while running.
    Notify { processed_usecs: u64, elapsed_usecs: u64 },

    /// New data is buffered and can be read (pull mode only).
    ReadyRead,
}

/// Queues a progress event only while the queue is less than half full.
///
/// `ReadyRead` and `Notify` are advisory and repeat on their own, so they are
/// dropped early and the upper half of the queue stays free for
/// `StateChanged`. Returns whether the event was queued.
pub(crate) fn post_low_priority(events: &Sender<InputEvent>, event: InputEvent) -> bool {
    let limit = events.capacity().map_or(usize::MAX, |cap| cap / 2);
    if events.len() >= limit {
        return false;
    }
    events.try_send(event).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_priority_events_leave_room_for_state_changes() {
        let (tx, rx) = crossbeam_channel::bounded(8);
        let queued = (0..20).filter(|_| post_low_priority(&tx, InputEvent::ReadyRead)).count();
        assert_eq!(queued, 4);

        for _ in 0..4 {
            tx.try_send(InputEvent::StateChanged {
                state: InputState::Stopped,
                error: InputError::NoError,
            })
            .unwrap();
        }
        assert_eq!(rx.len(), 8);
    }

    #[test]
    fn unbounded_queue_accepts_everything() {
        let (tx, rx) = crossbeam_channel::unbounded();
        for _ in 0..100 {
            assert!(post_low_priority(&tx, InputEvent::ReadyRead));
        }
        assert_eq!(rx.len(), 100);
    }
}
