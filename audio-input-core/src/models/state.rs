use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Audio input state machine.
///
/// State transitions:
/// ```text
///            start()             first frames
/// stopped ───────────▶ idle ───────────────────▶ active
///    ▲                  ▲  ◀─────────────────────  │
///    │                  │     buffer full          │
///    │     suspend()    │                          │ suspend()
///    │   ┌──────────────┴─────────▶ suspended ◀────┘
///    │   │                              │ resume() ─▶ active
///    └───┴── stop() / reset() / device error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputState {
    Stopped,
    Idle,
    Active,
    Suspended,
}

impl InputState {
    pub fn is_stopped(self) -> bool {
        self == Self::Stopped
    }

    /// Whether the hardware unit is (or should be) delivering callbacks.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Idle | Self::Active)
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Idle => 1,
            Self::Active => 2,
            Self::Suspended => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Idle,
            2 => Self::Active,
            3 => Self::Suspended,
            _ => Self::Stopped,
        }
    }
}

/// Error code attached to the most recent failed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputError {
    #[default]
    NoError,
    /// Resource acquisition or format negotiation failed.
    OpenError,
    /// Unrecoverable hardware failure while capturing.
    IoError,
    /// Frames arrived while the buffer had no room for them.
    UnderrunError,
}

impl InputError {
    fn to_u8(self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::OpenError => 1,
            Self::IoError => 2,
            Self::UnderrunError => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::OpenError,
            2 => Self::IoError,
            3 => Self::UnderrunError,
            _ => Self::NoError,
        }
    }
}

/// Lock-free cell holding an [`InputState`], shared with the render callback.
#[derive(Debug)]
pub struct AtomicInputState(AtomicU8);

impl AtomicInputState {
    pub fn new(state: InputState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub fn load(&self) -> InputState {
        InputState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: InputState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Moves `from → to` only if the current state is `from`.
    pub fn transition(&self, from: InputState, to: InputState) -> bool {
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Lock-free cell holding an [`InputError`].
#[derive(Debug)]
pub struct AtomicInputError(AtomicU8);

impl AtomicInputError {
    pub fn new(error: InputError) -> Self {
        Self(AtomicU8::new(error.to_u8()))
    }

    pub fn load(&self) -> InputError {
        InputError::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, error: InputError) {
        self.0.store(error.to_u8(), Ordering::Release);
    }
}
