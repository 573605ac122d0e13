// src/error.rs

//! Error taxonomy shared by every component, plus the subsystem-wide
//! "last error" slot.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Subsystems that must be initialised before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Video,
    Events,
    Joystick,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Video => write!(f, "video"),
            Subsystem::Events => write!(f, "events"),
            Subsystem::Joystick => write!(f, "joystick"),
        }
    }
}

/// Errors reported by the core.
///
/// None of these are fatal to the host process; callers recover by picking
/// a fallback configuration or retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed pixel format (inconsistent masks, unsupported depth, ...).
    InvalidFormat(String),
    /// Out-of-range index or size.
    InvalidArgument(String),
    /// No display configuration satisfies the required constraints.
    ModeSetFailed(String),
    /// Operation attempted before the owning subsystem was initialised.
    SubsystemNotInitialized(Subsystem),
    /// Event queue full under the reject policy.
    ResourceExhausted(String),
    /// Negotiator operation issued in a state that does not admit it.
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidFormat(reason) => write!(f, "invalid pixel format: {}", reason),
            Error::InvalidArgument(reason) => write!(f, "invalid argument: {}", reason),
            Error::ModeSetFailed(reason) => write!(f, "video mode set failed: {}", reason),
            Error::SubsystemNotInitialized(subsystem) => {
                write!(f, "{} subsystem not initialized", subsystem)
            }
            Error::ResourceExhausted(reason) => write!(f, "resource exhausted: {}", reason),
            Error::InvalidState { operation, state } => {
                write!(f, "{} is not valid in the {} state", operation, state)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Subsystem-global "last error" message.
///
/// Overwritten by each failing call; callers wanting the detail must read it
/// right after the failure.
#[derive(Debug, Clone, Default)]
pub struct ErrorSlot {
    message: Arc<Mutex<Option<String>>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `message`, replacing whatever was there.
    pub fn set(&self, message: impl Into<String>) {
        let mut slot = self
            .message
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(message.into());
    }

    /// Returns the most recent error message, if any.
    pub fn get(&self) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        let mut slot = self
            .message
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }

    /// Passes `result` through, recording its error message on failure.
    pub fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.set(err.to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_overwrite_the_last_error_on_each_failure() {
        let slot = ErrorSlot::new();
        assert_eq!(slot.get(), None);

        let _ = slot.record::<()>(Err(Error::InvalidArgument("first".into())));
        let _ = slot.record::<()>(Err(Error::ModeSetFailed("second".into())));
        assert_eq!(
            slot.get().as_deref(),
            Some("video mode set failed: second")
        );

        slot.clear();
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn it_should_leave_the_slot_untouched_on_success() {
        let slot = ErrorSlot::new();
        slot.set("earlier");
        assert_eq!(slot.record(Ok(5)), Ok(5));
        assert_eq!(slot.get().as_deref(), Some("earlier"));
    }
}
