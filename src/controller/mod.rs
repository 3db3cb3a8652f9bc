//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Gamepad detection and connection via evdev
//! - Folding raw events into a normalized controller state
//! - Applying deadzones and exponential curves
//! - Mapping inputs to operator commands
//! - Handing the latest state to the control loop through [`InputHandle`]

pub mod bindings;
pub mod calibration;
pub mod gamepad;
pub mod mapper;

pub use bindings::{Axis, ControlBindings, OperatorCommand};
pub use gamepad::{spawn_reader, Gamepad};
pub use mapper::{ControllerState, EventMapper};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{DriveError, Result};

/// Control loop side of the input source
///
/// Holds the most recent controller state; `None` means no gamepad is
/// connected.
#[derive(Debug)]
pub struct InputHandle {
    rx: watch::Receiver<Option<ControllerState>>,
    reader: Option<JoinHandle<()>>,
}

impl InputHandle {
    /// Wraps a state channel and the task feeding it, if any
    pub fn new(
        rx: watch::Receiver<Option<ControllerState>>,
        reader: Option<JoinHandle<()>>,
    ) -> Self {
        Self { rx, reader }
    }

    /// Latest published state
    ///
    /// # Errors
    ///
    /// `InputClosed` once the publishing side is gone.
    pub fn current(&mut self) -> Result<Option<ControllerState>> {
        if self.rx.has_changed().is_err() {
            return Err(DriveError::InputClosed);
        }
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Stops the reader task. Idempotent.
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_reads_latest_state() {
        let (tx, rx) = watch::channel(None);
        let mut handle = InputHandle::new(rx, None);

        assert_eq!(handle.current().unwrap(), None);

        let state = ControllerState {
            left_y: 0.5,
            ..ControllerState::default()
        };
        tx.send(Some(state.clone())).unwrap();
        assert_eq!(handle.current().unwrap(), Some(state.clone()));
        // Unchanged values are still returned
        assert_eq!(handle.current().unwrap(), Some(state));
    }

    #[test]
    fn test_current_fails_when_publisher_dropped() {
        let (tx, rx) = watch::channel(None);
        let mut handle = InputHandle::new(rx, None);
        drop(tx);

        assert!(matches!(handle.current(), Err(DriveError::InputClosed)));
    }

    #[tokio::test]
    async fn test_close_aborts_reader() {
        let (_tx, rx) = watch::channel(None);
        let reader = tokio::spawn(std::future::pending::<()>());
        let mut handle = InputHandle::new(rx, Some(reader));

        handle.close();
        handle.close();

        assert!(handle.reader.is_none());
    }
}
