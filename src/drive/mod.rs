//! # Drive Module
//!
//! Everything between a normalized operator input and a hardware target.
//!
//! This module handles:
//! - Arcade mixing of steer and speed into left/right powers
//! - Per-channel calibration (asymmetric min/center/max)
//! - Motor groups with side and direction tags
//! - Single-actuator mechanisms (spinner, tilter, releaser)
//!
//! Devices never own the servo controller. Every call borrows it, so one
//! controller can serve all devices without shared ownership.

pub mod actuator;
pub mod drive_train;
pub mod mechanism;
pub mod mixer;
pub mod motor_group;

pub use actuator::{ActuatorChannel, Calibration, ChannelSettings, ChannelState, Responsiveness};
pub use drive_train::{DriveTrain, DriveTrainMotorSpec};
pub use mechanism::{MechanismKind, SingleActuator, SingleActuatorSpec};
pub use mixer::{arcade_mix, PowerPair};
pub use motor_group::{Direction, MotorGroup, MotorRole, MotorSide};

use std::collections::HashSet;

use crate::error::{DriveError, Result};
use crate::maestro::protocol::MAX_CHANNELS;
use crate::maestro::ServoController;

/// Teardown contract shared by every device a robot owns
pub trait Device {
    /// Name used in log lines
    fn name(&self) -> &str;

    /// Re-center every channel (best effort)
    fn stop(&mut self, servo: &mut dyn ServoController) -> Result<()>;

    /// Stop, then release every channel. Idempotent.
    fn close(&mut self, servo: &mut dyn ServoController) -> Result<()>;
}

/// Checks that every channel exists on the controller and is used once
///
/// # Errors
///
/// `ChannelOutOfRange` for an id the Maestro does not have,
/// `DuplicateChannel` for the first id seen twice.
///
/// # Examples
///
/// ```
/// use maestro_drive::drive::check_channel_assignments;
///
/// assert!(check_channel_assignments([0, 1, 2]).is_ok());
/// assert!(check_channel_assignments([0, 1, 0]).is_err());
/// ```
pub fn check_channel_assignments(channels: impl IntoIterator<Item = u8>) -> Result<()> {
    let mut seen = HashSet::new();

    for channel in channels {
        if channel >= MAX_CHANNELS {
            return Err(DriveError::ChannelOutOfRange(channel));
        }
        if !seen.insert(channel) {
            return Err(DriveError::DuplicateChannel(channel));
        }
    }

    Ok(())
}
