//! # Control Bindings
//!
//! Turns a [`ControllerState`] into the per-tick [`OperatorCommand`].
//!
//! | Command | Source |
//! |---------|--------|
//! | steer | configured stick axis (default left X), shaped |
//! | speed | configured stick axis (default left Y), shaped |
//! | spin | left trigger |
//! | tilt | d-pad up minus d-pad down |
//! | release | right trigger |
//! | disable | Back |

use serde::Deserialize;

use super::calibration::{apply_trigger_deadzone, Shaping};
use super::mapper::ControllerState;
use crate::config::ControllerConfig;

/// A stick axis that can drive steering or speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

impl Axis {
    #[must_use]
    pub fn read(self, state: &ControllerState) -> f32 {
        match self {
            Axis::LeftX => state.left_x,
            Axis::LeftY => state.left_y,
            Axis::RightX => state.right_x,
            Axis::RightY => state.right_y,
        }
    }
}

/// What the operator is asking for on this tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OperatorCommand {
    /// -1.0 (left) to 1.0 (right)
    pub steer: f32,
    /// -1.0 (reverse) to 1.0 (forward)
    pub speed: f32,
    /// 0.0 to 1.0
    pub spin: f32,
    /// -1.0, 0.0 or 1.0
    pub tilt: f32,
    /// 0.0 to 1.0
    pub release: f32,
    /// End the control loop
    pub disable: bool,
}

/// Mapping from gamepad inputs to operator commands
#[derive(Debug, Clone)]
pub struct ControlBindings {
    steer_axis: Axis,
    drive_axis: Axis,
    invert_steer: bool,
    invert_drive: bool,
    steer: Shaping,
    drive: Shaping,
    trigger_deadzone: f32,
}

impl Default for ControlBindings {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

impl ControlBindings {
    #[must_use]
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            steer_axis: config.steer_axis,
            drive_axis: config.drive_axis,
            invert_steer: config.invert_steer,
            invert_drive: config.invert_drive,
            steer: Shaping::new(config.deadzone_stick, config.expo_steer),
            drive: Shaping::new(config.deadzone_stick, config.expo_drive),
            trigger_deadzone: config.deadzone_trigger,
        }
    }

    /// # Examples
    ///
    /// ```
    /// use maestro_drive::controller::{ControlBindings, ControllerState};
    ///
    /// let bindings = ControlBindings::default();
    /// let state = ControllerState { left_y: 1.0, ..ControllerState::default() };
    /// assert_eq!(bindings.map(&state).speed, 1.0);
    /// ```
    #[must_use]
    pub fn map(&self, state: &ControllerState) -> OperatorCommand {
        let steer = self.steer.apply(self.steer_axis.read(state));
        let speed = self.drive.apply(self.drive_axis.read(state));

        OperatorCommand {
            steer: if self.invert_steer { -steer } else { steer },
            speed: if self.invert_drive { -speed } else { speed },
            spin: apply_trigger_deadzone(state.left_trigger, self.trigger_deadzone),
            tilt: state.dpad_vertical(),
            release: apply_trigger_deadzone(state.right_trigger, self.trigger_deadzone),
            disable: state.btn_back,
        }
    }
}
