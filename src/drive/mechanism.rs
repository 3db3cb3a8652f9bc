//! # Mechanisms
//!
//! Single-channel auxiliary devices: the spinner wheel, the tilt actuator
//! and the release gate.

use std::fmt;

use tracing::info;

use super::actuator::{ActuatorChannel, ChannelSettings};
use super::motor_group::Direction;
use super::Device;
use crate::error::Result;
use crate::maestro::ServoController;

/// What a single-actuator device is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MechanismKind {
    Spinner,
    Tilter,
    Releaser,
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MechanismKind::Spinner => "spinner",
            MechanismKind::Tilter => "tilter",
            MechanismKind::Releaser => "releaser",
        };
        f.write_str(name)
    }
}

/// A single-actuator device as read from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleActuatorSpec {
    pub settings: ChannelSettings,
    pub direction: Direction,
}

/// One channel with one direction sign
#[derive(Debug)]
pub struct SingleActuator {
    kind: MechanismKind,
    name: String,
    direction: Direction,
    channel: ActuatorChannel,
}

impl SingleActuator {
    pub fn open(
        servo: &mut dyn ServoController,
        kind: MechanismKind,
        spec: SingleActuatorSpec,
    ) -> Result<Self> {
        let channel = ActuatorChannel::open(servo, spec.settings)?;
        info!("{} opened on channel {}", kind, channel.channel());

        Ok(Self {
            kind,
            name: kind.to_string(),
            direction: spec.direction,
            channel,
        })
    }

    #[must_use]
    pub fn kind(&self) -> MechanismKind {
        self.kind
    }

    pub fn channel(&self) -> &ActuatorChannel {
        &self.channel
    }

    /// Drives the channel at `amount` times the direction sign
    pub fn drive(&mut self, servo: &mut dyn ServoController, amount: f32) -> Result<()> {
        self.channel.drive(servo, amount * self.direction.sign())
    }
}

impl Device for SingleActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn stop(&mut self, servo: &mut dyn ServoController) -> Result<()> {
        self.channel.stop(servo)
    }

    fn close(&mut self, servo: &mut dyn ServoController) -> Result<()> {
        self.channel.close(servo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::actuator::ChannelState;
    use crate::maestro::mocks::RecordingServo;

    fn open(servo: &mut RecordingServo, channel: u8, direction: Direction) -> SingleActuator {
        let spec = SingleActuatorSpec {
            settings: ChannelSettings::with_defaults(channel),
            direction,
        };
        SingleActuator::open(servo, MechanismKind::Tilter, spec).unwrap()
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MechanismKind::Spinner.to_string(), "spinner");
        assert_eq!(MechanismKind::Tilter.to_string(), "tilter");
        assert_eq!(MechanismKind::Releaser.to_string(), "releaser");
    }

    #[test]
    fn test_forward_direction() {
        let mut servo = RecordingServo::new();
        let mut tilter = open(&mut servo, 5, Direction::Forward);

        tilter.drive(&mut servo, 0.5).unwrap();

        assert_eq!(servo.last_target(5), Some(7000));
        assert_eq!(tilter.name(), "tilter");
    }

    #[test]
    fn test_reverse_direction_flips_amount() {
        let mut servo = RecordingServo::new();
        let mut tilter = open(&mut servo, 5, Direction::Reverse);

        tilter.drive(&mut servo, 0.5).unwrap();

        assert_eq!(servo.last_target(5), Some(5000));
    }

    #[test]
    fn test_stop_and_close_delegate() {
        let mut servo = RecordingServo::new();
        let mut tilter = open(&mut servo, 5, Direction::Forward);
        tilter.drive(&mut servo, -1.0).unwrap();

        tilter.stop(&mut servo).unwrap();
        assert_eq!(servo.last_target(5), Some(6000));

        tilter.close(&mut servo).unwrap();
        assert_eq!(tilter.channel().state(), ChannelState::Closed);
    }
}
