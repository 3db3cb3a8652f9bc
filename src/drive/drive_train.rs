//! # Drive Train
//!
//! Arcade-mixed motor group behind a `drive(steer, speed)` contract.

use tracing::{debug, info};

use super::actuator::ChannelSettings;
use super::mixer::arcade_mix;
use super::motor_group::{MotorGroup, MotorRole};
use super::Device;
use crate::error::{DriveError, Result};
use crate::maestro::ServoController;

/// One drive-train motor as read from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveTrainMotorSpec {
    pub settings: ChannelSettings,
    pub role: MotorRole,
}

/// Left/right motors driven from a single steer + speed pair
#[derive(Debug)]
pub struct DriveTrain {
    motors: MotorGroup,
}

impl DriveTrain {
    /// Opens every motor channel
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `specs` is empty; otherwise the first channel that
    /// fails to open.
    pub fn open(servo: &mut dyn ServoController, specs: &[DriveTrainMotorSpec]) -> Result<Self> {
        if specs.is_empty() {
            return Err(DriveError::InvalidConfig(
                "Drive train needs at least one motor".to_string(),
            ));
        }

        let motors = MotorGroup::open(servo, specs.iter().map(|spec| (spec.settings, spec.role)))?;
        info!("Drive train opened with {} motors", motors.len());

        Ok(Self { motors })
    }

    pub fn motors(&self) -> &MotorGroup {
        &self.motors
    }

    /// Mixes `steer` and `speed` and drives every motor
    pub fn drive(&mut self, servo: &mut dyn ServoController, steer: f32, speed: f32) -> Result<()> {
        let pair = arcade_mix(steer, speed);
        debug!(
            "Drive steer={:.3} speed={:.3} -> left={:.3} right={:.3}",
            steer, speed, pair.left, pair.right
        );
        self.motors.apply(servo, pair)
    }
}

impl Device for DriveTrain {
    fn name(&self) -> &str {
        "drive train"
    }

    fn stop(&mut self, servo: &mut dyn ServoController) -> Result<()> {
        self.motors.stop(servo)
    }

    fn close(&mut self, servo: &mut dyn ServoController) -> Result<()> {
        self.motors.close(servo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::actuator::{Calibration, Responsiveness};
    use crate::drive::motor_group::{Direction, MotorSide};
    use crate::maestro::mocks::RecordingServo;

    fn spec(channel: u8, side: MotorSide, direction: Direction) -> DriveTrainMotorSpec {
        DriveTrainMotorSpec {
            settings: ChannelSettings::with_defaults(channel),
            role: MotorRole { side, direction },
        }
    }

    /// Left pair +1/-1, right pair -1/+1
    fn four_motor_specs() -> Vec<DriveTrainMotorSpec> {
        vec![
            spec(0, MotorSide::Left, Direction::Forward),
            spec(1, MotorSide::Left, Direction::Reverse),
            spec(2, MotorSide::Right, Direction::Reverse),
            spec(3, MotorSide::Right, Direction::Forward),
        ]
    }

    #[test]
    fn test_open_requires_a_motor() {
        let mut servo = RecordingServo::new();
        assert!(matches!(
            DriveTrain::open(&mut servo, &[]),
            Err(DriveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_full_forward_four_motors() {
        let mut servo = RecordingServo::new();
        let mut train = DriveTrain::open(&mut servo, &four_motor_specs()).unwrap();

        // mix(0, 1) = (1, -1)
        train.drive(&mut servo, 0.0, 1.0).unwrap();

        assert_eq!(servo.last_target(0), Some(8000)); //  1 *  1
        assert_eq!(servo.last_target(1), Some(4000)); //  1 * -1
        assert_eq!(servo.last_target(2), Some(8000)); // -1 * -1
        assert_eq!(servo.last_target(3), Some(4000)); // -1 *  1
    }

    #[test]
    fn test_drive_uses_each_channel_calibration() {
        let mut servo = RecordingServo::new();
        let mut specs = four_motor_specs();
        specs[0].settings = ChannelSettings {
            channel: 0,
            calibration: Calibration::new(5000, 6000, 9000).unwrap(),
            responsiveness: Responsiveness::new(40),
        };
        let mut train = DriveTrain::open(&mut servo, &specs).unwrap();

        train.drive(&mut servo, 0.0, 0.5).unwrap();

        assert_eq!(servo.last_target(0), Some(7500));
        assert_eq!(servo.last_target(3), Some(5000));
    }

    #[test]
    fn test_saturated_inputs_stay_in_calibrated_range() {
        let mut servo = RecordingServo::new();
        let mut train = DriveTrain::open(&mut servo, &four_motor_specs()).unwrap();

        train.drive(&mut servo, 0.0, 3.0).unwrap();

        for channel in 0..4 {
            let target = servo.last_target(channel).unwrap();
            assert!((4000..=8000).contains(&target), "channel {} at {}", channel, target);
        }
    }

    #[test]
    fn test_stop_centers_all_motors() {
        let mut servo = RecordingServo::new();
        let mut train = DriveTrain::open(&mut servo, &four_motor_specs()).unwrap();
        train.drive(&mut servo, 0.4, -0.8).unwrap();

        train.stop(&mut servo).unwrap();

        for channel in 0..4 {
            assert_eq!(servo.last_target(channel), Some(6000));
        }
    }

    #[test]
    fn test_close_rejects_later_drives() {
        let mut servo = RecordingServo::new();
        let mut train = DriveTrain::open(&mut servo, &four_motor_specs()).unwrap();

        train.close(&mut servo).unwrap();

        assert!(matches!(
            train.drive(&mut servo, 0.0, 1.0),
            Err(DriveError::ChannelClosed(_))
        ));
    }
}
