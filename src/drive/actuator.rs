//! # Actuator Channel
//!
//! One Maestro output channel with its pulse-width calibration.
//!
//! Power is mapped linearly on each side of center, so the forward and
//! reverse ranges can be trimmed independently:
//!
//! ```text
//! target = center + (max - center) * power    power >= 0
//! target = center + (center - min) * power    power <  0
//! ```
//!
//! Power is clamped to [-1, 1] first, so a target never leaves
//! `[min, max]`. Non-finite power is treated as a stop.

use tracing::{debug, warn};

use crate::error::{DriveError, Result};
use crate::maestro::protocol::MAX_DATA_VALUE;
use crate::maestro::ServoController;

/// Default lower pulse-width limit (Maestro units)
pub const DEFAULT_MIN: u16 = 4000;

/// Default neutral pulse width (Maestro units)
pub const DEFAULT_CENTER: u16 = 6000;

/// Default upper pulse-width limit (Maestro units)
pub const DEFAULT_MAX: u16 = 8000;

/// Default Maestro speed limit; low values dampen acceleration
pub const DEFAULT_RESPONSIVENESS: u16 = 60;

/// Pulse-width range of one channel: `min < center < max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    min: u16,
    center: u16,
    max: u16,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN,
            center: DEFAULT_CENTER,
            max: DEFAULT_MAX,
        }
    }
}

impl Calibration {
    /// Creates a calibration, rejecting anything not strictly ordered
    ///
    /// # Errors
    ///
    /// `InvalidCalibration` unless `min < center < max <= 16383`
    ///
    /// # Examples
    ///
    /// ```
    /// use maestro_drive::drive::Calibration;
    ///
    /// assert!(Calibration::new(4000, 6000, 8000).is_ok());
    /// assert!(Calibration::new(6000, 6000, 8000).is_err());
    /// ```
    pub fn new(min: u16, center: u16, max: u16) -> Result<Self> {
        if min < center && center < max && max <= MAX_DATA_VALUE {
            Ok(Self { min, center, max })
        } else {
            Err(DriveError::InvalidCalibration { min, center, max })
        }
    }

    #[must_use]
    pub fn min(&self) -> u16 {
        self.min
    }

    #[must_use]
    pub fn center(&self) -> u16 {
        self.center
    }

    #[must_use]
    pub fn max(&self) -> u16 {
        self.max
    }

    /// Maps a normalized power to a hardware target
    ///
    /// # Examples
    ///
    /// ```
    /// use maestro_drive::drive::Calibration;
    ///
    /// let cal = Calibration::new(4000, 6000, 8000)?;
    /// assert_eq!(cal.target_for(0.5), 7000);
    /// assert_eq!(cal.target_for(-1.0), 4000);
    /// # Ok::<(), maestro_drive::error::DriveError>(())
    /// ```
    #[must_use]
    pub fn target_for(&self, power: f32) -> u16 {
        if !power.is_finite() {
            return self.center;
        }

        let power = power.clamp(-1.0, 1.0);
        let center = f32::from(self.center);
        let span = if power >= 0.0 {
            f32::from(self.max - self.center)
        } else {
            f32::from(self.center - self.min)
        };

        let target = (center + span * power).round();
        (target as u16).clamp(self.min, self.max)
    }
}

/// Maestro speed setting applied to a channel at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Responsiveness(u16);

impl Default for Responsiveness {
    fn default() -> Self {
        Self(DEFAULT_RESPONSIVENESS)
    }
}

impl Responsiveness {
    #[must_use]
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

/// Everything needed to bring up one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    pub channel: u8,
    pub calibration: Calibration,
    pub responsiveness: Responsiveness,
}

impl ChannelSettings {
    /// Settings with the default calibration and responsiveness
    #[must_use]
    pub fn with_defaults(channel: u8) -> Self {
        Self {
            channel,
            calibration: Calibration::default(),
            responsiveness: Responsiveness::default(),
        }
    }
}

/// Lifecycle of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Configured, nothing commanded yet
    Ready,
    /// Last command was a drive
    Driving,
    /// Last command was a stop (target at center)
    Stopped,
    /// Stopped and released; further drives are rejected
    Closed,
}

/// A single hardware output channel, exclusively owned by one device
#[derive(Debug)]
pub struct ActuatorChannel {
    channel: u8,
    calibration: Calibration,
    responsiveness: Responsiveness,
    state: ChannelState,
    last_target: Option<u16>,
}

impl ActuatorChannel {
    /// Configures the channel on the controller
    ///
    /// Sends `set_acceleration(channel, 0)` then
    /// `set_speed(channel, responsiveness)`.
    pub fn open(servo: &mut dyn ServoController, settings: ChannelSettings) -> Result<Self> {
        let ChannelSettings {
            channel,
            calibration,
            responsiveness,
        } = settings;

        servo.set_acceleration(channel, 0)?;
        servo.set_speed(channel, responsiveness.get())?;

        debug!(
            "Opened channel {} (min {}, center {}, max {}, responsiveness {})",
            channel,
            calibration.min(),
            calibration.center(),
            calibration.max(),
            responsiveness.get()
        );

        Ok(Self {
            channel,
            calibration,
            responsiveness,
            state: ChannelState::Ready,
            last_target: None,
        })
    }

    #[must_use]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    #[must_use]
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    #[must_use]
    pub fn responsiveness(&self) -> Responsiveness {
        self.responsiveness
    }

    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Last target the controller accepted
    #[must_use]
    pub fn last_target(&self) -> Option<u16> {
        self.last_target
    }

    /// Drives the channel at `power` (-1.0 to 1.0)
    ///
    /// # Errors
    ///
    /// `ChannelClosed` after [`close`](Self::close); otherwise whatever the
    /// controller write returns.
    pub fn drive(&mut self, servo: &mut dyn ServoController, power: f32) -> Result<()> {
        if self.state == ChannelState::Closed {
            return Err(DriveError::ChannelClosed(self.channel));
        }

        let target = self.calibration.target_for(power);
        self.write(servo, target)?;
        self.state = ChannelState::Driving;
        Ok(())
    }

    /// Re-centers the channel. No-op once closed.
    pub fn stop(&mut self, servo: &mut dyn ServoController) -> Result<()> {
        if self.state == ChannelState::Closed {
            return Ok(());
        }

        self.write(servo, self.calibration.center())?;
        self.state = ChannelState::Stopped;
        Ok(())
    }

    /// Stops, then releases the channel
    ///
    /// The channel is released even if the stop write fails; the failure is
    /// still returned. Closing twice is a no-op.
    pub fn close(&mut self, servo: &mut dyn ServoController) -> Result<()> {
        if self.state == ChannelState::Closed {
            return Ok(());
        }

        let result = self.stop(servo);
        self.state = ChannelState::Closed;
        debug!("Closed channel {}", self.channel);
        result
    }

    fn write(&mut self, servo: &mut dyn ServoController, target: u16) -> Result<()> {
        match servo.set_target(self.channel, target) {
            Ok(()) => {
                self.last_target = Some(target);
                Ok(())
            }
            Err(e) => {
                warn!("Write to channel {} failed: {}", self.channel, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maestro::mocks::{RecordingServo, ServoCommand};
    use crate::maestro::MockServoController;
    use mockall::predicate::eq;

    fn default_channel(servo: &mut RecordingServo, channel: u8) -> ActuatorChannel {
        ActuatorChannel::open(servo, ChannelSettings::with_defaults(channel)).unwrap()
    }

    // ==================== Calibration Tests ====================

    #[test]
    fn test_calibration_default() {
        let cal = Calibration::default();
        assert_eq!((cal.min(), cal.center(), cal.max()), (4000, 6000, 8000));
    }

    #[test]
    fn test_calibration_rejects_unordered() {
        assert!(Calibration::new(6000, 6000, 8000).is_err());
        assert!(Calibration::new(4000, 8000, 8000).is_err());
        assert!(Calibration::new(8000, 6000, 4000).is_err());
        assert!(Calibration::new(4000, 6000, 5000).is_err());
    }

    #[test]
    fn test_calibration_rejects_beyond_14_bits() {
        assert!(Calibration::new(4000, 6000, 16384).is_err());
        assert!(Calibration::new(4000, 6000, 16383).is_ok());
    }

    #[test]
    fn test_calibration_error_reports_values() {
        match Calibration::new(5000, 4000, 8000) {
            Err(DriveError::InvalidCalibration { min, center, max }) => {
                assert_eq!((min, center, max), (5000, 4000, 8000));
            }
            other => panic!("Expected InvalidCalibration, got: {:?}", other),
        }
    }

    #[test]
    fn test_target_for_reference_points() {
        let cal = Calibration::default();
        assert_eq!(cal.target_for(0.0), 6000);
        assert_eq!(cal.target_for(1.0), 8000);
        assert_eq!(cal.target_for(-1.0), 4000);
        assert_eq!(cal.target_for(0.5), 7000);
        assert_eq!(cal.target_for(-0.5), 5000);
    }

    #[test]
    fn test_target_for_asymmetric_calibration() {
        let cal = Calibration::new(5000, 6000, 9000).unwrap();
        assert_eq!(cal.target_for(1.0), 9000);
        assert_eq!(cal.target_for(0.5), 7500);
        assert_eq!(cal.target_for(-0.5), 5500);
        assert_eq!(cal.target_for(-1.0), 5000);
    }

    #[test]
    fn test_target_for_clamps_out_of_range_power() {
        let cal = Calibration::default();
        assert_eq!(cal.target_for(1.5), 8000);
        assert_eq!(cal.target_for(-3.0), 4000);
    }

    #[test]
    fn test_target_for_non_finite_is_center() {
        let cal = Calibration::default();
        assert_eq!(cal.target_for(f32::NAN), 6000);
        assert_eq!(cal.target_for(f32::INFINITY), 6000);
        assert_eq!(cal.target_for(f32::NEG_INFINITY), 6000);
    }

    #[test]
    fn test_target_for_rounds_to_nearest() {
        let cal = Calibration::new(4000, 6000, 8001).unwrap();
        // 6000 + 2001 * 0.25 = 6500.25
        assert_eq!(cal.target_for(0.25), 6500);
        // 6000 + 2001 * 0.75 = 7500.75
        assert_eq!(cal.target_for(0.75), 7501);
    }

    #[test]
    fn test_target_for_is_monotonic() {
        let cal = Calibration::new(3968, 6000, 8000).unwrap();
        let mut previous = cal.target_for(-1.0);
        for step in -99..=100 {
            let target = cal.target_for(step as f32 / 100.0);
            assert!(target >= previous, "target dropped at power {}", step);
            previous = target;
        }
    }

    #[test]
    fn test_responsiveness_default() {
        assert_eq!(Responsiveness::default().get(), 60);
        assert_eq!(Responsiveness::new(100).get(), 100);
    }

    // ==================== ActuatorChannel Tests ====================

    #[test]
    fn test_open_sets_acceleration_then_speed() {
        let mut servo = RecordingServo::new();
        let settings = ChannelSettings {
            channel: 3,
            calibration: Calibration::default(),
            responsiveness: Responsiveness::new(80),
        };

        let channel = ActuatorChannel::open(&mut servo, settings).unwrap();

        assert_eq!(channel.state(), ChannelState::Ready);
        assert_eq!(channel.last_target(), None);
        assert_eq!(
            servo.commands(),
            vec![
                ServoCommand::Acceleration { channel: 3, value: 0 },
                ServoCommand::Speed { channel: 3, value: 80 },
            ]
        );
    }

    #[test]
    fn test_open_propagates_write_failure() {
        let mut servo = RecordingServo::new();
        servo.fail_channel(1);
        assert!(ActuatorChannel::open(&mut servo, ChannelSettings::with_defaults(1)).is_err());
    }

    #[test]
    fn test_drive_writes_exactly_one_target() {
        let mut servo = RecordingServo::new();
        let mut channel = default_channel(&mut servo, 0);
        servo.clear();

        channel.drive(&mut servo, 0.5).unwrap();

        assert_eq!(servo.commands(), vec![ServoCommand::Target { channel: 0, value: 7000 }]);
        assert_eq!(channel.state(), ChannelState::Driving);
        assert_eq!(channel.last_target(), Some(7000));
    }

    #[test]
    fn test_stop_recenters_after_any_drive() {
        for power in [-1.0, -0.3, 0.0, 0.7, 1.0] {
            let mut servo = RecordingServo::new();
            let mut channel = default_channel(&mut servo, 2);

            channel.drive(&mut servo, power).unwrap();
            channel.stop(&mut servo).unwrap();

            assert_eq!(servo.last_target(2), Some(6000));
            assert_eq!(channel.state(), ChannelState::Stopped);
        }
    }

    #[test]
    fn test_stop_uses_set_target_not_acceleration() {
        let mut servo = MockServoController::new();
        servo.expect_set_acceleration().with(eq(5), eq(0)).times(1).returning(|_, _| Ok(()));
        servo.expect_set_speed().with(eq(5), eq(60)).times(1).returning(|_, _| Ok(()));
        servo.expect_set_target().with(eq(5), eq(6000)).times(1).returning(|_, _| Ok(()));

        let mut channel = ActuatorChannel::open(&mut servo, ChannelSettings::with_defaults(5)).unwrap();
        channel.stop(&mut servo).unwrap();
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut servo = RecordingServo::new();
        let mut channel = default_channel(&mut servo, 1);
        servo.clear();

        channel.close(&mut servo).unwrap();
        channel.close(&mut servo).unwrap();
        channel.stop(&mut servo).unwrap();

        assert_eq!(servo.commands(), vec![ServoCommand::Target { channel: 1, value: 6000 }]);
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[test]
    fn test_close_after_stop() {
        let mut servo = RecordingServo::new();
        let mut channel = default_channel(&mut servo, 1);

        channel.stop(&mut servo).unwrap();
        channel.close(&mut servo).unwrap();

        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!(servo.last_target(1), Some(6000));
    }

    #[test]
    fn test_drive_after_close_is_rejected() {
        let mut servo = RecordingServo::new();
        let mut channel = default_channel(&mut servo, 4);
        channel.close(&mut servo).unwrap();
        servo.clear();

        match channel.drive(&mut servo, 1.0) {
            Err(DriveError::ChannelClosed(4)) => {}
            other => panic!("Expected ChannelClosed, got: {:?}", other),
        }
        assert!(servo.commands().is_empty());
    }

    #[test]
    fn test_close_releases_even_when_stop_fails() {
        let mut servo = RecordingServo::new();
        let mut channel = default_channel(&mut servo, 6);
        servo.fail_channel(6);

        assert!(channel.close(&mut servo).is_err());
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(channel.close(&mut servo).is_ok());
    }

    #[test]
    fn test_failed_write_keeps_previous_target() {
        let mut servo = RecordingServo::new();
        let mut channel = default_channel(&mut servo, 0);
        channel.drive(&mut servo, 1.0).unwrap();

        servo.fail_channel(0);
        assert!(channel.drive(&mut servo, -1.0).is_err());
        assert_eq!(channel.last_target(), Some(8000));
    }
}
