//! # Motor Group
//!
//! Actuator channels tagged with a drive side and a direction sign.

use serde::Deserialize;

use super::actuator::{ActuatorChannel, ChannelSettings};
use super::mixer::PowerPair;
use crate::error::{DriveError, Result};
use crate::maestro::ServoController;

/// Side of the chassis a drive motor sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorSide {
    Left,
    Right,
}

/// Sign applied to a motor's power, written as `1` or `-1` in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "i64")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    /// `1.0` or `-1.0`
    #[must_use]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

impl TryFrom<i64> for Direction {
    type Error = DriveError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Direction::Forward),
            -1 => Ok(Direction::Reverse),
            other => Err(DriveError::InvalidDirection(other)),
        }
    }
}

/// Which mixed power a motor takes, and with which sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorRole {
    pub side: MotorSide,
    pub direction: Direction,
}

impl MotorRole {
    /// Power for this motor out of a mixed pair
    ///
    /// # Examples
    ///
    /// ```
    /// use maestro_drive::drive::{Direction, MotorRole, MotorSide, PowerPair};
    ///
    /// let role = MotorRole { side: MotorSide::Right, direction: Direction::Reverse };
    /// assert_eq!(role.power_from(PowerPair { left: 1.0, right: -1.0 }), 1.0);
    /// ```
    #[must_use]
    pub fn power_from(&self, pair: PowerPair) -> f32 {
        let power = match self.side {
            MotorSide::Left => pair.left,
            MotorSide::Right => pair.right,
        };
        power * self.direction.sign()
    }
}

/// A channel and the role it plays in the group
#[derive(Debug)]
pub struct GroupMember {
    pub role: MotorRole,
    pub channel: ActuatorChannel,
}

/// Channels driven together from one [`PowerPair`]
///
/// Every operation visits all members, even after a failed write, and
/// reports the first failure.
#[derive(Debug, Default)]
pub struct MotorGroup {
    members: Vec<GroupMember>,
}

impl MotorGroup {
    /// Opens every channel in order
    pub fn open(
        servo: &mut dyn ServoController,
        motors: impl IntoIterator<Item = (ChannelSettings, MotorRole)>,
    ) -> Result<Self> {
        let members = motors
            .into_iter()
            .map(|(settings, role)| {
                Ok(GroupMember {
                    role,
                    channel: ActuatorChannel::open(servo, settings)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { members })
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Drives each member with its side's power times its direction
    pub fn apply(&mut self, servo: &mut dyn ServoController, pair: PowerPair) -> Result<()> {
        self.for_each_member(|member| {
            let power = member.role.power_from(pair);
            member.channel.drive(servo, power)
        })
    }

    /// Stops every member (best effort)
    pub fn stop(&mut self, servo: &mut dyn ServoController) -> Result<()> {
        self.for_each_member(|member| member.channel.stop(servo))
    }

    /// Closes every member (best effort)
    pub fn close(&mut self, servo: &mut dyn ServoController) -> Result<()> {
        self.for_each_member(|member| member.channel.close(servo))
    }

    fn for_each_member<F>(&mut self, mut op: F) -> Result<()>
    where
        F: FnMut(&mut GroupMember) -> Result<()>,
    {
        let mut first_failure = None;

        for member in &mut self.members {
            if let Err(e) = op(member) {
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
