//! # Maestro Module
//!
//! Pololu Maestro servo controller interface.
//!
//! This module handles:
//! - The [`ServoController`] sink every actuator channel writes to
//! - Compact and Pololu protocol command encoding
//! - Optional CRC-7 command checksums

pub mod crc;
pub mod encoder;
pub mod protocol;

use crate::error::Result;

/// Per-channel hardware actuation sink
///
/// Targets are in Maestro units (quarter-microseconds of pulse width).
/// Every call performs exactly one hardware write.
#[cfg_attr(test, mockall::automock)]
pub trait ServoController {
    /// Move `channel` towards `target`
    fn set_target(&mut self, channel: u8, target: u16) -> Result<()>;

    /// Limit how fast `channel` ramps towards its target (0 = unlimited)
    fn set_speed(&mut self, channel: u8, speed: u16) -> Result<()>;

    /// Limit how fast the speed of `channel` changes (0 = unlimited)
    fn set_acceleration(&mut self, channel: u8, acceleration: u16) -> Result<()>;
}
