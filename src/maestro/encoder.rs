//! # Maestro Command Encoder
//!
//! Encodes servo commands into Maestro serial byte sequences.
//!
//! Every multi-byte value is sent as two 7-bit data bytes, low bits first:
//! ```text
//! Set Target (compact):  0x84, channel, target & 0x7F, (target >> 7) & 0x7F
//! Set Target (Pololu):   0xAA, device, 0x04, channel, target & 0x7F, (target >> 7) & 0x7F
//! ```

use super::crc::crc7;
use super::protocol::*;

/// Split a 14-bit value into the low and high 7-bit data bytes
///
/// Values above 14 bits are clamped to [`MAX_DATA_VALUE`].
///
/// # Examples
///
/// ```
/// use maestro_drive::maestro::encoder::split_data_value;
///
/// assert_eq!(split_data_value(6000), [0x70, 0x2E]);
/// ```
pub fn split_data_value(value: u16) -> [u8; 2] {
    let value = value.min(MAX_DATA_VALUE);
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

/// Builds command byte sequences for one Maestro addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEncoder {
    protocol: Protocol,
    device_number: u8,
    crc: bool,
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self::new(Protocol::Compact, DEFAULT_DEVICE_NUMBER, false)
    }
}

impl CommandEncoder {
    /// Create an encoder
    ///
    /// # Arguments
    ///
    /// * `protocol` - Compact or Pololu addressing
    /// * `device_number` - Target device (Pololu protocol only, 0-127)
    /// * `crc` - Append a CRC-7 byte to every command
    #[must_use]
    pub fn new(protocol: Protocol, device_number: u8, crc: bool) -> Self {
        Self {
            protocol,
            device_number: device_number.min(MAX_DEVICE_NUMBER),
            crc,
        }
    }

    /// Set Target: move `channel` to `target` (quarter-microseconds)
    pub fn set_target(&self, channel: u8, target: u16) -> Vec<u8> {
        self.channel_command(CMD_SET_TARGET, channel, target)
    }

    /// Set Speed: limit how fast `channel` ramps towards its target
    pub fn set_speed(&self, channel: u8, speed: u16) -> Vec<u8> {
        self.channel_command(CMD_SET_SPEED, channel, speed)
    }

    /// Set Acceleration: limit how fast the speed of `channel` changes
    pub fn set_acceleration(&self, channel: u8, acceleration: u16) -> Vec<u8> {
        self.channel_command(CMD_SET_ACCELERATION, channel, acceleration)
    }

    /// Get Errors: the Maestro answers with the error register (2 bytes, LSB first)
    pub fn get_errors(&self) -> Vec<u8> {
        self.encode(CMD_GET_ERRORS, &[])
    }

    /// Go Home: send every channel to its configured home position
    pub fn go_home(&self) -> Vec<u8> {
        self.encode(CMD_GO_HOME, &[])
    }

    fn channel_command(&self, command: u8, channel: u8, value: u16) -> Vec<u8> {
        let [low, high] = split_data_value(value);
        self.encode(command, &[channel, low, high])
    }

    /// Wrap a command byte and its data for the configured protocol
    fn encode(&self, command: u8, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3 + data.len() + 1);

        match self.protocol {
            Protocol::Compact => bytes.push(command),
            Protocol::Pololu => {
                bytes.push(POLOLU_START_BYTE);
                bytes.push(self.device_number);
                bytes.push(command & 0x7F);
            }
        }
        bytes.extend_from_slice(data);

        if self.crc {
            let crc = crc7(&bytes);
            bytes.push(crc);
        }

        bytes
    }
}
