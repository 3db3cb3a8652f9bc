//! # Maestro Protocol Constants and Types
//!
//! Command bytes and limits of the Pololu Maestro serial interface.

use serde::Deserialize;

/// Set Target command (compact protocol)
pub const CMD_SET_TARGET: u8 = 0x84;

/// Set Speed command (compact protocol)
pub const CMD_SET_SPEED: u8 = 0x87;

/// Set Acceleration command (compact protocol)
pub const CMD_SET_ACCELERATION: u8 = 0x89;

/// Get Errors command (compact protocol), answered with two bytes
pub const CMD_GET_ERRORS: u8 = 0xA1;

/// Go Home command (compact protocol)
pub const CMD_GO_HOME: u8 = 0xA2;

/// First byte of every Pololu protocol command
pub const POLOLU_START_BYTE: u8 = 0xAA;

/// Factory default device number
pub const DEFAULT_DEVICE_NUMBER: u8 = 12;

/// Largest device number addressable with the Pololu protocol
pub const MAX_DEVICE_NUMBER: u8 = 127;

/// Number of channels on the largest Maestro (Mini Maestro 24)
pub const MAX_CHANNELS: u8 = 24;

/// Targets, speeds and accelerations are sent as two 7-bit data bytes
pub const MAX_DATA_VALUE: u16 = 0x3FFF;

/// Serial wire protocol used to address the Maestro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Bare command byte; any Maestro on the line responds
    Compact,
    /// `0xAA`, device number, then the command byte with its MSB cleared
    Pololu,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Compact
    }
}

/// Maestro error register bits, as reported by Get Errors
pub mod error_bits {
    pub const SERIAL_SIGNAL: u16 = 1 << 0;
    pub const SERIAL_OVERRUN: u16 = 1 << 1;
    pub const SERIAL_BUFFER_FULL: u16 = 1 << 2;
    pub const SERIAL_CRC: u16 = 1 << 3;
    pub const SERIAL_PROTOCOL: u16 = 1 << 4;
    pub const SERIAL_TIMEOUT: u16 = 1 << 5;
    pub const SCRIPT_STACK: u16 = 1 << 6;
    pub const SCRIPT_CALL_STACK: u16 = 1 << 7;
    pub const SCRIPT_PROGRAM_COUNTER: u16 = 1 << 8;
}

/// Describe the bits set in a Maestro error register value
pub fn describe_errors(errors: u16) -> Vec<&'static str> {
    const NAMES: [(u16, &str); 9] = [
        (error_bits::SERIAL_SIGNAL, "serial signal"),
        (error_bits::SERIAL_OVERRUN, "serial overrun"),
        (error_bits::SERIAL_BUFFER_FULL, "serial buffer full"),
        (error_bits::SERIAL_CRC, "serial CRC"),
        (error_bits::SERIAL_PROTOCOL, "serial protocol"),
        (error_bits::SERIAL_TIMEOUT, "serial timeout"),
        (error_bits::SCRIPT_STACK, "script stack"),
        (error_bits::SCRIPT_CALL_STACK, "script call stack"),
        (error_bits::SCRIPT_PROGRAM_COUNTER, "script program counter"),
    ];

    NAMES
        .iter()
        .filter(|(bit, _)| errors & bit != 0)
        .map(|&(_, name)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes_have_msb_set() {
        for cmd in [CMD_SET_TARGET, CMD_SET_SPEED, CMD_SET_ACCELERATION, CMD_GET_ERRORS, CMD_GO_HOME] {
            assert_eq!(cmd & 0x80, 0x80, "command 0x{:02x} must have MSB set", cmd);
        }
    }

    #[test]
    fn test_default_protocol_is_compact() {
        assert_eq!(Protocol::default(), Protocol::Compact);
    }

    #[test]
    fn test_describe_no_errors() {
        assert!(describe_errors(0).is_empty());
    }

    #[test]
    fn test_describe_multiple_errors() {
        let names = describe_errors(error_bits::SERIAL_CRC | error_bits::SERIAL_TIMEOUT);
        assert_eq!(names, vec!["serial CRC", "serial timeout"]);
    }
}
