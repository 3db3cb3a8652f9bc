//! # Serial Communication Module
//!
//! Handles serial communication with the Maestro USB command port.
//!
//! This module handles:
//! - Opening the Maestro command port (auto-detect or configured path)
//! - Writing encoded servo commands
//! - Reading the controller's error register

use std::io::{Read, Write};
use std::time::Duration;

use tokio_serial::SerialPort;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{DriveError, Result};
use crate::maestro::encoder::CommandEncoder;
use crate::maestro::ServoController;

/// Default baud rate (ignored by the USB command port, used on the TTL port)
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default Maestro device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // Command port of the first Maestro
    "/dev/ttyACM1", // Command port when another CDC device enumerated first
];

/// Maestro Serial Port Handler
///
/// Implements [`ServoController`] by writing encoded commands to the port.
/// Generic over the port so tests can substitute an in-memory stream.
pub struct MaestroSerial<P = Box<dyn SerialPort>> {
    /// Serial port handle
    port: P,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
    /// Protocol-specific command builder
    encoder: CommandEncoder,
}

impl<P> std::fmt::Debug for MaestroSerial<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaestroSerial")
            .field("device_path", &self.device_path)
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

impl MaestroSerial {
    /// Open the Maestro described by the `[serial]` configuration
    ///
    /// An empty `port` auto-detects by trying the default paths.
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if none of the candidate paths opens
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use maestro_drive::config::Config;
    /// use maestro_drive::serial::MaestroSerial;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// let maestro = MaestroSerial::open(&config.serial)?;
    /// println!("Maestro at {}", maestro.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let encoder = CommandEncoder::new(config.protocol, config.device_number, config.crc);
        let timeout = Duration::from_millis(config.timeout_ms);

        if config.port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate, timeout, encoder)
        } else {
            Self::open_with_paths(&[config.port.as_str()], config.baud_rate, timeout, encoder)
        }
    }

    /// Open the first path in `paths` that succeeds
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Line speed
    /// * `timeout` - Read/write timeout
    /// * `encoder` - Command encoder for the configured protocol
    pub fn open_with_paths(
        paths: &[&str],
        baud_rate: u32,
        timeout: Duration,
        encoder: CommandEncoder,
    ) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate, timeout) {
                Ok(port) => {
                    info!("Successfully opened Maestro at {}", path);
                    return Ok(Self::from_port(port, *path, encoder));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(DriveError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port, 8N1 without flow control
    fn open_port(path: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| DriveError::Serial(format!("Failed to open {}: {}", path, e)))
    }
}

impl<P> MaestroSerial<P> {
    /// Wrap an already-open port
    pub fn from_port(port: P, device_path: impl Into<String>, encoder: CommandEncoder) -> Self {
        Self {
            port,
            device_path: device_path.into(),
            encoder,
        }
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl<P: Write> MaestroSerial<P> {
    /// Write one encoded command and flush it to the device
    fn send(&mut self, command: &[u8]) -> Result<()> {
        self.port
            .write_all(command)
            .map_err(|e| DriveError::Serial(format!("Failed to write command: {}", e)))?;

        self.port
            .flush()
            .map_err(|e| DriveError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent Maestro command {:02x?}", command);
        Ok(())
    }

    /// Send every channel to its home position as configured on the Maestro
    pub fn go_home(&mut self) -> Result<()> {
        let command = self.encoder.go_home();
        self.send(&command)
    }
}

impl<P: Read + Write> MaestroSerial<P> {
    /// Read and clear the Maestro error register
    ///
    /// # Returns
    ///
    /// * `Result<u16>` - Error bits, see [`crate::maestro::protocol::error_bits`]
    pub fn read_errors(&mut self) -> Result<u16> {
        let command = self.encoder.get_errors();
        self.send(&command)?;

        let mut response = [0u8; 2];
        self.port
            .read_exact(&mut response)
            .map_err(|e| DriveError::Serial(format!("Failed to read error register: {}", e)))?;

        Ok(u16::from_le_bytes(response))
    }
}

impl<P: Write> ServoController for MaestroSerial<P> {
    fn set_target(&mut self, channel: u8, target: u16) -> Result<()> {
        let command = self.encoder.set_target(channel, target);
        self.send(&command)
    }

    fn set_speed(&mut self, channel: u8, speed: u16) -> Result<()> {
        let command = self.encoder.set_speed(channel, speed);
        self.send(&command)
    }

    fn set_acceleration(&mut self, channel: u8, acceleration: u16) -> Result<()> {
        let command = self.encoder.set_acceleration(channel, acceleration);
        self.send(&command)
    }
}
