//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files, and turns
//! the validated file into the device layout the robot is built from.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::controller::bindings::Axis;
use crate::drive::{
    check_channel_assignments, Calibration, ChannelSettings, Direction, DriveTrainMotorSpec,
    MotorRole, MotorSide, Responsiveness, SingleActuatorSpec,
};
use crate::error::{DriveError, Result};
use crate::maestro::protocol::{Protocol, MAX_DEVICE_NUMBER};
use crate::robot::RobotLayout;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(rename = "loop", default)]
    pub control_loop: LoopConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Defaults for every channel without its own override
    #[serde(default)]
    pub calibration: CalibrationConfig,

    pub drive_train: DriveTrainConfig,

    pub spinner: Option<MechanismConfig>,
    pub tilter: Option<MechanismConfig>,
    pub releaser: Option<MechanismConfig>,
}

/// Maestro serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Empty means try the default device paths
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub protocol: Protocol,

    /// Only used by the Pololu protocol
    #[serde(default = "default_device_number")]
    pub device_number: u8,

    #[serde(default)]
    pub crc: bool,
}

/// Gamepad configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Empty means auto-detect
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_deadzone_stick")]
    pub deadzone_stick: f32,

    #[serde(default = "default_deadzone_trigger")]
    pub deadzone_trigger: f32,

    #[serde(default)]
    pub expo_steer: f32,

    #[serde(default)]
    pub expo_drive: f32,

    #[serde(default = "default_steer_axis")]
    pub steer_axis: Axis,

    #[serde(default = "default_drive_axis")]
    pub drive_axis: Axis,

    #[serde(default)]
    pub invert_steer: bool,

    #[serde(default)]
    pub invert_drive: bool,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Control loop timing
#[derive(Debug, Deserialize, Clone)]
pub struct LoopConfig {
    #[serde(default = "default_rate_hz")]
    pub rate_hz: u32,

    /// Ticks between status log lines
    #[serde(default = "default_status_interval_ticks")]
    pub status_interval_ticks: u64,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write daily log files here when set
    #[serde(default)]
    pub directory: Option<String>,
}

/// Channel calibration defaults
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationConfig {
    #[serde(default = "default_min")]
    pub min: u16,

    #[serde(default = "default_center")]
    pub center: u16,

    #[serde(default = "default_max")]
    pub max: u16,

    #[serde(default = "default_responsiveness")]
    pub responsiveness: u16,
}

/// Per-channel calibration override; unset fields use `[calibration]`
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct CalibrationOverride {
    pub min: Option<u16>,
    pub center: Option<u16>,
    pub max: Option<u16>,
    pub responsiveness: Option<u16>,
}

/// Drive train motors
#[derive(Debug, Deserialize, Clone)]
pub struct DriveTrainConfig {
    pub motors: Vec<MotorConfig>,
}

/// One drive-train motor
#[derive(Debug, Deserialize, Clone)]
pub struct MotorConfig {
    pub channel: u8,
    pub side: MotorSide,
    pub direction: Direction,

    #[serde(default)]
    pub calibration: Option<CalibrationOverride>,
}

/// A spinner, tilter or releaser
#[derive(Debug, Deserialize, Clone)]
pub struct MechanismConfig {
    pub channel: u8,

    #[serde(default = "default_direction")]
    pub direction: Direction,

    #[serde(default)]
    pub calibration: Option<CalibrationOverride>,
}

// Default value functions
fn default_baud_rate() -> u32 { crate::serial::DEFAULT_BAUD_RATE }
fn default_timeout_ms() -> u64 { 100 }
fn default_device_number() -> u8 { crate::maestro::protocol::DEFAULT_DEVICE_NUMBER }

fn default_deadzone_stick() -> f32 { 0.1 }
fn default_deadzone_trigger() -> f32 { 0.05 }
fn default_steer_axis() -> Axis { Axis::LeftX }
fn default_drive_axis() -> Axis { Axis::LeftY }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_rate_hz() -> u32 { 50 }
fn default_status_interval_ticks() -> u64 { 500 }

fn default_log_level() -> String { "info".to_string() }

fn default_min() -> u16 { crate::drive::actuator::DEFAULT_MIN }
fn default_center() -> u16 { crate::drive::actuator::DEFAULT_CENTER }
fn default_max() -> u16 { crate::drive::actuator::DEFAULT_MAX }
fn default_responsiveness() -> u16 { crate::drive::actuator::DEFAULT_RESPONSIVENESS }

fn default_direction() -> Direction { Direction::Forward }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            protocol: Protocol::default(),
            device_number: default_device_number(),
            crc: false,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            deadzone_stick: default_deadzone_stick(),
            deadzone_trigger: default_deadzone_trigger(),
            expo_steer: 0.0,
            expo_drive: 0.0,
            steer_axis: default_steer_axis(),
            drive_axis: default_drive_axis(),
            invert_steer: false,
            invert_drive: false,
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            status_interval_ticks: default_status_interval_ticks(),
        }
    }
}

impl LoopConfig {
    /// Time between ticks
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.rate_hz.max(1)))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min: default_min(),
            center: default_center(),
            max: default_max(),
            responsiveness: default_responsiveness(),
        }
    }
}

impl CalibrationConfig {
    /// Channel settings for `channel`, applying an optional override
    ///
    /// # Errors
    ///
    /// `InvalidCalibration` if the merged values are not strictly ordered
    pub fn settings_for(
        &self,
        channel: u8,
        overrides: Option<&CalibrationOverride>,
    ) -> Result<ChannelSettings> {
        let o = overrides.copied().unwrap_or_default();
        let calibration = Calibration::new(
            o.min.unwrap_or(self.min),
            o.center.unwrap_or(self.center),
            o.max.unwrap_or(self.max),
        )?;

        Ok(ChannelSettings {
            channel,
            calibration,
            responsiveness: Responsiveness::new(o.responsiveness.unwrap_or(self.responsiveness)),
        })
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails (including a direction other than 1 or -1)
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use maestro_drive::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of its valid range, a calibration
    /// is not strictly ordered, or a channel is out of range or assigned
    /// twice.
    pub fn validate(&self) -> Result<()> {
        // Serial
        if !(300..=200_000).contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be between 300 and 200000"));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.device_number > MAX_DEVICE_NUMBER {
            return Err(invalid("device_number must be between 0 and 127"));
        }

        // Controller
        for (name, value) in [
            ("deadzone_stick", self.controller.deadzone_stick),
            ("deadzone_trigger", self.controller.deadzone_trigger),
        ] {
            if !(0.0..=0.5).contains(&value) {
                return Err(invalid(format!("{} must be between 0.0 and 0.5", name)));
            }
        }

        for (name, value) in [
            ("expo_steer", self.controller.expo_steer),
            ("expo_drive", self.controller.expo_drive),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{} must be between 0.0 and 1.0", name)));
            }
        }

        if self.controller.reconnect_interval_ms == 0
            || self.controller.reconnect_interval_ms > 60000
        {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        // Loop
        if self.control_loop.rate_hz == 0 || self.control_loop.rate_hz > 500 {
            return Err(invalid("rate_hz must be between 1 and 500"));
        }

        if self.control_loop.status_interval_ticks == 0 {
            return Err(invalid("status_interval_ticks must be greater than 0"));
        }

        // Logging
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(invalid(format!("unknown log level '{}'", self.logging.level)));
        }

        if matches!(&self.logging.directory, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging directory cannot be empty when set"));
        }

        // Devices
        self.layout().map(|_| ())
    }

    /// Every channel id in use, drive train first
    pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
        self.drive_train
            .motors
            .iter()
            .map(|motor| motor.channel)
            .chain(
                [&self.spinner, &self.tilter, &self.releaser]
                    .into_iter()
                    .flatten()
                    .map(|mechanism| mechanism.channel),
            )
    }

    /// Builds the device records the robot is opened from
    ///
    /// # Errors
    ///
    /// `InvalidConfig` without drive-train motors, `ChannelOutOfRange` or
    /// `DuplicateChannel` for bad channel assignments, `InvalidCalibration`
    /// for any channel whose merged calibration is not strictly ordered.
    pub fn layout(&self) -> Result<RobotLayout> {
        if self.drive_train.motors.is_empty() {
            return Err(invalid("drive_train needs at least one motor"));
        }

        check_channel_assignments(self.channels())?;

        let drive_train = self
            .drive_train
            .motors
            .iter()
            .map(|motor| {
                Ok(DriveTrainMotorSpec {
                    settings: self
                        .calibration
                        .settings_for(motor.channel, motor.calibration.as_ref())?,
                    role: MotorRole {
                        side: motor.side,
                        direction: motor.direction,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let single = |mechanism: &Option<MechanismConfig>| -> Result<Option<SingleActuatorSpec>> {
            mechanism
                .as_ref()
                .map(|m| {
                    Ok(SingleActuatorSpec {
                        settings: self.calibration.settings_for(m.channel, m.calibration.as_ref())?,
                        direction: m.direction,
                    })
                })
                .transpose()
        };

        Ok(RobotLayout {
            drive_train,
            spinner: single(&self.spinner)?,
            tilter: single(&self.tilter)?,
            releaser: single(&self.releaser)?,
        })
    }
}

fn invalid(message: impl Into<String>) -> DriveError {
    DriveError::InvalidConfig(message.into())
}
