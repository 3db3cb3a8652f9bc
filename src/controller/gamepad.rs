//! # Gamepad Module
//!
//! Gamepad discovery over evdev and the background reader task that keeps
//! the latest [`ControllerState`] available to the control loop.
//!
//! ## Controller Detection
//!
//! A device qualifies when it is a Microsoft device (vendor `0x045e`) or
//! advertises both `BTN_SOUTH` and `ABS_X`, which covers wired and wireless
//! Xbox pads as well as most clones.
//!
//! ## Reader Task
//!
//! [`spawn_reader`] opens the gamepad, streams its events, and publishes a
//! snapshot after every `SYN_REPORT`. When the device disappears it
//! publishes `None` and retries discovery every `reconnect_interval_ms`.

use evdev::{AbsoluteAxisType, Device, EventStream, Key};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::calibration::AxisRange;
use super::mapper::{AxisRanges, ControllerState, EventMapper};
use super::InputHandle;
use crate::config::ControllerConfig;
use crate::error::{DriveError, Result};

/// Microsoft vendor ID
const MICROSOFT_VENDOR_ID: u16 = 0x045e;

const INPUT_DIR: &str = "/dev/input";

/// An opened gamepad
pub struct Gamepad {
    device: Device,
    device_path: String,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .field("name", &self.device.name())
            .finish()
    }
}

impl Gamepad {
    /// Opens `device_path`, or the first gamepad found when it is empty
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: nothing under `/dev/input` looks like a gamepad
    /// - `Controller`: the configured device cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use maestro_drive::controller::gamepad::Gamepad;
    ///
    /// let gamepad = Gamepad::open("")?;
    /// println!("Using {}", gamepad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(device_path: &str) -> Result<Self> {
        if device_path.is_empty() {
            Self::discover()
        } else {
            Self::open_path(device_path)
        }
    }

    /// Opens a specific event device
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path).map_err(|e| {
            DriveError::Controller(format!("Failed to open {}: {}", path.display(), e))
        })?;

        info!(
            "Opened gamepad {} at {}",
            device.name().unwrap_or("(unnamed)"),
            path.display()
        );

        Ok(Self {
            device,
            device_path: path.to_string_lossy().to_string(),
        })
    }

    /// Scans `/dev/input/event*` in sorted order for the first gamepad
    pub fn discover() -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(INPUT_DIR)
            .map_err(|e| DriveError::Controller(format!("Failed to read {}: {}", INPUT_DIR, e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();

        // Deterministic choice when several pads are plugged in
        paths.sort();

        for path in paths {
            match Device::open(&path) {
                Ok(device) => {
                    let id = device.input_id();
                    debug!(
                        "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                        path.display(),
                        id.vendor(),
                        id.product()
                    );

                    if is_gamepad(&device) {
                        info!(
                            "Found gamepad {} at {}",
                            device.name().unwrap_or("(unnamed)"),
                            path.display()
                        );
                        return Ok(Self {
                            device,
                            device_path: path.to_string_lossy().to_string(),
                        });
                    }
                }
                Err(e) => debug!("Could not open {}: {}", path.display(), e),
            }
        }

        Err(DriveError::ControllerNotFound)
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Axis ranges advertised by the device, falling back to Xbox defaults
    pub fn axis_ranges(&self) -> AxisRanges {
        let mut ranges = AxisRanges::default();

        let Some(supported) = self.device.supported_absolute_axes() else {
            return ranges;
        };
        let abs_state = match self.device.get_abs_state() {
            Ok(state) => state,
            Err(e) => {
                warn!("Could not read axis ranges, using defaults: {}", e);
                return ranges;
            }
        };

        for axis in [
            AbsoluteAxisType::ABS_X,
            AbsoluteAxisType::ABS_Y,
            AbsoluteAxisType::ABS_RX,
            AbsoluteAxisType::ABS_RY,
            AbsoluteAxisType::ABS_Z,
            AbsoluteAxisType::ABS_RZ,
        ] {
            if !supported.contains(axis) {
                continue;
            }
            let info = &abs_state[axis.0 as usize];
            if let (Some(range), Some(slot)) =
                (AxisRange::new(info.minimum, info.maximum), ranges.get_mut(axis))
            {
                *slot = range;
            }
        }

        ranges
    }

    /// Converts the device into an async event stream
    pub fn into_event_stream(self) -> Result<EventStream> {
        self.device.into_event_stream().map_err(|e| {
            DriveError::Controller(format!("Failed to stream {}: {}", self.device_path, e))
        })
    }
}

fn is_gamepad(device: &Device) -> bool {
    if device.input_id().vendor() == MICROSOFT_VENDOR_ID {
        return true;
    }

    let has_south = device
        .supported_keys()
        .map(|keys| keys.contains(Key::BTN_SOUTH))
        .unwrap_or(false);
    let has_stick = device
        .supported_absolute_axes()
        .map(|axes| axes.contains(AbsoluteAxisType::ABS_X))
        .unwrap_or(false);

    has_south && has_stick
}

/// Starts the reader task on the current tokio runtime
///
/// The returned handle reads `None` until a gamepad is connected.
pub fn spawn_reader(config: &ControllerConfig) -> InputHandle {
    let (tx, rx) = watch::channel(None);
    let device_path = config.device_path.clone();
    let retry = Duration::from_millis(config.reconnect_interval_ms);

    let reader = tokio::spawn(read_loop(device_path, retry, tx));
    InputHandle::new(rx, Some(reader))
}

async fn read_loop(
    device_path: String,
    retry: Duration,
    tx: watch::Sender<Option<ControllerState>>,
) {
    let mut reported_missing = false;

    while !tx.is_closed() {
        match connect(&device_path) {
            Ok((mut stream, ranges)) => {
                reported_missing = false;
                let mut mapper = EventMapper::with_ranges(ranges);
                tx.send_replace(Some(mapper.state_snapshot()));

                loop {
                    match stream.next_event().await {
                        Ok(event) => {
                            if mapper.process_event(&event)
                                && tx.send(Some(mapper.state_snapshot())).is_err()
                            {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!("Gamepad read failed: {}", e);
                            break;
                        }
                    }
                }

                tx.send_replace(None);
            }
            Err(e) => {
                if !reported_missing {
                    warn!("Gamepad unavailable, retrying every {:?}: {}", retry, e);
                    reported_missing = true;
                }
            }
        }

        tokio::time::sleep(retry).await;
    }
}

fn connect(device_path: &str) -> Result<(EventStream, AxisRanges)> {
    let gamepad = Gamepad::open(device_path)?;
    let ranges = gamepad.axis_ranges();
    debug!("Axis ranges for {}: {:?}", gamepad.device_path(), ranges);
    Ok((gamepad.into_event_stream()?, ranges))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microsoft_vendor_id() {
        assert_eq!(MICROSOFT_VENDOR_ID, 0x045e);
    }

    #[test]
    fn test_open_missing_path() {
        match Gamepad::open_path("/dev/input/event-does-not-exist") {
            Err(DriveError::Controller(msg)) => assert!(msg.contains("event-does-not-exist")),
            other => panic!("Expected Controller error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reader_reports_disconnected_without_device() {
        let config = ControllerConfig {
            device_path: "/dev/input/event-does-not-exist".to_string(),
            ..ControllerConfig::default()
        };
        let mut handle = spawn_reader(&config);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(handle.current().unwrap(), None);
        handle.close();
    }

    #[test]
    #[ignore] // Requires a connected gamepad
    fn test_discover_gamepad() {
        let gamepad = Gamepad::discover().unwrap();
        assert!(gamepad.device_path().starts_with("/dev/input/event"));
        let ranges = gamepad.axis_ranges();
        assert!(ranges.left_x.max > ranges.left_x.min);
    }
}
