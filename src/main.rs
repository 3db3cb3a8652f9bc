//! # Maestro Drive
//!
//! Drive a multi-motor robot from a gamepad through a Pololu Maestro.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load and validate the configuration (first argument, default
//!      `config/default.toml`)
//!    - Set up logging with tracing subscriber
//!    - Open the Maestro serial port and report any latched errors
//!    - Open every channel and start the gamepad reader
//!
//! 2. **Main Loop**
//!    - Mix gamepad input into channel targets at `rate_hz`
//!    - Stop everything while the gamepad is disconnected
//!    - Exit on Back or Ctrl+C
//!
//! 3. **Shutdown**
//!    - Stop, then close, every channel
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use maestro_drive::config::{Config, LoggingConfig};
use maestro_drive::control_loop::ControlLoop;
use maestro_drive::controller::{spawn_reader, ControlBindings};
use maestro_drive::maestro::protocol::describe_errors;
use maestro_drive::robot::Robot;
use maestro_drive::serial::MaestroSerial;

/// Configuration used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix for rotated log files
const LOG_FILE_PREFIX: &str = "maestro-drive.log";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging)?;

    info!("Maestro Drive v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let layout = config.layout()?;

    let mut maestro = MaestroSerial::open(&config.serial)?;
    info!("Maestro serial port opened at: {}", maestro.device_path());

    match maestro.read_errors() {
        Ok(0) => info!("Maestro reports no errors"),
        Ok(bits) => warn!(
            "Maestro reports errors 0x{:04x}: {}",
            bits,
            describe_errors(bits).join(", ")
        ),
        Err(e) => warn!("Could not read Maestro errors: {}", e),
    }

    let robot = Robot::open(maestro, &layout)?;
    let bindings = ControlBindings::from_config(&config.controller);
    let mut control_loop = ControlLoop::new(robot, bindings, &config.control_loop);

    let input = spawn_reader(&config.controller);
    info!("Press Back or Ctrl+C to exit");

    let ticks = control_loop.run(input, ctrl_c()).await?;
    info!("Total ticks: {}", ticks);

    Ok(())
}

/// Completes on Ctrl+C; never completes if the handler cannot be installed
async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => {
            warn!("Could not listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Console logging, plus daily log files when a directory is configured
///
/// `RUST_LOG` overrides the configured level. The returned guard flushes
/// the file writer when dropped.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let console = tracing_subscriber::fmt::layer();

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_default_config_loads() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = Config::load(path).unwrap();
        let layout = config.layout().unwrap();
        assert_eq!(layout.drive_train.len(), 4);
        assert!(layout.spinner.is_some());
    }
}
