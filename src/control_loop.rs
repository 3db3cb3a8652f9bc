//! # Control Loop Module
//!
//! The periodic loop that samples the gamepad, mixes its inputs and writes
//! the resulting targets to the Maestro.
//!
//! ## Control Flow
//!
//! 1. **Tick** (every `1 / rate_hz`)
//!    - Read the latest controller state
//!    - Connected: drive every device from the operator command
//!    - Disconnected: stop every device, drive nothing
//!    - Back pressed: stop and leave the loop
//!
//! 2. **Teardown** (on every exit path)
//!    - Stop the gamepad reader
//!    - Stop, then close, every device
//!    - Surface the error that ended the loop, if any

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::LoopConfig;
use crate::controller::{ControlBindings, ControllerState, InputHandle};
use crate::error::Result;
use crate::maestro::ServoController;
use crate::robot::Robot;

/// Whether the loop keeps running after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Disable,
}

/// Per-tick logic plus the async runner around it
#[derive(Debug)]
pub struct ControlLoop<S: ServoController> {
    robot: Robot<S>,
    bindings: ControlBindings,
    period: Duration,
    status_interval: u64,
    ticks: u64,
    connected: bool,
}

impl<S: ServoController> ControlLoop<S> {
    #[must_use]
    pub fn new(robot: Robot<S>, bindings: ControlBindings, config: &LoopConfig) -> Self {
        Self {
            robot,
            bindings,
            period: config.period(),
            status_interval: config.status_interval_ticks.max(1),
            ticks: 0,
            connected: false,
        }
    }

    pub fn robot(&self) -> &Robot<S> {
        &self.robot
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one tick against the latest controller state
    ///
    /// Write failures are logged and counted; they never end the loop.
    pub fn tick(&mut self, state: Option<&ControllerState>) -> LoopControl {
        self.ticks += 1;

        let control = match state {
            Some(state) => {
                if !self.connected {
                    info!("Controller connected, driving");
                    self.connected = true;
                }

                let command = self.bindings.map(state);
                if command.disable {
                    info!("Disable pressed, stopping");
                    if let Err(e) = self.robot.stop() {
                        debug!("Stop incomplete: {}", e);
                    }
                    LoopControl::Disable
                } else {
                    if let Err(e) = self.robot.drive(&command) {
                        debug!("Drive incomplete on tick {}: {}", self.ticks, e);
                    }
                    LoopControl::Continue
                }
            }
            None => {
                if self.connected {
                    warn!("Controller disconnected, stopping all devices");
                    self.connected = false;
                }
                if let Err(e) = self.robot.stop() {
                    debug!("Stop incomplete on tick {}: {}", self.ticks, e);
                }
                LoopControl::Continue
            }
        };

        if self.ticks % self.status_interval == 0 {
            info!(
                "Tick {} (controller {}, {} write failures)",
                self.ticks,
                if self.connected { "connected" } else { "disconnected" },
                self.robot.write_failures()
            );
        }

        control
    }

    /// Ticks until disabled, `shutdown` completes or the input source closes
    ///
    /// The input source is closed and the robot shut down before this
    /// returns, whichever way the loop ended.
    ///
    /// # Returns
    ///
    /// The number of ticks run.
    ///
    /// # Errors
    ///
    /// `InputClosed` if the input reader went away mid-run.
    pub async fn run<F>(&mut self, mut input: InputHandle, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Control loop started ({:.0} Hz)",
            1.0 / self.period.as_secs_f64()
        );

        let result = self.run_until_stopped(&mut input, shutdown).await;

        input.close();
        if let Err(e) = self.robot.shutdown() {
            warn!("Shutdown incomplete: {}", e);
        }

        match &result {
            Ok(ticks) => info!("Control loop stopped after {} ticks", ticks),
            Err(e) => error!("Control loop failed after {} ticks: {}", self.ticks, e),
        }

        result
    }

    async fn run_until_stopped<F>(&mut self, input: &mut InputHandle, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let state = input.current()?;
                    if self.tick(state.as_ref()) == LoopControl::Disable {
                        break;
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        Ok(self.ticks)
    }
}
