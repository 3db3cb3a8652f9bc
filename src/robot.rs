//! # Robot Module
//!
//! Owns the servo controller and every device built from the layout.
//!
//! Teardown runs exactly once: [`Robot::shutdown`] stops every device,
//! then closes every device, attempting all of them even when some writes
//! fail. If the robot is dropped without an explicit shutdown (a panic
//! unwinding through the control loop, say), `Drop` runs it.

use tracing::{debug, info, warn};

use crate::controller::OperatorCommand;
use crate::drive::{
    check_channel_assignments, Device, DriveTrain, DriveTrainMotorSpec, MechanismKind,
    SingleActuator, SingleActuatorSpec,
};
use crate::error::Result;
use crate::maestro::ServoController;

/// Every device a robot is made of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotLayout {
    pub drive_train: Vec<DriveTrainMotorSpec>,
    pub spinner: Option<SingleActuatorSpec>,
    pub tilter: Option<SingleActuatorSpec>,
    pub releaser: Option<SingleActuatorSpec>,
}

impl RobotLayout {
    /// Every channel in the layout, drive train first
    pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
        self.drive_train
            .iter()
            .map(|motor| motor.settings.channel)
            .chain(
                [&self.spinner, &self.tilter, &self.releaser]
                    .into_iter()
                    .flatten()
                    .map(|spec| spec.settings.channel),
            )
    }
}

/// A drive train plus optional mechanisms sharing one servo controller
#[derive(Debug)]
pub struct Robot<S: ServoController> {
    servo: S,
    drive_train: DriveTrain,
    spinner: Option<SingleActuator>,
    tilter: Option<SingleActuator>,
    releaser: Option<SingleActuator>,
    write_failures: u64,
    shut_down: bool,
}

impl<S: ServoController> Robot<S> {
    /// Opens every device in the layout
    ///
    /// Devices opened before a failure are closed again before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// `ChannelOutOfRange` / `DuplicateChannel` for a bad layout, otherwise
    /// the first device that fails to open.
    pub fn open(mut servo: S, layout: &RobotLayout) -> Result<Self> {
        check_channel_assignments(layout.channels())?;

        let mut drive_train = DriveTrain::open(&mut servo, &layout.drive_train)?;

        let mechanisms = [
            (MechanismKind::Spinner, layout.spinner),
            (MechanismKind::Tilter, layout.tilter),
            (MechanismKind::Releaser, layout.releaser),
        ];
        let mut slots: [Option<SingleActuator>; 3] = Default::default();
        let mut failure = None;

        for (index, (kind, spec)) in mechanisms.into_iter().enumerate() {
            let Some(spec) = spec else { continue };

            match SingleActuator::open(&mut servo, kind, spec) {
                Ok(mechanism) => slots[index] = Some(mechanism),
                Err(e) => {
                    warn!("Failed to open {}: {}", kind, e);
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = failure {
            for mechanism in slots.iter_mut().flatten() {
                let _ = mechanism.close(&mut servo);
            }
            let _ = drive_train.close(&mut servo);
            return Err(e);
        }

        let [spinner, tilter, releaser] = slots;
        info!(
            "Robot ready: {} drive motors, spinner {}, tilter {}, releaser {}",
            drive_train.motors().len(),
            presence(&spinner),
            presence(&tilter),
            presence(&releaser)
        );

        Ok(Self {
            servo,
            drive_train,
            spinner,
            tilter,
            releaser,
            write_failures: 0,
            shut_down: false,
        })
    }

    pub fn servo(&self) -> &S {
        &self.servo
    }

    pub fn drive_train(&self) -> &DriveTrain {
        &self.drive_train
    }

    pub fn mechanism(&self, kind: MechanismKind) -> Option<&SingleActuator> {
        match kind {
            MechanismKind::Spinner => self.spinner.as_ref(),
            MechanismKind::Tilter => self.tilter.as_ref(),
            MechanismKind::Releaser => self.releaser.as_ref(),
        }
    }

    /// Device operations that reported a failed write
    #[must_use]
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Applies one operator command to every device
    ///
    /// Every device is driven even if an earlier one fails; the first
    /// failure is returned. After shutdown every device reports
    /// `ChannelClosed`.
    pub fn drive(&mut self, command: &OperatorCommand) -> Result<()> {
        let servo: &mut dyn ServoController = &mut self.servo;
        let mut first_failure = None;

        if let Err(e) = self.drive_train.drive(servo, command.steer, command.speed) {
            self.write_failures += 1;
            first_failure.get_or_insert(e);
        }

        for (mechanism, amount) in [
            (&mut self.spinner, command.spin),
            (&mut self.tilter, command.tilt),
            (&mut self.releaser, command.release),
        ] {
            if let Some(mechanism) = mechanism {
                if let Err(e) = mechanism.drive(servo, amount) {
                    self.write_failures += 1;
                    first_failure.get_or_insert(e);
                }
            }
        }

        first_failure.map_or(Ok(()), Err)
    }

    /// Stops every device (best effort)
    pub fn stop(&mut self) -> Result<()> {
        self.for_each_device("stop", |device, servo| device.stop(servo))
    }

    /// Stops, then closes, every device. Runs once; later calls do nothing.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        info!("Shutting down: stopping all devices");
        let stopped = self.for_each_device("stop", |device, servo| device.stop(servo));
        let closed = self.for_each_device("close", |device, servo| device.close(servo));
        info!("All devices closed ({} write failures total)", self.write_failures);

        stopped.and(closed)
    }

    fn for_each_device<F>(&mut self, action: &str, mut op: F) -> Result<()>
    where
        F: FnMut(&mut dyn Device, &mut dyn ServoController) -> Result<()>,
    {
        let servo: &mut dyn ServoController = &mut self.servo;
        let mut devices: Vec<&mut dyn Device> = Vec::with_capacity(4);
        devices.push(&mut self.drive_train);
        for mechanism in [&mut self.spinner, &mut self.tilter, &mut self.releaser]
            .into_iter()
            .flatten()
        {
            devices.push(mechanism);
        }

        let mut first_failure = None;
        for device in devices {
            match op(&mut *device, &mut *servo) {
                Ok(()) => debug!("{} {}: ok", action, device.name()),
                Err(e) => {
                    warn!("Failed to {} {}: {}", action, device.name(), e);
                    self.write_failures += 1;
                    first_failure.get_or_insert(e);
                }
            }
        }

        first_failure.map_or(Ok(()), Err)
    }
}

impl<S: ServoController> Drop for Robot<S> {
    fn drop(&mut self) {
        if !self.shut_down {
            warn!("Robot dropped without shutdown, stopping all devices");
            let _ = self.shutdown();
        }
    }
}

fn presence(device: &Option<SingleActuator>) -> &'static str {
    if device.is_some() {
        "present"
    } else {
        "absent"
    }
}
