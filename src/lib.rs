//! # Maestro Drive Library
//!
//! Drive a multi-motor robot from a gamepad through a Pololu Maestro servo
//! controller.
//!
//! Each tick, the gamepad's steer and speed axes are arcade-mixed into
//! left/right powers, signed per motor, and mapped through each channel's
//! min/center/max calibration to Maestro pulse-width targets. Auxiliary
//! mechanisms (spinner, tilter, releaser) take a single input each.

pub mod config;
pub mod control_loop;
pub mod controller;
pub mod drive;
pub mod error;
pub mod maestro;
pub mod robot;
pub mod serial;
