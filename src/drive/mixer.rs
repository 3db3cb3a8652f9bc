//! # Arcade Mixer
//!
//! Mixes a steering axis and a throttle axis into left/right motor powers.
//!
//! ```text
//! v = (1 - |steer|) * drive + drive
//! w = (1 - |drive|) * steer + steer
//! left  =  (v - w) / 2
//! right = -(v + w) / 2
//! ```
//!
//! The right side comes out negated: on a typical chassis the right motors
//! are mounted mirrored, and per-motor [`Direction`](super::Direction)
//! signs undo whatever the wiring does on top of that.
//!
//! Outputs are not clamped here. Inputs outside [-1, 1] are mixed the same
//! way and can produce powers beyond [-1, 1]; actuator channels clamp.

/// Mixed output of the arcade mixer, one power per drive side
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PowerPair {
    pub left: f32,
    pub right: f32,
}

/// Mix `steer` and `drive` (each nominally -1.0 to 1.0) into side powers
///
/// # Examples
///
/// ```
/// use maestro_drive::drive::mixer::{arcade_mix, PowerPair};
///
/// assert_eq!(arcade_mix(0.0, 1.0), PowerPair { left: 1.0, right: -1.0 });
/// assert_eq!(arcade_mix(0.0, 0.0), PowerPair { left: 0.0, right: 0.0 });
/// ```
#[must_use]
pub fn arcade_mix(steer: f32, drive: f32) -> PowerPair {
    let v = (1.0 - steer.abs()) * drive + drive;
    let w = (1.0 - drive.abs()) * steer + steer;

    PowerPair {
        left: (v - w) / 2.0,
        right: -(v + w) / 2.0,
    }
}
