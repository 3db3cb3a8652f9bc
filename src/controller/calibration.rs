//! # Input Calibration Module
//!
//! Normalizes raw evdev axis values and shapes them with a deadzone and an
//! exponential curve.
//!
//! ## Normalization
//!
//! Gamepads report each absolute axis in a device-specific range (an Xbox
//! pad reports sticks as -32768..32767 and triggers as 0..1023 or 0..255).
//! [`AxisRange`] maps a stick into -1.0..1.0 and a trigger into 0.0..1.0
//! using the range the device advertises.
//!
//! ## Deadzone
//!
//! Values within the deadzone map to 0.0 so a resting stick never creeps
//! the robot. The remaining travel is rescaled to keep full deflection.
//!
//! ## Exponential Curves
//!
//! `output = (1 - expo) * input + expo * input³`
//!
//! - `expo = 0.0`: Linear response
//! - `expo = 0.5`: Softer around center, useful for fine steering
//!
//! ```
//! use maestro_drive::controller::calibration::Shaping;
//!
//! let shaping = Shaping::new(0.1, 0.0);
//! assert_eq!(shaping.apply(0.05), 0.0);
//! assert!((shaping.apply(1.0) - 1.0).abs() < 0.001);
//! ```

/// Largest deadzone accepted
pub const MAX_DEADZONE: f32 = 0.5;

/// Applies deadzone and exponential curve to a normalized input.
///
/// Input and output are in the range -1.0 to 1.0, where 0.0 is center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shaping {
    /// Deadzone as a fraction (0.0 to 0.5).
    deadzone: f32,
    /// Exponential curve factor (0.0 to 1.0).
    expo: f32,
}

impl Default for Shaping {
    fn default() -> Self {
        Self {
            deadzone: 0.1,
            expo: 0.0,
        }
    }
}

impl Shaping {
    /// Creates a shaping with the given deadzone and expo.
    ///
    /// # Arguments
    ///
    /// * `deadzone` - Deadzone fraction (0.0 to 0.5). Values outside this range are clamped.
    /// * `expo` - Exponential curve factor (0.0 to 1.0). 0.0 = linear.
    #[must_use]
    pub fn new(deadzone: f32, expo: f32) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, MAX_DEADZONE),
            expo: expo.clamp(0.0, 1.0),
        }
    }

    /// No deadzone, no expo.
    #[must_use]
    pub fn linear() -> Self {
        Self {
            deadzone: 0.0,
            expo: 0.0,
        }
    }

    #[must_use]
    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    #[must_use]
    pub fn expo(&self) -> f32 {
        self.expo
    }

    /// Applies deadzone and expo curve to a normalized input.
    ///
    /// Inputs beyond ±1.0 are clamped first.
    #[must_use]
    pub fn apply(&self, input: f32) -> f32 {
        if !input.is_finite() {
            return 0.0;
        }

        let sign = input.signum();
        let magnitude = input.abs().min(1.0);

        sign * self.apply_expo(apply_deadzone(magnitude, self.deadzone))
    }

    #[inline]
    fn apply_expo(&self, input: f32) -> f32 {
        if self.expo == 0.0 {
            input
        } else {
            (1.0 - self.expo) * input + self.expo * input * input * input
        }
    }
}

/// Applies a deadzone to a trigger value (0.0 to 1.0).
///
/// # Examples
///
/// ```
/// use maestro_drive::controller::calibration::apply_trigger_deadzone;
///
/// assert_eq!(apply_trigger_deadzone(0.03, 0.05), 0.0);
/// assert!((apply_trigger_deadzone(1.0, 0.05) - 1.0).abs() < 0.001);
/// ```
#[must_use]
pub fn apply_trigger_deadzone(input: f32, deadzone: f32) -> f32 {
    if !input.is_finite() {
        return 0.0;
    }
    apply_deadzone(input.clamp(0.0, 1.0), deadzone.clamp(0.0, MAX_DEADZONE))
}

/// Maps values within `deadzone` to 0, and scales the rest to 0..1.
#[inline]
fn apply_deadzone(magnitude: f32, deadzone: f32) -> f32 {
    if magnitude <= deadzone {
        0.0
    } else {
        (magnitude - deadzone) / (1.0 - deadzone)
    }
}

/// Raw value range of one absolute axis, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    /// Xbox-style stick range
    pub const STICK: AxisRange = AxisRange {
        min: -32768,
        max: 32767,
    };

    /// Xbox One trigger range (10-bit)
    pub const TRIGGER: AxisRange = AxisRange { min: 0, max: 1023 };

    /// Returns `None` for an empty or inverted range.
    #[must_use]
    pub fn new(min: i32, max: i32) -> Option<Self> {
        (max > min).then_some(Self { min, max })
    }

    /// Converts a raw stick value to -1.0..1.0, midpoint at 0.0.
    ///
    /// # Examples
    ///
    /// ```
    /// use maestro_drive::controller::calibration::AxisRange;
    ///
    /// let range = AxisRange::new(0, 255).unwrap();
    /// assert!((range.normalize(0) - (-1.0)).abs() < 0.01);
    /// assert!((range.normalize(255) - 1.0).abs() < 0.01);
    /// ```
    #[must_use]
    pub fn normalize(&self, raw: i32) -> f32 {
        let min = self.min as f32;
        let max = self.max as f32;
        let mid = (min + max) / 2.0;
        let half_span = (max - min) / 2.0;

        ((raw as f32 - mid) / half_span).clamp(-1.0, 1.0)
    }

    /// Converts a raw trigger value to 0.0..1.0.
    #[must_use]
    pub fn normalize_unipolar(&self, raw: i32) -> f32 {
        let min = self.min as f32;
        let max = self.max as f32;

        ((raw as f32 - min) / (max - min)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Shaping Tests ====================

    #[test]
    fn test_shaping_new() {
        let shaping = Shaping::new(0.05, 0.3);
        assert!((shaping.deadzone() - 0.05).abs() < 0.001);
        assert!((shaping.expo() - 0.3).abs() < 0.001);
    }

    #[test]
    fn test_shaping_linear() {
        let shaping = Shaping::linear();
        assert_eq!(shaping.apply(0.5), 0.5);
        assert_eq!(shaping.apply(-0.25), -0.25);
    }

    #[test]
    fn test_shaping_clamps_parameters() {
        let shaping = Shaping::new(0.9, 1.5);
        assert_eq!(shaping.deadzone(), MAX_DEADZONE);
        assert_eq!(shaping.expo(), 1.0);

        let shaping = Shaping::new(-0.1, -0.5);
        assert_eq!(shaping.deadzone(), 0.0);
        assert_eq!(shaping.expo(), 0.0);
    }

    #[test]
    fn test_deadzone_within_zone() {
        let shaping = Shaping::new(0.1, 0.0);
        assert_eq!(shaping.apply(0.05), 0.0);
        assert_eq!(shaping.apply(-0.1), 0.0);
    }

    #[test]
    fn test_deadzone_scaling() {
        let shaping = Shaping::new(0.1, 0.0);
        assert!((shaping.apply(0.55) - 0.5).abs() < 0.01);
        assert!((shaping.apply(-0.55) - (-0.5)).abs() < 0.01);
        assert!((shaping.apply(1.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_expo_reduces_small_inputs_and_keeps_endpoints() {
        let shaping = Shaping::new(0.0, 0.5);
        assert!(shaping.apply(0.3) < 0.3);
        assert!((shaping.apply(1.0) - 1.0).abs() < 0.001);
        assert!((shaping.apply(-1.0) - (-1.0)).abs() < 0.001);
        assert!((shaping.apply(0.5) + shaping.apply(-0.5)).abs() < 0.001);
    }

    #[test]
    fn test_shaping_clamps_input() {
        let shaping = Shaping::linear();
        assert_eq!(shaping.apply(1.7), 1.0);
        assert_eq!(shaping.apply(-4.0), -1.0);
        assert_eq!(shaping.apply(f32::NAN), 0.0);
    }

    #[test]
    fn test_trigger_deadzone() {
        assert_eq!(apply_trigger_deadzone(0.05, 0.05), 0.0);
        assert!((apply_trigger_deadzone(0.525, 0.05) - 0.5).abs() < 0.01);
        assert_eq!(apply_trigger_deadzone(-0.2, 0.05), 0.0);
    }

    // ==================== AxisRange Tests ====================

    #[test]
    fn test_axis_range_rejects_empty() {
        assert!(AxisRange::new(0, 0).is_none());
        assert!(AxisRange::new(10, -10).is_none());
    }

    #[test]
    fn test_normalize_stick() {
        let range = AxisRange::STICK;
        assert_eq!(range.normalize(-32768), -1.0);
        assert_eq!(range.normalize(32767), 1.0);
        assert!(range.normalize(0).abs() < 0.001);
        assert!((range.normalize(16384) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_normalize_clamps_outliers() {
        let range = AxisRange::new(0, 255).unwrap();
        assert_eq!(range.normalize(400), 1.0);
        assert_eq!(range.normalize(-20), -1.0);
    }

    #[test]
    fn test_normalize_trigger() {
        let range = AxisRange::TRIGGER;
        assert_eq!(range.normalize_unipolar(0), 0.0);
        assert_eq!(range.normalize_unipolar(1023), 1.0);
        assert!((range.normalize_unipolar(512) - 0.5).abs() < 0.01);
        assert_eq!(range.normalize_unipolar(2000), 1.0);
    }
}
