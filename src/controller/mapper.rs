//! # Controller Input Mapper Module
//!
//! Folds raw evdev events from an Xbox-layout gamepad into a normalized
//! [`ControllerState`].
//!
//! ## Axis Codes (EV_ABS)
//!
//! | Input | evdev Code | Normalized |
//! |-------|------------|------------|
//! | Left Stick X | ABS_X | -1.0 (left) .. 1.0 (right) |
//! | Left Stick Y | ABS_Y | -1.0 (down) .. 1.0 (up) |
//! | Right Stick X | ABS_RX | -1.0 .. 1.0 |
//! | Right Stick Y | ABS_RY | -1.0 (down) .. 1.0 (up) |
//! | Left Trigger | ABS_Z | 0.0 .. 1.0 |
//! | Right Trigger | ABS_RZ | 0.0 .. 1.0 |
//! | D-Pad | ABS_HAT0X / ABS_HAT0Y | pressed / released |
//!
//! evdev reports stick Y growing downwards; it is flipped here so pushing a
//! stick forward reads positive.
//!
//! ## Button Codes (EV_KEY)
//!
//! | Button | evdev Code |
//! |--------|------------|
//! | A | BTN_SOUTH |
//! | B | BTN_EAST |
//! | X | BTN_NORTH |
//! | Y | BTN_WEST |
//! | LB / RB | BTN_TL / BTN_TR |
//! | Back | BTN_SELECT |
//! | Start | BTN_START |
//! | Guide | BTN_MODE |
//! | Stick clicks | BTN_THUMBL / BTN_THUMBR |
//! | D-Pad (some drivers) | BTN_TRIGGER_HAPPY1-4 |
//!
//! A frame is complete at `SYN_REPORT`; [`EventMapper::process_event`]
//! returns `true` then.

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key, Synchronization};

use super::calibration::AxisRange;

/// Snapshot of an Xbox-layout gamepad with normalized analog values.
///
/// # Examples
///
/// ```
/// use maestro_drive::controller::mapper::ControllerState;
///
/// let state = ControllerState::default();
/// assert_eq!(state.left_y, 0.0);
/// assert!(!state.btn_back);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    /// Left stick X, -1.0 = full left
    pub left_x: f32,
    /// Left stick Y, 1.0 = full forward
    pub left_y: f32,
    pub right_x: f32,
    pub right_y: f32,

    /// Left trigger, 0.0 = released
    pub left_trigger: f32,
    pub right_trigger: f32,

    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,

    pub btn_a: bool,
    pub btn_b: bool,
    pub btn_x: bool,
    pub btn_y: bool,
    pub btn_lb: bool,
    pub btn_rb: bool,
    pub btn_back: bool,
    pub btn_start: bool,
    pub btn_guide: bool,
    pub btn_left_thumb: bool,
    pub btn_right_thumb: bool,
}

impl ControllerState {
    /// D-pad vertical as -1, 0 or 1 (up positive)
    #[must_use]
    pub fn dpad_vertical(&self) -> f32 {
        f32::from(u8::from(self.dpad_up)) - f32::from(u8::from(self.dpad_down))
    }
}

/// Raw ranges of the analog axes, taken from the device when it reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRanges {
    pub left_x: AxisRange,
    pub left_y: AxisRange,
    pub right_x: AxisRange,
    pub right_y: AxisRange,
    pub left_trigger: AxisRange,
    pub right_trigger: AxisRange,
}

impl Default for AxisRanges {
    fn default() -> Self {
        Self {
            left_x: AxisRange::STICK,
            left_y: AxisRange::STICK,
            right_x: AxisRange::STICK,
            right_y: AxisRange::STICK,
            left_trigger: AxisRange::TRIGGER,
            right_trigger: AxisRange::TRIGGER,
        }
    }
}

impl AxisRanges {
    /// Range slot for an axis, if the mapper uses it
    pub fn get_mut(&mut self, axis: AbsoluteAxisType) -> Option<&mut AxisRange> {
        match axis {
            AbsoluteAxisType::ABS_X => Some(&mut self.left_x),
            AbsoluteAxisType::ABS_Y => Some(&mut self.left_y),
            AbsoluteAxisType::ABS_RX => Some(&mut self.right_x),
            AbsoluteAxisType::ABS_RY => Some(&mut self.right_y),
            AbsoluteAxisType::ABS_Z => Some(&mut self.left_trigger),
            AbsoluteAxisType::ABS_RZ => Some(&mut self.right_trigger),
            _ => None,
        }
    }
}

/// Accumulates evdev events into a [`ControllerState`].
///
/// Not thread-safe; the reader task owns it.
#[derive(Debug, Default)]
pub struct EventMapper {
    ranges: AxisRanges,
    state: ControllerState,
}

impl EventMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ranges(ranges: AxisRanges) -> Self {
        Self {
            ranges,
            state: ControllerState::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    #[must_use]
    pub fn state_snapshot(&self) -> ControllerState {
        self.state.clone()
    }

    /// Processes one event; returns `true` when it completes a frame.
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => {
                self.process_axis_event(axis, event.value());
                false
            }
            InputEventKind::Key(key) => {
                self.process_key_event(key, event.value() != 0);
                false
            }
            InputEventKind::Synchronization(Synchronization::SYN_REPORT) => true,
            _ => false,
        }
    }

    fn process_axis_event(&mut self, axis: AbsoluteAxisType, value: i32) {
        let ranges = &self.ranges;
        let state = &mut self.state;

        match axis {
            AbsoluteAxisType::ABS_X => state.left_x = ranges.left_x.normalize(value),
            AbsoluteAxisType::ABS_Y => state.left_y = -ranges.left_y.normalize(value),
            AbsoluteAxisType::ABS_RX => state.right_x = ranges.right_x.normalize(value),
            AbsoluteAxisType::ABS_RY => state.right_y = -ranges.right_y.normalize(value),
            AbsoluteAxisType::ABS_Z => {
                state.left_trigger = ranges.left_trigger.normalize_unipolar(value)
            }
            AbsoluteAxisType::ABS_RZ => {
                state.right_trigger = ranges.right_trigger.normalize_unipolar(value)
            }
            AbsoluteAxisType::ABS_HAT0X => {
                state.dpad_left = value < 0;
                state.dpad_right = value > 0;
            }
            AbsoluteAxisType::ABS_HAT0Y => {
                state.dpad_up = value < 0;
                state.dpad_down = value > 0;
            }
            _ => {}
        }
    }

    fn process_key_event(&mut self, key: Key, pressed: bool) {
        let state = &mut self.state;

        match key {
            Key::BTN_SOUTH => state.btn_a = pressed,
            Key::BTN_EAST => state.btn_b = pressed,
            Key::BTN_NORTH => state.btn_x = pressed,
            Key::BTN_WEST => state.btn_y = pressed,

            Key::BTN_TL => state.btn_lb = pressed,
            Key::BTN_TR => state.btn_rb = pressed,

            Key::BTN_SELECT => state.btn_back = pressed,
            Key::BTN_START => state.btn_start = pressed,
            Key::BTN_MODE => state.btn_guide = pressed,

            Key::BTN_THUMBL => state.btn_left_thumb = pressed,
            Key::BTN_THUMBR => state.btn_right_thumb = pressed,

            Key::BTN_TRIGGER_HAPPY1 => state.dpad_left = pressed,
            Key::BTN_TRIGGER_HAPPY2 => state.dpad_right = pressed,
            Key::BTN_TRIGGER_HAPPY3 => state.dpad_up = pressed,
            Key::BTN_TRIGGER_HAPPY4 => state.dpad_down = pressed,

            _ => {}
        }
    }

    /// Back to centered sticks and released buttons
    pub fn reset(&mut self) {
        self.state = ControllerState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    fn axis_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    fn key_event(key: Key, pressed: bool) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), i32::from(pressed))
    }

    fn syn_report() -> InputEvent {
        InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_REPORT.0, 0)
    }

    #[test]
    fn test_default_state_is_neutral() {
        let state = ControllerState::default();
        assert_eq!(state.left_x, 0.0);
        assert_eq!(state.right_trigger, 0.0);
        assert_eq!(state.dpad_vertical(), 0.0);
        assert!(!state.btn_a);
    }

    #[test]
    fn test_left_stick() {
        let mut mapper = EventMapper::new();
        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_X, 32767));
        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_Y, -32768));

        assert_eq!(mapper.state().left_x, 1.0);
        // Pushed up reads positive
        assert_eq!(mapper.state().left_y, 1.0);
    }

    #[test]
    fn test_right_stick_y_flipped() {
        let mut mapper = EventMapper::new();
        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_RY, 32767));
        assert_eq!(mapper.state().right_y, -1.0);
    }

    #[test]
    fn test_triggers() {
        let mut mapper = EventMapper::new();
        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_Z, 1023));
        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_RZ, 0));

        assert_eq!(mapper.state().left_trigger, 1.0);
        assert_eq!(mapper.state().right_trigger, 0.0);
    }

    #[test]
    fn test_custom_ranges() {
        let ranges = AxisRanges {
            left_trigger: AxisRange::new(0, 255).unwrap(),
            ..AxisRanges::default()
        };
        let mut mapper = EventMapper::with_ranges(ranges);
        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_Z, 255));
        assert_eq!(mapper.state().left_trigger, 1.0);
    }

    #[test]
    fn test_hat_dpad() {
        let mut mapper = EventMapper::new();
        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_HAT0Y, -1));
        assert!(mapper.state().dpad_up);
        assert_eq!(mapper.state().dpad_vertical(), 1.0);

        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_HAT0Y, 1));
        assert!(!mapper.state().dpad_up);
        assert_eq!(mapper.state().dpad_vertical(), -1.0);

        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_HAT0X, 1));
        assert!(mapper.state().dpad_right);

        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_HAT0Y, 0));
        assert_eq!(mapper.state().dpad_vertical(), 0.0);
    }

    #[test]
    fn test_button_dpad() {
        let mut mapper = EventMapper::new();
        mapper.process_event(&key_event(Key::BTN_TRIGGER_HAPPY4, true));
        assert!(mapper.state().dpad_down);
        mapper.process_event(&key_event(Key::BTN_TRIGGER_HAPPY4, false));
        assert!(!mapper.state().dpad_down);
    }

    #[test]
    fn test_face_and_system_buttons() {
        let mut mapper = EventMapper::new();
        for key in [Key::BTN_SOUTH, Key::BTN_EAST, Key::BTN_NORTH, Key::BTN_WEST, Key::BTN_SELECT] {
            mapper.process_event(&key_event(key, true));
        }

        let state = mapper.state();
        assert!(state.btn_a && state.btn_b && state.btn_x && state.btn_y);
        assert!(state.btn_back);
        assert!(!state.btn_start);

        mapper.process_event(&key_event(Key::BTN_SELECT, false));
        assert!(!mapper.state().btn_back);
    }

    #[test]
    fn test_frame_completes_on_syn_report() {
        let mut mapper = EventMapper::new();
        assert!(!mapper.process_event(&axis_event(AbsoluteAxisType::ABS_X, 100)));
        assert!(!mapper.process_event(&key_event(Key::BTN_SOUTH, true)));
        assert!(mapper.process_event(&syn_report()));
    }

    #[test]
    fn test_unknown_events_ignored() {
        let mut mapper = EventMapper::new();
        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_MISC, 500));
        mapper.process_event(&key_event(Key::KEY_A, true));
        assert_eq!(mapper.state(), &ControllerState::default());
    }

    #[test]
    fn test_reset() {
        let mut mapper = EventMapper::new();
        mapper.process_event(&axis_event(AbsoluteAxisType::ABS_X, 32767));
        mapper.process_event(&key_event(Key::BTN_START, true));
        mapper.reset();
        assert_eq!(mapper.state(), &ControllerState::default());
    }
}
