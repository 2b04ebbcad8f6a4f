// src/io/gamepad/map.rs
//
// Static table mapping recognised evdev (type, code) pairs to address
// suffixes. One declarative table instead of a per-input handler; inputs not
// listed here are dropped by the reader before they reach the channel.

use std::collections::HashMap;

use evdev::{AbsoluteAxisType, EventType, Key};
use once_cell::sync::Lazy;

static EVENT_NAMES: Lazy<HashMap<(u16, u16), &'static str>> = Lazy::new(|| {
    let abs = EventType::ABSOLUTE.0;
    let key = EventType::KEY.0;
    HashMap::from([
        // Sticks and triggers
        ((abs, AbsoluteAxisType::ABS_X.0), "ABS_X"),
        ((abs, AbsoluteAxisType::ABS_Y.0), "ABS_Y"),
        ((abs, AbsoluteAxisType::ABS_Z.0), "ABS_Z"),
        ((abs, AbsoluteAxisType::ABS_RZ.0), "ABS_RZ"),
        ((abs, AbsoluteAxisType::ABS_BRAKE.0), "ABS_BRAKE"),
        ((abs, AbsoluteAxisType::ABS_GAS.0), "ABS_GAS"),
        // D-pad
        ((abs, AbsoluteAxisType::ABS_HAT0X.0), "ABS_HAT0X"),
        ((abs, AbsoluteAxisType::ABS_HAT0Y.0), "ABS_HAT0Y"),
        // Buttons
        ((key, Key::BTN_TL.code()), "BTN_TL"),
        ((key, Key::BTN_TR.code()), "BTN_TR"),
        ((key, Key::BTN_SELECT.code()), "BTN_SELECT"),
        ((key, Key::BTN_START.code()), "BTN_START"),
        ((key, Key::BTN_NORTH.code()), "BTN_NORTH"),
        ((key, Key::BTN_EAST.code()), "BTN_EAST"),
        ((key, Key::BTN_SOUTH.code()), "BTN_SOUTH"),
        ((key, Key::BTN_WEST.code()), "BTN_WEST"),
    ])
});

/// Address suffix for a recognised input, or `None` for anything untracked
/// (sync reports, misc axes, rumble echoes).
pub fn event_name(event_type: u16, code: u16) -> Option<&'static str> {
    EVENT_NAMES.get(&(event_type, code)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_axis_and_button() {
        assert_eq!(
            event_name(EventType::ABSOLUTE.0, AbsoluteAxisType::ABS_X.0),
            Some("ABS_X")
        );
        assert_eq!(
            event_name(EventType::KEY.0, Key::BTN_SOUTH.code()),
            Some("BTN_SOUTH")
        );
    }

    #[test]
    fn test_unrecognised_events_are_none() {
        assert_eq!(event_name(EventType::SYNCHRONIZATION.0, 0), None);
        assert_eq!(event_name(EventType::KEY.0, Key::KEY_A.code()), None);
    }
}
