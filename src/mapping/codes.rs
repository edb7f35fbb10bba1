//! Linux input event codes used by the virtual devices
//!
//! Values match `linux/input-event-codes.h`. They are kept as plain `u16`
//! so the mapping layer stays independent of the uinput backend.

// ============================================================================
// Absolute axes
// ============================================================================

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_RX: u16 = 0x03;
pub const ABS_RY: u16 = 0x04;
pub const ABS_RZ: u16 = 0x05;

/// Axis codes in daemon order (tx, ty, tz, rx, ry, rz)
pub const MOTION_AXES: [u16; 6] = [ABS_X, ABS_Y, ABS_Z, ABS_RX, ABS_RY, ABS_RZ];

// ============================================================================
// Misc and mouse buttons
// ============================================================================

pub const BTN_MISC: u16 = 0x100;

pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_SIDE: u16 = 0x113;
pub const BTN_EXTRA: u16 = 0x114;
pub const BTN_FORWARD: u16 = 0x115;

pub const BTN_GEAR_UP: u16 = 0x151;

// ============================================================================
// Gamepad buttons
// ============================================================================

pub const BTN_A: u16 = 0x130;
pub const BTN_B: u16 = 0x131;
pub const BTN_X: u16 = 0x133;
pub const BTN_Y: u16 = 0x134;
pub const BTN_TL: u16 = 0x136;
pub const BTN_TR: u16 = 0x137;
pub const BTN_TL2: u16 = 0x138;
pub const BTN_TR2: u16 = 0x139;
pub const BTN_SELECT: u16 = 0x13a;
pub const BTN_START: u16 = 0x13b;
pub const BTN_THUMBL: u16 = 0x13d;
pub const BTN_THUMBR: u16 = 0x13e;

pub const BTN_DPAD_UP: u16 = 0x220;
pub const BTN_DPAD_DOWN: u16 = 0x221;
pub const BTN_DPAD_LEFT: u16 = 0x222;
pub const BTN_DPAD_RIGHT: u16 = 0x223;

pub const BTN_TRIGGER_HAPPY1: u16 = 0x2c0;

/// `BTN_TRIGGER_HAPPY<n>`, n starting at 1
pub const fn trigger_happy(n: u16) -> u16 {
    BTN_TRIGGER_HAPPY1 + n - 1
}

// ============================================================================
// Identity
// ============================================================================

/// `BUS_USB` from `linux/input.h`
pub const BUS_USB: u16 = 0x03;

/// Axis range declared for both device kinds
pub const AXIS_MIN: i32 = -32767;
pub const AXIS_MAX: i32 = 32767;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_happy_codes() {
        assert_eq!(trigger_happy(1), 0x2c0);
        assert_eq!(trigger_happy(4), 0x2c3);
        assert_eq!(trigger_happy(26), 0x2d9);
    }
}
