//! SpaceControl type definitions
//!
//! Raw payloads as delivered by a daemon session, before decoding.

/// Number of motion axes (tx, ty, tz, rx, ry, rz)
pub const AXIS_COUNT: usize = 6;

/// One `scFetchStdData` sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StdSample {
    /// Translation and rotation values in daemon order: x, y, z, a, b, c
    pub axes: [i16; AXIS_COUNT],

    /// Translation LMH level (unused by the bridge)
    pub tra_lmh: i32,

    /// Rotation LMH level (unused by the bridge)
    pub rot_lmh: i32,

    /// Button bitmask, high-level event id, or zero
    pub event: i32,

    /// Sample timestamp (seconds)
    pub tv_sec: i64,

    /// Sample timestamp (microseconds)
    pub tv_usec: i64,
}

/// Start or end of a daemon high-level event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighLevelEvent {
    pub id: u32,
    pub pressed: bool,
}

impl HighLevelEvent {
    pub fn pressed(id: u32) -> Self {
        Self { id, pressed: true }
    }

    pub fn released(id: u32) -> Self {
        Self { id, pressed: false }
    }
}

/// Raw event produced by a daemon session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// Motion sample, one signed value per axis
    Motion { axes: Vec<i32> },

    /// Button state: full low-level mask plus an optional high-level event edge
    ButtonState {
        mask: u32,
        high_level: Option<HighLevelEvent>,
    },
}

impl RawEvent {
    /// Motion event from a six-axis sample
    pub fn motion(axes: [i32; AXIS_COUNT]) -> Self {
        Self::Motion { axes: axes.to_vec() }
    }

    /// Button event carrying only a bitmask
    pub fn buttons(mask: u32) -> Self {
        Self::ButtonState { mask, high_level: None }
    }

    /// Button event carrying a high-level event edge
    pub fn high_level(event: HighLevelEvent) -> Self {
        Self::ButtonState { mask: 0, high_level: Some(event) }
    }
}

/// Commands a session can forward to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonCommand {
    /// Rumble for the given duration in milliseconds
    Rumble { duration_ms: u32 },

    /// Set LED state as a bitmask
    SetLeds { mask: u32 },
}
