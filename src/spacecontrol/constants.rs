//! SpaceControl daemon constants
//!
//! This module contains the fixed values of the SpaceControl call interface:
//! - Default library location
//! - Status codes returned by the `sc*` functions
//! - High-level event ids reported in the `event` field
//! - Button bit names for the low-level bitmask

use std::time::Duration;

// ============================================================================
// Library
// ============================================================================

/// Default install location of the SpaceControl client library
pub const DEFAULT_LIBRARY_PATH: &str = "/opt/SpaceControl/lib/libspc_ctrl.so";

/// Device index used for all fetches (first device reported by the daemon)
pub const DEVICE_INDEX: i32 = 0;

/// Delay between two `scFetchStdData` polls when nothing changed
pub const FETCH_POLL_INTERVAL: Duration = Duration::from_millis(2);

// ============================================================================
// Status Codes
// ============================================================================

/// "Nothing changed" marker returned instead of a status or event
pub const NOTHING_CHANGED: i32 = -1;

/// Status codes returned by the SpaceControl library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScStatus {
    Ok,
    CommunicationError,
    WrongDeviceIndex,
    ParameterOutOfRange,
    FileIoError,
    KeystrokeError,
    ApplNotFound,
    RegistryError,
    NotSupported,
    ExecCmdError,
    ThreadError,
    WrongUser,
    Unknown(i32),
}

impl ScStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::CommunicationError,
            2 => Self::WrongDeviceIndex,
            3 => Self::ParameterOutOfRange,
            4 => Self::FileIoError,
            5 => Self::KeystrokeError,
            6 => Self::ApplNotFound,
            7 => Self::RegistryError,
            8 => Self::NotSupported,
            9 => Self::ExecCmdError,
            10 => Self::ThreadError,
            11 => Self::WrongUser,
            other => Self::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ok => "SC_OK",
            Self::CommunicationError => "SC_COMMUNICATION_ERROR",
            Self::WrongDeviceIndex => "SC_WRONG_DEVICE_INDEX",
            Self::ParameterOutOfRange => "SC_PARAMETER_OUT_OF_RANGE",
            Self::FileIoError => "SC_FILE_IO_ERROR",
            Self::KeystrokeError => "SC_KEYSTROKE_ERROR",
            Self::ApplNotFound => "SC_APPL_NOT_FOUND",
            Self::RegistryError => "SC_REGISTRY_ERROR",
            Self::NotSupported => "SC_NOT_SUPPORTED",
            Self::ExecCmdError => "SC_EXEC_CMD_ERROR",
            Self::ThreadError => "SC_THREAD_ERROR",
            Self::WrongUser => "SC_WRONG_USER",
            Self::Unknown(_) => "SC_UNKNOWN",
        }
    }

    /// Statuses after which the session can no longer deliver data
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::WrongDeviceIndex | Self::ThreadError | Self::WrongUser)
    }
}

impl std::fmt::Display for ScStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "SC_UNKNOWN({})", code),
            other => f.write_str(other.name()),
        }
    }
}

// ============================================================================
// High-Level Events
// ============================================================================

/// Event values at or above this threshold are high-level events, not bitmasks
pub const HIGH_LEVEL_EVENT_THRESHOLD: i32 = 0x20000;

pub const DEV_BASIC_SETTINGS_REQ: u32 = 0x20000;
pub const DEV_ADVANCED_SETTINGS_REQ: u32 = 0x20001;
pub const DEV_DEV_PARS_CHANGED: u32 = 0x20002;
pub const DEV_UNKNOWN_COMMAND_BYTE: u32 = 0x20003;
pub const DEV_PARAM_OUT_OF_RANGE: u32 = 0x20004;
pub const DEV_PARSE_ERROR: u32 = 0x20005;
pub const DEV_INTERNAL_DEVICE_ERROR: u32 = 0x20006;
pub const DEV_WRONG_TRANSCEIVER_ID: u32 = 0x20007;
pub const DEV_BUFFER_OVERFLOW: u32 = 0x20008;
pub const DEV_FRONT: u32 = 0x20009;
pub const DEV_RIGHT: u32 = 0x2000A;
pub const DEV_TOP: u32 = 0x2000B;
pub const DEV_FIT: u32 = 0x2000C;
pub const DEV_WHEEL_LEFT: u32 = 0x2000D;
pub const DEV_WHEEL_RIGHT: u32 = 0x2000E;
pub const EVT_HNDL_SENS_DLG: u32 = 0x2000F;
pub const EVT_HNDL_THRESH_DLG: u32 = 0x20010;
pub const EVT_HNDL_LCD_DLG: u32 = 0x20011;
pub const EVT_HNDL_LEDS_DLG: u32 = 0x20012;
pub const EVT_APPL_IN_FRGRND: u32 = 0x20013;
pub const EVT_HNDL_KBD_DLG: u32 = 0x20014;
pub const EVT_HNDL_WFL_DLG: u32 = 0x20015;
pub const DEV_BACK: u32 = 0x20016;
pub const DEV_LEFT: u32 = 0x20017;
pub const DEV_BOTTOM: u32 = 0x20018;
pub const DEV_CTRL: u32 = 0x20019;
pub const APPL_FUNC_START: u32 = 0x20020;

/// Name of a high-level event id, if known
pub fn high_level_event_name(id: u32) -> Option<&'static str> {
    let name = match id {
        DEV_BASIC_SETTINGS_REQ => "DEV_BASIC_SETTINGS_REQ",
        DEV_ADVANCED_SETTINGS_REQ => "DEV_ADVANCED_SETTINGS_REQ",
        DEV_DEV_PARS_CHANGED => "DEV_DEV_PARS_CHANGED",
        DEV_UNKNOWN_COMMAND_BYTE => "DEV_UNKNOWN_COMMAND_BYTE",
        DEV_PARAM_OUT_OF_RANGE => "DEV_PARAM_OUT_OF_RANGE",
        DEV_PARSE_ERROR => "DEV_PARSE_ERROR",
        DEV_INTERNAL_DEVICE_ERROR => "DEV_INTERNAL_DEVICE_ERROR",
        DEV_WRONG_TRANSCEIVER_ID => "DEV_WRONG_TRANSCEIVER_ID",
        DEV_BUFFER_OVERFLOW => "DEV_BUFFER_OVERFLOW",
        DEV_FRONT => "DEV_FRONT",
        DEV_RIGHT => "DEV_RIGHT",
        DEV_TOP => "DEV_TOP",
        DEV_FIT => "DEV_FIT",
        DEV_WHEEL_LEFT => "DEV_WHEEL_LEFT",
        DEV_WHEEL_RIGHT => "DEV_WHEEL_RIGHT",
        EVT_HNDL_SENS_DLG => "EVT_HNDL_SENS_DLG",
        EVT_HNDL_THRESH_DLG => "EVT_HNDL_THRESH_DLG",
        EVT_HNDL_LCD_DLG => "EVT_HNDL_LCD_DLG",
        EVT_HNDL_LEDS_DLG => "EVT_HNDL_LEDS_DLG",
        EVT_APPL_IN_FRGRND => "EVT_APPL_IN_FRGRND",
        EVT_HNDL_KBD_DLG => "EVT_HNDL_KBD_DLG",
        EVT_HNDL_WFL_DLG => "EVT_HNDL_WFL_DLG",
        DEV_BACK => "DEV_BACK",
        DEV_LEFT => "DEV_LEFT",
        DEV_BOTTOM => "DEV_BOTTOM",
        DEV_CTRL => "DEV_CTRL",
        APPL_FUNC_START => "APPL_FUNC_START",
        _ => return None,
    };
    Some(name)
}

// ============================================================================
// Button Bits
// ============================================================================

/// Number of bits in the low-level button mask
pub const BUTTON_BIT_COUNT: u8 = 32;

/// Panel button bit, owned by the daemon
pub const BIT_PANEL: u8 = 15;

/// Menu button bit, owned by the daemon
pub const BIT_MENU: u8 = 16;

/// Offset of the `_B` button variants relative to their primary button
pub const B_VARIANT_OFFSET: u8 = 17;

/// Names of the primary buttons, indexed by bit position (0..=14)
pub const PRIMARY_BUTTON_NAMES: [&str; 15] = [
    "SC_KEY_1", "SC_KEY_2", "SC_KEY_3", "SC_KEY_4", "SC_KEY_5", "SC_KEY_6",
    "SC_KEY_CTRL", "SC_KEY_ALT", "SC_KEY_SHIFT", "SC_KEY_ESC",
    "SC_KEY_FRONT", "SC_KEY_RIGHT", "SC_KEY_TOP", "SC_KEY_FIT", "SC_KEY_2D3D",
];

/// Name of a button bit, or `None` for reserved/unknown bits
pub fn button_bit_name(bit: u8) -> Option<String> {
    match bit {
        0..=14 => Some(PRIMARY_BUTTON_NAMES[bit as usize].to_string()),
        BIT_PANEL | BIT_MENU => None,
        17..=31 => Some(format!("{}_B", PRIMARY_BUTTON_NAMES[(bit - B_VARIANT_OFFSET) as usize])),
        _ => None,
    }
}

/// Render a raw daemon status or event value for log output
pub fn describe_event(value: i32) -> String {
    if value == NOTHING_CHANGED {
        return "NOTHING_CHANGED".to_string();
    }

    if (0..=11).contains(&value) {
        return ScStatus::from_code(value).to_string();
    }

    if value >= HIGH_LEVEL_EVENT_THRESHOLD {
        if let Some(name) = high_level_event_name(value as u32) {
            return name.to_string();
        }
    }

    if value > 0 && value < HIGH_LEVEL_EVENT_THRESHOLD {
        let names: Vec<String> = (0..BUTTON_BIT_COUNT)
            .filter(|bit| (value >> bit) & 1 == 1)
            .filter_map(button_bit_name)
            .collect();

        return if names.is_empty() {
            format!("Key event {}", value)
        } else {
            format!("Key event: {}", names.join(" + "))
        };
    }

    format!("Unknown event {}", value)
}
