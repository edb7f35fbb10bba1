//! Backend abstraction for virtual input devices
//!
//! This module provides a unified interface for registering virtual input
//! devices with the operating system and writing event frames to them.

pub mod device;
pub mod mock_device;
#[cfg(target_os = "linux")]
pub mod uinput;

pub use device::{DeviceState, VirtualDevice, VirtualDeviceManager};
pub use mock_device::MockDeviceBackend;
#[cfg(target_os = "linux")]
pub use uinput::UinputBackend;

use crate::mapping::codes::{AXIS_MAX, AXIS_MIN, BUS_USB, MOTION_AXES};
use crate::mapping::tables::MappingTable;
use std::fmt;
use thiserror::Error;

/// Kind of virtual device the bridge can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceKind {
    /// spacenavd-compatible 3D mouse
    Mouse3d,
    /// Generic gamepad
    Gamepad,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 2] = [DeviceKind::Mouse3d, DeviceKind::Gamepad];

    pub fn name(&self) -> &'static str {
        match self {
            DeviceKind::Mouse3d => "3D mouse",
            DeviceKind::Gamepad => "gamepad",
        }
    }

    /// Declared absolute axis range
    pub fn axis_range(&self) -> (i32, i32) {
        (AXIS_MIN, AXIS_MAX)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One absolute axis capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    pub code: u16,
    pub min: i32,
    pub max: i32,
    pub fuzz: i32,
    pub flat: i32,
}

/// Identity and capabilities declared when a device is registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub name: String,
    pub bus: u16,
    pub vendor: u16,
    pub product: u16,
    pub axes: Vec<AxisSpec>,
    pub buttons: Vec<u16>,
}

impl DeviceDescriptor {
    /// Descriptor for `kind`, declaring every button `table` can produce
    pub fn for_kind(kind: DeviceKind, table: &MappingTable) -> Self {
        let (name, vendor, product) = match kind {
            DeviceKind::Mouse3d => ("SpaceController spacenavd", 0x046d, 0xc627),
            DeviceKind::Gamepad => ("SpaceController Virtual Gamepad", 0x1209, 0x0001),
        };
        let (min, max) = kind.axis_range();

        Self {
            name: name.to_string(),
            bus: BUS_USB,
            vendor,
            product,
            axes: MOTION_AXES
                .iter()
                .map(|&code| AxisSpec { code, min, max, fuzz: 0, flat: 0 })
                .collect(),
            buttons: table.all_codes(),
        }
    }
}

/// One event written to a virtual device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    Axis { code: u16, value: i32 },
    Button { code: u16, pressed: bool },
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to create virtual device: {0}")]
    Create(#[source] std::io::Error),

    #[error("Failed to emit event: {0}")]
    Emit(#[source] std::io::Error),

    #[error("Device rejected: {0}")]
    Rejected(String),

    #[error("{0} device is not registered")]
    NotRegistered(DeviceKind),

    #[error("Device already closed")]
    Closed,
}

/// Failure to register a virtual device. Fatal for that kind only.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{0} device is already registered")]
    AlreadyRegistered(DeviceKind),

    #[error("Failed to register {kind} device: {source}")]
    Backend {
        kind: DeviceKind,
        #[source]
        source: BackendError,
    },
}

/// Open handle to one registered virtual device
pub trait DeviceSink {
    /// Write `events` followed by one synchronization marker
    fn emit_frame(&mut self, events: &[OutputEvent]) -> Result<(), BackendError>;

    /// Release the device. Must be safe to call more than once.
    fn close(&mut self);
}

/// Unified backend interface for registering virtual devices
pub trait DeviceBackend {
    type Sink: DeviceSink;

    /// Register a device declaring all capabilities up front
    fn create(
        &mut self,
        kind: DeviceKind,
        descriptor: &DeviceDescriptor,
    ) -> Result<Self::Sink, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::tables::ButtonLayout;

    #[test]
    fn test_mouse_descriptor() {
        let table = MappingTable::mouse_3d(ButtonLayout::Standard);
        let desc = DeviceDescriptor::for_kind(DeviceKind::Mouse3d, &table);
        assert_eq!(desc.name, "SpaceController spacenavd");
        assert_eq!((desc.bus, desc.vendor, desc.product), (0x03, 0x046d, 0xc627));
        assert_eq!(desc.axes.len(), 6);
        assert!(desc
            .axes
            .iter()
            .all(|a| a.min == -32767 && a.max == 32767 && a.fuzz == 0 && a.flat == 0));
        assert_eq!(desc.buttons, table.all_codes());
    }

    #[test]
    fn test_gamepad_descriptor() {
        let table = MappingTable::gamepad(ButtonLayout::Primary);
        let desc = DeviceDescriptor::for_kind(DeviceKind::Gamepad, &table);
        assert_eq!(desc.name, "SpaceController Virtual Gamepad");
        assert_eq!((desc.vendor, desc.product), (0x1209, 0x0001));
        assert!(desc.buttons.contains(&0x130));
    }
}
