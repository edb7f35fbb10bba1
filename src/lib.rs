//! SpaceBridge: SpaceControl 6DoF daemon to Linux uinput bridge
//!
//! This library exposes SpaceControl devices, reachable only through the
//! vendor daemon, as a spacenavd-compatible 3D mouse and an optional gamepad.

pub mod backend;
pub mod mapping;
pub mod manager;
pub mod shutdown;
pub mod spacecontrol;

// Re-export commonly used items
pub use backend::{DeviceBackend, DeviceKind, MockDeviceBackend};
pub use manager::{BridgeError, BridgePhase, SpaceBridge};
pub use shutdown::ShutdownHandle;
pub use mapping::{BridgeConfig, Config};
pub use spacecontrol::{DaemonSession, RawEvent, SimulatedDaemon};
