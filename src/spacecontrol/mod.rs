//! SpaceControl daemon support
//!
//! This module provides the daemon side of the bridge:
//! - Session contract and handles
//! - Native client library session
//! - Simulated session for tests
//! - Raw payload decoding

pub mod constants;
pub mod types;
pub mod session;
pub mod library;
pub mod simulated;
pub mod decoder;

// Re-export commonly used items
pub use constants::*;
pub use types::*;
pub use session::*;
pub use library::{SampleTracker, SpaceControlLibrary};
pub use simulated::{ScriptEnd, ScriptFeeder, ScriptStep, SimulatedDaemon};
pub use decoder::{decode, DecodeError, Decoded, DomainEvent};
