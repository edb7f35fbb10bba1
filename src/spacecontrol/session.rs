//! Daemon session contract
//!
//! The bridge talks to the daemon only through [`DaemonSession`], so the
//! translation core never sees foreign-call types and tests can substitute
//! a scripted session.

use crate::spacecontrol::constants::ScStatus;
use crate::spacecontrol::types::{DaemonCommand, RawEvent};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of an established daemon session
///
/// Handles are never reused: every successful connect yields a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DaemonHandle(u64);

impl DaemonHandle {
    /// Allocate a new, process-unique handle
    pub fn allocate() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DaemonHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Failure to establish a daemon session
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("SpaceControl library not found at {}", .0.display())]
    LibraryNotFound(PathBuf),

    #[error("Failed to load SpaceControl library: {0}")]
    LibraryLoad(String),

    #[error("Daemon refused connection: {0}")]
    Refused(ScStatus),

    #[error("Device enumeration failed: {0}")]
    DeviceQuery(ScStatus),

    #[error("No SpaceControl devices detected by the daemon")]
    NoDevices,

    #[error("Daemon unreachable: {0}")]
    Unreachable(String),
}

/// Errors from an established session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session handle {0} is not the active session")]
    StaleHandle(DaemonHandle),

    #[error("Command not supported by this session: {0:?}")]
    Unsupported(DaemonCommand),

    #[error("Command failed: {0}")]
    CommandFailed(ScStatus),
}

/// Outcome of a bounded receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextEvent {
    Event(RawEvent),

    /// Every change carried by one daemon sample, in sample order.
    /// Consumers write a batch as a single frame per device.
    Batch(Vec<RawEvent>),

    Timeout,
    ConnectionLost,
}

impl NextEvent {
    /// Wrap the changes of one sample, `None` when nothing changed
    pub fn from_sample(mut events: Vec<RawEvent>) -> Option<Self> {
        match events.len() {
            0 => None,
            1 => events.pop().map(NextEvent::Event),
            _ => Some(NextEvent::Batch(events)),
        }
    }
}

/// Capability interface of the native daemon
pub trait DaemonSession {
    /// Open a session. No retries are attempted here.
    fn connect(&mut self) -> Result<DaemonHandle, ConnectionError>;

    /// Wait at most `timeout` for the next raw event
    fn next_event(&mut self, handle: DaemonHandle, timeout: Duration) -> NextEvent;

    /// Close the session. Idempotent, safe after `ConnectionLost`.
    fn disconnect(&mut self, handle: DaemonHandle);

    /// Forward a command to the device
    fn send_command(
        &mut self,
        _handle: DaemonHandle,
        command: DaemonCommand,
    ) -> Result<(), SessionError> {
        Err(SessionError::Unsupported(command))
    }
}
