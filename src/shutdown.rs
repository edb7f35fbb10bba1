//! Shutdown flag shared between the bridge and signal handlers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable shutdown flag, safe to set from a signal handler thread
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the bridge to stop after the current iteration
    pub fn request_shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
