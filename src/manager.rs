//! High-level SpaceControl bridge
//!
//! This module ties the daemon session, decoder, mapper and virtual devices
//! together in a single-threaded loop, and applies the failure policy.

use crate::backend::{
    DeviceBackend, DeviceDescriptor, DeviceKind, OutputEvent, VirtualDeviceManager,
};
use crate::mapping::config::BridgeConfig;
use crate::mapping::mapper::map_event;
pub use crate::shutdown::ShutdownHandle;
use crate::spacecontrol::decoder::decode;
use crate::spacecontrol::session::{ConnectionError, DaemonHandle, DaemonSession, NextEvent};
use crate::spacecontrol::types::RawEvent;
use log::{debug, error, info, trace, warn};
use std::fmt;
use thiserror::Error;

/// Bridge lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    Starting,
    Connecting,
    Running,
    Draining,
    Stopped,
    Faulted,
}

impl fmt::Display for BridgePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to connect to the SpaceControl daemon: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Lost connection to the SpaceControl daemon ({0})")]
    ConnectionLost(DaemonHandle),

    #[error("No virtual device could be registered")]
    NoDevices,

    #[error("Bridge cannot run from phase {0}")]
    InvalidPhase(BridgePhase),
}

/// Counters kept while running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub events: u64,
    pub frames: u64,
    pub emit_failures: u64,
    pub malformed: u64,
}

/// Per-session state, built after connect and registration
#[derive(Debug)]
struct BridgeState {
    handle: DaemonHandle,
    mouse_prev_mask: u32,
    gamepad_prev_mask: u32,
}

impl BridgeState {
    fn new(handle: DaemonHandle) -> Self {
        Self {
            handle,
            mouse_prev_mask: 0,
            gamepad_prev_mask: 0,
        }
    }

    fn prev_mask(&mut self, kind: DeviceKind) -> &mut u32 {
        match kind {
            DeviceKind::Mouse3d => &mut self.mouse_prev_mask,
            DeviceKind::Gamepad => &mut self.gamepad_prev_mask,
        }
    }
}

/// Bridge between a daemon session and virtual devices
pub struct SpaceBridge<S, B>
where
    S: DaemonSession,
    B: DeviceBackend,
{
    config: BridgeConfig,
    session: S,
    devices: VirtualDeviceManager<B>,
    shutdown: ShutdownHandle,
    phase: BridgePhase,
    state: Option<BridgeState>,
    stats: BridgeStats,
}

impl<S, B> SpaceBridge<S, B>
where
    S: DaemonSession,
    B: DeviceBackend,
{
    /// Create a new bridge
    pub fn new(config: BridgeConfig, session: S, backend: B) -> Self {
        Self {
            config,
            session,
            devices: VirtualDeviceManager::new(backend),
            shutdown: ShutdownHandle::new(),
            phase: BridgePhase::Starting,
            state: None,
            stats: BridgeStats::default(),
        }
    }

    /// Use an existing shutdown flag instead of a private one
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn phase(&self) -> BridgePhase {
        self.phase
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn devices(&self) -> &VirtualDeviceManager<B> {
        &self.devices
    }

    /// Run until shutdown is requested or a fatal error occurs
    ///
    /// Returns `Ok` when the bridge reaches `Stopped`. Every error return
    /// leaves the bridge `Faulted` with all devices destroyed and the
    /// session closed.
    pub fn run(&mut self) -> Result<(), BridgeError> {
        if self.phase != BridgePhase::Starting {
            return Err(BridgeError::InvalidPhase(self.phase));
        }

        let enabled = self.config.enabled_kinds();
        if enabled.is_empty() {
            warn!("No virtual device enabled, events will be discarded");
        }

        self.set_phase(BridgePhase::Connecting);
        let handle = match self.session.connect() {
            Ok(handle) => handle,
            Err(e) => {
                error!("Connecting -> Faulted: {}", e);
                self.set_phase(BridgePhase::Faulted);
                return Err(e.into());
            }
        };
        info!("✓ Connected to SpaceControl daemon ({})", handle);
        self.state = Some(BridgeState::new(handle));

        self.set_phase(BridgePhase::Running);
        if let Err(e) = self.register_devices(&enabled) {
            error!("Running -> Faulted: {}", e);
            self.drain();
            self.set_phase(BridgePhase::Faulted);
            return Err(e);
        }

        let result = self.event_loop(handle);

        self.drain();
        match result {
            Ok(()) => {
                self.set_phase(BridgePhase::Stopped);
                info!(
                    "✓ Bridge stopped ({} events, {} frames)",
                    self.stats.events, self.stats.frames
                );
                Ok(())
            }
            Err(e) => {
                error!("Running -> Faulted: {}", e);
                self.set_phase(BridgePhase::Faulted);
                Err(e)
            }
        }
    }

    /// Register every enabled kind, dropping the ones that fail
    fn register_devices(&mut self, enabled: &[DeviceKind]) -> Result<(), BridgeError> {
        for &kind in enabled {
            let descriptor = DeviceDescriptor::for_kind(kind, self.config.table(kind));
            if let Err(e) = self.devices.create(kind, descriptor) {
                error!("{}; continuing without it", e);
            }
        }

        if !enabled.is_empty() && self.devices.active_kinds().is_empty() {
            return Err(BridgeError::NoDevices);
        }
        Ok(())
    }

    fn event_loop(&mut self, handle: DaemonHandle) -> Result<(), BridgeError> {
        let timeout = self.config.poll_timeout;

        while !self.shutdown.is_shutdown_requested() {
            match self.session.next_event(handle, timeout) {
                NextEvent::Event(raw) => self.dispatch(std::slice::from_ref(&raw)),
                NextEvent::Batch(raws) => self.dispatch(&raws),
                NextEvent::Timeout => continue,
                NextEvent::ConnectionLost => return Err(BridgeError::ConnectionLost(handle)),
            }
        }

        info!("Shutdown requested");
        Ok(())
    }

    /// Decode, map and emit the raw events of one daemon sample
    ///
    /// Everything one sample produces for a device is written as a single
    /// frame, so consumers never observe a partially applied sample.
    fn dispatch(&mut self, raws: &[RawEvent]) {
        self.stats.events += raws.len() as u64;

        let state = match self.state.as_mut() {
            Some(state) => state,
            None => return,
        };

        let kinds = self.devices.active_kinds();
        let mut frames: Vec<Vec<OutputEvent>> = vec![Vec::new(); kinds.len()];

        'raw: for raw in raws {
            for (kind, frame) in kinds.iter().zip(frames.iter_mut()) {
                let prev_mask = state.prev_mask(*kind);
                let decoded = match decode(raw, *prev_mask) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        // Shape errors are mask-independent
                        warn!("Dropping event: {}", e);
                        self.stats.malformed += 1;
                        continue 'raw;
                    }
                };
                *prev_mask = decoded.mask;

                let table = self.config.table(*kind);
                for event in &decoded.events {
                    frame.extend(map_event(table, &self.config.axis_scale, *kind, event));
                }
            }
        }

        for (kind, frame) in kinds.into_iter().zip(frames) {
            if frame.is_empty() {
                continue;
            }
            match self.devices.emit(kind, &frame) {
                Ok(()) => self.stats.frames += 1,
                Err(e) => {
                    warn!("Failed to write {} frame: {}", kind, e);
                    self.stats.emit_failures += 1;
                }
            }
        }

        trace!("Dispatched {:?}", raws);
    }

    /// Destroy every device and close the session
    fn drain(&mut self) {
        self.set_phase(BridgePhase::Draining);
        self.devices.destroy_all();
        if let Some(state) = self.state.take() {
            self.session.disconnect(state.handle);
            info!("✓ Disconnected from daemon ({})", state.handle);
        }
    }

    fn set_phase(&mut self, phase: BridgePhase) {
        debug!("Bridge phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }
}

/// Close the session if the bridge is dropped mid-run
impl<S, B> Drop for SpaceBridge<S, B>
where
    S: DaemonSession,
    B: DeviceBackend,
{
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.devices.destroy_all();
            self.session.disconnect(state.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceState, MockDeviceBackend};
    use crate::mapping::codes::{ABS_X, BTN_MISC};
    use crate::mapping::tables::MappingTable;
    use crate::spacecontrol::simulated::{ScriptEnd, ScriptStep, SimulatedDaemon};

    fn config(mouse: bool, gamepad: bool) -> BridgeConfig {
        BridgeConfig {
            enable_3d_mouse: mouse,
            enable_gamepad: gamepad,
            axis_scale: [1.0; 6],
            poll_timeout: std::time::Duration::from_millis(5),
            ..BridgeConfig::default()
        }
    }

    fn stopping_daemon(steps: Vec<ScriptStep>, shutdown: &ShutdownHandle) -> SimulatedDaemon {
        SimulatedDaemon::scripted(steps).ending_with(ScriptEnd::Shutdown(shutdown.clone()))
    }

    #[test]
    fn test_clean_stop() {
        let shutdown = ShutdownHandle::new();
        let daemon = stopping_daemon(
            vec![ScriptStep::Event(RawEvent::motion([1, 0, 0, 0, 0, 0]))],
            &shutdown,
        );
        let stats = daemon.stats();
        let backend = MockDeviceBackend::new();

        let mut bridge = SpaceBridge::new(config(true, false), daemon, backend.clone())
            .with_shutdown(shutdown);
        assert!(bridge.run().is_ok());

        assert_eq!(bridge.phase(), BridgePhase::Stopped);
        assert_eq!(bridge.devices().state(DeviceKind::Mouse3d), DeviceState::Destroyed);
        assert_eq!(stats.lock().unwrap().disconnects, 1);
        assert_eq!(backend.frames(DeviceKind::Mouse3d).len(), 1);
        assert_eq!(bridge.stats().events, 1);
    }

    #[test]
    fn test_run_twice_rejected() {
        let shutdown = ShutdownHandle::new();
        shutdown.request_shutdown();
        let daemon = stopping_daemon(Vec::new(), &shutdown);

        let mut bridge = SpaceBridge::new(config(true, false), daemon, MockDeviceBackend::new())
            .with_shutdown(shutdown);
        assert!(bridge.run().is_ok());
        assert!(matches!(bridge.run(), Err(BridgeError::InvalidPhase(BridgePhase::Stopped))));
    }

    #[test]
    fn test_per_kind_masks_are_independent() {
        let shutdown = ShutdownHandle::new();
        let daemon = stopping_daemon(
            vec![
                ScriptStep::Event(RawEvent::buttons(0b01)),
                ScriptStep::Event(RawEvent::buttons(0b11)),
            ],
            &shutdown,
        );
        let backend = MockDeviceBackend::new();
        let mut cfg = config(true, true);
        cfg.gamepad_table = MappingTable::empty().with_button(1, Some(0x130));

        let mut bridge = SpaceBridge::new(cfg, daemon, backend.clone()).with_shutdown(shutdown);
        bridge.run().unwrap();

        assert_eq!(
            backend.frames(DeviceKind::Mouse3d),
            vec![
                vec![OutputEvent::Button { code: BTN_MISC, pressed: true }],
                vec![OutputEvent::Button { code: BTN_MISC + 1, pressed: true }],
            ]
        );
        assert_eq!(
            backend.frames(DeviceKind::Gamepad),
            vec![vec![OutputEvent::Button { code: 0x130, pressed: true }]]
        );
    }

    #[test]
    fn test_malformed_event_dropped() {
        let shutdown = ShutdownHandle::new();
        let daemon = stopping_daemon(
            vec![
                ScriptStep::Event(RawEvent::Motion { axes: vec![1, 2] }),
                ScriptStep::Event(RawEvent::motion([3, 0, 0, 0, 0, 0])),
            ],
            &shutdown,
        );
        let backend = MockDeviceBackend::new();

        let mut bridge = SpaceBridge::new(config(true, false), daemon, backend.clone())
            .with_shutdown(shutdown);
        bridge.run().unwrap();

        assert_eq!(bridge.stats().malformed, 1);
        let frames = backend.frames(DeviceKind::Mouse3d);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0], OutputEvent::Axis { code: ABS_X, value: 3 });
    }

    #[test]
    fn test_malformed_event_in_batch_keeps_the_rest() {
        let shutdown = ShutdownHandle::new();
        let daemon = stopping_daemon(
            vec![ScriptStep::Batch(vec![
                RawEvent::Motion { axes: vec![9; 4] },
                RawEvent::buttons(0b1),
            ])],
            &shutdown,
        );
        let backend = MockDeviceBackend::new();

        let mut bridge = SpaceBridge::new(config(true, false), daemon, backend.clone())
            .with_shutdown(shutdown);
        bridge.run().unwrap();

        assert_eq!(bridge.stats().malformed, 1);
        assert_eq!(bridge.stats().events, 2);
        assert_eq!(
            backend.frames(DeviceKind::Mouse3d),
            vec![vec![OutputEvent::Button { code: BTN_MISC, pressed: true }]]
        );
    }
}
