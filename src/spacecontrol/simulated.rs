//! Simulated daemon session for testing.
//!
//! This session replays a script of raw events pushed through a channel
//! instead of talking to the vendor library. Useful for testing the bridge
//! and mapping logic without a SpaceControl device or daemon.

use crate::shutdown::ShutdownHandle;
use crate::spacecontrol::session::{
    ConnectionError, DaemonHandle, DaemonSession, NextEvent, SessionError,
};
use crate::spacecontrol::types::{DaemonCommand, RawEvent};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted step
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Deliver a raw event
    Event(RawEvent),

    /// Deliver the changes of one daemon sample together
    Batch(Vec<RawEvent>),

    /// Report a timeout without waiting
    Timeout,

    /// Report that the daemon session died
    ConnectionLost,
}

/// What happens once every feeder is dropped and the script is exhausted
#[derive(Debug, Clone)]
pub enum ScriptEnd {
    /// Report `ConnectionLost`
    ConnectionLost,

    /// Request bridge shutdown and keep reporting timeouts
    Shutdown(ShutdownHandle),
}

/// Counters recorded by the simulated daemon
#[derive(Debug, Clone, Default)]
pub struct SimulatedStats {
    pub connects: usize,
    pub disconnects: usize,
    pub commands: Vec<DaemonCommand>,
}

/// Push side of a simulated daemon script
#[derive(Debug, Clone)]
pub struct ScriptFeeder {
    sender: Sender<ScriptStep>,
}

impl ScriptFeeder {
    pub fn push(&self, step: ScriptStep) {
        let _ = self.sender.send(step);
    }

    pub fn event(&self, event: RawEvent) {
        self.push(ScriptStep::Event(event));
    }
}

/// Daemon session driven by a script
pub struct SimulatedDaemon {
    receiver: Receiver<ScriptStep>,
    end: ScriptEnd,
    connect_error: Option<String>,
    active: Option<DaemonHandle>,
    lost: bool,
    stats: Arc<Mutex<SimulatedStats>>,
}

impl SimulatedDaemon {
    /// Create a simulated daemon and the feeder that scripts it
    pub fn new() -> (Self, ScriptFeeder) {
        let (sender, receiver) = unbounded();
        let daemon = Self {
            receiver,
            end: ScriptEnd::ConnectionLost,
            connect_error: None,
            active: None,
            lost: false,
            stats: Arc::new(Mutex::new(SimulatedStats::default())),
        };
        (daemon, ScriptFeeder { sender })
    }

    /// Simulated daemon with a fixed script
    pub fn scripted<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = ScriptStep>,
    {
        let (daemon, feeder) = Self::new();
        for step in steps {
            feeder.push(step);
        }
        daemon
    }

    /// Set the behaviour once the script is exhausted
    pub fn ending_with(mut self, end: ScriptEnd) -> Self {
        self.end = end;
        self
    }

    /// Make every `connect` fail as if the daemon were not running
    pub fn unreachable(mut self, reason: &str) -> Self {
        self.connect_error = Some(reason.to_string());
        self
    }

    /// Shared view of the recorded counters
    pub fn stats(&self) -> Arc<Mutex<SimulatedStats>> {
        Arc::clone(&self.stats)
    }

    fn record<F: FnOnce(&mut SimulatedStats)>(&self, f: F) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}

impl DaemonSession for SimulatedDaemon {
    fn connect(&mut self) -> Result<DaemonHandle, ConnectionError> {
        if let Some(reason) = &self.connect_error {
            return Err(ConnectionError::Unreachable(reason.clone()));
        }

        let handle = DaemonHandle::allocate();
        self.active = Some(handle);
        self.lost = false;
        self.record(|s| s.connects += 1);

        info!("[SIM DAEMON] Connected ({})", handle);
        Ok(handle)
    }

    fn next_event(&mut self, handle: DaemonHandle, timeout: Duration) -> NextEvent {
        if self.active != Some(handle) || self.lost {
            return NextEvent::ConnectionLost;
        }

        match self.receiver.recv_timeout(timeout) {
            Ok(ScriptStep::Event(event)) => {
                debug!("[SIM DAEMON] Event: {:?}", event);
                NextEvent::Event(event)
            }
            Ok(ScriptStep::Batch(events)) => {
                debug!("[SIM DAEMON] Batch: {:?}", events);
                NextEvent::Batch(events)
            }
            Ok(ScriptStep::Timeout) | Err(RecvTimeoutError::Timeout) => NextEvent::Timeout,
            Ok(ScriptStep::ConnectionLost) => {
                info!("[SIM DAEMON] Connection lost");
                self.lost = true;
                NextEvent::ConnectionLost
            }
            Err(RecvTimeoutError::Disconnected) => match &self.end {
                ScriptEnd::ConnectionLost => {
                    self.lost = true;
                    NextEvent::ConnectionLost
                }
                ScriptEnd::Shutdown(shutdown) => {
                    shutdown.request_shutdown();
                    NextEvent::Timeout
                }
            },
        }
    }

    fn disconnect(&mut self, handle: DaemonHandle) {
        if self.active == Some(handle) {
            self.active = None;
            self.record(|s| s.disconnects += 1);
            info!("[SIM DAEMON] Disconnected ({})", handle);
        }
    }

    fn send_command(
        &mut self,
        handle: DaemonHandle,
        command: DaemonCommand,
    ) -> Result<(), SessionError> {
        if self.active != Some(handle) {
            return Err(SessionError::StaleHandle(handle));
        }
        info!("[SIM DAEMON] Command: {:?}", command);
        self.record(|s| s.commands.push(command));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_script_in_order() {
        let mut daemon = SimulatedDaemon::scripted(vec![
            ScriptStep::Event(RawEvent::buttons(1)),
            ScriptStep::Timeout,
            ScriptStep::Event(RawEvent::buttons(0)),
        ]);
        let handle = daemon.connect().unwrap();
        let wait = Duration::from_millis(5);

        assert_eq!(daemon.next_event(handle, wait), NextEvent::Event(RawEvent::buttons(1)));
        assert_eq!(daemon.next_event(handle, wait), NextEvent::Timeout);
        assert_eq!(daemon.next_event(handle, wait), NextEvent::Event(RawEvent::buttons(0)));
        // Script exhausted and feeder dropped
        assert_eq!(daemon.next_event(handle, wait), NextEvent::ConnectionLost);
    }

    #[test]
    fn test_feeder_keeps_session_alive() {
        let (mut daemon, feeder) = SimulatedDaemon::new();
        let handle = daemon.connect().unwrap();

        assert_eq!(daemon.next_event(handle, Duration::from_millis(1)), NextEvent::Timeout);
        feeder.event(RawEvent::motion([1, 2, 3, 4, 5, 6]));
        assert_eq!(
            daemon.next_event(handle, Duration::from_millis(1)),
            NextEvent::Event(RawEvent::motion([1, 2, 3, 4, 5, 6]))
        );
    }

    #[test]
    fn test_script_end_requests_shutdown() {
        let shutdown = ShutdownHandle::new();
        let mut daemon = SimulatedDaemon::scripted(Vec::new())
            .ending_with(ScriptEnd::Shutdown(shutdown.clone()));
        let handle = daemon.connect().unwrap();

        assert_eq!(daemon.next_event(handle, Duration::from_millis(1)), NextEvent::Timeout);
        assert!(shutdown.is_shutdown_requested());
    }

    #[test]
    fn test_disconnect_is_idempotent_and_invalidates_handle() {
        let mut daemon = SimulatedDaemon::scripted(Vec::new());
        let stats = daemon.stats();
        let handle = daemon.connect().unwrap();

        daemon.disconnect(handle);
        daemon.disconnect(handle);

        assert_eq!(stats.lock().unwrap().disconnects, 1);
        assert_eq!(daemon.next_event(handle, Duration::from_millis(1)), NextEvent::ConnectionLost);
        assert!(daemon.send_command(handle, DaemonCommand::Rumble { duration_ms: 10 }).is_err());
    }

    #[test]
    fn test_unreachable_daemon() {
        let mut daemon = SimulatedDaemon::scripted(Vec::new()).unreachable("not running");
        assert!(matches!(daemon.connect(), Err(ConnectionError::Unreachable(_))));
    }
}
