//! Virtual device lifecycle
//!
//! Each device kind moves through `Unregistered -> Registered -> Destroyed`.
//! The manager owns every sink; nothing else writes to a device.

use crate::backend::{
    BackendError, DeviceBackend, DeviceDescriptor, DeviceKind, DeviceSink, OutputEvent,
    RegistrationError,
};
use log::{debug, info};

/// Lifecycle state of one virtual device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Unregistered,
    Registered,
    Destroyed,
}

/// One registered virtual device
pub struct VirtualDevice<S: DeviceSink> {
    kind: DeviceKind,
    descriptor: DeviceDescriptor,
    state: DeviceState,
    sink: S,
}

impl<S: DeviceSink> VirtualDevice<S> {
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    fn destroy(&mut self) {
        if self.state == DeviceState::Registered {
            self.sink.close();
            self.state = DeviceState::Destroyed;
            info!("✓ Destroyed {} device '{}'", self.kind, self.descriptor.name);
        }
    }
}

/// Owner of all virtual devices
pub struct VirtualDeviceManager<B: DeviceBackend> {
    backend: B,
    devices: Vec<VirtualDevice<B::Sink>>,
}

impl<B: DeviceBackend> VirtualDeviceManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            devices: Vec::new(),
        }
    }

    /// Register a device of `kind`
    ///
    /// A kind that was destroyed may be registered again.
    pub fn create(
        &mut self,
        kind: DeviceKind,
        descriptor: DeviceDescriptor,
    ) -> Result<(), RegistrationError> {
        if self.state(kind) == DeviceState::Registered {
            return Err(RegistrationError::AlreadyRegistered(kind));
        }

        let sink = self
            .backend
            .create(kind, &descriptor)
            .map_err(|source| RegistrationError::Backend { kind, source })?;

        info!(
            "✓ Registered {} device '{}' ({} axes, {} buttons)",
            kind,
            descriptor.name,
            descriptor.axes.len(),
            descriptor.buttons.len()
        );

        self.devices.retain(|d| d.kind != kind);
        self.devices.push(VirtualDevice {
            kind,
            descriptor,
            state: DeviceState::Registered,
            sink,
        });
        Ok(())
    }

    /// Write one frame to the device of `kind`
    ///
    /// An empty event list writes nothing, not even a sync marker.
    pub fn emit(&mut self, kind: DeviceKind, events: &[OutputEvent]) -> Result<(), BackendError> {
        if events.is_empty() {
            return Ok(());
        }

        let device = self
            .devices
            .iter_mut()
            .find(|d| d.kind == kind && d.state == DeviceState::Registered)
            .ok_or(BackendError::NotRegistered(kind))?;

        debug!("{} frame: {:?}", kind, events);
        device.sink.emit_frame(events)
    }

    /// Destroy the device of `kind`. No-op if it was never registered.
    pub fn destroy(&mut self, kind: DeviceKind) {
        for device in self.devices.iter_mut().filter(|d| d.kind == kind) {
            device.destroy();
        }
    }

    /// Destroy every device
    pub fn destroy_all(&mut self) {
        for device in &mut self.devices {
            device.destroy();
        }
    }

    pub fn state(&self, kind: DeviceKind) -> DeviceState {
        self.devices
            .iter()
            .find(|d| d.kind == kind)
            .map(|d| d.state)
            .unwrap_or(DeviceState::Unregistered)
    }

    /// Kinds currently registered, in registration order
    pub fn active_kinds(&self) -> Vec<DeviceKind> {
        self.devices
            .iter()
            .filter(|d| d.state == DeviceState::Registered)
            .map(|d| d.kind)
            .collect()
    }

    pub fn device(&self, kind: DeviceKind) -> Option<&VirtualDevice<B::Sink>> {
        self.devices.iter().find(|d| d.kind == kind)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: DeviceBackend> Drop for VirtualDeviceManager<B> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
