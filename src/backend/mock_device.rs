//! Mock device backend for testing.
//!
//! This backend records frames instead of registering real uinput devices.
//! Useful for testing the bridge and mapping logic without `/dev/uinput`.

use crate::backend::{
    BackendError, DeviceBackend, DeviceDescriptor, DeviceKind, DeviceSink, OutputEvent,
};
use log::info;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MockRecord {
    created: Vec<(DeviceKind, DeviceDescriptor)>,
    frames: HashMap<DeviceKind, Vec<Vec<OutputEvent>>>,
    closes: HashMap<DeviceKind, usize>,
}

/// Mock backend that records frames per device kind.
///
/// Clones share the same record, so a test can keep one clone and hand the
/// other to the bridge.
#[derive(Clone, Debug, Default)]
pub struct MockDeviceBackend {
    record: Arc<Mutex<MockRecord>>,
    rejected: HashSet<DeviceKind>,
    failing_emit: HashSet<DeviceKind>,
}

impl MockDeviceBackend {
    /// Create a new mock device backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to register devices of `kind`.
    pub fn rejecting(mut self, kind: DeviceKind) -> Self {
        self.rejected.insert(kind);
        self
    }

    /// Register devices of `kind` whose every write fails.
    pub fn failing_emit(mut self, kind: DeviceKind) -> Self {
        self.failing_emit.insert(kind);
        self
    }

    /// Frames written to devices of `kind`, in order.
    pub fn frames(&self, kind: DeviceKind) -> Vec<Vec<OutputEvent>> {
        self.with_record(|r| r.frames.get(&kind).cloned().unwrap_or_default())
    }

    /// Number of times a device of `kind` was closed.
    pub fn close_count(&self, kind: DeviceKind) -> usize {
        self.with_record(|r| r.closes.get(&kind).copied().unwrap_or(0))
    }

    /// Kinds registered so far, in registration order.
    pub fn created_kinds(&self) -> Vec<DeviceKind> {
        self.with_record(|r| r.created.iter().map(|(kind, _)| *kind).collect())
    }

    /// Descriptor of the last registered device of `kind`.
    pub fn descriptor(&self, kind: DeviceKind) -> Option<DeviceDescriptor> {
        self.with_record(|r| {
            r.created
                .iter()
                .rev()
                .find(|(k, _)| *k == kind)
                .map(|(_, d)| d.clone())
        })
    }

    fn with_record<T, F: FnOnce(&mut MockRecord) -> T>(&self, f: F) -> T {
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut record)
    }
}

impl DeviceBackend for MockDeviceBackend {
    type Sink = MockDeviceSink;

    fn create(
        &mut self,
        kind: DeviceKind,
        descriptor: &DeviceDescriptor,
    ) -> Result<MockDeviceSink, BackendError> {
        if self.rejected.contains(&kind) {
            info!("[MOCK DEVICE] Rejecting {} device '{}'", kind, descriptor.name);
            return Err(BackendError::Rejected(format!("{} disabled in mock", kind)));
        }

        info!("[MOCK DEVICE] Created {} device '{}'", kind, descriptor.name);
        self.with_record(|r| r.created.push((kind, descriptor.clone())));

        Ok(MockDeviceSink {
            kind,
            backend: self.clone(),
            fail_emit: self.failing_emit.contains(&kind),
            closed: false,
        })
    }
}

/// Sink handed out by [`MockDeviceBackend`].
#[derive(Debug)]
pub struct MockDeviceSink {
    kind: DeviceKind,
    backend: MockDeviceBackend,
    fail_emit: bool,
    closed: bool,
}

impl DeviceSink for MockDeviceSink {
    fn emit_frame(&mut self, events: &[OutputEvent]) -> Result<(), BackendError> {
        if self.closed {
            return Err(BackendError::Closed);
        }
        if self.fail_emit {
            return Err(BackendError::Emit(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock emit failure",
            )));
        }

        info!("[MOCK DEVICE] {} frame: {:?} + SYN_REPORT", self.kind, events);
        let kind = self.kind;
        self.backend
            .with_record(|r| r.frames.entry(kind).or_default().push(events.to_vec()));
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            info!("[MOCK DEVICE] Closed {} device", self.kind);
            let kind = self.kind;
            self.backend
                .with_record(|r| *r.closes.entry(kind).or_insert(0) += 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::tables::MappingTable;

    #[test]
    fn mock_device_records_frames() {
        let mut backend = MockDeviceBackend::new();
        let descriptor = DeviceDescriptor::for_kind(DeviceKind::Mouse3d, &MappingTable::empty());
        let mut sink = backend.create(DeviceKind::Mouse3d, &descriptor).unwrap();

        let frame = [OutputEvent::Axis { code: 0, value: 20 }];
        assert!(sink.emit_frame(&frame).is_ok());
        sink.close();
        sink.close();

        assert_eq!(backend.frames(DeviceKind::Mouse3d), vec![frame.to_vec()]);
        assert_eq!(backend.close_count(DeviceKind::Mouse3d), 1);
        assert!(matches!(sink.emit_frame(&frame), Err(BackendError::Closed)));
        assert_eq!(backend.descriptor(DeviceKind::Mouse3d), Some(descriptor));
    }

    #[test]
    fn mock_device_failing_emit() {
        let mut backend = MockDeviceBackend::new().failing_emit(DeviceKind::Gamepad);
        let descriptor = DeviceDescriptor::for_kind(DeviceKind::Gamepad, &MappingTable::empty());
        let mut sink = backend.create(DeviceKind::Gamepad, &descriptor).unwrap();

        assert!(sink.emit_frame(&[OutputEvent::Button { code: 0x130, pressed: true }]).is_err());
        assert!(backend.frames(DeviceKind::Gamepad).is_empty());
    }
}
