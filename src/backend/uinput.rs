//! uinput backend using evdev
//!
//! Registers real kernel virtual devices through `/dev/uinput`.

use crate::backend::{
    BackendError, DeviceBackend, DeviceDescriptor, DeviceKind, DeviceSink, OutputEvent,
};
use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use log::{debug, warn};

/// Backend registering devices with the kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct UinputBackend;

impl UinputBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceBackend for UinputBackend {
    type Sink = UinputSink;

    fn create(
        &mut self,
        kind: DeviceKind,
        descriptor: &DeviceDescriptor,
    ) -> Result<UinputSink, BackendError> {
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(BackendError::Create)?
            .name(&descriptor.name)
            .input_id(InputId::new(
                BusType(descriptor.bus),
                descriptor.vendor,
                descriptor.product,
                1,
            ));

        let mut keys = AttributeSet::<Key>::new();
        for &code in &descriptor.buttons {
            keys.insert(Key::new(code));
        }
        builder = builder.with_keys(&keys).map_err(BackendError::Create)?;

        for axis in &descriptor.axes {
            let setup = UinputAbsSetup::new(
                AbsoluteAxisType(axis.code),
                AbsInfo::new(0, axis.min, axis.max, axis.fuzz, axis.flat, 0),
            );
            builder = builder.with_absolute_axis(&setup).map_err(BackendError::Create)?;
        }

        let device = builder.build().map_err(BackendError::Create)?;
        debug!("uinput {} device '{}' built", kind, descriptor.name);

        Ok(UinputSink {
            device: Some(device),
            name: descriptor.name.clone(),
        })
    }
}

/// Open uinput device
pub struct UinputSink {
    device: Option<VirtualDevice>,
    name: String,
}

impl DeviceSink for UinputSink {
    fn emit_frame(&mut self, events: &[OutputEvent]) -> Result<(), BackendError> {
        let device = self.device.as_mut().ok_or(BackendError::Closed)?;

        let events: Vec<InputEvent> = events.iter().map(to_input_event).collect();
        // VirtualDevice::emit appends SYN_REPORT
        device.emit(&events).map_err(BackendError::Emit)
    }

    fn close(&mut self) {
        // Dropping the handle destroys the kernel device
        if self.device.take().is_some() {
            debug!("uinput device '{}' released", self.name);
        }
    }
}

impl Drop for UinputSink {
    fn drop(&mut self) {
        if self.device.is_some() {
            warn!("uinput device '{}' dropped without close", self.name);
            self.close();
        }
    }
}

fn to_input_event(event: &OutputEvent) -> InputEvent {
    match *event {
        OutputEvent::Axis { code, value } => InputEvent::new(EventType::ABSOLUTE, code, value),
        OutputEvent::Button { code, pressed } => {
            InputEvent::new(EventType::KEY, code, pressed as i32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::tables::{ButtonLayout, MappingTable};

    #[test]
    fn test_event_conversion() {
        let ev = to_input_event(&OutputEvent::Axis { code: 0x05, value: -7 });
        assert_eq!(ev.event_type(), EventType::ABSOLUTE);
        assert_eq!((ev.code(), ev.value()), (0x05, -7));

        let ev = to_input_event(&OutputEvent::Button { code: 0x130, pressed: true });
        assert_eq!(ev.event_type(), EventType::KEY);
        assert_eq!(ev.value(), 1);
    }

    #[test]
    #[ignore] // Requires uinput access (run with: cargo test -- --ignored)
    fn test_create_gamepad() {
        let table = MappingTable::gamepad(ButtonLayout::Standard);
        let descriptor = DeviceDescriptor::for_kind(DeviceKind::Gamepad, &table);
        let mut sink = UinputBackend::new().create(DeviceKind::Gamepad, &descriptor).unwrap();
        assert!(sink
            .emit_frame(&[OutputEvent::Button { code: 0x130, pressed: true }])
            .is_ok());
        sink.close();
    }
}
