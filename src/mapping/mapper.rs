//! Axis & button mapper
//!
//! Stateless functions turning decoded [`DomainEvent`]s into output events
//! for one device kind. Nothing here touches a device.

use crate::backend::{DeviceKind, OutputEvent};
use crate::mapping::codes::MOTION_AXES;
use crate::mapping::tables::MappingTable;
use crate::spacecontrol::decoder::DomainEvent;
use crate::spacecontrol::types::AXIS_COUNT;
use log::debug;

/// Per-axis scale factors, applied identically to every enabled device
pub type AxisScale = [f32; AXIS_COUNT];

/// Clamp `value` into `[min, max]`
///
/// Idempotent: clamping an already clamped value returns it unchanged.
pub fn clamp_axis(value: i64, min: i32, max: i32) -> i32 {
    value.clamp(min as i64, max as i64) as i32
}

/// Scale one raw axis value, truncating toward zero
fn scale_axis(raw: i32, factor: f32) -> i64 {
    let scaled = (raw as f64 * factor as f64).trunc();
    // Float-to-int `as` saturates, so extreme factors cannot wrap
    scaled as i64
}

/// Scaled, clamped `(axis code, value)` pairs for one motion sample
pub fn map_motion(
    axes: &[i32; AXIS_COUNT],
    scale: &AxisScale,
    kind: DeviceKind,
) -> Vec<(u16, i32)> {
    let (min, max) = kind.axis_range();

    MOTION_AXES
        .iter()
        .zip(axes.iter().zip(scale.iter()))
        .map(|(&code, (&raw, &factor))| {
            (code, clamp_axis(scale_axis(raw, factor), min, max))
        })
        .collect()
}

/// Output button for a changed button bit, `None` when the bit is unmapped
pub fn map_button_delta(table: &MappingTable, bit: u8, pressed: bool) -> Option<(u16, bool)> {
    table.button(bit).map(|code| (code, pressed))
}

/// Output button for a high-level event edge, `None` when unmapped
pub fn map_semantic_action(table: &MappingTable, id: u32, pressed: bool) -> Option<(u16, bool)> {
    table.action(id).map(|code| (code, pressed))
}

/// All output events one domain event produces on one device kind
///
/// Empty when nothing is mapped. Callers append the result to the frame of
/// the sample the event came from.
pub fn map_event(
    table: &MappingTable,
    scale: &AxisScale,
    kind: DeviceKind,
    event: &DomainEvent,
) -> Vec<OutputEvent> {
    match *event {
        DomainEvent::Motion { ref axes } => map_motion(axes, scale, kind)
            .into_iter()
            .map(|(code, value)| OutputEvent::Axis { code, value })
            .collect(),

        DomainEvent::Button { bit, pressed } => match map_button_delta(table, bit, pressed) {
            Some((code, pressed)) => vec![OutputEvent::Button { code, pressed }],
            None => {
                debug!("{}: button bit {} unmapped", kind, bit);
                Vec::new()
            }
        },

        DomainEvent::SemanticAction { id, pressed } => {
            match map_semantic_action(table, id, pressed) {
                Some((code, pressed)) => vec![OutputEvent::Button { code, pressed }],
                None => {
                    debug!("{}: event 0x{:X} unmapped", kind, id);
                    Vec::new()
                }
            }
        }
    }
}
