//! Event decoder
//!
//! Turns a [`RawEvent`] into typed [`DomainEvent`]s. The only state involved
//! is the previous button mask, which the caller owns and passes in.

use crate::spacecontrol::constants::BUTTON_BIT_COUNT;
use crate::spacecontrol::types::{RawEvent, AXIS_COUNT};
use thiserror::Error;

/// Decoded, normalised event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEvent {
    /// Six-axis motion sample, unscaled
    Motion { axes: [i32; AXIS_COUNT] },

    /// One button bit changed state
    Button { bit: u8, pressed: bool },

    /// A daemon high-level event started or ended
    SemanticAction { id: u32, pressed: bool },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed motion payload: expected {expected} axis values, got {actual}")]
    MalformedPayload { expected: usize, actual: usize },
}

/// Result of decoding one raw event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub events: Vec<DomainEvent>,
    pub mask: u32,
}

/// Decode `raw` against the previously observed button mask
///
/// Button sub-events are emitted once per changed bit, in increasing bit
/// order. High-level events bypass the mask entirely and leave it unchanged.
pub fn decode(raw: &RawEvent, previous_mask: u32) -> Result<Decoded, DecodeError> {
    match raw {
        RawEvent::Motion { axes } => {
            let axes: [i32; AXIS_COUNT] =
                axes.as_slice()
                    .try_into()
                    .map_err(|_| DecodeError::MalformedPayload {
                        expected: AXIS_COUNT,
                        actual: axes.len(),
                    })?;
            Ok(Decoded {
                events: vec![DomainEvent::Motion { axes }],
                mask: previous_mask,
            })
        }

        RawEvent::ButtonState { high_level: Some(action), .. } => Ok(Decoded {
            events: vec![DomainEvent::SemanticAction {
                id: action.id,
                pressed: action.pressed,
            }],
            mask: previous_mask,
        }),

        RawEvent::ButtonState { mask, high_level: None } => Ok(Decoded {
            events: button_deltas(previous_mask, *mask),
            mask: *mask,
        }),
    }
}

/// Per-bit press/release events for a mask transition, lowest bit first
pub fn button_deltas(previous: u32, current: u32) -> Vec<DomainEvent> {
    let pressed = current & !previous;
    let released = previous & !current;
    let changed = pressed | released;

    (0..BUTTON_BIT_COUNT)
        .filter(|bit| changed & (1 << bit) != 0)
        .map(|bit| DomainEvent::Button {
            bit,
            pressed: pressed & (1 << bit) != 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spacecontrol::types::HighLevelEvent;

    fn press(bit: u8) -> DomainEvent {
        DomainEvent::Button { bit, pressed: true }
    }

    fn release(bit: u8) -> DomainEvent {
        DomainEvent::Button { bit, pressed: false }
    }

    #[test]
    fn test_mask_transition_example() {
        let decoded = decode(&RawEvent::buttons(0b0101), 0b0000).unwrap();
        assert_eq!(decoded.events, vec![press(0), press(2)]);
        assert_eq!(decoded.mask, 0b0101);
    }

    #[test]
    fn test_mixed_press_and_release_in_bit_order() {
        let decoded = decode(&RawEvent::buttons(0b1010), 0b0110).unwrap();
        assert_eq!(decoded.events, vec![release(2), press(3)]);
        assert_eq!(decoded.mask, 0b1010);
    }

    #[test]
    fn test_unchanged_mask_emits_nothing() {
        let decoded = decode(&RawEvent::buttons(0b11), 0b11).unwrap();
        assert!(decoded.events.is_empty());
        assert_eq!(decoded.mask, 0b11);
    }

    #[test]
    fn test_high_bit_transitions() {
        let decoded = decode(&RawEvent::buttons(1 << 31), 1).unwrap();
        assert_eq!(decoded.events, vec![release(0), press(31)]);
    }

    #[test]
    fn test_deltas_cover_exactly_the_differing_bits() {
        let transitions = [
            (0u32, 0u32),
            (0, u32::MAX),
            (u32::MAX, 0),
            (0xDEAD_BEEF, 0x0BAD_F00D),
            (0x0001_8000, 0x0001_0001),
        ];

        for (prev, next) in transitions {
            let events = button_deltas(prev, next);
            assert_eq!(events.len() as u32, (prev ^ next).count_ones());

            let mut last_bit = None;
            for event in &events {
                match *event {
                    DomainEvent::Button { bit, pressed } => {
                        assert!(last_bit.map_or(true, |last| bit > last), "bits must ascend");
                        assert_eq!(pressed, next & (1 << bit) != 0);
                        assert_ne!(prev & (1 << bit), next & (1 << bit));
                        last_bit = Some(bit);
                    }
                    other => panic!("unexpected event {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_motion_passes_through_unscaled() {
        let decoded = decode(&RawEvent::motion([10, -20, 30, -40, 50, -60]), 0b1).unwrap();
        assert_eq!(
            decoded.events,
            vec![DomainEvent::Motion { axes: [10, -20, 30, -40, 50, -60] }]
        );
        assert_eq!(decoded.mask, 0b1);
    }

    #[test]
    fn test_malformed_motion() {
        let raw = RawEvent::Motion { axes: vec![1, 2, 3] };
        assert_eq!(
            decode(&raw, 0),
            Err(DecodeError::MalformedPayload { expected: 6, actual: 3 })
        );
    }

    #[test]
    fn test_semantic_action_bypasses_mask() {
        let raw = RawEvent::ButtonState {
            mask: 0b111,
            high_level: Some(HighLevelEvent::pressed(0x2000C)),
        };
        let decoded = decode(&raw, 0b1).unwrap();
        assert_eq!(
            decoded.events,
            vec![DomainEvent::SemanticAction { id: 0x2000C, pressed: true }]
        );
        assert_eq!(decoded.mask, 0b1);
    }
}
