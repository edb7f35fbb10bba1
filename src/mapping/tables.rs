//! Built-in button mapping tables
//!
//! A [`MappingTable`] is total over the daemon's 32 button bits: every bit
//! either maps to one output code or is an explicit no-op. High-level daemon
//! events are mapped through a separate id table.

use crate::backend::DeviceKind;
use crate::mapping::codes::*;
use crate::spacecontrol::constants::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named button layout variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonLayout {
    /// Primary buttons and their `_B` variants
    #[default]
    Standard,

    /// Primary buttons only, `_B` variants (bits 17..31) unmapped
    Primary,
}

/// Immutable bit/event-id to output code association for one device kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    buttons: [Option<u16>; BUTTON_BIT_COUNT as usize],
    actions: BTreeMap<u32, u16>,
}

/// Dialog and foreground-application events, mapped as one contiguous run
const DIALOG_EVENTS: std::ops::RangeInclusive<u32> = EVT_HNDL_SENS_DLG..=EVT_HNDL_WFL_DLG;

const GAMEPAD_PRIMARY: [u16; 15] = [
    BTN_A,
    BTN_B,
    BTN_X,
    BTN_Y,
    BTN_TL,
    BTN_TR,
    BTN_SELECT,
    BTN_START,
    BTN_THUMBL,
    BTN_THUMBR,
    BTN_DPAD_UP,
    BTN_DPAD_RIGHT,
    BTN_DPAD_DOWN,
    BTN_DPAD_LEFT,
    BTN_TRIGGER_HAPPY1,
];

impl MappingTable {
    /// Table with every bit and event unmapped
    pub fn empty() -> Self {
        Self {
            buttons: [None; BUTTON_BIT_COUNT as usize],
            actions: BTreeMap::new(),
        }
    }

    /// Built-in table for a device kind
    pub fn for_kind(kind: DeviceKind, layout: ButtonLayout) -> Self {
        match kind {
            DeviceKind::Mouse3d => Self::mouse_3d(layout),
            DeviceKind::Gamepad => Self::gamepad(layout),
        }
    }

    /// spacenavd-compatible 3D mouse table
    pub fn mouse_3d(layout: ButtonLayout) -> Self {
        let mut table = Self::empty();

        for bit in 0..BIT_PANEL {
            table.buttons[bit as usize] = Some(BTN_MISC + bit as u16);
        }
        if layout == ButtonLayout::Standard {
            for bit in B_VARIANT_OFFSET..BUTTON_BIT_COUNT {
                table.buttons[bit as usize] = Some(BTN_MISC + bit as u16);
            }
        }

        table.actions.insert(DEV_FRONT, BTN_SIDE);
        table.actions.insert(DEV_RIGHT, BTN_EXTRA);
        table.actions.insert(DEV_TOP, BTN_FORWARD);
        table.actions.insert(DEV_FIT, BTN_GEAR_UP);
        table.actions.insert(DEV_BACK, BTN_SIDE + 1);
        table.actions.insert(DEV_LEFT, BTN_EXTRA + 1);
        table.actions.insert(DEV_BOTTOM, BTN_FORWARD + 1);
        table.actions.insert(DEV_WHEEL_LEFT, BTN_LEFT);
        table.actions.insert(DEV_WHEEL_RIGHT, BTN_RIGHT);
        for id in DIALOG_EVENTS {
            table.actions.insert(id, BTN_MISC + 34 + (id - EVT_HNDL_SENS_DLG) as u16);
        }
        table.actions.insert(DEV_CTRL, BTN_MISC + 41);

        table
    }

    /// Gamepad table
    pub fn gamepad(layout: ButtonLayout) -> Self {
        let mut table = Self::empty();

        for (bit, code) in GAMEPAD_PRIMARY.iter().enumerate() {
            table.buttons[bit] = Some(*code);
        }
        if layout == ButtonLayout::Standard {
            // KEY_1_B starts at BTN_TRIGGER_HAPPY4
            for bit in B_VARIANT_OFFSET..BUTTON_BIT_COUNT {
                table.buttons[bit as usize] = Some(trigger_happy(bit as u16 - 13));
            }
        }

        table.actions.insert(DEV_WHEEL_LEFT, BTN_TL2);
        table.actions.insert(DEV_WHEEL_RIGHT, BTN_TR2);
        for id in DIALOG_EVENTS {
            table.actions.insert(id, trigger_happy(19 + (id - EVT_HNDL_SENS_DLG) as u16));
        }
        table.actions.insert(DEV_CTRL, trigger_happy(26));

        table
    }

    /// Output code for a button bit, `None` for unmapped or out-of-range bits
    pub fn button(&self, bit: u8) -> Option<u16> {
        self.buttons.get(bit as usize).copied().flatten()
    }

    /// Output code for a high-level event id
    pub fn action(&self, id: u32) -> Option<u16> {
        self.actions.get(&id).copied()
    }

    /// Copy of this table with one bit remapped
    pub fn with_button(mut self, bit: u8, code: Option<u16>) -> Self {
        if let Some(slot) = self.buttons.get_mut(bit as usize) {
            *slot = code;
        }
        self
    }

    /// Copy of this table with one event id remapped
    pub fn with_action(mut self, id: u32, code: Option<u16>) -> Self {
        match code {
            Some(code) => self.actions.insert(id, code),
            None => self.actions.remove(&id),
        };
        self
    }

    /// Every output code this table can produce, sorted and deduplicated
    pub fn all_codes(&self) -> Vec<u16> {
        let mut codes: Vec<u16> = self
            .buttons
            .iter()
            .flatten()
            .chain(self.actions.values())
            .copied()
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }

    /// Number of mapped button bits
    pub fn mapped_buttons(&self) -> usize {
        self.buttons.iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_and_menu_never_mapped() {
        for layout in [ButtonLayout::Standard, ButtonLayout::Primary] {
            for kind in [DeviceKind::Mouse3d, DeviceKind::Gamepad] {
                let table = MappingTable::for_kind(kind, layout);
                assert_eq!(table.button(BIT_PANEL), None);
                assert_eq!(table.button(BIT_MENU), None);
            }
        }
    }

    #[test]
    fn test_mouse_standard_layout() {
        let table = MappingTable::mouse_3d(ButtonLayout::Standard);
        assert_eq!(table.button(0), Some(BTN_MISC));
        assert_eq!(table.button(14), Some(BTN_MISC + 14));
        assert_eq!(table.button(17), Some(BTN_MISC + 17));
        assert_eq!(table.button(31), Some(BTN_MISC + 31));
        assert_eq!(table.mapped_buttons(), 30);
    }

    #[test]
    fn test_mouse_high_level_events() {
        let table = MappingTable::mouse_3d(ButtonLayout::Standard);
        assert_eq!(table.action(DEV_FRONT), Some(BTN_SIDE));
        assert_eq!(table.action(DEV_BACK), Some(BTN_SIDE + 1));
        assert_eq!(table.action(DEV_FIT), Some(BTN_GEAR_UP));
        assert_eq!(table.action(DEV_WHEEL_LEFT), Some(BTN_LEFT));
        assert_eq!(table.action(EVT_HNDL_SENS_DLG), Some(BTN_MISC + 34));
        assert_eq!(table.action(EVT_HNDL_WFL_DLG), Some(BTN_MISC + 40));
        assert_eq!(table.action(DEV_CTRL), Some(BTN_MISC + 41));
        assert_eq!(table.action(DEV_BUFFER_OVERFLOW), None);
    }

    #[test]
    fn test_gamepad_layouts() {
        let standard = MappingTable::gamepad(ButtonLayout::Standard);
        assert_eq!(standard.button(0), Some(BTN_A));
        assert_eq!(standard.button(10), Some(BTN_DPAD_UP));
        assert_eq!(standard.button(14), Some(BTN_TRIGGER_HAPPY1));
        assert_eq!(standard.button(17), Some(trigger_happy(4)));
        assert_eq!(standard.button(31), Some(trigger_happy(18)));

        let primary = MappingTable::gamepad(ButtonLayout::Primary);
        assert_eq!(primary.button(3), Some(BTN_Y));
        assert_eq!(primary.button(17), None);
        assert_eq!(primary.mapped_buttons(), 15);
    }

    #[test]
    fn test_gamepad_high_level_events() {
        let table = MappingTable::gamepad(ButtonLayout::Standard);
        assert_eq!(table.action(DEV_WHEEL_RIGHT), Some(BTN_TR2));
        assert_eq!(table.action(EVT_APPL_IN_FRGRND), Some(trigger_happy(23)));
        assert_eq!(table.action(DEV_CTRL), Some(trigger_happy(26)));
        // Front/right/top are only meaningful on the 3D mouse
        assert_eq!(table.action(DEV_FRONT), None);
    }

    #[test]
    fn test_all_codes_sorted_and_unique() {
        let codes = MappingTable::gamepad(ButtonLayout::Standard).all_codes();
        assert!(codes.windows(2).all(|w| w[0] < w[1]));
        assert!(codes.contains(&BTN_TL2));
        assert!(codes.contains(&trigger_happy(26)));
    }

    #[test]
    fn test_overrides() {
        let table = MappingTable::empty()
            .with_button(0, Some(BTN_A))
            .with_button(40, Some(BTN_B))
            .with_action(DEV_FIT, Some(BTN_X));
        assert_eq!(table.button(0), Some(BTN_A));
        assert_eq!(table.button(40), None);
        assert_eq!(table.action(DEV_FIT), Some(BTN_X));

        let table = table.with_action(DEV_FIT, None).with_button(0, None);
        assert!(table.all_codes().is_empty());
    }
}
