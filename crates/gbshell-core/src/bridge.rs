//! Per-refresh hand-off between host input, the emulation core and the
//! display.

use std::collections::HashSet;
use std::hash::Hash;

use crate::backend::{EmulationCore, FrameBuffer, JoypadState};

/// Host input code bound to each joypad button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMapping<K> {
    pub down: K,
    pub up: K,
    pub left: K,
    pub right: K,
    pub start: K,
    pub select: K,
    pub b: K,
    pub a: K,
}

impl<K: Eq + Hash> InputMapping<K> {
    pub fn joypad_state(&self, pressed: &HashSet<K>) -> JoypadState {
        JoypadState {
            down: pressed.contains(&self.down),
            up: pressed.contains(&self.up),
            left: pressed.contains(&self.left),
            right: pressed.contains(&self.right),
            start: pressed.contains(&self.start),
            select: pressed.contains(&self.select),
            b: pressed.contains(&self.b),
            a: pressed.contains(&self.a),
        }
    }
}

#[derive(Debug, Default)]
pub struct FrameBridge {
    frames: u32,
}

impl FrameBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the joypad derived from `pressed`, then return the latest frame.
    pub fn tick<'c, C, K>(
        &mut self,
        core: &'c mut C,
        mapping: &InputMapping<K>,
        pressed: &HashSet<K>,
    ) -> &'c FrameBuffer
    where
        C: EmulationCore,
        K: Eq + Hash,
    {
        core.set_input_state(mapping.joypad_state(pressed));
        self.frames = self.frames.wrapping_add(1);
        core.frame_buffer()
    }

    /// Frames shown since the last call.
    pub fn take_frame_count(&mut self) -> u32 {
        std::mem::take(&mut self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wasd() -> InputMapping<char> {
        InputMapping {
            down: 's',
            up: 'w',
            left: 'a',
            right: 'd',
            start: '\n',
            select: '\t',
            b: 'k',
            a: 'l',
        }
    }

    #[test]
    fn no_keys_means_no_buttons() {
        assert_eq!(wasd().joypad_state(&HashSet::new()), JoypadState::default());
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let pressed: HashSet<char> = ['w', 'l', 'q'].into_iter().collect();
        let state = wasd().joypad_state(&pressed);
        assert_eq!(
            state,
            JoypadState {
                up: true,
                a: true,
                ..JoypadState::default()
            }
        );
    }

    #[test]
    fn every_button_maps_to_its_key() {
        let pressed: HashSet<char> = ['s', 'w', 'a', 'd', '\n', '\t', 'k', 'l']
            .into_iter()
            .collect();
        let state = wasd().joypad_state(&pressed);
        assert!(
            state.down
                && state.up
                && state.left
                && state.right
                && state.start
                && state.select
                && state.b
                && state.a
        );
    }
}
