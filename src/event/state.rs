// src/event/state.rs

//! Current keyboard and mouse levels.
//!
//! Written by producers, read by the consumer. Every field is an atomic so a
//! reader never sees a torn value; the table carries no ordering relative to
//! the queue because it describes levels, not edges.

use super::{ButtonState, MouseButtons};
use crate::keys::{KeySymbol, Modifiers};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU16, AtomicU8, Ordering};

/// Snapshot of the key table, indexed by `KeySymbol::index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardSnapshot {
    keys: Vec<bool>,
}

impl KeyboardSnapshot {
    pub fn is_pressed(&self, sym: KeySymbol) -> bool {
        self.keys.get(sym.index()).copied().unwrap_or(false)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.keys
    }

    /// Every symbol currently held.
    pub fn pressed(&self) -> impl Iterator<Item = KeySymbol> + '_ {
        self.keys
            .iter()
            .enumerate()
            .filter(|(_, pressed)| **pressed)
            .filter_map(|(index, _)| u16::try_from(index).ok().and_then(KeySymbol::from_raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseState {
    pub x: i32,
    pub y: i32,
    pub buttons: MouseButtons,
}

#[derive(Debug)]
pub struct InputState {
    keys: Box<[AtomicBool]>,
    modifiers: AtomicU16,
    mouse_x: AtomicI32,
    mouse_y: AtomicI32,
    buttons: AtomicU8,
}

impl Default for InputState {
    fn default() -> Self {
        InputState::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        let keys = (0..usize::from(KeySymbol::LAST))
            .map(|_| AtomicBool::new(false))
            .collect();
        InputState {
            keys,
            modifiers: AtomicU16::new(0),
            mouse_x: AtomicI32::new(0),
            mouse_y: AtomicI32::new(0),
            buttons: AtomicU8::new(0),
        }
    }

    pub fn set_key(&self, sym: KeySymbol, state: ButtonState) {
        if let Some(slot) = self.keys.get(sym.index()) {
            slot.store(state.is_pressed(), Ordering::Release);
        }
    }

    pub fn is_key_pressed(&self, sym: KeySymbol) -> bool {
        self.keys
            .get(sym.index())
            .is_some_and(|slot| slot.load(Ordering::Acquire))
    }

    pub fn keyboard(&self) -> KeyboardSnapshot {
        KeyboardSnapshot {
            keys: self.keys.iter().map(|slot| slot.load(Ordering::Acquire)).collect(),
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        Modifiers::from_bits_retain(self.modifiers.load(Ordering::Acquire))
    }

    pub fn set_modifiers(&self, modifiers: Modifiers) {
        self.modifiers.store(modifiers.bits(), Ordering::Release);
    }

    pub(crate) fn insert_modifiers(&self, modifiers: Modifiers) -> Modifiers {
        let previous = self.modifiers.fetch_or(modifiers.bits(), Ordering::AcqRel);
        Modifiers::from_bits_retain(previous | modifiers.bits())
    }

    pub(crate) fn remove_modifiers(&self, modifiers: Modifiers) -> Modifiers {
        let previous = self.modifiers.fetch_and(!modifiers.bits(), Ordering::AcqRel);
        Modifiers::from_bits_retain(previous & !modifiers.bits())
    }

    pub(crate) fn toggle_modifiers(&self, modifiers: Modifiers) -> Modifiers {
        let previous = self.modifiers.fetch_xor(modifiers.bits(), Ordering::AcqRel);
        Modifiers::from_bits_retain(previous ^ modifiers.bits())
    }

    pub fn mouse(&self) -> MouseState {
        MouseState {
            x: self.mouse_x.load(Ordering::Acquire),
            y: self.mouse_y.load(Ordering::Acquire),
            buttons: self.mouse_buttons(),
        }
    }

    pub fn mouse_buttons(&self) -> MouseButtons {
        MouseButtons::from_bits_retain(self.buttons.load(Ordering::Acquire))
    }

    /// Stores the new position and returns the previous one.
    pub(crate) fn move_mouse(&self, x: i32, y: i32) -> (i32, i32) {
        let old_x = self.mouse_x.swap(x, Ordering::AcqRel);
        let old_y = self.mouse_y.swap(y, Ordering::AcqRel);
        (old_x, old_y)
    }

    pub(crate) fn set_mouse_button(&self, mask: MouseButtons, state: ButtonState) {
        if state.is_pressed() {
            self.buttons.fetch_or(mask.bits(), Ordering::AcqRel);
        } else {
            self.buttons.fetch_and(!mask.bits(), Ordering::AcqRel);
        }
    }

    /// Releases every key, button and modifier.
    pub fn reset(&self) {
        for slot in self.keys.iter() {
            slot.store(false, Ordering::Release);
        }
        self.modifiers.store(0, Ordering::Release);
        self.buttons.store(0, Ordering::Release);
    }
}
