// src/event/producer.rs

//! The producer path input backends post through.
//!
//! Each method updates the current-state table first and then appends the
//! edge event, so a consumer that sees the event also sees the level.

use super::{
    ActiveEvent, AppState, ButtonState, Event, EventQueue, InputState, JoyAxisEvent,
    JoyBallEvent, JoyButtonEvent, JoyHatEvent, Keysym, HatPosition, MouseButton,
    MouseButtonEvent, MouseMotionEvent, ResizeEvent, SysWmMessage, UserData,
};
use crate::config::InputConfig;
use crate::error::Result;
use log::{debug, trace};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct RepeatSettings {
    delay_ms: AtomicU32,
    interval_ms: AtomicU32,
    unicode: AtomicBool,
}

/// Cloneable, thread-safe handle for posting events.
#[derive(Debug, Clone)]
pub struct EventProducer {
    queue: Arc<EventQueue>,
    state: Arc<InputState>,
    settings: Arc<RepeatSettings>,
}

impl EventProducer {
    pub fn new(queue: Arc<EventQueue>, state: Arc<InputState>, config: &InputConfig) -> Self {
        EventProducer {
            queue,
            state,
            settings: Arc::new(RepeatSettings {
                delay_ms: AtomicU32::new(config.key_repeat_delay_ms),
                interval_ms: AtomicU32::new(config.key_repeat_interval_ms),
                unicode: AtomicBool::new(config.unicode_translation),
            }),
        }
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn state(&self) -> &Arc<InputState> {
        &self.state
    }

    /// Appends a fully-formed event without touching the state table.
    pub fn push(&self, event: Event) -> Result<()> {
        self.queue.push(event)
    }

    /// Sets key repeat timing. A zero delay disables repeat.
    pub fn enable_key_repeat(&self, delay_ms: u32, interval_ms: u32) {
        debug!("EventProducer: key repeat delay={}ms interval={}ms", delay_ms, interval_ms);
        self.settings.delay_ms.store(delay_ms, Ordering::Release);
        self.settings.interval_ms.store(interval_ms, Ordering::Release);
    }

    /// `(delay_ms, interval_ms)`.
    pub fn key_repeat_settings(&self) -> (u32, u32) {
        (
            self.settings.delay_ms.load(Ordering::Acquire),
            self.settings.interval_ms.load(Ordering::Acquire),
        )
    }

    /// Turns codepoint translation of key presses on or off; returns the
    /// previous setting.
    pub fn enable_unicode(&self, enable: bool) -> bool {
        self.settings.unicode.swap(enable, Ordering::AcqRel)
    }

    pub fn unicode_enabled(&self) -> bool {
        self.settings.unicode.load(Ordering::Acquire)
    }

    /// Posts a key transition.
    ///
    /// Modifier keys update the modifier mask (lock keys toggle on press),
    /// the event carries the mask as it stands after the update, and a
    /// press with no codepoint is translated when translation is enabled.
    pub fn key(&self, state: ButtonState, keysym: Keysym) -> Result<()> {
        let sym = keysym.sym;
        let modifiers = match sym.modifier() {
            Some(bit) if sym.is_lock() => {
                if state.is_pressed() {
                    self.state.toggle_modifiers(bit)
                } else {
                    self.state.modifiers()
                }
            }
            Some(bit) if state.is_pressed() => self.state.insert_modifiers(bit),
            Some(bit) => self.state.remove_modifiers(bit),
            None => self.state.modifiers(),
        };
        self.state.set_key(sym, state);

        let mut keysym = keysym.with_modifiers(modifiers);
        if state.is_pressed() && keysym.unicode == 0 && self.unicode_enabled() {
            keysym.unicode = sym.translate(modifiers);
        }
        if !state.is_pressed() {
            keysym.unicode = 0;
        }
        trace!("EventProducer: key {} {:?} mods={:?}", sym, state, modifiers);
        self.queue.push(Event::key(state, keysym))
    }

    /// Posts an auto-repeat press for a held key. Returns whether an event
    /// was posted: nothing is posted while repeat is disabled or the key is
    /// not down.
    pub fn key_repeat(&self, keysym: Keysym) -> Result<bool> {
        if self.settings.delay_ms.load(Ordering::Acquire) == 0 {
            return Ok(false);
        }
        if !self.state.is_key_pressed(keysym.sym) {
            return Ok(false);
        }
        self.key(ButtonState::Pressed, keysym)?;
        Ok(true)
    }

    /// Posts an absolute pointer move; the relative delta comes from the
    /// previous position.
    pub fn mouse_motion(&self, x: i32, y: i32) -> Result<()> {
        let (old_x, old_y) = self.state.move_mouse(x, y);
        self.queue.push(Event::MouseMotion(MouseMotionEvent {
            state: self.state.mouse_buttons(),
            x: clamp_u16(x),
            y: clamp_u16(y),
            xrel: clamp_i16(i64::from(x) - i64::from(old_x)),
            yrel: clamp_i16(i64::from(y) - i64::from(old_y)),
        }))
    }

    /// Posts a button transition at the current pointer position.
    pub fn mouse_button(&self, button: MouseButton, state: ButtonState) -> Result<()> {
        self.state.set_mouse_button(button.mask(), state);
        let position = self.state.mouse();
        self.queue.push(Event::MouseButton(MouseButtonEvent {
            button,
            state,
            x: clamp_u16(position.x),
            y: clamp_u16(position.y),
        }))
    }

    pub fn joy_axis(&self, which: u8, axis: u8, value: i16) -> Result<()> {
        self.queue.push(Event::JoyAxis(JoyAxisEvent { which, axis, value }))
    }

    pub fn joy_ball(&self, which: u8, ball: u8, xrel: i16, yrel: i16) -> Result<()> {
        self.queue.push(Event::JoyBall(JoyBallEvent { which, ball, xrel, yrel }))
    }

    pub fn joy_hat(&self, which: u8, hat: u8, value: HatPosition) -> Result<()> {
        self.queue.push(Event::JoyHat(JoyHatEvent { which, hat, value }))
    }

    pub fn joy_button(&self, which: u8, button: u8, state: ButtonState) -> Result<()> {
        self.queue.push(Event::JoyButton(JoyButtonEvent { which, button, state }))
    }

    pub fn resize(&self, w: u32, h: u32) -> Result<()> {
        self.queue.push(Event::Resize(ResizeEvent { w, h }))
    }

    pub fn expose(&self) -> Result<()> {
        self.queue.push(Event::Expose)
    }

    pub fn quit(&self) -> Result<()> {
        self.queue.push(Event::Quit)
    }

    /// Posts a focus change. Losing input focus releases every held key.
    pub fn active(&self, gain: bool, state: AppState) -> Result<()> {
        if !gain && state.contains(AppState::INPUT_FOCUS) {
            self.state.reset();
        }
        self.queue.push(Event::Active(ActiveEvent { gain, state }))
    }

    pub fn user(&self, code: i32, data1: UserData, data2: UserData) -> Result<()> {
        self.queue.push(Event::user(code, data1, data2))
    }

    pub fn sys_wm(&self, message: SysWmMessage) -> Result<()> {
        self.queue.push(Event::SysWm(Box::new(message)))
    }

    /// Routes a native event through the state-updating path.
    pub fn dispatch(&self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => self.key(key.state, key.keysym),
            Event::MouseMotion(motion) => self.mouse_motion(i32::from(motion.x), i32::from(motion.y)),
            Event::MouseButton(button) => {
                self.state.move_mouse(i32::from(button.x), i32::from(button.y));
                self.mouse_button(button.button, button.state)
            }
            Event::Active(active) => self.active(active.gain, active.state),
            other => self.queue.push(other),
        }
    }
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}

fn clamp_i16(value: i64) -> i16 {
    value.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}
