// src/event/mod.rs

//! Unified input/window event model.
//!
//! - `Event`: one sum type over every event shape; the variant is the tag,
//!   so a payload can only be read through the variant that carries it.
//! - `EventQueue`: ordered, internally synchronised FIFO drained by a single
//!   consumer.
//! - `InputState`: current keyboard/mouse levels, updated by the same
//!   producer path that posts edge events.
//! - `EventProducer`: the handle input backends post through.

pub mod producer;
pub mod queue;
pub mod state;

pub use producer::EventProducer;
pub use queue::{EventQueue, EventState, OverflowPolicy};
pub use state::{InputState, KeyboardSnapshot, MouseState};

use crate::keys::{KeySymbol, Modifiers};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Stable event type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventType {
    Active = 1,
    KeyDown = 2,
    KeyUp = 3,
    MouseMotion = 4,
    MouseButtonDown = 5,
    MouseButtonUp = 6,
    JoyAxisMotion = 7,
    JoyBallMotion = 8,
    JoyHatMotion = 9,
    JoyButtonDown = 10,
    JoyButtonUp = 11,
    Quit = 12,
    SysWm = 13,
    VideoResize = 16,
    VideoExpose = 17,
    User = 24,
}

impl EventType {
    pub const ALL: [EventType; 16] = [
        EventType::Active,
        EventType::KeyDown,
        EventType::KeyUp,
        EventType::MouseMotion,
        EventType::MouseButtonDown,
        EventType::MouseButtonUp,
        EventType::JoyAxisMotion,
        EventType::JoyBallMotion,
        EventType::JoyHatMotion,
        EventType::JoyButtonDown,
        EventType::JoyButtonUp,
        EventType::Quit,
        EventType::SysWm,
        EventType::VideoResize,
        EventType::VideoExpose,
        EventType::User,
    ];

    /// Every joystick event type.
    pub const JOYSTICK: [EventType; 5] = [
        EventType::JoyAxisMotion,
        EventType::JoyBallMotion,
        EventType::JoyHatMotion,
        EventType::JoyButtonDown,
        EventType::JoyButtonUp,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<EventType> {
        EventType::ALL.into_iter().find(|ty| ty.id() == id)
    }
}

/// Pressed/released level of a key or button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonState {
    Released,
    Pressed,
}

impl ButtonState {
    pub fn is_pressed(self) -> bool {
        self == ButtonState::Pressed
    }
}

impl From<bool> for ButtonState {
    fn from(pressed: bool) -> Self {
        if pressed {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

bitflags! {
    /// Which aspects of application focus an activation event concerns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AppState: u8 {
        const MOUSE_FOCUS = 0x01;
        const INPUT_FOCUS = 0x02;
        const ACTIVE = 0x04;
    }
}

bitflags! {
    /// Bitmask of held mouse buttons; button `n` is bit `n - 1`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MouseButtons: u8 {
        const LEFT = 0x01;
        const MIDDLE = 0x02;
        const RIGHT = 0x04;
        const WHEEL_UP = 0x08;
        const WHEEL_DOWN = 0x10;
    }
}

/// A mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
    Other(u8),
}

/// Linux evdev `BTN_LEFT`.
const BTN_LEFT: u16 = 0x110;
const BTN_RIGHT: u16 = 0x111;
const BTN_MIDDLE: u16 = 0x112;
const BTN_SIDE: u16 = 0x113;
/// Last button in the evdev mouse range.
const BTN_TASK: u16 = 0x117;

impl MouseButton {
    /// One-based button number.
    pub fn number(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
            MouseButton::WheelUp => 4,
            MouseButton::WheelDown => 5,
            MouseButton::Other(n) => n,
        }
    }

    pub fn from_number(number: u8) -> MouseButton {
        match number {
            1 => MouseButton::Left,
            2 => MouseButton::Middle,
            3 => MouseButton::Right,
            4 => MouseButton::WheelUp,
            5 => MouseButton::WheelDown,
            n => MouseButton::Other(n),
        }
    }

    /// Maps a Linux evdev button code. Extra buttons (`BTN_SIDE` to
    /// `BTN_TASK`) become 6 and up; codes outside the mouse range map to
    /// `Other(0)`, which is never tracked in the held mask.
    pub fn from_evdev(code: u16) -> MouseButton {
        match code {
            BTN_LEFT => MouseButton::Left,
            BTN_RIGHT => MouseButton::Right,
            BTN_MIDDLE => MouseButton::Middle,
            extra @ BTN_SIDE..=BTN_TASK => MouseButton::Other((extra - BTN_SIDE) as u8 + 6),
            _ => MouseButton::Other(0),
        }
    }

    /// Bit in the held-buttons mask; buttons above 8 are not tracked.
    pub fn mask(self) -> MouseButtons {
        let number = self.number();
        if (1..=8).contains(&number) {
            MouseButtons::from_bits_retain(1 << (number - 1))
        } else {
            MouseButtons::empty()
        }
    }
}

bitflags! {
    /// Joystick hat position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HatPosition: u8 {
        const CENTERED = 0x00;
        const UP = 0x01;
        const RIGHT = 0x02;
        const DOWN = 0x04;
        const LEFT = 0x08;
        const RIGHT_UP = Self::RIGHT.bits() | Self::UP.bits();
        const RIGHT_DOWN = Self::RIGHT.bits() | Self::DOWN.bits();
        const LEFT_UP = Self::LEFT.bits() | Self::UP.bits();
        const LEFT_DOWN = Self::LEFT.bits() | Self::DOWN.bits();
    }
}

/// Key identity carried by keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Keysym {
    /// Backend-specific scancode.
    pub scancode: u8,
    pub sym: KeySymbol,
    /// Modifier snapshot when the event was produced.
    pub modifiers: Modifiers,
    /// Translated codepoint, 0 when the key has none.
    pub unicode: u16,
}

impl Keysym {
    pub fn new(sym: KeySymbol) -> Self {
        Keysym {
            scancode: 0,
            sym,
            modifiers: Modifiers::empty(),
            unicode: 0,
        }
    }

    /// Keysym with its codepoint translated from `sym` under `modifiers`.
    pub fn translated(sym: KeySymbol, modifiers: Modifiers) -> Self {
        Keysym {
            scancode: 0,
            sym,
            modifiers,
            unicode: sym.translate(modifiers),
        }
    }

    pub fn with_scancode(mut self, scancode: u8) -> Self {
        self.scancode = scancode;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_unicode(mut self, unicode: u16) -> Self {
        self.unicode = unicode;
        self
    }

    /// The translated character, if any.
    pub fn char(&self) -> Option<char> {
        if self.unicode == 0 {
            None
        } else {
            char::from_u32(u32::from(self.unicode))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEvent {
    pub gain: bool,
    pub state: AppState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub state: ButtonState,
    pub keysym: Keysym,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMotionEvent {
    /// Buttons held during the motion.
    pub state: MouseButtons,
    pub x: u16,
    pub y: u16,
    pub xrel: i16,
    pub yrel: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseButtonEvent {
    pub button: MouseButton,
    pub state: ButtonState,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoyAxisEvent {
    pub which: u8,
    pub axis: u8,
    pub value: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoyBallEvent {
    pub which: u8,
    pub ball: u8,
    pub xrel: i16,
    pub yrel: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoyHatEvent {
    pub which: u8,
    pub hat: u8,
    pub value: HatPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoyButtonEvent {
    pub which: u8,
    pub button: u8,
    pub state: ButtonState,
}

/// New window size. A hint only: the screen surface is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub w: u32,
    pub h: u32,
}

/// An untyped user payload slot. Equality is identity of the shared value.
#[derive(Clone, Default)]
pub struct UserData(Option<Arc<dyn Any + Send + Sync>>);

impl UserData {
    pub fn none() -> Self {
        UserData(None)
    }

    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        UserData(Some(Arc::new(value)))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|value| value.downcast_ref::<T>())
    }
}

impl PartialEq for UserData {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => write!(f, "UserData(None)"),
            Some(_) => write!(f, "UserData(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserEvent {
    pub code: i32,
    pub data1: UserData,
    pub data2: UserData,
}

/// Windowing system a platform message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowSystem {
    X11,
    Wayland,
    Win32,
    Cocoa,
    Other,
}

/// Opaque platform window message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysWmMessage {
    /// Layout version of `payload`.
    pub version: u32,
    pub subsystem: WindowSystem,
    pub payload: Box<[u8]>,
}

/// A single input or window-lifecycle occurrence.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Application gained or lost a kind of focus.
    Active(ActiveEvent),
    Key(KeyboardEvent),
    MouseMotion(MouseMotionEvent),
    MouseButton(MouseButtonEvent),
    JoyAxis(JoyAxisEvent),
    JoyBall(JoyBallEvent),
    JoyHat(JoyHatEvent),
    JoyButton(JoyButtonEvent),
    /// Window resized; re-query the screen surface for real dimensions.
    Resize(ResizeEvent),
    /// Screen needs redrawing.
    Expose,
    Quit,
    User(UserEvent),
    SysWm(Box<SysWmMessage>),
}

impl Event {
    pub fn key(state: ButtonState, keysym: Keysym) -> Event {
        Event::Key(KeyboardEvent { state, keysym })
    }

    pub fn user(code: i32, data1: UserData, data2: UserData) -> Event {
        Event::User(UserEvent { code, data1, data2 })
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Event::Active(_) => EventType::Active,
            Event::Key(key) if key.state.is_pressed() => EventType::KeyDown,
            Event::Key(_) => EventType::KeyUp,
            Event::MouseMotion(_) => EventType::MouseMotion,
            Event::MouseButton(button) if button.state.is_pressed() => EventType::MouseButtonDown,
            Event::MouseButton(_) => EventType::MouseButtonUp,
            Event::JoyAxis(_) => EventType::JoyAxisMotion,
            Event::JoyBall(_) => EventType::JoyBallMotion,
            Event::JoyHat(_) => EventType::JoyHatMotion,
            Event::JoyButton(button) if button.state.is_pressed() => EventType::JoyButtonDown,
            Event::JoyButton(_) => EventType::JoyButtonUp,
            Event::Resize(_) => EventType::VideoResize,
            Event::Expose => EventType::VideoExpose,
            Event::Quit => EventType::Quit,
            Event::User(_) => EventType::User,
            Event::SysWm(_) => EventType::SysWm,
        }
    }

    pub fn is_joystick(&self) -> bool {
        EventType::JOYSTICK.contains(&self.event_type())
    }
}
