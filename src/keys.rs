// src/keys.rs

//! Portable keyboard symbol table and modifier mask.
//!
//! Symbols are small integers from a fixed, versioned enumeration: printable
//! keys are ASCII-aligned, international keys occupy `160..=255`, and the
//! keypad, navigation, function and modifier keys follow in fixed ranges.
//! The numbering is bit-stable so persisted bindings stay valid.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Keyboard modifier state. Each side of each modifier is its own bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u16 {
        const LSHIFT = 0x0001;
        const RSHIFT = 0x0002;
        const LCTRL = 0x0040;
        const RCTRL = 0x0080;
        const LALT = 0x0100;
        const RALT = 0x0200;
        const LMETA = 0x0400;
        const RMETA = 0x0800;
        const NUM = 0x1000;
        const CAPS = 0x2000;
        const MODE = 0x4000;
        const RESERVED = 0x8000;

        const SHIFT = Self::LSHIFT.bits() | Self::RSHIFT.bits();
        const CTRL = Self::LCTRL.bits() | Self::RCTRL.bits();
        const ALT = Self::LALT.bits() | Self::RALT.bits();
        const META = Self::LMETA.bits() | Self::RMETA.bits();
    }
}

/// A portable key symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct KeySymbol(u16);

/// First international ("world") symbol.
const WORLD_FIRST: u16 = 160;
/// Last international ("world") symbol.
const WORLD_LAST: u16 = 255;

macro_rules! key_symbols {
    ($($name:ident = $value:literal, $label:literal;)*) => {
        impl KeySymbol {
            $(pub const $name: KeySymbol = KeySymbol($value);)*

            fn label(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some($label),)*
                    _ => None,
                }
            }
        }
    };
}

key_symbols! {
    UNKNOWN = 0, "unknown";
    BACKSPACE = 8, "backspace";
    TAB = 9, "tab";
    CLEAR = 12, "clear";
    RETURN = 13, "return";
    PAUSE = 19, "pause";
    ESCAPE = 27, "escape";
    SPACE = 32, "space";
    EXCLAIM = 33, "!";
    QUOTEDBL = 34, "\"";
    HASH = 35, "#";
    DOLLAR = 36, "$";
    AMPERSAND = 38, "&";
    QUOTE = 39, "'";
    LEFTPAREN = 40, "(";
    RIGHTPAREN = 41, ")";
    ASTERISK = 42, "*";
    PLUS = 43, "+";
    COMMA = 44, ",";
    MINUS = 45, "-";
    PERIOD = 46, ".";
    SLASH = 47, "/";
    NUM_0 = 48, "0";
    NUM_1 = 49, "1";
    NUM_2 = 50, "2";
    NUM_3 = 51, "3";
    NUM_4 = 52, "4";
    NUM_5 = 53, "5";
    NUM_6 = 54, "6";
    NUM_7 = 55, "7";
    NUM_8 = 56, "8";
    NUM_9 = 57, "9";
    COLON = 58, ":";
    SEMICOLON = 59, ";";
    LESS = 60, "<";
    EQUALS = 61, "=";
    GREATER = 62, ">";
    QUESTION = 63, "?";
    AT = 64, "@";
    LEFTBRACKET = 91, "[";
    BACKSLASH = 92, "\\";
    RIGHTBRACKET = 93, "]";
    CARET = 94, "^";
    UNDERSCORE = 95, "_";
    BACKQUOTE = 96, "`";
    A = 97, "a";
    B = 98, "b";
    C = 99, "c";
    D = 100, "d";
    E = 101, "e";
    F = 102, "f";
    G = 103, "g";
    H = 104, "h";
    I = 105, "i";
    J = 106, "j";
    K = 107, "k";
    L = 108, "l";
    M = 109, "m";
    N = 110, "n";
    O = 111, "o";
    P = 112, "p";
    Q = 113, "q";
    R = 114, "r";
    S = 115, "s";
    T = 116, "t";
    U = 117, "u";
    V = 118, "v";
    W = 119, "w";
    X = 120, "x";
    Y = 121, "y";
    Z = 122, "z";
    DELETE = 127, "delete";
    KP0 = 256, "[0]";
    KP1 = 257, "[1]";
    KP2 = 258, "[2]";
    KP3 = 259, "[3]";
    KP4 = 260, "[4]";
    KP5 = 261, "[5]";
    KP6 = 262, "[6]";
    KP7 = 263, "[7]";
    KP8 = 264, "[8]";
    KP9 = 265, "[9]";
    KP_PERIOD = 266, "[.]";
    KP_DIVIDE = 267, "[/]";
    KP_MULTIPLY = 268, "[*]";
    KP_MINUS = 269, "[-]";
    KP_PLUS = 270, "[+]";
    KP_ENTER = 271, "enter";
    KP_EQUALS = 272, "equals";
    UP = 273, "up";
    DOWN = 274, "down";
    RIGHT = 275, "right";
    LEFT = 276, "left";
    INSERT = 277, "insert";
    HOME = 278, "home";
    END = 279, "end";
    PAGEUP = 280, "page up";
    PAGEDOWN = 281, "page down";
    F1 = 282, "f1";
    F2 = 283, "f2";
    F3 = 284, "f3";
    F4 = 285, "f4";
    F5 = 286, "f5";
    F6 = 287, "f6";
    F7 = 288, "f7";
    F8 = 289, "f8";
    F9 = 290, "f9";
    F10 = 291, "f10";
    F11 = 292, "f11";
    F12 = 293, "f12";
    F13 = 294, "f13";
    F14 = 295, "f14";
    F15 = 296, "f15";
    NUMLOCK = 300, "numlock";
    CAPSLOCK = 301, "caps lock";
    SCROLLOCK = 302, "scroll lock";
    RSHIFT = 303, "right shift";
    LSHIFT = 304, "left shift";
    RCTRL = 305, "right ctrl";
    LCTRL = 306, "left ctrl";
    RALT = 307, "right alt";
    LALT = 308, "left alt";
    RMETA = 309, "right meta";
    LMETA = 310, "left meta";
    LSUPER = 311, "left super";
    RSUPER = 312, "right super";
    MODE = 313, "alt gr";
    COMPOSE = 314, "compose";
    HELP = 315, "help";
    PRINT = 316, "print screen";
    SYSREQ = 317, "sys req";
    BREAK = 318, "break";
    MENU = 319, "menu";
    POWER = 320, "power";
    EURO = 321, "euro";
    UNDO = 322, "undo";
}

impl KeySymbol {
    /// One past the highest defined symbol; sizes the key state table.
    pub const LAST: u16 = 323;

    /// Looks up a raw symbol value, rejecting gaps in the enumeration.
    pub fn from_raw(raw: u16) -> Option<KeySymbol> {
        let sym = KeySymbol(raw);
        if sym.is_world() || sym.label().is_some() {
            Some(sym)
        } else {
            None
        }
    }

    /// The `n`th international key (`0..=95`).
    pub fn world(n: u8) -> Option<KeySymbol> {
        let raw = WORLD_FIRST + u16::from(n);
        (raw <= WORLD_LAST).then_some(KeySymbol(raw))
    }

    /// Symbol for a printable ASCII character. Uppercase letters fold to
    /// their lowercase symbol.
    pub fn from_char(c: char) -> Option<KeySymbol> {
        if !c.is_ascii() {
            return None;
        }
        KeySymbol::from_raw(c.to_ascii_lowercase() as u16)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    /// Index into the keyboard state table.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn is_world(self) -> bool {
        (WORLD_FIRST..=WORLD_LAST).contains(&self.0)
    }

    pub fn is_keypad(self) -> bool {
        (Self::KP0.0..=Self::KP_EQUALS.0).contains(&self.0)
    }

    /// Returns the modifier bit a key drives, if it is a modifier key.
    pub fn modifier(self) -> Option<Modifiers> {
        match self {
            KeySymbol::LSHIFT => Some(Modifiers::LSHIFT),
            KeySymbol::RSHIFT => Some(Modifiers::RSHIFT),
            KeySymbol::LCTRL => Some(Modifiers::LCTRL),
            KeySymbol::RCTRL => Some(Modifiers::RCTRL),
            KeySymbol::LALT => Some(Modifiers::LALT),
            KeySymbol::RALT => Some(Modifiers::RALT),
            KeySymbol::LMETA | KeySymbol::LSUPER => Some(Modifiers::LMETA),
            KeySymbol::RMETA | KeySymbol::RSUPER => Some(Modifiers::RMETA),
            KeySymbol::MODE => Some(Modifiers::MODE),
            KeySymbol::CAPSLOCK => Some(Modifiers::CAPS),
            KeySymbol::NUMLOCK => Some(Modifiers::NUM),
            _ => None,
        }
    }

    /// Lock keys toggle their modifier bit on press instead of tracking
    /// the key level.
    pub fn is_lock(self) -> bool {
        matches!(self, KeySymbol::CAPSLOCK | KeySymbol::NUMLOCK)
    }

    /// Translates the symbol into a Unicode codepoint under `modifiers`.
    /// Returns 0 when the key has no character.
    pub fn translate(self, modifiers: Modifiers) -> u16 {
        if self.0 == 0 || self.0 >= 128 {
            return match self {
                KeySymbol::KP_DIVIDE => u16::from(b'/'),
                KeySymbol::KP_MULTIPLY => u16::from(b'*'),
                KeySymbol::KP_MINUS => u16::from(b'-'),
                KeySymbol::KP_PLUS => u16::from(b'+'),
                KeySymbol::KP_ENTER => u16::from(b'\r'),
                KeySymbol::KP_EQUALS => u16::from(b'='),
                KeySymbol::KP_PERIOD if modifiers.contains(Modifiers::NUM) => u16::from(b'.'),
                sym if modifiers.contains(Modifiers::NUM)
                    && (KeySymbol::KP0.0..=KeySymbol::KP9.0).contains(&sym.0) =>
                {
                    u16::from(b'0') + (sym.0 - KeySymbol::KP0.0)
                }
                _ => 0,
            };
        }
        if self.0 == Self::DELETE.0 {
            return self.0;
        }
        let byte = self.0 as u8;
        let shifted = modifiers.intersects(Modifiers::SHIFT);
        if byte.is_ascii_lowercase() {
            let upper = shifted ^ modifiers.contains(Modifiers::CAPS);
            return u16::from(if upper { byte.to_ascii_uppercase() } else { byte });
        }
        if shifted {
            if let Some(shifted_byte) = shifted_us_layout(byte) {
                return u16::from(shifted_byte);
            }
        }
        u16::from(byte)
    }

    pub fn name(self) -> Option<&'static str> {
        self.label()
    }
}

impl fmt::Display for KeySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{}", label),
            None if self.is_world() => write!(f, "world {}", self.0 - WORLD_FIRST),
            None => write!(f, "unknown key {}", self.0),
        }
    }
}

/// Shifted punctuation on a US layout.
fn shifted_us_layout(byte: u8) -> Option<u8> {
    let shifted = match byte {
        b'1' => b'!',
        b'2' => b'@',
        b'3' => b'#',
        b'4' => b'$',
        b'5' => b'%',
        b'6' => b'^',
        b'7' => b'&',
        b'8' => b'*',
        b'9' => b'(',
        b'0' => b')',
        b'-' => b'_',
        b'=' => b'+',
        b'[' => b'{',
        b']' => b'}',
        b'\\' => b'|',
        b';' => b':',
        b'\'' => b'"',
        b',' => b'<',
        b'.' => b'>',
        b'/' => b'?',
        b'`' => b'~',
        _ => return None,
    };
    Some(shifted)
}

/// Maps a Linux evdev key code (`KEY_*` from `linux/input-event-codes.h`)
/// to a portable symbol.
pub fn from_evdev(code: u16) -> KeySymbol {
    const LETTER_ROWS: [(u16, &[u8]); 3] = [
        (16, b"qwertyuiop"),
        (30, b"asdfghjkl"),
        (44, b"zxcvbnm"),
    ];
    for (first, row) in LETTER_ROWS {
        if code >= first && usize::from(code - first) < row.len() {
            return KeySymbol(u16::from(row[usize::from(code - first)]));
        }
    }
    match code {
        1 => KeySymbol::ESCAPE,
        2..=10 => KeySymbol(KeySymbol::NUM_1.0 + (code - 2)),
        11 => KeySymbol::NUM_0,
        12 => KeySymbol::MINUS,
        13 => KeySymbol::EQUALS,
        14 => KeySymbol::BACKSPACE,
        15 => KeySymbol::TAB,
        26 => KeySymbol::LEFTBRACKET,
        27 => KeySymbol::RIGHTBRACKET,
        28 => KeySymbol::RETURN,
        29 => KeySymbol::LCTRL,
        39 => KeySymbol::SEMICOLON,
        40 => KeySymbol::QUOTE,
        41 => KeySymbol::BACKQUOTE,
        42 => KeySymbol::LSHIFT,
        43 => KeySymbol::BACKSLASH,
        51 => KeySymbol::COMMA,
        52 => KeySymbol::PERIOD,
        53 => KeySymbol::SLASH,
        54 => KeySymbol::RSHIFT,
        55 => KeySymbol::KP_MULTIPLY,
        56 => KeySymbol::LALT,
        57 => KeySymbol::SPACE,
        58 => KeySymbol::CAPSLOCK,
        59..=68 => KeySymbol(KeySymbol::F1.0 + (code - 59)),
        69 => KeySymbol::NUMLOCK,
        70 => KeySymbol::SCROLLOCK,
        71 => KeySymbol::KP7,
        72 => KeySymbol::KP8,
        73 => KeySymbol::KP9,
        74 => KeySymbol::KP_MINUS,
        75 => KeySymbol::KP4,
        76 => KeySymbol::KP5,
        77 => KeySymbol::KP6,
        78 => KeySymbol::KP_PLUS,
        79 => KeySymbol::KP1,
        80 => KeySymbol::KP2,
        81 => KeySymbol::KP3,
        82 => KeySymbol::KP0,
        83 => KeySymbol::KP_PERIOD,
        87 => KeySymbol::F11,
        88 => KeySymbol::F12,
        96 => KeySymbol::KP_ENTER,
        97 => KeySymbol::RCTRL,
        98 => KeySymbol::KP_DIVIDE,
        99 => KeySymbol::PRINT,
        100 => KeySymbol::RALT,
        102 => KeySymbol::HOME,
        103 => KeySymbol::UP,
        104 => KeySymbol::PAGEUP,
        105 => KeySymbol::LEFT,
        106 => KeySymbol::RIGHT,
        107 => KeySymbol::END,
        108 => KeySymbol::DOWN,
        109 => KeySymbol::PAGEDOWN,
        110 => KeySymbol::INSERT,
        111 => KeySymbol::DELETE,
        116 => KeySymbol::POWER,
        117 => KeySymbol::KP_EQUALS,
        119 => KeySymbol::PAUSE,
        125 => KeySymbol::LSUPER,
        126 => KeySymbol::RSUPER,
        127 => KeySymbol::COMPOSE,
        131 => KeySymbol::UNDO,
        138 => KeySymbol::HELP,
        139 => KeySymbol::MENU,
        183..=185 => KeySymbol(KeySymbol::F13.0 + (code - 183)),
        _ => KeySymbol::UNKNOWN,
    }
}

/// Backend scancode for an evdev key code (X11-style `code + 8`), or 0 when
/// it does not fit.
pub fn scancode_from_evdev(code: u16) -> u8 {
    code.checked_add(8)
        .and_then(|scancode| u8::try_from(scancode).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_keep_printable_symbols_ascii_aligned() {
        assert_eq!(KeySymbol::A.raw(), u16::from(b'a'));
        assert_eq!(KeySymbol::SPACE.raw(), 32);
        assert_eq!(KeySymbol::from_char('Q'), Some(KeySymbol::Q));
        assert_eq!(KeySymbol::from_char('é'), None);
    }

    #[test]
    fn it_should_reject_gaps_in_the_enumeration() {
        assert_eq!(KeySymbol::from_raw(65), None); // uppercase letters are skipped
        assert_eq!(KeySymbol::from_raw(297), None);
        assert_eq!(KeySymbol::from_raw(KeySymbol::LAST), None);
        assert_eq!(KeySymbol::from_raw(161), KeySymbol::world(1));
        assert_eq!(KeySymbol::world(96), None);
    }

    #[test]
    fn it_should_translate_with_shift_and_caps_lock() {
        assert_eq!(KeySymbol::A.translate(Modifiers::empty()), u16::from(b'a'));
        assert_eq!(KeySymbol::A.translate(Modifiers::LSHIFT), u16::from(b'A'));
        assert_eq!(KeySymbol::A.translate(Modifiers::CAPS), u16::from(b'A'));
        assert_eq!(
            KeySymbol::A.translate(Modifiers::CAPS | Modifiers::RSHIFT),
            u16::from(b'a')
        );
        assert_eq!(KeySymbol::NUM_1.translate(Modifiers::LSHIFT), u16::from(b'!'));
        assert_eq!(KeySymbol::F1.translate(Modifiers::empty()), 0);
        assert_eq!(KeySymbol::KP5.translate(Modifiers::NUM), u16::from(b'5'));
        assert_eq!(KeySymbol::KP5.translate(Modifiers::empty()), 0);
    }

    #[test]
    fn it_should_map_evdev_codes() {
        assert_eq!(from_evdev(30), KeySymbol::A);
        assert_eq!(from_evdev(50), KeySymbol::M);
        assert_eq!(from_evdev(11), KeySymbol::NUM_0);
        assert_eq!(from_evdev(2), KeySymbol::NUM_1);
        assert_eq!(from_evdev(68), KeySymbol::F10);
        assert_eq!(from_evdev(185), KeySymbol::F15);
        assert_eq!(from_evdev(42).modifier(), Some(Modifiers::LSHIFT));
        assert_eq!(from_evdev(0xffff), KeySymbol::UNKNOWN);
        assert_eq!(scancode_from_evdev(30), 38);
        assert_eq!(scancode_from_evdev(247), 255);
        assert_eq!(scancode_from_evdev(248), 0);
        assert_eq!(scancode_from_evdev(0xfff8), 0);
        assert_eq!(scancode_from_evdev(0xffff), 0);
    }

    #[test]
    fn it_should_serialize_symbols_as_their_stable_integer() {
        let json = serde_json::to_string(&KeySymbol::F1).unwrap();
        assert_eq!(json, "282");
        let mods: Modifiers = serde_json::from_str(&serde_json::to_string(&Modifiers::CTRL).unwrap()).unwrap();
        assert_eq!(mods, Modifiers::LCTRL | Modifiers::RCTRL);
    }
}
