//! Input vocabulary shared by the device controller and the transports.
//!
//! Keys are a closed set of Android key codes. Parsing a `KEYCODE_*` name is
//! the only place a string turns into a key, so an unknown key is rejected
//! before anything reaches the device.

use crate::error::VisionError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

macro_rules! key_codes {
    ($($variant:ident => ($name:literal, $code:literal)),* $(,)?) => {
        /// Android key codes understood by the automation engine
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum KeyCode {
            $($variant,)*
        }

        impl KeyCode {
            /// Every supported key, in Android key code order
            pub const ALL: &'static [KeyCode] = &[$(KeyCode::$variant,)*];

            /// The `KEYCODE_*` constant name used by `input keyevent`
            pub fn android_name(&self) -> &'static str {
                match self {
                    $(KeyCode::$variant => $name,)*
                }
            }

            /// The numeric Android key code
            pub fn code(&self) -> u32 {
                match self {
                    $(KeyCode::$variant => $code,)*
                }
            }
        }

        impl FromStr for KeyCode {
            type Err = VisionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                let upper = trimmed.to_ascii_uppercase();
                let name = if upper.starts_with("KEYCODE_") {
                    upper
                } else {
                    format!("KEYCODE_{upper}")
                };
                match name.as_str() {
                    $($name => Ok(KeyCode::$variant),)*
                    _ => Err(VisionError::UnsupportedKey {
                        key: trimmed.to_string(),
                    }),
                }
            }
        }
    };
}

key_codes! {
    Home => ("KEYCODE_HOME", 3),
    Back => ("KEYCODE_BACK", 4),
    Call => ("KEYCODE_CALL", 5),
    EndCall => ("KEYCODE_ENDCALL", 6),
    Num0 => ("KEYCODE_0", 7),
    Num1 => ("KEYCODE_1", 8),
    Num2 => ("KEYCODE_2", 9),
    Num3 => ("KEYCODE_3", 10),
    Num4 => ("KEYCODE_4", 11),
    Num5 => ("KEYCODE_5", 12),
    Num6 => ("KEYCODE_6", 13),
    Num7 => ("KEYCODE_7", 14),
    Num8 => ("KEYCODE_8", 15),
    Num9 => ("KEYCODE_9", 16),
    Star => ("KEYCODE_STAR", 17),
    Pound => ("KEYCODE_POUND", 18),
    DpadUp => ("KEYCODE_DPAD_UP", 19),
    DpadDown => ("KEYCODE_DPAD_DOWN", 20),
    DpadLeft => ("KEYCODE_DPAD_LEFT", 21),
    DpadRight => ("KEYCODE_DPAD_RIGHT", 22),
    DpadCenter => ("KEYCODE_DPAD_CENTER", 23),
    VolumeUp => ("KEYCODE_VOLUME_UP", 24),
    VolumeDown => ("KEYCODE_VOLUME_DOWN", 25),
    Power => ("KEYCODE_POWER", 26),
    Camera => ("KEYCODE_CAMERA", 27),
    Clear => ("KEYCODE_CLEAR", 28),
    A => ("KEYCODE_A", 29),
    B => ("KEYCODE_B", 30),
    C => ("KEYCODE_C", 31),
    D => ("KEYCODE_D", 32),
    E => ("KEYCODE_E", 33),
    F => ("KEYCODE_F", 34),
    G => ("KEYCODE_G", 35),
    H => ("KEYCODE_H", 36),
    I => ("KEYCODE_I", 37),
    J => ("KEYCODE_J", 38),
    K => ("KEYCODE_K", 39),
    L => ("KEYCODE_L", 40),
    M => ("KEYCODE_M", 41),
    N => ("KEYCODE_N", 42),
    O => ("KEYCODE_O", 43),
    P => ("KEYCODE_P", 44),
    Q => ("KEYCODE_Q", 45),
    R => ("KEYCODE_R", 46),
    S => ("KEYCODE_S", 47),
    T => ("KEYCODE_T", 48),
    U => ("KEYCODE_U", 49),
    V => ("KEYCODE_V", 50),
    W => ("KEYCODE_W", 51),
    X => ("KEYCODE_X", 52),
    Y => ("KEYCODE_Y", 53),
    Z => ("KEYCODE_Z", 54),
    Comma => ("KEYCODE_COMMA", 55),
    Period => ("KEYCODE_PERIOD", 56),
    AltLeft => ("KEYCODE_ALT_LEFT", 57),
    AltRight => ("KEYCODE_ALT_RIGHT", 58),
    ShiftLeft => ("KEYCODE_SHIFT_LEFT", 59),
    ShiftRight => ("KEYCODE_SHIFT_RIGHT", 60),
    Tab => ("KEYCODE_TAB", 61),
    Space => ("KEYCODE_SPACE", 62),
    Explorer => ("KEYCODE_EXPLORER", 64),
    Envelope => ("KEYCODE_ENVELOPE", 65),
    Enter => ("KEYCODE_ENTER", 66),
    Del => ("KEYCODE_DEL", 67),
    Grave => ("KEYCODE_GRAVE", 68),
    Minus => ("KEYCODE_MINUS", 69),
    Equals => ("KEYCODE_EQUALS", 70),
    LeftBracket => ("KEYCODE_LEFT_BRACKET", 71),
    RightBracket => ("KEYCODE_RIGHT_BRACKET", 72),
    Backslash => ("KEYCODE_BACKSLASH", 73),
    Semicolon => ("KEYCODE_SEMICOLON", 74),
    Apostrophe => ("KEYCODE_APOSTROPHE", 75),
    Slash => ("KEYCODE_SLASH", 76),
    At => ("KEYCODE_AT", 77),
    Plus => ("KEYCODE_PLUS", 81),
    Menu => ("KEYCODE_MENU", 82),
    Search => ("KEYCODE_SEARCH", 84),
    MediaPlayPause => ("KEYCODE_MEDIA_PLAY_PAUSE", 85),
    PageUp => ("KEYCODE_PAGE_UP", 92),
    PageDown => ("KEYCODE_PAGE_DOWN", 93),
    Escape => ("KEYCODE_ESCAPE", 111),
    ForwardDel => ("KEYCODE_FORWARD_DEL", 112),
    MoveHome => ("KEYCODE_MOVE_HOME", 122),
    MoveEnd => ("KEYCODE_MOVE_END", 123),
    AppSwitch => ("KEYCODE_APP_SWITCH", 187),
    Sleep => ("KEYCODE_SLEEP", 223),
    Wakeup => ("KEYCODE_WAKEUP", 224),
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.android_name())
    }
}

/// What happens to a key: pressed, released, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KeyAction {
    Down,
    Up,
    DownAndUp,
}

impl KeyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAction::Down => "DOWN",
            KeyAction::Up => "UP",
            KeyAction::DownAndUp => "DOWN_AND_UP",
        }
    }
}

impl FromStr for KeyAction {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DOWN" => Ok(KeyAction::Down),
            "UP" => Ok(KeyAction::Up),
            "DOWN_AND_UP" => Ok(KeyAction::DownAndUp),
            other => Err(VisionError::UnsupportedKey {
                key: format!("action {other}"),
            }),
        }
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single device-level input event, the unit a transport sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputEvent {
    Key {
        key: KeyCode,
        action: KeyAction,
        shift: bool,
    },
    PointerDown {
        x: u32,
        y: u32,
    },
    PointerMove {
        x: u32,
        y: u32,
    },
    PointerUp {
        x: u32,
        y: u32,
    },
}

impl InputEvent {
    pub fn key(key: KeyCode, action: KeyAction) -> Self {
        InputEvent::Key {
            key,
            action,
            shift: false,
        }
    }
}

/// Maps a character to (key, needs_shift) on a US layout.
/// Returns `None` for characters that cannot be typed.
pub fn char_to_key(c: char) -> Option<(KeyCode, bool)> {
    use KeyCode::*;

    if c.is_ascii_lowercase() {
        return letter_key(c).map(|k| (k, false));
    }
    if c.is_ascii_uppercase() {
        return letter_key(c.to_ascii_lowercase()).map(|k| (k, true));
    }
    if let Some(digit) = c.to_digit(10) {
        return Some((digit_key(digit), false));
    }

    let mapped = match c {
        ' ' => (Space, false),
        '\n' => (Enter, false),
        '\t' => (Tab, false),
        ',' => (Comma, false),
        '.' => (Period, false),
        '`' => (Grave, false),
        '-' => (Minus, false),
        '=' => (Equals, false),
        '[' => (LeftBracket, false),
        ']' => (RightBracket, false),
        '\\' => (Backslash, false),
        ';' => (Semicolon, false),
        '\'' => (Apostrophe, false),
        '/' => (Slash, false),
        '@' => (At, false),
        '+' => (Plus, false),
        '*' => (Star, false),
        '#' => (Pound, false),
        '!' => (Num1, true),
        '$' => (Num4, true),
        '%' => (Num5, true),
        '^' => (Num6, true),
        '&' => (Num7, true),
        '(' => (Num9, true),
        ')' => (Num0, true),
        '_' => (Minus, true),
        ':' => (Semicolon, true),
        '"' => (Apostrophe, true),
        '<' => (Comma, true),
        '>' => (Period, true),
        '?' => (Slash, true),
        '{' => (LeftBracket, true),
        '}' => (RightBracket, true),
        '|' => (Backslash, true),
        '~' => (Grave, true),
        _ => return None,
    };
    Some(mapped)
}

#[rustfmt::skip]
const LETTERS: [KeyCode; 26] = [
    KeyCode::A, KeyCode::B, KeyCode::C, KeyCode::D, KeyCode::E, KeyCode::F, KeyCode::G,
    KeyCode::H, KeyCode::I, KeyCode::J, KeyCode::K, KeyCode::L, KeyCode::M, KeyCode::N,
    KeyCode::O, KeyCode::P, KeyCode::Q, KeyCode::R, KeyCode::S, KeyCode::T, KeyCode::U,
    KeyCode::V, KeyCode::W, KeyCode::X, KeyCode::Y, KeyCode::Z,
];

#[rustfmt::skip]
const DIGITS: [KeyCode; 10] = [
    KeyCode::Num0, KeyCode::Num1, KeyCode::Num2, KeyCode::Num3, KeyCode::Num4,
    KeyCode::Num5, KeyCode::Num6, KeyCode::Num7, KeyCode::Num8, KeyCode::Num9,
];

fn letter_key(c: char) -> Option<KeyCode> {
    let offset = (c as u32).checked_sub('a' as u32)?;
    LETTERS.get(offset as usize).copied()
}

fn digit_key(digit: u32) -> KeyCode {
    DIGITS[digit as usize % DIGITS.len()]
}
