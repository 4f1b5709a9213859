//! Keyboard scan codes (PS/2 scan code set 1).
//!
//! A scan code identifies a *physical* key position, independent of the active
//! keyboard layout.  The letter key in the top-left corner of the alphabetic
//! block reports make code `0x10` whether the layout labels it "Q" (QWERTY) or
//! "A" (AZERTY).
//!
//! Keys that the keyboard sends with an `E0` prefix byte (the right-hand
//! modifiers, the navigation cluster, keypad Enter and `/`) are folded into a
//! single 16-bit value with `0xE0` in the high byte, e.g. Right Ctrl is
//! `0xE01D` while Left Ctrl is `0x001D`.
//!
//! # The `Unknown` sentinel
//!
//! Reports for keys outside the table (vendor media keys, `E1`-prefixed Pause,
//! malformed reports) decode to [`ScanCode::Unknown`] (value `0x0000`).  The
//! event is still published so a receiver can see that *some* key moved.

/// Declares the scan code enumeration and its reverse lookup from one table so
/// the two can never drift apart.
macro_rules! scan_codes {
    ($( $(#[$meta:meta])* $name:ident = $value:literal, )+) => {
        /// Normalized 16-bit keyboard scan code.
        ///
        /// The numeric value of each variant is its set-1 make code (with the
        /// `E0` prefix in the high byte where applicable).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum ScanCode {
            /// Sentinel for any make code not in this table (`UnknownScanCode`).
            Unknown = 0x0000,
            $( $(#[$meta])* $name = $value, )+
        }

        impl ScanCode {
            /// Every known scan code, excluding [`ScanCode::Unknown`].
            pub const ALL: &'static [ScanCode] = &[ $( ScanCode::$name, )+ ];

            /// Converts a normalized 16-bit value to a [`ScanCode`].
            ///
            /// Returns [`ScanCode::Unknown`] if the value is not in the table.
            pub fn from_u16(value: u16) -> Self {
                match value {
                    $( $value => ScanCode::$name, )+
                    _ => ScanCode::Unknown,
                }
            }
        }
    };
}

scan_codes! {
    // Control keys
    Escape = 0x0001,
    Backspace = 0x000E,
    Tab = 0x000F,
    Enter = 0x001C,
    Space = 0x0039,
    CapsLock = 0x003A,
    NumLock = 0x0045,
    ScrollLock = 0x0046,
    /// Reported by the keyboard when too many keys are held at once.
    ErrorRollOver = 0x00FF,

    // Digit row
    Digit1 = 0x0002,
    Digit2 = 0x0003,
    Digit3 = 0x0004,
    Digit4 = 0x0005,
    Digit5 = 0x0006,
    Digit6 = 0x0007,
    Digit7 = 0x0008,
    Digit8 = 0x0009,
    Digit9 = 0x000A,
    Digit0 = 0x000B,
    Minus = 0x000C,
    Equal = 0x000D,

    // Letters
    KeyQ = 0x0010,
    KeyW = 0x0011,
    KeyE = 0x0012,
    KeyR = 0x0013,
    KeyT = 0x0014,
    KeyY = 0x0015,
    KeyU = 0x0016,
    KeyI = 0x0017,
    KeyO = 0x0018,
    KeyP = 0x0019,
    BracketLeft = 0x001A,
    BracketRight = 0x001B,
    KeyA = 0x001E,
    KeyS = 0x001F,
    KeyD = 0x0020,
    KeyF = 0x0021,
    KeyG = 0x0022,
    KeyH = 0x0023,
    KeyJ = 0x0024,
    KeyK = 0x0025,
    KeyL = 0x0026,
    Semicolon = 0x0027,
    Quote = 0x0028,
    Backquote = 0x0029,
    Backslash = 0x002B,
    KeyZ = 0x002C,
    KeyX = 0x002D,
    KeyC = 0x002E,
    KeyV = 0x002F,
    KeyB = 0x0030,
    KeyN = 0x0031,
    KeyM = 0x0032,
    Comma = 0x0033,
    Period = 0x0034,
    Slash = 0x0035,
    /// The extra key between Left Shift and Z on ISO keyboards.
    IntlBackslash = 0x0056,

    // Function keys
    F1 = 0x003B,
    F2 = 0x003C,
    F3 = 0x003D,
    F4 = 0x003E,
    F5 = 0x003F,
    F6 = 0x0040,
    F7 = 0x0041,
    F8 = 0x0042,
    F9 = 0x0043,
    F10 = 0x0044,
    F11 = 0x0057,
    F12 = 0x0058,
    F13 = 0x0064,
    F14 = 0x0065,
    F15 = 0x0066,
    F16 = 0x0067,
    F17 = 0x0068,
    F18 = 0x0069,
    F19 = 0x006A,
    F20 = 0x006B,
    F21 = 0x006C,
    F22 = 0x006D,
    F23 = 0x006E,
    F24 = 0x0076,

    // Keypad
    NumpadMultiply = 0x0037,
    NumpadSubtract = 0x004A,
    NumpadAdd = 0x004E,
    Numpad7 = 0x0047,
    Numpad8 = 0x0048,
    Numpad9 = 0x0049,
    Numpad4 = 0x004B,
    Numpad5 = 0x004C,
    Numpad6 = 0x004D,
    Numpad1 = 0x004F,
    Numpad2 = 0x0050,
    Numpad3 = 0x0051,
    Numpad0 = 0x0052,
    NumpadDecimal = 0x0053,
    NumpadEqual = 0x0059,
    NumpadEnter = 0xE01C,
    NumpadDivide = 0xE035,

    // Navigation cluster
    PrintScreen = 0xE037,
    Home = 0xE047,
    ArrowUp = 0xE048,
    PageUp = 0xE049,
    ArrowLeft = 0xE04B,
    ArrowRight = 0xE04D,
    End = 0xE04F,
    ArrowDown = 0xE050,
    PageDown = 0xE051,
    Insert = 0xE052,
    Delete = 0xE053,
    ContextMenu = 0xE05D,
    Power = 0xE05E,

    // Modifiers
    ControlLeft = 0x001D,
    ShiftLeft = 0x002A,
    AltLeft = 0x0038,
    ShiftRight = 0x0036,
    MetaLeft = 0xE05B,
    MetaRight = 0xE05C,
    ControlRight = 0xE01D,
    AltRight = 0xE038,
}

impl ScanCode {
    /// Prefix marker folded into the high byte for `E0`-prefixed keys.
    pub const E0_PREFIX: u16 = 0xE000;

    /// Returns the raw 16-bit value for this scan code.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl From<ScanCode> for u16 {
    fn from(code: ScanCode) -> Self {
        code.as_u16()
    }
}
