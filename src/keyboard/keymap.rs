//! Key code definitions, matrix geometry and the per-variant key tables

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::LazyLock;

/// A logical key in the Linux input-event vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match KEY_NAMES.get(self) {
            Some(name) => f.write_str(name),
            None => write!(f, "key{}", self.0),
        }
    }
}

// Key codes from linux/input-event-codes.h, limited to what the matrix
// and its substitution rules can emit.
pub const KEY_RESERVED: KeyCode = KeyCode(0);
pub const KEY_ESC: KeyCode = KeyCode(1);
pub const KEY_1: KeyCode = KeyCode(2);
pub const KEY_2: KeyCode = KeyCode(3);
pub const KEY_3: KeyCode = KeyCode(4);
pub const KEY_4: KeyCode = KeyCode(5);
pub const KEY_5: KeyCode = KeyCode(6);
pub const KEY_6: KeyCode = KeyCode(7);
pub const KEY_7: KeyCode = KeyCode(8);
pub const KEY_8: KeyCode = KeyCode(9);
pub const KEY_9: KeyCode = KeyCode(10);
pub const KEY_0: KeyCode = KeyCode(11);
pub const KEY_MINUS: KeyCode = KeyCode(12);
pub const KEY_EQUAL: KeyCode = KeyCode(13);
pub const KEY_BACKSPACE: KeyCode = KeyCode(14);
pub const KEY_TAB: KeyCode = KeyCode(15);
pub const KEY_Q: KeyCode = KeyCode(16);
pub const KEY_W: KeyCode = KeyCode(17);
pub const KEY_E: KeyCode = KeyCode(18);
pub const KEY_R: KeyCode = KeyCode(19);
pub const KEY_T: KeyCode = KeyCode(20);
pub const KEY_Y: KeyCode = KeyCode(21);
pub const KEY_U: KeyCode = KeyCode(22);
pub const KEY_I: KeyCode = KeyCode(23);
pub const KEY_O: KeyCode = KeyCode(24);
pub const KEY_P: KeyCode = KeyCode(25);
pub const KEY_LEFTBRACE: KeyCode = KeyCode(26);
pub const KEY_RIGHTBRACE: KeyCode = KeyCode(27);
pub const KEY_ENTER: KeyCode = KeyCode(28);
pub const KEY_LEFTCTRL: KeyCode = KeyCode(29);
pub const KEY_A: KeyCode = KeyCode(30);
pub const KEY_S: KeyCode = KeyCode(31);
pub const KEY_D: KeyCode = KeyCode(32);
pub const KEY_F: KeyCode = KeyCode(33);
pub const KEY_G: KeyCode = KeyCode(34);
pub const KEY_H: KeyCode = KeyCode(35);
pub const KEY_J: KeyCode = KeyCode(36);
pub const KEY_K: KeyCode = KeyCode(37);
pub const KEY_L: KeyCode = KeyCode(38);
pub const KEY_SEMICOLON: KeyCode = KeyCode(39);
pub const KEY_APOSTROPHE: KeyCode = KeyCode(40);
pub const KEY_GRAVE: KeyCode = KeyCode(41);
pub const KEY_LEFTSHIFT: KeyCode = KeyCode(42);
pub const KEY_BACKSLASH: KeyCode = KeyCode(43);
pub const KEY_Z: KeyCode = KeyCode(44);
pub const KEY_X: KeyCode = KeyCode(45);
pub const KEY_C: KeyCode = KeyCode(46);
pub const KEY_V: KeyCode = KeyCode(47);
pub const KEY_B: KeyCode = KeyCode(48);
pub const KEY_N: KeyCode = KeyCode(49);
pub const KEY_M: KeyCode = KeyCode(50);
pub const KEY_COMMA: KeyCode = KeyCode(51);
pub const KEY_DOT: KeyCode = KeyCode(52);
pub const KEY_SLASH: KeyCode = KeyCode(53);
pub const KEY_LEFTALT: KeyCode = KeyCode(56);
pub const KEY_SPACE: KeyCode = KeyCode(57);
pub const KEY_CAPSLOCK: KeyCode = KeyCode(58);
pub const KEY_F1: KeyCode = KeyCode(59);
pub const KEY_F2: KeyCode = KeyCode(60);
pub const KEY_F3: KeyCode = KeyCode(61);
pub const KEY_F4: KeyCode = KeyCode(62);
pub const KEY_F5: KeyCode = KeyCode(63);
pub const KEY_F6: KeyCode = KeyCode(64);
pub const KEY_F7: KeyCode = KeyCode(65);
pub const KEY_F8: KeyCode = KeyCode(66);
pub const KEY_F9: KeyCode = KeyCode(67);
pub const KEY_F10: KeyCode = KeyCode(68);
pub const KEY_NUMLOCK: KeyCode = KeyCode(69);
pub const KEY_F11: KeyCode = KeyCode(87);
pub const KEY_F12: KeyCode = KeyCode(88);
pub const KEY_UP: KeyCode = KeyCode(103);
pub const KEY_LEFT: KeyCode = KeyCode(105);
pub const KEY_RIGHT: KeyCode = KeyCode(106);
pub const KEY_DOWN: KeyCode = KeyCode(108);
pub const KEY_DELETE: KeyCode = KeyCode(111);
pub const KEY_PAUSE: KeyCode = KeyCode(119);
pub const KEY_COPY: KeyCode = KeyCode(133);
pub const KEY_CLEAR: KeyCode = KeyCode(355);
pub const KEY_FN: KeyCode = KeyCode(464);

/// Display names for logging
static KEY_NAMES: LazyLock<HashMap<KeyCode, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    map.insert(KEY_RESERVED, "Reserved");
    map.insert(KEY_ESC, "Escape");
    map.insert(KEY_1, "1");
    map.insert(KEY_2, "2");
    map.insert(KEY_3, "3");
    map.insert(KEY_4, "4");
    map.insert(KEY_5, "5");
    map.insert(KEY_6, "6");
    map.insert(KEY_7, "7");
    map.insert(KEY_8, "8");
    map.insert(KEY_9, "9");
    map.insert(KEY_0, "0");
    map.insert(KEY_MINUS, "Minus");
    map.insert(KEY_EQUAL, "Equals");
    map.insert(KEY_BACKSPACE, "Backspace");
    map.insert(KEY_TAB, "Tab");
    map.insert(KEY_Q, "Q");
    map.insert(KEY_W, "W");
    map.insert(KEY_E, "E");
    map.insert(KEY_R, "R");
    map.insert(KEY_T, "T");
    map.insert(KEY_Y, "Y");
    map.insert(KEY_U, "U");
    map.insert(KEY_I, "I");
    map.insert(KEY_O, "O");
    map.insert(KEY_P, "P");
    map.insert(KEY_LEFTBRACE, "LeftBracket");
    map.insert(KEY_RIGHTBRACE, "RightBracket");
    map.insert(KEY_ENTER, "Enter");
    map.insert(KEY_LEFTCTRL, "LeftCtrl");
    map.insert(KEY_A, "A");
    map.insert(KEY_S, "S");
    map.insert(KEY_D, "D");
    map.insert(KEY_F, "F");
    map.insert(KEY_G, "G");
    map.insert(KEY_H, "H");
    map.insert(KEY_J, "J");
    map.insert(KEY_K, "K");
    map.insert(KEY_L, "L");
    map.insert(KEY_SEMICOLON, "Semicolon");
    map.insert(KEY_APOSTROPHE, "Apostrophe");
    map.insert(KEY_GRAVE, "Grave");
    map.insert(KEY_LEFTSHIFT, "LeftShift");
    map.insert(KEY_BACKSLASH, "Backslash");
    map.insert(KEY_Z, "Z");
    map.insert(KEY_X, "X");
    map.insert(KEY_C, "C");
    map.insert(KEY_V, "V");
    map.insert(KEY_B, "B");
    map.insert(KEY_N, "N");
    map.insert(KEY_M, "M");
    map.insert(KEY_COMMA, "Comma");
    map.insert(KEY_DOT, "Period");
    map.insert(KEY_SLASH, "Slash");
    map.insert(KEY_LEFTALT, "LeftAlt");
    map.insert(KEY_SPACE, "Space");
    map.insert(KEY_CAPSLOCK, "CapsLock");
    map.insert(KEY_F1, "F1");
    map.insert(KEY_F2, "F2");
    map.insert(KEY_F3, "F3");
    map.insert(KEY_F4, "F4");
    map.insert(KEY_F5, "F5");
    map.insert(KEY_F6, "F6");
    map.insert(KEY_F7, "F7");
    map.insert(KEY_F8, "F8");
    map.insert(KEY_F9, "F9");
    map.insert(KEY_F10, "F10");
    map.insert(KEY_NUMLOCK, "NumLock");
    map.insert(KEY_F11, "F11");
    map.insert(KEY_F12, "F12");
    map.insert(KEY_UP, "Up");
    map.insert(KEY_LEFT, "Left");
    map.insert(KEY_RIGHT, "Right");
    map.insert(KEY_DOWN, "Down");
    map.insert(KEY_DELETE, "Delete");
    map.insert(KEY_PAUSE, "Pause");
    map.insert(KEY_COPY, "Copy");
    map.insert(KEY_CLEAR, "Clear");
    map.insert(KEY_FN, "Code");

    map
});

/// Get a key's display name, returns "Unknown" if not in the name table
pub fn key_name(code: KeyCode) -> &'static str {
    KEY_NAMES.get(&code).copied().unwrap_or("Unknown")
}

/// Number of row lines in the switch matrix
pub const MATRIX_ROWS: usize = 8;
/// Number of column lines in the switch matrix
pub const MATRIX_COLS: usize = 9;
/// Total switches in the matrix
pub const MATRIX_KEYS: usize = MATRIX_ROWS * MATRIX_COLS;

/// Identifies one physical switch by its dense row-major index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatrixPosition(pub u16);

impl MatrixPosition {
    pub const fn from_row_col(row: usize, col: usize) -> Self {
        Self((row * MATRIX_COLS + col) as u16)
    }

    pub fn row(&self) -> usize {
        self.0 as usize / MATRIX_COLS
    }

    pub fn col(&self) -> usize {
        self.0 as usize % MATRIX_COLS
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MatrixPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Switch positions with special handling. CODE sits on the switch the base
// table maps to KEY_FN; the others are named after their base-table legend.
pub const SHIFT_POSITION: MatrixPosition = MatrixPosition(8);
pub const BACKSPACE_POSITION: MatrixPosition = MatrixPosition(15);
pub const LEFTBRACKET_POSITION: MatrixPosition = MatrixPosition(21);
pub const ONE_POSITION: MatrixPosition = MatrixPosition(4);
pub const NINE_POSITION: MatrixPosition = MatrixPosition(5);
pub const ZERO_POSITION: MatrixPosition = MatrixPosition(14);
pub const CODE_POSITION: MatrixPosition = MatrixPosition(35);
pub const NUMLOCK_POSITION: MatrixPosition = MatrixPosition(44);
pub const SLASH_POSITION: MatrixPosition = MatrixPosition(66);

/// One full position-to-key lookup table, indexed by `MatrixPosition`
pub type KeyTable = [KeyCode; MATRIX_KEYS];

/// Direct mapping of every switch to its keycap legend, row-major
pub static BASE_TABLE: KeyTable = [
    KEY_Z, KEY_A, KEY_Q, KEY_O, KEY_1, KEY_9, KEY_SPACE, KEY_F1, KEY_LEFTSHIFT,
    KEY_X, KEY_S, KEY_W, KEY_P, KEY_2, KEY_0, KEY_BACKSPACE, KEY_F2, KEY_LEFTCTRL,
    KEY_C, KEY_D, KEY_E, KEY_LEFTBRACE, KEY_3, KEY_MINUS, KEY_TAB, KEY_F3, KEY_LEFTALT,
    KEY_V, KEY_F, KEY_R, KEY_SEMICOLON, KEY_4, KEY_EQUAL, KEY_ESC, KEY_F4, KEY_FN,
    KEY_B, KEY_G, KEY_T, KEY_APOSTROPHE, KEY_5, KEY_LEFT, KEY_GRAVE, KEY_F5, KEY_NUMLOCK,
    KEY_N, KEY_H, KEY_Y, KEY_COMMA, KEY_6, KEY_RIGHT, KEY_COPY, KEY_F6, KEY_CAPSLOCK,
    KEY_M, KEY_J, KEY_U, KEY_DOT, KEY_7, KEY_UP, KEY_CLEAR, KEY_F7, KEY_RESERVED,
    KEY_L, KEY_K, KEY_I, KEY_SLASH, KEY_8, KEY_DOWN, KEY_ENTER, KEY_F8, KEY_PAUSE,
];

/// Base table with the embedded numeric pad active (M J K L U I O become
/// 0 1 2 3 4 5 6)
pub static NUMLOCK_TABLE: KeyTable = [
    KEY_Z, KEY_A, KEY_Q, KEY_6, KEY_1, KEY_9, KEY_SPACE, KEY_F1, KEY_LEFTSHIFT,
    KEY_X, KEY_S, KEY_W, KEY_P, KEY_2, KEY_0, KEY_BACKSPACE, KEY_F2, KEY_LEFTCTRL,
    KEY_C, KEY_D, KEY_E, KEY_LEFTBRACE, KEY_3, KEY_MINUS, KEY_TAB, KEY_F3, KEY_LEFTALT,
    KEY_V, KEY_F, KEY_R, KEY_SEMICOLON, KEY_4, KEY_EQUAL, KEY_ESC, KEY_F4, KEY_FN,
    KEY_B, KEY_G, KEY_T, KEY_APOSTROPHE, KEY_5, KEY_LEFT, KEY_GRAVE, KEY_F5, KEY_NUMLOCK,
    KEY_N, KEY_H, KEY_Y, KEY_COMMA, KEY_6, KEY_RIGHT, KEY_COPY, KEY_F6, KEY_CAPSLOCK,
    KEY_0, KEY_1, KEY_4, KEY_DOT, KEY_7, KEY_UP, KEY_CLEAR, KEY_F7, KEY_RESERVED,
    KEY_3, KEY_2, KEY_5, KEY_SLASH, KEY_8, KEY_DOWN, KEY_ENTER, KEY_F8, KEY_PAUSE,
];

/// Base table with the CODE layer active (F5-F8 become F9-F12, slash
/// becomes backslash)
pub static CODE_TABLE: KeyTable = [
    KEY_Z, KEY_A, KEY_Q, KEY_O, KEY_1, KEY_9, KEY_SPACE, KEY_F1, KEY_LEFTSHIFT,
    KEY_X, KEY_S, KEY_W, KEY_P, KEY_2, KEY_0, KEY_BACKSPACE, KEY_F2, KEY_LEFTCTRL,
    KEY_C, KEY_D, KEY_E, KEY_LEFTBRACE, KEY_3, KEY_MINUS, KEY_TAB, KEY_F3, KEY_LEFTALT,
    KEY_V, KEY_F, KEY_R, KEY_SEMICOLON, KEY_4, KEY_EQUAL, KEY_ESC, KEY_F4, KEY_FN,
    KEY_B, KEY_G, KEY_T, KEY_APOSTROPHE, KEY_5, KEY_LEFT, KEY_GRAVE, KEY_F9, KEY_NUMLOCK,
    KEY_N, KEY_H, KEY_Y, KEY_COMMA, KEY_6, KEY_RIGHT, KEY_COPY, KEY_F10, KEY_CAPSLOCK,
    KEY_M, KEY_J, KEY_U, KEY_DOT, KEY_7, KEY_UP, KEY_CLEAR, KEY_F11, KEY_RESERVED,
    KEY_L, KEY_K, KEY_I, KEY_BACKSLASH, KEY_8, KEY_DOWN, KEY_ENTER, KEY_F12, KEY_PAUSE,
];

/// Which physical keyboard build the driver is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyboardModel {
    /// Unmodified Tandy 102, direct legend mapping only
    Tandy102,
    /// TRS-80 Model 100, legend mapping plus the CODE bracket combos
    Model100,
    /// Tandy 102 with the momentary NUMLOCK switch mod, all three layers
    #[default]
    Tandy102NumLock,
}

impl KeyboardModel {
    /// Key tables this variant carries
    pub fn layout(self) -> Layout {
        match self {
            KeyboardModel::Tandy102 | KeyboardModel::Model100 => Layout {
                base: &BASE_TABLE,
                numlock: None,
                code: None,
            },
            KeyboardModel::Tandy102NumLock => Layout {
                base: &BASE_TABLE,
                numlock: Some(&NUMLOCK_TABLE),
                code: Some(&CODE_TABLE),
            },
        }
    }

    /// Name the virtual input device announces to the host
    pub fn device_name(self) -> &'static str {
        match self {
            KeyboardModel::Tandy102 | KeyboardModel::Tandy102NumLock => "Tandy 102 Keyboard",
            KeyboardModel::Model100 => "TRS-80 Model 100 Keyboard",
        }
    }
}

/// The lookup tables available to the resolver for one hardware variant
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub base: &'static KeyTable,
    pub numlock: Option<&'static KeyTable>,
    pub code: Option<&'static KeyTable>,
}

impl Layout {
    /// Every key code this variant's tables can produce, minus the
    /// unpopulated Reserved slot
    pub fn emitted_keys(&self) -> BTreeSet<KeyCode> {
        let mut keys = BTreeSet::new();
        for table in [Some(self.base), self.numlock, self.code].into_iter().flatten() {
            keys.extend(table.iter().copied().filter(|&key| key != KEY_RESERVED));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_cover_every_switch() {
        assert_eq!(BASE_TABLE.len(), MATRIX_KEYS);
        assert_eq!(NUMLOCK_TABLE.len(), MATRIX_KEYS);
        assert_eq!(CODE_TABLE.len(), MATRIX_KEYS);
    }

    #[test]
    fn named_positions_match_base_legends() {
        assert_eq!(BASE_TABLE[SHIFT_POSITION.index()], KEY_LEFTSHIFT);
        assert_eq!(BASE_TABLE[BACKSPACE_POSITION.index()], KEY_BACKSPACE);
        assert_eq!(BASE_TABLE[LEFTBRACKET_POSITION.index()], KEY_LEFTBRACE);
        assert_eq!(BASE_TABLE[ONE_POSITION.index()], KEY_1);
        assert_eq!(BASE_TABLE[NINE_POSITION.index()], KEY_9);
        assert_eq!(BASE_TABLE[ZERO_POSITION.index()], KEY_0);
        assert_eq!(BASE_TABLE[CODE_POSITION.index()], KEY_FN);
        assert_eq!(BASE_TABLE[NUMLOCK_POSITION.index()], KEY_NUMLOCK);
        assert_eq!(BASE_TABLE[SLASH_POSITION.index()], KEY_SLASH);
    }

    #[test]
    fn numlock_table_only_changes_the_embedded_pad() {
        let expected: Vec<(usize, KeyCode, KeyCode)> = vec![
            (3, KEY_O, KEY_6),
            (54, KEY_M, KEY_0),
            (55, KEY_J, KEY_1),
            (56, KEY_U, KEY_4),
            (63, KEY_L, KEY_3),
            (64, KEY_K, KEY_2),
            (65, KEY_I, KEY_5),
        ];
        for position in 0..MATRIX_KEYS {
            match expected.iter().find(|(p, _, _)| *p == position) {
                Some((_, base, pad)) => {
                    assert_eq!(BASE_TABLE[position], *base);
                    assert_eq!(NUMLOCK_TABLE[position], *pad);
                }
                None => assert_eq!(BASE_TABLE[position], NUMLOCK_TABLE[position]),
            }
        }
    }

    #[test]
    fn code_table_only_changes_fkeys_and_slash() {
        let expected: Vec<(usize, KeyCode, KeyCode)> = vec![
            (43, KEY_F5, KEY_F9),
            (52, KEY_F6, KEY_F10),
            (61, KEY_F7, KEY_F11),
            (70, KEY_F8, KEY_F12),
            (66, KEY_SLASH, KEY_BACKSLASH),
        ];
        for position in 0..MATRIX_KEYS {
            match expected.iter().find(|(p, _, _)| *p == position) {
                Some((_, base, code)) => {
                    assert_eq!(BASE_TABLE[position], *base);
                    assert_eq!(CODE_TABLE[position], *code);
                }
                None => assert_eq!(BASE_TABLE[position], CODE_TABLE[position]),
            }
        }
    }

    #[test]
    fn position_row_col_roundtrip() {
        for row in 0..MATRIX_ROWS {
            for col in 0..MATRIX_COLS {
                let position = MatrixPosition::from_row_col(row, col);
                assert_eq!(position.row(), row);
                assert_eq!(position.col(), col);
                assert_eq!(position.index(), row * MATRIX_COLS + col);
            }
        }
    }

    #[test]
    fn model_names_parse_from_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            model: KeyboardModel,
        }

        let parsed: Wrapper = toml::from_str(r#"model = "tandy102-num-lock""#).unwrap();
        assert_eq!(parsed.model, KeyboardModel::Tandy102NumLock);
        let parsed: Wrapper = toml::from_str(r#"model = "model100""#).unwrap();
        assert_eq!(parsed.model, KeyboardModel::Model100);
        let parsed: Wrapper = toml::from_str(r#"model = "tandy102""#).unwrap();
        assert_eq!(parsed.model, KeyboardModel::Tandy102);
    }

    #[test]
    fn full_layout_emits_substitution_outputs() {
        let keys = KeyboardModel::Tandy102NumLock.layout().emitted_keys();
        assert!(keys.contains(&KEY_F12));
        assert!(keys.contains(&KEY_BACKSLASH));
        assert!(!keys.contains(&KEY_RESERVED));

        let plain = KeyboardModel::Tandy102.layout().emitted_keys();
        assert!(!plain.contains(&KEY_F12));
    }
}
