//! Modifier-aware resolution of switch transitions into key events

use super::keymap::{
    KeyCode, KeyTable, KeyboardModel, Layout, MatrixPosition, BACKSPACE_POSITION, CODE_POSITION,
    KEY_BACKSLASH, KEY_DELETE, KEY_LEFTBRACE, KEY_LEFTSHIFT, KEY_RIGHTBRACE, LEFTBRACKET_POSITION,
    NINE_POSITION, NUMLOCK_POSITION, ONE_POSITION, SHIFT_POSITION, SLASH_POSITION, ZERO_POSITION,
};
use super::state::EngineState;
use crate::sink::{OutputSink, SinkError};
use log::{debug, info};
use std::collections::BTreeSet;

/// How one special-cased switch expands into logical key events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstitutionRule {
    /// Emit a different key than the table mapping
    SimpleRemap(KeyCode),
    /// Release one key and press another in its place
    ModifierSwap { release: KeyCode, press: KeyCode },
    /// Press two keys for one switch, released in reverse order
    TwoKeyCombo(KeyCode, KeyCode),
}

impl SubstitutionRule {
    /// The key a modifier release must force-release if it lifts while the
    /// triggering switch is still held
    fn substitute(self) -> KeyCode {
        match self {
            SubstitutionRule::SimpleRemap(key) => key,
            SubstitutionRule::ModifierSwap { press, .. } => press,
            SubstitutionRule::TwoKeyCombo(_, second) => second,
        }
    }
}

/// A substitution rule plus the physical condition that triggers it
#[derive(Debug, Clone, Copy)]
pub struct SpecialCase {
    pub trigger: MatrixPosition,
    pub modifier: MatrixPosition,
    pub rule: SubstitutionRule,
}

/// The ordered special-case rules for one hardware variant
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    cases: Vec<SpecialCase>,
}

impl RuleSet {
    pub fn from_cases(cases: Vec<SpecialCase>) -> Self {
        Self { cases }
    }

    pub fn for_model(model: KeyboardModel) -> Self {
        let mut cases = match model {
            KeyboardModel::Tandy102 => Vec::new(),
            KeyboardModel::Model100 | KeyboardModel::Tandy102NumLock => vec![
                // SHIFT+Backspace -> Delete
                SpecialCase {
                    trigger: BACKSPACE_POSITION,
                    modifier: SHIFT_POSITION,
                    rule: SubstitutionRule::ModifierSwap {
                        release: KEY_LEFTSHIFT,
                        press: KEY_DELETE,
                    },
                },
                // SHIFT+[ -> ]
                SpecialCase {
                    trigger: LEFTBRACKET_POSITION,
                    modifier: SHIFT_POSITION,
                    rule: SubstitutionRule::ModifierSwap {
                        release: KEY_LEFTSHIFT,
                        press: KEY_RIGHTBRACE,
                    },
                },
                // CODE+1 -> |
                SpecialCase {
                    trigger: ONE_POSITION,
                    modifier: CODE_POSITION,
                    rule: SubstitutionRule::TwoKeyCombo(KEY_LEFTSHIFT, KEY_BACKSLASH),
                },
                // CODE+9 -> {
                SpecialCase {
                    trigger: NINE_POSITION,
                    modifier: CODE_POSITION,
                    rule: SubstitutionRule::TwoKeyCombo(KEY_LEFTSHIFT, KEY_LEFTBRACE),
                },
                // CODE+0 -> }
                SpecialCase {
                    trigger: ZERO_POSITION,
                    modifier: CODE_POSITION,
                    rule: SubstitutionRule::TwoKeyCombo(KEY_LEFTSHIFT, KEY_RIGHTBRACE),
                },
            ],
        };
        // CODE+/ -> backslash; the full variant covers this through its
        // code table instead
        if model == KeyboardModel::Model100 {
            cases.push(SpecialCase {
                trigger: SLASH_POSITION,
                modifier: CODE_POSITION,
                rule: SubstitutionRule::SimpleRemap(KEY_BACKSLASH),
            });
        }
        Self { cases }
    }

    pub fn cases(&self) -> &[SpecialCase] {
        &self.cases
    }

    /// First rule whose trigger matches this position with its modifier
    /// currently held
    pub fn matching(&self, trigger: MatrixPosition, state: &EngineState) -> Option<&SpecialCase> {
        self.cases
            .iter()
            .find(|case| case.trigger == trigger && state.is_pressed(case.modifier))
    }

    /// Every key code rule expansion can emit
    pub fn emitted_keys(&self) -> BTreeSet<KeyCode> {
        let mut keys = BTreeSet::new();
        for case in &self.cases {
            match case.rule {
                SubstitutionRule::SimpleRemap(key) => {
                    keys.insert(key);
                }
                SubstitutionRule::ModifierSwap { release, press } => {
                    keys.insert(release);
                    keys.insert(press);
                }
                SubstitutionRule::TwoKeyCombo(first, second) => {
                    keys.insert(first);
                    keys.insert(second);
                }
            }
        }
        keys
    }
}

fn emit_logged<S: OutputSink>(sink: &mut S, key: KeyCode, down: bool) -> Result<(), SinkError> {
    info!("{} {}", key, if down { "pressed" } else { "released" });
    sink.emit(key, down)
}

/// Turns one switch transition into the logical key events it stands for.
///
/// Table priority on the generic path: CODE held selects the code table,
/// otherwise an active num lock selects the numlock table, otherwise the
/// base table. Special-case rules run before the generic path and record
/// their substitute key so an early modifier release can clean up after
/// them.
pub struct Resolver {
    layout: Layout,
    rules: RuleSet,
    shift_cleanup: bool,
    code_cleanup: bool,
}

impl Resolver {
    pub fn new(layout: Layout, rules: RuleSet) -> Self {
        // Variants without CODE or SHIFT semantics must not clean up after
        // them, or a bare modifier release would emit spurious key-ups.
        let shift_cleanup = rules
            .cases()
            .iter()
            .any(|case| case.modifier == SHIFT_POSITION);
        let code_cleanup = layout.code.is_some()
            || rules
                .cases()
                .iter()
                .any(|case| case.modifier == CODE_POSITION);
        Self {
            layout,
            rules,
            shift_cleanup,
            code_cleanup,
        }
    }

    fn active_table(&self, state: &EngineState) -> &'static KeyTable {
        if state.is_pressed(CODE_POSITION) {
            if let Some(table) = self.layout.code {
                return table;
            }
        }
        if state.num_lock() {
            if let Some(table) = self.layout.numlock {
                return table;
            }
        }
        self.layout.base
    }

    fn record_substitute(&self, state: &mut EngineState, case: &SpecialCase) {
        let substitute = case.rule.substitute();
        if case.modifier == SHIFT_POSITION {
            state.set_shift_owned(substitute);
        } else if case.modifier == CODE_POSITION {
            state.set_code_owned(substitute);
        }
    }

    /// Resolve a newly closed switch. The position joins the pressed set
    /// before rules run, so it is visible as a modifier to later
    /// transitions in the same cycle.
    pub fn on_press<S: OutputSink>(
        &self,
        state: &mut EngineState,
        position: MatrixPosition,
        sink: &mut S,
    ) -> Result<(), SinkError> {
        state.press(position);

        if position == NUMLOCK_POSITION && self.layout.numlock.is_some() {
            let on = state.toggle_num_lock();
            info!("num lock {}", if on { "on" } else { "off" });
            return Ok(());
        }

        if let Some(case) = self.rules.matching(position, state) {
            match case.rule {
                SubstitutionRule::SimpleRemap(key) => {
                    emit_logged(sink, key, true)?;
                }
                SubstitutionRule::ModifierSwap { release, press } => {
                    emit_logged(sink, release, false)?;
                    emit_logged(sink, press, true)?;
                }
                SubstitutionRule::TwoKeyCombo(first, second) => {
                    emit_logged(sink, first, true)?;
                    emit_logged(sink, second, true)?;
                }
            }
            self.record_substitute(state, case);
            return Ok(());
        }

        let table = self.active_table(state);
        let key = table[position.index()];
        emit_logged(sink, key, true)?;
        if self.layout.code.is_some() && state.is_pressed(CODE_POSITION) {
            state.set_code_owned(key);
        }
        Ok(())
    }

    /// Resolve a newly opened switch. Rule matching still sees the switch
    /// as pressed (it leaves the pressed set last), mirroring whatever the
    /// press emitted, then orphaned substitutes are force-released.
    pub fn on_release<S: OutputSink>(
        &self,
        state: &mut EngineState,
        position: MatrixPosition,
        sink: &mut S,
    ) -> Result<(), SinkError> {
        if let Some(case) = self.rules.matching(position, state) {
            match case.rule {
                SubstitutionRule::SimpleRemap(key) => {
                    emit_logged(sink, key, false)?;
                }
                SubstitutionRule::ModifierSwap { press, .. } => {
                    emit_logged(sink, press, false)?;
                }
                SubstitutionRule::TwoKeyCombo(first, second) => {
                    emit_logged(sink, second, false)?;
                    emit_logged(sink, first, false)?;
                }
            }
        } else if !(position == NUMLOCK_POSITION && self.layout.numlock.is_some()) {
            let key = self.active_table(state)[position.index()];
            emit_logged(sink, key, false)?;
        }

        if self.code_cleanup && position == CODE_POSITION && state.pressed_count() > 1 {
            debug!(
                "CODE released with {} switches still held",
                state.pressed_count() - 1
            );
            if let Some(owned) = state.take_code_owned() {
                emit_logged(sink, owned, false)?;
            }
            emit_logged(sink, KEY_LEFTSHIFT, false)?;
        }
        if self.shift_cleanup && position == SHIFT_POSITION && state.pressed_count() > 1 {
            if let Some(owned) = state.take_shift_owned() {
                emit_logged(sink, owned, false)?;
            }
        }

        state.release(position);
        Ok(())
    }
}
