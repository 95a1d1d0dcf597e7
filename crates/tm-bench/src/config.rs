// SPDX-License-Identifier: MIT
//
// Run configuration.
//
// There is no config file and there are no flags: a benchmark is only
// comparable if every run uses the same settings. `BenchConfig` exists so
// the loop's constants live in one place and tests can shrink them.

use std::time::Duration;

use tm_term::input::{KeyCode, KeyEvent};

use crate::buffer::{MAX_TERM_HEIGHT, MAX_TERM_WIDTH};
use crate::timing::DEFAULT_STAT_WINDOW;

// ─── Commands ────────────────────────────────────────────────────────────────

/// The only actions input can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Stop the run.
    Quit,
    /// Switch between one write per frame and one write per row.
    ToggleWriteMode,
    /// Switch between a color change per cell and no per-cell color.
    ToggleColorMode,
}

/// Keys bound to one command, plus the label shown in the hint line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub label: &'static str,
    pub keys: &'static [KeyEvent],
}

impl Binding {
    #[must_use]
    pub fn matches(&self, key: &KeyEvent) -> bool {
        self.keys.contains(key)
    }
}

const QUIT_KEYS: &[KeyEvent] = &[
    KeyEvent::plain(KeyCode::Char('q')),
    KeyEvent::plain(KeyCode::Escape),
    KeyEvent::ctrl(KeyCode::Char('c')),
];

const WRITE_MODE_KEYS: &[KeyEvent] = &[
    KeyEvent::plain(KeyCode::Char('L')),
    KeyEvent::plain(KeyCode::F(1)),
];

const COLOR_MODE_KEYS: &[KeyEvent] = &[
    KeyEvent::plain(KeyCode::Char('C')),
    KeyEvent::plain(KeyCode::F(2)),
];

/// Key-to-command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub quit: Binding,
    pub toggle_write: Binding,
    pub toggle_color: Binding,
}

impl KeyBindings {
    /// The command bound to `key`, if any. Unbound keys are ignored.
    #[must_use]
    pub fn resolve(&self, key: &KeyEvent) -> Option<Command> {
        if self.quit.matches(key) {
            Some(Command::Quit)
        } else if self.toggle_write.matches(key) {
            Some(Command::ToggleWriteMode)
        } else if self.toggle_color.matches(key) {
            Some(Command::ToggleColorMode)
        } else {
            None
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: Binding {
                label: "q",
                keys: QUIT_KEYS,
            },
            toggle_write: Binding {
                label: "L",
                keys: WRITE_MODE_KEYS,
            },
            toggle_color: Binding {
                label: "C",
                keys: COLOR_MODE_KEYS,
            },
        }
    }
}

// ─── BenchConfig ─────────────────────────────────────────────────────────────

/// Fixed parameters of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchConfig {
    /// Length of one throughput window.
    pub stat_window: Duration,
    /// Reported widths above this are clamped. Also sizes the arena.
    pub max_width: u16,
    /// Reported heights above this are clamped. Also sizes the arena.
    pub max_height: u16,
    pub bindings: KeyBindings,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            stat_window: DEFAULT_STAT_WINDOW,
            max_width: MAX_TERM_WIDTH,
            max_height: MAX_TERM_HEIGHT,
            bindings: KeyBindings::default(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
