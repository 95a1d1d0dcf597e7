// SPDX-License-Identifier: MIT
//
// Mode-switch escape sequences used by the adapter itself.
//
// The benchmark frames are encoded by the core's fixed-capacity encoder.
// This module only covers what the adapter emits around a run: hiding the
// cursor on entry, and putting the screen back into a sane state on exit.
// Functions write to any `impl Write`, so tests can capture into a Vec.
use std::io::{self, Write};

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to the top-left cell (CUP with no parameters).
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[H")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
///
/// A run leaves the last frame's truecolor state behind; this drops it.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Everything [`leave`] emits, as one constant for the panic path.
///
/// Reset SGR, clear, home, show cursor. Written with a single raw `write`
/// when the process panics in raw mode.
pub const EMERGENCY_RESTORE: &[u8] = b"\x1b[0m\x1b[2J\x1b[H\x1b[?25h";

/// Emit the sequence that hands the screen back to the shell.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn leave(w: &mut impl Write) -> io::Result<()> {
    reset(w)?;
    clear_screen(w)?;
    cursor_home(w)?;
    cursor_show(w)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn emit(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn cursor_sequences() {
        assert_eq!(emit(|w| cursor_home(w)), "\x1b[H");
        assert_eq!(emit(|w| cursor_hide(w)), "\x1b[?25l");
        assert_eq!(emit(|w| cursor_show(w)), "\x1b[?25h");
    }

    #[test]
    fn clear_screen_sequence() {
        assert_eq!(emit(|w| clear_screen(w)), "\x1b[2J");
    }

    #[test]
    fn reset_sequence() {
        assert_eq!(emit(|w| reset(w)), "\x1b[0m");
    }

    #[test]
    fn leave_matches_emergency_restore() {
        assert_eq!(
            emit(|w| leave(w)).as_bytes(),
            EMERGENCY_RESTORE,
            "panic path and normal path must restore the same way"
        );
    }

    #[test]
    fn emergency_restore_shows_cursor_last() {
        let s = std::str::from_utf8(EMERGENCY_RESTORE).unwrap();
        assert!(s.ends_with("\x1b[?25h"));
    }
}
