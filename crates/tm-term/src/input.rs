// SPDX-License-Identifier: MIT
//
// Terminal input decoding.
//
// Turns raw stdin bytes into key events. The benchmark reacts to only a
// handful of keys, but the decoder still has to consume whole escape
// sequences: a function key arrives as several bytes, and misreading
// `ESC O P` as Escape + `O` + `P` would quit the run on an F1 press.
//
// Covered encodings:
//
// - ASCII printable and control bytes (Ctrl+letter in raw mode, since
//   ISIG is off and Ctrl+C arrives as 0x03)
// - CSI sequences: arrows, editing keys, F1–F20 (`ESC [ 1 1 ~` family and
//   the `ESC [ P..S` xterm form), with xterm modifier parameters
// - SS3 sequences (`ESC O P..S` for F1–F4, application-mode arrows)
// - Linux console F1–F5 (`ESC [ [ A..E`)
// - Alt+key (ESC followed by a printable byte)
// - UTF-8 multi-byte characters
//
// The parser keeps a small byte buffer because a sequence can be split
// across reads. Feed bytes with [`Parser::advance`]; once the input is
// drained twice in a row, [`Parser::expire`] resolves whatever is still
// pending (a lone ESC becomes the Escape key).

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// One discrete input event delivered by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A decoded key press.
    Key(KeyEvent),
    /// The terminal grid size changed; cached geometry is stale.
    Resize,
    /// Stdin reached end of file. The run cannot receive input anymore.
    EndOfInput,
}

/// A key press with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key pressed without modifiers.
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// A key pressed with Ctrl held.
    #[must_use]
    pub const fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::CTRL,
        }
    }

    /// A key pressed with the given modifiers.
    #[must_use]
    pub const fn with(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A Unicode character (printable).
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F20.
    F(u8),
}

bitflags! {
    /// Keyboard modifier flags (xterm encoding: `param = 1 + bitmask`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
        const SUPER = 0b0000_1000;
    }
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Incremental key decoder.
///
/// Events are pushed into a caller-owned `Vec` so a polling loop can reuse
/// one allocation for the whole run.
pub struct Parser {
    /// Bytes of a sequence that has not completed yet.
    buf: Vec<u8>,
    /// The pending bytes already survived one [`expire`](Self::expire).
    held: bool,
}

impl Parser {
    /// Create a parser with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
            held: false,
        }
    }

    /// Feed raw bytes and push every event that can be decoded.
    ///
    /// An incomplete trailing sequence stays buffered and is combined with
    /// the next call.
    pub fn advance(&mut self, data: &[u8], events: &mut Vec<Event>) {
        if !data.is_empty() {
            self.held = false;
        }
        self.buf.extend_from_slice(data);
        let mut pos = 0;

        while pos < self.buf.len() {
            match try_parse(&self.buf[pos..]) {
                Parsed::Key(key, consumed) => {
                    events.push(Event::Key(key));
                    pos += consumed;
                }
                Parsed::Incomplete => break,
                Parsed::Skip(n) => pos += n,
            }
        }

        if pos > 0 {
            self.buf.drain(..pos);
        }
    }

    /// Are there buffered bytes waiting for the rest of a sequence?
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Resolve pending bytes as literal keys.
    ///
    /// Called when no more input is available: a lone ESC is the Escape
    /// key, and any other leftover byte is taken at face value.
    pub fn flush(&mut self, events: &mut Vec<Event>) {
        for &byte in &self.buf {
            let key = match byte {
                0x1B => KeyEvent::plain(KeyCode::Escape),
                0x7F => KeyEvent::plain(KeyCode::Backspace),
                b @ 0x01..=0x1A => KeyEvent::ctrl(KeyCode::Char(char::from(b + b'a' - 1))),
                b @ 0x20..=0x7E => KeyEvent::plain(KeyCode::Char(char::from(b))),
                _ => continue,
            };
            events.push(Event::Key(key));
        }
        self.buf.clear();
        self.held = false;
    }

    /// End of one drain of the input source.
    ///
    /// Pending bytes get one more drain to complete: a function key split
    /// across reads (`ESC` now, `O P` a frame later) must not be taken for
    /// Escape. Bytes still pending at the next idle drain are flushed.
    pub fn expire(&mut self, events: &mut Vec<Event>) {
        if !self.has_pending() {
            self.held = false;
        } else if self.held {
            self.flush(events);
        } else {
            self.held = true;
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Stateless Parsing Functions ────────────────────────────────────────────

/// Result of trying to decode one key from the front of a buffer.
enum Parsed {
    /// Decoded a key, consuming `usize` bytes.
    Key(KeyEvent, usize),
    /// Sequence is incomplete; need more bytes.
    Incomplete,
    /// Unrecognized byte(s), skip `usize` bytes.
    Skip(usize),
}

fn try_parse(buf: &[u8]) -> Parsed {
    let Some(&lead) = buf.first() else {
        return Parsed::Incomplete;
    };

    match lead {
        0x1B => parse_escape(buf),
        0x00 => Parsed::Key(KeyEvent::ctrl(KeyCode::Char('@')), 1),
        0x08 | 0x7F => Parsed::Key(KeyEvent::plain(KeyCode::Backspace), 1),
        0x09 => Parsed::Key(KeyEvent::plain(KeyCode::Tab), 1),
        0x0A | 0x0D => Parsed::Key(KeyEvent::plain(KeyCode::Enter), 1),
        b @ 0x01..=0x1A => {
            Parsed::Key(KeyEvent::ctrl(KeyCode::Char(char::from(b + b'a' - 1))), 1)
        }
        b @ 0x20..=0x7E => Parsed::Key(KeyEvent::plain(KeyCode::Char(char::from(b))), 1),
        0xC0..=0xFF => parse_utf8(buf),
        // 0x1C..=0x1F and bare continuation bytes.
        _ => Parsed::Skip(1),
    }
}

// ── Escape sequences ────────────────────────────────────────────────────────

fn parse_escape(buf: &[u8]) -> Parsed {
    debug_assert_eq!(buf[0], 0x1B);

    if buf.len() < 2 {
        return Parsed::Incomplete;
    }

    match buf[1] {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        0x1B => Parsed::Key(KeyEvent::with(KeyCode::Escape, Modifiers::ALT), 2),
        b @ 0x20..=0x7E => Parsed::Key(
            KeyEvent::with(KeyCode::Char(char::from(b)), Modifiers::ALT),
            2,
        ),
        _ => Parsed::Key(KeyEvent::plain(KeyCode::Escape), 1),
    }
}

// ── CSI (Control Sequence Introducer) ───────────────────────────────────────

fn parse_csi(buf: &[u8]) -> Parsed {
    debug_assert!(buf.len() >= 2 && buf[1] == b'[');

    if buf.len() < 3 {
        return Parsed::Incomplete;
    }

    // Linux console function keys: ESC [ [ A..E.
    if buf[2] == b'[' {
        return match buf.get(3) {
            None => Parsed::Incomplete,
            Some(&b @ b'A'..=b'E') => Parsed::Key(KeyEvent::plain(KeyCode::F(b - b'A' + 1)), 4),
            Some(_) => Parsed::Skip(4),
        };
    }

    // Parameter bytes are 0x30..=0x3F, intermediates 0x20..=0x2F, final 0x40..=0x7E.
    let mut end = 2;
    while end < buf.len() {
        let b = buf[end];
        if (0x40..=0x7E).contains(&b) {
            break;
        }
        if !(0x20..=0x3F).contains(&b) {
            return Parsed::Skip(end + 1);
        }
        end += 1;
    }

    if end >= buf.len() {
        return Parsed::Incomplete;
    }

    let final_byte = buf[end];
    let (first, rest) = parse_u16_from(&buf[2..end]);
    let modifiers = if rest.first() == Some(&b';') {
        decode_modifiers(parse_u16_from(&rest[1..]).0)
    } else {
        Modifiers::empty()
    };
    let consumed = end + 1;

    if final_byte == b'~' {
        let code = match first {
            1 | 7 => KeyCode::Home,
            2 => KeyCode::Insert,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            11 => KeyCode::F(1),
            12 => KeyCode::F(2),
            13 => KeyCode::F(3),
            14 => KeyCode::F(4),
            15 => KeyCode::F(5),
            17 => KeyCode::F(6),
            18 => KeyCode::F(7),
            19 => KeyCode::F(8),
            20 => KeyCode::F(9),
            21 => KeyCode::F(10),
            23 => KeyCode::F(11),
            24 => KeyCode::F(12),
            25 => KeyCode::F(13),
            26 => KeyCode::F(14),
            28 => KeyCode::F(15),
            29 => KeyCode::F(16),
            31 => KeyCode::F(17),
            32 => KeyCode::F(18),
            33 => KeyCode::F(19),
            34 => KeyCode::F(20),
            _ => return Parsed::Skip(consumed),
        };
        return Parsed::Key(KeyEvent::with(code, modifiers), consumed);
    }

    let code = match final_byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        b'Z' => return Parsed::Key(KeyEvent::with(KeyCode::Tab, Modifiers::SHIFT), consumed),
        _ => return Parsed::Skip(consumed),
    };

    Parsed::Key(KeyEvent::with(code, modifiers), consumed)
}

// ── SS3 (Single Shift 3) ───────────────────────────────────────────────────

fn parse_ss3(buf: &[u8]) -> Parsed {
    debug_assert!(buf.len() >= 2 && buf[1] == b'O');

    if buf.len() < 3 {
        return Parsed::Incomplete;
    }

    let code = match buf[2] {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        _ => return Parsed::Skip(3),
    };

    Parsed::Key(KeyEvent::plain(code), 3)
}

// ── UTF-8 ───────────────────────────────────────────────────────────────────

fn parse_utf8(buf: &[u8]) -> Parsed {
    let len = utf8_char_len(buf[0]);
    if len == 0 {
        return Parsed::Skip(1);
    }
    if buf.len() < len {
        return Parsed::Incomplete;
    }

    match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
        Some(ch) => Parsed::Key(KeyEvent::plain(KeyCode::Char(ch)), len),
        None => Parsed::Skip(len),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Parse a leading decimal number, returning it and the unparsed tail.
///
/// Saturates instead of overflowing on absurd parameters.
fn parse_u16_from(buf: &[u8]) -> (u16, &[u8]) {
    let digits = buf.iter().take_while(|b| b.is_ascii_digit()).count();
    let value = buf[..digits].iter().fold(0u16, |acc, &b| {
        acc.saturating_mul(10).saturating_add(u16::from(b - b'0'))
    });
    (value, &buf[digits..])
}

#[allow(clippy::cast_possible_truncation)] // Masked to the 4 defined bits.
const fn decode_modifiers(param: u16) -> Modifiers {
    Modifiers::from_bits_truncate((param.saturating_sub(1) & 0x0F) as u8)
}

const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
