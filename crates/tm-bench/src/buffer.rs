// SPDX-License-Identifier: MIT
//
// Fixed-capacity escape-sequence encoder.
//
// `ByteBuffer` is an append-only byte builder over storage allocated once.
// Every append is infallible: bytes that do not fit are dropped. Truncation
// is the contract, not an accident. It keeps the hot path free of
// allocation and error branches, so what the benchmark times is the
// terminal rather than the allocator.
//
// Coordinates follow the benchmark's own convention: `append_goto(x, y)`
// emits row `y + 1` and column `x` verbatim. Frame rows and header lines
// are addressed with that offset in mind.
//
// `Arena` bundles the frame buffer with the decimal digit table. Both are
// built once before the loop starts and handed to the frame generator by
// reference.

use crate::digits::DigitTable;

/// Widest grid the arena is sized for, in cells.
pub const MAX_TERM_WIDTH: u16 = 4096;

/// Tallest grid the arena is sized for, in cells.
pub const MAX_TERM_HEIGHT: u16 = 4096;

/// Which SGR truecolor slot a color applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Glyph color (`SGR 38;2`).
    Foreground,
    /// Cell color (`SGR 48;2`).
    Background,
}

impl Layer {
    const fn introducer(self) -> &'static [u8] {
        match self {
            Self::Foreground => b"\x1b[38;2;",
            Self::Background => b"\x1b[48;2;",
        }
    }
}

// ─── ByteBuffer ──────────────────────────────────────────────────────────────

/// Append-only byte buffer with a hard capacity.
///
/// The write cursor never exceeds the capacity. Appends past the end are
/// silently ignored, and appends that straddle the end keep their prefix.
pub struct ByteBuffer {
    data: Box<[u8]>,
    len: usize,
}

impl ByteBuffer {
    /// Allocate a buffer that will never hold more than `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Number of bytes written since the last [`clear`](Self::clear).
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Hard upper bound on [`len`](Self::len).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes that can still be appended before truncation starts.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.len
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    /// The encoded bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Rewind the cursor. Storage is kept.
    #[inline]
    pub const fn clear(&mut self) {
        self.len = 0;
    }

    // ── Raw bytes ───────────────────────────────────────────────────────

    /// Append one byte, or drop it if the buffer is full.
    #[inline]
    pub fn append_char(&mut self, byte: u8) {
        if self.len < self.data.len() {
            self.data[self.len] = byte;
            self.len += 1;
        }
    }

    /// Append as much of `bytes` as fits.
    #[inline]
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(self.remaining());
        self.data[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
    }

    #[inline]
    pub fn append_str(&mut self, s: &str) {
        self.append_bytes(s.as_bytes());
    }

    // ── Text ────────────────────────────────────────────────────────────

    /// Append `value` in base 10.
    ///
    /// Minimal digits, a leading `-` only for negatives, and always at
    /// least one digit. Covers the whole `i32` range, `i32::MIN` included.
    pub fn append_decimal(&mut self, value: i32) {
        if value < 0 {
            self.append_char(b'-');
        }

        let mut magnitude = value.unsigned_abs();
        let mut digits = [0u8; 10];
        let mut start = digits.len();
        loop {
            start -= 1;
            #[allow(clippy::cast_possible_truncation)] // Always 0..=9.
            let digit = (magnitude % 10) as u8;
            digits[start] = b'0' + digit;
            magnitude /= 10;
            if magnitude == 0 {
                break;
            }
        }
        self.append_bytes(&digits[start..]);
    }

    /// Append `<name>: <value><suffix>` followed by two spaces.
    ///
    /// The double space separates fields on a header line; no line break.
    pub fn append_stat(&mut self, name: &str, value: i32, suffix: &str) {
        self.append_str(name);
        self.append_bytes(b": ");
        self.append_decimal(value);
        self.append_str(suffix);
        self.append_bytes(b"  ");
    }

    // ── Escape sequences ────────────────────────────────────────────────

    /// Cursor position: `ESC [ <y+1> ; <x> H`.
    pub fn append_goto(&mut self, x: i32, y: i32) {
        self.append_bytes(b"\x1b[");
        self.append_decimal(y.saturating_add(1));
        self.append_char(b';');
        self.append_decimal(x);
        self.append_char(b'H');
    }

    /// Truecolor SGR: `ESC [ 38;2;r;g;b m` or `ESC [ 48;2;r;g;b m`.
    ///
    /// Channels are masked to 8 bits, so 256 wraps to 0.
    #[allow(clippy::cast_possible_truncation)] // Masked to 0..=255 first.
    pub fn append_color(&mut self, digits: &DigitTable, layer: Layer, r: u32, g: u32, b: u32) {
        self.append_bytes(layer.introducer());
        self.append_bytes(digits.get((r & 0xFF) as u8));
        self.append_char(b';');
        self.append_bytes(digits.get((g & 0xFF) as u8));
        self.append_char(b';');
        self.append_bytes(digits.get((b & 0xFF) as u8));
        self.append_char(b'm');
    }

    /// Clear the entire screen (ED 2).
    pub fn append_clear(&mut self) {
        self.append_bytes(b"\x1b[2J");
    }
}

// ─── Arena ───────────────────────────────────────────────────────────────────

/// Process-lifetime encoding state: the frame buffer and the digit table.
pub struct Arena {
    /// Reused for every frame; cleared, never reallocated.
    pub frame: ByteBuffer,
    /// Decimal text for color channels.
    pub digits: DigitTable,
}

impl Arena {
    /// Byte budget for a `width × height` grid: 16 bytes per cell plus a
    /// fixed allowance for the header.
    ///
    /// A frame with a color change on every cell needs more than 16 bytes
    /// per cell at the extremes of the channel range, so a maximal grid in
    /// that mode is truncated by design.
    #[must_use]
    pub const fn capacity_for(width: u16, height: u16) -> usize {
        256 + 16 * width as usize * height as usize
    }

    /// Build the arena for grids up to `max_width × max_height`.
    ///
    /// The backing storage is zero-initialized on allocation, so untouched
    /// pages of a large arena cost address space rather than memory.
    #[must_use]
    pub fn for_geometry(max_width: u16, max_height: u16) -> Self {
        Self {
            frame: ByteBuffer::with_capacity(Self::capacity_for(max_width, max_height)),
            digits: DigitTable::new(),
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::for_geometry(MAX_TERM_WIDTH, MAX_TERM_HEIGHT)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode(f: impl FnOnce(&mut ByteBuffer)) -> String {
        let mut buf = ByteBuffer::with_capacity(256);
        f(&mut buf);
        String::from_utf8(buf.as_bytes().to_vec()).unwrap()
    }

    fn color(layer: Layer, r: u32, g: u32, b: u32) -> String {
        let digits = DigitTable::new();
        encode(|buf| buf.append_color(&digits, layer, r, g, b))
    }

    // ── Decimal ─────────────────────────────────────────────────────────

    #[test]
    fn decimal_zero() {
        assert_eq!(encode(|b| b.append_decimal(0)), "0");
    }

    #[test]
    fn decimal_negative() {
        assert_eq!(encode(|b| b.append_decimal(-5)), "-5");
    }

    #[test]
    fn decimal_ten_digits() {
        assert_eq!(encode(|b| b.append_decimal(1_234_567_890)), "1234567890");
    }

    #[test]
    fn decimal_no_leading_zeros() {
        assert_eq!(encode(|b| b.append_decimal(1000)), "1000");
        assert_eq!(encode(|b| b.append_decimal(7)), "7");
    }

    #[test]
    fn decimal_extremes() {
        assert_eq!(encode(|b| b.append_decimal(i32::MAX)), "2147483647");
        assert_eq!(encode(|b| b.append_decimal(i32::MIN)), "-2147483648");
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn goto_offsets_row_only() {
        assert_eq!(encode(|b| b.append_goto(1, 3)), "\x1b[4;1H");
        assert_eq!(encode(|b| b.append_goto(1, 0)), "\x1b[1;1H");
        assert_eq!(encode(|b| b.append_goto(12, 2)), "\x1b[3;12H");
    }

    // ── Color ───────────────────────────────────────────────────────────

    #[test]
    fn color_foreground() {
        assert_eq!(color(Layer::Foreground, 255, 0, 128), "\x1b[38;2;255;0;128m");
    }

    #[test]
    fn color_background() {
        assert_eq!(color(Layer::Background, 1, 22, 3), "\x1b[48;2;1;22;3m");
    }

    #[test]
    fn color_channels_wrap() {
        assert_eq!(color(Layer::Background, 256, 0, 0), "\x1b[48;2;0;0;0m");
        assert_eq!(color(Layer::Foreground, 300, 511, 1024), "\x1b[38;2;44;255;0m");
    }

    // ── Stat ────────────────────────────────────────────────────────────

    #[test]
    fn stat_with_suffix() {
        assert_eq!(encode(|b| b.append_stat("Write", 3, "ms")), "Write: 3ms  ");
    }

    #[test]
    fn stat_without_suffix() {
        assert_eq!(encode(|b| b.append_stat("Frame", 42, "")), "Frame: 42  ");
    }

    #[test]
    fn clear_sequence() {
        assert_eq!(encode(ByteBuffer::append_clear), "\x1b[2J");
    }

    // ── Capacity ────────────────────────────────────────────────────────

    #[test]
    fn truncates_at_capacity() {
        let mut buf = ByteBuffer::with_capacity(4);
        buf.append_str("abcdef");
        assert_eq!(buf.as_bytes(), b"abcd");
        assert!(buf.is_full());
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn appends_after_full_are_ignored() {
        let mut buf = ByteBuffer::with_capacity(8);
        let digits = DigitTable::new();
        for _ in 0..100 {
            buf.append_color(&digits, Layer::Foreground, 255, 255, 255);
            buf.append_decimal(-123_456);
            buf.append_char(b'x');
        }
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.as_bytes(), b"\x1b[38;2;2");
    }

    #[test]
    fn zero_capacity_accepts_nothing() {
        let mut buf = ByteBuffer::with_capacity(0);
        buf.append_stat("Bytes", 1, "kb");
        assert!(buf.is_empty());
        assert!(buf.is_full());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buf = ByteBuffer::with_capacity(16);
        buf.append_str("frame");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 16);
        buf.append_char(b'z');
        assert_eq!(buf.as_bytes(), b"z");
    }

    // ── Arena ───────────────────────────────────────────────────────────

    #[test]
    fn arena_capacity_formula() {
        assert_eq!(Arena::capacity_for(80, 24), 256 + 16 * 80 * 24);
        assert_eq!(
            Arena::capacity_for(MAX_TERM_WIDTH, MAX_TERM_HEIGHT),
            256 + 16 * 4096 * 4096
        );
    }

    #[test]
    fn arena_for_small_geometry() {
        let arena = Arena::for_geometry(10, 10);
        assert_eq!(arena.frame.capacity(), 256 + 1600);
        assert!(arena.frame.is_empty());
    }
}
