// SPDX-License-Identifier: MIT
//
// Decimal text for 0–255, computed once.
//
// Every colored cell carries six channel values. Formatting each one would
// dominate frame preparation, so the channels are looked up instead. The
// table is filled by the encoder's own `append_decimal`, which keeps the
// two paths byte-identical.

use crate::buffer::ByteBuffer;

/// Immutable lookup from a byte value to its decimal digits.
pub struct DigitTable {
    text: [[u8; 3]; 256],
    lens: [u8; 256],
}

impl DigitTable {
    /// Build the table. Call once, before the frame loop.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            text: [[0; 3]; 256],
            lens: [0; 256],
        };
        let mut scratch = ByteBuffer::with_capacity(3);

        for value in 0..=u8::MAX {
            scratch.clear();
            scratch.append_decimal(i32::from(value));
            let digits = scratch.as_bytes();
            let slot = usize::from(value);
            table.text[slot][..digits.len()].copy_from_slice(digits);
            #[allow(clippy::cast_possible_truncation)] // At most 3 digits.
            let len = digits.len() as u8;
            table.lens[slot] = len;
        }

        table
    }

    /// Decimal digits of `value`, without padding.
    #[inline]
    #[must_use]
    pub fn get(&self, value: u8) -> &[u8] {
        let slot = usize::from(value);
        &self.text[slot][..usize::from(self.lens[slot])]
    }
}

impl Default for DigitTable {
    fn default() -> Self {
        Self::new()
    }
}
