// SPDX-License-Identifier: MIT
//
// The contract between the benchmark core and its host terminal.
//
// The core never branches on platform identity. It asks for raw input, a
// grid size, pending key events, a place to put bytes, and the time. Each
// supported platform provides one implementation (see `terminal::Tty`);
// tests provide scripted ones.

use std::io;
use std::time::Instant;

use crate::input::Event;
use crate::terminal::Size;

/// Terminal capabilities the benchmark consumes.
///
/// Implementations must keep every call non-blocking except
/// [`write_bytes`](Self::write_bytes), which may block until the terminal
/// accepts at least some of the data.
pub trait TerminalIo {
    /// Disable line buffering, echo and signal-generating keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the input mode cannot be changed. The benchmark
    /// treats this as fatal.
    fn enable_raw_input(&mut self) -> io::Result<()>;

    /// Put the input mode back the way [`enable_raw_input`](Self::enable_raw_input)
    /// found it. Must be safe to call when raw input was never enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the original mode cannot be restored.
    fn restore_input(&mut self) -> io::Result<()>;

    /// Current terminal grid size in cells.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn query_size(&mut self) -> io::Result<Size>;

    /// Drain every pending input event without blocking.
    ///
    /// Pushes zero or more events onto `events`. A size change is reported
    /// as [`Event::Resize`]; end of input as [`Event::EndOfInput`].
    ///
    /// # Errors
    ///
    /// Returns an error if the input source fails.
    fn poll_events(&mut self, events: &mut Vec<Event>) -> io::Result<()>;

    /// Perform one write, returning how many bytes the terminal accepted.
    ///
    /// A short count is legal. Callers that need the whole buffer sent
    /// must loop.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Monotonic timestamp, immune to wall-clock adjustment.
    fn now(&self) -> Instant;

    /// Short host tag shown next to the stabilized score, e.g. `(POSIX)`.
    fn platform_label(&self) -> &'static str {
        ""
    }
}

impl<T: TerminalIo + ?Sized> TerminalIo for &mut T {
    fn enable_raw_input(&mut self) -> io::Result<()> {
        (**self).enable_raw_input()
    }

    fn restore_input(&mut self) -> io::Result<()> {
        (**self).restore_input()
    }

    fn query_size(&mut self) -> io::Result<Size> {
        (**self).query_size()
    }

    fn poll_events(&mut self, events: &mut Vec<Event>) -> io::Result<()> {
        (**self).poll_events(events)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write_bytes(bytes)
    }

    fn now(&self) -> Instant {
        (**self).now()
    }

    fn platform_label(&self) -> &'static str {
        (**self).platform_label()
    }
}
