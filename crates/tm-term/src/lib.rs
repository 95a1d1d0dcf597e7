// SPDX-License-Identifier: MIT
//
// tm-term — Terminal I/O adapter for termmark.
//
// Everything the benchmark needs from its host lives here: raw input mode,
// grid size queries, non-blocking key polling, unbuffered writes to the
// terminal, and a monotonic clock. The benchmark core only sees the
// `TerminalIo` trait; the platform-specific code stays behind it.
//
// Direct termios and ANSI control, no TUI framework in between. What the
// benchmark measures is the terminal, not an abstraction layer.

pub mod ansi;
pub mod input;
pub mod io;
pub mod terminal;
