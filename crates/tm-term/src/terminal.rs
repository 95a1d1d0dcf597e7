// SPDX-License-Identifier: MIT
//
// POSIX terminal adapter: raw mode, size queries, key polling, raw writes.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), poll, read, write and sigaction. These
// are the standard POSIX interfaces for terminal control, and there is no safe
// alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// `Tty` owns the terminal's input mode for the duration of a run. Frames go
// straight to fd 1 with `write(2)`: no `LineWriter`, no extra copy, and a
// short write is reported to the caller instead of being hidden. Input is
// drained with a zero-timeout `poll(2)` so the benchmark loop never blocks
// on the keyboard.
//
// Cleanup is guaranteed three ways: an explicit `restore_input`, `Drop`,
// and a panic hook that restores termios from a global backup after
// writing the restore sequence directly to fd 1 (bypassing the stdout lock,
// which the panicking frame may hold).

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};
use std::time::Instant;

use log::debug;

use crate::ansi;
use crate::input::{Event, Parser};
use crate::io::TerminalIo;

/// Stdin bytes read per `read(2)` while draining input.
const READ_BUF_SIZE: usize = 256;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)` on stdout.
///
/// A zero-sized window is returned as-is; only a failed ioctl is an error.
///
/// # Errors
///
/// Returns the OS error if stdout is not a terminal or the query fails.
#[cfg(unix)]
pub fn get_size() -> io::Result<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };

    if result == 0 {
        Ok(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        Err(io::Error::last_os_error())
    }
}

/// # Errors
///
/// Always fails: no size query exists for this platform.
#[cfg(not(unix))]
pub fn get_size() -> io::Result<Size> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "terminal size query is not supported on this platform",
    ))
}

/// Check whether stdin is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Set by the SIGWINCH handler, consumed by [`Tty::poll_events`].
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Guards the one-time `sigaction` call.
static SIGWINCH_INSTALLED: Once = Once::new();

/// Install a handler that records terminal resizes in [`SIGWINCH_RECEIVED`].
///
/// Storing to an atomic is async-signal-safe. No `SA_RESTART`: an
/// interrupted `poll` simply ends the current drain.
#[cfg(unix)]
fn install_sigwinch_handler() {
    SIGWINCH_INSTALLED.call_once(|| unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    });
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn install_sigwinch_handler() {
    SIGWINCH_INSTALLED.call_once(|| {});
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Original termios for the panic hook, which cannot reach the [`Tty`].
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(not(unix))]
static TERMIOS_BACKUP: Mutex<Option<()>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        if let Some(original) = guard.take() {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const original);
            }
        }
    }
}

#[cfg(not(unix))]
fn restore_termios_from_backup() {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        guard.take();
    }
}

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Only acts if raw mode is still recorded in [`TERMIOS_BACKUP`], so a
/// panic after a clean restore prints normally.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let raw_active = TERMIOS_BACKUP.lock().map(|g| g.is_some()).unwrap_or(false);
            if raw_active {
                emergency_restore();
                restore_termios_from_backup();
            }
            original(info);
        }));
    });
}

/// Write [`ansi::EMERGENCY_RESTORE`] directly to stdout's file descriptor.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            ansi::EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            ansi::EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(ansi::EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Input Mode ─────────────────────────────────────────────────────────────

/// Switch between the terminal's original input mode and raw input.
trait InputMode {
    fn enter(&mut self) -> io::Result<()>;

    /// Put the original mode back. A no-op when not entered.
    fn exit(&mut self) -> io::Result<()>;
}

/// termios on stdin, with the original settings saved while raw.
#[derive(Default)]
struct Termios {
    #[cfg(unix)]
    original: Option<libc::termios>,
}

impl InputMode for Termios {
    #[cfg(unix)]
    fn enter(&mut self) -> io::Result<()> {
        if !is_tty() {
            return Err(io::Error::other("stdin is not a terminal"));
        }

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            self.original = Some(termios);
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            termios.c_iflag &=
                !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_cflag |= libc::CS8;
            termios.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);

            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const termios) != 0 {
                let err = io::Error::last_os_error();
                self.original = None;
                restore_termios_from_backup();
                return Err(err);
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_self)]
    fn enter(&mut self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "raw terminal input is not supported on this platform",
        ))
    }

    #[cfg(unix)]
    fn exit(&mut self) -> io::Result<()> {
        if let Some(original) = self.original.take() {
            unsafe {
                if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    fn exit(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Enter raw input and hide the cursor.
///
/// If the cursor sequence cannot be written, the mode is switched back
/// before the error is returned, so a failed entry never leaves the
/// terminal raw.
fn acquire(mode: &mut impl InputMode, out: &mut impl Write) -> io::Result<()> {
    mode.enter()?;
    if let Err(e) = ansi::cursor_hide(out).and_then(|()| out.flush()) {
        let _ = mode.exit();
        return Err(e);
    }
    Ok(())
}

/// Hand the screen back and leave raw input.
///
/// The mode is restored even when the screen sequence fails to write.
/// The first error wins.
fn release(mode: &mut impl InputMode, out: &mut impl Write) -> io::Result<()> {
    let screen = ansi::leave(out).and_then(|()| out.flush());
    let input = mode.exit();
    screen.and(input)
}

// ─── Tty ────────────────────────────────────────────────────────────────────

/// The host terminal, attached to this process's stdin and stdout.
///
/// Raw input is acquired with [`TerminalIo::enable_raw_input`] and released
/// by [`TerminalIo::restore_input`], on drop, or by the panic hook,
/// whichever comes first.
///
/// # Example
///
/// ```no_run
/// use tm_term::io::TerminalIo;
/// use tm_term::terminal::Tty;
///
/// let mut tty = Tty::new();
/// tty.enable_raw_input()?;
/// let size = tty.query_size()?;
/// tty.write_bytes(b"\x1b[2J")?;
/// tty.restore_input()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Tty {
    /// Input mode switch; holds the saved termios while raw.
    mode: Termios,

    /// Key decoder, persistent so split sequences survive between polls.
    parser: Parser,

    /// Scratch space for `read(2)`.
    read_buf: [u8; READ_BUF_SIZE],

    /// Whether raw input is currently enabled.
    active: bool,
}

impl Tty {
    /// Create a handle. Does not touch the terminal until raw input is enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: Termios::default(),
            parser: Parser::new(),
            read_buf: [0; READ_BUF_SIZE],
            active: false,
        }
    }

    /// Whether raw input is currently enabled.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    // ── Input ───────────────────────────────────────────────────────

    #[cfg(unix)]
    fn drain_stdin(&mut self, events: &mut Vec<Event>) -> io::Result<()> {
        loop {
            let ready = unsafe {
                let mut pfd = libc::pollfd {
                    fd: libc::STDIN_FILENO,
                    events: libc::POLLIN,
                    revents: 0,
                };
                libc::poll(&raw mut pfd, 1, 0)
            };

            if ready < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    break;
                }
                return Err(err);
            }
            if ready == 0 {
                break;
            }

            let n = unsafe {
                libc::read(
                    libc::STDIN_FILENO,
                    self.read_buf.as_mut_ptr().cast(),
                    self.read_buf.len(),
                )
            };

            if n == 0 {
                events.push(Event::EndOfInput);
                break;
            }
            if n < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::Interrupted => continue,
                    io::ErrorKind::WouldBlock => break,
                    _ => return Err(err),
                }
            }

            #[allow(clippy::cast_sign_loss)] // n > 0 guaranteed above.
            let n = n as usize;
            self.parser.advance(&self.read_buf[..n], events);
        }
        Ok(())
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    fn drain_stdin(&mut self, _events: &mut Vec<Event>) -> io::Result<()> {
        Ok(())
    }
}

impl Default for Tty {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalIo for Tty {
    fn enable_raw_input(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }

        install_panic_hook();
        install_sigwinch_handler();
        acquire(&mut self.mode, &mut io::stdout().lock())?;

        self.active = true;
        debug!("raw input enabled");
        Ok(())
    }

    fn restore_input(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }

        self.active = false;
        let restored = release(&mut self.mode, &mut io::stdout().lock());
        debug!("raw input restored");
        restored
    }

    fn query_size(&mut self) -> io::Result<Size> {
        get_size()
    }

    fn poll_events(&mut self, events: &mut Vec<Event>) -> io::Result<()> {
        self.drain_stdin(events)?;

        self.parser.expire(events);

        if SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
            debug!("SIGWINCH received");
            events.push(Event::Resize);
        }
        Ok(())
    }

    #[cfg(unix)]
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let n = unsafe {
            libc::write(
                libc::STDOUT_FILENO,
                bytes.as_ptr().cast::<libc::c_void>(),
                bytes.len(),
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }

    #[cfg(not(unix))]
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<usize> {
        io::stdout().write(bytes)
    }

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn platform_label(&self) -> &'static str {
        if cfg!(unix) { "(POSIX)" } else { "" }
    }
}

impl Drop for Tty {
    fn drop(&mut self) {
        if self.active {
            let _ = self.restore_input();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
