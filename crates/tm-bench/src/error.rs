// SPDX-License-Identifier: MIT
//
// Fatal conditions of a benchmark run.
//
// Buffer overflow is deliberately absent: the encoder truncates. What
// remains are the failures after which the display can no longer be
// trusted, so the run stops and the input mode is restored.

use std::io;

use thiserror::Error;

/// Everything that can end a run early.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Raw input mode could not be entered.
    #[error("failed to enter raw input mode")]
    RawMode(#[source] io::Error),

    /// The terminal size could not be queried at startup.
    #[error("failed to query terminal size")]
    Geometry(#[source] io::Error),

    /// Writing a frame to the terminal failed.
    #[error("failed to write frame to terminal")]
    Write(#[source] io::Error),

    /// The terminal accepted zero bytes of a pending write.
    ///
    /// Retrying would spin forever, and abandoning the tail would leave a
    /// partial escape sequence on the wire.
    #[error("terminal stopped accepting output with {remaining} bytes unsent")]
    WriteStalled { remaining: usize },

    /// Polling terminal input failed.
    #[error("failed to read terminal input")]
    Input(#[source] io::Error),

    /// The original input mode could not be restored on exit.
    #[error("failed to restore terminal input mode")]
    Restore(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_variants_expose_source() {
        let err = BenchError::Write(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(err.source().is_some());
    }

    #[test]
    fn stalled_write_reports_remaining() {
        let err = BenchError::WriteStalled { remaining: 42 };
        assert_eq!(
            err.to_string(),
            "terminal stopped accepting output with 42 bytes unsent"
        );
        assert!(err.source().is_none());
    }
}
