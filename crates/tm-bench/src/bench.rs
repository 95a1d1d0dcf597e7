// SPDX-License-Identifier: MIT
//
// The benchmark loop.
//
// One iteration, strictly in order:
//
//   A  stamp, advance the throughput window
//      re-query the size if a resize was seen
//      build the body (flushing per row in per-line mode), then the header
//   B  stamp
//      write whatever is left in the buffer
//   C  stamp
//      drain input: quit, toggle a workload flag, or note a resize
//   D  stamp, record phase times, credit or discard the frame's cells
//
// A toggle or resize discards the window at D, so the next A re-anchors and
// no score mixes two workloads. Quit and end of input clear `running`,
// which is checked before the next iteration. Input mode is restored on
// every exit path once it has been entered.

use std::io;

use log::{debug, info, warn};
use tm_term::input::Event;
use tm_term::io::TerminalIo;
use tm_term::terminal::Size;

use crate::buffer::Arena;
use crate::config::{BenchConfig, Command};
use crate::error::{BenchError, Result};
use crate::frame::{
    FrameContext, FrameSink, Geometry, HeaderStats, SCORE_NAME, Workload, render_body,
    render_header,
};
use crate::timing::{Checkpoints, PhaseTimings, ThroughputMeter};

/// What a finished run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Iterations completed.
    pub frames: u32,
    /// The most recent stabilized score, if any window completed.
    pub last_score: Option<u32>,
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Send all of `bytes`, retrying short and interrupted writes.
///
/// A write that accepts nothing is fatal: the tail would otherwise be lost
/// mid-escape and every later frame would be drawn at the wrong position.
fn write_all<T: TerminalIo>(term: &mut T, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        match term.write_bytes(bytes) {
            Ok(0) => {
                return Err(BenchError::WriteStalled {
                    remaining: bytes.len(),
                });
            }
            Ok(n) => bytes = &bytes[n.min(bytes.len())..],
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {}
            Err(e) => return Err(BenchError::Write(e)),
        }
    }
    Ok(())
}

/// Per-row flush target that writes straight to the terminal.
struct Output<'a, T> {
    term: &'a mut T,
}

impl<T: TerminalIo> FrameSink for Output<'_, T> {
    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        write_all(&mut *self.term, bytes)
    }
}

// ─── Bench ───────────────────────────────────────────────────────────────────

/// A benchmark session over one terminal.
pub struct Bench<T: TerminalIo> {
    term: T,
    config: BenchConfig,
    arena: Arena,

    geometry: Geometry,
    geometry_stale: bool,
    workload: Workload,

    meter: ThroughputMeter,
    timings: PhaseTimings,
    frame_index: u32,
    last_frame_bytes: usize,
    last_score: Option<u32>,

    events: Vec<Event>,
    running: bool,
}

impl<T: TerminalIo> Bench<T> {
    /// Allocate the arena for `config`'s size bounds. Nothing touches the
    /// terminal until [`run`](Self::run).
    pub fn new(term: T, config: BenchConfig) -> Self {
        Self {
            term,
            arena: Arena::for_geometry(config.max_width, config.max_height),
            meter: ThroughputMeter::new(config.stat_window),
            config,
            geometry: Geometry::default(),
            geometry_stale: true,
            workload: Workload::empty(),
            timings: PhaseTimings::default(),
            frame_index: 0,
            last_frame_bytes: 0,
            last_score: None,
            events: Vec::with_capacity(16),
            running: true,
        }
    }

    /// Run until quit or end of input.
    ///
    /// # Errors
    ///
    /// Fails if raw input cannot be entered, the initial size query fails,
    /// a write fails or stalls, input polling fails, or the input mode
    /// cannot be restored. The first of these wins; restoration is still
    /// attempted after any failure past raw-mode entry.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.term.enable_raw_input().map_err(BenchError::RawMode)?;

        let outcome = self.run_inner();

        let restored = self.term.restore_input().map_err(BenchError::Restore);

        let summary = outcome?;
        restored?;
        Ok(summary)
    }

    fn run_inner(&mut self) -> Result<RunSummary> {
        let size = self.term.query_size().map_err(BenchError::Geometry)?;
        self.apply_size(size);
        info!(
            "benchmarking {}x{} ({} cells per frame)",
            self.geometry.width,
            self.geometry.height,
            self.geometry.cells()
        );

        self.arena.frame.clear();
        self.arena.frame.append_clear();
        write_all(&mut self.term, self.arena.frame.as_bytes())?;
        self.arena.frame.clear();

        while self.running {
            self.step()?;
        }
        Ok(self.summary())
    }

    /// Run one iteration.
    ///
    /// # Errors
    ///
    /// Fails if a write fails or stalls, or input polling fails.
    pub fn step(&mut self) -> Result<()> {
        let start = self.term.now();
        if let Some(score) = self.meter.begin(start) {
            self.last_score = Some(score);
            info!("{SCORE_NAME}: {score} ({:?})", self.workload);
        }

        if self.geometry_stale {
            self.refresh_geometry();
        }

        let ctx = FrameContext {
            geometry: self.geometry,
            frame_index: self.frame_index,
            workload: self.workload,
        };

        self.arena.frame.clear();
        let mut sent = render_body(&mut self.arena, &ctx, &mut Output { term: &mut self.term })?;
        let header = HeaderStats {
            last_frame_bytes: self.last_frame_bytes,
            timings: self.timings,
            reading: self.meter.reading(),
            platform_label: self.term.platform_label(),
            bindings: &self.config.bindings,
        };
        render_header(&mut self.arena, &ctx, &header);
        let built = self.term.now();

        sent += self.arena.frame.len();
        write_all(&mut self.term, self.arena.frame.as_bytes())?;
        self.arena.frame.clear();
        let written = self.term.now();

        let discard = self.drain_input()?;
        let drained = self.term.now();

        self.timings = PhaseTimings::measure(&Checkpoints {
            start,
            built,
            written,
            drained,
        });
        self.last_frame_bytes = sent;
        self.frame_index = self.frame_index.wrapping_add(1);

        if discard {
            self.meter.invalidate();
        } else {
            self.meter.accumulate(self.geometry.cells());
        }
        Ok(())
    }

    /// Poll and apply input. Returns whether the window must be discarded.
    fn drain_input(&mut self) -> Result<bool> {
        let mut events = std::mem::take(&mut self.events);
        events.clear();
        let polled = self.term.poll_events(&mut events);

        let mut discard = false;
        if polled.is_ok() {
            for &event in &events {
                discard |= self.handle_event(event);
                if !self.running {
                    break;
                }
            }
        }

        self.events = events;
        polled.map_err(BenchError::Input)?;
        Ok(discard)
    }

    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) => match self.config.bindings.resolve(&key) {
                Some(Command::Quit) => {
                    self.running = false;
                    false
                }
                Some(Command::ToggleWriteMode) => {
                    self.workload.toggle(Workload::WRITE_PER_LINE);
                    debug!("workload now {:?}", self.workload);
                    true
                }
                Some(Command::ToggleColorMode) => {
                    self.workload.toggle(Workload::COLOR_PER_FRAME);
                    debug!("workload now {:?}", self.workload);
                    true
                }
                None => false,
            },
            Event::Resize => {
                debug!("terminal resized");
                self.geometry_stale = true;
                true
            }
            Event::EndOfInput => {
                debug!("end of input");
                self.running = false;
                false
            }
        }
    }

    fn refresh_geometry(&mut self) {
        match self.term.query_size() {
            Ok(size) => self.apply_size(size),
            Err(e) => {
                warn!(
                    "size query failed, keeping {}x{}: {e}",
                    self.geometry.width, self.geometry.height
                );
                self.geometry_stale = false;
            }
        }
    }

    fn apply_size(&mut self, size: Size) {
        let geometry = Geometry::clamped(size, self.config.max_width, self.config.max_height);
        if geometry.width != size.cols || geometry.height != size.rows {
            debug!(
                "clamped {}x{} to {}x{}",
                size.cols, size.rows, geometry.width, geometry.height
            );
        }
        self.geometry = geometry;
        self.geometry_stale = false;
    }

    // ── Accessors ───────────────────────────────────────────────────────

    #[must_use]
    pub const fn summary(&self) -> RunSummary {
        RunSummary {
            frames: self.frame_index,
            last_score: self.last_score,
        }
    }

    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[must_use]
    pub const fn workload(&self) -> Workload {
        self.workload
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn meter(&self) -> &ThroughputMeter {
        &self.meter
    }

    #[must_use]
    pub const fn terminal(&self) -> &T {
        &self.term
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
