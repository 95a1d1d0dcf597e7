// SPDX-License-Identifier: MIT
//
// Phase timing and the windowed throughput meter.
//
// Each iteration is stamped at four checkpoints:
//
//   A  start    iteration begins
//   B  built    frame content complete (per-line writes included)
//   C  written  final bulk write returned
//   D  drained  input polled and handled
//
// Prep = B−A, Write = C−B, Read = D−C, Total = D−A, truncated to whole
// milliseconds. They are shown in the header and play no part in scoring.
//
// Scoring is a plain window average. Cells accumulate while the window
// fills; once more than the window's length has elapsed since the anchor,
// the score becomes kilo-cells per second over that span and a new window
// starts. Anything that changes the workload shape throws the window away,
// so one score never mixes two workloads.

use std::time::{Duration, Instant};

/// Default length of one measurement window.
pub const DEFAULT_STAT_WINDOW: Duration = Duration::from_secs(10);

/// The four timestamps of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoints {
    pub start: Instant,
    pub built: Instant,
    pub written: Instant,
    pub drained: Instant,
}

/// Whole-millisecond phase durations of the previous iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub prep_ms: u32,
    pub write_ms: u32,
    pub read_ms: u32,
    pub total_ms: u32,
}

impl PhaseTimings {
    /// Derive the phase durations from one iteration's checkpoints.
    ///
    /// Out-of-order stamps yield zero rather than a negative duration.
    #[must_use]
    pub fn measure(points: &Checkpoints) -> Self {
        Self {
            prep_ms: whole_ms(points.start, points.built),
            write_ms: whole_ms(points.built, points.written),
            read_ms: whole_ms(points.written, points.drained),
            total_ms: whole_ms(points.start, points.drained),
        }
    }
}

fn whole_ms(from: Instant, to: Instant) -> u32 {
    u32::try_from(to.saturating_duration_since(from).as_millis()).unwrap_or(u32::MAX)
}

// ─── Throughput ──────────────────────────────────────────────────────────────

/// What the header's score line should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// A stabilized score in kilo-cells per second.
    Score(u32),
    /// No score for this workload yet; the window is this percent full.
    Collecting(u32),
}

/// Windowed kilo-cells-per-second estimator.
#[derive(Debug, Clone)]
pub struct ThroughputMeter {
    window_ms: u64,
    accumulated: u64,
    anchor: Option<Instant>,
    score: Option<u32>,
    percent: u32,
}

impl ThroughputMeter {
    /// A meter that stabilizes once per `window`.
    ///
    /// Windows shorter than a millisecond are treated as one millisecond.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1),
            accumulated: 0,
            anchor: None,
            score: None,
            percent: 0,
        }
    }

    /// Checkpoint A of an iteration.
    ///
    /// An empty accumulator moves the anchor to `now`. Otherwise, once the
    /// elapsed time exceeds the window, the score is recomputed, the anchor
    /// moves to `now` and the accumulator empties. Returns the new score
    /// when one was produced by this call.
    pub fn begin(&mut self, now: Instant) -> Option<u32> {
        let anchor = match self.anchor {
            Some(anchor) if self.accumulated != 0 => anchor,
            _ => {
                self.anchor = Some(now);
                return None;
            }
        };

        let elapsed_ms =
            u64::try_from(now.saturating_duration_since(anchor).as_millis()).unwrap_or(u64::MAX);

        let mut fresh = None;
        if elapsed_ms > self.window_ms {
            let kilo_cells = self.accumulated / 1024;
            let score = u32::try_from(kilo_cells.saturating_mul(1000) / elapsed_ms)
                .unwrap_or(u32::MAX);
            self.score = Some(score);
            self.anchor = Some(now);
            self.accumulated = 0;
            fresh = Some(score);
        }

        self.percent =
            u32::try_from(elapsed_ms.saturating_mul(100) / self.window_ms).unwrap_or(u32::MAX);
        fresh
    }

    /// Credit cells rendered by the iteration that just finished.
    pub const fn accumulate(&mut self, cells: u64) {
        self.accumulated = self.accumulated.saturating_add(cells);
    }

    /// Drop the current window and the last score.
    pub const fn invalidate(&mut self) {
        self.accumulated = 0;
        self.score = None;
        self.percent = 0;
    }

    #[must_use]
    pub const fn reading(&self) -> Reading {
        match self.score {
            Some(score) => Reading::Score(score),
            None => Reading::Collecting(self.percent),
        }
    }

    /// Cells credited since the anchor.
    #[must_use]
    pub const fn accumulated(&self) -> u64 {
        self.accumulated
    }

    /// Last stabilized score, if the current workload has one.
    #[must_use]
    pub const fn score(&self) -> Option<u32> {
        self.score
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new(DEFAULT_STAT_WINDOW)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
