// SPDX-License-Identifier: MIT
//
// tm-bench — the termmark benchmark core.
//
// Synthesizes animated truecolor frames, pushes them at the terminal as fast
// as it will take them, and turns the result into a stabilized throughput
// score. The pieces, leaves first:
//
//   buffer  → fixed-capacity escape-sequence encoder and the frame arena
//   digits  → precomputed decimal text for color channels 0–255
//   frame   → one full-screen frame: body pattern plus the stat header
//   timing  → phase durations and the windowed throughput meter
//   bench   → the loop that drives all of the above through `TerminalIo`
//
// Nothing in the timed path allocates. The arena is sized once for the
// largest supported grid and reused every frame; output that would not fit
// is truncated, never grown.

pub mod bench;
pub mod buffer;
pub mod config;
pub mod digits;
pub mod error;
pub mod frame;
pub mod timing;
