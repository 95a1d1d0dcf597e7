// SPDX-License-Identifier: MIT
//
// termmark — measure how fast a terminal can take truecolor output.
//
// This is the binary that wires the two crates together:
//
//   tm-term  → raw input, size queries, key decoding, unbuffered writes
//   tm-bench → frame synthesis, phase timing, the throughput score
//
// There are no flags and no config file; every run uses the same workload
// so scores stay comparable. While it runs:
//
//   q / Esc / Ctrl-C   quit
//   L / F1             toggle one write per frame ↔ one write per row
//   C / F2             toggle color per cell ↔ glyphs only
//
// Diagnostics go to stderr through `log`. Set RUST_LOG=info (and redirect
// stderr) to capture each stabilized score without disturbing the display.

use anyhow::Context;
use log::info;

use tm_bench::bench::Bench;
use tm_bench::config::BenchConfig;
use tm_term::terminal::Tty;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_micros()
        .init();

    let mut bench = Bench::new(Tty::new(), BenchConfig::default());
    let summary = bench.run().context("termmark: benchmark aborted")?;

    match summary.last_score {
        Some(score) => info!("{} frames, last score {score}", summary.frames),
        None => info!("{} frames, no window completed", summary.frames),
    }
    Ok(())
}
