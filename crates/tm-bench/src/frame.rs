// SPDX-License-Identifier: MIT
//
// Frame generator.
//
// One frame is a body that fills the grid from row 3 down, followed by a
// three-line header drawn over the top of the screen:
//
//   Glyphs: 1k  Bytes: 70kb  Frame: 812  Prep: 1ms  Write: 3ms  ...
//   [L]:write per frame [C]:color per char [q]:quit
//   TermMarkV1: 9140kcg/s  (POSIX)            or   (collecting: 42%)
//
// The body is a diagonal wave of letters. With per-cell color on, every
// cell is preceded by a background and a foreground truecolor escape, so
// the terminal parses two SGR sequences per glyph. That is the heaviest
// workload, and the default. What the cells look like does not matter;
// how many bytes and escapes they cost does.
//
// Every color and glyph is a pure function of (frame index, x, y), so any
// frame can be regenerated byte-for-byte.

use bitflags::bitflags;
use tm_term::terminal::Size;

use crate::buffer::{Arena, Layer};
use crate::config::KeyBindings;
use crate::error::Result;
use crate::timing::{PhaseTimings, Reading};

/// Name the stabilized score is reported under.
pub const SCORE_NAME: &str = "TermMarkV1";

/// First body row passed to `append_goto`. Rows above it belong to the header.
const FIRST_BODY_ROW: u16 = 3;

/// Distinct glyphs in the wave: `a` through `y`.
const GLYPH_SPAN: u32 = 25;

// ─── Geometry ────────────────────────────────────────────────────────────────

/// Terminal grid size as the frame generator sees it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
}

impl Geometry {
    /// Take a reported size, clamped to the arena's bounds.
    #[must_use]
    pub fn clamped(size: Size, max_width: u16, max_height: u16) -> Self {
        Self {
            width: size.cols.min(max_width),
            height: size.rows.min(max_height),
        }
    }

    /// Rows credited to throughput per frame: the height minus the header band.
    #[must_use]
    pub const fn drawable_rows(self) -> u16 {
        self.height.saturating_sub(3)
    }

    /// Cells credited to throughput per frame.
    #[must_use]
    pub const fn cells(self) -> u64 {
        self.width as u64 * self.drawable_rows() as u64
    }
}

bitflags! {
    /// Workload shape. Empty is the default: one write per frame, color per cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Workload: u8 {
        /// Flush the buffer after every row instead of once per frame.
        const WRITE_PER_LINE  = 0b01;
        /// Skip per-cell color escapes; glyphs only.
        const COLOR_PER_FRAME = 0b10;
    }
}

/// Per-frame inputs shared by the body and the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    pub geometry: Geometry,
    pub frame_index: u32,
    pub workload: Workload,
}

/// Figures shown in the header, all from previous iterations.
#[derive(Debug, Clone, Copy)]
pub struct HeaderStats<'a> {
    /// Total bytes the previous frame sent.
    pub last_frame_bytes: usize,
    pub timings: PhaseTimings,
    pub reading: Reading,
    /// Appended after the score, e.g. `(POSIX)`.
    pub platform_label: &'a str,
    pub bindings: &'a KeyBindings,
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Where per-row flushes go when [`Workload::WRITE_PER_LINE`] is set.
pub trait FrameSink {
    /// Deliver `bytes` completely, or fail.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be delivered.
    fn emit(&mut self, bytes: &[u8]) -> Result<()>;
}

impl FrameSink for Vec<u8> {
    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

// ─── Body ────────────────────────────────────────────────────────────────────

/// Glyph at `(x, y)` in frame `frame_index`.
#[must_use]
pub const fn glyph(frame_index: u32, x: u32, y: u32) -> u8 {
    #[allow(clippy::cast_possible_truncation)] // Always below GLYPH_SPAN.
    let offset = (frame_index.wrapping_add(x).wrapping_add(y) % GLYPH_SPAN) as u8;
    b'a' + offset
}

/// Append the body rows to the arena's frame buffer.
///
/// Rows `y = 3..=height` are each positioned with `append_goto(1, y)`.
/// With [`Workload::WRITE_PER_LINE`], each finished row is handed to `sink`
/// and the buffer is cleared. Returns the number of bytes sent that way.
///
/// # Errors
///
/// Propagates the first sink failure.
pub fn render_body(arena: &mut Arena, ctx: &FrameContext, sink: &mut impl FrameSink) -> Result<usize> {
    let digits = &arena.digits;
    let buf = &mut arena.frame;
    let write_per_line = ctx.workload.contains(Workload::WRITE_PER_LINE);
    let color_per_cell = !ctx.workload.contains(Workload::COLOR_PER_FRAME);
    let f = ctx.frame_index;
    let mut flushed = 0;

    for y in FIRST_BODY_ROW..=ctx.geometry.height {
        buf.append_goto(1, i32::from(y));
        let y = u32::from(y);

        for x in 0..u32::from(ctx.geometry.width) {
            if color_per_cell {
                let diagonal = f.wrapping_add(y).wrapping_add(x);
                let row = f.wrapping_add(y);
                buf.append_color(digits, Layer::Background, diagonal, row, f);
                buf.append_color(digits, Layer::Foreground, f, row, diagonal);
            }
            buf.append_char(glyph(f, x, y));
        }

        if write_per_line {
            sink.emit(buf.as_bytes())?;
            flushed += buf.len();
            buf.clear();
        }
    }

    Ok(flushed)
}

// ─── Header ──────────────────────────────────────────────────────────────────

fn stat_value(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Append the three header lines after the body.
///
/// Colors are reset to white on black first so the header is legible
/// whatever the last body cell left behind.
pub fn render_header(arena: &mut Arena, ctx: &FrameContext, header: &HeaderStats<'_>) {
    let digits = &arena.digits;
    let buf = &mut arena.frame;
    let write_per_line = ctx.workload.contains(Workload::WRITE_PER_LINE);
    let color_per_frame = ctx.workload.contains(Workload::COLOR_PER_FRAME);
    let t = header.timings;

    buf.append_color(digits, Layer::Background, 0, 0, 0);
    buf.append_color(digits, Layer::Foreground, 255, 255, 255);

    // ── Line 1: frame statistics ──
    buf.append_goto(1, 0);
    buf.append_stat("Glyphs", stat_value(ctx.geometry.cells() / 1024), "k");
    buf.append_stat("Bytes", stat_value(header.last_frame_bytes as u64 / 1024), "kb");
    buf.append_stat("Frame", stat_value(u64::from(ctx.frame_index)), "");
    // Prep and write interleave when writing per line.
    if !write_per_line {
        buf.append_stat("Prep", stat_value(u64::from(t.prep_ms)), "ms");
    }
    buf.append_stat("Write", stat_value(u64::from(t.write_ms)), "ms");
    buf.append_stat("Read", stat_value(u64::from(t.read_ms)), "ms");
    buf.append_stat("Total", stat_value(u64::from(t.total_ms)), "ms");

    // ── Line 2: mode hints ──
    buf.append_goto(1, 1);
    buf.append_char(b'[');
    buf.append_str(header.bindings.toggle_write.label);
    buf.append_str(if write_per_line {
        "]:write per line "
    } else {
        "]:write per frame "
    });
    buf.append_char(b'[');
    buf.append_str(header.bindings.toggle_color.label);
    buf.append_str(if color_per_frame {
        "]:color per frame "
    } else {
        "]:color per char "
    });
    buf.append_char(b'[');
    buf.append_str(header.bindings.quit.label);
    buf.append_str("]:quit ");

    // ── Line 3: score ──
    buf.append_goto(1, 2);
    match header.reading {
        Reading::Score(score) => {
            let units = if color_per_frame { "kg/s" } else { "kcg/s" };
            buf.append_stat(SCORE_NAME, stat_value(u64::from(score)), units);
            buf.append_str(header.platform_label);
        }
        Reading::Collecting(percent) => {
            buf.append_stat("(collecting", stat_value(u64::from(percent)), "%)");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use pretty_assertions::assert_eq;

    fn ctx(width: u16, height: u16, frame_index: u32, workload: Workload) -> FrameContext {
        FrameContext {
            geometry: Geometry { width, height },
            frame_index,
            workload,
        }
    }

    fn header<'a>(bindings: &'a KeyBindings, reading: Reading) -> HeaderStats<'a> {
        HeaderStats {
            last_frame_bytes: 3 * 1024 + 5,
            timings: PhaseTimings {
                prep_ms: 1,
                write_ms: 2,
                read_ms: 0,
                total_ms: 4,
            },
            reading,
            platform_label: "(POSIX)",
            bindings,
        }
    }

    fn body(c: &FrameContext) -> (Vec<u8>, Vec<u8>) {
        let mut arena = Arena::for_geometry(128, 64);
        let mut sink = Vec::new();
        render_body(&mut arena, c, &mut sink).unwrap();
        (arena.frame.as_bytes().to_vec(), sink)
    }

    fn header_text(c: &FrameContext, stats: &HeaderStats<'_>) -> String {
        let mut arena = Arena::for_geometry(16, 16);
        render_header(&mut arena, c, stats);
        String::from_utf8(arena.frame.as_bytes().to_vec()).unwrap()
    }

    // ── Geometry ────────────────────────────────────────────────────────

    #[test]
    fn geometry_clamps_to_bounds() {
        let g = Geometry::clamped(Size { cols: 5000, rows: 30 }, 4096, 4096);
        assert_eq!(g, Geometry { width: 4096, height: 30 });
    }

    #[test]
    fn drawable_rows_reserve_header() {
        assert_eq!(Geometry { width: 80, height: 24 }.drawable_rows(), 21);
        assert_eq!(Geometry { width: 80, height: 2 }.drawable_rows(), 0);
        assert_eq!(Geometry { width: 80, height: 24 }.cells(), 80 * 21);
    }

    // ── Glyph ───────────────────────────────────────────────────────────

    #[test]
    fn glyph_wave() {
        assert_eq!(glyph(0, 0, 0), b'a');
        assert_eq!(glyph(0, 0, 3), b'd');
        assert_eq!(glyph(20, 4, 0), b'y');
        assert_eq!(glyph(20, 5, 0), b'a');
    }

    // ── Body ────────────────────────────────────────────────────────────

    #[test]
    fn golden_first_row_colored() {
        let c = ctx(80, 24, 0, Workload::empty());
        let (bytes, sink) = body(&c);
        assert!(sink.is_empty());

        let mut expected = String::from("\x1b[4;1H");
        for x in 0..3u32 {
            let y = 3;
            expected.push_str(&format!(
                "\x1b[48;2;{};{};0m\x1b[38;2;0;{};{}m{}",
                x + y,
                y,
                y,
                x + y,
                char::from(b'a' + u8::try_from((x + y) % 25).unwrap()),
            ));
        }
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(&expected), "row 3 starts with {:?}", &text[..80]);
        assert!(text.starts_with(
            "\x1b[4;1H\x1b[48;2;3;3;0m\x1b[38;2;0;3;3md\x1b[48;2;4;3;0m\x1b[38;2;0;3;4me"
        ));
    }

    #[test]
    fn colored_row_has_two_escapes_per_cell() {
        let c = ctx(80, 3, 7, Workload::empty());
        let (bytes, _) = body(&c);
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.matches("\x1b[48;2;").count(), 80);
        assert_eq!(text.matches("\x1b[38;2;").count(), 80);
    }

    #[test]
    fn color_per_frame_emits_glyphs_only() {
        let c = ctx(5, 4, 0, Workload::COLOR_PER_FRAME);
        let (bytes, _) = body(&c);
        assert_eq!(bytes, b"\x1b[4;1Hdefgh\x1b[5;1Hefghi".to_vec());
    }

    #[test]
    fn body_rows_run_through_height() {
        let c = ctx(1, 6, 0, Workload::COLOR_PER_FRAME);
        let (bytes, _) = body(&c);
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "\x1b[4;1Hd\x1b[5;1He\x1b[6;1Hf\x1b[7;1Hg");
    }

    #[test]
    fn short_terminal_has_no_body() {
        let (bytes, _) = body(&ctx(80, 2, 0, Workload::empty()));
        assert!(bytes.is_empty());
        let (bytes, _) = body(&ctx(0, 0, 0, Workload::empty()));
        assert!(bytes.is_empty());
    }

    #[test]
    fn channels_wrap_with_frame_index() {
        let c = ctx(1, 3, 253, Workload::empty());
        let (bytes, _) = body(&c);
        // diagonal = 253 + 3 + 0 = 256 → 0; row = 256 → 0.
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "\x1b[4;1H\x1b[48;2;0;0;253m\x1b[38;2;253;0;0mg"
        );
    }

    #[test]
    fn write_per_line_flushes_each_row() {
        struct Rows(Vec<Vec<u8>>);
        impl FrameSink for Rows {
            fn emit(&mut self, bytes: &[u8]) -> Result<()> {
                self.0.push(bytes.to_vec());
                Ok(())
            }
        }

        let c = ctx(4, 6, 0, Workload::WRITE_PER_LINE | Workload::COLOR_PER_FRAME);
        let mut arena = Arena::for_geometry(8, 8);
        let mut rows = Rows(Vec::new());
        let flushed = render_body(&mut arena, &c, &mut rows).unwrap();

        assert_eq!(rows.0.len(), 4);
        assert_eq!(rows.0[0], b"\x1b[4;1Hdefg".to_vec());
        assert_eq!(rows.0[3], b"\x1b[7;1Hghij".to_vec());
        assert_eq!(flushed, rows.0.iter().map(Vec::len).sum::<usize>());
        assert!(arena.frame.is_empty());
    }

    #[test]
    fn per_line_and_batched_bytes_agree() {
        let batched = ctx(7, 9, 42, Workload::empty());
        let per_line = ctx(7, 9, 42, Workload::WRITE_PER_LINE);
        let (batched_bytes, _) = body(&batched);
        let (rest, sink) = body(&per_line);
        assert!(rest.is_empty());
        assert_eq!(sink, batched_bytes);
    }

    #[test]
    fn sink_failure_propagates() {
        struct Broken;
        impl FrameSink for Broken {
            fn emit(&mut self, _bytes: &[u8]) -> Result<()> {
                Err(BenchError::WriteStalled { remaining: 1 })
            }
        }

        let c = ctx(4, 6, 0, Workload::WRITE_PER_LINE);
        let mut arena = Arena::for_geometry(8, 8);
        let err = render_body(&mut arena, &c, &mut Broken).unwrap_err();
        assert!(matches!(err, BenchError::WriteStalled { remaining: 1 }));
    }

    #[test]
    fn body_truncates_in_small_arena() {
        let c = ctx(100, 100, 0, Workload::empty());
        let mut arena = Arena::for_geometry(1, 1);
        render_body(&mut arena, &c, &mut Vec::new()).unwrap();
        assert_eq!(arena.frame.len(), arena.frame.capacity());
    }

    // ── Header ──────────────────────────────────────────────────────────

    #[test]
    fn header_while_collecting() {
        let bindings = KeyBindings::default();
        let c = ctx(128, 19, 12, Workload::empty());
        let text = header_text(&c, &header(&bindings, Reading::Collecting(42)));
        assert_eq!(
            text,
            "\x1b[48;2;0;0;0m\x1b[38;2;255;255;255m\
             \x1b[1;1HGlyphs: 2k  Bytes: 3kb  Frame: 12  Prep: 1ms  Write: 2ms  Read: 0ms  Total: 4ms  \
             \x1b[2;1H[L]:write per frame [C]:color per char [q]:quit \
             \x1b[3;1H(collecting: 42%)  "
        );
    }

    #[test]
    fn header_with_colored_score() {
        let bindings = KeyBindings::default();
        let c = ctx(80, 24, 0, Workload::empty());
        let text = header_text(&c, &header(&bindings, Reading::Score(9140)));
        assert!(text.ends_with("\x1b[3;1HTermMarkV1: 9140kcg/s  (POSIX)"));
    }

    #[test]
    fn header_with_glyph_score() {
        let bindings = KeyBindings::default();
        let c = ctx(80, 24, 0, Workload::COLOR_PER_FRAME);
        let text = header_text(&c, &header(&bindings, Reading::Score(0)));
        assert!(text.contains("[C]:color per frame "));
        assert!(text.ends_with("\x1b[3;1HTermMarkV1: 0kg/s  (POSIX)"));
    }

    #[test]
    fn header_hints_follow_binding_labels() {
        let mut bindings = KeyBindings::default();
        bindings.quit.label = "Esc";
        bindings.toggle_write.label = "F1";
        let c = ctx(80, 24, 0, Workload::empty());
        let text = header_text(&c, &header(&bindings, Reading::Collecting(0)));
        assert!(text.contains("\x1b[2;1H[F1]:write per frame [C]:color per char [Esc]:quit \x1b[3;1H"));
    }

    #[test]
    fn header_per_line_omits_prep() {
        let bindings = KeyBindings::default();
        let c = ctx(80, 24, 0, Workload::WRITE_PER_LINE);
        let text = header_text(&c, &header(&bindings, Reading::Collecting(0)));
        assert!(!text.contains("Prep:"));
        assert!(text.contains("Frame: 0  Write: 2ms  "));
        assert!(text.contains("[L]:write per line "));
    }

    #[test]
    fn header_saturates_huge_frame_index() {
        let bindings = KeyBindings::default();
        let c = ctx(80, 24, u32::MAX, Workload::empty());
        let text = header_text(&c, &header(&bindings, Reading::Collecting(0)));
        assert!(text.contains("Frame: 2147483647  "));
    }
}
