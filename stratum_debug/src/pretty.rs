// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable diagnostics.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).
//! [`print_frame`] dumps an assembled frame's pass DAG as indented text.

use std::fmt::Write as _;
use std::io::Write;

use stratum_core::trace::{
    ActivationEvent, CommitEvent, DamageEvent, DrawDecisionEvent, MemoryStatsEvent, ScrollEvent,
    TileStatsEvent, TraceSink,
};
use stratum_render::pass::{DrawQuad, FrameData, RenderPass};

/// Writes human-readable trace lines to a [`Write`](std::io::Write)
/// destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_commit(&mut self, e: &CommitEvent) {
        let _ = writeln!(
            self.writer,
            "[commit] frame={} layers={} structural={}",
            e.source_frame_number, e.layer_count, e.structural_change,
        );
    }

    fn on_activation(&mut self, e: &ActivationEvent) {
        let _ = writeln!(
            self.writer,
            "[activate] frame={} at={}t",
            e.source_frame_number,
            e.at.ticks(),
        );
    }

    fn on_draw_decision(&mut self, e: &DrawDecisionEvent) {
        let outcome = match e.aborted {
            Some(reason) => format!("abort:{reason:?}"),
            None if e.has_no_damage => "no-damage".to_owned(),
            None => format!("draw passes={}", e.pass_count),
        };
        let _ = writeln!(
            self.writer,
            "[draw] {outcome} incomplete={}",
            e.contains_incomplete_tile,
        );
    }

    fn on_damage(&mut self, e: &DamageEvent) {
        let [x0, y0, x1, y1] = e.root_damage;
        let _ = writeln!(self.writer, "[damage] ({x0},{y0})..({x1},{y1})");
    }

    fn on_tile_stats(&mut self, e: &TileStatsEvent) {
        let _ = writeln!(
            self.writer,
            "[tiles] resident={}B evicted={}B missing={}",
            e.resident_bytes, e.evicted_bytes, e.missing_tiles,
        );
    }

    fn on_scroll(&mut self, e: &ScrollEvent) {
        let _ = writeln!(
            self.writer,
            "[scroll] applied=({},{}) overscroll=({},{})",
            e.applied[0], e.applied[1], e.overscroll[0], e.overscroll[1],
        );
    }

    fn on_memory_stats(&mut self, e: &MemoryStatsEvent) {
        let _ = writeln!(self.writer, "[memory] allocated={}B", e.bytes_allocated);
    }
}

/// Renders a frame's pass list as indented text, root pass first and
/// referenced passes nested beneath their referencing quads.
#[must_use]
pub fn print_frame(frame: &FrameData) -> String {
    let mut out = String::new();
    if frame.has_no_damage {
        out.push_str("frame: no damage\n");
        return out;
    }
    let _ = writeln!(
        out,
        "frame: {} passes, incomplete_tile={}",
        frame.passes.len(),
        frame.contains_incomplete_tile,
    );
    if let Some(root) = frame.root_pass() {
        print_pass(frame, root, 1, &mut out);
    }
    out
}

fn print_pass(frame: &FrameData, pass: &RenderPass, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(
        out,
        "{indent}pass {:?} output={:?} damage={:?} quads={} copies={}",
        pass.id,
        pass.output_rect,
        pass.damage_rect,
        pass.quads.len(),
        pass.copy_requests.len(),
    );
    for quad in &pass.quads {
        let label = match quad {
            DrawQuad::SolidColor { .. } => "solid",
            DrawQuad::Tile { .. } => "tile",
            DrawQuad::Checkerboard { .. } => "checkerboard",
            DrawQuad::Pass { .. } => "pass-ref",
            DrawQuad::Overhang { .. } => "overhang",
        };
        let _ = writeln!(out, "{indent}  {label} {:?}", quad.rect());
        if let Some(referenced) = quad.referenced_pass() {
            if let Some(inner) = frame.pass_by_id(referenced) {
                print_pass(frame, inner, depth + 2, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;
    use stratum_core::geom::Color;
    use stratum_core::transform::Transform3d;
    use stratum_render::pass::{RenderPassId, SharedQuadState};

    use super::*;

    #[test]
    fn trace_lines_are_labelled() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_commit(&CommitEvent {
            source_frame_number: 1,
            layer_count: 2,
            structural_change: true,
        });
        sink.on_draw_decision(&DrawDecisionEvent {
            has_no_damage: true,
            contains_incomplete_tile: false,
            aborted: None,
            pass_count: 0,
        });
        let output = String::from_utf8(sink.writer).expect("utf8");
        assert!(output.contains("[commit] frame=1"), "got: {output}");
        assert!(output.contains("no-damage"), "got: {output}");
    }

    #[test]
    fn frame_dump_nests_referenced_passes() {
        let mut child = RenderPass::new(
            RenderPassId(2),
            Rect::new(0.0, 0.0, 50.0, 50.0),
            Rect::ZERO,
        );
        let shared = child.add_shared_state(SharedQuadState {
            transform: Transform3d::IDENTITY,
            visible_rect: Rect::new(0.0, 0.0, 50.0, 50.0),
            clip: Rect::new(0.0, 0.0, 50.0, 50.0),
            opacity: 1.0,
            blend: false,
        });
        child.quads.push(DrawQuad::SolidColor {
            shared,
            rect: Rect::new(0.0, 0.0, 50.0, 50.0),
            color: Color::BLACK,
        });

        let mut root = RenderPass::new(
            RenderPassId(1),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::ZERO,
        );
        let shared = root.add_shared_state(SharedQuadState {
            transform: Transform3d::IDENTITY,
            visible_rect: Rect::new(0.0, 0.0, 100.0, 100.0),
            clip: Rect::new(0.0, 0.0, 100.0, 100.0),
            opacity: 1.0,
            blend: false,
        });
        root.quads.push(DrawQuad::Pass {
            shared,
            rect: Rect::new(0.0, 0.0, 50.0, 50.0),
            pass: RenderPassId(2),
        });

        let frame = FrameData {
            passes: vec![child, root],
            ..FrameData::default()
        };
        let dump = print_frame(&frame);
        assert!(dump.contains("pass RenderPassId(1)"), "got: {dump}");
        assert!(dump.contains("pass-ref"), "got: {dump}");
        assert!(dump.contains("pass RenderPassId(2)"), "got: {dump}");
        assert!(dump.contains("solid"), "got: {dump}");
    }

    #[test]
    fn no_damage_frame_prints_short_form() {
        let frame = FrameData {
            has_no_damage: true,
            ..FrameData::default()
        };
        assert_eq!(print_frame(&frame), "frame: no damage\n");
    }
}
