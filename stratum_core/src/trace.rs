// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-pipeline instrumentation.
//!
//! [`TraceSink`] is the observation contract: one method per pipeline
//! event, every method defaulting to a no-op, so sinks implement only
//! what they care about. [`Tracer`] wraps an optional `&mut dyn
//! TraceSink`; with the `trace` cargo feature disabled every `Tracer`
//! method compiles to nothing, and with it enabled each call is a single
//! `Option` branch.
//!
//! Concrete sinks (binary recorder, Chrome trace export) live in
//! `stratum_debug`.

use crate::time::HostTime;

/// Why a prepared frame was not handed to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// Drawing is currently impossible (no renderer, purged textures,
    /// empty viewport).
    CantDraw,
    /// A layer with an animating transform is missing tiles; the
    /// previous frame is kept to avoid mid-animation checkerboard.
    CheckerboardAnimation,
}

/// Emitted when a commit is applied to the pending (or active) tree.
#[derive(Clone, Copy, Debug)]
pub struct CommitEvent {
    /// Monotonic commit counter.
    pub source_frame_number: u64,
    /// Number of layers delivered by the commit.
    pub layer_count: usize,
    /// Whether the commit changed layer identities (full sync needed).
    pub structural_change: bool,
}

/// Emitted when the pending tree becomes active.
#[derive(Clone, Copy, Debug)]
pub struct ActivationEvent {
    /// Commit counter of the activated tree.
    pub source_frame_number: u64,
    /// Host time of activation.
    pub at: HostTime,
}

/// Emitted after each draw decision.
#[derive(Clone, Copy, Debug)]
pub struct DrawDecisionEvent {
    /// Whether the frame was skipped as damage-free.
    pub has_no_damage: bool,
    /// Whether required tile content was missing.
    pub contains_incomplete_tile: bool,
    /// Abort reason, if the frame was not drawn.
    pub aborted: Option<AbortReason>,
    /// Number of render passes produced (zero when skipped).
    pub pass_count: usize,
}

/// Emitted with the root-surface damage estimate for a frame.
#[derive(Clone, Copy, Debug)]
pub struct DamageEvent {
    /// Damage rect as `[x0, y0, x1, y1]` in screen pixels.
    pub root_damage: [f64; 4],
}

/// Emitted when tile budgets are enforced.
#[derive(Clone, Copy, Debug)]
pub struct TileStatsEvent {
    /// Bytes resident after enforcement.
    pub resident_bytes: u64,
    /// Bytes evicted by this enforcement pass.
    pub evicted_bytes: u64,
    /// Number of tiles left un-rasterized (checkerboard).
    pub missing_tiles: usize,
}

/// Emitted when a compositor-thread scroll is applied.
#[derive(Clone, Copy, Debug)]
pub struct ScrollEvent {
    /// Applied delta in screen pixels.
    pub applied: [f64; 2],
    /// Unconsumed delta reported as overscroll.
    pub overscroll: [f64; 2],
}

/// Emitted by the memory-stats heartbeat.
#[derive(Clone, Copy, Debug)]
pub struct MemoryStatsEvent {
    /// Bytes reported to the host (already rounded up).
    pub bytes_allocated: u64,
}

/// Receives frame-pipeline events. All methods default to no-ops.
pub trait TraceSink {
    /// A commit finished applying.
    fn on_commit(&mut self, event: &CommitEvent) {
        let _ = event;
    }

    /// A pending tree was activated.
    fn on_activation(&mut self, event: &ActivationEvent) {
        let _ = event;
    }

    /// A draw attempt resolved.
    fn on_draw_decision(&mut self, event: &DrawDecisionEvent) {
        let _ = event;
    }

    /// Root damage was computed for a frame.
    fn on_damage(&mut self, event: &DamageEvent) {
        let _ = event;
    }

    /// Tile budgets were enforced.
    fn on_tile_stats(&mut self, event: &TileStatsEvent) {
        let _ = event;
    }

    /// A scroll delta was applied on the compositor thread.
    fn on_scroll(&mut self, event: &ScrollEvent) {
        let _ = event;
    }

    /// Memory stats were reported to the host.
    fn on_memory_stats(&mut self, event: &MemoryStatsEvent) {
        let _ = event;
    }
}

/// Zero-overhead dispatch wrapper over an optional [`TraceSink`].
#[derive(Default)]
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a ()>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Tracer")
    }
}

macro_rules! tracer_event {
    ($(#[$doc:meta])* $name:ident, $sink_method:ident, $event:ty) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, event: &$event) {
            #[cfg(feature = "trace")]
            if let Some(sink) = self.sink.as_deref_mut() {
                sink.$sink_method(event);
            }
            #[cfg(not(feature = "trace"))]
            let _ = event;
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer forwarding to `sink`.
    ///
    /// With the `trace` feature disabled the sink is ignored entirely.
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            let _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that drops every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    tracer_event!(
        /// Forwards a commit event.
        commit, on_commit, CommitEvent);
    tracer_event!(
        /// Forwards an activation event.
        activation, on_activation, ActivationEvent);
    tracer_event!(
        /// Forwards a draw-decision event.
        draw_decision, on_draw_decision, DrawDecisionEvent);
    tracer_event!(
        /// Forwards a damage event.
        damage, on_damage, DamageEvent);
    tracer_event!(
        /// Forwards a tile-stats event.
        tile_stats, on_tile_stats, TileStatsEvent);
    tracer_event!(
        /// Forwards a scroll event.
        scroll, on_scroll, ScrollEvent);
    tracer_event!(
        /// Forwards a memory-stats event.
        memory_stats, on_memory_stats, MemoryStatsEvent);
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        commits: usize,
        draws: usize,
    }

    impl TraceSink for CountingSink {
        fn on_commit(&mut self, _event: &CommitEvent) {
            self.commits += 1;
        }

        fn on_draw_decision(&mut self, _event: &DrawDecisionEvent) {
            self.draws += 1;
        }
    }

    #[test]
    fn tracer_forwards_to_sink() {
        let mut sink = CountingSink::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.commit(&CommitEvent {
                source_frame_number: 1,
                layer_count: 3,
                structural_change: false,
            });
            tracer.draw_decision(&DrawDecisionEvent {
                has_no_damage: false,
                contains_incomplete_tile: false,
                aborted: None,
                pass_count: 1,
            });
            // Unimplemented events hit the default no-op.
            tracer.memory_stats(&MemoryStatsEvent { bytes_allocated: 0 });
        }
        assert_eq!(sink.commits, 1);
        assert_eq!(sink.draws, 1);
    }

    #[test]
    fn disabled_tracer_drops_events() {
        let mut tracer = Tracer::disabled();
        tracer.commit(&CommitEvent {
            source_frame_number: 0,
            layer_count: 0,
            structural_change: false,
        });
    }
}
