// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them
//! back as an iterator of [`RecordedEvent`].

use stratum_core::time::HostTime;
use stratum_core::trace::{
    AbortReason, ActivationEvent, CommitEvent, DamageEvent, DrawDecisionEvent, MemoryStatsEvent,
    ScrollEvent, TileStatsEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_COMMIT: u8 = 1;
const TAG_ACTIVATION: u8 = 2;
const TAG_DRAW_DECISION: u8 = 3;
const TAG_DAMAGE: u8 = 4;
const TAG_TILE_STATS: u8 = 5;
const TAG_SCROLL: u8 = 6;
const TAG_MEMORY_STATS: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers ---------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_abort(&mut self, v: Option<AbortReason>) {
        self.write_u8(match v {
            None => 0,
            Some(AbortReason::CantDraw) => 1,
            Some(AbortReason::CheckerboardAnimation) => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_commit(&mut self, e: &CommitEvent) {
        self.write_u8(TAG_COMMIT);
        self.write_u64(e.source_frame_number);
        self.write_u64(e.layer_count as u64);
        self.write_bool(e.structural_change);
    }

    fn on_activation(&mut self, e: &ActivationEvent) {
        self.write_u8(TAG_ACTIVATION);
        self.write_u64(e.source_frame_number);
        self.write_u64(e.at.ticks());
    }

    fn on_draw_decision(&mut self, e: &DrawDecisionEvent) {
        self.write_u8(TAG_DRAW_DECISION);
        self.write_bool(e.has_no_damage);
        self.write_bool(e.contains_incomplete_tile);
        self.write_abort(e.aborted);
        self.write_u64(e.pass_count as u64);
    }

    fn on_damage(&mut self, e: &DamageEvent) {
        self.write_u8(TAG_DAMAGE);
        for v in e.root_damage {
            self.write_f64(v);
        }
    }

    fn on_tile_stats(&mut self, e: &TileStatsEvent) {
        self.write_u8(TAG_TILE_STATS);
        self.write_u64(e.resident_bytes);
        self.write_u64(e.evicted_bytes);
        self.write_u64(e.missing_tiles as u64);
    }

    fn on_scroll(&mut self, e: &ScrollEvent) {
        self.write_u8(TAG_SCROLL);
        for v in e.applied {
            self.write_f64(v);
        }
        for v in e.overscroll {
            self.write_f64(v);
        }
    }

    fn on_memory_stats(&mut self, e: &MemoryStatsEvent) {
        self.write_u8(TAG_MEMORY_STATS);
        self.write_u64(e.bytes_allocated);
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A decoded trace event.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A commit finished applying.
    Commit(CommitEvent),
    /// A pending tree was activated.
    Activation(ActivationEvent),
    /// A draw attempt resolved.
    DrawDecision(DrawDecisionEvent),
    /// Root damage for a frame.
    Damage(DamageEvent),
    /// Tile budget enforcement ran.
    TileStats(TileStatsEvent),
    /// A compositor-thread scroll was applied.
    Scroll(ScrollEvent),
    /// Memory stats were reported.
    MemoryStats(MemoryStatsEvent),
}

/// Iterates over the events in a recorded buffer.
///
/// Decoding stops at the first truncated or unknown record.
#[must_use]
pub fn decode(bytes: &[u8]) -> Decoder<'_> {
    Decoder { bytes, pos: 0 }
}

/// Iterator returned by [`decode`].
#[derive(Debug)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn read_u8(&mut self) -> Option<u8> {
        let v = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        let slice = self.bytes.get(self.pos..self.pos + 8)?;
        self.pos += 8;
        Some(u64::from_le_bytes(slice.try_into().ok()?))
    }

    fn read_f64(&mut self) -> Option<f64> {
        let slice = self.bytes.get(self.pos..self.pos + 8)?;
        self.pos += 8;
        Some(f64::from_le_bytes(slice.try_into().ok()?))
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_abort(&mut self) -> Option<Option<AbortReason>> {
        Some(match self.read_u8()? {
            1 => Some(AbortReason::CantDraw),
            2 => Some(AbortReason::CheckerboardAnimation),
            _ => None,
        })
    }
}

impl Iterator for Decoder<'_> {
    type Item = RecordedEvent;

    #[expect(
        clippy::cast_possible_truncation,
        reason = "counts were usize when encoded"
    )]
    fn next(&mut self) -> Option<RecordedEvent> {
        let tag = self.read_u8()?;
        match tag {
            TAG_COMMIT => Some(RecordedEvent::Commit(CommitEvent {
                source_frame_number: self.read_u64()?,
                layer_count: self.read_u64()? as usize,
                structural_change: self.read_bool()?,
            })),
            TAG_ACTIVATION => Some(RecordedEvent::Activation(ActivationEvent {
                source_frame_number: self.read_u64()?,
                at: HostTime(self.read_u64()?),
            })),
            TAG_DRAW_DECISION => Some(RecordedEvent::DrawDecision(DrawDecisionEvent {
                has_no_damage: self.read_bool()?,
                contains_incomplete_tile: self.read_bool()?,
                aborted: self.read_abort()?,
                pass_count: self.read_u64()? as usize,
            })),
            TAG_DAMAGE => Some(RecordedEvent::Damage(DamageEvent {
                root_damage: [
                    self.read_f64()?,
                    self.read_f64()?,
                    self.read_f64()?,
                    self.read_f64()?,
                ],
            })),
            TAG_TILE_STATS => Some(RecordedEvent::TileStats(TileStatsEvent {
                resident_bytes: self.read_u64()?,
                evicted_bytes: self.read_u64()?,
                missing_tiles: self.read_u64()? as usize,
            })),
            TAG_SCROLL => Some(RecordedEvent::Scroll(ScrollEvent {
                applied: [self.read_f64()?, self.read_f64()?],
                overscroll: [self.read_f64()?, self.read_f64()?],
            })),
            TAG_MEMORY_STATS => Some(RecordedEvent::MemoryStats(MemoryStatsEvent {
                bytes_allocated: self.read_u64()?,
            })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_event_kind() {
        let mut sink = RecorderSink::new();
        sink.on_commit(&CommitEvent {
            source_frame_number: 3,
            layer_count: 12,
            structural_change: true,
        });
        sink.on_activation(&ActivationEvent {
            source_frame_number: 3,
            at: HostTime(1_000),
        });
        sink.on_draw_decision(&DrawDecisionEvent {
            has_no_damage: false,
            contains_incomplete_tile: true,
            aborted: Some(AbortReason::CheckerboardAnimation),
            pass_count: 2,
        });
        sink.on_damage(&DamageEvent {
            root_damage: [0.0, 0.0, 10.0, 10.0],
        });
        sink.on_tile_stats(&TileStatsEvent {
            resident_bytes: 4096,
            evicted_bytes: 1024,
            missing_tiles: 5,
        });
        sink.on_scroll(&ScrollEvent {
            applied: [0.0, 30.0],
            overscroll: [0.0, 5.0],
        });
        sink.on_memory_stats(&MemoryStatsEvent {
            bytes_allocated: 8 * 1024 * 1024,
        });

        let events: Vec<RecordedEvent> = decode(sink.as_bytes()).collect();
        assert_eq!(events.len(), 7);

        match events[0] {
            RecordedEvent::Commit(e) => {
                assert_eq!(e.source_frame_number, 3);
                assert_eq!(e.layer_count, 12);
                assert!(e.structural_change);
            }
            ref other => panic!("expected commit, got {other:?}"),
        }
        match events[2] {
            RecordedEvent::DrawDecision(e) => {
                assert_eq!(e.aborted, Some(AbortReason::CheckerboardAnimation));
                assert_eq!(e.pass_count, 2);
            }
            ref other => panic!("expected draw decision, got {other:?}"),
        }
        match events[5] {
            RecordedEvent::Scroll(e) => {
                assert_eq!(e.applied, [0.0, 30.0]);
                assert_eq!(e.overscroll, [0.0, 5.0]);
            }
            ref other => panic!("expected scroll, got {other:?}"),
        }
    }

    #[test]
    fn truncated_buffer_stops_cleanly() {
        let mut sink = RecorderSink::new();
        sink.on_memory_stats(&MemoryStatsEvent {
            bytes_allocated: 42,
        });
        let bytes = sink.into_bytes();
        // Chop off the last byte of the payload.
        let events: Vec<RecordedEvent> = decode(&bytes[..bytes.len() - 1]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        assert!(decode(&[]).next().is_none());
    }
}
