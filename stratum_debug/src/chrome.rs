// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes [Chrome
//! Trace Event Format][spec] JSON to the given writer, suitable for
//! `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use stratum_core::time::{HostTime, Timebase};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// Activation timestamps convert through `timebase`; events without a
/// recorded time use their sequence position (one microsecond apart) so
/// ordering survives into the viewer.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for (sequence, recorded) in decode(bytes).enumerate() {
        let sequence_us = u64::try_from(sequence).unwrap_or(u64::MAX);
        match recorded {
            RecordedEvent::Commit(e) => {
                events.push(instant(
                    "Commit",
                    "Commit",
                    sequence_us,
                    json!({
                        "source_frame_number": e.source_frame_number,
                        "layer_count": e.layer_count,
                        "structural_change": e.structural_change,
                    }),
                ));
            }
            RecordedEvent::Activation(e) => {
                events.push(instant(
                    "ActivatePendingTree",
                    "Commit",
                    ticks_to_us(e.at, timebase),
                    json!({
                        "source_frame_number": e.source_frame_number,
                    }),
                ));
            }
            RecordedEvent::DrawDecision(e) => {
                events.push(instant(
                    "DrawDecision",
                    "Draw",
                    sequence_us,
                    json!({
                        "has_no_damage": e.has_no_damage,
                        "contains_incomplete_tile": e.contains_incomplete_tile,
                        "aborted": e.aborted.map(|reason| format!("{reason:?}")),
                        "pass_count": e.pass_count,
                    }),
                ));
            }
            RecordedEvent::Damage(e) => {
                events.push(instant(
                    "RootDamage",
                    "Draw",
                    sequence_us,
                    json!({ "rect": e.root_damage }),
                ));
            }
            RecordedEvent::TileStats(e) => {
                events.push(instant(
                    "ManageTiles",
                    "Tiles",
                    sequence_us,
                    json!({
                        "resident_bytes": e.resident_bytes,
                        "evicted_bytes": e.evicted_bytes,
                        "missing_tiles": e.missing_tiles,
                    }),
                ));
            }
            RecordedEvent::Scroll(e) => {
                events.push(instant(
                    "ScrollBy",
                    "Input",
                    sequence_us,
                    json!({
                        "applied": e.applied,
                        "overscroll": e.overscroll,
                    }),
                ));
            }
            RecordedEvent::MemoryStats(e) => {
                events.push(instant(
                    "ManagedMemoryStats",
                    "Memory",
                    sequence_us,
                    json!({ "bytes_allocated": e.bytes_allocated }),
                ));
            }
        }
    }

    serde_json::to_writer(&mut *writer, &Value::Array(events))
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    writer.flush()
}

fn instant(name: &str, category: &str, ts_us: u64, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": category,
        "ts": ts_us,
        "pid": 0,
        "tid": 0,
        "s": "g",
        "args": args,
    })
}

fn ticks_to_us(t: HostTime, timebase: Timebase) -> u64 {
    t.to_nanos(timebase) / 1000
}

#[cfg(test)]
mod tests {
    use stratum_core::trace::{CommitEvent, MemoryStatsEvent, TraceSink};

    use crate::recorder::RecorderSink;

    use super::*;

    #[test]
    fn export_produces_valid_json_array() {
        let mut sink = RecorderSink::new();
        sink.on_commit(&CommitEvent {
            source_frame_number: 1,
            layer_count: 4,
            structural_change: false,
        });
        sink.on_memory_stats(&MemoryStatsEvent {
            bytes_allocated: 8 * 1024 * 1024,
        });

        let mut out = Vec::new();
        export(sink.as_bytes(), Timebase::NANOS, &mut out).expect("export succeeds");
        let parsed: Value = serde_json::from_slice(&out).expect("valid JSON");
        let array = parsed.as_array().expect("top level is an array");
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["name"], "Commit");
        assert_eq!(array[0]["args"]["layer_count"], 4);
        assert_eq!(array[1]["name"], "ManagedMemoryStats");
    }

    #[test]
    fn empty_recording_exports_empty_array() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).expect("export succeeds");
        assert_eq!(out, b"[]");
    }
}
