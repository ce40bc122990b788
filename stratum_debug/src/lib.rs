// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostics for the stratum frame pipeline.
//!
//! **[`recorder`]** — [`RecorderSink`](recorder::RecorderSink) encodes
//! trace events into a compact binary buffer; [`decode`](recorder::decode)
//! reads them back.
//!
//! **[`chrome`]** — exports recorded events as Chrome Trace Event Format
//! JSON for `chrome://tracing` / Perfetto.
//!
//! **[`pretty`]** — one-line-per-event trace printing and a render-pass
//! DAG dump for debugging assembled frames.

pub mod chrome;
pub mod pretty;
pub mod recorder;
