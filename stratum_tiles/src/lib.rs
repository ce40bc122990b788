// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile rasterization bookkeeping and memory budget enforcement.
//!
//! This crate owns the resource-accounting half of the frame pipeline:
//!
//! **[`pool`]** — [`ResourcePool`](pool::ResourcePool), the single
//! byte-accounting table for every GPU/CPU resource (tile textures and
//! UI resources alike). Only budget enforcement frees entries; nothing
//! else in the pipeline deletes resources directly.
//!
//! **[`tiling`]** — Per-layer tile grids. Each tile tracks its raster
//! state and a priority bin assigned from viewport distance.
//!
//! **[`manager`]** — [`TileManager`](manager::TileManager): applies the
//! effective [`ManagedMemoryPolicy`], evicts lowest-priority-first when
//! over budget, schedules raster work for missing tiles under the
//! cutoff, and reports which content must checkerboard.
//!
//! **[`ui`]** — Compositor-owned bitmap resources, independently
//! evictable from tile content; dropped wholesale on context loss.
//!
//! Budget exhaustion is never an error here: the manager degrades to
//! checkerboard tiles and flags the condition upward.
//!
//! [`ManagedMemoryPolicy`]: stratum_core::policy::ManagedMemoryPolicy

pub mod manager;
pub mod pool;
pub mod tiling;
pub mod ui;
