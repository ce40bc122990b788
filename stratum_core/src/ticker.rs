// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Periodic tick delivery and impl-thread identity.
//!
//! [`FrameTicker`] turns a monotonic clock into discrete frame
//! opportunities without touching a platform timer: the owner polls it
//! with the current [`HostTime`] and gets back at most one tick per
//! configured interval. The active flag mirrors whether the underlying
//! periodic source is running, so background ticking (animations while
//! not drawing) can be started and stopped cheaply.
//!
//! [`ThreadAffinity`] carries the compositor-thread role for assertion
//! purposes. On a real two-thread configuration the impl role is entered
//! once by the compositor thread's run loop; single-threaded
//! configurations construct the permanently entered form so the same
//! `debug_assert!`s hold without a second thread existing.

use crate::time::{Duration, HostTime};

/// Configuration for [`FrameTicker`].
#[derive(Clone, Copy, Debug)]
pub struct TickConfig {
    /// Interval between delivered ticks, in host ticks.
    pub interval: Duration,
}

impl TickConfig {
    /// A 60 Hz interval at one-nanosecond tick resolution.
    #[must_use]
    pub const fn sixty_hz() -> Self {
        Self {
            interval: Duration(16_666_667),
        }
    }
}

/// A single delivered tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Host time the tick fired at.
    pub now: HostTime,
    /// The configured interval, for animation stepping.
    pub interval: Duration,
}

/// Periodic tick source decoupled from the platform timer.
#[derive(Debug)]
pub struct FrameTicker {
    config: TickConfig,
    active: bool,
    last_tick: Option<HostTime>,
}

impl FrameTicker {
    /// Creates an inactive ticker.
    #[must_use]
    pub fn new(config: TickConfig) -> Self {
        Self {
            config,
            active: false,
            last_tick: None,
        }
    }

    /// Returns whether the ticker is currently delivering ticks.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Starts or stops tick delivery.
    ///
    /// Stopping clears the phase, so a restarted ticker fires on its next
    /// poll rather than waiting out the remainder of an old interval.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        if !active {
            self.last_tick = None;
        }
    }

    /// Polls the ticker; returns a [`Tick`] if one is due at `now`.
    ///
    /// The first poll after activation always fires. Subsequent ticks
    /// fire once `interval` has elapsed since the previous one; a poll
    /// arriving late does not produce catch-up ticks.
    pub fn poll(&mut self, now: HostTime) -> Option<Tick> {
        if !self.active {
            return None;
        }
        let due = match self.last_tick {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.config.interval,
        };
        if !due {
            return None;
        }
        self.last_tick = Some(now);
        Some(Tick {
            now,
            interval: self.config.interval,
        })
    }
}

/// Compositor-thread role tracking for affinity assertions.
///
/// All tree, tile, and pass state is owned by the impl-thread role;
/// [`assert_impl`](Self::assert_impl) documents and (in debug builds)
/// enforces that entry points are only reached under that role.
#[derive(Debug)]
pub struct ThreadAffinity {
    impl_role_entered: bool,
}

impl ThreadAffinity {
    /// Affinity for a dedicated compositor thread: the role must be
    /// entered explicitly by that thread's run loop.
    #[must_use]
    pub fn threaded() -> Self {
        Self {
            impl_role_entered: false,
        }
    }

    /// Affinity for single-threaded configurations: the one thread
    /// permanently holds the impl role.
    #[must_use]
    pub fn single_threaded() -> Self {
        Self {
            impl_role_entered: true,
        }
    }

    /// Enters the impl role for the duration of the returned guard.
    pub fn enter_impl(&mut self) -> ImplRoleGuard<'_> {
        let was_entered = self.impl_role_entered;
        self.impl_role_entered = true;
        ImplRoleGuard {
            affinity: self,
            was_entered,
        }
    }

    /// Debug-asserts that the impl role is currently held.
    pub fn assert_impl(&self) {
        debug_assert!(
            self.impl_role_entered,
            "entry point reached outside the compositor-thread role"
        );
    }

    /// Returns whether the impl role is currently held.
    #[must_use]
    pub fn is_impl(&self) -> bool {
        self.impl_role_entered
    }
}

/// Guard returned by [`ThreadAffinity::enter_impl`]; restores the prior
/// state on drop.
#[derive(Debug)]
pub struct ImplRoleGuard<'a> {
    affinity: &'a mut ThreadAffinity,
    was_entered: bool,
}

impl Drop for ImplRoleGuard<'_> {
    fn drop(&mut self) {
        self.affinity.impl_role_entered = self.was_entered;
    }
}
