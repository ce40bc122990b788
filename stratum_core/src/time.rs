// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time, decoupled from the platform clock.
//!
//! The frame pipeline never reads an OS timer directly. Everything that
//! needs "now" receives it from a [`TimeSource`], so single-threaded test
//! and emulation configurations can drive the compositor with a manually
//! advanced clock ([`ManualTimeSource`]).
//!
//! [`HostTime`] is a point in time in platform-native monotonic ticks;
//! [`Duration`] is a distance between two such points. [`Timebase`]
//! carries the rational ticks→nanoseconds factor for exporters.

use core::fmt;
use core::ops::{Add, Sub};

/// A point in time expressed as platform-native monotonic ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Converts to nanoseconds using the given timebase.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn to_nanos(self, timebase: Timebase) -> u64 {
        (self.0 as u128 * timebase.numer as u128 / timebase.denom as u128) as u64
    }

    /// Returns the duration since an earlier time, or zero if `earlier`
    /// is actually later.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// A span of host time, in the same tick units as [`HostTime`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// Zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Returns the raw tick count.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}

/// Rational conversion factor from host ticks to nanoseconds.
///
/// Mirrors the `mach_timebase_info` shape: `nanos = ticks * numer / denom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the ticks→nanoseconds factor.
    pub numer: u32,
    /// Denominator of the ticks→nanoseconds factor.
    pub denom: u32,
}

impl Timebase {
    /// Identity timebase: one tick is one nanosecond.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };
}

/// Supplies the current host time to the frame pipeline.
pub trait TimeSource {
    /// Returns the current monotonic host time.
    fn now(&self) -> HostTime;
}

/// A [`TimeSource`] advanced explicitly by the caller.
///
/// Used by tests and single-threaded emulation modes, where the pipeline
/// must be stepped deterministically rather than paced by a real timer.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: core::cell::Cell<u64>,
}

impl ManualTimeSource {
    /// Creates a source starting at tick zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `d`.
    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get() + d.0);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> HostTime {
        HostTime(self.now.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_duration_never_underflows() {
        let a = HostTime(100);
        let b = HostTime(300);
        assert_eq!(b.saturating_duration_since(a), Duration(200));
        assert_eq!(a.saturating_duration_since(b), Duration(0));
    }

    #[test]
    fn timebase_conversion() {
        let tb = Timebase { numer: 125, denom: 3 };
        assert_eq!(HostTime(24).to_nanos(tb), 1000);
        assert_eq!(HostTime(24).to_nanos(Timebase::NANOS), 24);
    }

    #[test]
    fn manual_source_advances() {
        let src = ManualTimeSource::new();
        assert_eq!(src.now(), HostTime(0));
        src.advance(Duration(16));
        src.advance(Duration(4));
        assert_eq!(src.now(), HostTime(20));
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(HostTime(u64::MAX).checked_add(Duration(1)), None);
        assert_eq!(HostTime(5).checked_add(Duration(7)), Some(HostTime(12)));
    }
}
