// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Add;

/// A unit of time on the sequencer timeline.
pub trait TimeUnit: Copy + Default {
    const SYMBOL: &'static str;
    /// Number of units in one microsecond.
    const PER_MICROSECOND: f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Microseconds;

impl TimeUnit for Microseconds {
    const SYMBOL: &'static str = "us";
    const PER_MICROSECOND: f64 = 1.0;
}

/// A point or span on the timeline, tagged with its unit.
///
/// ```rust
/// use tproc_units::duration::microseconds;
///
/// let pulse = microseconds(0.5);
/// assert_eq!(pulse.to_cycles(384.0), 192.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Duration<U: TimeUnit> {
    value: f64,
    unit: PhantomData<U>,
}

impl<U: TimeUnit> Duration<U> {
    /// Negative zero is stored as zero.
    pub const fn new(value: f64) -> Self {
        Duration {
            value: value + 0.0,
            unit: PhantomData,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Number of periods of a `clock_mhz` clock in this duration, unrounded.
    pub fn to_cycles(&self, clock_mhz: f64) -> f64 {
        self.value / U::PER_MICROSECOND * clock_mhz
    }
}

pub const fn microseconds(value: f64) -> Duration<Microseconds> {
    Duration::new(value)
}

/// Convert an integer count of native sequence units into microseconds.
///
/// `units_per_microsecond` is the number of native units in one microsecond
/// (1000 for nanosecond-resolution sequences).
pub fn native_to_microseconds(native: u64, units_per_microsecond: f64) -> Duration<Microseconds> {
    microseconds(native as f64 / units_per_microsecond)
}

// Ordered by `f64::total_cmp`, so NaN has a fixed place in the order.
impl<U: TimeUnit> PartialEq for Duration<U> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<U: TimeUnit> Eq for Duration<U> {}

impl<U: TimeUnit> PartialOrd for Duration<U> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<U: TimeUnit> Ord for Duration<U> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.total_cmp(&other.value)
    }
}

impl<U: TimeUnit> Add for Duration<U> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Duration::new(self.value + other.value)
    }
}

impl<U: TimeUnit> From<Duration<U>> for f64 {
    fn from(duration: Duration<U>) -> Self {
        duration.value
    }
}

/// Significant digits shown by `Display`.
///
/// Times summed from native units pick up noise in the last bits, which is
/// hidden so that diagnostics print `0.3 us` rather than `0.30000000000000004 us`.
const DISPLAY_DIGITS: i32 = 12;

fn round_significant(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(digits - 1 - magnitude);
    (value * scale).round() / scale
}

impl<U: TimeUnit> fmt::Display for Duration<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{} {}", self.value, U::SYMBOL)
        } else {
            write!(
                f,
                "{} {}",
                round_significant(self.value, DISPLAY_DIGITS),
                U::SYMBOL
            )
        }
    }
}
