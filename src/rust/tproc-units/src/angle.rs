// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::num::Wrapping;

use num_traits::ToPrimitive;

/// One full turn in units of the 32-bit phase word.
const TURN: f64 = 4_294_967_296.0;

/// A phase as a 32-bit two's complement word, one turn spanning the whole range.
///
/// Angles differing by whole turns map to the same word.
///
/// ```rust
/// use tproc_units::Angle32;
///
/// assert_eq!(Angle32::from_degrees(450.0), Angle32::from_degrees(90.0));
/// assert_eq!(Angle32::from_degrees(-90.0).to_register(), 3 << 30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Angle32(Wrapping<i32>);

impl Angle32 {
    /// Nearest phase word to `degrees`. Non-finite input gives zero.
    pub fn from_degrees(degrees: impl ToPrimitive) -> Self {
        let turns = degrees.to_f64().unwrap_or(0.0) / 360.0;
        if !turns.is_finite() {
            return Self::default();
        }
        let fraction = turns - turns.round();
        // +-0.5 turns both land on i32::MIN after the truncating cast
        let word = (fraction * TURN).round() as i64;
        Angle32(Wrapping(word as i32))
    }

    /// Signed word, [-180, 180) degrees.
    pub const fn to_raw(self) -> i32 {
        self.0.0
    }

    /// Unsigned register image of the word, [0, 360) degrees.
    pub const fn to_register(self) -> u32 {
        self.0.0 as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_turns() {
        assert_eq!(Angle32::from_degrees(0.0).to_raw(), 0);
        assert_eq!(Angle32::from_degrees(90.0).to_raw(), 1 << 30);
        assert_eq!(Angle32::from_degrees(-90.0).to_raw(), -(1 << 30));
        assert_eq!(Angle32::from_degrees(-90.0).to_register(), 3 << 30);
        assert_eq!(Angle32::from_degrees(90).to_raw(), 1 << 30);
    }

    #[test]
    fn test_half_turn_boundary() {
        assert_eq!(Angle32::from_degrees(180.0).to_raw(), i32::MIN);
        assert_eq!(Angle32::from_degrees(-180.0).to_raw(), i32::MIN);
        assert_eq!(Angle32::from_degrees(540.0).to_register(), 1 << 31);
    }

    #[test]
    fn test_whole_turns_fold() {
        assert_eq!(Angle32::from_degrees(450.0), Angle32::from_degrees(90.0));
        assert_eq!(Angle32::from_degrees(370.0), Angle32::from_degrees(10.0));
        assert_eq!(Angle32::from_degrees(-720.0), Angle32::default());
    }

    #[test]
    fn test_nearest_word() {
        // One word step is 360 / 2^32 degrees
        let step = 360.0 / TURN;
        assert_eq!(Angle32::from_degrees(step).to_raw(), 1);
        assert_eq!(Angle32::from_degrees(0.4 * step).to_raw(), 0);
        assert_eq!(Angle32::from_degrees(-0.6 * step).to_raw(), -1);
        assert_eq!(Angle32::from_degrees(45.0).to_register(), 1 << 29);
    }

    #[test]
    fn test_non_finite_is_zero() {
        assert_eq!(Angle32::from_degrees(f64::NAN), Angle32::default());
        assert_eq!(Angle32::from_degrees(f64::INFINITY), Angle32::default());
    }
}
