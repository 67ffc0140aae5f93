// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use crate::{ChannelIndex, Error};

/// All channel identifiers accepted in sequence maps and overrides.
pub const VALID_CHANNELS: &[&str] = &["DAC_A", "DAC_B", "DIG_0", "DIG_1", "DIG_2", "DIG_3"];

/// DAC output reference as printed on the front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DacRef {
    A,
    B,
}

/// Index of a digital output bit, `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DigitalIndex(u8);

impl DigitalIndex {
    pub const MAX: u8 = 3;

    pub fn new(index: u8) -> Option<Self> {
        (index <= Self::MAX).then_some(DigitalIndex(index))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

/// An output channel of the sequencer.
///
/// Ordering places analog channels before digital ones; this is the order in
/// which channels are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Analog(DacRef),
    Digital(DigitalIndex),
}

impl Channel {
    /// Index of the generator (analog) or output bit (digital) on the hardware.
    pub fn hardware_index(&self) -> ChannelIndex {
        match self {
            Channel::Analog(DacRef::A) => 1,
            Channel::Analog(DacRef::B) => 0,
            Channel::Digital(index) => index.get(),
        }
    }

    pub fn is_analog(&self) -> bool {
        matches!(self, Channel::Analog(_))
    }

    pub fn is_digital(&self) -> bool {
        matches!(self, Channel::Digital(_))
    }

    /// Maximum number of fields an active pulse on this channel may carry.
    pub(crate) fn max_active_parameters(&self) -> usize {
        match self {
            Channel::Analog(_) => 4,
            Channel::Digital(_) => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Analog(DacRef::A) => write!(f, "DAC_A"),
            Channel::Analog(DacRef::B) => write!(f, "DAC_B"),
            Channel::Digital(index) => write!(f, "DIG_{}", index.get()),
        }
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channel = match s {
            "DAC_A" => Some(Channel::Analog(DacRef::A)),
            "DAC_B" => Some(Channel::Analog(DacRef::B)),
            _ => s
                .strip_prefix("DIG_")
                .filter(|index| index.len() == 1)
                .and_then(|index| index.parse::<u8>().ok())
                .and_then(DigitalIndex::new)
                .map(Channel::Digital),
        };
        channel.ok_or_else(|| Error::InvalidChannel {
            channel: s.to_string(),
            valid: VALID_CHANNELS,
        })
    }
}
