// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use crate::ChannelIndex;

/// Measured phase offsets of the DAC outputs, per frequency.
///
/// The offset is added to the requested pulse phase so that both DACs are in
/// phase at the sample. Frequencies without an entry contribute no offset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseCalibration {
    // Keyed by the bit pattern of the frequency in Hz.
    offsets: BTreeMap<(u64, ChannelIndex), f64>,
}

impl PhaseCalibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frequency: f64, dac: ChannelIndex, offset_degrees: f64) {
        self.offsets
            .insert((normalize_frequency(frequency).to_bits(), dac), offset_degrees);
    }

    pub fn with_offset(mut self, frequency: f64, dac: ChannelIndex, offset_degrees: f64) -> Self {
        self.insert(frequency, dac, offset_degrees);
        self
    }

    /// Offset in degrees for a pulse at `frequency` (Hz) on generator `dac`.
    pub fn offset(&self, frequency: f64, dac: ChannelIndex) -> f64 {
        self.offsets
            .get(&(normalize_frequency(frequency).to_bits(), dac))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

fn normalize_frequency(frequency: f64) -> f64 {
    // -0.0 and 0.0 must share a key
    if frequency == 0.0 { 0.0 } else { frequency }
}
