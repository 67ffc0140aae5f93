// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Module for defining settings for the sequence compiler.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::RegisterAddress;
use crate::{ChannelIndex, Cycles, Error, Result};

/// Largest gain magnitude the DAC generators accept.
pub const GAIN_CEILING: f64 = 30000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SanitizationChange {
    pub field: &'static str,
    pub original: String,
    pub sanitized: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadoutSelection {
    Product,
    Dds,
    #[default]
    Input,
}

impl fmt::Display for ReadoutSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadoutSelection::Product => write!(f, "product"),
            ReadoutSelection::Dds => write!(f, "dds"),
            ReadoutSelection::Input => write!(f, "input"),
        }
    }
}

/// ADC readout declared ahead of the pulse program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadoutConfig {
    pub channel: ChannelIndex,
    /// Integration length in readout clock cycles.
    pub length: Cycles,
    /// Down-conversion frequency in MHz.
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub selection: ReadoutSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    pub default_gain: f64,
    pub default_delay: Cycles,
    pub max_gain: f64,
    /// Native sequence time units per microsecond.
    pub time_units_per_us: f64,
    /// Factor converting native frequency values to Hz.
    pub frequency_scale: f64,
    /// Cycles given to the processor to configure pulses before the loop.
    pub settle_cycles: Cycles,
    pub nyquist_zone: u8,
    pub loop_register: RegisterAddress,
    pub output_register: RegisterAddress,
    pub loop_label: String,
    pub readout: Option<ReadoutConfig>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        CompilerSettings {
            default_gain: 10000.0,
            default_delay: 0,
            max_gain: GAIN_CEILING,
            time_units_per_us: 1e3,
            frequency_scale: 1e3,
            settle_cycles: 200,
            nyquist_zone: 1,
            loop_register: RegisterAddress::new(0, 14),
            output_register: RegisterAddress::new(0, 31),
            loop_label: "LOOP_I".to_string(),
            readout: None,
        }
    }
}

impl CompilerSettings {
    /// Bring the settings into a consistent state.
    ///
    /// Values that can be corrected are clamped and reported; values that
    /// cannot be interpreted at all are an error.
    pub fn sanitize(&mut self) -> Result<Vec<SanitizationChange>> {
        if !(self.time_units_per_us.is_finite() && self.time_units_per_us > 0.0) {
            return Err(Error::new(&format!(
                "Expected `time_units_per_us` to be a positive number, got {}",
                self.time_units_per_us
            )));
        }
        if !(self.frequency_scale.is_finite() && self.frequency_scale > 0.0) {
            return Err(Error::new(&format!(
                "Expected `frequency_scale` to be a positive number, got {}",
                self.frequency_scale
            )));
        }
        if self.settle_cycles < 0 {
            return Err(Error::new(&format!(
                "Expected `settle_cycles` to be non-negative, got {}",
                self.settle_cycles
            )));
        }
        if self.loop_register == self.output_register {
            return Err(Error::new(&format!(
                "Loop counter and digital output share register {}",
                self.loop_register
            )));
        }
        let mut changes = vec![];
        if !(self.max_gain.is_finite() && self.max_gain.abs() <= GAIN_CEILING) {
            changes.push(SanitizationChange {
                field: "max_gain",
                original: self.max_gain.to_string(),
                sanitized: GAIN_CEILING.to_string(),
                reason: format!("Magnitude above the generator ceiling of {GAIN_CEILING}."),
            });
            self.max_gain = GAIN_CEILING;
        }
        self.max_gain = self.max_gain.abs();
        if self.default_gain.abs() > self.max_gain {
            let sanitized = self.max_gain.copysign(self.default_gain);
            changes.push(SanitizationChange {
                field: "default_gain",
                original: self.default_gain.to_string(),
                sanitized: sanitized.to_string(),
                reason: format!("Magnitude above `max_gain` of {}.", self.max_gain),
            });
            self.default_gain = sanitized;
        }
        Ok(changes)
    }
}
