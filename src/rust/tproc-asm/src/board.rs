// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

/// Clocks and resource limits of an RFSoC board running the tProcessor firmware.
#[derive(Debug)]
pub struct BoardTraits {
    pub type_str: &'static str,
    /// tProcessor clock; times without a generator are counted in these cycles.
    pub tproc_clock_mhz: f64,
    /// Fabric clock of the signal generators.
    pub generator_clock_mhz: f64,
    pub dac_sample_rate_mhz: f64,
    pub generator_count: u8,
    pub readout_count: u8,
    pub frequency_register_bits: u32,
    pub max_gain: i64,
    /// Output id of the trigger and PMOD port.
    pub trigger_output: u8,
    pub register_pages: u8,
    pub registers_per_page: u8,
}

impl BoardTraits {
    /// Largest absolute frequency a generator can synthesize, in Hz.
    pub fn max_frequency_hz(&self) -> f64 {
        self.dac_sample_rate_mhz * 1e6
    }
}

pub const ZCU111_TRAITS: BoardTraits = BoardTraits {
    type_str: "ZCU111",
    tproc_clock_mhz: 384.0,
    generator_clock_mhz: 384.0,
    dac_sample_rate_mhz: 6144.0,
    generator_count: 7,
    readout_count: 2,
    frequency_register_bits: 32,
    max_gain: 32766,
    trigger_output: 4,
    register_pages: 8,
    registers_per_page: 32,
};

pub const ZCU216_TRAITS: BoardTraits = BoardTraits {
    type_str: "ZCU216",
    tproc_clock_mhz: 430.08,
    generator_clock_mhz: 430.08,
    dac_sample_rate_mhz: 6881.28,
    generator_count: 7,
    readout_count: 2,
    frequency_register_bits: 32,
    max_gain: 32766,
    trigger_output: 4,
    register_pages: 8,
    registers_per_page: 32,
};

pub const RFSOC4X2_TRAITS: BoardTraits = BoardTraits {
    type_str: "RFSoC4x2",
    tproc_clock_mhz: 409.6,
    generator_clock_mhz: 614.4,
    dac_sample_rate_mhz: 9830.4,
    generator_count: 2,
    readout_count: 2,
    frequency_register_bits: 32,
    max_gain: 32766,
    trigger_output: 4,
    register_pages: 8,
    registers_per_page: 32,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoardKind {
    Zcu111,
    Zcu216,
    #[default]
    Rfsoc4x2,
}

impl BoardKind {
    pub fn traits(&self) -> &'static BoardTraits {
        match self {
            BoardKind::Zcu111 => &ZCU111_TRAITS,
            BoardKind::Zcu216 => &ZCU216_TRAITS,
            BoardKind::Rfsoc4x2 => &RFSOC4X2_TRAITS,
        }
    }
}

impl fmt::Display for BoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.traits().type_str)
    }
}

impl FromStr for BoardKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ZCU111" => Ok(BoardKind::Zcu111),
            "ZCU216" => Ok(BoardKind::Zcu216),
            "RFSOC4X2" => Ok(BoardKind::Rfsoc4x2),
            _ => Err(anyhow!("Unsupported board: {s}")),
        }
    }
}
