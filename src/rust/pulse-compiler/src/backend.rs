// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! The interface between the sequence compiler and the code emitting runtime.
use serde::{Deserialize, Serialize};
use std::fmt;

use tproc_units::{Duration, Microseconds};

use crate::settings::ReadoutConfig;
use crate::{ChannelIndex, Cycles, Error, Result};

/// A tProcessor register, addressed by page and index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegisterAddress {
    pub page: u8,
    pub register: u8,
}

impl RegisterAddress {
    pub const fn new(page: u8, register: u8) -> Self {
        RegisterAddress { page, register }
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, ${}", self.page, self.register)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseStyle {
    Const,
}

impl fmt::Display for PulseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PulseStyle::Const => write!(f, "const"),
        }
    }
}

/// Generator register values for one DAC pulse, already in register units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PulseRegisters {
    pub gain: i64,
    pub freq: i64,
    pub phase: i64,
    pub style: PulseStyle,
    pub length: Cycles,
}

/// Primitives of the tProcessor program builder.
///
/// Conversions are channel aware: `gen_ch` selects the clock domain of a
/// generator, `None` the tProcessor clock. Every method may reject its
/// arguments; the compiler surfaces such errors unchanged.
pub trait TprocBackend {
    fn us2cycles(
        &self,
        time: Duration<Microseconds>,
        gen_ch: Option<ChannelIndex>,
    ) -> anyhow::Result<Cycles>;

    /// Convert a frequency in Hz into the generator's frequency register value.
    fn freq2reg(&self, frequency: f64, gen_ch: ChannelIndex) -> anyhow::Result<i64>;

    /// Convert a phase in degrees into the generator's phase register value.
    fn deg2reg(&self, degrees: f64, gen_ch: ChannelIndex) -> anyhow::Result<i64>;

    /// Output id of the digital output port.
    fn digital_output_id(&self) -> u8;

    fn declare_readout(&mut self, readout: &ReadoutConfig) -> anyhow::Result<()>;

    fn declare_gen(&mut self, ch: ChannelIndex, nqz: u8) -> anyhow::Result<()>;

    fn set_pulse_registers(
        &mut self,
        ch: ChannelIndex,
        registers: &PulseRegisters,
    ) -> anyhow::Result<()>;

    fn pulse(&mut self, ch: ChannelIndex, t: Cycles) -> anyhow::Result<()>;

    /// Write an immediate value into a register.
    fn regwi(&mut self, register: RegisterAddress, value: i64) -> anyhow::Result<()>;

    /// Set output `output_id` to the value of `register` at time `t`.
    fn seti(&mut self, output_id: u8, register: RegisterAddress, t: Cycles)
    -> anyhow::Result<()>;

    fn synci(&mut self, t: Cycles) -> anyhow::Result<()>;

    fn label(&mut self, name: &str) -> anyhow::Result<()>;

    /// Decrement `register` and jump to `label` while it is non-zero.
    fn loopnz(&mut self, register: RegisterAddress, label: &str) -> anyhow::Result<()>;

    fn wait_all(&mut self) -> anyhow::Result<()>;

    fn end(&mut self) -> anyhow::Result<()>;
}

/// Surface a failed backend call as a compiler error.
pub(crate) fn backend_call<T>(instruction: &'static str, result: anyhow::Result<T>) -> Result<T> {
    result.map_err(|source| Error::BackendRejection {
        instruction,
        source,
    })
}
