// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use anyhow::anyhow;
use tproc_units::{Duration, Microseconds};

use crate::backend::{PulseRegisters, RegisterAddress, TprocBackend};
use crate::settings::ReadoutConfig;
use crate::{ChannelIndex, Cycles};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    DeclareReadout(ReadoutConfig),
    DeclareGen {
        ch: ChannelIndex,
        nqz: u8,
    },
    SetPulseRegisters {
        ch: ChannelIndex,
        registers: PulseRegisters,
    },
    Pulse {
        ch: ChannelIndex,
        t: Cycles,
    },
    Regwi {
        register: RegisterAddress,
        value: i64,
    },
    Seti {
        output_id: u8,
        register: RegisterAddress,
        t: Cycles,
    },
    Synci(Cycles),
    Label(String),
    Loopnz {
        register: RegisterAddress,
        label: String,
    },
    WaitAll,
    End,
}

/// Backend recording every call, with simple linear conversions.
///
/// The processor clock runs at 1000 cycles per us, generator clocks at
/// `gen_cycles_per_us`. Frequencies are kept in Hz and phases in 1/100 deg.
pub(crate) struct RecordingBackend {
    pub calls: Vec<Call>,
    pub gen_cycles_per_us: f64,
    fail_on: Option<&'static str>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        RecordingBackend {
            calls: vec![],
            gen_cycles_per_us: 1000.0,
            fail_on: None,
        }
    }

    pub fn with_gen_cycles_per_us(mut self, cycles: f64) -> Self {
        self.gen_cycles_per_us = cycles;
        self
    }

    pub fn failing_on(mut self, instruction: &'static str) -> Self {
        self.fail_on = Some(instruction);
        self
    }

    fn check(&self, instruction: &str) -> anyhow::Result<()> {
        if self.fail_on == Some(instruction) {
            return Err(anyhow!("{instruction} rejected"));
        }
        Ok(())
    }

    fn record(&mut self, instruction: &str, call: Call) -> anyhow::Result<()> {
        self.check(instruction)?;
        self.calls.push(call);
        Ok(())
    }
}

impl TprocBackend for RecordingBackend {
    fn us2cycles(
        &self,
        time: Duration<Microseconds>,
        gen_ch: Option<ChannelIndex>,
    ) -> anyhow::Result<Cycles> {
        self.check("us2cycles")?;
        let factor = match gen_ch {
            Some(_) => self.gen_cycles_per_us,
            None => 1000.0,
        };
        Ok(time.to_cycles(factor).round() as Cycles)
    }

    fn freq2reg(&self, frequency: f64, _gen_ch: ChannelIndex) -> anyhow::Result<i64> {
        self.check("freq2reg")?;
        Ok(frequency.round() as i64)
    }

    fn deg2reg(&self, degrees: f64, _gen_ch: ChannelIndex) -> anyhow::Result<i64> {
        self.check("deg2reg")?;
        Ok((degrees * 100.0).round() as i64)
    }

    fn digital_output_id(&self) -> u8 {
        0
    }

    fn declare_readout(&mut self, readout: &ReadoutConfig) -> anyhow::Result<()> {
        self.record("declare_readout", Call::DeclareReadout(readout.clone()))
    }

    fn declare_gen(&mut self, ch: ChannelIndex, nqz: u8) -> anyhow::Result<()> {
        self.record("declare_gen", Call::DeclareGen { ch, nqz })
    }

    fn set_pulse_registers(
        &mut self,
        ch: ChannelIndex,
        registers: &PulseRegisters,
    ) -> anyhow::Result<()> {
        self.record(
            "set_pulse_registers",
            Call::SetPulseRegisters {
                ch,
                registers: *registers,
            },
        )
    }

    fn pulse(&mut self, ch: ChannelIndex, t: Cycles) -> anyhow::Result<()> {
        self.record("pulse", Call::Pulse { ch, t })
    }

    fn regwi(&mut self, register: RegisterAddress, value: i64) -> anyhow::Result<()> {
        self.record("regwi", Call::Regwi { register, value })
    }

    fn seti(
        &mut self,
        output_id: u8,
        register: RegisterAddress,
        t: Cycles,
    ) -> anyhow::Result<()> {
        self.record(
            "seti",
            Call::Seti {
                output_id,
                register,
                t,
            },
        )
    }

    fn synci(&mut self, t: Cycles) -> anyhow::Result<()> {
        self.record("synci", Call::Synci(t))
    }

    fn label(&mut self, name: &str) -> anyhow::Result<()> {
        self.record("label", Call::Label(name.to_string()))
    }

    fn loopnz(&mut self, register: RegisterAddress, label: &str) -> anyhow::Result<()> {
        self.record(
            "loopnz",
            Call::Loopnz {
                register,
                label: label.to_string(),
            },
        )
    }

    fn wait_all(&mut self) -> anyhow::Result<()> {
        self.record("wait_all", Call::WaitAll)
    }

    fn end(&mut self) -> anyhow::Result<()> {
        self.record("end", Call::End)
    }
}
