// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeSet, HashSet};

use anyhow::{Context, anyhow, bail};
use pulse_compiler::{
    ChannelIndex, Cycles, PulseRegisters, ReadoutConfig, RegisterAddress, TprocBackend,
};
use tproc_units::{Angle32, Duration, Microseconds};

use crate::Result;
use crate::asm_statements::AsmStatement;
use crate::board::BoardTraits;

/// A [`TprocBackend`] that records a tProcessor program for one board.
///
/// Every statement is checked against the board's resources when it is
/// added; a rejected statement leaves the program unchanged.
#[derive(Debug, Clone)]
pub struct AsmGenerator {
    board: &'static BoardTraits,
    statements: Vec<AsmStatement>,
    declared_generators: BTreeSet<ChannelIndex>,
    declared_readouts: BTreeSet<ChannelIndex>,
    labels: HashSet<String>,
    finished: bool,
}

impl AsmGenerator {
    pub fn new(board: &'static BoardTraits) -> Self {
        AsmGenerator {
            board,
            statements: vec![],
            declared_generators: BTreeSet::new(),
            declared_readouts: BTreeSet::new(),
            labels: HashSet::new(),
            finished: false,
        }
    }

    pub fn board(&self) -> &'static BoardTraits {
        self.board
    }

    pub fn statements(&self) -> &[AsmStatement] {
        &self.statements
    }

    /// Whether the program has been terminated with `end`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Render the program listing, one statement per line.
    pub fn generate_asm(&self) -> String {
        self.statements
            .iter()
            .map(|statement| match statement {
                AsmStatement::Label { .. } => format!("{statement}\n"),
                _ => format!("    {statement}\n"),
            })
            .collect()
    }

    /// Serialize the program statements as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(&self.statements)
            .context("Failed to serialize program")?;
        Ok(json)
    }

    fn push(&mut self, statement: AsmStatement) -> anyhow::Result<()> {
        if self.finished {
            bail!("Cannot add '{statement}' after the end of the program");
        }
        self.statements.push(statement);
        Ok(())
    }

    fn check_generator(&self, ch: ChannelIndex) -> anyhow::Result<()> {
        if ch >= self.board.generator_count {
            bail!(
                "Generator {ch} does not exist on {} ({} generators)",
                self.board.type_str,
                self.board.generator_count
            );
        }
        Ok(())
    }

    fn check_declared(&self, ch: ChannelIndex) -> anyhow::Result<()> {
        self.check_generator(ch)?;
        if !self.declared_generators.contains(&ch) {
            bail!("Generator {ch} is used before it is declared");
        }
        Ok(())
    }

    fn check_register(&self, register: RegisterAddress) -> anyhow::Result<()> {
        if register.page >= self.board.register_pages
            || register.register >= self.board.registers_per_page
        {
            bail!(
                "Register {register} is outside the register file \
                ({} pages of {} registers)",
                self.board.register_pages,
                self.board.registers_per_page
            );
        }
        Ok(())
    }

    fn check_time(t: Cycles) -> anyhow::Result<()> {
        if t < 0 {
            bail!("Time {t} is negative");
        }
        Ok(())
    }

    fn check_finite(value: f64, what: &str) -> anyhow::Result<()> {
        if !value.is_finite() {
            bail!("{what} {value} is not a finite number");
        }
        Ok(())
    }
}

impl TprocBackend for AsmGenerator {
    fn us2cycles(
        &self,
        time: Duration<Microseconds>,
        gen_ch: Option<ChannelIndex>,
    ) -> anyhow::Result<Cycles> {
        let clock_mhz = match gen_ch {
            Some(ch) => {
                self.check_generator(ch)?;
                self.board.generator_clock_mhz
            }
            None => self.board.tproc_clock_mhz,
        };
        let cycles = time.to_cycles(clock_mhz);
        Self::check_finite(cycles, "Time")?;
        if cycles.abs() > Cycles::MAX as f64 {
            bail!("Time {time} does not fit the cycle counter");
        }
        Ok(cycles.round() as Cycles)
    }

    fn freq2reg(&self, frequency: f64, gen_ch: ChannelIndex) -> anyhow::Result<i64> {
        self.check_generator(gen_ch)?;
        Self::check_finite(frequency, "Frequency")?;
        let max_frequency = self.board.max_frequency_hz();
        if frequency.abs() >= max_frequency {
            bail!(
                "Frequency {frequency} Hz exceeds the DAC sample rate of {} MHz",
                self.board.dac_sample_rate_mhz
            );
        }
        let modulus = 1i64 << self.board.frequency_register_bits;
        let steps = (frequency / max_frequency * modulus as f64).round() as i64;
        Ok(steps.rem_euclid(modulus))
    }

    fn deg2reg(&self, degrees: f64, gen_ch: ChannelIndex) -> anyhow::Result<i64> {
        self.check_generator(gen_ch)?;
        Self::check_finite(degrees, "Phase")?;
        Ok(i64::from(Angle32::from_degrees(degrees).to_register()))
    }

    fn digital_output_id(&self) -> u8 {
        self.board.trigger_output
    }

    fn declare_readout(&mut self, readout: &ReadoutConfig) -> anyhow::Result<()> {
        if readout.channel >= self.board.readout_count {
            bail!(
                "Readout {} does not exist on {} ({} readouts)",
                readout.channel,
                self.board.type_str,
                self.board.readout_count
            );
        }
        if readout.length <= 0 {
            bail!("Readout length must be positive, got {}", readout.length);
        }
        Self::check_finite(readout.frequency, "Readout frequency")?;
        if !self.declared_readouts.insert(readout.channel) {
            bail!("Readout {} is declared twice", readout.channel);
        }
        self.push(AsmStatement::DeclareReadout {
            ch: readout.channel,
            length: readout.length,
            freq: readout.frequency,
            sel: readout.selection,
        })
    }

    fn declare_gen(&mut self, ch: ChannelIndex, nqz: u8) -> anyhow::Result<()> {
        self.check_generator(ch)?;
        if !(1..=2).contains(&nqz) {
            bail!("Nyquist zone must be 1 or 2, got {nqz}");
        }
        if self.declared_generators.contains(&ch) {
            bail!("Generator {ch} is declared twice");
        }
        self.push(AsmStatement::DeclareGen { ch, nqz })?;
        self.declared_generators.insert(ch);
        Ok(())
    }

    fn set_pulse_registers(
        &mut self,
        ch: ChannelIndex,
        registers: &PulseRegisters,
    ) -> anyhow::Result<()> {
        self.check_declared(ch)?;
        if registers.gain.abs() > self.board.max_gain {
            bail!(
                "Gain {} exceeds the maximum of {}",
                registers.gain,
                self.board.max_gain
            );
        }
        if registers.length <= 0 {
            bail!("Pulse length must be positive, got {}", registers.length);
        }
        self.push(AsmStatement::SetPulseRegisters {
            ch,
            gain: registers.gain,
            freq: registers.freq,
            phase: registers.phase,
            style: registers.style,
            length: registers.length,
        })
    }

    fn pulse(&mut self, ch: ChannelIndex, t: Cycles) -> anyhow::Result<()> {
        self.check_declared(ch)?;
        Self::check_time(t)?;
        self.push(AsmStatement::Pulse { ch, t })
    }

    fn regwi(&mut self, register: RegisterAddress, value: i64) -> anyhow::Result<()> {
        self.check_register(register)?;
        if i32::try_from(value).is_err() && u32::try_from(value).is_err() {
            bail!("Value {value} does not fit a 32 bit register");
        }
        self.push(AsmStatement::Regwi { register, value })
    }

    fn seti(
        &mut self,
        output_id: u8,
        register: RegisterAddress,
        t: Cycles,
    ) -> anyhow::Result<()> {
        self.check_register(register)?;
        Self::check_time(t)?;
        self.push(AsmStatement::Seti {
            out: output_id,
            register,
            t,
        })
    }

    fn synci(&mut self, t: Cycles) -> anyhow::Result<()> {
        Self::check_time(t)?;
        self.push(AsmStatement::Synci { t })
    }

    fn label(&mut self, name: &str) -> anyhow::Result<()> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            bail!("Invalid label '{name}'");
        }
        if self.labels.contains(name) {
            bail!("Label '{name}' is defined twice");
        }
        self.push(AsmStatement::Label {
            name: name.to_string(),
        })?;
        self.labels.insert(name.to_string());
        Ok(())
    }

    fn loopnz(&mut self, register: RegisterAddress, label: &str) -> anyhow::Result<()> {
        self.check_register(register)?;
        if !self.labels.contains(label) {
            return Err(anyhow!("Jump to undefined label '{label}'"));
        }
        self.push(AsmStatement::Loopnz {
            register,
            label: label.to_string(),
        })
    }

    fn wait_all(&mut self) -> anyhow::Result<()> {
        self.push(AsmStatement::WaitAll)
    }

    fn end(&mut self) -> anyhow::Result<()> {
        self.push(AsmStatement::End)?;
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardKind, RFSOC4X2_TRAITS};
    use pulse_compiler::PulseStyle;
    use tproc_units::microseconds;

    fn generator() -> AsmGenerator {
        AsmGenerator::new(&RFSOC4X2_TRAITS)
    }

    fn registers(gain: i64, length: Cycles) -> PulseRegisters {
        PulseRegisters {
            gain,
            freq: 0,
            phase: 0,
            style: PulseStyle::Const,
            length,
        }
    }

    #[test]
    fn test_conversions() {
        let asm = generator();
        assert_eq!(asm.us2cycles(microseconds(0.5), None).unwrap(), 205);
        assert_eq!(asm.us2cycles(microseconds(0.5), Some(0)).unwrap(), 307);
        assert_eq!(asm.us2cycles(microseconds(0.0), None).unwrap(), 0);
        assert!(asm.us2cycles(microseconds(1.0), Some(2)).is_err());
        assert!(asm.us2cycles(microseconds(f64::NAN), None).is_err());

        assert_eq!(asm.freq2reg(50e3, 1).unwrap(), 21845);
        assert_eq!(asm.freq2reg(0.0, 1).unwrap(), 0);
        assert_eq!(asm.freq2reg(-50e3, 1).unwrap(), (1i64 << 32) - 21845);
        assert!(asm.freq2reg(10e9, 1).is_err());

        assert_eq!(asm.deg2reg(90.0, 0).unwrap(), 1 << 30);
        assert_eq!(asm.deg2reg(450.0, 0).unwrap(), 1 << 30);
        assert_eq!(asm.deg2reg(-90.0, 0).unwrap(), 3 << 30);
        assert_eq!(asm.deg2reg(0.0, 0).unwrap(), 0);
    }

    #[test]
    fn test_generator_must_be_declared() {
        let mut asm = generator();
        assert!(asm.pulse(0, 0).is_err());
        assert!(asm.set_pulse_registers(0, &registers(100, 10)).is_err());
        asm.declare_gen(0, 1).unwrap();
        assert!(asm.declare_gen(0, 1).is_err());
        assert!(asm.declare_gen(1, 3).is_err());
        assert!(asm.declare_gen(2, 1).is_err());
        asm.set_pulse_registers(0, &registers(-32766, 10)).unwrap();
        asm.pulse(0, 0).unwrap();
        assert_eq!(asm.statements().len(), 3);
    }

    #[test]
    fn test_register_checks() {
        let mut asm = generator();
        asm.declare_gen(1, 1).unwrap();
        assert!(asm.set_pulse_registers(1, &registers(32767, 10)).is_err());
        assert!(asm.set_pulse_registers(1, &registers(100, 0)).is_err());
        assert!(asm.regwi(RegisterAddress::new(8, 0), 1).is_err());
        assert!(asm.regwi(RegisterAddress::new(0, 32), 1).is_err());
        assert!(asm.regwi(RegisterAddress::new(0, 31), 1 << 40).is_err());
        asm.regwi(RegisterAddress::new(0, 31), u32::MAX as i64).unwrap();
        assert!(asm.seti(4, RegisterAddress::new(0, 31), -1).is_err());
        assert!(asm.synci(-5).is_err());
        assert!(asm.pulse(1, -3).is_err());
        assert_eq!(asm.statements().len(), 2);
    }

    #[test]
    fn test_labels() {
        let mut asm = generator();
        let register = RegisterAddress::new(0, 14);
        assert!(asm.loopnz(register, "LOOP_I").is_err());
        asm.label("LOOP_I").unwrap();
        assert!(asm.label("LOOP_I").is_err());
        assert!(asm.label("two words").is_err());
        asm.loopnz(register, "LOOP_I").unwrap();
    }

    #[test]
    fn test_readout_declaration() {
        let mut asm = generator();
        let readout = ReadoutConfig {
            channel: 0,
            length: 1020,
            frequency: 0.0,
            selection: Default::default(),
        };
        asm.declare_readout(&readout).unwrap();
        assert!(asm.declare_readout(&readout).is_err());
        let missing = ReadoutConfig {
            channel: 2,
            ..readout.clone()
        };
        assert!(asm.declare_readout(&missing).is_err());
        assert!(asm.statements()[0].is_declaration());
    }

    #[test]
    fn test_nothing_after_end() {
        let mut asm = generator();
        asm.end().unwrap();
        assert!(asm.is_finished());
        assert!(asm.wait_all().is_err());
        assert_eq!(asm.statements(), &[AsmStatement::End]);
    }

    #[test]
    fn test_listing() {
        let mut asm = AsmGenerator::new(BoardKind::Zcu111.traits());
        asm.synci(200).unwrap();
        asm.regwi(RegisterAddress::new(0, 14), 9).unwrap();
        asm.label("LOOP_I").unwrap();
        asm.wait_all().unwrap();
        asm.loopnz(RegisterAddress::new(0, 14), "LOOP_I").unwrap();
        asm.end().unwrap();
        assert_eq!(
            asm.generate_asm(),
            "    synci 200;\n    regwi 0, $14, 9;\nLOOP_I:\n    waiti 0, 0;\n    \
            loopnz 0, $14, @LOOP_I;\n    end;\n"
        );
        let json: serde_json::Value = serde_json::from_str(&asm.to_json().unwrap()).unwrap();
        assert_eq!(json[0], serde_json::json!({"op": "synci", "t": 200}));
        assert_eq!(
            json[1],
            serde_json::json!({"op": "regwi", "register": {"page": 0, "register": 14}, "value": 9})
        );
        assert_eq!(json.as_array().unwrap().len(), 6);
    }
}
