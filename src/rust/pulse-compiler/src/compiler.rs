// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use tproc_units::{Duration, Microseconds, microseconds};

use crate::backend::{PulseRegisters, PulseStyle, TprocBackend, backend_call};
use crate::calibration::PhaseCalibration;
use crate::channel::Channel;
use crate::digital::{DigitalEventStream, merge_digital_events};
use crate::sequence::{SequenceInput, remap_sequences};
use crate::settings::CompilerSettings;
use crate::timing::ChannelTable;
use crate::validation::validate;
use crate::{Error, Result};

/// A validated pulse program, ready to be emitted into a [`TprocBackend`].
///
/// Construction validates the input and derives one [`ChannelTable`] per
/// channel. The compiler is immutable afterwards and can be compiled into
/// any number of backends.
#[derive(Debug, Clone)]
pub struct SequenceCompiler {
    settings: CompilerSettings,
    tables: BTreeMap<Channel, ChannelTable>,
    calibration: PhaseCalibration,
    end_time: Duration<Microseconds>,
}

impl SequenceCompiler {
    pub fn new(input: &SequenceInput, mut settings: CompilerSettings) -> Result<Self> {
        for change in settings.sanitize()? {
            tproc_log::warn!(
                "Setting '{}' changed from {} to {}: {}",
                change.field,
                change.original,
                change.sanitized,
                change.reason
            );
        }
        let sequences = remap_sequences(&input.sequences, input.channel_map.as_ref())?;
        let validated = validate(&sequences, &input.gains, &input.delays, settings.max_gain)?;

        let mut tables = BTreeMap::new();
        for (channel, pulses) in &validated.channels {
            let overrides = validated
                .overrides
                .get(channel)
                .copied()
                .unwrap_or_default();
            let table = ChannelTable::derive(*channel, pulses, overrides, &settings)?;
            tproc_log::diagnostic!("{}", table);
            tables.insert(*channel, table);
        }

        let end_time = tables
            .values()
            .map(|table| table.end_time())
            .max()
            .unwrap_or(microseconds(0.0));
        tproc_log::diagnostic!("Sequence end time: {}", end_time);

        let compiler = SequenceCompiler {
            settings,
            tables,
            calibration: PhaseCalibration::default(),
            end_time,
        };
        if !compiler.end_times_consistent() {
            let per_channel: Vec<String> = compiler
                .tables
                .values()
                .map(|table| format!("{}: {}", table.channel(), table.end_time()))
                .collect();
            tproc_log::warn!(
                "Channel sequences do not all end at the same time ({}); \
                using the latest end time {}",
                per_channel.join(", "),
                end_time
            );
        }
        Ok(compiler)
    }

    pub fn with_phase_calibration(mut self, calibration: PhaseCalibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Tables of all channels, in emission order.
    pub fn tables(&self) -> impl Iterator<Item = &ChannelTable> {
        self.tables.values()
    }

    pub fn table(&self, channel: Channel) -> Option<&ChannelTable> {
        self.tables.get(&channel)
    }

    /// Latest end time over all channels.
    pub fn end_time(&self) -> Duration<Microseconds> {
        self.end_time
    }

    /// Whether all channel sequences have the same total duration.
    pub fn end_times_consistent(&self) -> bool {
        self.tables
            .values()
            .all(|table| table.end_time() == self.end_time)
    }

    pub fn digital_events<B: TprocBackend + ?Sized>(
        &self,
        backend: &B,
    ) -> Result<DigitalEventStream> {
        merge_digital_events(self.tables.values(), backend)
    }

    /// Emit the program, repeated `reps` times, into `backend`.
    pub fn compile<B: TprocBackend + ?Sized>(&self, backend: &mut B, reps: u32) -> Result<()> {
        if reps == 0 {
            return Err(Error::InvalidRepetitions { reps });
        }
        let settings = &self.settings;
        if let Some(readout) = &settings.readout {
            backend_call("declare_readout", backend.declare_readout(readout))?;
        }
        backend_call("synci", backend.synci(settings.settle_cycles))?;
        backend_call(
            "regwi",
            backend.regwi(settings.loop_register, i64::from(reps) - 1),
        )?;
        backend_call("label", backend.label(&settings.loop_label))?;

        for table in self.tables.values().filter(|t| t.channel().is_analog()) {
            self.emit_analog(table, backend)?;
        }

        let output_id = backend.digital_output_id();
        for (time, value) in self.digital_events(backend)?.register_states() {
            backend_call(
                "regwi",
                backend.regwi(settings.output_register, i64::from(value)),
            )?;
            backend_call(
                "seti",
                backend.seti(output_id, settings.output_register, time),
            )?;
        }

        backend_call("wait_all", backend.wait_all())?;
        let end = backend_call("us2cycles", backend.us2cycles(self.end_time, None))?;
        backend_call("synci", backend.synci(end))?;
        backend_call(
            "loopnz",
            backend.loopnz(settings.loop_register, &settings.loop_label),
        )?;
        backend_call("end", backend.end())
    }

    fn emit_analog<B: TprocBackend + ?Sized>(
        &self,
        table: &ChannelTable,
        backend: &mut B,
    ) -> Result<()> {
        let ch = table.hardware_index();
        backend_call(
            "declare_gen",
            backend.declare_gen(ch, self.settings.nyquist_zone),
        )?;
        for row in table.rows() {
            let amplitude = row.amplitude.unwrap_or_default();
            let frequency = row.frequency.unwrap_or_default();
            let phase = row.phase.unwrap_or_default() + self.calibration.offset(frequency, ch);
            let registers = PulseRegisters {
                gain: (amplitude * table.gain()).trunc() as i64,
                freq: backend_call("freq2reg", backend.freq2reg(frequency, ch))?,
                phase: backend_call("deg2reg", backend.deg2reg(phase, ch))?,
                style: PulseStyle::Const,
                length: backend_call("us2cycles", backend.us2cycles(row.length, Some(ch)))?,
            };
            backend_call("set_pulse_registers", backend.set_pulse_registers(ch, &registers))?;
            let start = backend_call("us2cycles", backend.us2cycles(row.time, None))?;
            backend_call("pulse", backend.pulse(ch, table.apply_delay(start)?))?;
        }
        Ok(())
    }
}
