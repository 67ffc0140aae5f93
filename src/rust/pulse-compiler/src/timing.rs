// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use tproc_units::duration::native_to_microseconds;
use tproc_units::{Duration, Microseconds};

use crate::channel::Channel;
use crate::settings::CompilerSettings;
use crate::validation::{ChannelOverrides, ValidatedPulse};
use crate::{ChannelIndex, Cycles, Error, Result};

/// Per-pulse columns only analog channels carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalogColumns {
    pub amplitudes: Vec<f64>,
    /// Frequencies in Hz.
    pub frequencies: Vec<f64>,
    /// Phases in degrees.
    pub phases: Vec<f64>,
}

/// One active pulse of a [`ChannelTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseRow {
    pub time: Duration<Microseconds>,
    pub length: Duration<Microseconds>,
    pub amplitude: Option<f64>,
    pub frequency: Option<f64>,
    pub phase: Option<f64>,
}

/// Timing of the active pulses of one channel.
///
/// The per-pulse columns are parallel: row `i` of every column describes the
/// `i`-th active pulse. Inactive pulses only show up in the trigger times of
/// the pulses after them and in the end time.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTable {
    channel: Channel,
    gain: f64,
    delay: Cycles,
    times: Vec<Duration<Microseconds>>,
    lengths: Vec<Duration<Microseconds>>,
    analog: Option<AnalogColumns>,
    end_time: Duration<Microseconds>,
}

impl ChannelTable {
    /// Build a table from its columns.
    ///
    /// Fails with [`Error::TableLengthMismatch`] if the columns do not all
    /// have the same length. Digital channels cannot carry analog columns.
    pub fn from_columns(
        channel: Channel,
        gain: f64,
        delay: Cycles,
        times: Vec<Duration<Microseconds>>,
        lengths: Vec<Duration<Microseconds>>,
        analog: Option<AnalogColumns>,
        end_time: Duration<Microseconds>,
    ) -> Result<Self> {
        let analog = match (channel.is_analog(), analog) {
            (true, None) => Some(AnalogColumns::default()),
            (false, Some(_)) => {
                return Err(Error::new(&format!(
                    "Digital channel {channel} cannot carry analog pulse parameters"
                )));
            }
            (_, analog) => analog,
        };
        let table = ChannelTable {
            channel,
            gain,
            delay,
            times,
            lengths,
            analog,
            end_time,
        };
        table.check_lengths()?;
        Ok(table)
    }

    pub(crate) fn derive(
        channel: Channel,
        pulses: &[ValidatedPulse],
        overrides: ChannelOverrides,
        settings: &CompilerSettings,
    ) -> Result<Self> {
        let scale = settings.time_units_per_us;
        let mut elapsed: u64 = 0;
        let mut times = vec![];
        let mut lengths = vec![];
        let mut analog = channel.is_analog().then(AnalogColumns::default);
        for pulse in pulses {
            if pulse.active {
                times.push(native_to_microseconds(elapsed, scale));
                lengths.push(native_to_microseconds(pulse.duration, scale));
                if let Some(columns) = analog.as_mut() {
                    columns.amplitudes.push(pulse.amplitude);
                    columns
                        .frequencies
                        .push(pulse.frequency.unwrap_or_default() * settings.frequency_scale);
                    columns.phases.push(pulse.phase.unwrap_or_default());
                }
            }
            elapsed = elapsed.checked_add(pulse.duration).ok_or_else(|| {
                Error::new(&format!("Sequence of channel {channel} is too long"))
            })?;
        }
        Self::from_columns(
            channel,
            overrides.gain.unwrap_or(settings.default_gain),
            overrides.delay.unwrap_or(settings.default_delay),
            times,
            lengths,
            analog,
            native_to_microseconds(elapsed, scale),
        )
    }

    fn check_lengths(&self) -> Result<()> {
        let expected = self.times.len();
        let mut columns = vec![("lengths", self.lengths.len())];
        if let Some(analog) = &self.analog {
            columns.push(("amplitudes", analog.amplitudes.len()));
            columns.push(("frequencies", analog.frequencies.len()));
            columns.push(("phases", analog.phases.len()));
        }
        for (list, found) in columns {
            if found != expected {
                return Err(Error::TableLengthMismatch {
                    channel: self.channel,
                    list,
                    found,
                    expected,
                });
            }
        }
        Ok(())
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn hardware_index(&self) -> ChannelIndex {
        self.channel.hardware_index()
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Delay in clock cycles added to every trigger time of the channel.
    pub fn delay(&self) -> Cycles {
        self.delay
    }

    /// Shift a trigger time in cycles by the channel delay.
    pub fn apply_delay(&self, cycles: Cycles) -> Result<Cycles> {
        cycles.checked_add(self.delay).ok_or_else(|| {
            Error::new(&format!(
                "Delay {} of channel {} moves cycle {cycles} out of the cycle counter range",
                self.delay, self.channel
            ))
        })
    }

    pub fn times(&self) -> &[Duration<Microseconds>] {
        &self.times
    }

    pub fn lengths(&self) -> &[Duration<Microseconds>] {
        &self.lengths
    }

    pub fn analog(&self) -> Option<&AnalogColumns> {
        self.analog.as_ref()
    }

    pub fn num_pulses(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Total duration of the channel sequence, including inactive pulses.
    pub fn end_time(&self) -> Duration<Microseconds> {
        self.end_time
    }

    pub fn rows(&self) -> impl Iterator<Item = PulseRow> + '_ {
        (0..self.num_pulses()).map(move |i| PulseRow {
            time: self.times[i],
            length: self.lengths[i],
            amplitude: self.analog.as_ref().map(|a| a.amplitudes[i]),
            frequency: self.analog.as_ref().map(|a| a.frequencies[i]),
            phase: self.analog.as_ref().map(|a| a.phases[i]),
        })
    }
}

impl fmt::Display for ChannelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (index {}, gain {}, delay {}): {} pulses, end time {}",
            self.channel,
            self.hardware_index(),
            self.gain,
            self.delay,
            self.num_pulses(),
            self.end_time
        )?;
        for row in self.rows() {
            write!(f, "\n  t={} len={}", row.time, row.length)?;
            if let (Some(amplitude), Some(frequency), Some(phase)) =
                (row.amplitude, row.frequency, row.phase)
            {
                write!(f, " amp={amplitude} freq={frequency} Hz phase={phase}°")?;
            }
        }
        Ok(())
    }
}
