// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Checks raw caller input and converts it into typed per-channel pulses.
//!
//! Checks run in a fixed order and stop at the first violation: channel
//! names of sequences, gains and delays, then gain values, then delay values,
//! then the pulses of each channel in input order.
use indexmap::IndexMap;
use std::collections::BTreeMap;

use crate::channel::Channel;
use crate::sequence::{RawPulse, SequenceMap};
use crate::value::ParamValue;
use crate::{Cycles, Error, Result};

const DURATION: usize = 0;
const ACTIVE: usize = 1;
const FREQUENCY: usize = 2;
const PHASE: usize = 3;

/// Fields every pulse carries: duration and state.
const MIN_PARAMETERS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidatedPulse {
    /// Duration in native sequence time units.
    pub duration: u64,
    pub active: bool,
    /// Amplitude for analog pulses, 1.0 for active digital pulses.
    pub amplitude: f64,
    pub frequency: Option<f64>,
    pub phase: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ChannelOverrides {
    pub gain: Option<f64>,
    pub delay: Option<Cycles>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ValidatedInput {
    pub channels: BTreeMap<Channel, Vec<ValidatedPulse>>,
    pub overrides: BTreeMap<Channel, ChannelOverrides>,
}

pub(crate) fn validate(
    sequences: &SequenceMap,
    gains: &IndexMap<String, ParamValue>,
    delays: &IndexMap<String, ParamValue>,
    max_gain: f64,
) -> Result<ValidatedInput> {
    let sequence_channels = parse_channels(sequences.keys())?;
    let gain_channels = parse_channels(gains.keys())?;
    let delay_channels = parse_channels(delays.keys())?;

    let mut overrides: BTreeMap<Channel, ChannelOverrides> = BTreeMap::new();
    for (channel, gain) in gain_channels.into_iter().zip(gains.values()) {
        overrides.entry(channel).or_default().gain = Some(validate_gain(channel, gain, max_gain)?);
    }
    for (channel, delay) in delay_channels.into_iter().zip(delays.values()) {
        overrides.entry(channel).or_default().delay = Some(validate_delay(channel, delay)?);
    }

    let mut channels = BTreeMap::new();
    for (channel, pulses) in sequence_channels.into_iter().zip(sequences.values()) {
        channels.insert(channel, validate_pulses(channel, pulses)?);
    }
    Ok(ValidatedInput {
        channels,
        overrides,
    })
}

fn parse_channels<'a>(names: impl Iterator<Item = &'a String>) -> Result<Vec<Channel>> {
    names.map(|name| name.parse::<Channel>()).collect()
}

fn validate_gain(channel: Channel, gain: &ParamValue, max_gain: f64) -> Result<f64> {
    let invalid = |reason: String| Error::InvalidGain {
        channel,
        gain: gain.clone(),
        reason,
    };
    let value = gain
        .as_f64()
        .ok_or_else(|| invalid("not a number".to_string()))?;
    if !value.is_finite() || value.abs() > max_gain {
        return Err(invalid(format!("greater than max gain of {max_gain}")));
    }
    Ok(value)
}

fn validate_delay(channel: Channel, delay: &ParamValue) -> Result<Cycles> {
    match delay {
        ParamValue::Int(cycles) => Ok(*cycles),
        _ => Err(Error::InvalidDelay {
            channel,
            delay: delay.clone(),
        }),
    }
}

fn validate_pulses(channel: Channel, pulses: &[RawPulse]) -> Result<Vec<ValidatedPulse>> {
    let mut validated: Vec<ValidatedPulse> = Vec::with_capacity(pulses.len());
    for (index, pulse) in pulses.iter().enumerate() {
        let pulse = validate_pulse(channel, index, pulse)?;
        if channel.is_digital() && pulse.active {
            // Zero-length gaps do not separate two active pulses
            let follows_active = validated
                .iter()
                .rev()
                .find(|prev| prev.active || prev.duration > 0)
                .is_some_and(|prev| prev.active);
            if follows_active || pulse.duration == 0 {
                return Err(Error::NonAlternatingStates { channel, index });
            }
        }
        validated.push(pulse);
    }
    Ok(validated)
}

fn validate_pulse(channel: Channel, index: usize, pulse: &RawPulse) -> Result<ValidatedPulse> {
    let fields = pulse.fields();
    let found = fields.len();
    if found < MIN_PARAMETERS {
        return Err(Error::MissingParameters {
            channel,
            index,
            found,
            expected: MIN_PARAMETERS,
        });
    }
    let invalid = |reason: String| Error::InvalidPulseParameter {
        channel,
        index,
        reason,
    };

    let level = fields[ACTIVE]
        .as_level()
        .ok_or_else(|| invalid(format!("state '{}' is not boolean-like", fields[ACTIVE])))?;
    let active = level != 0.0;
    let max = if active {
        channel.max_active_parameters()
    } else {
        MIN_PARAMETERS
    };
    if found > max {
        return Err(Error::TooManyParameters {
            channel,
            index,
            found,
            max,
        });
    }

    let duration = fields[DURATION].as_duration().ok_or_else(|| {
        invalid(format!(
            "duration '{}' is not a non-negative integer",
            fields[DURATION]
        ))
    })?;

    if !active || channel.is_digital() {
        return Ok(ValidatedPulse {
            duration,
            active,
            amplitude: if active { 1.0 } else { 0.0 },
            frequency: None,
            phase: None,
        });
    }

    let expected = channel.max_active_parameters();
    if found < expected {
        return Err(Error::MissingParameters {
            channel,
            index,
            found,
            expected,
        });
    }
    if level.abs() > 1.0 {
        return Err(invalid(format!("amplitude {level} outside of [-1, 1]")));
    }
    let numeric = |position: usize, name: &str| {
        fields[position]
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(format!("{name} '{}' is not a number", fields[position])))
    };
    Ok(ValidatedPulse {
        duration,
        active,
        amplitude: level,
        frequency: Some(numeric(FREQUENCY, "frequency")?),
        phase: Some(numeric(PHASE, "phase")?),
    })
}
