// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

pub mod backend;
pub mod calibration;
pub mod channel;
pub mod compiler;
pub mod digital;
pub mod sequence;
pub mod settings;
pub mod timing;
pub(crate) mod validation;
pub mod value;

#[cfg(test)]
pub(crate) mod test_utils;

pub use backend::{PulseRegisters, PulseStyle, RegisterAddress, TprocBackend};
pub use calibration::PhaseCalibration;
pub use channel::{Channel, DacRef, DigitalIndex, VALID_CHANNELS};
pub use compiler::SequenceCompiler;
pub use digital::{DigitalEventStream, Transition};
pub use sequence::{RawPulse, SequenceInput};
pub use settings::{CompilerSettings, ReadoutConfig, ReadoutSelection, SanitizationChange};
pub use timing::{AnalogColumns, ChannelTable, PulseRow};
pub use value::ParamValue;

/// Time on the tProcessor timeline, in clock cycles.
pub type Cycles = i64;

/// Hardware index of a generator or a digital output bit.
pub type ChannelIndex = u8;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{channel} not a valid channel. Try: [{}]", .valid.join(", "))]
    InvalidChannel {
        channel: String,
        valid: &'static [&'static str],
    },
    #[error("{channel} gain '{gain}' {reason}")]
    InvalidGain {
        channel: Channel,
        gain: ParamValue,
        reason: String,
    },
    #[error("{channel} delay '{delay}' not integer number of clock cycles")]
    InvalidDelay { channel: Channel, delay: ParamValue },
    #[error(
        "Specified too many sequence parameters for pulse {index} in channel {channel}: \
        {found} given, at most {max} allowed"
    )]
    TooManyParameters {
        channel: Channel,
        index: usize,
        found: usize,
        max: usize,
    },
    #[error(
        "Specified too few sequence parameters for pulse {index} in channel {channel}: \
        {found} given, {expected} required"
    )]
    MissingParameters {
        channel: Channel,
        index: usize,
        found: usize,
        expected: usize,
    },
    #[error("Invalid parameter for pulse {index} in channel {channel}: {reason}")]
    InvalidPulseParameter {
        channel: Channel,
        index: usize,
        reason: String,
    },
    #[error(
        "Pulse {index} in channel {channel} does not alternate with the previous state; \
        merge consecutive active pulses into one"
    )]
    NonAlternatingStates { channel: Channel, index: usize },
    #[error(
        "Number of elements in pulse parameter lists of channel {channel} are not equal: \
        '{list}' has {found}, expected {expected}"
    )]
    TableLengthMismatch {
        channel: Channel,
        list: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("Channel {destination} is mapped to unknown sequence '{source_key}'")]
    UnknownSource {
        destination: String,
        source_key: String,
    },
    #[error("Number of repetitions must be at least 1, got {reps}")]
    InvalidRepetitions { reps: u32 },
    #[error("Backend rejected '{instruction}': {source}")]
    BackendRejection {
        instruction: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new(msg: &str) -> Self {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
