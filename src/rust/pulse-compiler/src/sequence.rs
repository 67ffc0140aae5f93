// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::ParamValue;
use crate::{Error, Result};

/// One pulse tuple: `(duration, active, [frequency], [phase])`.
///
/// For analog channels the `active` field doubles as the pulse amplitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPulse(pub Vec<ParamValue>);

impl RawPulse {
    pub fn new(fields: Vec<ParamValue>) -> Self {
        RawPulse(fields)
    }

    /// A `(duration, state)` pulse of a digital channel.
    ///
    /// The duration is checked during validation like any parsed input.
    pub fn digital(duration: i64, active: bool) -> Self {
        RawPulse(vec![
            ParamValue::Int(duration),
            ParamValue::Int(active as i64),
        ])
    }

    /// An active `(duration, amplitude, frequency, phase)` pulse of a DAC channel.
    pub fn analog(duration: i64, amplitude: f64, frequency: f64, phase: f64) -> Self {
        RawPulse(vec![
            ParamValue::Int(duration),
            ParamValue::Float(amplitude),
            ParamValue::Float(frequency),
            ParamValue::Float(phase),
        ])
    }

    pub fn fields(&self) -> &[ParamValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub type SequenceMap = IndexMap<String, Vec<RawPulse>>;

/// Everything the caller supplies for one compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceInput {
    /// Pulse lists keyed by channel name, or by source name when a
    /// `channel_map` is given.
    pub sequences: SequenceMap,
    /// Destination channel → source key in `sequences`.
    #[serde(default)]
    pub channel_map: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub gains: IndexMap<String, ParamValue>,
    #[serde(default)]
    pub delays: IndexMap<String, ParamValue>,
}

impl SequenceInput {
    pub fn new(sequences: SequenceMap) -> Self {
        SequenceInput {
            sequences,
            ..Default::default()
        }
    }

    pub fn with_channel_map(mut self, channel_map: IndexMap<String, String>) -> Self {
        self.channel_map = Some(channel_map);
        self
    }

    pub fn with_gain<S: Into<String>, V: Into<ParamValue>>(mut self, channel: S, gain: V) -> Self {
        self.gains.insert(channel.into(), gain.into());
        self
    }

    pub fn with_delay<S: Into<String>, V: Into<ParamValue>>(mut self, channel: S, delay: V) -> Self {
        self.delays.insert(channel.into(), delay.into());
        self
    }
}

/// Apply a channel remapping to imported sequences.
///
/// Each destination channel in `channel_map` receives the pulse list stored
/// under its source key. Without a map the sequences are returned unchanged.
pub fn remap_sequences(
    sequences: &SequenceMap,
    channel_map: Option<&IndexMap<String, String>>,
) -> Result<SequenceMap> {
    let Some(channel_map) = channel_map else {
        return Ok(sequences.clone());
    };
    channel_map
        .iter()
        .map(|(destination, source)| {
            let pulses = sequences
                .get(source)
                .ok_or_else(|| Error::UnknownSource {
                    destination: destination.clone(),
                    source_key: source.clone(),
                })?;
            Ok((destination.clone(), pulses.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imported() -> SequenceMap {
        serde_json::from_str(
            r#"{
                "laser": [[100, 0], [200, 1]],
                "mw": [[500, 1, 50, 0], [300, 0]]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_no_map_passes_through() {
        let sequences = imported();
        let out = remap_sequences(&sequences, None).unwrap();
        assert_eq!(out, sequences);
    }

    #[test]
    fn test_remap() {
        let sequences = imported();
        let map: IndexMap<String, String> = [
            ("DIG_0".to_string(), "laser".to_string()),
            ("DAC_A".to_string(), "mw".to_string()),
            ("DIG_3".to_string(), "laser".to_string()),
        ]
        .into_iter()
        .collect();
        let out = remap_sequences(&sequences, Some(&map)).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out["DIG_0"], sequences["laser"]);
        assert_eq!(out["DIG_3"], sequences["laser"]);
        assert_eq!(out["DAC_A"], sequences["mw"]);
        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, vec!["DIG_0", "DAC_A", "DIG_3"]);
    }

    #[test]
    fn test_remap_unknown_source() {
        let map: IndexMap<String, String> = [("DIG_0".to_string(), "rf".to_string())]
            .into_iter()
            .collect();
        let err = remap_sequences(&imported(), Some(&map)).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownSource { ref destination, ref source_key }
                if destination == "DIG_0" && source_key == "rf"
        ));
    }

    #[test]
    fn test_input_from_json() {
        let input: SequenceInput = serde_json::from_str(
            r#"{
                "sequences": {"DIG_0": [[100, 0], [200, 1], [50, 0]]},
                "gains": {"DAC_A": 20000},
                "delays": {"DIG_0": 4}
            }"#,
        )
        .unwrap();
        assert_eq!(input.sequences["DIG_0"][1], RawPulse::digital(200, true));
        assert_eq!(input.gains["DAC_A"], ParamValue::Int(20000));
        assert_eq!(input.delays["DIG_0"], ParamValue::Int(4));
        assert!(input.channel_map.is_none());
    }
}
