// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::backend::{TprocBackend, backend_call};
use crate::timing::ChannelTable;
use crate::{ChannelIndex, Cycles, Result};

/// A change of one digital output bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub bit: ChannelIndex,
    pub state: bool,
}

impl Transition {
    pub fn on(bit: ChannelIndex) -> Self {
        Transition { bit, state: true }
    }

    pub fn off(bit: ChannelIndex) -> Self {
        Transition { bit, state: false }
    }

    fn mask(&self) -> u32 {
        1 << self.bit
    }
}

/// Digital output transitions of all channels, keyed by clock cycle.
///
/// Transitions sharing a cycle are kept in one record and applied together
/// in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitalEventStream {
    events: BTreeMap<Cycles, Vec<Transition>>,
}

impl DigitalEventStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, time: Cycles, transition: Transition) {
        self.events.entry(time).or_default().push(transition);
    }

    /// Number of distinct transition times.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, time: Cycles) -> Option<&[Transition]> {
        self.events.get(&time).map(Vec::as_slice)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Cycles, Vec<Transition>> {
        self.events.iter()
    }

    /// Value of the digital output register after each transition time.
    ///
    /// The register starts with all bits low. Each record sets (`on`) or
    /// clears (`off`) its bits against the value left by the previous record.
    pub fn register_states(&self) -> Vec<(Cycles, u32)> {
        let mut value = 0u32;
        self.events
            .iter()
            .map(|(time, transitions)| {
                for transition in transitions {
                    if transition.state {
                        value |= transition.mask();
                    } else {
                        value &= !transition.mask();
                    }
                }
                (*time, value)
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a DigitalEventStream {
    type Item = (&'a Cycles, &'a Vec<Transition>);
    type IntoIter = btree_map::Iter<'a, Cycles, Vec<Transition>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Collect the on and off transitions of all digital tables.
///
/// Trigger times are converted to cycles of the processor clock before the
/// channel delay is added, so that channels with equal times always land on
/// the same record. Off transitions are converted from the pulse end time, so
/// rounding never moves them past the next on transition of the channel.
pub fn merge_digital_events<'a, B: TprocBackend + ?Sized>(
    tables: impl IntoIterator<Item = &'a ChannelTable>,
    backend: &B,
) -> Result<DigitalEventStream> {
    let mut stream = DigitalEventStream::new();
    for table in tables {
        if !table.channel().is_digital() {
            continue;
        }
        let bit = table.hardware_index();
        for row in table.rows() {
            let on = backend_call("us2cycles", backend.us2cycles(row.time, None))?;
            let off = backend_call("us2cycles", backend.us2cycles(row.time + row.length, None))?;
            stream.insert(table.apply_delay(on)?, Transition::on(bit));
            stream.insert(table.apply_delay(off)?, Transition::off(bit));
        }
    }
    Ok(stream)
}
