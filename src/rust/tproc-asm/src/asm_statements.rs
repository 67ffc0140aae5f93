// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use pulse_compiler::{ChannelIndex, Cycles, PulseStyle, ReadoutSelection, RegisterAddress};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AsmStatement {
    DeclareReadout {
        ch: ChannelIndex,
        length: Cycles,
        freq: f64,
        sel: ReadoutSelection,
    },
    DeclareGen {
        ch: ChannelIndex,
        nqz: u8,
    },
    SetPulseRegisters {
        ch: ChannelIndex,
        gain: i64,
        freq: i64,
        phase: i64,
        style: PulseStyle,
        length: Cycles,
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
        out: u8,
        register: RegisterAddress,
        t: Cycles,
    },
    Synci {
        t: Cycles,
    },
    Label {
        name: String,
    },
    Loopnz {
        register: RegisterAddress,
        label: String,
    },
    WaitAll,
    End,
}

impl AsmStatement {
    /// Whether the statement only configures the firmware and is not executed
    /// by the processor.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            AsmStatement::DeclareReadout { .. } | AsmStatement::DeclareGen { .. }
        )
    }
}

impl fmt::Display for AsmStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmStatement::DeclareReadout {
                ch,
                length,
                freq,
                sel,
            } => write!(
                f,
                "// declare_readout ch={ch} length={length} freq={freq} sel={sel}"
            ),
            AsmStatement::DeclareGen { ch, nqz } => write!(f, "// declare_gen ch={ch} nqz={nqz}"),
            AsmStatement::SetPulseRegisters {
                ch,
                gain,
                freq,
                phase,
                style,
                length,
            } => write!(
                f,
                "set_pulse_registers {ch}, gain={gain}, freq={freq}, phase={phase}, \
                style={style}, length={length};"
            ),
            AsmStatement::Pulse { ch, t } => write!(f, "pulse {ch}, @{t};"),
            AsmStatement::Regwi { register, value } => write!(f, "regwi {register}, {value};"),
            AsmStatement::Seti { out, register, t } => write!(f, "seti {out}, {register}, @{t};"),
            AsmStatement::Synci { t } => write!(f, "synci {t};"),
            AsmStatement::Label { name } => write!(f, "{name}:"),
            AsmStatement::Loopnz { register, label } => write!(f, "loopnz {register}, @{label};"),
            AsmStatement::WaitAll => write!(f, "waiti 0, 0;"),
            AsmStatement::End => write!(f, "end;"),
        }
    }
}
