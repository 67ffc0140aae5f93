// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

pub mod asm_generator;
pub mod asm_statements;
pub mod board;

pub use asm_generator::AsmGenerator;
pub use asm_statements::AsmStatement;
pub use board::{BoardKind, BoardTraits};

use pulse_compiler::SequenceCompiler;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Compiler(#[from] pulse_compiler::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Compile `compiler` into a program for `board`, repeated `reps` times.
pub fn assemble(compiler: &SequenceCompiler, board: BoardKind, reps: u32) -> Result<AsmGenerator> {
    let mut generator = AsmGenerator::new(board.traits());
    compiler.compile(&mut generator, reps)?;
    tproc_log::info!(
        "Generated {} statements for {}",
        generator.statements().len(),
        board
    );
    tproc_log::diagnostic!("Program listing:\n{}", generator.generate_asm());
    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_compiler::{CompilerSettings, PhaseCalibration, ReadoutConfig, SequenceInput};

    fn compiler(json: &str, settings: CompilerSettings) -> SequenceCompiler {
        let input: SequenceInput = serde_json::from_str(json).unwrap();
        SequenceCompiler::new(&input, settings).unwrap()
    }

    #[test]
    fn test_laser_and_microwave_program() {
        let compiler = compiler(
            r#"{
                "sequences": {
                    "DIG_0": [[1000, 1], [2000, 0]],
                    "DIG_1": [[1000, 1], [2000, 0]],
                    "DAC_A": [[1000, 0], [500, 0.5, 50, 90], [1500, 0]]
                },
                "gains": {"DAC_A": 20000}
            }"#,
            CompilerSettings::default(),
        );
        let asm = assemble(&compiler, BoardKind::Zcu111, 100).unwrap();
        assert!(asm.is_finished());
        // ZCU111: tProcessor and generators at 384 MHz, DAC at 6144 MHz
        assert_eq!(
            asm.generate_asm(),
            "    synci 200;\n\
             \x20   regwi 0, $14, 99;\n\
             LOOP_I:\n\
             \x20   // declare_gen ch=1 nqz=1\n\
             \x20   set_pulse_registers 1, gain=10000, freq=34953, phase=1073741824, \
             style=const, length=192;\n\
             \x20   pulse 1, @384;\n\
             \x20   regwi 0, $31, 3;\n\
             \x20   seti 4, 0, $31, @0;\n\
             \x20   regwi 0, $31, 0;\n\
             \x20   seti 4, 0, $31, @384;\n\
             \x20   waiti 0, 0;\n\
             \x20   synci 1152;\n\
             \x20   loopnz 0, $14, @LOOP_I;\n\
             \x20   end;\n"
        );
    }

    #[test]
    fn test_readout_and_calibration() {
        let settings = CompilerSettings {
            readout: Some(ReadoutConfig {
                channel: 0,
                length: 1020,
                frequency: 0.0,
                selection: Default::default(),
            }),
            ..Default::default()
        };
        let compiler = compiler(r#"{"sequences": {"DAC_B": [[100, 1, 50, 0]]}}"#, settings)
            .with_phase_calibration(PhaseCalibration::new().with_offset(50e3, 0, -90.0));
        let asm = assemble(&compiler, BoardKind::Rfsoc4x2, 1).unwrap();
        assert_eq!(
            asm.statements()[0],
            AsmStatement::DeclareReadout {
                ch: 0,
                length: 1020,
                freq: 0.0,
                sel: Default::default(),
            }
        );
        let phase = asm.statements().iter().find_map(|statement| match statement {
            AsmStatement::SetPulseRegisters { phase, .. } => Some(*phase),
            _ => None,
        });
        assert_eq!(phase, Some(3 << 30));
    }

    #[test]
    fn test_board_rejection_is_reported() {
        // ZCU111 generator clock: 0 us pulse rounds to a zero length
        let compiler = compiler(
            r#"{"sequences": {"DAC_A": [[0, 1, 50, 0]]}}"#,
            CompilerSettings::default(),
        );
        let err = assemble(&compiler, BoardKind::Zcu111, 1).unwrap_err();
        match err {
            Error::Compiler(pulse_compiler::Error::BackendRejection { instruction, .. }) => {
                assert_eq!(instruction, "set_pulse_registers");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_back_to_back_pulses_stay_high_after_rounding() {
        // RFSoC 4x2: 0.4096 processor cycles per ns. 11 ns rounds up to 5
        // cycles, so a rounded length would end the first pulse at cycle 10,
        // after the second pulse starts at cycle 9.
        let compiler = compiler(
            r#"{"sequences": {"DIG_0": [[11, 0], [11, 1], [1, 0], [11, 1]]}}"#,
            CompilerSettings::default(),
        );
        let board = AsmGenerator::new(BoardKind::Rfsoc4x2.traits());
        let events = compiler.digital_events(&board).unwrap();
        assert_eq!(events.register_states(), vec![(5, 1), (9, 1), (14, 0)]);
    }

    #[test]
    fn test_delay_overflow_is_an_error() {
        let compiler = compiler(
            r#"{"sequences": {"DIG_0": [[10, 1]]}, "delays": {"DIG_0": 9223372036854775807}}"#,
            CompilerSettings::default(),
        );
        let err = assemble(&compiler, BoardKind::Rfsoc4x2, 1).unwrap_err();
        assert!(err.to_string().contains("cycle counter range"), "{err}");
    }

    #[test]
    fn test_negative_delay_is_rejected_by_board() {
        let compiler = compiler(
            r#"{"sequences": {"DIG_3": [[10, 1]]}, "delays": {"DIG_3": -8}}"#,
            CompilerSettings::default(),
        );
        let err = assemble(&compiler, BoardKind::Rfsoc4x2, 1).unwrap_err();
        assert!(err.to_string().contains("seti"), "{err}");
    }
}
