//! Bytecode decoding, listing, and replay.
//!
//! `replay` expands loops into the flat command sequence an interpreter would
//! perform. It exists to check generated code and to power `bugwars-cli replay`;
//! it is not a game engine.

use std::fmt::Write as _;

use serde::Serialize;
use thiserror::Error;

use super::commands::{BugCommand, INSTRUCTION_WIDTH, LOOP_END, LOOP_START};

/// A decoded `[opcode, operand]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    Command { command: BugCommand },
    LoopStart { count: i32, end: usize },
    LoopEnd { start: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("bytecode length {0} is not a whole number of instructions")]
    OddLength(usize),
    #[error("unknown opcode {opcode} at instruction {index}")]
    UnknownOpcode { index: usize, opcode: i32 },
    #[error("command at instruction {index} has non-zero operand {operand}")]
    UnexpectedOperand { index: usize, operand: i32 },
    #[error("loop at instruction {index} has non-positive count {count}")]
    BadLoopCount { index: usize, count: i32 },
    #[error("loop end at instruction {index} does not point at its loop start")]
    BadLoopTarget { index: usize },
    #[error("loop started at instruction {index} is never closed")]
    UnclosedLoop { index: usize },
    #[error("replay exceeded {0} steps")]
    StepLimit(usize),
}

/// Decode raw bytecode, checking loop structure.
pub fn decode(code: &[i32]) -> Result<Vec<Instruction>, DecodeError> {
    if code.len() % INSTRUCTION_WIDTH != 0 {
        return Err(DecodeError::OddLength(code.len()));
    }

    let mut out = Vec::with_capacity(code.len() / INSTRUCTION_WIDTH);
    let mut open: Vec<usize> = Vec::new();

    for (index, pair) in code.chunks_exact(INSTRUCTION_WIDTH).enumerate() {
        let &[opcode, operand] = pair else {
            return Err(DecodeError::OddLength(code.len()));
        };
        let instruction = match opcode {
            LOOP_START => {
                if operand <= 0 {
                    return Err(DecodeError::BadLoopCount {
                        index,
                        count: operand,
                    });
                }
                open.push(index);
                // `end` is patched when the matching LOOP_END is seen.
                Instruction::LoopStart {
                    count: operand,
                    end: index,
                }
            }
            LOOP_END => {
                let start = open.pop().ok_or(DecodeError::BadLoopTarget { index })?;
                let target = isize::try_from(operand)
                    .ok()
                    .and_then(|offset| index.checked_add_signed(offset));
                if target != Some(start) {
                    return Err(DecodeError::BadLoopTarget { index });
                }
                if let Some(Instruction::LoopStart { end, .. }) = out.get_mut(start) {
                    *end = index;
                }
                Instruction::LoopEnd { start }
            }
            _ => {
                let command = BugCommand::from_opcode(opcode)
                    .ok_or(DecodeError::UnknownOpcode { index, opcode })?;
                if operand != 0 {
                    return Err(DecodeError::UnexpectedOperand { index, operand });
                }
                Instruction::Command { command }
            }
        };
        out.push(instruction);
    }

    if let Some(&index) = open.first() {
        return Err(DecodeError::UnclosedLoop { index });
    }
    Ok(out)
}

/// Render a human-readable listing, one instruction per line, loop bodies indented.
pub fn disassemble(code: &[i32]) -> Result<String, DecodeError> {
    let instructions = decode(code)?;
    let mut out = String::new();
    let mut depth = 0usize;
    for (index, instruction) in instructions.iter().enumerate() {
        if matches!(instruction, Instruction::LoopEnd { .. }) {
            depth = depth.saturating_sub(1);
        }
        let indent = "  ".repeat(depth);
        let _ = match instruction {
            Instruction::Command { command } => writeln!(out, "{index:04}  {indent}{command}"),
            Instruction::LoopStart { count, end } => {
                writeln!(out, "{index:04}  {indent}loop x{count} (ends {end:04})")
            }
            Instruction::LoopEnd { start } => writeln!(out, "{index:04}  {indent}end -> {start:04}"),
        };
        if matches!(instruction, Instruction::LoopStart { .. }) {
            depth += 1;
        }
    }
    Ok(out)
}

/// Run the bytecode's control flow and collect the commands it performs.
///
/// Every executed instruction counts as one step, so loops with empty bodies
/// are bounded too.
pub fn replay(code: &[i32], max_steps: usize) -> Result<Vec<BugCommand>, DecodeError> {
    let instructions = decode(code)?;
    let mut performed = Vec::new();
    // Remaining iterations for each active loop, innermost last.
    let mut remaining: Vec<i32> = Vec::new();
    let mut pc = 0usize;
    let mut steps = 0usize;

    while let Some(instruction) = instructions.get(pc) {
        steps += 1;
        if steps > max_steps {
            return Err(DecodeError::StepLimit(max_steps));
        }
        match *instruction {
            Instruction::Command { command } => {
                performed.push(command);
                pc += 1;
            }
            Instruction::LoopStart { count, .. } => {
                remaining.push(count);
                pc += 1;
            }
            Instruction::LoopEnd { start } => {
                let left = remaining.last_mut().map_or(0, |left| {
                    *left -= 1;
                    *left
                });
                if left > 0 {
                    pc = start + 1;
                } else {
                    remaining.pop();
                    pc += 1;
                }
            }
        }
    }
    Ok(performed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dsl::compile_source;
    use crate::dsl::commands::BugCommand::{Jump, Move, TurnLeft, TurnRight};

    fn code(src: &str) -> Vec<i32> {
        compile_source(src).unwrap().into_vec()
    }

    #[test]
    fn decodes_loop_structure() {
        let decoded = decode(&code("repeat 3 { jump }")).unwrap();
        assert_eq!(
            decoded,
            vec![
                Instruction::LoopStart { count: 3, end: 2 },
                Instruction::Command { command: Jump },
                Instruction::LoopEnd { start: 0 },
            ]
        );
    }

    #[test]
    fn rejects_malformed_bytecode() {
        assert_eq!(decode(&[1, 0, 2]), Err(DecodeError::OddLength(3)));
        assert_eq!(
            decode(&[1, 0, 42, 0]),
            Err(DecodeError::UnknownOpcode { index: 1, opcode: 42 })
        );
        assert_eq!(
            decode(&[10, 2, 1, 0, 11, -1]),
            Err(DecodeError::BadLoopTarget { index: 2 })
        );
        assert_eq!(decode(&[11, -1]), Err(DecodeError::BadLoopTarget { index: 0 }));
        assert_eq!(decode(&[10, 2, 1, 0]), Err(DecodeError::UnclosedLoop { index: 0 }));
        assert_eq!(
            decode(&[10, 0, 11, -1]),
            Err(DecodeError::BadLoopCount { index: 0, count: 0 })
        );
    }

    #[test]
    fn listing_indents_loop_bodies() {
        let listing = disassemble(&code("move repeat 2 { jump }")).unwrap();
        assert_eq!(
            listing,
            "0000  move\n0001  loop x2 (ends 0003)\n0002    jump\n0003  end -> 0001\n"
        );
    }

    #[test]
    fn replay_flat_program() {
        assert_eq!(
            replay(&code("move jump turnleft"), 100).unwrap(),
            vec![Move, Jump, TurnLeft]
        );
    }

    #[test]
    fn replay_expands_nested_loops() {
        let performed = replay(&code("repeat 2 { move repeat 3 { turnright } } jump"), 100).unwrap();
        assert_eq!(
            performed,
            vec![
                Move, TurnRight, TurnRight, TurnRight, Move, TurnRight, TurnRight, TurnRight, Jump,
            ]
        );
    }

    #[test]
    fn replay_is_bounded() {
        let err = replay(&code("repeat 1000000 { }"), 50).unwrap_err();
        assert_eq!(err, DecodeError::StepLimit(50));
    }
}
