use serde::Serialize;

use super::ast::{Program, Span, Stmt};
use super::commands::{BugCommand, INSTRUCTION_WIDTH, LOOP_END, LOOP_START};
use super::error::CompileError;

/// Flat compiled script: a sequence of `[opcode, operand]` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Bytecode(Vec<i32>);

impl Bytecode {
    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<i32> {
        self.0
    }

    pub fn instruction_count(&self) -> usize {
        self.0.len() / INSTRUCTION_WIDTH
    }
}

/// Emit bytecode for a validated program.
pub fn generate(program: &Program) -> Result<Bytecode, CompileError> {
    let mut generator = Generator { code: Vec::new() };
    generator.emit_block(&program.body)?;
    Ok(Bytecode(generator.code))
}

struct Generator {
    code: Vec<i32>,
}

impl Generator {
    fn emit(&mut self, opcode: i32, operand: i32) {
        self.code.push(opcode);
        self.code.push(operand);
    }

    /// Index of the next instruction to be emitted.
    fn current_instruction(&self) -> usize {
        self.code.len() / INSTRUCTION_WIDTH
    }

    fn emit_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        stmts.iter().try_for_each(|stmt| self.emit_stmt(stmt))
    }

    #[allow(clippy::unreachable)]
    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Command { name, .. } => {
                let Some(command) = BugCommand::from_keyword(name) else {
                    unreachable!("unknown command '{name}' reached code generation");
                };
                self.emit(command.opcode(), 0);
                Ok(())
            }
            Stmt::Repeat {
                count,
                body,
                span,
                count_span,
            } => {
                let count = i32::try_from(*count).map_err(|_| {
                    CompileError::compiler(
                        format!("Repeat count {count} does not fit an instruction operand"),
                        *count_span,
                    )
                })?;
                let start = self.current_instruction();
                self.emit(LOOP_START, count);
                self.emit_block(body)?;
                let offset = self.loop_offset(start, *span)?;
                self.emit(LOOP_END, -offset);
                Ok(())
            }
        }
    }

    /// Instruction distance from `start` to the `LOOP_END` about to be emitted.
    fn loop_offset(&self, start: usize, span: Span) -> Result<i32, CompileError> {
        let distance = self.current_instruction() - start;
        i32::try_from(distance).map_err(|_| {
            CompileError::compiler(
                format!("Loop body spans {distance} instructions, beyond the branch range"),
                span,
            )
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use crate::dsl::lexer::tokenize;
    use crate::dsl::parser::parse;
    use crate::dsl::validate::validate;

    fn gen_src(src: &str) -> Vec<i32> {
        let program = validate(parse(tokenize(src)).unwrap()).unwrap();
        generate(&program).unwrap().into_vec()
    }

    #[test]
    fn flat_commands() {
        assert_eq!(gen_src("move jump turnleft"), vec![1, 0, 2, 0, 3, 0]);
        assert_eq!(gen_src("turnright"), vec![4, 0]);
    }

    #[test]
    fn single_loop() {
        assert_eq!(gen_src("repeat 3 { jump }"), vec![10, 3, 2, 0, 11, -2]);
    }

    #[test]
    fn empty_loop_body() {
        assert_eq!(gen_src("repeat 5 { }"), vec![10, 5, 11, -1]);
    }

    #[test]
    fn nested_loops_point_at_their_own_start() {
        let code = gen_src("move repeat 2 { jump repeat 4 { turnleft } } turnright");
        assert_eq!(
            code,
            vec![
                1, 0, // 0: move
                10, 2, // 1: loop start x2
                2, 0, // 2: jump
                10, 4, // 3: loop start x4
                3, 0, // 4: turnleft
                11, -2, // 5: -> 3
                11, -5, // 6: -> 1
                4, 0, // 7: turnright
            ]
        );
    }

    #[test]
    fn loop_end_lands_on_loop_start() {
        let code = gen_src("repeat 2 { move repeat 3 { jump jump } turnleft }");
        for (index, pair) in code.chunks(2).enumerate() {
            if pair[0] == LOOP_END {
                let target = usize::try_from(index as i64 + i64::from(pair[1])).unwrap();
                assert_eq!(code[target * 2], LOOP_START);
            }
        }
    }

    #[test]
    fn bytecode_helpers() {
        let program = validate(parse(tokenize("move jump")).unwrap()).unwrap();
        let code = generate(&program).unwrap();
        assert_eq!(code.instruction_count(), 2);
        assert_eq!(code.as_slice(), &[1, 0, 2, 0]);
        assert_eq!(serde_json::to_string(&code).unwrap(), "[1,0,2,0]");
    }
}
