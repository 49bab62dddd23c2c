pub mod ast;
pub mod codegen;
pub mod commands;
pub mod disasm;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod validate;

use codegen::Bytecode;
use error::CompileError;

/// Compile script text into bytecode.
///
/// This is the whole pipeline with no store lookup:
/// text → lex → parse → validate → generate → `Bytecode`
pub fn compile_source(source: &str) -> Result<Bytecode, CompileError> {
    let program = parser::parse(lexer::tokenize(source))?;
    let program = validate::validate(program)?;
    codegen::generate(&program)
}
