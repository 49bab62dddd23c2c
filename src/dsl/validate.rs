use super::ast::{Program, Span, Stmt};
use super::commands::{known_keywords, BugCommand};
use super::error::CompileError;

/// Check a parsed program before code generation.
///
/// Rejects empty programs, unknown commands, and repeat counts that are not
/// positive or do not fit an instruction operand. The first violation in
/// source order is reported. The program is returned unchanged on success.
pub fn validate(program: Program) -> Result<Program, CompileError> {
    if program.body.is_empty() {
        return Err(CompileError::validation(
            "Script is an empty program: it contains no commands",
            Span::new(0, 0),
        ));
    }
    check_block(&program.body)?;
    Ok(program)
}

fn check_block(stmts: &[Stmt]) -> Result<(), CompileError> {
    stmts.iter().try_for_each(check_stmt)
}

fn check_stmt(stmt: &Stmt) -> Result<(), CompileError> {
    match stmt {
        Stmt::Command { name, span } => {
            if BugCommand::from_keyword(name).is_none() {
                return Err(CompileError::validation(
                    format!(
                        "Unknown command '{name}' (expected one of: {})",
                        known_keywords()
                    ),
                    *span,
                ));
            }
            Ok(())
        }
        Stmt::Repeat {
            count,
            body,
            count_span,
            ..
        } => {
            if *count <= 0 {
                return Err(CompileError::validation(
                    format!("Repeat count must be greater than zero, got {count}"),
                    *count_span,
                ));
            }
            if i32::try_from(*count).is_err() {
                return Err(CompileError::validation(
                    format!("Repeat count {count} is too large (max {})", i32::MAX),
                    *count_span,
                ));
            }
            // An empty body is legal: the loop runs but performs nothing.
            check_block(body)
        }
    }
}
