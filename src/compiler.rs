//! Compile a stored AI script by id.
//!
//! The compiler resolves script text through a read-only [`ScriptLookup`] and
//! runs it through the DSL pipeline. Every failure is collapsed into one of two
//! externally visible [`Diagnostic`] kinds; the stage detail is logged and kept
//! on the diagnostic for tooling.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::dsl::codegen::Bytecode;
use crate::dsl::error::CompileError;

pub const NOT_FOUND_MESSAGE: &str = "An AIScript with that ID does not exist";
pub const PARSE_ERROR_MESSAGE: &str = "Error parsing script";

/// A named AI script as stored by the surrounding system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Script {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub text: String,
}

/// Read-only access to stored scripts.
pub trait ScriptLookup {
    fn find_by_id(&self, id: i64) -> Option<Script>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    NotFound,
    ParseError,
}

/// Why a script could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Byte offset into the script text where the failing stage stopped.
    pub position: Option<usize>,
    /// The failing stage's own message, e.g. `Unknown command 'fly' ...`.
    pub detail: Option<String>,
}

impl Diagnostic {
    pub fn not_found() -> Self {
        Self {
            kind: DiagnosticKind::NotFound,
            message: NOT_FOUND_MESSAGE.to_string(),
            position: None,
            detail: None,
        }
    }

    pub fn parse_error(err: &CompileError) -> Self {
        Self {
            kind: DiagnosticKind::ParseError,
            message: PARSE_ERROR_MESSAGE.to_string(),
            position: Some(err.span.start),
            detail: Some(err.message.clone()),
        }
    }
}

/// Compiles scripts fetched from a lookup. Holds no state between calls.
pub struct ScriptCompiler<'a, L: ScriptLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: ScriptLookup + ?Sized> ScriptCompiler<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    pub fn compile(&self, id: i64) -> Result<Bytecode, Diagnostic> {
        let Some(script) = self.lookup.find_by_id(id) else {
            tracing::debug!(id, "compile requested for unknown script");
            return Err(Diagnostic::not_found());
        };
        let bytecode = compile_text(&script.text).map_err(|err| {
            tracing::warn!(
                id,
                name = %script.name,
                stage = err.kind.label(),
                position = err.span.start,
                "{}",
                err.format_with_source(&script.text)
            );
            Diagnostic::parse_error(&err)
        })?;
        tracing::debug!(
            id,
            name = %script.name,
            instructions = bytecode.instruction_count(),
            "compiled script"
        );
        Ok(bytecode)
    }
}

/// Compile raw text without a lookup, mapping failures the same way `compile` does.
pub fn compile_source(text: &str) -> Result<Bytecode, Diagnostic> {
    compile_text(text).map_err(|err| {
        tracing::debug!("{}", err.format_with_source(text));
        Diagnostic::parse_error(&err)
    })
}

fn compile_text(text: &str) -> Result<Bytecode, CompileError> {
    crate::dsl::compile_source(text)
}
