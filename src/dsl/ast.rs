//! AST node types for the bug script language.

use serde::Serialize;

/// Source span for error reporting. Offsets are byte positions into the script text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A complete parsed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// Statements in a program or a `repeat` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Stmt {
    /// A single bug command, e.g. `move`. The name is already lowercased.
    Command { name: String, span: Span },
    /// `repeat 3 { ... }`
    Repeat {
        count: i64,
        body: Vec<Stmt>,
        /// Span of the `repeat` keyword through the closing brace.
        span: Span,
        /// Span of the count literal, used to point validation errors at it.
        count_span: Span,
    },
}
