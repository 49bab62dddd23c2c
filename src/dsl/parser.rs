use super::ast::{Program, Span, Stmt};
use super::commands::REPEAT_KEYWORD;
use super::error::CompileError;
use super::lexer::{Token, TokenKind};

/// Deepest allowed `repeat` nesting. Each level is one native stack frame in
/// the parser, validator, and code generator.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parse a token stream into a `Program`.
///
/// Accepts any source of lexer results, so the lexer's lazy iterator can be
/// passed straight in. Parsing stops at the first lexical or syntax error.
pub fn parse<I>(tokens: I) -> Result<Program, CompileError>
where
    I: IntoIterator<Item = Result<Token, CompileError>>,
{
    let mut parser = Parser::new(tokens.into_iter());
    parser.parse_program()
}

struct Parser<I> {
    tokens: I,
    /// One-token lookahead (LL(1)).
    lookahead: Option<Token>,
    /// End of the last consumed token, used for a synthetic EOF.
    last_end: usize,
    depth: usize,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token, CompileError>>,
{
    fn new(tokens: I) -> Self {
        Self {
            tokens,
            lookahead: None,
            last_end: 0,
            depth: 0,
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn fill(&mut self) -> Result<(), CompileError> {
        if self.lookahead.is_none() {
            // A stream that ends without Eof is treated as if it had one.
            let token = match self.tokens.next() {
                Some(result) => result?,
                None => Token::eof(self.last_end),
            };
            self.lookahead = Some(token);
        }
        Ok(())
    }

    fn peek_kind(&mut self) -> Result<TokenKind, CompileError> {
        self.fill()?;
        Ok(self.lookahead.as_ref().map_or(TokenKind::Eof, |t| t.kind))
    }

    fn advance(&mut self) -> Result<Token, CompileError> {
        self.fill()?;
        let token = self
            .lookahead
            .take()
            .unwrap_or_else(|| Token::eof(self.last_end));
        self.last_end = token.span.end;
        Ok(token)
    }

    fn unexpected(expected: &str, found: &Token) -> CompileError {
        CompileError::parser(
            format!("Expected {expected}, got {}", found.describe()),
            found.span,
        )
    }

    // ── Grammar ───────────────────────────────────────────────────

    /// `Program := Statement* EOF`
    fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut body = Vec::new();
        loop {
            match self.peek_kind()? {
                TokenKind::Eof => break,
                TokenKind::BlockClose => {
                    let token = self.advance()?;
                    return Err(CompileError::parser(
                        "Unbalanced '}' with no matching '{'",
                        token.span,
                    ));
                }
                _ => body.push(self.parse_stmt()?),
            }
        }
        Ok(Program { body })
    }

    /// `Statement := Command | Repeat`
    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Command if token.lexeme == REPEAT_KEYWORD => self.parse_repeat(token.span),
            TokenKind::Command => Ok(Stmt::Command {
                name: token.lexeme,
                span: token.span,
            }),
            _ => Err(Self::unexpected("a command", &token)),
        }
    }

    /// `Repeat := "repeat" INTEGER BLOCK_OPEN Statement* BLOCK_CLOSE`
    ///
    /// The `repeat` keyword has already been consumed.
    fn parse_repeat(&mut self, keyword_span: Span) -> Result<Stmt, CompileError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CompileError::parser(
                format!("'repeat' blocks are nested deeper than {MAX_NESTING_DEPTH} levels"),
                keyword_span,
            ));
        }

        let count_token = self.advance()?;
        let TokenKind::Integer(count) = count_token.kind else {
            return Err(Self::unexpected("a repeat count after 'repeat'", &count_token));
        };

        let open = self.advance()?;
        if open.kind != TokenKind::BlockOpen {
            return Err(Self::unexpected("'{' after the repeat count", &open));
        }

        self.depth += 1;
        let mut body = Vec::new();
        let close_span = loop {
            match self.peek_kind()? {
                TokenKind::BlockClose => break self.advance()?.span,
                TokenKind::Eof => {
                    let eof = self.advance()?;
                    return Err(CompileError::parser(
                        format!(
                            "Unclosed '{{' opened at offset {}: expected '}}' before end of script",
                            open.span.start
                        ),
                        eof.span,
                    ));
                }
                _ => body.push(self.parse_stmt()?),
            }
        };
        self.depth -= 1;

        Ok(Stmt::Repeat {
            count,
            body,
            span: keyword_span.merge(close_span),
            count_span: count_token.span,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::dsl::error::ErrorKind;
    use crate::dsl::lexer::tokenize;

    fn parse_src(src: &str) -> Program {
        parse(tokenize(src)).unwrap()
    }

    fn parse_err(src: &str) -> CompileError {
        parse(tokenize(src)).unwrap_err()
    }

    fn command(name: &str, start: usize) -> Stmt {
        Stmt::Command {
            name: name.to_string(),
            span: Span::new(start, start + name.len()),
        }
    }

    #[test]
    fn flat_commands() {
        let program = parse_src("move jump turnleft");
        assert_eq!(
            program.body,
            vec![command("move", 0), command("jump", 5), command("turnleft", 10)]
        );
    }

    #[test]
    fn empty_source_parses_to_empty_program() {
        assert!(parse_src("").body.is_empty());
        assert!(parse_src("   \n ").body.is_empty());
    }

    #[test]
    fn repeat_block() {
        let program = parse_src("repeat 3 { jump }");
        assert_eq!(program.body.len(), 1);
        match &program.body[0] {
            Stmt::Repeat {
                count,
                body,
                span,
                count_span,
            } => {
                assert_eq!(*count, 3);
                assert_eq!(body, &vec![command("jump", 11)]);
                assert_eq!(*span, Span::new(0, 17));
                assert_eq!(*count_span, Span::new(7, 8));
            }
            other => panic!("expected repeat, got {other:?}"),
        }
    }

    #[test]
    fn nested_repeat_blocks() {
        let program = parse_src("repeat 2 { move repeat 3 { turnleft } jump }");
        let Stmt::Repeat { body, .. } = &program.body[0] else {
            panic!("expected repeat");
        };
        assert_eq!(body.len(), 3);
        assert!(matches!(&body[1], Stmt::Repeat { count: 3, body, .. } if body.len() == 1));
    }

    #[test]
    fn empty_repeat_body_parses() {
        let program = parse_src("repeat 2 { }");
        assert!(matches!(&program.body[0], Stmt::Repeat { body, .. } if body.is_empty()));
    }

    #[test]
    fn repeat_is_case_insensitive() {
        let program = parse_src("REPEAT 2 { Move }");
        assert!(matches!(&program.body[0], Stmt::Repeat { count: 2, .. }));
    }

    #[test]
    fn unknown_commands_are_left_for_the_validator() {
        let program = parse_src("fly up");
        assert_eq!(program.body, vec![command("fly", 0), command("up", 4)]);
    }

    #[test]
    fn stray_integer_is_an_error() {
        let err = parse_err("move 3");
        assert_eq!(err.kind, ErrorKind::Parser);
        assert!(err.message.contains("integer '3'"), "{}", err.message);
        assert_eq!(err.span, Span::new(5, 6));
    }

    #[test]
    fn missing_count_is_an_error() {
        let err = parse_err("repeat { jump }");
        assert!(err.message.contains("repeat count"), "{}", err.message);
        assert_eq!(err.span.start, 7);
    }

    #[test]
    fn missing_open_brace_is_an_error() {
        let err = parse_err("repeat 3 jump");
        assert!(err.message.contains("'jump'"), "{}", err.message);
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let err = parse_err("repeat 3 { jump");
        assert!(err.message.contains("Unclosed"), "{}", err.message);
        assert_eq!(err.span, Span::new(15, 15));
    }

    #[test]
    fn unbalanced_close_is_an_error() {
        let err = parse_err("move }");
        assert!(err.message.contains("Unbalanced"), "{}", err.message);
        assert_eq!(err.span, Span::new(5, 6));
    }

    #[test]
    fn stray_open_brace_is_an_error() {
        let err = parse_err("{ move }");
        assert!(err.message.contains("'{'"), "{}", err.message);
    }

    #[test]
    fn first_error_wins() {
        // Both the stray integer and the stray brace are errors; the integer comes first.
        let err = parse_err("move 5 }");
        assert!(err.message.contains("integer '5'"));
    }

    #[test]
    fn lexer_errors_surface_through_parse() {
        let err = parse_err("move 4abc jump");
        assert_eq!(err.kind, ErrorKind::Lexer);
    }

    #[test]
    fn nesting_limit() {
        let ok = "repeat 1 { ".repeat(MAX_NESTING_DEPTH) + &"}".repeat(MAX_NESTING_DEPTH);
        assert!(parse(tokenize(&ok)).is_ok());

        let deep = "repeat 1 { ".repeat(MAX_NESTING_DEPTH + 1) + &"}".repeat(MAX_NESTING_DEPTH + 1);
        let err = parse(tokenize(&deep)).unwrap_err();
        assert!(err.message.contains("nested deeper"));
    }

    #[test]
    fn stream_without_eof_is_accepted() {
        let tokens: Vec<_> = tokenize("move")
            .filter(|t| !matches!(t, Ok(Token { kind: TokenKind::Eof, .. })))
            .collect();
        assert_eq!(parse(tokens).unwrap().body.len(), 1);
    }
}
