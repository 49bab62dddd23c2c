use std::iter::FusedIterator;

use serde::Serialize;

use super::ast::Span;
use super::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum TokenKind {
    /// A word. Known commands, `repeat`, and unknown words all lex to this;
    /// the parser and validator tell them apart.
    Command,
    Integer(i64),
    BlockOpen,
    BlockClose,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token. Command words are lowercased.
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    fn new(kind: TokenKind, lexeme: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span: Span::new(start, end),
        }
    }

    pub(super) fn eof(pos: usize) -> Self {
        Self::new(TokenKind::Eof, "", pos, pos)
    }

    /// Human-readable description used in parser errors.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of script".to_string(),
            TokenKind::Integer(_) => format!("integer '{}'", self.lexeme),
            _ => format!("'{}'", self.lexeme),
        }
    }
}

/// Start lexing `source`. Tokens are produced on demand; the sequence ends with
/// exactly one `Eof` token, or stops after the first lexical error.
pub fn tokenize(source: &str) -> Lexer<'_> {
    Lexer::new(source)
}

/// Lex the whole source eagerly. Used by tooling that wants the full token list.
pub fn lex(source: &str) -> Result<Vec<Token>, CompileError> {
    tokenize(source).collect()
}

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            finished: false,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                c if c.is_ascii_whitespace() => self.pos += 1,
                // Line comments, `//` or `--` style: skip to end of line
                b'/' if self.peek_next() == Some(b'/') => self.skip_line(),
                b'-' if self.peek_next() == Some(b'-') => self.skip_line(),
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while self.peek().is_some_and(|c| c != b'\n') {
            self.pos += 1;
        }
    }

    fn lex_word(&mut self, start: usize) -> Result<Token, CompileError> {
        while self
            .peek()
            .is_some_and(|c| !c.is_ascii_whitespace() && c != b'{' && c != b'}')
        {
            self.pos += 1;
        }
        // Word boundaries are ASCII bytes, so the slice is always on a char boundary.
        let word = self.source.get(start..self.pos).unwrap_or_default();
        let span = Span::new(start, self.pos);

        if looks_numeric(word) {
            let digits = word.trim_start_matches(['-', '+']);
            if !digits.bytes().all(|c| c.is_ascii_digit()) {
                return Err(CompileError::lexer(
                    format!("Malformed integer literal '{word}'"),
                    span,
                ));
            }
            return match word.parse::<i64>() {
                Ok(v) => Ok(Token::new(TokenKind::Integer(v), word, start, self.pos)),
                Err(_) => Err(CompileError::lexer(
                    format!("Integer literal '{word}' is out of range"),
                    span,
                )),
            };
        }

        Ok(Token::new(
            TokenKind::Command,
            word.to_lowercase(),
            start,
            self.pos,
        ))
    }
}

/// A word is a numeral if it starts with a digit, or with a sign followed by a digit.
fn looks_numeric(word: &str) -> bool {
    let mut bytes = word.bytes();
    match bytes.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some(b'-' | b'+') => bytes.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        self.skip_whitespace_and_comments();
        let start = self.pos;

        let result = match self.peek() {
            None => {
                self.finished = true;
                Ok(Token::eof(start))
            }
            Some(b'{') => {
                self.pos += 1;
                Ok(Token::new(TokenKind::BlockOpen, "{", start, self.pos))
            }
            Some(b'}') => {
                self.pos += 1;
                Ok(Token::new(TokenKind::BlockClose, "}", start, self.pos))
            }
            Some(_) => self.lex_word(start),
        };

        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

impl FusedIterator for Lexer<'_> {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn kinds(s: &str) -> Vec<TokenKind> {
        lex(s).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lexemes(s: &str) -> Vec<String> {
        lex(s).unwrap().into_iter().map(|t| t.lexeme).collect()
    }

    #[test]
    fn simple_commands() {
        assert_eq!(
            kinds("move jump turnleft"),
            vec![TokenKind::Command, TokenKind::Command, TokenKind::Command, TokenKind::Eof]
        );
        assert_eq!(lexemes("move jump turnleft"), vec!["move", "jump", "turnleft", ""]);
    }

    #[test]
    fn commands_are_lowercased() {
        assert_eq!(lexemes("JUMP TurnLeft"), vec!["jump", "turnleft", ""]);
    }

    #[test]
    fn empty_source_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("  \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn braces_split_words() {
        assert_eq!(
            kinds("repeat 3{jump}"),
            vec![
                TokenKind::Command,
                TokenKind::Integer(3),
                TokenKind::BlockOpen,
                TokenKind::Command,
                TokenKind::BlockClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn negative_and_signed_integers() {
        assert_eq!(
            kinds("-1 +2 0"),
            vec![
                TokenKind::Integer(-1),
                TokenKind::Integer(2),
                TokenKind::Integer(0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn malformed_numeral_is_an_error() {
        let err = lex("move 3x").unwrap_err();
        assert!(err.message.contains("'3x'"), "{}", err.message);
        assert_eq!(err.span, Span::new(5, 7));
    }

    #[test]
    fn bare_sign_is_a_word() {
        assert_eq!(kinds("- +"), vec![TokenKind::Command, TokenKind::Command, TokenKind::Eof]);
    }

    #[test]
    fn overflowing_numeral_is_an_error() {
        let err = lex("repeat 99999999999999999999 { move }").unwrap_err();
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn unknown_words_still_lex_as_commands() {
        let tokens = lex("fly up").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Command);
        assert_eq!(tokens[0].lexeme, "fly");
        assert_eq!(tokens[1].span, Span::new(4, 6));
    }

    #[test]
    fn comments_stripped() {
        assert_eq!(
            lexemes("move // go forward\n-- and now\njump"),
            vec!["move", "jump", ""]
        );
    }

    #[test]
    fn double_dash_always_starts_a_comment() {
        // `--3` is a comment, not a doubly negated count.
        assert_eq!(lexemes("repeat --3 { move }"), vec!["repeat", ""]);
        assert_eq!(lexemes("move--jump
turnleft"), vec!["move", "turnleft", ""]);
        assert_eq!(kinds("-3")[0], TokenKind::Integer(-3));
    }

    #[test]
    fn spans_are_byte_offsets() {
        let tokens = lex("  move\n jump").unwrap();
        assert_eq!(tokens[0].span, Span::new(2, 6));
        assert_eq!(tokens[1].span, Span::new(8, 12));
        assert_eq!(tokens[2].span, Span::new(12, 12));
    }

    #[test]
    fn lexing_is_lazy_and_stops_after_error() {
        let mut lexer = tokenize("move 1x jump");
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn eof_is_emitted_once() {
        let mut lexer = tokenize("move");
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Command);
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Eof);
        assert!(lexer.next().is_none());
    }
}
