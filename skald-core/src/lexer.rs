//! Lexer for skald sources.
//!
//! The lexer is intentionally simple: it does not attach meaning to
//! words or punctuation. Newlines are tokens because they end
//! statements and expressions.

use std::sync::Arc;

use crate::error::{CoreError, ErrorKind, Result};
use crate::span::{Position, SourceFile};

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifiers and keywords.
    Word,
    /// Decimal, binary or `0x` hexadecimal integers, and decimals.
    Number,
    /// A `"double quoted"` string, quotes included.
    Text,
    /// A `'c'` symbol literal, quotes included.
    Symbol,
    Punct,
    Newline,
    Eof,
}

/// A single token with its kind, text and start position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    /// True for a word or punctuation token spelled exactly `text`.
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::Punct) && self.text == text
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    /// True for tokens that end a statement.
    pub fn ends_line(&self) -> bool {
        matches!(self.kind, TokenKind::Newline | TokenKind::Eof)
    }

    /// How the token reads in a "found ..." message.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

/// Lex a whole source file. The returned tokens always end with
/// [`TokenKind::Eof`].
pub fn lex(file: &Arc<SourceFile>) -> Result<Vec<Token>> {
    let mut lexer = Lexer {
        file,
        source: &file.text,
        chars: file.text.as_bytes(),
        index: 0,
        line: 1,
        line_start: 0,
    };
    lexer.run()
}

struct Lexer<'src> {
    file: &'src Arc<SourceFile>,
    source: &'src str,
    chars: &'src [u8],
    index: usize,
    line: u32,
    line_start: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            let start = self.index;
            let token = match ch {
                b' ' | b'\t' | b'\r' => {
                    self.consume_char();
                    continue;
                }
                b'\n' => {
                    let token = self.token(TokenKind::Newline, start, start + 1);
                    self.consume_char();
                    self.line += 1;
                    self.line_start = self.index;
                    token
                }
                b'/' if self.peek_next() == Some(b'/') => {
                    while self.peek_char().is_some_and(|c| c != b'\n') {
                        self.consume_char();
                    }
                    continue;
                }
                b'.' if self.peek_next() == Some(b'.') => {
                    self.consume_char();
                    self.consume_char();
                    if self.peek_char() != Some(b'.') {
                        return Err(self.unexpected(start, "'...'"));
                    }
                    self.consume_char();
                    self.token(TokenKind::Punct, start, self.index)
                }
                b'"' => self.lex_quoted(b'"', TokenKind::Text, start)?,
                b'\'' => self.lex_quoted(b'\'', TokenKind::Symbol, start)?,
                b'0'..=b'9' => self.lex_number(start),
                b'(' | b')' | b'{' | b'}' | b'[' | b']' | b',' | b':' | b';' | b'.' | b'+'
                | b'-' | b'*' | b'/' | b'%' | b'^' | b'=' | b'<' | b'>' | b'!' | b'&' | b'|' => {
                    self.consume_char();
                    self.token(TokenKind::Punct, start, self.index)
                }
                _ if is_word_start(ch) => {
                    while self.peek_char().is_some_and(is_word_continue) {
                        self.consume_char();
                    }
                    self.token(TokenKind::Word, start, self.index)
                }
                _ => return Err(self.unexpected(start, "a token")),
            };
            tokens.push(token);
        }

        tokens.push(self.token(TokenKind::Eof, self.index, self.index));
        Ok(tokens)
    }

    fn position(&self, start: usize) -> Position {
        let column = self.source[self.line_start..start].chars().count() + 1;
        Position::new(self.file.clone(), self.line, column as u32)
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize) -> Token {
        let text = if kind == TokenKind::Newline {
            "\n".to_string()
        } else {
            self.source[start..end].to_string()
        };
        Token {
            kind,
            text,
            position: self.position(start),
        }
    }

    fn unexpected(&self, start: usize, expected: &str) -> CoreError {
        let found = self.source[start..]
            .chars()
            .next()
            .map_or_else(|| "end of input".to_string(), |c| format!("'{c}'"));
        CoreError::compile(
            ErrorKind::SyntaxExpectation {
                expected: expected.to_string(),
                found,
            },
            self.position(start).location(),
        )
    }

    fn lex_quoted(&mut self, quote: u8, kind: TokenKind, start: usize) -> Result<Token> {
        // Consume the opening quote
        self.consume_char();

        while let Some(ch) = self.peek_char() {
            match ch {
                b'\n' => break,
                b'\\' => {
                    // Skip over escape sequence: backslash + next char (if any)
                    self.consume_char();
                    if self.peek_char().is_some_and(|c| c != b'\n') {
                        self.consume_char();
                    }
                }
                _ if ch == quote => {
                    self.consume_char();
                    return Ok(self.token(kind, start, self.index));
                }
                _ => self.consume_char(),
            }
        }

        Err(CoreError::compile(
            ErrorKind::SyntaxExpectation {
                expected: format!("closing {}", quote as char),
                found: "end of line".to_string(),
            },
            self.position(start).location(),
        ))
    }

    fn lex_number(&mut self, start: usize) -> Token {
        if self.peek_char() == Some(b'0') && self.peek_next() == Some(b'x') {
            self.consume_char();
            self.consume_char();
            while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.consume_char();
            }
            return self.token(TokenKind::Number, start, self.index);
        }

        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
        }

        // A '.' only continues the number when a digit follows, so that
        // `xs.0` style member access never swallows the dot.
        if self.peek_char() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.consume_char();
            }
        }

        self.token(TokenKind::Number, start, self.index)
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        self.index += 1;
        // Stay on a character boundary for multi-byte text inside quotes.
        while self.index < self.chars.len() && !self.source.is_char_boundary(self.index) {
            self.index += 1;
        }
    }
}

fn is_word_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_word_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_text(source: &str) -> Vec<(TokenKind, String)> {
        let file = SourceFile::new("test.sk", source);
        lex(&file)
            .unwrap()
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect()
    }

    #[test]
    fn lexes_statement_with_positions() {
        let file = SourceFile::new("test.sk", "x = 0x1F + 2.5\nprint(x)");
        let tokens = lex(&file).unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            ["x", "=", "0x1F", "+", "2.5", "\n", "print", "(", "x", ")", ""]
        );
        assert_eq!(tokens[6].position.line, 2);
        assert_eq!(tokens[6].position.column, 1);
        assert_eq!(tokens[8].position.column, 7);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn quoted_literals_keep_their_quotes() {
        let tokens = kinds_and_text(r#"greet("hi \"you\"", 'a')"#);
        assert_eq!(tokens[2], (TokenKind::Text, r#""hi \"you\"""#.to_string()));
        assert_eq!(tokens[4], (TokenKind::Symbol, "'a'".to_string()));
    }

    #[test]
    fn comments_are_skipped_and_ellipsis_is_one_token() {
        let tokens = kinds_and_text("f(xs...) // trailing\n");
        let texts: Vec<&str> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, ["f", "(", "xs", "...", ")", "\n", ""]);
    }

    #[test]
    fn unterminated_string_reports_position() {
        let file = SourceFile::new("test.sk", "x = \"oops\n");
        let error = lex(&file).unwrap_err();
        let diagnostic = error.diagnostic().unwrap();
        assert_eq!(diagnostic.location.column, 5);
        assert!(matches!(
            diagnostic.kind,
            ErrorKind::SyntaxExpectation { .. }
        ));
    }

    #[test]
    fn unexpected_character_is_an_error() {
        let file = SourceFile::new("test.sk", "x = @");
        assert!(lex(&file).is_err());
    }
}
