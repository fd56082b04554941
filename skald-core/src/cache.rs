//! Captured token runs for deferred compilation.
//!
//! A concept body is read once while declarations are collected and
//! compiled later, once per instantiation, by replaying the captured
//! tokens.

use std::sync::Arc;

use crate::error::{CoreError, ErrorKind, Result};
use crate::lexer::{Token, TokenKind};
use crate::scanner::TokenSource;

#[derive(Debug, Clone)]
pub struct Cache {
    tokens: Arc<[Token]>,
    pub file: String,
    pub line: u32,
}

impl Cache {
    /// Capture a block: `{ ... }` up to the matching brace, or `: ...`
    /// up to the end of the line. The opener itself is consumed too.
    pub fn capture(source: &mut TokenSource) -> Result<Self> {
        let opener = source.next();
        let mut tokens = Vec::new();
        if opener.is(":") {
            while !source.peek().ends_line() {
                tokens.push(source.next());
            }
        } else if opener.is("{") {
            let mut depth = 1usize;
            loop {
                let token = source.next();
                if token.kind == TokenKind::Eof {
                    return Err(unterminated(&token, "'}'"));
                }
                if token.is("{") {
                    depth += 1;
                } else if token.is("}") {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                tokens.push(token);
            }
        } else {
            return Err(unterminated(&opener, "'{' or ':'"));
        }

        let end = source.last().unwrap_or(&opener).position.clone();
        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            position: end,
        });
        Ok(Self {
            tokens: tokens.into(),
            file: opener.position.file.name.clone(),
            line: opener.position.line,
        })
    }

    /// A fresh source over the captured tokens.
    pub fn replay(&self) -> TokenSource {
        TokenSource::from_shared(Arc::clone(&self.tokens), 0)
    }

    /// Captured tokens, the closing end-of-input marker included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.len() <= 1
    }
}

fn unterminated(token: &Token, expected: &str) -> CoreError {
    CoreError::compile(
        ErrorKind::SyntaxExpectation {
            expected: expected.to_string(),
            found: token.describe(),
        },
        token.position.location(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::span::SourceFile;

    fn source(text: &str) -> TokenSource {
        TokenSource::new(lex(&SourceFile::new("cache.sk", text)).unwrap())
    }

    fn texts(cache: &Cache) -> Vec<String> {
        let mut replay = cache.replay();
        let mut out = Vec::new();
        loop {
            let token = replay.next();
            if token.kind == TokenKind::Eof {
                return out;
            }
            out.push(token.text);
        }
    }

    #[test]
    fn captures_nested_braces() {
        let mut tokens = source("{ if x { y } }\nafter");
        let cache = Cache::capture(&mut tokens).unwrap();
        assert_eq!(texts(&cache), ["if", "x", "{", "y", "}"]);
        assert_eq!(tokens.next().kind, TokenKind::Newline);
        assert_eq!(tokens.next().text, "after");
    }

    #[test]
    fn colon_captures_to_end_of_line() {
        let mut tokens = source(": return a + b\nnext");
        let cache = Cache::capture(&mut tokens).unwrap();
        assert_eq!(texts(&cache), ["return", "a", "+", "b"]);
        assert_eq!(cache.line, 1);
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let mut tokens = source("{ return 1\n");
        let error = Cache::capture(&mut tokens).unwrap_err();
        assert!(matches!(
            error.kind(),
            Some(ErrorKind::SyntaxExpectation { .. })
        ));
    }
}
