//! A token source with one token of lookahead.
//!
//! Streams stack: alias expansions push a new stream that is popped
//! automatically once it runs dry, so scanning continues in the stream
//! underneath.

use std::sync::Arc;

use crate::lexer::{Token, TokenKind};
use crate::span::{Position, SourceFile};

#[derive(Debug, Clone)]
struct Stream {
    tokens: Arc<[Token]>,
    cursor: usize,
}

impl Stream {
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }
}

#[derive(Debug, Clone)]
pub struct TokenSource {
    streams: Vec<Stream>,
    last: Option<Token>,
    eof: Token,
}

impl TokenSource {
    /// A source over a whole token vector.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::from_shared(tokens.into(), 0)
    }

    /// A source that starts scanning at `cursor` of a shared vector.
    pub fn from_shared(tokens: Arc<[Token]>, cursor: usize) -> Self {
        let eof = match tokens.last() {
            Some(last) => Token {
                kind: TokenKind::Eof,
                text: String::new(),
                position: last.position.clone(),
            },
            None => Token {
                kind: TokenKind::Eof,
                text: String::new(),
                position: Position::new(SourceFile::new("<empty>", ""), 1, 1),
            },
        };
        Self {
            streams: vec![Stream { tokens, cursor }],
            last: None,
            eof,
        }
    }

    /// Scan `tokens` before anything left in the current stream.
    pub fn push(&mut self, tokens: Vec<Token>) {
        self.streams.push(Stream {
            tokens: tokens.into(),
            cursor: 0,
        });
    }

    /// How many streams are stacked, the base stream included.
    pub fn depth(&self) -> usize {
        self.streams.len()
    }

    /// Cursor into the base stream.
    pub fn cursor(&self) -> usize {
        self.streams.first().map_or(0, |stream| stream.cursor)
    }

    fn settle(&mut self) {
        while self.streams.len() > 1
            && self
                .streams
                .last()
                .is_some_and(|stream| stream.current().is_none())
        {
            self.streams.pop();
        }
    }

    pub fn peek(&mut self) -> &Token {
        self.settle();
        match self.streams.last().and_then(Stream::current) {
            Some(token) => token,
            None => &self.eof,
        }
    }

    /// Consume one token. Once the input is exhausted this keeps
    /// returning the end-of-input token.
    pub fn next(&mut self) -> Token {
        self.settle();
        let token = match self.streams.last_mut() {
            Some(stream) => match stream.tokens.get(stream.cursor) {
                Some(token) => {
                    let token = token.clone();
                    if token.kind != TokenKind::Eof {
                        stream.cursor += 1;
                    }
                    token
                }
                None => self.eof.clone(),
            },
            None => self.eof.clone(),
        };
        self.last = Some(token.clone());
        token
    }

    /// Consume the next token only when it reads `text`.
    pub fn scan_if(&mut self, text: &str) -> bool {
        if self.peek().is(text) {
            self.next();
            true
        } else {
            false
        }
    }

    /// The most recently consumed token.
    pub fn last(&self) -> Option<&Token> {
        self.last.as_ref()
    }

    /// Where diagnostics point: the last consumed token, or the end of
    /// input when nothing was consumed yet.
    pub fn here(&self) -> &Position {
        self.last.as_ref().map_or(&self.eof.position, |token| &token.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn source(text: &str) -> TokenSource {
        TokenSource::new(lex(&SourceFile::new("test.sk", text)).unwrap())
    }

    #[test]
    fn pushed_streams_pop_when_exhausted() {
        let mut tokens = source("a b");
        let expansion = lex(&SourceFile::new("alias.sk", "x y"))
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .collect();
        assert_eq!(tokens.next().text, "a");
        tokens.push(expansion);
        assert_eq!(tokens.depth(), 2);
        let rest: Vec<String> = (0..3).map(|_| tokens.next().text).collect();
        assert_eq!(rest, ["x", "y", "b"]);
        assert_eq!(tokens.depth(), 1);
    }

    #[test]
    fn end_of_input_is_sticky() {
        let mut tokens = source("a");
        tokens.next();
        assert_eq!(tokens.next().kind, TokenKind::Eof);
        assert_eq!(tokens.next().kind, TokenKind::Eof);
        assert!(!tokens.scan_if("a"));
    }
}
