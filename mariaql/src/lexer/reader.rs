use super::token::{Token, TokenKind};
use thiserror::Error;

/// Raised by `expect`-style reader methods; the parser wraps it into its own
/// syntax error with source position attached.
#[derive(Debug, Error, PartialEq)]
#[error("expected {expected}, found {found}")]
pub struct Mismatch {
    pub position: usize,
    pub expected: String,
    pub found: String,
}

/// Positional cursor over a token stream with lookahead. This is the sole
/// interface by which the parser and clause sub-parsers consume tokens.
///
/// A reader may be restricted to a sub-range via [`TokenReader::slice`];
/// past the end of its range it reports the stream's `Eof` token, so clause
/// sub-parsers terminate at their clause boundary without special casing.
#[derive(Debug, Clone)]
pub struct TokenReader<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: usize,
}

impl<'a> TokenReader<'a> {
    /// The token slice must end with an `Eof` token; the lexer guarantees it.
    pub fn new(tokens: &'a [Token]) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            pos: 0,
            end: tokens.len() - 1,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    pub fn current(&self) -> &'a Token {
        self.peek(0)
    }

    /// Look `k` tokens ahead without consuming; reports `Eof` past the range.
    pub fn peek(&self, k: usize) -> &'a Token {
        let idx = self.pos + k;
        if idx < self.end {
            &self.tokens[idx]
        } else {
            &self.tokens[self.tokens.len() - 1]
        }
    }

    /// Consume and return the current token.
    pub fn next(&mut self) -> &'a Token {
        let tok = self.current();
        self.advance();
        tok
    }

    pub fn advance(&mut self) {
        if self.pos < self.end {
            self.pos += 1;
        }
    }

    /// Consume the current token if it matches `kind`.
    pub fn consume_if(&mut self, kind: &TokenKind) -> bool {
        if &self.current().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the current token if it is the given reserved word.
    pub fn consume_keyword(&mut self, word: &str) -> bool {
        if self.current().is_keyword(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the current token if it is an unreserved identifier whose
    /// uppercase form equals `word` (contextual keywords such as AGAINST).
    pub fn consume_name(&mut self, word: &str) -> bool {
        match self.current().name() {
            Some(n) if n.eq_ignore_ascii_case(word) => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    pub fn expect(&mut self, kind: &TokenKind) -> Result<&'a Token, Mismatch> {
        if &self.current().kind == kind {
            Ok(self.next())
        } else {
            Err(self.mismatch(&kind.describe()))
        }
    }

    pub fn expect_keyword(&mut self, word: &str) -> Result<&'a Token, Mismatch> {
        if self.current().is_keyword(word) {
            Ok(self.next())
        } else {
            Err(self.mismatch(word))
        }
    }

    pub fn mismatch(&self, expected: &str) -> Mismatch {
        Mismatch {
            position: self.current().span.start as usize,
            expected: expected.to_string(),
            found: self.current().kind.describe(),
        }
    }

    /// A sub-reader restricted to the token range `[a, b)`.
    pub fn slice(&self, a: usize, b: usize) -> TokenReader<'a> {
        let end = b.min(self.end);
        TokenReader {
            tokens: self.tokens,
            pos: a.min(end),
            end,
        }
    }
}
