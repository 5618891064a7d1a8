//! SQL lexer. One left-to-right pass over the source bytes producing a flat
//! token sequence. The lexer is total: malformed input becomes an `Error`
//! token rather than a failure, and the parser reports it as a syntax error.
//!
//! Keyword recognition is an exact uppercase comparison against the closed
//! reserved-word set selected by the dialect. No pattern matching on the
//! source happens above this layer.

mod reader;
mod token;

#[cfg(test)]
mod test;

pub use reader::{Mismatch, TokenReader};
pub use token::{ReservedWordDialect, Span, Token, TokenKind};

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    dialect: ReservedWordDialect,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, dialect: ReservedWordDialect) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            dialect,
        }
    }

    /// Tokenize the entire input. The returned sequence always ends with an
    /// `Eof` token; whitespace and comments are dropped here.
    pub fn tokenize(source: &'a str, dialect: ReservedWordDialect) -> Vec<Token> {
        let mut lexer = Self::new(source, dialect);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.pos;
        let start_line = self.line;
        let start_col = self.col;

        if self.pos >= self.src.len() {
            return Token {
                kind: TokenKind::Eof,
                span: Span::new(start as u32, start as u32),
                line: start_line,
                col: start_col,
            };
        }

        let ch = self.src[self.pos];
        let kind = match ch {
            b'\'' | b'"' => self.lex_string(ch),
            b'`' => self.lex_backtick_ident(),
            b'0'..=b'9' => self.lex_number(),
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_word(),

            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),
            b'*' => self.single(TokenKind::Star),
            b'/' => self.single(TokenKind::Slash),
            b'%' => self.single(TokenKind::Percent),
            b',' => self.single(TokenKind::Comma),
            b'(' => self.single(TokenKind::LeftParen),
            b')' => self.single(TokenKind::RightParen),
            b'.' => self.single(TokenKind::Dot),
            b';' => self.single(TokenKind::Semicolon),
            b'?' => self.single(TokenKind::Question),
            b'=' => self.single(TokenKind::Eq),
            b'&' => self.single(TokenKind::Ampersand),
            b'^' => self.single(TokenKind::Caret),
            b'~' => self.single(TokenKind::Tilde),

            b'<' => self.lex_lt(),
            b'>' => self.lex_gt(),
            b'!' => self.lex_bang(),
            b'|' => self.lex_pipe(),
            b':' => self.lex_colon(),

            _ => {
                self.advance();
                let s = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                TokenKind::Error(format!("unexpected character `{s}`"))
            }
        };

        Token {
            kind,
            span: Span::new(start as u32, self.pos as u32),
            line: start_line,
            col: start_col,
        }
    }

    fn advance(&mut self) -> u8 {
        let ch = self.src[self.pos];
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        ch
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
                self.advance();
            }
            if self.pos >= self.src.len() {
                break;
            }

            // Line comment: `-- ...`
            if self.src[self.pos] == b'-' && self.peek_at(1) == Some(b'-') {
                while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
                    self.advance();
                }
                continue;
            }

            // Block comment: `/* ... */`, unterminated runs to end of input
            if self.src[self.pos] == b'/' && self.peek_at(1) == Some(b'*') {
                self.advance();
                self.advance();
                while self.pos < self.src.len() {
                    if self.src[self.pos] == b'*' && self.peek_at(1) == Some(b'/') {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            break;
        }
    }

    /// Single- or double-quoted string literal, with a doubled quote as the
    /// in-string escape for the same quote character.
    fn lex_string(&mut self, quote: u8) -> TokenKind {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return TokenKind::Error("unterminated string literal".into());
                }
                Some(c) if c == quote => {
                    self.advance();
                    if self.peek() == Some(quote) {
                        value.push(quote as char);
                        self.advance();
                    } else {
                        return TokenKind::String(value);
                    }
                }
                Some(_) => {
                    let b = self.advance();
                    // Re-assemble multi-byte UTF-8 sequences byte by byte.
                    value.push(b as char);
                    if b >= 0x80 {
                        // Fall back to lossless collection of the raw bytes.
                        value.pop();
                        let mut bytes = vec![b];
                        while self.peek().is_some_and(|c| c >= 0x80 && c < 0xC0) {
                            bytes.push(self.advance());
                        }
                        value.push_str(&String::from_utf8_lossy(&bytes));
                    }
                }
            }
        }
    }

    /// Backtick-quoted identifier: content is the identifier verbatim; a
    /// doubled backtick escapes a literal backtick.
    fn lex_backtick_ident(&mut self) -> TokenKind {
        self.advance(); // opening backtick
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return TokenKind::Error("unterminated quoted identifier".into()),
                Some(b'`') => {
                    self.advance();
                    if self.peek() == Some(b'`') {
                        value.push('`');
                        self.advance();
                    } else {
                        return TokenKind::QuotedName(value);
                    }
                }
                Some(b) => {
                    value.push(b as char);
                    self.advance();
                }
            }
        }
    }

    /// Integer, decimal, or exponential numeric literal.
    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        } else if self.peek() == Some(b'.') && self.src[start] != b'.' {
            // trailing-dot float like `12.`
            is_float = true;
            self.advance();
        }
        if self.src[start] == b'.' {
            is_float = true;
        }
        if self.peek().is_some_and(|c| c == b'e' || c == b'E') {
            let mark = self.pos;
            self.advance();
            if self.peek().is_some_and(|c| c == b'+' || c == b'-') {
                self.advance();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                // not an exponent after all; the `e` starts a following word
                self.pos = mark;
            }
        }

        let text = String::from_utf8_lossy(&self.src[start..self.pos]);
        if is_float {
            match text.parse::<f64>() {
                Ok(v) => TokenKind::Float(v),
                Err(_) => TokenKind::Error(format!("invalid numeric literal `{text}`")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => TokenKind::Integer(v),
                Err(_) => TokenKind::Error(format!("integer literal out of range `{text}`")),
            }
        }
    }

    /// Identifier or reserved word.
    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        self.advance();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        let upper = text.to_uppercase();
        if self.dialect.is_reserved(&upper) {
            TokenKind::Keyword(upper)
        } else {
            TokenKind::Name(text)
        }
    }

    fn lex_lt(&mut self) -> TokenKind {
        self.advance();
        match self.peek() {
            Some(b'=') => self.single(TokenKind::Lte),
            Some(b'>') => self.single(TokenKind::Neq),
            Some(b'<') => self.single(TokenKind::ShiftLeft),
            _ => TokenKind::Lt,
        }
    }

    fn lex_gt(&mut self) -> TokenKind {
        self.advance();
        match self.peek() {
            Some(b'=') => self.single(TokenKind::Gte),
            Some(b'>') => self.single(TokenKind::ShiftRight),
            _ => TokenKind::Gt,
        }
    }

    fn lex_bang(&mut self) -> TokenKind {
        self.advance();
        if self.peek() == Some(b'=') {
            self.single(TokenKind::Neq)
        } else {
            TokenKind::Error("unexpected `!`, did you mean `!=`?".into())
        }
    }

    fn lex_pipe(&mut self) -> TokenKind {
        self.advance();
        if self.peek() == Some(b'|') {
            self.single(TokenKind::Concat)
        } else {
            TokenKind::Pipe
        }
    }

    fn lex_colon(&mut self) -> TokenKind {
        self.advance();
        if self.peek() == Some(b'=') {
            self.single(TokenKind::Assign)
        } else {
            TokenKind::Error("unexpected `:`, did you mean `:=`?".into())
        }
    }
}
