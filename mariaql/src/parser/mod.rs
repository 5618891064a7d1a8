//! Recursive-descent parser over the token reader, producing the statement
//! IR. Clause parsing never inspects the source text; everything is driven
//! by tagged tokens.

mod expression;
mod select;
mod write;

#[cfg(test)]
mod test;

use crate::{
    ast::*,
    lexer::{Lexer, Mismatch, ReservedWordDialect, TokenKind, TokenReader},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("syntax error at byte {position}: expected {expected}, found {found}")]
    Syntax {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unclosed {0}")]
    UnclosedConstruct(&'static str),
}

impl From<Mismatch> for Error {
    fn from(m: Mismatch) -> Self {
        if m.found == "end of input" {
            Error::UnexpectedEnd
        } else {
            Error::Syntax {
                position: m.position,
                expected: m.expected,
                found: m.found,
            }
        }
    }
}

/// Parse a single statement; trailing semicolon is permitted.
pub fn parse_statement(sql: &str, dialect: ReservedWordDialect) -> Result<Statement> {
    let tokens = Lexer::tokenize(sql, dialect);
    let mut parser = Parser {
        reader: TokenReader::new(&tokens),
    };
    let stmt = parser.statement()?;
    while parser.reader.consume_if(&TokenKind::Semicolon) {}
    if !parser.reader.at_end() {
        return Err(parser.error_here("end of statement"));
    }
    Ok(stmt)
}

/// Parse a semicolon-delimited batch. On failure, reports the zero-based
/// index of the offending statement alongside the error.
pub fn parse_statements(
    sql: &str,
    dialect: ReservedWordDialect,
) -> std::result::Result<Vec<Statement>, (usize, Error)> {
    let tokens = Lexer::tokenize(sql, dialect);
    let mut parser = Parser {
        reader: TokenReader::new(&tokens),
    };
    let mut statements = Vec::new();
    loop {
        while parser.reader.consume_if(&TokenKind::Semicolon) {}
        if parser.reader.at_end() {
            break;
        }
        match parser.statement() {
            Ok(stmt) => statements.push(stmt),
            Err(e) => return Err((statements.len(), e)),
        }
        if !parser.reader.at_end() && !parser.reader.consume_if(&TokenKind::Semicolon) {
            return Err((statements.len() - 1, parser.error_here("`;` or end of input")));
        }
    }
    Ok(statements)
}

pub(crate) struct Parser<'a> {
    pub(crate) reader: TokenReader<'a>,
}

impl<'a> Parser<'a> {
    /// Dispatch on the first keyword of the statement.
    pub(crate) fn statement(&mut self) -> Result<Statement> {
        let tok = self.reader.current();
        match &tok.kind {
            TokenKind::Keyword(k) => match k.as_str() {
                "SELECT" => Ok(Statement::Select(self.select_statement()?)),
                "WITH" => self.with_statement(),
                "INSERT" => self.insert_statement(),
                "UPDATE" => self.update_statement(),
                "DELETE" => self.delete_statement(),
                _ => Err(self.error_here("SELECT, INSERT, UPDATE, DELETE, or WITH")),
            },
            _ => Err(self.error_here("SELECT, INSERT, UPDATE, DELETE, or WITH")),
        }
    }

    pub(crate) fn error_here(&self, expected: &str) -> Error {
        self.reader.mismatch(expected).into()
    }

    /// A single identifier part: unquoted name or backtick-quoted name. The
    /// backtick escaping is discarded here; reserved words pass only when
    /// quoted.
    pub(crate) fn identifier_part(&mut self) -> Result<String> {
        match &self.reader.current().kind {
            TokenKind::Name(n) | TokenKind::QuotedName(n) => {
                let n = n.clone();
                self.reader.advance();
                Ok(n)
            }
            _ => Err(self.error_here("identifier")),
        }
    }

    /// An optional `[AS] alias`. Without AS, only a bare identifier is
    /// accepted so that following keywords are not swallowed.
    pub(crate) fn alias_opt(&mut self) -> Result<Option<String>> {
        if self.reader.consume_keyword("AS") {
            match &self.reader.current().kind {
                TokenKind::Name(n) | TokenKind::QuotedName(n) | TokenKind::String(n) => {
                    let n = n.clone();
                    self.reader.advance();
                    Ok(Some(n))
                }
                _ => Err(self.error_here("alias")),
            }
        } else {
            match &self.reader.current().kind {
                TokenKind::Name(n) | TokenKind::QuotedName(n) => {
                    let n = n.clone();
                    self.reader.advance();
                    Ok(Some(n))
                }
                _ => Ok(None),
            }
        }
    }

    /// A parenthesized, comma-separated identifier list.
    pub(crate) fn column_name_list(&mut self) -> Result<Vec<String>> {
        self.reader.expect(&TokenKind::LeftParen)?;
        let mut columns = vec![self.identifier_part()?];
        while self.reader.consume_if(&TokenKind::Comma) {
            columns.push(self.identifier_part()?);
        }
        self.reader.expect(&TokenKind::RightParen)?;
        Ok(columns)
    }
}
