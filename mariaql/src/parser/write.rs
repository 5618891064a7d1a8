//! INSERT / UPDATE / DELETE statement parsing.

use super::{Parser, Result};
use crate::{ast::*, lexer::TokenKind};

impl<'a> Parser<'a> {
    /// `INSERT [INTO] table (col, ...) VALUES (expr, ...) [, (expr, ...)]*`
    pub(crate) fn insert_statement(&mut self) -> Result<Statement> {
        self.reader.expect_keyword("INSERT")?;
        self.reader.consume_keyword("INTO");
        let table = self.identifier_part()?;
        let columns = self.column_name_list()?;
        self.reader.expect_keyword("VALUES")?;

        let mut rows = vec![self.value_row()?];
        while self.reader.consume_if(&TokenKind::Comma) {
            rows.push(self.value_row()?);
        }

        Ok(Statement::Insert(InsertStatement {
            table,
            columns,
            rows,
        }))
    }

    fn value_row(&mut self) -> Result<Vec<Expression>> {
        self.reader.expect(&TokenKind::LeftParen)?;
        let mut row = vec![self.expression()?];
        while self.reader.consume_if(&TokenKind::Comma) {
            row.push(self.expression()?);
        }
        self.reader.expect(&TokenKind::RightParen)?;
        Ok(row)
    }

    /// `UPDATE table SET col = expr [, ...] [WHERE expr]`
    pub(crate) fn update_statement(&mut self) -> Result<Statement> {
        self.reader.expect_keyword("UPDATE")?;
        let table = self.identifier_part()?;
        self.reader.expect_keyword("SET")?;

        let mut assignments = vec![self.assignment()?];
        while self.reader.consume_if(&TokenKind::Comma) {
            assignments.push(self.assignment()?);
        }

        let where_clause = if self.reader.consume_keyword("WHERE") {
            Some(self.expression()?)
        } else {
            None
        };

        Ok(Statement::Update(UpdateStatement {
            table,
            assignments,
            where_clause,
        }))
    }

    fn assignment(&mut self) -> Result<Assignment> {
        let column = self.identifier_part()?;
        self.reader.expect(&TokenKind::Eq)?;
        let expr = self.expression()?;
        Ok(Assignment { column, expr })
    }

    /// `DELETE FROM table [WHERE expr]`
    pub(crate) fn delete_statement(&mut self) -> Result<Statement> {
        self.reader.expect_keyword("DELETE")?;
        self.reader.expect_keyword("FROM")?;
        let table = self.identifier_part()?;

        let where_clause = if self.reader.consume_keyword("WHERE") {
            Some(self.expression()?)
        } else {
            None
        };

        Ok(Statement::Delete(DeleteStatement {
            table,
            where_clause,
        }))
    }
}
