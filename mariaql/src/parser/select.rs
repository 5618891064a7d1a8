//! SELECT statement parsing: projection list, FROM with derived tables,
//! JOIN chains, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT/OFFSET, and the
//! WITH (CTE) wrapper.

use super::{Parser, Result};
use crate::{ast::*, lexer::TokenKind};

impl<'a> Parser<'a> {
    pub(crate) fn select_statement(&mut self) -> Result<SelectStatement> {
        self.reader.expect_keyword("SELECT")?;
        let mut stmt = SelectStatement::default();

        if self.reader.consume_keyword("DISTINCT") || self.reader.consume_keyword("DISTINCTROW") {
            stmt.distinct = true;
        } else {
            self.reader.consume_keyword("ALL");
        }

        stmt.projections.push(self.projection()?);
        while self.reader.consume_if(&TokenKind::Comma) {
            stmt.projections.push(self.projection()?);
        }

        if self.reader.consume_keyword("FROM") {
            let from = self.table_ref()?;
            stmt.joins = self.join_clauses(&from)?;
            stmt.from = Some(from);
        }

        if self.reader.consume_keyword("WHERE") {
            stmt.where_clause = Some(self.expression()?);
        }

        if self.reader.consume_keyword("GROUP") {
            self.reader.expect_keyword("BY")?;
            stmt.group_by.push(self.expression()?);
            while self.reader.consume_if(&TokenKind::Comma) {
                stmt.group_by.push(self.expression()?);
            }
        }

        if self.reader.consume_keyword("HAVING") {
            stmt.having = Some(self.expression()?);
        }

        if self.reader.consume_keyword("ORDER") {
            self.reader.expect_keyword("BY")?;
            stmt.order_by = self.sort_spec_list()?;
        }

        if self.reader.consume_keyword("LIMIT") {
            let first = self.nonnegative_integer()?;
            if self.reader.consume_if(&TokenKind::Comma) {
                // LIMIT offset, count
                stmt.offset = Some(first);
                stmt.limit = Some(self.nonnegative_integer()?);
            } else if self.reader.consume_keyword("OFFSET") {
                stmt.limit = Some(first);
                stmt.offset = Some(self.nonnegative_integer()?);
            } else {
                stmt.limit = Some(first);
            }
        }

        Ok(stmt)
    }

    fn projection(&mut self) -> Result<Projection> {
        if self.reader.consume_if(&TokenKind::Star) {
            return Ok(Projection {
                expr: Expression::Star,
                alias: None,
            });
        }
        let expr = self.expression()?;
        let alias = match expr {
            // `t.*` takes no alias
            Expression::QualifiedStar(_) => None,
            _ => self.alias_opt()?,
        };
        Ok(Projection { expr, alias })
    }

    fn table_ref(&mut self) -> Result<TableRef> {
        if self.reader.consume_if(&TokenKind::LeftParen) {
            let query = self.select_statement()?;
            self.reader.expect(&TokenKind::RightParen)?;
            // a derived table must be named
            let alias = match self.alias_opt()? {
                Some(a) => a,
                None => return Err(self.error_here("alias for derived table")),
            };
            return Ok(TableRef::Derived {
                query: Box::new(query),
                alias,
            });
        }
        let name = self.identifier_part()?;
        let alias = self.alias_opt()?;
        Ok(TableRef::Collection { name, alias })
    }

    fn join_clauses(&mut self, base: &TableRef) -> Result<Vec<JoinOp>> {
        let mut joins: Vec<JoinOp> = Vec::new();
        loop {
            let kind = if self.reader.consume_keyword("INNER") {
                self.reader.expect_keyword("JOIN")?;
                JoinKind::Inner
            } else if self.reader.consume_keyword("LEFT") {
                self.reader.consume_keyword("OUTER");
                self.reader.expect_keyword("JOIN")?;
                JoinKind::Left
            } else if self.reader.consume_keyword("RIGHT") {
                self.reader.consume_keyword("OUTER");
                self.reader.expect_keyword("JOIN")?;
                JoinKind::Right
            } else if self.reader.consume_keyword("CROSS") {
                self.reader.expect_keyword("JOIN")?;
                JoinKind::Cross
            } else if self.reader.consume_keyword("JOIN") {
                JoinKind::Inner
            } else {
                break;
            };

            let target = self.table_ref()?;
            let on = if self.reader.consume_keyword("ON") {
                if kind == JoinKind::Cross {
                    return Err(self.error_here("no ON condition after CROSS JOIN"));
                }
                Some(self.expression()?)
            } else if self.reader.consume_keyword("USING") {
                // USING(col) desugars to an ON equality between the previous
                // table in the chain and the join target.
                let columns = self.column_name_list()?;
                let prev = joins
                    .last()
                    .map(|j| j.target.binding_name().to_string())
                    .unwrap_or_else(|| base.binding_name().to_string());
                let right = target.binding_name().to_string();
                let mut cond: Option<Expression> = None;
                for col in columns {
                    let eq = Expression::binary(
                        Expression::Column(Identifier::qualified(prev.clone(), col.clone())),
                        BinaryOp::Eq,
                        Expression::Column(Identifier::qualified(right.clone(), col)),
                    );
                    cond = Some(match cond {
                        None => eq,
                        Some(acc) => Expression::binary(acc, BinaryOp::And, eq),
                    });
                }
                cond
            } else {
                None
            };

            joins.push(JoinOp { kind, target, on });
        }
        Ok(joins)
    }

    pub(crate) fn sort_spec_list(&mut self) -> Result<Vec<SortSpec>> {
        let mut specs = vec![self.sort_spec()?];
        while self.reader.consume_if(&TokenKind::Comma) {
            specs.push(self.sort_spec()?);
        }
        Ok(specs)
    }

    fn sort_spec(&mut self) -> Result<SortSpec> {
        let key = match self.reader.current().kind {
            TokenKind::Integer(v) if v > 0 => {
                self.reader.advance();
                SortKey::Positional(v as u32)
            }
            _ => SortKey::Expr(self.expression()?),
        };
        let asc = if self.reader.consume_keyword("DESC") {
            false
        } else {
            self.reader.consume_keyword("ASC");
            true
        };
        Ok(SortSpec { key, asc })
    }

    fn nonnegative_integer(&mut self) -> Result<u64> {
        match self.reader.current().kind {
            TokenKind::Integer(v) if v >= 0 => {
                self.reader.advance();
                Ok(v as u64)
            }
            _ => Err(self.error_here("non-negative integer")),
        }
    }

    /// `WITH [RECURSIVE] name [(col, ...)] AS (SELECT ...) [, ...] <body>`
    pub(crate) fn with_statement(&mut self) -> Result<Statement> {
        self.reader.expect_keyword("WITH")?;
        let recursive = self.reader.consume_keyword("RECURSIVE");
        let mut ctes = Vec::new();
        loop {
            let name = self.identifier_part()?;
            let columns = if self.reader.current().kind == TokenKind::LeftParen {
                Some(self.column_name_list()?)
            } else {
                None
            };
            self.reader.expect_keyword("AS")?;
            self.reader.expect(&TokenKind::LeftParen)?;
            let query = self.select_statement()?;
            self.reader.expect(&TokenKind::RightParen)?;
            ctes.push(CommonTableExpr {
                name,
                columns,
                query,
                recursive,
            });
            if !self.reader.consume_if(&TokenKind::Comma) {
                break;
            }
        }
        let body = self.statement()?;
        Ok(Statement::With(WithStatement {
            ctes,
            body: Box::new(body),
        }))
    }
}
