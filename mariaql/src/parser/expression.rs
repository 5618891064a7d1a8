//! Expression parsing: precedence climbing from OR down to primary terms,
//! plus the special call forms (EXTRACT, CAST, COUNT(*), GROUP_CONCAT,
//! CASE, MATCH ... AGAINST, OVER windows) and subquery shape detection.

use super::{Error, Parser, Result};
use crate::{ast::*, lexer::TokenKind};

impl<'a> Parser<'a> {
    pub(crate) fn expression(&mut self) -> Result<Expression> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expression> {
        let mut left = self.and_expr()?;
        while self.reader.consume_keyword("OR") {
            let right = self.and_expr()?;
            left = Expression::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expression> {
        let mut left = self.not_expr()?;
        while self.reader.consume_keyword("AND") {
            let right = self.not_expr()?;
            left = Expression::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expression> {
        if self.reader.consume_keyword("NOT") {
            // NOT EXISTS (...) keeps its own subquery kind rather than
            // wrapping an Exists subquery in a negation.
            if self.reader.current().is_keyword("EXISTS") {
                let expr = self.not_expr()?;
                if let Expression::Subquery(SubqueryExpr { query, kind: SubqueryKind::Exists }) =
                    expr
                {
                    return Ok(Expression::Subquery(SubqueryExpr {
                        query,
                        kind: SubqueryKind::NotExists,
                    }));
                }
                return Ok(Expression::unary(UnaryOp::Not, expr));
            }
            let expr = self.not_expr()?;
            return Ok(Expression::unary(UnaryOp::Not, expr));
        }
        self.comparison_expr()
    }

    fn comparison_expr(&mut self) -> Result<Expression> {
        let mut left = self.bit_or_expr()?;
        loop {
            // `x NOT LIKE / NOT IN / NOT BETWEEN / NOT REGEXP ...`
            let negated = if self.reader.current().is_keyword("NOT")
                && (self.reader.peek(1).is_keyword("LIKE")
                    || self.reader.peek(1).is_keyword("IN")
                    || self.reader.peek(1).is_keyword("BETWEEN")
                    || self.reader.peek(1).is_keyword("REGEXP")
                    || self.reader.peek(1).is_keyword("RLIKE"))
            {
                self.reader.advance();
                true
            } else {
                false
            };

            let tok = self.reader.current();
            if tok.is_keyword("IS") {
                self.reader.advance();
                let not = self.reader.consume_keyword("NOT");
                self.reader.expect_keyword("NULL")?;
                let op = if not { UnaryOp::IsNotNull } else { UnaryOp::IsNull };
                left = Expression::unary(op, left);
                continue;
            }
            if tok.is_keyword("LIKE") {
                self.reader.advance();
                let right = self.bit_or_expr()?;
                let op = if negated { BinaryOp::NotLike } else { BinaryOp::Like };
                left = Expression::binary(left, op, right);
                continue;
            }
            if tok.is_keyword("REGEXP") || tok.is_keyword("RLIKE") {
                self.reader.advance();
                let right = self.bit_or_expr()?;
                let op = if negated { BinaryOp::NotRegexp } else { BinaryOp::Regexp };
                left = Expression::binary(left, op, right);
                continue;
            }
            if tok.is_keyword("BETWEEN") {
                self.reader.advance();
                let low = self.bit_or_expr()?;
                self.reader.expect_keyword("AND")?;
                let high = self.bit_or_expr()?;
                // BETWEEN desugars to a conjunction of range comparisons.
                let range = Expression::binary(
                    Expression::binary(left.clone(), BinaryOp::Gte, low),
                    BinaryOp::And,
                    Expression::binary(left, BinaryOp::Lte, high),
                );
                left = if negated {
                    Expression::unary(UnaryOp::Not, range)
                } else {
                    range
                };
                continue;
            }
            if tok.is_keyword("IN") {
                self.reader.advance();
                left = self.in_rhs(left, negated)?;
                continue;
            }

            let op = match tok.kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Neq => BinaryOp::Neq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Lte => BinaryOp::Lte,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Gte => BinaryOp::Gte,
                _ => {
                    if negated {
                        return Err(self.error_here("LIKE, IN, BETWEEN, or REGEXP after NOT"));
                    }
                    break;
                }
            };
            self.reader.advance();
            let mut right = self.bit_or_expr()?;
            // `(a, b) = (SELECT ...)` is a row subquery comparison.
            if let Expression::Subquery(sub) = &mut right {
                if sub.kind == SubqueryKind::Scalar && matches!(left, Expression::Tuple(_)) {
                    sub.kind = SubqueryKind::Row;
                }
            }
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    /// The right-hand side of `[NOT] IN`: a scalar list or a single subquery.
    fn in_rhs(&mut self, left: Expression, negated: bool) -> Result<Expression> {
        self.reader.expect(&TokenKind::LeftParen)?;
        if self.reader.current().is_keyword("SELECT") {
            let query = self.select_statement()?;
            self.reader.expect(&TokenKind::RightParen)?;
            let kind = if negated { SubqueryKind::NotIn } else { SubqueryKind::In };
            let op = if negated { BinaryOp::NotIn } else { BinaryOp::In };
            return Ok(Expression::binary(
                left,
                op,
                Expression::Subquery(SubqueryExpr {
                    query: Box::new(query),
                    kind,
                }),
            ));
        }
        let mut list = vec![self.expression()?];
        while self.reader.consume_if(&TokenKind::Comma) {
            list.push(self.expression()?);
        }
        self.reader.expect(&TokenKind::RightParen)?;
        Ok(Expression::InList {
            expr: Box::new(left),
            list,
            negated,
        })
    }

    fn bit_or_expr(&mut self) -> Result<Expression> {
        let mut left = self.bit_and_expr()?;
        while self.reader.consume_if(&TokenKind::Pipe) {
            let right = self.bit_and_expr()?;
            left = Expression::binary(left, BinaryOp::BitOr, right);
        }
        Ok(left)
    }

    fn bit_and_expr(&mut self) -> Result<Expression> {
        let mut left = self.bit_xor_expr()?;
        while self.reader.consume_if(&TokenKind::Ampersand) {
            let right = self.bit_xor_expr()?;
            left = Expression::binary(left, BinaryOp::BitAnd, right);
        }
        Ok(left)
    }

    fn bit_xor_expr(&mut self) -> Result<Expression> {
        let mut left = self.shift_expr()?;
        while self.reader.consume_if(&TokenKind::Caret) {
            let right = self.shift_expr()?;
            left = Expression::binary(left, BinaryOp::BitXor, right);
        }
        Ok(left)
    }

    fn shift_expr(&mut self) -> Result<Expression> {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.reader.current().kind {
                TokenKind::ShiftLeft => BinaryOp::ShiftLeft,
                TokenKind::ShiftRight => BinaryOp::ShiftRight,
                _ => break,
            };
            self.reader.advance();
            let right = self.additive_expr()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn additive_expr(&mut self) -> Result<Expression> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.reader.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Concat => BinaryOp::Concat,
                _ => break,
            };
            self.reader.advance();
            let right = self.multiplicative_expr()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> Result<Expression> {
        let mut left = self.unary_expr()?;
        loop {
            let op = match &self.reader.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                TokenKind::Keyword(k) if k == "DIV" => BinaryOp::Div,
                TokenKind::Keyword(k) if k == "MOD" => BinaryOp::Mod,
                _ => break,
            };
            self.reader.advance();
            let right = self.unary_expr()?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Expression> {
        match self.reader.current().kind {
            TokenKind::Minus => {
                self.reader.advance();
                // fold a leading minus into numeric literals
                match self.reader.current().kind {
                    TokenKind::Integer(v) => {
                        self.reader.advance();
                        Ok(Expression::Literal(Literal::Integer(-v)))
                    }
                    TokenKind::Float(v) => {
                        self.reader.advance();
                        Ok(Expression::Literal(Literal::Float(-v)))
                    }
                    _ => Ok(Expression::unary(UnaryOp::Neg, self.unary_expr()?)),
                }
            }
            TokenKind::Plus => {
                self.reader.advance();
                self.unary_expr()
            }
            TokenKind::Tilde => {
                self.reader.advance();
                Ok(Expression::unary(UnaryOp::BitNot, self.unary_expr()?))
            }
            _ => self.primary_expr(),
        }
    }

    fn primary_expr(&mut self) -> Result<Expression> {
        let tok = self.reader.current().clone();
        match &tok.kind {
            TokenKind::LeftParen => {
                self.reader.advance();
                if self.reader.current().is_keyword("SELECT") {
                    let query = self.select_statement()?;
                    if !self.reader.consume_if(&TokenKind::RightParen) {
                        return Err(Error::UnclosedConstruct("subquery"));
                    }
                    return Ok(Expression::Subquery(SubqueryExpr {
                        query: Box::new(query),
                        kind: SubqueryKind::Scalar,
                    }));
                }
                let first = self.expression()?;
                if self.reader.consume_if(&TokenKind::Comma) {
                    let mut items = vec![first];
                    loop {
                        items.push(self.expression()?);
                        if !self.reader.consume_if(&TokenKind::Comma) {
                            break;
                        }
                    }
                    if !self.reader.consume_if(&TokenKind::RightParen) {
                        return Err(Error::UnclosedConstruct("row constructor"));
                    }
                    return Ok(Expression::Tuple(items));
                }
                if !self.reader.consume_if(&TokenKind::RightParen) {
                    return Err(Error::UnclosedConstruct("parenthesized expression"));
                }
                Ok(first)
            }

            TokenKind::Integer(v) => {
                self.reader.advance();
                Ok(Expression::Literal(Literal::Integer(*v)))
            }
            TokenKind::Float(v) => {
                self.reader.advance();
                Ok(Expression::Literal(Literal::Float(*v)))
            }
            TokenKind::String(s) => {
                self.reader.advance();
                Ok(Expression::Literal(Literal::String(s.clone())))
            }

            TokenKind::Keyword(k) => self.keyword_primary(k.clone()),

            TokenKind::Name(_) | TokenKind::QuotedName(_) => self.name_primary(),

            TokenKind::Error(msg) => Err(Error::Syntax {
                position: tok.span.start as usize,
                expected: "a valid token".into(),
                found: msg.clone(),
            }),

            _ => Err(self.error_here("expression")),
        }
    }

    /// Primary expressions introduced by a reserved word: literals, CASE,
    /// EXISTS, INTERVAL, niladic datetime keywords, and reserved-word
    /// function names such as IF or REPLACE.
    fn keyword_primary(&mut self, word: String) -> Result<Expression> {
        match word.as_str() {
            "NULL" => {
                self.reader.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            "TRUE" => {
                self.reader.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            "FALSE" => {
                self.reader.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            "CASE" => self.case_expr(),
            "EXISTS" => {
                self.reader.advance();
                self.reader.expect(&TokenKind::LeftParen)?;
                let query = self.select_statement()?;
                if !self.reader.consume_if(&TokenKind::RightParen) {
                    return Err(Error::UnclosedConstruct("subquery"));
                }
                Ok(Expression::Subquery(SubqueryExpr {
                    query: Box::new(query),
                    kind: SubqueryKind::Exists,
                }))
            }
            "INTERVAL" => {
                self.reader.advance();
                let negative = self.reader.consume_if(&TokenKind::Minus);
                let amount = match self.reader.current().kind {
                    TokenKind::Integer(v) => {
                        self.reader.advance();
                        if negative {
                            -v
                        } else {
                            v
                        }
                    }
                    _ => return Err(self.error_here("integer interval amount")),
                };
                let unit = self.interval_unit()?;
                Ok(Expression::Literal(Literal::Interval { amount, unit }))
            }
            // Niladic datetime keywords, usable with or without parentheses.
            "CURRENT_DATE" | "CURRENT_TIME" | "CURRENT_TIMESTAMP" | "LOCALTIME"
            | "LOCALTIMESTAMP" | "UTC_DATE" | "UTC_TIME" | "UTC_TIMESTAMP" | "SYSDATE" => {
                self.reader.advance();
                if self.reader.consume_if(&TokenKind::LeftParen) {
                    self.reader.expect(&TokenKind::RightParen)?;
                }
                Ok(Expression::FunctionCall(FunctionExpr::new(word, vec![])))
            }
            _ => {
                // A reserved word used as a function name: IF(...), LEFT(...),
                // REPLACE(...), MATCH(...), POSITION(...), ROW_NUMBER(), ...
                if self.reader.peek(1).kind == TokenKind::LeftParen {
                    self.reader.advance();
                    return self.call_expr(word);
                }
                Err(self.error_here("expression"))
            }
        }
    }

    /// Primary expressions introduced by an identifier: column references,
    /// qualified stars, typed date literals, and unreserved function calls.
    fn name_primary(&mut self) -> Result<Expression> {
        let name = self.identifier_part()?;
        let upper = name.to_uppercase();

        // DATE '2024-01-01' / TIMESTAMP '...' typed literals
        if matches!(upper.as_str(), "DATE" | "TIMESTAMP") {
            if let TokenKind::String(s) = &self.reader.current().kind {
                let s = s.clone();
                self.reader.advance();
                return Ok(Expression::Literal(Literal::Date(s)));
            }
        }

        if self.reader.current().kind == TokenKind::LeftParen {
            return self.call_expr(upper);
        }

        if self.reader.consume_if(&TokenKind::Dot) {
            if self.reader.consume_if(&TokenKind::Star) {
                return Ok(Expression::QualifiedStar(name));
            }
            let column = self.identifier_part()?;
            return Ok(Expression::Column(Identifier::qualified(name, column)));
        }

        Ok(Expression::Column(Identifier::simple(name)))
    }

    /// A call whose name token has been consumed; dispatches the special
    /// syntactic forms before the generic argument list.
    fn call_expr(&mut self, name: String) -> Result<Expression> {
        match name.as_str() {
            "EXTRACT" => return self.extract_expr(),
            "CAST" => return self.cast_expr(),
            "CONVERT" => return self.convert_expr(),
            "POSITION" => return self.position_expr(),
            "MATCH" => return self.match_expr(),
            "TRIM" => return self.trim_expr(),
            _ => {}
        }

        self.reader.expect(&TokenKind::LeftParen)?;
        let mut func = FunctionExpr::new(name.clone(), vec![]);

        if self.reader.consume_keyword("DISTINCT") {
            func.distinct = true;
        }

        // COUNT(*) keeps the star as an argument marker.
        if name == "COUNT" && self.reader.consume_if(&TokenKind::Star) {
            func.args.push(Expression::Star);
            self.reader.expect(&TokenKind::RightParen)?;
            return self.finish_call(func);
        }

        if self.reader.current().kind != TokenKind::RightParen {
            func.args.push(self.expression()?);
            while self.reader.consume_if(&TokenKind::Comma) {
                func.args.push(self.expression()?);
            }
        }

        if name == "GROUP_CONCAT" {
            if self.reader.consume_keyword("ORDER") {
                self.reader.expect_keyword("BY")?;
                func.order_by = self.sort_spec_list()?;
            }
            if self.reader.consume_keyword("SEPARATOR") {
                match &self.reader.current().kind {
                    TokenKind::String(s) => {
                        func.separator = Some(s.clone());
                        self.reader.advance();
                    }
                    _ => return Err(self.error_here("separator string")),
                }
            }
        }

        self.reader.expect(&TokenKind::RightParen)?;
        self.finish_call(func)
    }

    /// Attach an OVER clause if present.
    fn finish_call(&mut self, mut func: FunctionExpr) -> Result<Expression> {
        if self.reader.consume_keyword("OVER") {
            self.reader.expect(&TokenKind::LeftParen)?;
            let mut spec = WindowSpec {
                partition_by: vec![],
                order_by: vec![],
            };
            if self.reader.consume_keyword("PARTITION") {
                self.reader.expect_keyword("BY")?;
                spec.partition_by.push(self.expression()?);
                while self.reader.consume_if(&TokenKind::Comma) {
                    spec.partition_by.push(self.expression()?);
                }
            }
            if self.reader.consume_keyword("ORDER") {
                self.reader.expect_keyword("BY")?;
                spec.order_by = self.sort_spec_list()?;
            }
            self.reader.expect(&TokenKind::RightParen)?;
            func.over = Some(spec);
        }
        Ok(Expression::FunctionCall(func))
    }

    fn extract_expr(&mut self) -> Result<Expression> {
        self.reader.expect(&TokenKind::LeftParen)?;
        let unit = self.interval_unit()?;
        self.reader.expect_keyword("FROM")?;
        let expr = self.expression()?;
        self.reader.expect(&TokenKind::RightParen)?;
        Ok(Expression::Extract {
            unit,
            expr: Box::new(expr),
        })
    }

    fn cast_expr(&mut self) -> Result<Expression> {
        self.reader.expect(&TokenKind::LeftParen)?;
        let expr = self.expression()?;
        self.reader.expect_keyword("AS")?;
        let to = self.type_name()?;
        self.reader.expect(&TokenKind::RightParen)?;
        Ok(Expression::Cast {
            expr: Box::new(expr),
            to,
        })
    }

    /// `CONVERT(expr, type)` is the comma form of CAST.
    fn convert_expr(&mut self) -> Result<Expression> {
        self.reader.expect(&TokenKind::LeftParen)?;
        let expr = self.expression()?;
        self.reader.expect(&TokenKind::Comma)?;
        let to = self.type_name()?;
        self.reader.expect(&TokenKind::RightParen)?;
        Ok(Expression::Cast {
            expr: Box::new(expr),
            to,
        })
    }

    /// `POSITION(needle IN haystack)` parses as LOCATE(needle, haystack).
    fn position_expr(&mut self) -> Result<Expression> {
        self.reader.expect(&TokenKind::LeftParen)?;
        let needle = self.bit_or_expr()?;
        self.reader.expect_keyword("IN")?;
        let haystack = self.expression()?;
        self.reader.expect(&TokenKind::RightParen)?;
        Ok(Expression::FunctionCall(FunctionExpr::new(
            "LOCATE",
            vec![needle, haystack],
        )))
    }

    /// `MATCH (col, ...) AGAINST ('terms' [IN NATURAL LANGUAGE MODE |
    /// IN BOOLEAN MODE])`
    fn match_expr(&mut self) -> Result<Expression> {
        self.reader.expect(&TokenKind::LeftParen)?;
        let mut columns = vec![self.match_column()?];
        while self.reader.consume_if(&TokenKind::Comma) {
            columns.push(self.match_column()?);
        }
        self.reader.expect(&TokenKind::RightParen)?;
        if !self.reader.consume_name("AGAINST") {
            return Err(self.error_here("AGAINST"));
        }
        self.reader.expect(&TokenKind::LeftParen)?;
        let query = match &self.reader.current().kind {
            TokenKind::String(s) => {
                let s = s.clone();
                self.reader.advance();
                s
            }
            _ => return Err(self.error_here("search string")),
        };
        let mode = if self.reader.consume_keyword("IN") {
            if self.reader.consume_keyword("NATURAL") {
                if !self.reader.consume_name("LANGUAGE") {
                    return Err(self.error_here("LANGUAGE"));
                }
                if !self.reader.consume_name("MODE") {
                    return Err(self.error_here("MODE"));
                }
                Some(FulltextMode::NaturalLanguage)
            } else if self.reader.consume_name("BOOLEAN") {
                if !self.reader.consume_name("MODE") {
                    return Err(self.error_here("MODE"));
                }
                Some(FulltextMode::Boolean)
            } else {
                return Err(self.error_here("NATURAL LANGUAGE MODE or BOOLEAN MODE"));
            }
        } else {
            None
        };
        self.reader.expect(&TokenKind::RightParen)?;
        Ok(Expression::Match(MatchExpr {
            columns,
            query,
            mode,
        }))
    }

    fn match_column(&mut self) -> Result<Identifier> {
        let first = self.identifier_part()?;
        if self.reader.consume_if(&TokenKind::Dot) {
            let column = self.identifier_part()?;
            Ok(Identifier::qualified(first, column))
        } else {
            Ok(Identifier::simple(first))
        }
    }

    /// `TRIM(s)`, or `TRIM([BOTH|LEADING|TRAILING] [chars] FROM s)`.
    fn trim_expr(&mut self) -> Result<Expression> {
        self.reader.expect(&TokenKind::LeftParen)?;
        let func_name = if self.reader.consume_keyword("LEADING") {
            "LTRIM"
        } else if self.reader.consume_keyword("TRAILING") {
            "RTRIM"
        } else {
            self.reader.consume_keyword("BOTH");
            "TRIM"
        };
        if self.reader.consume_keyword("FROM") {
            let arg = self.expression()?;
            self.reader.expect(&TokenKind::RightParen)?;
            return Ok(Expression::FunctionCall(FunctionExpr::new(
                func_name,
                vec![arg],
            )));
        }
        let first = self.expression()?;
        if self.reader.consume_keyword("FROM") {
            let arg = self.expression()?;
            self.reader.expect(&TokenKind::RightParen)?;
            return Ok(Expression::FunctionCall(FunctionExpr::new(
                func_name,
                vec![arg, first],
            )));
        }
        self.reader.expect(&TokenKind::RightParen)?;
        Ok(Expression::FunctionCall(FunctionExpr::new(
            func_name,
            vec![first],
        )))
    }

    fn case_expr(&mut self) -> Result<Expression> {
        self.reader.expect_keyword("CASE")?;
        let operand = if self.reader.current().is_keyword("WHEN") {
            None
        } else {
            Some(Box::new(self.expression()?))
        };
        let mut branches = Vec::new();
        while self.reader.consume_keyword("WHEN") {
            let when = self.expression()?;
            self.reader.expect_keyword("THEN")?;
            let then = self.expression()?;
            branches.push(WhenBranch { when, then });
        }
        if branches.is_empty() {
            return Err(self.error_here("WHEN"));
        }
        let else_branch = if self.reader.consume_keyword("ELSE") {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        if !self.reader.consume_name("END") {
            return Err(Error::UnclosedConstruct("CASE expression"));
        }
        Ok(Expression::Case(CaseExpr {
            operand,
            branches,
            else_branch,
        }))
    }

    pub(crate) fn interval_unit(&mut self) -> Result<IntervalUnit> {
        let word = match &self.reader.current().kind {
            TokenKind::Name(n) => n.clone(),
            TokenKind::Keyword(k) => k.clone(),
            _ => return Err(self.error_here("interval unit")),
        };
        match IntervalUnit::try_from(word.as_str()) {
            Ok(unit) => {
                self.reader.advance();
                Ok(unit)
            }
            Err(_) => Err(self.error_here("interval unit")),
        }
    }

    fn type_name(&mut self) -> Result<TypeName> {
        let word = match &self.reader.current().kind {
            TokenKind::Name(n) => n.clone(),
            TokenKind::Keyword(k) => k.clone(),
            _ => return Err(self.error_here("type name")),
        };
        let ty = TypeName::try_from(word.as_str()).map_err(|_| self.error_here("type name"))?;
        self.reader.advance();
        // optional length/precision arguments, e.g. CHAR(10), DECIMAL(10, 2)
        if self.reader.consume_if(&TokenKind::LeftParen) {
            while !self.reader.consume_if(&TokenKind::RightParen) {
                if self.reader.at_end() {
                    return Err(Error::UnclosedConstruct("type precision"));
                }
                self.reader.advance();
            }
        }
        Ok(ty)
    }
}
