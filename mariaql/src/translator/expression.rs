//! Generic expression lowering into MongoDB expression documents
//! (`$expr`-context operators). Subqueries never reach this layer; the
//! filter and projection lowerings lift them into `$lookup` stages first
//! and rewrite their occurrences into field references.

use super::{like::like_to_regex, Error, LetVar, MqlTranslator, NameScope, Result};
use crate::ast::*;
use bson::{bson, Bson};

impl<'a> MqlTranslator<'a> {
    pub(crate) fn lower_expr(
        &mut self,
        expr: &Expression,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<Bson> {
        match expr {
            Expression::Column(id) => Ok(Bson::String(scope.resolve(id, let_vars)?)),
            Expression::Literal(lit) => Ok(lower_literal(lit)),

            Expression::Unary { op, expr } => {
                let inner = self.lower_expr(expr, scope, let_vars)?;
                Ok(match op {
                    UnaryOp::Neg => bson!({"$multiply": [inner, -1]}),
                    UnaryOp::Not => bson!({"$not": [inner]}),
                    UnaryOp::BitNot => bson!({"$bitNot": inner}),
                    UnaryOp::IsNull => bson!({"$eq": [inner, Bson::Null]}),
                    UnaryOp::IsNotNull => bson!({"$ne": [inner, Bson::Null]}),
                })
            }

            Expression::Binary { left, op, right } => self.lower_binary(left, *op, right, scope, let_vars),

            Expression::InList {
                expr,
                list,
                negated,
            } => {
                let value = self.lower_expr(expr, scope, let_vars)?;
                let items = list
                    .iter()
                    .map(|e| self.lower_expr(e, scope, let_vars))
                    .collect::<Result<Vec<_>>>()?;
                let membership = bson!({"$in": [value, items]});
                Ok(if *negated {
                    bson!({"$not": [membership]})
                } else {
                    membership
                })
            }

            Expression::FunctionCall(f) => self.lower_call(f, scope, let_vars),

            Expression::Case(c) => self.lower_case(c, scope, let_vars),

            Expression::Cast { expr, to } => {
                let inner = self.lower_expr(expr, scope, let_vars)?;
                lower_cast(inner, *to)
            }

            Expression::Extract { unit, expr } => {
                let date = self.lower_expr(expr, scope, let_vars)?;
                Ok(lower_extract(*unit, date))
            }

            Expression::Match(_) => Err(Error::UnsupportedConstruct(
                "MATCH ... AGAINST is only usable as a top-level WHERE condition".into(),
            )),
            Expression::Subquery(_) => Err(Error::UnsupportedConstruct(
                "subquery in this position".into(),
            )),
            Expression::Tuple(_) => Err(Error::UnsupportedConstruct(
                "row constructor outside a row-subquery comparison".into(),
            )),
            Expression::Star | Expression::QualifiedStar(_) => Err(Error::UnsupportedConstruct(
                "`*` outside COUNT(*) or a projection list".into(),
            )),
        }
    }

    fn lower_binary(
        &mut self,
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<Bson> {
        use BinaryOp::*;

        // LIKE and REGEXP need the raw pattern, not a lowered operand.
        if matches!(op, Like | NotLike) {
            let input = self.lower_expr(left, scope, let_vars)?;
            let Expression::Literal(Literal::String(pattern)) = right else {
                return Err(Error::UnsupportedConstruct(
                    "LIKE pattern must be a string literal".into(),
                ));
            };
            let matched = bson!({"$regexMatch": {
                "input": input,
                "regex": like_to_regex(pattern),
                "options": "i"
            }});
            return Ok(if op == NotLike {
                bson!({"$not": [matched]})
            } else {
                matched
            });
        }
        if matches!(op, Regexp | NotRegexp) {
            let input = self.lower_expr(left, scope, let_vars)?;
            let pattern = self.lower_expr(right, scope, let_vars)?;
            let matched = bson!({"$regexMatch": {
                "input": input,
                "regex": pattern,
                "options": "i"
            }});
            return Ok(if op == NotRegexp {
                bson!({"$not": [matched]})
            } else {
                matched
            });
        }

        let l = self.lower_expr(left, scope, let_vars)?;
        let r = self.lower_expr(right, scope, let_vars)?;
        let operands = vec![l, r];
        let doc = match op {
            Add => bson!({"$add": operands}),
            Sub => bson!({"$subtract": operands}),
            Mul => bson!({"$multiply": operands}),
            Div => bson!({"$divide": operands}),
            Mod => bson!({"$mod": operands}),
            Eq => bson!({"$eq": operands}),
            Neq => bson!({"$ne": operands}),
            Lt => bson!({"$lt": operands}),
            Lte => bson!({"$lte": operands}),
            Gt => bson!({"$gt": operands}),
            Gte => bson!({"$gte": operands}),
            And => bson!({"$and": operands}),
            Or => bson!({"$or": operands}),
            Concat => bson!({"$concat": operands}),
            BitAnd => bson!({"$bitAnd": operands}),
            BitOr => bson!({"$bitOr": operands}),
            BitXor => bson!({"$bitXor": operands}),
            ShiftLeft => bson!({"$multiply": [
                operands[0].clone(),
                {"$pow": [2, operands[1].clone()]}
            ]}),
            ShiftRight => bson!({"$floor": {"$divide": [
                operands[0].clone(),
                {"$pow": [2, operands[1].clone()]}
            ]}}),
            In | NotIn => {
                return Err(Error::UnsupportedConstruct(
                    "IN subquery in this position".into(),
                ))
            }
            Like | NotLike | Regexp | NotRegexp => unreachable!(),
        };
        Ok(doc)
    }

    /// Function calls: the structural conditionals are lowered by the engine
    /// itself, aggregates and windows are rejected outside their stages, and
    /// everything else goes through the catalogue.
    fn lower_call(
        &mut self,
        f: &FunctionExpr,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<Bson> {
        use crate::catalog::FunctionKind;

        if f.over.is_some() {
            return Err(Error::UnsupportedConstruct(
                "window function outside a SELECT projection".into(),
            ));
        }

        match self.catalog.kind(&f.name) {
            Some(FunctionKind::Structural) => {
                self.catalog.check_arity(&f.name, f.args.len())?;
                return self.lower_structural(f, scope, let_vars);
            }
            Some(FunctionKind::Aggregate) if self.catalog.is_aggregate(&f.name, f.args.len()) => {
                return Err(Error::UnsupportedConstruct(format!(
                    "aggregate {} outside a projection or HAVING",
                    f.name
                )));
            }
            _ => {}
        }

        let mut args = Vec::with_capacity(f.args.len());
        for (i, arg) in f.args.iter().enumerate() {
            // TIMESTAMPADD/TIMESTAMPDIFF name their unit as a bare word;
            // it lowers to a unit string, not a column.
            if i == 0 && matches!(f.name.as_str(), "TIMESTAMPADD" | "TIMESTAMPDIFF") {
                if let Expression::Column(id) = arg {
                    if id.qualifier.is_none() {
                        if let Ok(unit) = IntervalUnit::try_from(id.name.as_str()) {
                            args.push(Bson::String(unit.as_mongo_unit().to_string()));
                            continue;
                        }
                    }
                }
            }
            args.push(self.lower_expr(arg, scope, let_vars)?);
        }
        Ok(self.catalog.lower_scalar(&f.name, &args)?)
    }

    /// IF / COALESCE / NULLIF.
    fn lower_structural(
        &mut self,
        f: &FunctionExpr,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<Bson> {
        let mut args = f
            .args
            .iter()
            .map(|a| self.lower_expr(a, scope, let_vars))
            .collect::<Result<Vec<_>>>()?;
        Ok(match f.name.as_str() {
            "IF" => {
                let (cond, then, otherwise) =
                    (args.remove(0), args.remove(0), args.remove(0));
                bson!({"$cond": [cond, then, otherwise]})
            }
            "COALESCE" => {
                // nested $ifNull, right to left
                let mut rest = args.into_iter().rev();
                let Some(mut result) = rest.next() else {
                    return Err(Error::UnsupportedConstruct("COALESCE with no arguments".into()));
                };
                for arg in rest {
                    result = bson!({"$ifNull": [arg, result]});
                }
                result
            }
            "NULLIF" => {
                let (a, b) = (args.remove(0), args.remove(0));
                bson!({"$cond": [{"$eq": [a.clone(), b]}, Bson::Null, a]})
            }
            other => {
                return Err(Error::UnsupportedConstruct(format!(
                    "structural function {other}"
                )))
            }
        })
    }

    fn lower_case(
        &mut self,
        c: &CaseExpr,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<Bson> {
        let operand = c
            .operand
            .as_ref()
            .map(|o| self.lower_expr(o, scope, let_vars))
            .transpose()?;
        let mut branches = Vec::with_capacity(c.branches.len());
        for branch in &c.branches {
            let when = self.lower_expr(&branch.when, scope, let_vars)?;
            let case = match &operand {
                // the operand form compares the operand to each WHEN value
                Some(op) => bson!({"$eq": [op.clone(), when]}),
                None => when,
            };
            let then = self.lower_expr(&branch.then, scope, let_vars)?;
            branches.push(bson!({"case": case, "then": then}));
        }
        let default = match &c.else_branch {
            Some(e) => self.lower_expr(e, scope, let_vars)?,
            None => Bson::Null,
        };
        Ok(bson!({"$switch": {"branches": branches, "default": default}}))
    }
}

pub(crate) fn lower_literal(lit: &Literal) -> Bson {
    match lit {
        Literal::Null => Bson::Null,
        Literal::Boolean(b) => Bson::Boolean(*b),
        Literal::Integer(i) => {
            if let Ok(v) = i32::try_from(*i) {
                Bson::Int32(v)
            } else {
                Bson::Int64(*i)
            }
        }
        Literal::Float(f) => Bson::Double(*f),
        // strings that could be mistaken for field paths need $literal
        Literal::String(s) if s.starts_with('$') => bson!({"$literal": s.clone()}),
        Literal::String(s) => Bson::String(s.clone()),
        Literal::Date(s) => bson!({"$dateFromString": {"dateString": s.clone()}}),
        Literal::Interval { amount, unit } => {
            bson!({"amount": *amount, "unit": unit.as_mongo_unit()})
        }
    }
}

fn lower_cast(inner: Bson, to: TypeName) -> Result<Bson> {
    Ok(match to {
        TypeName::Char => bson!({"$toString": inner}),
        TypeName::Signed | TypeName::Unsigned => bson!({"$toLong": inner}),
        TypeName::Decimal => bson!({"$toDecimal": inner}),
        TypeName::Double | TypeName::Float => bson!({"$toDouble": inner}),
        TypeName::Date | TypeName::Datetime => bson!({"$toDate": inner}),
        TypeName::Time => bson!({"$dateToString": {"date": {"$toDate": inner}, "format": "%H:%M:%S"}}),
        TypeName::Binary => bson!({"$toString": inner}),
        TypeName::Json => {
            return Err(Error::UnsupportedConstruct("CAST(... AS JSON)".into()))
        }
    })
}

fn lower_extract(unit: IntervalUnit, date: Bson) -> Bson {
    use IntervalUnit::*;
    let date = crate::catalog::date_arg(&date);
    match unit {
        Year => bson!({"$year": date}),
        Month => bson!({"$month": date}),
        Day => bson!({"$dayOfMonth": date}),
        Hour => bson!({"$hour": date}),
        Minute => bson!({"$minute": date}),
        Second => bson!({"$second": date}),
        Week => bson!({"$week": date}),
        Quarter => bson!({"$toInt": {"$ceil": {"$divide": [{"$month": date}, 3]}}}),
        Microsecond => bson!({"$multiply": [{"$millisecond": date}, 1000]}),
    }
}
