//! WHERE / HAVING lowering into match filter documents.
//!
//! Filters come in two shapes. When every predicate is a simple
//! column-versus-literal comparison the filter stays in query form
//! (`{field: {$gt: 100}}`), which is also what the `find` fast path needs.
//! Anything richer (cross-field comparisons, function calls, subqueries)
//! switches the whole filter to `{$expr: ...}`; subquery predicates lift
//! their `$lookup` stages into `stages` before the match document is
//! returned.

use super::{like::like_to_regex, Error, LetVar, MqlTranslator, NameScope, Result};
use crate::ast::*;
use bson::{bson, doc, Bson, Document};

impl<'a> MqlTranslator<'a> {
    /// Lower a WHERE condition. Lookup stages feeding the filter are pushed
    /// onto `stages`; generated lookup fields needing cleanup are recorded
    /// in `cleanup`.
    pub(crate) fn lower_filter(
        &mut self,
        expr: &Expression,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
        stages: &mut Vec<Document>,
        cleanup: &mut Vec<String>,
    ) -> Result<Document> {
        if let Some(query) = try_query_filter(expr, scope, let_vars)? {
            return Ok(query);
        }
        let condition = self.lower_predicate(expr, scope, let_vars, stages, cleanup)?;
        Ok(doc! {"$expr": condition})
    }

    /// A filter for contexts that cannot host pipeline stages (find fast
    /// path, UPDATE/DELETE). Subqueries are rejected.
    pub(crate) fn lower_stageless_filter(
        &mut self,
        expr: &Expression,
        scope: &NameScope,
    ) -> Result<Document> {
        if expr.contains_subquery() {
            return Err(Error::UnsupportedConstruct(
                "subquery in a non-SELECT filter".into(),
            ));
        }
        let mut let_vars = Vec::new();
        let mut stages = Vec::new();
        let mut cleanup = Vec::new();
        self.lower_filter(expr, scope, &mut let_vars, &mut stages, &mut cleanup)
    }

    /// Expression-context predicate lowering with subquery lifting.
    fn lower_predicate(
        &mut self,
        expr: &Expression,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
        stages: &mut Vec<Document>,
        cleanup: &mut Vec<String>,
    ) -> Result<Bson> {
        match expr {
            Expression::Binary {
                left,
                op: BinaryOp::And,
                right,
            } => {
                let l = self.lower_predicate(left, scope, let_vars, stages, cleanup)?;
                let r = self.lower_predicate(right, scope, let_vars, stages, cleanup)?;
                Ok(bson!({"$and": [l, r]}))
            }
            Expression::Binary {
                left,
                op: BinaryOp::Or,
                right,
            } => {
                let l = self.lower_predicate(left, scope, let_vars, stages, cleanup)?;
                let r = self.lower_predicate(right, scope, let_vars, stages, cleanup)?;
                Ok(bson!({"$or": [l, r]}))
            }
            Expression::Unary {
                op: UnaryOp::Not,
                expr,
            } => {
                let inner = self.lower_predicate(expr, scope, let_vars, stages, cleanup)?;
                Ok(bson!({"$not": [inner]}))
            }

            // [NOT] IN (SELECT ...)
            Expression::Binary {
                left,
                op: op @ (BinaryOp::In | BinaryOp::NotIn),
                right,
            } => {
                let Expression::Subquery(sub) = right.as_ref() else {
                    return self.lower_expr(expr, scope, let_vars);
                };
                let lhs = self.lower_expr(left, scope, let_vars)?;
                let (field, column) = self.lower_in_subquery(&sub.query, scope, stages)?;
                cleanup.push(field.clone());
                let membership = bson!({"$in": [lhs, format!("${field}.{column}")]});
                Ok(if *op == BinaryOp::NotIn {
                    bson!({"$not": [membership]})
                } else {
                    membership
                })
            }

            // EXISTS / NOT EXISTS (SELECT ...)
            Expression::Subquery(sub)
                if matches!(sub.kind, SubqueryKind::Exists | SubqueryKind::NotExists) =>
            {
                let field = self.lower_exists_subquery(&sub.query, scope, stages)?;
                cleanup.push(field.clone());
                let size = bson!({"$size": format!("${field}")});
                Ok(if sub.kind == SubqueryKind::Exists {
                    bson!({"$gt": [size, 0]})
                } else {
                    bson!({"$eq": [size, 0]})
                })
            }

            // comparison against a scalar or row subquery
            Expression::Binary { left, op, right } if right.contains_subquery() => {
                match right.as_ref() {
                    Expression::Subquery(sub) if sub.kind == SubqueryKind::Scalar => {
                        let lhs = self.lower_expr(left, scope, let_vars)?;
                        let path = self.lower_scalar_subquery(&sub.query, scope, stages)?;
                        self.comparison(*op, lhs, Bson::String(path))
                    }
                    Expression::Subquery(sub) if sub.kind == SubqueryKind::Row => {
                        if *op != BinaryOp::Eq {
                            return Err(Error::UnsupportedConstruct(
                                "row subqueries only support equality".into(),
                            ));
                        }
                        let Expression::Tuple(items) = left.as_ref() else {
                            return Err(Error::UnsupportedConstruct(
                                "row subquery without a row constructor".into(),
                            ));
                        };
                        let (field, columns) =
                            self.lower_row_subquery(&sub.query, scope, stages)?;
                        cleanup.push(field.clone());
                        if items.len() != columns.len() {
                            return Err(Error::UnsupportedConstruct(format!(
                                "row constructor has {} columns, subquery has {}",
                                items.len(),
                                columns.len()
                            )));
                        }
                        let mut equalities = Vec::with_capacity(items.len());
                        for (item, column) in items.iter().zip(&columns) {
                            let lhs = self.lower_expr(item, scope, let_vars)?;
                            equalities
                                .push(bson!({"$eq": [lhs, format!("${field}.{column}")]}));
                        }
                        Ok(bson!({"$and": equalities}))
                    }
                    _ => Err(Error::UnsupportedConstruct(
                        "subquery in this position".into(),
                    )),
                }
            }

            _ => self.lower_expr(expr, scope, let_vars),
        }
    }

    fn comparison(&self, op: BinaryOp, left: Bson, right: Bson) -> Result<Bson> {
        let name = match op {
            BinaryOp::Eq => "$eq",
            BinaryOp::Neq => "$ne",
            BinaryOp::Lt => "$lt",
            BinaryOp::Lte => "$lte",
            BinaryOp::Gt => "$gt",
            BinaryOp::Gte => "$gte",
            other => {
                return Err(Error::UnsupportedConstruct(format!(
                    "{other:?} against a subquery"
                )))
            }
        };
        let mut d = Document::new();
        d.insert(name, bson!([left, right]));
        Ok(Bson::Document(d))
    }
}

/// Attempt to express a predicate as a MongoDB query document. Returns
/// `Ok(None)` when the predicate needs `$expr` instead.
pub(crate) fn try_query_filter(
    expr: &Expression,
    scope: &NameScope,
    let_vars: &mut Vec<LetVar>,
) -> Result<Option<Document>> {
    query_predicate(expr, scope, let_vars)
}

fn query_predicate(
    expr: &Expression,
    scope: &NameScope,
    let_vars: &mut Vec<LetVar>,
) -> Result<Option<Document>> {
    match expr {
        Expression::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => {
            let (Some(l), Some(r)) = (
                query_predicate(left, scope, let_vars)?,
                query_predicate(right, scope, let_vars)?,
            ) else {
                return Ok(None);
            };
            Ok(Some(merge_and(l, r)))
        }
        Expression::Binary {
            left,
            op: BinaryOp::Or,
            right,
        } => {
            let (Some(l), Some(r)) = (
                query_predicate(left, scope, let_vars)?,
                query_predicate(right, scope, let_vars)?,
            ) else {
                return Ok(None);
            };
            // flatten nested $or arms
            let mut arms = vec![];
            for side in [l, r] {
                if side.len() == 1 {
                    if let Ok(nested) = side.get_array("$or") {
                        arms.extend(nested.iter().cloned());
                        continue;
                    }
                }
                arms.push(Bson::Document(side));
            }
            Ok(Some(doc! {"$or": arms}))
        }

        Expression::Binary { left, op, right } if op.is_comparison() => {
            // column <op> literal, either way round
            let (column, literal, op) =
                match (column_name(left, scope, let_vars)?, simple_literal(right)) {
                    (Some(c), Some(v)) => (c, v, *op),
                    _ => match (column_name(right, scope, let_vars)?, simple_literal(left)) {
                        (Some(c), Some(v)) => (c, v, flip(*op)),
                        _ => return Ok(None),
                    },
                };
            let filter = match op {
                BinaryOp::Eq => doc! {column: literal},
                BinaryOp::Neq => doc! {column: {"$ne": literal}},
                BinaryOp::Lt => doc! {column: {"$lt": literal}},
                BinaryOp::Lte => doc! {column: {"$lte": literal}},
                BinaryOp::Gt => doc! {column: {"$gt": literal}},
                BinaryOp::Gte => doc! {column: {"$gte": literal}},
                _ => return Ok(None),
            };
            Ok(Some(filter))
        }

        Expression::Binary {
            left,
            op: BinaryOp::Like | BinaryOp::NotLike,
            right,
        } => {
            let (Some(column), Expression::Literal(Literal::String(pattern))) =
                (column_name(left, scope, let_vars)?, right.as_ref())
            else {
                return Ok(None);
            };
            let regex = like_to_regex(pattern);
            let negated = matches!(
                expr,
                Expression::Binary {
                    op: BinaryOp::NotLike,
                    ..
                }
            );
            let filter = if negated {
                doc! {column: {"$not": {"$regex": regex, "$options": "i"}}}
            } else {
                doc! {column: {"$regex": regex, "$options": "i"}}
            };
            Ok(Some(filter))
        }

        Expression::Binary {
            left,
            op: BinaryOp::Regexp | BinaryOp::NotRegexp,
            right,
        } => {
            let (Some(column), Expression::Literal(Literal::String(pattern))) =
                (column_name(left, scope, let_vars)?, right.as_ref())
            else {
                return Ok(None);
            };
            let negated = matches!(
                expr,
                Expression::Binary {
                    op: BinaryOp::NotRegexp,
                    ..
                }
            );
            let filter = if negated {
                doc! {column: {"$not": {"$regex": pattern.clone(), "$options": "i"}}}
            } else {
                doc! {column: {"$regex": pattern.clone(), "$options": "i"}}
            };
            Ok(Some(filter))
        }

        Expression::InList {
            expr: left,
            list,
            negated,
        } => {
            let Some(column) = column_name(left, scope, let_vars)? else {
                return Ok(None);
            };
            let mut values = Vec::with_capacity(list.len());
            for item in list {
                match simple_literal(item) {
                    Some(v) => values.push(v),
                    None => return Ok(None),
                }
            }
            let filter = if *negated {
                doc! {column: {"$nin": values}}
            } else {
                doc! {column: {"$in": values}}
            };
            Ok(Some(filter))
        }

        Expression::Unary {
            op: UnaryOp::IsNull,
            expr,
        } => match column_name(expr, scope, let_vars)? {
            Some(column) => Ok(Some(doc! {column: Bson::Null})),
            None => Ok(None),
        },
        Expression::Unary {
            op: UnaryOp::IsNotNull,
            expr,
        } => match column_name(expr, scope, let_vars)? {
            // existence and non-null, not merely inequality
            Some(column) => Ok(Some(doc! {column: {"$exists": true, "$ne": Bson::Null}})),
            None => Ok(None),
        },

        // full-text search is filter-only in MongoDB
        Expression::Match(m) => Ok(Some(doc! {"$text": {"$search": m.query.clone()}})),

        _ => Ok(None),
    }
}

/// Merge two AND-ed query documents, stacking into `$and` on key conflicts.
fn merge_and(left: Document, right: Document) -> Document {
    let conflict = right.keys().any(|k| left.contains_key(k));
    if conflict || left.contains_key("$and") || right.contains_key("$and") {
        doc! {"$and": [left, right]}
    } else {
        let mut merged = left;
        merged.extend(right);
        merged
    }
}

/// The query-document key for a column reference, resolved through the
/// scope: base columns address root fields, joined columns address their
/// embedded documents by dotted path. Correlated references cannot appear
/// in query form.
fn column_name(
    expr: &Expression,
    scope: &NameScope,
    let_vars: &mut Vec<LetVar>,
) -> Result<Option<String>> {
    let Expression::Column(id) = expr else {
        return Ok(None);
    };
    let path = scope.resolve(id, let_vars)?;
    match path.strip_prefix("$$") {
        Some(_) => Ok(None),
        None => Ok(Some(path[1..].to_string())),
    }
}

/// Literal values usable inside a query document (no expression evaluation
/// happens in query form).
fn simple_literal(expr: &Expression) -> Option<Bson> {
    match expr {
        Expression::Literal(Literal::Null) => Some(Bson::Null),
        Expression::Literal(Literal::Boolean(b)) => Some(Bson::Boolean(*b)),
        Expression::Literal(Literal::Integer(i)) => {
            Some(super::expression::lower_literal(&Literal::Integer(*i)))
        }
        Expression::Literal(Literal::Float(f)) => Some(Bson::Double(*f)),
        Expression::Literal(Literal::String(s)) => Some(Bson::String(s.clone())),
        _ => None,
    }
}

fn flip(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::Lte => BinaryOp::Gte,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::Gte => BinaryOp::Lte,
        other => other,
    }
}
