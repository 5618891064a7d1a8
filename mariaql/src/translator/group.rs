//! GROUP BY / HAVING / DISTINCT lowering. Grouped queries emit one `$group`
//! stage whose `_id` is the group key (a bare expression for one key, a
//! document for several); aggregate projections become accumulators and
//! grouped key projections are carried through with `$first`. HAVING
//! matches over the group output, resolving accumulator aliases first.

use super::{
    display_name, projection_name, Error, LetVar, MqlTranslator, NameScope, Result,
};
use crate::ast::*;
use crate::catalog::aggregate::{self, Finalize};
use bson::{doc, Bson, Document};

/// How one SELECT output is produced after the `$group` stage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GroupValue {
    /// The field already exists at the root under its output name.
    Plain,
    /// The accumulator field needs a finalizing rewrite in the projection.
    Finalized(Finalize),
}

#[derive(Debug, Clone)]
pub(crate) struct GroupOutput {
    pub name: String,
    pub value: GroupValue,
    /// Aggregate outputs are known numeric-ish and never drive collation.
    pub aggregate: bool,
}

pub(crate) struct GroupLowering {
    pub stages: Vec<Document>,
    /// Outputs in projection order.
    pub outputs: Vec<GroupOutput>,
}

impl<'a> MqlTranslator<'a> {
    /// True when the projection is a top-level aggregate call.
    pub(crate) fn is_aggregate_projection(&self, expr: &Expression) -> bool {
        matches!(expr, Expression::FunctionCall(f)
            if f.over.is_none() && self.catalog.is_aggregate(&f.name, f.args.len()))
    }

    /// True when the statement must group: explicit GROUP BY, HAVING, or an
    /// aggregate projection.
    pub(crate) fn needs_group(&self, stmt: &SelectStatement) -> bool {
        !stmt.group_by.is_empty()
            || stmt.having.is_some()
            || stmt
                .projections
                .iter()
                .any(|p| self.is_aggregate_projection(&p.expr))
    }

    pub(crate) fn lower_group(
        &mut self,
        stmt: &SelectStatement,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<GroupLowering> {
        if stmt.distinct {
            return Err(Error::DistinctGroupByConflict);
        }

        // nested aggregates (SUM(x) + 1) are not lowered; the aggregate must
        // be the whole projection
        for p in &stmt.projections {
            if !self.is_aggregate_projection(&p.expr)
                && p.expr.any(&mut |e| self.is_aggregate_projection(e))
            {
                return Err(Error::UnsupportedConstruct(
                    "aggregate call nested inside a projection expression".into(),
                ));
            }
        }

        // every non-aggregate projection must be one of the group keys
        for p in &stmt.projections {
            if self.is_aggregate_projection(&p.expr) {
                continue;
            }
            if matches!(p.expr, Expression::Star | Expression::QualifiedStar(_)) {
                return Err(Error::GroupByMismatch(
                    "`*` cannot be projected from a grouped query".into(),
                ));
            }
            if !stmt.group_by.iter().any(|k| *k == p.expr) {
                return Err(Error::GroupByMismatch(format!(
                    "projection {} does not appear in GROUP BY",
                    projection_name(p)
                )));
            }
        }

        // group key: bare expression for a single key, document for several
        let group_id = match stmt.group_by.as_slice() {
            [] => Bson::Null,
            [key] => self.lower_expr(key, scope, let_vars)?,
            keys => {
                let mut id = Document::new();
                for (i, key) in keys.iter().enumerate() {
                    id.insert(
                        self.group_key_name(key, stmt, i),
                        self.lower_expr(key, scope, let_vars)?,
                    );
                }
                Bson::Document(id)
            }
        };

        let mut group_doc = Document::new();
        group_doc.insert("_id", group_id);

        // accumulators first, then the `$first` carries for grouped keys;
        // outputs keep projection order for the later stages
        let mut outputs = Vec::with_capacity(stmt.projections.len());
        for p in &stmt.projections {
            let name = projection_name(p);
            if self.is_aggregate_projection(&p.expr) {
                let Expression::FunctionCall(f) = &p.expr else {
                    unreachable!()
                };
                let plan = self.accumulator_plan(f, scope, let_vars)?;
                group_doc.insert(name.clone(), plan.accumulator);
                let value = match plan.finalize {
                    Finalize::None => GroupValue::Plain,
                    fin => GroupValue::Finalized(fin),
                };
                outputs.push(GroupOutput {
                    name,
                    value,
                    aggregate: true,
                });
            } else {
                outputs.push(GroupOutput {
                    name,
                    value: GroupValue::Plain,
                    aggregate: false,
                });
            }
        }
        for p in &stmt.projections {
            if self.is_aggregate_projection(&p.expr) {
                continue;
            }
            let lowered = self.lower_expr(&p.expr, scope, let_vars)?;
            group_doc.insert(projection_name(p), doc! {"$first": lowered});
        }

        // HAVING aggregates that are not projected still need accumulating
        let mut having_filter = None;
        if let Some(having) = &stmt.having {
            if having.contains_subquery() {
                return Err(Error::UnsupportedConstruct("subquery in HAVING".into()));
            }
            let rewritten =
                self.rewrite_having(having, stmt, scope, let_vars, &mut group_doc)?;
            let post_scope = NameScope::default();
            let mut post_let_vars = Vec::new();
            let filter = match super::filter::try_query_filter(
                &rewritten,
                &post_scope,
                &mut post_let_vars,
            )? {
                Some(query) => query,
                None => {
                    let condition =
                        self.lower_expr(&rewritten, &post_scope, &mut post_let_vars)?;
                    doc! {"$expr": condition}
                }
            };
            having_filter = Some(filter);
        }

        let mut stages = vec![doc! {"$group": group_doc}];
        if let Some(filter) = having_filter {
            stages.push(doc! {"$match": filter});
        }
        Ok(GroupLowering { stages, outputs })
    }

    /// `SELECT DISTINCT a, b` without GROUP BY: group on the projection
    /// tuple, then reconstruct the document from the key.
    pub(crate) fn lower_distinct(
        &mut self,
        stmt: &SelectStatement,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<GroupLowering> {
        let mut id = Document::new();
        let mut outputs = Vec::with_capacity(stmt.projections.len());
        for p in &stmt.projections {
            if matches!(p.expr, Expression::Star | Expression::QualifiedStar(_)) {
                return Err(Error::UnsupportedConstruct("SELECT DISTINCT *".into()));
            }
            if self.is_aggregate_projection(&p.expr) {
                return Err(Error::DistinctGroupByConflict);
            }
            let name = projection_name(p);
            id.insert(name.clone(), self.lower_expr(&p.expr, scope, let_vars)?);
            outputs.push(GroupOutput {
                name,
                value: GroupValue::Plain,
                aggregate: false,
            });
        }
        let stages = vec![
            doc! {"$group": {"_id": id}},
            doc! {"$replaceRoot": {"newRoot": "$_id"}},
        ];
        Ok(GroupLowering { stages, outputs })
    }

    /// Build the accumulator for one aggregate call.
    fn accumulator_plan(
        &mut self,
        f: &FunctionExpr,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<aggregate::AccumulatorPlan> {
        self.catalog.check_arity(&f.name, f.args.len())?;
        let arg = match f.args.as_slice() {
            [Expression::Star] => None,
            [expr] => Some(self.lower_expr(expr, scope, let_vars)?),
            _ => {
                return Err(Error::UnsupportedConstruct(format!(
                    "aggregate {} with {} arguments",
                    f.name,
                    f.args.len()
                )))
            }
        };
        let sort = self.group_concat_sort(f)?;
        Ok(aggregate::accumulator(
            &f.name,
            arg,
            f.distinct,
            f.separator.as_deref(),
            sort,
        )?)
    }

    /// GROUP_CONCAT may order its own values, but only by the concatenated
    /// expression itself; anything else cannot be expressed in the reduce.
    fn group_concat_sort(&self, f: &FunctionExpr) -> Result<Option<i32>> {
        match f.order_by.as_slice() {
            [] => Ok(None),
            [spec] => match &spec.key {
                SortKey::Expr(e) if f.args.first() == Some(e) => {
                    Ok(Some(if spec.asc { 1 } else { -1 }))
                }
                _ => Err(Error::UnsupportedConstruct(
                    "GROUP_CONCAT ORDER BY on a different expression".into(),
                )),
            },
            _ => Err(Error::UnsupportedConstruct(
                "GROUP_CONCAT with multiple ORDER BY keys".into(),
            )),
        }
    }

    /// Replace aggregate calls inside HAVING with references to their
    /// accumulator fields, adding hidden accumulators for ones that are not
    /// projected. Name resolution prefers accumulator aliases, then group
    /// keys.
    fn rewrite_having(
        &mut self,
        having: &Expression,
        stmt: &SelectStatement,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
        group_doc: &mut Document,
    ) -> Result<Expression> {
        if self.is_aggregate_projection(having) {
            // an aggregate call: reuse the projected accumulator if one is
            // structurally identical
            for p in &stmt.projections {
                if p.expr == *having {
                    return Ok(Expression::Column(Identifier::simple(projection_name(p))));
                }
            }
            let Expression::FunctionCall(f) = having else {
                unreachable!()
            };
            let name = display_name(having);
            if !group_doc.contains_key(&name) {
                let plan = self.accumulator_plan(f, scope, let_vars)?;
                if plan.finalize != Finalize::None {
                    return Err(Error::UnsupportedConstruct(format!(
                        "HAVING over non-projected {}",
                        f.name
                    )));
                }
                group_doc.insert(name.clone(), plan.accumulator);
            }
            return Ok(Expression::Column(Identifier::simple(name)));
        }

        // rebuild the node with rewritten children
        let rewritten = match having {
            Expression::Binary { left, op, right } => Expression::Binary {
                left: Box::new(self.rewrite_having(left, stmt, scope, let_vars, group_doc)?),
                op: *op,
                right: Box::new(self.rewrite_having(right, stmt, scope, let_vars, group_doc)?),
            },
            Expression::Unary { op, expr } => Expression::Unary {
                op: *op,
                expr: Box::new(self.rewrite_having(expr, stmt, scope, let_vars, group_doc)?),
            },
            Expression::InList {
                expr,
                list,
                negated,
            } => Expression::InList {
                expr: Box::new(self.rewrite_having(expr, stmt, scope, let_vars, group_doc)?),
                list: list
                    .iter()
                    .map(|e| self.rewrite_having(e, stmt, scope, let_vars, group_doc))
                    .collect::<Result<Vec<_>>>()?,
                negated: *negated,
            },
            Expression::Column(id) => {
                // group keys and aliases address the group output by name
                Expression::Column(Identifier::simple(id.name.clone()))
            }
            other => other.clone(),
        };
        Ok(rewritten)
    }

    /// The field name of one multi-column group key.
    fn group_key_name(&self, key: &Expression, stmt: &SelectStatement, index: usize) -> String {
        if let Expression::Column(id) = key {
            return id.name.clone();
        }
        for p in &stmt.projections {
            if p.expr == *key {
                return projection_name(p);
            }
        }
        format!("key_{index}")
    }
}
