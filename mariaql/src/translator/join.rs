//! JOIN lowering: each join becomes a `$lookup` carrying the ON condition
//! in its sub-pipeline, followed by a `$unwind` of the joined alias. LEFT
//! joins preserve unmatched documents, INNER joins drop them, CROSS joins
//! have an empty sub-pipeline.

use super::{Error, LetVar, MqlTranslator, NameScope, Result};
use crate::ast::*;
use bson::{bson, doc, Bson, Document};

impl<'a> MqlTranslator<'a> {
    /// Lower a chain of joins in source order, growing `scope.joined` as
    /// aliases come into view.
    pub(crate) fn lower_joins(
        &mut self,
        joins: &[JoinOp],
        scope: &mut NameScope,
        stages: &mut Vec<Document>,
    ) -> Result<()> {
        for join in joins {
            if join.kind == JoinKind::Right {
                // the first RIGHT join is handled by swapping base and
                // target before lowering starts
                return Err(Error::UnsupportedConstruct(
                    "RIGHT JOIN after the first join".into(),
                ));
            }
            self.lower_join(join, scope, stages)?;
        }
        Ok(())
    }

    pub(crate) fn lower_join(
        &mut self,
        join: &JoinOp,
        scope: &mut NameScope,
        stages: &mut Vec<Document>,
    ) -> Result<()> {
        let alias = join.target.binding_name().to_string();

        // the join source: a plain collection, a CTE, or a derived table
        let (from, mut pipeline) = match &join.target {
            TableRef::Collection { name, .. } => match self.ctes.get(name) {
                Some(cte) => {
                    let cte = cte.clone();
                    if cte.recursive {
                        return Err(Error::UnsupportedCte(format!(
                            "recursive CTE {name} cannot be joined"
                        )));
                    }
                    (cte.collection, cte.pipeline)
                }
                None => (Some(name.clone()), vec![]),
            },
            TableRef::Derived { query, alias: _ } => {
                let plan = self.lower_select_pipeline(query, &NameScope::default())?;
                (plan.collection, plan.pipeline)
            }
        };

        let mut let_vars: Vec<LetVar> = Vec::new();
        if let Some(on) = &join.on {
            // inside the sub-pipeline the join target resolves at the root;
            // everything already in scope surfaces through let bindings
            let inner_scope = NameScope {
                base: vec![alias.clone()],
                joined: vec![],
                outer_roots: scope.base.clone(),
                outer_joined: scope.joined.clone(),
                far: {
                    let mut far = scope.far.clone();
                    far.extend(scope.outer_roots.iter().cloned());
                    far.extend(scope.outer_joined.iter().cloned());
                    far
                },
            };
            let condition = self.lower_on_condition(on, &inner_scope, &mut let_vars)?;
            pipeline.push(doc! {"$match": {"$expr": condition}});
        } else if join.kind != JoinKind::Cross {
            return Err(Error::UnsupportedConstruct(format!(
                "{:?} JOIN without an ON condition",
                join.kind
            )));
        }

        let mut lookup = Document::new();
        if let Some(from) = from {
            lookup.insert("from", from);
        }
        if !let_vars.is_empty() {
            let mut let_doc = Document::new();
            for var in &let_vars {
                let_doc.insert(var.name.clone(), var.path.clone());
            }
            lookup.insert("let", let_doc);
        }
        lookup.insert("pipeline", pipeline);
        lookup.insert("as", alias.clone());
        stages.push(doc! {"$lookup": lookup});

        stages.push(doc! {"$unwind": {
            "path": format!("${alias}"),
            "preserveNullAndEmptyArrays": join.kind == JoinKind::Left
        }});

        scope.joined.push(alias);
        Ok(())
    }

    /// Lower the ON condition. Comparisons are ordered with the join-target
    /// side first and the outer `$$var` side second, which is the shape the
    /// wire contract pins down.
    fn lower_on_condition(
        &mut self,
        on: &Expression,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<Bson> {
        match on {
            Expression::Binary {
                left,
                op: BinaryOp::And,
                right,
            } => {
                let l = self.lower_on_condition(left, scope, let_vars)?;
                let r = self.lower_on_condition(right, scope, let_vars)?;
                Ok(bson!({"$and": [l, r]}))
            }
            Expression::Binary { left, op, right } if op.is_comparison() => {
                let l = self.lower_expr(left, scope, let_vars)?;
                let r = self.lower_expr(right, scope, let_vars)?;
                let (l, r, op) = if is_outer_var(&l) && !is_outer_var(&r) {
                    (r, l, flip(*op))
                } else {
                    (l, r, *op)
                };
                let operator = match op {
                    BinaryOp::Eq => "$eq",
                    BinaryOp::Neq => "$ne",
                    BinaryOp::Lt => "$lt",
                    BinaryOp::Lte => "$lte",
                    BinaryOp::Gt => "$gt",
                    BinaryOp::Gte => "$gte",
                    _ => unreachable!(),
                };
                let mut d = Document::new();
                d.insert(operator, bson!([l, r]));
                Ok(Bson::Document(d))
            }
            other => self.lower_expr(other, scope, let_vars),
        }
    }
}

/// Swap base and target for a leading RIGHT join so it lowers as a LEFT
/// join; aliases resolve the same either way round.
pub(crate) fn swap_right_join(from: TableRef, joins: Vec<JoinOp>) -> (TableRef, Vec<JoinOp>) {
    let mut joins = joins;
    if joins.first().map(|j| j.kind) != Some(JoinKind::Right) {
        return (from, joins);
    }
    let first = joins.remove(0);
    let new_base = first.target;
    joins.insert(
        0,
        JoinOp {
            kind: JoinKind::Left,
            target: from,
            on: first.on,
        },
    );
    (new_base, joins)
}

fn is_outer_var(v: &Bson) -> bool {
    matches!(v, Bson::String(s) if s.starts_with("$$"))
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
