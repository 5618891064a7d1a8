//! SELECT lowering: the find fast path and the aggregate pipeline assembly
//! in the contract stage order — CTE/base resolution, joins, `$match`,
//! `$setWindowFields`, `$group`/HAVING/DISTINCT, `$sort`, `$project`, the
//! implicit ordering shim, then `$skip`/`$limit`.

use super::{
    group::{GroupLowering, GroupValue},
    join::swap_right_join,
    projection_name,
    window::WindowProjection,
    Error, LetVar, MqlTranslator, NameScope, Result, SelectPlan,
};
use crate::{
    ast::*,
    catalog::aggregate,
    invocation::{AggregateInvocation, FindInvocation, Invocation},
};
use bson::{bson, doc, Document};

impl<'a> MqlTranslator<'a> {
    pub(crate) fn translate_select(&mut self, stmt: &SelectStatement) -> Result<Invocation> {
        if self.is_find_candidate(stmt) {
            return self.lower_find(stmt);
        }
        let plan = self.lower_select_pipeline(stmt, &NameScope::default())?;
        let collation = if plan.sorted_on_column {
            Some(self.options.collation.clone())
        } else {
            None
        };
        Ok(Invocation::Aggregate(AggregateInvocation {
            database: self.database.clone(),
            collection: plan.collection,
            pipeline: plan.pipeline,
            collation,
        }))
    }

    /// The fast path applies only to plain single-collection reads: no
    /// joins, grouping, distinct, subqueries, windows, or computed
    /// projections.
    fn is_find_candidate(&self, stmt: &SelectStatement) -> bool {
        let from_plain_collection = match &stmt.from {
            Some(TableRef::Collection { name, .. }) => !self.ctes.contains_key(name),
            _ => false,
        };
        if !from_plain_collection
            || !stmt.joins.is_empty()
            || !stmt.group_by.is_empty()
            || stmt.having.is_some()
            || stmt.distinct
        {
            return false;
        }
        if stmt
            .where_clause
            .as_ref()
            .is_some_and(|w| w.contains_subquery())
        {
            return false;
        }
        let simple_projection = stmt.projections.iter().all(|p| {
            matches!(
                &p.expr,
                Expression::Star | Expression::Column(_) | Expression::Literal(_)
            ) || matches!(&p.expr, Expression::QualifiedStar(q)
                if stmt.from.as_ref().is_some_and(|f| f.binding_name() == q))
        });
        if !simple_projection {
            return false;
        }
        stmt.order_by.iter().all(|spec| match &spec.key {
            SortKey::Positional(_) => true,
            SortKey::Expr(Expression::Column(_)) => true,
            SortKey::Expr(_) => false,
        })
    }

    fn lower_find(&mut self, stmt: &SelectStatement) -> Result<Invocation> {
        let Some(from @ TableRef::Collection { name, .. }) = &stmt.from else {
            return Err(Error::UnsupportedConstruct("find without a collection".into()));
        };
        let scope = NameScope::root(vec![from.binding_name().to_string()]);

        let filter = stmt
            .where_clause
            .as_ref()
            .map(|w| self.lower_stageless_filter(w, &scope))
            .transpose()?;

        let has_star = stmt.projections.iter().any(|p| {
            matches!(p.expr, Expression::Star | Expression::QualifiedStar(_))
        });
        let projection = if has_star {
            None
        } else {
            let mut doc = doc! {"_id": 0};
            for p in &stmt.projections {
                let name = projection_name(p);
                match &p.expr {
                    Expression::Column(id) if name == id.name => {
                        doc.insert(name, 1);
                    }
                    Expression::Column(id) => {
                        doc.insert(name, format!("${}", id.name));
                    }
                    Expression::Literal(lit) => {
                        doc.insert(
                            name,
                            bson!({"$literal": super::expression::lower_literal(lit)}),
                        );
                    }
                    _ => {
                        return Err(Error::UnsupportedConstruct(
                            "computed projection on the find path".into(),
                        ))
                    }
                }
            }
            Some(doc)
        };

        let mut sort = Document::new();
        for spec in &stmt.order_by {
            let column = match &spec.key {
                SortKey::Expr(Expression::Column(id)) => id.name.clone(),
                SortKey::Positional(n) => self.positional_column(stmt, *n)?,
                SortKey::Expr(_) => {
                    return Err(Error::UnsupportedConstruct(
                        "computed sort key on the find path".into(),
                    ))
                }
            };
            sort.insert(column, if spec.asc { 1 } else { -1 });
        }
        let explicit_sort = !sort.is_empty();
        if !explicit_sort && stmt.limit.is_some() && self.options.implicit_order_on_limit {
            sort.insert("_id", 1);
        }

        let filter_is_ci = stmt.where_clause.as_ref().is_some_and(|w| {
            w.any(&mut |e| {
                matches!(
                    e,
                    Expression::Binary {
                        op: BinaryOp::Like
                            | BinaryOp::NotLike
                            | BinaryOp::Regexp
                            | BinaryOp::NotRegexp,
                        ..
                    }
                )
            })
        });
        let collation = if explicit_sort || filter_is_ci {
            Some(self.options.collation.clone())
        } else {
            None
        };

        Ok(Invocation::Find(FindInvocation {
            database: self.database.clone(),
            collection: name.clone(),
            filter,
            projection,
            sort: if sort.is_empty() { None } else { Some(sort) },
            skip: stmt.offset.map(|n| n as i64),
            limit: stmt.limit.map(|n| n as i64),
            collation,
        }))
    }

    fn positional_column(&self, stmt: &SelectStatement, position: u32) -> Result<String> {
        let index = position as usize - 1;
        let Some(projection) = stmt.projections.get(index) else {
            return Err(Error::UnresolvedIdentifier(format!(
                "ORDER BY position {position}"
            )));
        };
        match &projection.expr {
            Expression::Column(id) => Ok(id.name.clone()),
            _ => Ok(projection_name(projection)),
        }
    }

    /// Lower one SELECT into an aggregation pipeline. `outer` is the
    /// enclosing query's scope when this SELECT is a subquery.
    pub(crate) fn lower_select_pipeline(
        &mut self,
        stmt: &SelectStatement,
        outer: &NameScope,
    ) -> Result<SelectPlan> {
        let mut pipeline: Vec<Document> = Vec::new();
        let mut let_vars: Vec<LetVar> = Vec::new();
        let mut cleanup: Vec<String> = Vec::new();

        // a leading RIGHT join lowers as a LEFT join with the sides swapped
        let (from, joins) = match stmt.from.clone() {
            Some(from) => {
                let (from, joins) = swap_right_join(from, stmt.joins.clone());
                (Some(from), joins)
            }
            None => (None, vec![]),
        };

        // base collection, CTE inlining, or the synthetic one-document
        // source for table-less selects
        let (collection, base_binding) = match &from {
            None => {
                pipeline.push(doc! {"$documents": [{}]});
                (None, None)
            }
            Some(TableRef::Collection { name, alias }) => {
                let binding = alias.clone().unwrap_or_else(|| name.clone());
                match self.ctes.get(name) {
                    Some(cte) => {
                        let cte = cte.clone();
                        pipeline.extend(cte.pipeline.iter().cloned());
                        (cte.collection, Some(binding))
                    }
                    None => (Some(name.clone()), Some(binding)),
                }
            }
            Some(TableRef::Derived { query, alias }) => {
                // the derived pipeline replaces the base collection; its
                // outputs live at the root under the derived alias
                let plan = self.lower_select_pipeline(query, &NameScope::default())?;
                pipeline.extend(plan.pipeline);
                (plan.collection, Some(alias.clone()))
            }
        };

        let mut scope = outer.child(base_binding.clone().into_iter().collect());

        self.lower_joins(&joins, &mut scope, &mut pipeline)?;

        let has_star = stmt.projections.iter().any(|p| {
            matches!(&p.expr, Expression::Star)
                || matches!((&p.expr, &base_binding), (Expression::QualifiedStar(q), Some(b)) if q == b)
        });

        if let Some(where_clause) = &stmt.where_clause {
            let filter =
                self.lower_filter(where_clause, &scope, &mut let_vars, &mut pipeline, &mut cleanup)?;
            pipeline.push(doc! {"$match": filter});
            // without an explicit projection to fold into, lookup helper
            // fields are dropped right after the match
            if has_star && !cleanup.is_empty() {
                let mut exclusions = Document::new();
                for name in cleanup.drain(..) {
                    exclusions.insert(name, 0);
                }
                pipeline.push(doc! {"$project": exclusions});
            }
        }

        let windows = self.lower_windows(stmt, &scope, &mut let_vars)?;
        let window_projections = windows.projections;
        pipeline.extend(windows.stages);

        let group = if self.needs_group(stmt) {
            Some(self.lower_group(stmt, &scope, &mut let_vars)?)
        } else if stmt.distinct {
            Some(self.lower_distinct(stmt, &scope, &mut let_vars)?)
        } else {
            None
        };
        if let Some(group) = &group {
            pipeline.extend(group.stages.iter().cloned());
        }

        // scalar subqueries in the projection list become lookups feeding
        // the projection stage
        let projections = if group.is_none() {
            self.lift_projection_subqueries(&stmt.projections, &scope, &mut pipeline)?
        } else {
            stmt.projections.clone()
        };

        let mut sorted_on_column = false;
        let mut sort_temps: Vec<String> = Vec::new();
        if !stmt.order_by.is_empty() {
            let sort = self.lower_order_by(
                stmt,
                &projections,
                group.as_ref(),
                &scope,
                &mut let_vars,
                &mut pipeline,
                &mut sort_temps,
                &mut sorted_on_column,
            )?;
            pipeline.push(doc! {"$sort": sort});
            if has_star && !sort_temps.is_empty() {
                pipeline.push(doc! {"$unset": sort_temps.clone()});
            }
        }

        // projection
        let mut outputs = Vec::new();
        if has_star {
            outputs.clear();
        } else {
            let mut project = doc! {"_id": 0};
            for (index, projection) in projections.iter().enumerate() {
                let name = projection_name(projection);
                outputs.push(name.clone());
                if let Some((_, wp)) = window_projections.iter().find(|(i, _)| *i == index) {
                    match wp {
                        WindowProjection::Field => project.insert(name, 1),
                        WindowProjection::Expr(e) => project.insert(name, e.clone()),
                    };
                    continue;
                }
                if let Some(group) = &group {
                    match &group.outputs[index].value {
                        GroupValue::Plain => project.insert(name, 1),
                        GroupValue::Finalized(fin) => {
                            let path = format!("${}", group.outputs[index].name);
                            project.insert(name, aggregate::finalize(&path, fin))
                        }
                    };
                    continue;
                }
                match &projection.expr {
                    Expression::QualifiedStar(q) => {
                        // a joined alias projects as its embedded document
                        project.insert(q.clone(), 1);
                        outputs.pop();
                        outputs.push(q.clone());
                    }
                    Expression::Column(id) => {
                        let path = scope.resolve(id, &mut let_vars)?;
                        if path == format!("${name}") {
                            project.insert(name, 1);
                        } else {
                            project.insert(name, path);
                        }
                    }
                    Expression::Literal(lit) => {
                        project.insert(
                            name,
                            bson!({"$literal": super::expression::lower_literal(lit)}),
                        );
                    }
                    other => {
                        let lowered = self.lower_expr(other, &scope, &mut let_vars)?;
                        project.insert(name, lowered);
                    }
                }
            }
            // lookup helper fields fold into the projection as exclusions
            for name in cleanup.drain(..) {
                project.insert(name, 0);
            }
            pipeline.push(doc! {"$project": project});
        }

        // implicit ordering shim, immediately before $skip/$limit
        if stmt.limit.is_some()
            && stmt.order_by.is_empty()
            && self.options.implicit_order_on_limit
        {
            pipeline.push(doc! {"$sort": {"_id": 1}});
        }
        if let Some(offset) = stmt.offset {
            pipeline.push(doc! {"$skip": offset as i64});
        }
        if let Some(limit) = stmt.limit {
            pipeline.push(doc! {"$limit": limit as i64});
        }

        Ok(SelectPlan {
            collection,
            pipeline,
            let_vars,
            outputs,
            sorted_on_column,
        })
    }

    /// Replace scalar subqueries inside projection expressions with field
    /// references to their lifted lookups.
    fn lift_projection_subqueries(
        &mut self,
        projections: &[Projection],
        scope: &NameScope,
        pipeline: &mut Vec<Document>,
    ) -> Result<Vec<Projection>> {
        projections
            .iter()
            .map(|p| {
                Ok(Projection {
                    expr: self.lift_expr_subqueries(&p.expr, scope, pipeline)?,
                    alias: p.alias.clone(),
                })
            })
            .collect()
    }

    fn lift_expr_subqueries(
        &mut self,
        expr: &Expression,
        scope: &NameScope,
        pipeline: &mut Vec<Document>,
    ) -> Result<Expression> {
        if !expr.contains_subquery() {
            return Ok(expr.clone());
        }
        match expr {
            Expression::Subquery(sub) if sub.kind == SubqueryKind::Scalar => {
                let path = self.lower_scalar_subquery(&sub.query, scope, pipeline)?;
                Ok(Expression::Column(Identifier::simple(&path[1..])))
            }
            Expression::Subquery(_) => Err(Error::UnsupportedConstruct(
                "only scalar subqueries may appear in a projection".into(),
            )),
            Expression::Binary { left, op, right } => Ok(Expression::Binary {
                left: Box::new(self.lift_expr_subqueries(left, scope, pipeline)?),
                op: *op,
                right: Box::new(self.lift_expr_subqueries(right, scope, pipeline)?),
            }),
            Expression::Unary { op, expr } => Ok(Expression::Unary {
                op: *op,
                expr: Box::new(self.lift_expr_subqueries(expr, scope, pipeline)?),
            }),
            Expression::FunctionCall(f) => {
                let mut call = f.clone();
                call.args = f
                    .args
                    .iter()
                    .map(|a| self.lift_expr_subqueries(a, scope, pipeline))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expression::FunctionCall(call))
            }
            other => Err(Error::UnsupportedConstruct(format!(
                "subquery nested in {} projection",
                super::display_name(other)
            ))),
        }
    }

    /// Resolve ORDER BY keys into a `$sort` document. In group mode keys
    /// resolve against the group outputs; otherwise against the scope, with
    /// computed keys materialised into temporary fields.
    #[allow(clippy::too_many_arguments)]
    fn lower_order_by(
        &mut self,
        stmt: &SelectStatement,
        projections: &[Projection],
        group: Option<&GroupLowering>,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
        pipeline: &mut Vec<Document>,
        sort_temps: &mut Vec<String>,
        sorted_on_column: &mut bool,
    ) -> Result<Document> {
        let mut sort = Document::new();
        for spec in &stmt.order_by {
            let direction = if spec.asc { 1 } else { -1 };

            if let Some(group) = group {
                let (name, is_plain_key) = self.group_sort_key(&spec.key, stmt, group)?;
                if is_plain_key {
                    *sorted_on_column = true;
                }
                sort.insert(name, direction);
                continue;
            }

            let key_expr = match &spec.key {
                SortKey::Positional(n) => {
                    let index = *n as usize - 1;
                    let Some(p) = projections.get(index) else {
                        return Err(Error::UnresolvedIdentifier(format!(
                            "ORDER BY position {n}"
                        )));
                    };
                    p.expr.clone()
                }
                SortKey::Expr(e) => {
                    // projection aliases shadow column names in ORDER BY
                    let aliased = match e {
                        Expression::Column(id) if id.qualifier.is_none() => projections
                            .iter()
                            .find(|p| p.alias.as_deref() == Some(id.name.as_str()))
                            .map(|p| p.expr.clone()),
                        _ => None,
                    };
                    aliased.unwrap_or_else(|| e.clone())
                }
            };

            match &key_expr {
                Expression::Column(id) => {
                    let path = scope.resolve(id, let_vars)?;
                    if path.starts_with("$$") {
                        return Err(Error::UnsupportedConstruct(
                            "correlated ORDER BY key".into(),
                        ));
                    }
                    *sorted_on_column = true;
                    sort.insert(path[1..].to_string(), direction);
                }
                other => {
                    // computed keys sort on a materialised temporary
                    let temp = format!("__sort_{}", sort_temps.len() + 1);
                    let lowered = self.lower_expr(other, scope, let_vars)?;
                    pipeline.push(doc! {"$set": {temp.clone(): lowered}});
                    sort.insert(temp.clone(), direction);
                    sort_temps.push(temp);
                }
            }
        }
        Ok(sort)
    }

    /// An ORDER BY key after grouping: an output name, a projection alias,
    /// or an expression structurally equal to a projection.
    fn group_sort_key(
        &self,
        key: &SortKey,
        stmt: &SelectStatement,
        group: &GroupLowering,
    ) -> Result<(String, bool)> {
        let resolve_name = |name: &str| {
            group
                .outputs
                .iter()
                .find(|o| o.name == name)
                .map(|o| (o.name.clone(), !o.aggregate))
        };
        match key {
            SortKey::Positional(n) => {
                let index = *n as usize - 1;
                match group.outputs.get(index) {
                    Some(output) => Ok((output.name.clone(), !output.aggregate)),
                    None => Err(Error::UnresolvedIdentifier(format!(
                        "ORDER BY position {n}"
                    ))),
                }
            }
            SortKey::Expr(Expression::Column(id)) => resolve_name(&id.name).ok_or_else(|| {
                Error::UnresolvedIdentifier(format!("ORDER BY key {}", id.name))
            }),
            SortKey::Expr(expr) => {
                // match an unaliased aggregate expression to its projection
                for (p, output) in stmt.projections.iter().zip(&group.outputs) {
                    if p.expr == *expr {
                        return Ok((output.name.clone(), false));
                    }
                }
                Err(Error::UnsupportedConstruct(
                    "ORDER BY expression not present in the projection list".into(),
                ))
            }
        }
    }
}
