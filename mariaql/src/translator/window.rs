//! Window-function lowering into `$setWindowFields`, placed after
//! WHERE/JOIN and before GROUP BY. Calls sharing a partition/sort spec
//! share one stage; each call writes its output under the projection's
//! output name, which the projection stage then picks up.

use super::{projection_name, Error, LetVar, MqlTranslator, NameScope, Result};
use crate::ast::*;
use crate::catalog::window::{self, WindowOutput};
use bson::{bson, doc, Bson, Document};

/// How a windowed projection is reconstructed in the `$project` stage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WindowProjection {
    /// The stage wrote the value under the output name; project it as-is.
    Field,
    /// NTILE: combine the helper outputs with the bucket arithmetic.
    Expr(Bson),
}

pub(crate) struct WindowLowering {
    pub stages: Vec<Document>,
    /// projection index -> how to project it
    pub projections: Vec<(usize, WindowProjection)>,
    /// helper fields to drop when no explicit projection hides them
    pub cleanup: Vec<String>,
}

impl<'a> MqlTranslator<'a> {
    /// Collect all `OVER (...)` calls from the projection list and lower
    /// them into `$setWindowFields` stages.
    pub(crate) fn lower_windows(
        &mut self,
        stmt: &SelectStatement,
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<WindowLowering> {
        let mut lowering = WindowLowering {
            stages: vec![],
            projections: vec![],
            cleanup: vec![],
        };
        // one stage per distinct (partitionBy, sortBy) pair, in first-use order
        let mut specs: Vec<(Option<Bson>, Option<Document>, Document)> = vec![];

        for (index, projection) in stmt.projections.iter().enumerate() {
            let Expression::FunctionCall(f) = &projection.expr else {
                self.reject_nested_window(&projection.expr)?;
                continue;
            };
            let Some(over) = &f.over else {
                self.reject_nested_window(&projection.expr)?;
                continue;
            };

            self.catalog.check_arity(&f.name, f.args.len())?;
            let name = projection_name(projection);

            let partition_by = self.lower_partition_by(&over.partition_by, scope, let_vars)?;
            let sort_by = self.lower_window_sort(&over.order_by, scope, let_vars)?;

            let args = f
                .args
                .iter()
                .map(|a| self.lower_expr(a, scope, let_vars))
                .collect::<Result<Vec<_>>>()?;

            let mut outputs = Document::new();
            let window_projection = match window::output(&f.name, &args)? {
                WindowOutput::Single(operator) => {
                    outputs.insert(name.clone(), operator);
                    WindowProjection::Field
                }
                WindowOutput::Ntile { buckets } => {
                    let rn = format!("{name}__rn");
                    let ct = format!("{name}__ct");
                    outputs.insert(rn.clone(), bson!({"$documentNumber": {}}));
                    outputs.insert(
                        ct.clone(),
                        bson!({"$count": {}, "window": {"documents": ["unbounded", "unbounded"]}}),
                    );
                    lowering.cleanup.push(rn.clone());
                    lowering.cleanup.push(ct.clone());
                    // floor((rn - 1) * n / count) + 1 assigns the remainder
                    // to the leading buckets, like the SQL NTILE
                    WindowProjection::Expr(bson!({"$add": [
                        {"$floor": {"$divide": [
                            {"$multiply": [{"$subtract": [format!("${rn}"), 1]}, buckets]},
                            format!("${ct}")
                        ]}},
                        1
                    ]}))
                }
            };
            lowering.projections.push((index, window_projection));

            match specs
                .iter()
                .position(|(p, s, _)| *p == partition_by && *s == sort_by)
            {
                Some(i) => specs[i].2.extend(outputs),
                None => specs.push((partition_by, sort_by, outputs)),
            }
        }

        for (partition_by, sort_by, outputs) in specs {
            let mut stage = Document::new();
            if let Some(p) = partition_by {
                stage.insert("partitionBy", p);
            }
            if let Some(s) = sort_by {
                stage.insert("sortBy", s);
            }
            stage.insert("output", outputs);
            lowering.stages.push(doc! {"$setWindowFields": stage});
        }
        Ok(lowering)
    }

    fn lower_partition_by(
        &mut self,
        partition_by: &[Expression],
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<Option<Bson>> {
        match partition_by {
            [] => Ok(None),
            [single] => Ok(Some(self.lower_expr(single, scope, let_vars)?)),
            several => {
                // composite partition key as a document expression
                let mut key = Document::new();
                for (i, expr) in several.iter().enumerate() {
                    let name = match expr {
                        Expression::Column(id) => id.name.clone(),
                        _ => format!("p{i}"),
                    };
                    key.insert(name, self.lower_expr(expr, scope, let_vars)?);
                }
                Ok(Some(Bson::Document(key)))
            }
        }
    }

    /// `sortBy` takes field paths only.
    fn lower_window_sort(
        &mut self,
        order_by: &[SortSpec],
        scope: &NameScope,
        let_vars: &mut Vec<LetVar>,
    ) -> Result<Option<Document>> {
        if order_by.is_empty() {
            return Ok(None);
        }
        let mut sort = Document::new();
        for spec in order_by {
            let SortKey::Expr(Expression::Column(id)) = &spec.key else {
                return Err(Error::UnsupportedConstruct(
                    "OVER (ORDER BY ...) keys must be column references".into(),
                ));
            };
            let path = scope.resolve(id, let_vars)?;
            if path.starts_with("$$") {
                return Err(Error::UnsupportedConstruct(
                    "correlated OVER (ORDER BY ...) key".into(),
                ));
            }
            sort.insert(
                path[1..].to_string(),
                Bson::Int32(if spec.asc { 1 } else { -1 }),
            );
        }
        Ok(Some(sort))
    }

    /// Window calls anywhere but as a whole projection are not lowered.
    fn reject_nested_window(&self, expr: &Expression) -> Result<()> {
        let nested = expr.any(&mut |e| {
            matches!(e, Expression::FunctionCall(f) if f.over.is_some())
        });
        if nested {
            return Err(Error::UnsupportedConstruct(
                "window function nested inside an expression".into(),
            ));
        }
        Ok(())
    }
}
