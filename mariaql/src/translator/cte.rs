//! Common table expressions. Non-recursive CTEs compile once to their own
//! pipeline and inline wherever the body references them: as the base
//! pipeline when the CTE is the outer FROM, or inside a `$lookup` when it
//! is joined. A recursive CTE is expressible only when its body is a single
//! self-referential equality join, which lowers to `$graphLookup`.

use super::{Error, MqlTranslator, NameScope, Result};
use crate::{ast::*, invocation::Invocation};
use bson::{doc, Document};

#[derive(Debug, Clone)]
pub(crate) struct CtePlan {
    pub collection: Option<String>,
    pub pipeline: Vec<Document>,
    /// Recursive plans cannot be re-entered from a join.
    pub recursive: bool,
}

impl<'a> MqlTranslator<'a> {
    pub(crate) fn translate_with(&mut self, with: &WithStatement) -> Result<Invocation> {
        for cte in &with.ctes {
            let plan = if cte.recursive {
                self.lower_recursive_cte(cte)?
            } else {
                self.lower_plain_cte(cte)?
            };
            self.ctes.insert(cte.name.clone(), plan);
        }
        let result = match with.body.as_ref() {
            Statement::Select(select) => self.translate_select(select),
            Statement::With(nested) => self.translate_with(nested),
            _ => Err(Error::UnsupportedConstruct(
                "WITH body must be a SELECT".into(),
            )),
        };
        for cte in &with.ctes {
            self.ctes.remove(&cte.name);
        }
        result
    }

    fn lower_plain_cte(&mut self, cte: &CommonTableExpr) -> Result<CtePlan> {
        let plan = self.lower_select_pipeline(&cte.query, &NameScope::default())?;
        let mut pipeline = plan.pipeline;

        // an explicit column list renames the CTE outputs
        if let Some(columns) = &cte.columns {
            if columns.len() != plan.outputs.len() {
                return Err(Error::UnsupportedCte(format!(
                    "{} declares {} columns but its query projects {}",
                    cte.name,
                    columns.len(),
                    plan.outputs.len()
                )));
            }
            let mut rename = doc! {"_id": 0};
            for (target, source) in columns.iter().zip(&plan.outputs) {
                if target == source {
                    rename.insert(target.clone(), 1);
                } else {
                    rename.insert(target.clone(), format!("${source}"));
                }
            }
            pipeline.push(doc! {"$project": rename});
        }

        Ok(CtePlan {
            collection: plan.collection,
            pipeline,
            recursive: false,
        })
    }

    /// The only recursion this lowering expresses: a body whose single join
    /// target is the CTE itself, with an equality ON between a base column
    /// and a CTE column. It becomes a `$graphLookup` walking that edge.
    fn lower_recursive_cte(&mut self, cte: &CommonTableExpr) -> Result<CtePlan> {
        let query = &cte.query;
        let Some(TableRef::Collection { name: base, .. }) = &query.from else {
            return Err(Error::UnsupportedCte(format!(
                "recursive CTE {} must select from a collection",
                cte.name
            )));
        };
        let [join] = query.joins.as_slice() else {
            return Err(Error::UnsupportedCte(format!(
                "recursive CTE {} must have exactly one self-referential join",
                cte.name
            )));
        };
        let target_is_self = matches!(
            &join.target,
            TableRef::Collection { name, .. } if name == &cte.name
        );
        if !target_is_self {
            return Err(Error::UnsupportedCte(format!(
                "recursive CTE {} joins something other than itself",
                cte.name
            )));
        }
        let cte_binding = join.target.binding_name();

        // the ON condition must be one equality between base and CTE columns
        let Some(Expression::Binary {
            left,
            op: BinaryOp::Eq,
            right,
        }) = &join.on
        else {
            return Err(Error::UnsupportedCte(format!(
                "recursive CTE {} needs an equality join condition",
                cte.name
            )));
        };
        let (base_col, cte_col) = match (left.as_ref(), right.as_ref()) {
            (Expression::Column(l), Expression::Column(r)) => {
                let l_is_cte = l.qualifier.as_deref() == Some(cte_binding);
                let r_is_cte = r.qualifier.as_deref() == Some(cte_binding);
                match (l_is_cte, r_is_cte) {
                    (false, true) => (l.name.clone(), r.name.clone()),
                    (true, false) => (r.name.clone(), l.name.clone()),
                    _ => {
                        return Err(Error::UnsupportedCte(format!(
                            "recursive CTE {} join must relate the base to the CTE",
                            cte.name
                        )))
                    }
                }
            }
            _ => {
                return Err(Error::UnsupportedCte(format!(
                    "recursive CTE {} join condition must compare two columns",
                    cte.name
                )))
            }
        };

        Ok(CtePlan {
            collection: Some(base.clone()),
            pipeline: vec![doc! {"$graphLookup": {
                "from": base.clone(),
                "startWith": format!("${base_col}"),
                "connectFromField": base_col,
                "connectToField": cte_col,
                "as": cte.name.clone(),
            }}],
            recursive: true,
        })
    }
}
