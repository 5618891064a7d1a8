//! INSERT / UPDATE / DELETE lowering. Row values must be literals (nothing
//! is evaluated client-side and writes carry no pipeline to compute in);
//! UPDATE assignments that reference columns or call functions lower to an
//! aggregation-pipeline update instead of a plain `$set` document.

use super::{expression::lower_literal, Error, MqlTranslator, NameScope, Result};
use crate::{
    ast::*,
    invocation::{
        DeleteManyInvocation, InsertManyInvocation, InsertOneInvocation, Invocation,
        UpdateManyInvocation, UpdateSpec,
    },
};
use bson::{doc, Document};

impl<'a> MqlTranslator<'a> {
    pub(crate) fn translate_insert(&mut self, stmt: &InsertStatement) -> Result<Invocation> {
        let mut documents = Vec::with_capacity(stmt.rows.len());
        for (row_index, row) in stmt.rows.iter().enumerate() {
            if row.len() != stmt.columns.len() {
                return Err(Error::UnsupportedConstruct(format!(
                    "row {} has {} values for {} columns",
                    row_index + 1,
                    row.len(),
                    stmt.columns.len()
                )));
            }
            let mut document = Document::new();
            for (column, expr) in stmt.columns.iter().zip(row) {
                let Expression::Literal(lit) = expr else {
                    return Err(Error::UnsupportedConstruct(
                        "INSERT values must be literals".into(),
                    ));
                };
                document.insert(column.clone(), lower_literal(lit));
            }
            documents.push(document);
        }

        Ok(if documents.len() == 1 {
            Invocation::InsertOne(InsertOneInvocation {
                database: self.database.clone(),
                collection: stmt.table.clone(),
                document: documents.into_iter().next().unwrap_or_default(),
            })
        } else {
            Invocation::InsertMany(InsertManyInvocation {
                database: self.database.clone(),
                collection: stmt.table.clone(),
                documents,
            })
        })
    }

    pub(crate) fn translate_update(&mut self, stmt: &UpdateStatement) -> Result<Invocation> {
        let scope = NameScope::root(vec![stmt.table.clone()]);

        let filter = match &stmt.where_clause {
            Some(where_clause) => self.lower_stageless_filter(where_clause, &scope)?,
            None => doc! {},
        };

        // plain literal assignments stay a classic update document; anything
        // computed becomes a pipeline update so the server evaluates it
        let all_literals = stmt
            .assignments
            .iter()
            .all(|a| matches!(a.expr, Expression::Literal(_)));

        let update = if all_literals {
            let mut set = Document::new();
            for assignment in &stmt.assignments {
                let Expression::Literal(lit) = &assignment.expr else {
                    unreachable!()
                };
                set.insert(assignment.column.clone(), lower_literal(lit));
            }
            UpdateSpec::Document(doc! {"$set": set})
        } else {
            let mut let_vars = Vec::new();
            let mut set = Document::new();
            for assignment in &stmt.assignments {
                if assignment.expr.contains_subquery() {
                    return Err(Error::UnsupportedConstruct(
                        "subquery in an UPDATE assignment".into(),
                    ));
                }
                let lowered = self.lower_expr(&assignment.expr, &scope, &mut let_vars)?;
                set.insert(assignment.column.clone(), lowered);
            }
            UpdateSpec::Pipeline(vec![doc! {"$set": set}])
        };

        Ok(Invocation::UpdateMany(UpdateManyInvocation {
            database: self.database.clone(),
            collection: stmt.table.clone(),
            filter,
            update,
        }))
    }

    pub(crate) fn translate_delete(&mut self, stmt: &DeleteStatement) -> Result<Invocation> {
        let scope = NameScope::root(vec![stmt.table.clone()]);
        let filter = match &stmt.where_clause {
            Some(where_clause) => self.lower_stageless_filter(where_clause, &scope)?,
            None => doc! {},
        };
        Ok(Invocation::DeleteMany(DeleteManyInvocation {
            database: self.database.clone(),
            collection: stmt.table.clone(),
            filter,
        }))
    }
}
