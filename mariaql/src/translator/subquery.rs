//! Subquery lowering. Every subquery shape becomes exactly one `$lookup`
//! whose sub-pipeline is the faithful lowering of the inner SELECT;
//! correlated outer references surface through the `$lookup.let` document
//! as `$$var` bindings inside the sub-pipeline.

use super::{Error, MqlTranslator, NameScope, Result, SelectPlan};
use crate::ast::*;
use bson::{doc, Document};

impl<'a> MqlTranslator<'a> {
    /// Scalar subquery: single-value lookup, unwound so the value can be
    /// addressed as a path. Returns the `$`-path of the projected value.
    pub(crate) fn lower_scalar_subquery(
        &mut self,
        query: &SelectStatement,
        scope: &NameScope,
        stages: &mut Vec<Document>,
    ) -> Result<String> {
        validate_scalar_shape(self, query)?;
        let plan = self.lower_select_pipeline(query, scope)?;
        let column = single_output(&plan, "scalar subquery")?;
        let field = format!("__scalar_{}", self.next_index());

        let mut pipeline = plan.pipeline.clone();
        if query.limit.is_none() {
            pipeline.push(doc! {"$limit": 1});
        }
        stages.push(lookup_stage(&plan, pipeline, &field));
        stages.push(doc! {"$unwind": {
            "path": format!("${field}"),
            "preserveNullAndEmptyArrays": true
        }});
        Ok(format!("${field}.{column}"))
    }

    /// `[NOT] IN (SELECT col FROM ...)`: returns the lookup field and the
    /// projected column name.
    pub(crate) fn lower_in_subquery(
        &mut self,
        query: &SelectStatement,
        scope: &NameScope,
        stages: &mut Vec<Document>,
    ) -> Result<(String, String)> {
        let plan = self.lower_select_pipeline(query, scope)?;
        let column = single_output(&plan, "IN subquery")?;
        let field = format!("__in_{}", self.next_index());
        stages.push(lookup_stage(&plan, plan.pipeline.clone(), &field));
        Ok((field, column))
    }

    /// `[NOT] EXISTS (SELECT ...)`: a single-row probe lookup.
    pub(crate) fn lower_exists_subquery(
        &mut self,
        query: &SelectStatement,
        scope: &NameScope,
        stages: &mut Vec<Document>,
    ) -> Result<String> {
        let plan = self.lower_select_pipeline(query, scope)?;
        let field = format!("__exists_{}", self.next_index());
        let mut pipeline = plan.pipeline.clone();
        if query.limit.is_none() {
            pipeline.push(doc! {"$limit": 1});
        }
        stages.push(lookup_stage(&plan, pipeline, &field));
        Ok(field)
    }

    /// Row subquery: a single-row lookup compared column-wise. Returns the
    /// lookup field and the projected column names.
    pub(crate) fn lower_row_subquery(
        &mut self,
        query: &SelectStatement,
        scope: &NameScope,
        stages: &mut Vec<Document>,
    ) -> Result<(String, Vec<String>)> {
        let plan = self.lower_select_pipeline(query, scope)?;
        let field = format!("__row_{}", self.next_index());
        let mut pipeline = plan.pipeline.clone();
        if query.limit.is_none() {
            pipeline.push(doc! {"$limit": 1});
        }
        stages.push(lookup_stage(&plan, pipeline, &field));
        stages.push(doc! {"$unwind": {
            "path": format!("${field}"),
            "preserveNullAndEmptyArrays": true
        }});
        Ok((field, plan.outputs))
    }
}

/// Assemble the `$lookup` document in contract order: from, let, pipeline,
/// as. Table-less inner pipelines (`$documents` roots) omit `from`.
fn lookup_stage(plan: &SelectPlan, pipeline: Vec<Document>, field: &str) -> Document {
    let mut lookup = Document::new();
    if let Some(from) = &plan.collection {
        lookup.insert("from", from.clone());
    }
    if !plan.let_vars.is_empty() {
        let mut let_doc = Document::new();
        for var in &plan.let_vars {
            let_doc.insert(var.name.clone(), var.path.clone());
        }
        lookup.insert("let", let_doc);
    }
    lookup.insert("pipeline", pipeline);
    lookup.insert("as", field);
    doc! {"$lookup": lookup}
}

fn single_output(plan: &SelectPlan, what: &str) -> Result<String> {
    match plan.outputs.as_slice() {
        [column] => Ok(column.clone()),
        outputs => Err(Error::UnsupportedConstruct(format!(
            "{what} must project exactly one column, found {}",
            outputs.len()
        ))),
    }
}

/// By static inspection a scalar subquery must project one expression and
/// either carry `LIMIT 1` or be a pure aggregate query.
fn validate_scalar_shape(translator: &MqlTranslator, query: &SelectStatement) -> Result<()> {
    if query.projections.len() != 1 {
        return Err(Error::UnsupportedConstruct(
            "scalar subquery must project exactly one expression".into(),
        ));
    }
    if query.limit == Some(1) {
        return Ok(());
    }
    let aggregates_only = query.group_by.is_empty()
        && query.projections.iter().all(|p| {
            matches!(&p.expr, Expression::FunctionCall(f)
                if translator.catalog.is_aggregate(&f.name, f.args.len()) && f.over.is_none())
        });
    if aggregates_only {
        return Ok(());
    }
    Err(Error::UnsupportedConstruct(
        "scalar subquery must have LIMIT 1 or be an aggregate query".into(),
    ))
}
