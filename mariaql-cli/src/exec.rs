//! Dispatches a lowered invocation on the synchronous driver. Every field
//! of the invocation is forwarded verbatim; nothing is reordered or
//! recomputed here.

use crate::CliError;
use bson::Document;
use mongodb::{
    options::{Collation, UpdateModifications},
    sync::Database,
};

pub enum Outcome {
    Rows(Vec<Document>),
    /// Affected-row style result: a verb for display and a count.
    Affected(&'static str, u64),
}

fn collation_options(doc: &Document) -> Result<Collation, CliError> {
    bson::from_document(doc.clone()).map_err(|e| CliError::Database(e.to_string()))
}

pub fn run(db: &Database, invocation: &mariaql::Invocation) -> Result<Outcome, CliError> {
    use mariaql::Invocation::*;
    match invocation {
        Find(find) => {
            let collection = db.collection::<Document>(&find.collection);
            let mut op = collection.find(find.filter.clone().unwrap_or_default());
            if let Some(projection) = &find.projection {
                op = op.projection(projection.clone());
            }
            if let Some(sort) = &find.sort {
                op = op.sort(sort.clone());
            }
            if let Some(skip) = find.skip {
                op = op.skip(skip as u64);
            }
            if let Some(limit) = find.limit {
                op = op.limit(limit);
            }
            if let Some(collation) = &find.collation {
                op = op.collation(collation_options(collation)?);
            }
            let rows = op.run()?.collect::<Result<Vec<_>, _>>()?;
            Ok(Outcome::Rows(rows))
        }

        Aggregate(agg) => {
            let rows = match &agg.collection {
                Some(name) => {
                    let collection = db.collection::<Document>(name);
                    let mut op = collection.aggregate(agg.pipeline.clone());
                    if let Some(collation) = &agg.collation {
                        op = op.collation(collation_options(collation)?);
                    }
                    op.run()?.collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut op = db.aggregate(agg.pipeline.clone());
                    if let Some(collation) = &agg.collation {
                        op = op.collation(collation_options(collation)?);
                    }
                    op.run()?.collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(Outcome::Rows(rows))
        }

        InsertOne(insert) => {
            db.collection::<Document>(&insert.collection)
                .insert_one(insert.document.clone())
                .run()?;
            Ok(Outcome::Affected("inserted", 1))
        }

        InsertMany(insert) => {
            let result = db
                .collection::<Document>(&insert.collection)
                .insert_many(insert.documents.clone())
                .run()?;
            Ok(Outcome::Affected("inserted", result.inserted_ids.len() as u64))
        }

        UpdateMany(update) => {
            let modifications = match &update.update {
                mariaql::UpdateSpec::Document(doc) => {
                    UpdateModifications::Document(doc.clone())
                }
                mariaql::UpdateSpec::Pipeline(stages) => {
                    UpdateModifications::Pipeline(stages.clone())
                }
            };
            let result = db
                .collection::<Document>(&update.collection)
                .update_many(update.filter.clone(), modifications)
                .run()?;
            Ok(Outcome::Affected("matched", result.matched_count))
        }

        DeleteMany(delete) => {
            let result = db
                .collection::<Document>(&delete.collection)
                .delete_many(delete.filter.clone())
                .run()?;
            Ok(Outcome::Affected("deleted", result.deleted_count))
        }
    }
}
