//! The fully-lowered output of a translation: one MongoDB driver call. The
//! enclosing driver forwards `filter`, `projection`, `sort`, `pipeline`,
//! `update`, and `collation` verbatim; stage order inside `pipeline` is
//! part of the contract.

use bson::Document;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Invocation {
    Find(FindInvocation),
    Aggregate(AggregateInvocation),
    InsertOne(InsertOneInvocation),
    InsertMany(InsertManyInvocation),
    UpdateMany(UpdateManyInvocation),
    DeleteMany(DeleteManyInvocation),
}

impl Invocation {
    pub fn database(&self) -> &str {
        match self {
            Invocation::Find(i) => &i.database,
            Invocation::Aggregate(i) => &i.database,
            Invocation::InsertOne(i) => &i.database,
            Invocation::InsertMany(i) => &i.database,
            Invocation::UpdateMany(i) => &i.database,
            Invocation::DeleteMany(i) => &i.database,
        }
    }

    /// The target collection; aggregates over a synthetic document source
    /// run at the database level and have none.
    pub fn collection(&self) -> Option<&str> {
        match self {
            Invocation::Find(i) => Some(&i.collection),
            Invocation::Aggregate(i) => i.collection.as_deref(),
            Invocation::InsertOne(i) => Some(&i.collection),
            Invocation::InsertMany(i) => Some(&i.collection),
            Invocation::UpdateMany(i) => Some(&i.collection),
            Invocation::DeleteMany(i) => Some(&i.collection),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindInvocation {
    pub database: String,
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateInvocation {
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub pipeline: Vec<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertOneInvocation {
    pub database: String,
    pub collection: String,
    pub document: Document,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertManyInvocation {
    pub database: String,
    pub collection: String,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateManyInvocation {
    pub database: String,
    pub collection: String,
    pub filter: Document,
    pub update: UpdateSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteManyInvocation {
    pub database: String,
    pub collection: String,
    pub filter: Document,
}

/// A classic `{$set: ...}` update document, or an aggregation-pipeline
/// update when assignments reference other columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UpdateSpec {
    Document(Document),
    Pipeline(Vec<Document>),
}
