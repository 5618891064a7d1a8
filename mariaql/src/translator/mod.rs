//! The lowering engine: consumes a Statement IR and the function catalogue
//! and produces a MongoDB invocation. Lowering is deterministic and
//! all-or-nothing; no partial output is ever returned.

mod cte;
mod expression;
mod filter;
mod group;
mod join;
mod like;
mod select;
mod subquery;
mod window;
mod write;

#[cfg(test)]
mod test;

use crate::{
    ast::*,
    catalog::{self, FunctionCatalog},
    invocation::Invocation,
    options::TranslateOptions,
};
use bson::Document;
use itertools::Itertools;
use std::collections::HashMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] catalog::Error),
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
    #[error("GROUP BY mismatch: {0}")]
    GroupByMismatch(String),
    #[error("DISTINCT cannot be combined with GROUP BY or aggregates")]
    DistinctGroupByConflict,
    #[error("unresolved identifier {0}")]
    UnresolvedIdentifier(String),
    #[error("ambiguous identifier {name}: matches {candidates:?}")]
    AmbiguousIdentifier {
        name: String,
        candidates: Vec<String>,
    },
    #[error("unsupported CTE: {0}")]
    UnsupportedCte(String),
    #[error("correlated reference to {0} escapes more than one query level")]
    CorrelationEscapes(String),
}

/// Lower one parsed statement against the shared catalogue.
pub fn translate_statement(
    stmt: &Statement,
    database: &str,
    options: &TranslateOptions,
) -> Result<Invocation> {
    let mut translator = MqlTranslator::new(&catalog::CATALOG, options, database);
    translator.translate(stmt)
}

pub(crate) struct MqlTranslator<'a> {
    pub(crate) catalog: &'a FunctionCatalog,
    pub(crate) options: &'a TranslateOptions,
    pub(crate) database: String,
    /// Numbering for generated lookup fields (`__in_1`, `__scalar_2`, ...).
    counter: u32,
    /// CTE definitions visible to the statement currently being lowered.
    pub(crate) ctes: HashMap<String, cte::CtePlan>,
}

impl<'a> MqlTranslator<'a> {
    pub(crate) fn new(
        catalog: &'a FunctionCatalog,
        options: &'a TranslateOptions,
        database: &str,
    ) -> Self {
        Self {
            catalog,
            options,
            database: database.to_string(),
            counter: 0,
            ctes: HashMap::new(),
        }
    }

    pub(crate) fn translate(&mut self, stmt: &Statement) -> Result<Invocation> {
        match stmt {
            Statement::Select(select) => self.translate_select(select),
            Statement::Insert(insert) => self.translate_insert(insert),
            Statement::Update(update) => self.translate_update(update),
            Statement::Delete(delete) => self.translate_delete(delete),
            Statement::With(with) => self.translate_with(with),
        }
    }

    pub(crate) fn next_index(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }
}

/// One `$lookup.let` binding for a correlated outer reference.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LetVar {
    pub name: String,
    /// The `$`-path of the referenced column in the outer document.
    pub path: String,
}

/// The result of lowering one SELECT into a pipeline. `collection` is None
/// for table-less queries, which aggregate at the database level over a
/// synthetic `$documents` stage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectPlan {
    pub collection: Option<String>,
    pub pipeline: Vec<Document>,
    pub let_vars: Vec<LetVar>,
    /// Output field names, in projection order.
    pub outputs: Vec<String>,
    /// Whether a `$sort` over a plain column was emitted; drives the
    /// collation attachment.
    pub sorted_on_column: bool,
}

/// Name resolution environment for one query level. Bindings in `base`
/// resolve to root fields; bindings in `joined` resolve to the embedded
/// documents their `$lookup`/`$unwind` produced. The outer level feeds
/// correlated references; anything further out is rejected.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameScope {
    pub base: Vec<String>,
    pub joined: Vec<String>,
    pub outer_roots: Vec<String>,
    pub outer_joined: Vec<String>,
    pub far: Vec<String>,
}

impl NameScope {
    pub fn root(base: Vec<String>) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    /// The scope for a subquery one level below this one.
    pub fn child(&self, base: Vec<String>) -> Self {
        let mut far = self.far.clone();
        far.extend(self.outer_roots.iter().cloned());
        far.extend(self.outer_joined.iter().cloned());
        Self {
            base,
            joined: vec![],
            outer_roots: self.base.clone(),
            outer_joined: self.joined.clone(),
            far,
        }
    }

    /// Resolve a column reference to a `$`-path, or to a `$$var` reference
    /// recorded in `let_vars` when it reaches the enclosing query.
    pub fn resolve(&self, id: &Identifier, let_vars: &mut Vec<LetVar>) -> Result<String> {
        let Some(qualifier) = &id.qualifier else {
            // Without schema information an unqualified name is a root field
            // of the current level.
            return Ok(format!("${}", id.name));
        };

        let in_base = self.base.iter().any(|b| b == qualifier);
        let in_joined = self.joined.iter().any(|j| j == qualifier);
        if in_base && in_joined {
            return Err(Error::AmbiguousIdentifier {
                name: qualifier.clone(),
                candidates: vec![qualifier.clone(), qualifier.clone()],
            });
        }
        if in_base {
            return Ok(format!("${}", id.name));
        }
        if in_joined {
            return Ok(format!("${}.{}", qualifier, id.name));
        }

        let outer_path = if self.outer_roots.iter().any(|b| b == qualifier) {
            Some(format!("${}", id.name))
        } else if self.outer_joined.iter().any(|j| j == qualifier) {
            Some(format!("${}.{}", qualifier, id.name))
        } else {
            None
        };
        if let Some(path) = outer_path {
            let var = bind_let_var(&id.name, &path, let_vars);
            return Ok(format!("$${var}"));
        }

        if self.far.iter().any(|b| b == qualifier) {
            return Err(Error::CorrelationEscapes(format!(
                "{}.{}",
                qualifier, id.name
            )));
        }
        Err(Error::UnresolvedIdentifier(format!(
            "{}.{}",
            qualifier, id.name
        )))
    }
}

/// Derive a `$lookup.let` variable name from a column name: the lowercased
/// initials of its camelCase / snake_case words (`customerNumber` -> `cn`).
/// Collisions against an existing binding take a numeric suffix.
pub(crate) fn bind_let_var(column: &str, path: &str, let_vars: &mut Vec<LetVar>) -> String {
    let mut initials = String::new();
    let mut at_word_start = true;
    for c in column.chars() {
        if c == '_' {
            at_word_start = true;
            continue;
        }
        if at_word_start || c.is_ascii_uppercase() {
            initials.push(c.to_ascii_lowercase());
        }
        at_word_start = false;
    }
    if initials.is_empty() || !initials.starts_with(|c: char| c.is_ascii_lowercase()) {
        initials = format!("v{initials}");
    }

    let mut name = initials.clone();
    let mut suffix = 2;
    loop {
        match let_vars.iter().find(|v| v.name == name) {
            Some(existing) if existing.path == path => return name,
            Some(_) => {
                name = format!("{initials}{suffix}");
                suffix += 1;
            }
            None => break,
        }
    }
    let_vars.push(LetVar {
        name: name.clone(),
        path: path.to_string(),
    });
    name
}

/// The display name a projection gets when it has no alias, in the style
/// the reference server prints (`COUNT(*)`, `YEAR(orderDate)`). Dots are
/// flattened because MongoDB field names treat them as path separators.
pub(crate) fn display_name(expr: &Expression) -> String {
    fn render(expr: &Expression) -> String {
        match expr {
            Expression::Column(id) => match &id.qualifier {
                Some(q) => format!("{q}.{}", id.name),
                None => id.name.clone(),
            },
            Expression::Literal(lit) => match lit {
                Literal::Null => "NULL".to_string(),
                Literal::Boolean(b) => b.to_string().to_uppercase(),
                Literal::Integer(i) => i.to_string(),
                Literal::Float(f) => f.to_string(),
                Literal::String(s) | Literal::Date(s) => format!("'{s}'"),
                Literal::Interval { amount, unit } => {
                    format!("INTERVAL {amount} {}", unit.as_mongo_unit().to_uppercase())
                }
            },
            Expression::Star => "*".to_string(),
            Expression::QualifiedStar(t) => format!("{t}.*"),
            Expression::FunctionCall(f) => {
                let args = f.args.iter().map(render).join(", ");
                if f.distinct {
                    format!("{}(DISTINCT {args})", f.name)
                } else {
                    format!("{}({args})", f.name)
                }
            }
            Expression::Extract { unit, expr } => format!(
                "EXTRACT({} FROM {})",
                unit.as_mongo_unit().to_uppercase(),
                render(expr)
            ),
            Expression::Cast { expr, .. } => format!("CAST({})", render(expr)),
            Expression::Unary { expr, .. } => format!("-{}", render(expr)),
            Expression::Binary { left, right, .. } => {
                format!("{}_{}", render(left), render(right))
            }
            _ => "expr".to_string(),
        }
    }
    render(expr).replace('.', "_")
}

/// The output field name for a projection: its alias, its column name for
/// plain references, or the rendered display name.
pub(crate) fn projection_name(projection: &Projection) -> String {
    if let Some(alias) = &projection.alias {
        return alias.clone();
    }
    match &projection.expr {
        Expression::Column(id) => id.name.clone(),
        other => display_name(other),
    }
}
