//! mariaql translates MariaDB-dialect SQL statements into MongoDB driver
//! invocations: a `find` with projection/sort/limit, an `aggregate`
//! pipeline, or a write operation. Translation is purely syntactic and
//! semantic — no row data is ever evaluated on the client — and is a pure
//! function of the statement text, the target database name, and the
//! options.

mod ast;
pub mod catalog;
mod invocation;
mod lexer;
pub mod options;
mod parser;
pub mod result;
mod translator;

pub use invocation::{
    AggregateInvocation, DeleteManyInvocation, FindInvocation, InsertManyInvocation,
    InsertOneInvocation, Invocation, UpdateManyInvocation, UpdateSpec,
};
pub use lexer::ReservedWordDialect;
pub use options::TranslateOptions;

use result::{Error, Result};

/// Translate a single SQL statement for the given database.
pub fn translate(sql: &str, database: &str, options: &TranslateOptions) -> Result<Invocation> {
    let statement = parser::parse_statement(sql, options.reserved_words)?;
    let invocation = translator::translate_statement(&statement, database, options)?;
    Ok(invocation)
}

/// Translate a semicolon-delimited batch. The batch aborts on the first
/// error, which carries the index of the offending statement.
pub fn translate_many(
    sql: &str,
    database: &str,
    options: &TranslateOptions,
) -> Result<Vec<Invocation>> {
    let statements = parser::parse_statements(sql, options.reserved_words).map_err(
        |(index, source)| Error::Statement {
            index,
            source: Box::new(source.into()),
        },
    )?;
    statements
        .iter()
        .enumerate()
        .map(|(index, statement)| {
            translator::translate_statement(statement, database, options).map_err(|source| {
                Error::Statement {
                    index,
                    source: Box::new(source.into()),
                }
            })
        })
        .collect()
}
