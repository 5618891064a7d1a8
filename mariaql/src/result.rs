use crate::{parser, translator};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] parser::Error),
    #[error("translation error: {0}")]
    Translate(#[from] translator::Error),
    /// Batch translation stops at the first failing statement and reports
    /// its zero-based index.
    #[error("statement {index}: {source}")]
    Statement {
        index: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The error's tagged kind, for `ERROR <kind>: <message>` display.
    pub fn kind(&self) -> &'static str {
        use crate::catalog;
        match self {
            Error::Parse(parser::Error::UnexpectedEnd) => "UnexpectedEnd",
            Error::Parse(parser::Error::UnclosedConstruct(_)) => "UnclosedConstruct",
            Error::Parse(_) => "SyntaxError",
            Error::Translate(e) => match e {
                translator::Error::Catalog(c) => match c {
                    catalog::Error::UnknownFunction(_) => "UnknownFunction",
                    catalog::Error::ArityMismatch { .. } => "ArityMismatch",
                    catalog::Error::UnsupportedArgument(..) => "UnsupportedArgument",
                    catalog::Error::Unsupported(_) => "UnsupportedConstruct",
                    catalog::Error::UnsupportedFormatSpecifier(_) => "UnsupportedFormatSpecifier",
                },
                translator::Error::UnsupportedConstruct(_) => "UnsupportedConstruct",
                translator::Error::GroupByMismatch(_) => "GroupByMismatch",
                translator::Error::DistinctGroupByConflict => "DistinctGroupByConflict",
                translator::Error::UnresolvedIdentifier(_) => "UnresolvedIdentifier",
                translator::Error::AmbiguousIdentifier { .. } => "AmbiguousIdentifier",
                translator::Error::UnsupportedCte(_) => "UnsupportedCTE",
                translator::Error::CorrelationEscapes(_) => "CorrelationEscapes",
            },
            Error::Statement { source, .. } => source.kind(),
        }
    }
}
