//! The function catalogue: a registry mapping SQL function names
//! (case-insensitive, stored uppercased) to lowering recipes that produce
//! MongoDB expression documents. The catalogue is built once, is immutable,
//! and is passed by reference into the lowering engine.
//!
//! Recipes are pure: given already-lowered argument expressions they return
//! a `$operator` document and nothing else. Aggregate accumulators and
//! window outputs have their own entry points because they lower into
//! `$group` / `$setWindowFields` stages rather than plain expressions.

pub mod aggregate;
mod date_format;
mod datetime;
mod json;
mod math;
mod regexp;
mod string;
pub mod window;

#[cfg(test)]
mod test;

pub use date_format::convert_date_format;
pub(crate) use datetime::date_arg;

use bson::Bson;
use lazy_static::lazy_static;
use std::collections::HashMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("unknown function {0}")]
    UnknownFunction(String),
    #[error("{name} expects {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
    },
    #[error("unsupported argument to {0}: {1}")]
    UnsupportedArgument(String, String),
    #[error("{0} has no MongoDB-native equivalent")]
    Unsupported(String),
    #[error("DATE_FORMAT specifier %{0} has no MongoDB equivalent")]
    UnsupportedFormatSpecifier(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Scalar,
    Aggregate,
    Window,
    /// Recognised by the lowering engine directly (IF, COALESCE, NULLIF);
    /// the catalogue only validates name and arity.
    Structural,
}

type LowerFn = fn(&str, &[Bson]) -> Result<Bson>;

#[derive(Debug)]
pub struct FunctionEntry {
    pub kind: FunctionKind,
    pub min_args: usize,
    pub max_args: Option<usize>,
    lower: LowerFn,
}

pub struct FunctionCatalog {
    entries: HashMap<&'static str, FunctionEntry>,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        datetime::register(&mut entries);
        string::register(&mut entries);
        math::register(&mut entries);
        aggregate::register(&mut entries);
        json::register(&mut entries);
        regexp::register(&mut entries);
        window::register(&mut entries);
        register_structural(&mut entries);
        register_unsupported(&mut entries);
        Self { entries }
    }

    pub fn entry(&self, name: &str) -> Result<&FunctionEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))
    }

    pub fn kind(&self, name: &str) -> Option<FunctionKind> {
        self.entries.get(name).map(|e| e.kind)
    }

    /// True for names that accumulate across rows. The bitwise functions are
    /// dual-use: with two arguments they are scalar operators.
    pub fn is_aggregate(&self, name: &str, arg_count: usize) -> bool {
        match self.kind(name) {
            Some(FunctionKind::Aggregate) => {
                !matches!(name, "BIT_AND" | "BIT_OR" | "BIT_XOR") || arg_count == 1
            }
            _ => false,
        }
    }

    pub fn check_arity(&self, name: &str, found: usize) -> Result<()> {
        let entry = self.entry(name)?;
        let ok = found >= entry.min_args && entry.max_args.is_none_or(|max| found <= max);
        if ok {
            return Ok(());
        }
        let expected = match (entry.min_args, entry.max_args) {
            (min, Some(max)) if min == max => format!("{min}"),
            (min, Some(max)) => format!("{min} to {max}"),
            (min, None) => format!("at least {min}"),
        };
        Err(Error::ArityMismatch {
            name: name.to_string(),
            expected,
            found,
        })
    }

    /// Lower a scalar call. Arity has to be checked first; structural and
    /// aggregate names are rejected here because the engine handles them.
    pub fn lower_scalar(&self, name: &str, args: &[Bson]) -> Result<Bson> {
        self.check_arity(name, args.len())?;
        let entry = self.entry(name)?;
        match entry.kind {
            FunctionKind::Scalar => (entry.lower)(name, args),
            // scalar use of the dual bitwise names
            FunctionKind::Aggregate if args.len() == 2 => (entry.lower)(name, args),
            _ => Err(Error::UnsupportedArgument(
                name.to_string(),
                "not usable as a scalar expression".to_string(),
            )),
        }
    }
}

impl Default for FunctionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// Shared immutable catalogue instance.
    pub static ref CATALOG: FunctionCatalog = FunctionCatalog::new();
}

pub(crate) fn add(
    entries: &mut HashMap<&'static str, FunctionEntry>,
    name: &'static str,
    kind: FunctionKind,
    min_args: usize,
    max_args: Option<usize>,
    lower: LowerFn,
) {
    entries.insert(
        name,
        FunctionEntry {
            kind,
            min_args,
            max_args,
            lower,
        },
    );
}

fn lower_never(name: &str, _args: &[Bson]) -> Result<Bson> {
    Err(Error::UnsupportedArgument(
        name.to_string(),
        "handled structurally by the lowering engine".to_string(),
    ))
}

fn lower_unsupported(name: &str, _args: &[Bson]) -> Result<Bson> {
    Err(Error::Unsupported(name.to_string()))
}

/// IF / COALESCE / NULLIF parse as ordinary calls but lower structurally.
fn register_structural(entries: &mut HashMap<&'static str, FunctionEntry>) {
    add(entries, "IF", FunctionKind::Structural, 3, Some(3), lower_never);
    add(entries, "COALESCE", FunctionKind::Structural, 1, None, lower_never);
    add(entries, "NULLIF", FunctionKind::Structural, 2, Some(2), lower_never);
}

/// The client-side encryption and hashing family of the reference dialect.
/// MongoDB has no native operators for these and the translator performs no
/// cryptography, so they are recognised and rejected.
fn register_unsupported(entries: &mut HashMap<&'static str, FunctionEntry>) {
    for name in [
        "MD5",
        "SHA1",
        "SHA2",
        "AES_ENCRYPT",
        "AES_DECRYPT",
        "ENCRYPT",
        "PASSWORD",
    ] {
        add(entries, name, FunctionKind::Scalar, 1, Some(3), lower_unsupported);
    }
}
