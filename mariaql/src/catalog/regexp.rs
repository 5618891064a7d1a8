//! Regular-expression function recipes. Patterns are forwarded to the
//! server's `$regexMatch`/`$regexFind` operators; nothing is evaluated
//! client-side. Matching is case-insensitive to match the reference
//! collation.

use super::{add, Error, FunctionEntry, FunctionKind, Result};
use bson::{bson, Bson};
use std::collections::HashMap;

pub(super) fn register(entries: &mut HashMap<&'static str, FunctionEntry>) {
    use FunctionKind::Scalar;
    let defs: &[(&'static str, usize, Option<usize>)] = &[
        ("REGEXP", 2, Some(2)),
        ("RLIKE", 2, Some(2)),
        ("REGEXP_INSTR", 2, Some(2)),
        ("REGEXP_SUBSTR", 2, Some(2)),
        ("REGEXP_REPLACE", 3, Some(3)),
    ];
    for (name, min, max) in defs {
        add(entries, name, Scalar, *min, *max, lower);
    }
}

fn regex_find(input: &Bson, pattern: &Bson) -> Bson {
    bson!({"$regexFind": {"input": input.clone(), "regex": pattern.clone(), "options": "i"}})
}

fn lower(name: &str, args: &[Bson]) -> Result<Bson> {
    let out = match name {
        "REGEXP" | "RLIKE" => bson!({"$regexMatch": {
            "input": args[0].clone(),
            "regex": args[1].clone(),
            "options": "i"
        }}),
        "REGEXP_INSTR" => bson!({"$let": {
            "vars": {"m": regex_find(&args[0], &args[1])},
            "in": {"$cond": [
                {"$eq": ["$$m", Bson::Null]},
                0,
                {"$add": ["$$m.idx", 1]}
            ]}
        }}),
        "REGEXP_SUBSTR" => bson!({"$let": {
            "vars": {"m": regex_find(&args[0], &args[1])},
            "in": {"$cond": [{"$eq": ["$$m", Bson::Null]}, Bson::Null, "$$m.match"]}
        }}),
        // no server-side regex replacement exists; literal replacement is
        // what the reference implementation emits as well
        "REGEXP_REPLACE" => bson!({"$replaceAll": {
            "input": args[0].clone(),
            "find": args[1].clone(),
            "replacement": args[2].clone()
        }}),
        _ => return Err(Error::UnknownFunction(name.to_string())),
    };
    Ok(out)
}
