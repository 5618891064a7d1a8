//! JSON function recipes. Paths must be string literals of the `$.key` form;
//! one level of nesting per `$getField`/`$setField`, array subscripts via
//! `$arrayElemAt`. Dynamic paths cannot be lowered and are rejected.

use super::{add, Error, FunctionEntry, FunctionKind, Result};
use bson::{bson, Bson};
use std::collections::HashMap;

pub(super) fn register(entries: &mut HashMap<&'static str, FunctionEntry>) {
    use FunctionKind::Scalar;
    let defs: &[(&'static str, usize, Option<usize>)] = &[
        ("JSON_EXTRACT", 2, Some(2)),
        ("JSON_OBJECT", 0, None),
        ("JSON_ARRAY", 0, None),
        ("JSON_UNQUOTE", 1, Some(1)),
        ("JSON_KEYS", 1, Some(1)),
        ("JSON_LENGTH", 1, Some(1)),
        ("JSON_CONTAINS", 2, Some(2)),
        ("JSON_SET", 3, Some(3)),
        ("JSON_REPLACE", 3, Some(3)),
        ("JSON_REMOVE", 2, Some(2)),
    ];
    for (name, min, max) in defs {
        add(entries, name, Scalar, *min, *max, lower);
    }
}

#[derive(Debug)]
enum PathStep {
    Key(String),
    Index(i64),
}

/// Parse a constant `$.a.b[0]` JSON path into steps.
fn parse_path(name: &str, v: &Bson) -> Result<Vec<PathStep>> {
    let err = |detail: String| Error::UnsupportedArgument(name.to_string(), detail);
    let path = match v {
        Bson::String(s) if !s.starts_with("$.") => {
            return Err(err(format!("JSON path must start with `$.`, found `{s}`")))
        }
        Bson::String(s) => &s[2..],
        other => return Err(err(format!("JSON path must be a string literal, found {other}"))),
    };
    let mut steps = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return Err(err("empty JSON path segment".to_string()));
        }
        let mut rest = part;
        if let Some(bracket) = part.find('[') {
            let (key, idx) = part.split_at(bracket);
            if !key.is_empty() {
                steps.push(PathStep::Key(key.to_string()));
            }
            rest = idx;
            for seg in rest.split('[').skip(1) {
                let Some(num) = seg.strip_suffix(']') else {
                    return Err(err(format!("malformed subscript in `{part}`")));
                };
                let idx: i64 = num
                    .parse()
                    .map_err(|_| err(format!("non-numeric subscript in `{part}`")))?;
                steps.push(PathStep::Index(idx));
            }
            continue;
        }
        steps.push(PathStep::Key(rest.to_string()));
    }
    Ok(steps)
}

fn get_at_path(doc: Bson, steps: &[PathStep]) -> Bson {
    let mut current = doc;
    for step in steps {
        current = match step {
            PathStep::Key(k) => bson!({"$getField": {"field": k.as_str(), "input": current}}),
            PathStep::Index(i) => bson!({"$arrayElemAt": [current, *i]}),
        };
    }
    current
}

fn lower(name: &str, args: &[Bson]) -> Result<Bson> {
    let out = match name {
        "JSON_EXTRACT" => {
            let steps = parse_path(name, &args[1])?;
            get_at_path(args[0].clone(), &steps)
        }
        "JSON_OBJECT" => {
            if args.len() % 2 != 0 {
                return Err(Error::ArityMismatch {
                    name: name.to_string(),
                    expected: "an even number of".to_string(),
                    found: args.len(),
                });
            }
            let pairs: Vec<Bson> = args
                .chunks(2)
                .map(|kv| bson!({"k": kv[0].clone(), "v": kv[1].clone()}))
                .collect();
            bson!({"$arrayToObject": [pairs]})
        }
        "JSON_ARRAY" => Bson::Array(args.to_vec()),
        "JSON_UNQUOTE" => bson!({"$toString": args[0].clone()}),
        "JSON_KEYS" => bson!({"$map": {
            "input": {"$objectToArray": args[0].clone()},
            "as": "kv",
            "in": "$$kv.k"
        }}),
        "JSON_LENGTH" => bson!({"$cond": [
            {"$isArray": args[0].clone()},
            {"$size": args[0].clone()},
            {"$size": {"$objectToArray": args[0].clone()}}
        ]}),
        "JSON_CONTAINS" => bson!({"$cond": [
            {"$isArray": args[0].clone()},
            {"$in": [args[1].clone(), args[0].clone()]},
            {"$eq": [args[0].clone(), args[1].clone()]}
        ]}),
        "JSON_SET" | "JSON_REPLACE" => {
            let steps = parse_path(name, &args[1])?;
            match steps.as_slice() {
                [PathStep::Key(k)] => bson!({"$setField": {
                    "field": k.as_str(),
                    "input": args[0].clone(),
                    "value": args[2].clone()
                }}),
                _ => {
                    return Err(Error::UnsupportedArgument(
                        name.to_string(),
                        "only single-level paths can be lowered".to_string(),
                    ))
                }
            }
        }
        "JSON_REMOVE" => {
            let steps = parse_path(name, &args[1])?;
            match steps.as_slice() {
                [PathStep::Key(k)] => bson!({"$unsetField": {
                    "field": k.as_str(),
                    "input": args[0].clone()
                }}),
                _ => {
                    return Err(Error::UnsupportedArgument(
                        name.to_string(),
                        "only single-level paths can be lowered".to_string(),
                    ))
                }
            }
        }
        _ => return Err(Error::UnknownFunction(name.to_string())),
    };
    Ok(out)
}
