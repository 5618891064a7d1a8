//! Math function recipes. Mostly one-to-one operator mappings; the few
//! without a native operator (COT, SIGN, LOG2) compose from primitives.

use super::{add, Error, FunctionEntry, FunctionKind, Result};
use bson::{bson, Bson};
use std::collections::HashMap;

pub(super) fn register(entries: &mut HashMap<&'static str, FunctionEntry>) {
    use FunctionKind::Scalar;
    let defs: &[(&'static str, usize, Option<usize>)] = &[
        ("ABS", 1, Some(1)),
        ("CEIL", 1, Some(1)),
        ("CEILING", 1, Some(1)),
        ("FLOOR", 1, Some(1)),
        ("ROUND", 1, Some(2)),
        ("TRUNCATE", 2, Some(2)),
        ("MOD", 2, Some(2)),
        ("POW", 2, Some(2)),
        ("POWER", 2, Some(2)),
        ("SQRT", 1, Some(1)),
        ("EXP", 1, Some(1)),
        ("LN", 1, Some(1)),
        ("LOG", 1, Some(2)),
        ("LOG2", 1, Some(1)),
        ("LOG10", 1, Some(1)),
        ("SIN", 1, Some(1)),
        ("COS", 1, Some(1)),
        ("TAN", 1, Some(1)),
        ("ASIN", 1, Some(1)),
        ("ACOS", 1, Some(1)),
        ("ATAN", 1, Some(2)),
        ("ATAN2", 2, Some(2)),
        ("COT", 1, Some(1)),
        ("DEGREES", 1, Some(1)),
        ("RADIANS", 1, Some(1)),
        ("SIGN", 1, Some(1)),
        ("GREATEST", 2, None),
        ("LEAST", 2, None),
        ("RAND", 0, Some(0)),
        ("PI", 0, Some(0)),
    ];
    for (name, min, max) in defs {
        add(entries, name, Scalar, *min, *max, lower);
    }
}

fn unary(op: &str, arg: &Bson) -> Bson {
    let mut d = bson::Document::new();
    d.insert(op, arg.clone());
    Bson::Document(d)
}

fn lower(name: &str, args: &[Bson]) -> Result<Bson> {
    let out = match name {
        "ABS" => unary("$abs", &args[0]),
        "CEIL" | "CEILING" => unary("$ceil", &args[0]),
        "FLOOR" => unary("$floor", &args[0]),
        "ROUND" => match args.get(1) {
            None => bson!({"$round": [args[0].clone(), 0]}),
            Some(p) => bson!({"$round": [args[0].clone(), p.clone()]}),
        },
        "TRUNCATE" => bson!({"$trunc": [args[0].clone(), args[1].clone()]}),
        "MOD" => bson!({"$mod": [args[0].clone(), args[1].clone()]}),
        "POW" | "POWER" => bson!({"$pow": [args[0].clone(), args[1].clone()]}),
        "SQRT" => unary("$sqrt", &args[0]),
        "EXP" => unary("$exp", &args[0]),
        "LN" => unary("$ln", &args[0]),
        // LOG(x) is the natural log; LOG(b, x) takes an explicit base
        "LOG" => match args.get(1) {
            None => unary("$ln", &args[0]),
            Some(x) => bson!({"$log": [x.clone(), args[0].clone()]}),
        },
        "LOG2" => bson!({"$log": [args[0].clone(), 2]}),
        "LOG10" => unary("$log10", &args[0]),
        "SIN" => unary("$sin", &args[0]),
        "COS" => unary("$cos", &args[0]),
        "TAN" => unary("$tan", &args[0]),
        "ASIN" => unary("$asin", &args[0]),
        "ACOS" => unary("$acos", &args[0]),
        "ATAN" => match args.get(1) {
            None => unary("$atan", &args[0]),
            Some(x) => bson!({"$atan2": [args[0].clone(), x.clone()]}),
        },
        "ATAN2" => bson!({"$atan2": [args[0].clone(), args[1].clone()]}),
        "COT" => bson!({"$divide": [1, {"$tan": args[0].clone()}]}),
        "DEGREES" => unary("$radiansToDegrees", &args[0]),
        "RADIANS" => unary("$degreesToRadians", &args[0]),
        "SIGN" => bson!({"$cond": [
            {"$gt": [args[0].clone(), 0]},
            1,
            {"$cond": [{"$lt": [args[0].clone(), 0]}, -1, 0]}
        ]}),
        "GREATEST" => bson!({"$max": args.to_vec()}),
        "LEAST" => bson!({"$min": args.to_vec()}),
        "RAND" => bson!({"$rand": {}}),
        "PI" => bson!({"$literal": std::f64::consts::PI}),
        _ => return Err(Error::UnknownFunction(name.to_string())),
    };
    Ok(out)
}
