//! String function recipes. Everything lowers to code-point operators
//! (`$substrCP`, `$strLenCP`, `$indexOfCP`) so multi-byte data behaves the
//! way the reference dialect does.

use super::{add, Error, FunctionEntry, FunctionKind, Result};
use bson::{bson, Bson};
use std::collections::HashMap;

pub(super) fn register(entries: &mut HashMap<&'static str, FunctionEntry>) {
    use FunctionKind::Scalar;
    let defs: &[(&'static str, usize, Option<usize>)] = &[
        ("CONCAT", 1, None),
        ("CONCAT_WS", 2, None),
        ("LENGTH", 1, Some(1)),
        ("CHAR_LENGTH", 1, Some(1)),
        ("CHARACTER_LENGTH", 1, Some(1)),
        ("UPPER", 1, Some(1)),
        ("UCASE", 1, Some(1)),
        ("LOWER", 1, Some(1)),
        ("LCASE", 1, Some(1)),
        ("LEFT", 2, Some(2)),
        ("RIGHT", 2, Some(2)),
        ("SUBSTRING", 2, Some(3)),
        ("SUBSTR", 2, Some(3)),
        ("MID", 3, Some(3)),
        ("TRIM", 1, Some(2)),
        ("LTRIM", 1, Some(2)),
        ("RTRIM", 1, Some(2)),
        ("REPLACE", 3, Some(3)),
        ("REVERSE", 1, Some(1)),
        ("LPAD", 3, Some(3)),
        ("RPAD", 3, Some(3)),
        ("INSTR", 2, Some(2)),
        ("LOCATE", 2, Some(3)),
        ("REPEAT", 2, Some(2)),
        ("SPACE", 1, Some(1)),
        ("FORMAT", 2, Some(2)),
        ("STRCMP", 2, Some(2)),
        ("ELT", 2, None),
        ("FIELD", 2, None),
        ("INSERT", 4, Some(4)),
        ("SUBSTRING_INDEX", 3, Some(3)),
        ("ASCII", 1, Some(1)),
        ("HEX", 1, Some(1)),
        ("UNHEX", 1, Some(1)),
        ("SOUNDEX", 1, Some(1)),
        ("QUOTE", 1, Some(1)),
        ("BIN", 1, Some(1)),
        ("OCT", 1, Some(1)),
        ("CONV", 3, Some(3)),
    ];
    for (name, min, max) in defs {
        add(entries, name, Scalar, *min, *max, lower);
    }
}

fn str_len(s: &Bson) -> Bson {
    bson!({"$strLenCP": s.clone()})
}

/// Zero-based start index for the 1-based SQL position argument, folding
/// when the argument is an integer literal.
fn start_index(pos: &Bson) -> Bson {
    match pos {
        Bson::Int32(v) => Bson::Int32(v - 1),
        Bson::Int64(v) => Bson::Int64(v - 1),
        other => bson!({"$subtract": [other.clone(), 1]}),
    }
}

fn repeat_expr(s: Bson, count: Bson) -> Bson {
    bson!({"$reduce": {
        "input": {"$range": [0, count]},
        "initialValue": "",
        "in": {"$concat": ["$$value", s]}
    }})
}

fn lower(name: &str, args: &[Bson]) -> Result<Bson> {
    let out = match name {
        "CONCAT" => bson!({"$concat": args.to_vec()}),
        "CONCAT_WS" => {
            let sep = args[0].clone();
            let mut parts = Vec::with_capacity(args.len() * 2 - 3);
            for (i, arg) in args[1..].iter().enumerate() {
                if i > 0 {
                    parts.push(sep.clone());
                }
                parts.push(arg.clone());
            }
            bson!({"$concat": parts})
        }
        "LENGTH" | "CHAR_LENGTH" | "CHARACTER_LENGTH" => str_len(&args[0]),
        "UPPER" | "UCASE" => bson!({"$toUpper": args[0].clone()}),
        "LOWER" | "LCASE" => bson!({"$toLower": args[0].clone()}),

        "LEFT" => bson!({"$substrCP": [args[0].clone(), 0, args[1].clone()]}),
        "RIGHT" => bson!({"$substrCP": [
            args[0].clone(),
            {"$cond": [
                {"$gte": [str_len(&args[0]), args[1].clone()]},
                {"$subtract": [str_len(&args[0]), args[1].clone()]},
                0
            ]},
            args[1].clone()
        ]}),
        "SUBSTRING" | "SUBSTR" | "MID" => {
            let len = match args.get(2) {
                Some(l) => l.clone(),
                None => str_len(&args[0]),
            };
            bson!({"$substrCP": [args[0].clone(), start_index(&args[1]), len]})
        }

        "TRIM" | "LTRIM" | "RTRIM" => {
            let op = match name {
                "TRIM" => "$trim",
                "LTRIM" => "$ltrim",
                _ => "$rtrim",
            };
            let mut spec = bson::Document::new();
            spec.insert("input", args[0].clone());
            if let Some(chars) = args.get(1) {
                spec.insert("chars", chars.clone());
            }
            let mut d = bson::Document::new();
            d.insert(op, spec);
            Bson::Document(d)
        }

        "REPLACE" => bson!({"$replaceAll": {
            "input": args[0].clone(),
            "find": args[1].clone(),
            "replacement": args[2].clone()
        }}),

        "REVERSE" => bson!({"$reduce": {
            "input": {"$range": [{"$subtract": [str_len(&args[0]), 1]}, -1, -1]},
            "initialValue": "",
            "in": {"$concat": ["$$value", {"$substrCP": [args[0].clone(), "$$this", 1]}]}
        }}),

        "LPAD" | "RPAD" => {
            let (s, len, pad) = (args[0].clone(), args[1].clone(), args[2].clone());
            let padding = bson!({"$substrCP": [
                repeat_expr(pad, len.clone()),
                0,
                {"$subtract": [len.clone(), str_len(&s)]}
            ]});
            let padded = if name == "LPAD" {
                bson!({"$concat": [padding, s.clone()]})
            } else {
                bson!({"$concat": [s.clone(), padding]})
            };
            bson!({"$cond": [
                {"$gte": [str_len(&s), len.clone()]},
                {"$substrCP": [s, 0, len]},
                padded
            ]})
        }

        "INSTR" => bson!({"$add": [{"$indexOfCP": [args[0].clone(), args[1].clone()]}, 1]}),
        "LOCATE" => {
            let index = match args.get(2) {
                None => bson!({"$indexOfCP": [args[1].clone(), args[0].clone()]}),
                Some(pos) => {
                    bson!({"$indexOfCP": [args[1].clone(), args[0].clone(), start_index(pos)]})
                }
            };
            bson!({"$add": [index, 1]})
        }

        "REPEAT" => repeat_expr(args[0].clone(), args[1].clone()),
        "SPACE" => repeat_expr(Bson::String(" ".to_string()), args[0].clone()),

        // thousands separators are not reproducible server-side; round and
        // stringify like the reference fallback
        "FORMAT" => bson!({"$toString": {"$round": [args[0].clone(), args[1].clone()]}}),

        "STRCMP" => bson!({"$cmp": [args[0].clone(), args[1].clone()]}),

        "ELT" => bson!({"$arrayElemAt": [
            Bson::Array(args[1..].to_vec()),
            start_index(&args[0])
        ]}),
        "FIELD" => bson!({"$add": [
            {"$indexOfArray": [Bson::Array(args[1..].to_vec()), args[0].clone()]},
            1
        ]}),

        "INSERT" => {
            let (s, pos, len, new) = (
                args[0].clone(),
                args[1].clone(),
                args[2].clone(),
                args[3].clone(),
            );
            bson!({"$concat": [
                {"$substrCP": [s.clone(), 0, start_index(&pos)]},
                new,
                {"$substrCP": [
                    s.clone(),
                    {"$add": [start_index(&pos), len]},
                    str_len(&s)
                ]}
            ]})
        }

        "SUBSTRING_INDEX" => {
            let (s, delim, count) = (args[0].clone(), args[1].clone(), args[2].clone());
            bson!({"$let": {
                "vars": {"parts": {"$slice": [{"$split": [s, delim.clone()]}, count]}},
                "in": {"$reduce": {
                    "input": "$$parts",
                    "initialValue": "",
                    "in": {"$cond": [
                        {"$eq": ["$$value", ""]},
                        "$$this",
                        {"$concat": ["$$value", delim, "$$this"]}
                    ]}
                }}
            }})
        }

        // no server-side operator exists for these
        "ASCII" | "HEX" | "UNHEX" | "SOUNDEX" | "QUOTE" | "BIN" | "OCT" | "CONV" => {
            return Err(Error::Unsupported(name.to_string()))
        }

        _ => return Err(Error::UnknownFunction(name.to_string())),
    };
    Ok(out)
}
