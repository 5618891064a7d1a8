//! Aggregate function recipes. An aggregate lowers into two halves: the
//! `$group` accumulator and an optional finalizer applied in the projection
//! that follows the group stage (rounding for the statistical family,
//! `$size` for COUNT DISTINCT, the join reduction for GROUP_CONCAT).

use super::{add, Error, FunctionEntry, FunctionKind, Result};
use bson::{bson, Bson};
use std::collections::HashMap;

pub(super) fn register(entries: &mut HashMap<&'static str, FunctionEntry>) {
    use FunctionKind::Aggregate;
    let defs: &[(&'static str, usize, Option<usize>)] = &[
        ("COUNT", 1, Some(1)),
        ("SUM", 1, Some(1)),
        ("AVG", 1, Some(1)),
        ("MIN", 1, Some(1)),
        ("MAX", 1, Some(1)),
        ("GROUP_CONCAT", 1, Some(1)),
        ("STDDEV_POP", 1, Some(1)),
        ("STDDEV", 1, Some(1)),
        ("STDDEV_SAMP", 1, Some(1)),
        ("VAR_POP", 1, Some(1)),
        ("VARIANCE", 1, Some(1)),
        ("VAR_SAMP", 1, Some(1)),
        // dual-use: one argument aggregates, two arguments is the scalar form
        ("BIT_AND", 1, Some(2)),
        ("BIT_OR", 1, Some(2)),
        ("BIT_XOR", 1, Some(2)),
    ];
    for (name, min, max) in defs {
        add(entries, name, Aggregate, *min, *max, scalar_bitwise);
    }
}

/// The two-argument scalar form of BIT_AND / BIT_OR / BIT_XOR.
fn scalar_bitwise(name: &str, args: &[Bson]) -> Result<Bson> {
    let op = match name {
        "BIT_AND" => "$bitAnd",
        "BIT_OR" => "$bitOr",
        "BIT_XOR" => "$bitXor",
        _ => {
            return Err(Error::UnsupportedArgument(
                name.to_string(),
                "not usable as a scalar expression".to_string(),
            ))
        }
    };
    let mut d = bson::Document::new();
    d.insert(op, Bson::Array(args.to_vec()));
    Ok(Bson::Document(d))
}

/// How the post-group projection rewrites a reference to the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Finalize {
    None,
    /// Statistical aggregates round to 6 decimal places to match the
    /// reference display precision.
    Round6,
    /// Variance is the square of the accumulated standard deviation.
    VarRound6,
    /// COUNT(DISTINCT x) accumulates a set and takes its size.
    CountDistinct,
    /// SUM/AVG over a DISTINCT set.
    SumOfSet,
    AvgOfSet,
    /// GROUP_CONCAT accumulates an array and joins it.
    GroupConcat { separator: String, sort: Option<i32> },
    BitReduce { op: &'static str, init: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorPlan {
    pub accumulator: Bson,
    pub finalize: Finalize,
}

/// Build the `$group` accumulator for an aggregate call whose argument has
/// already been lowered. `arg` is `None` for `COUNT(*)`.
pub fn accumulator(
    name: &str,
    arg: Option<Bson>,
    distinct: bool,
    separator: Option<&str>,
    sort: Option<i32>,
) -> Result<AccumulatorPlan> {
    let plan = match (name, arg) {
        ("COUNT", None) => AccumulatorPlan {
            accumulator: bson!({"$sum": 1}),
            finalize: Finalize::None,
        },
        ("COUNT", Some(a)) if distinct => AccumulatorPlan {
            accumulator: bson!({"$addToSet": a}),
            finalize: Finalize::CountDistinct,
        },
        ("COUNT", Some(a)) => AccumulatorPlan {
            // count only rows where the argument is present and non-null
            accumulator: bson!({"$sum": {"$cond": [{"$eq": [a, Bson::Null]}, 0, 1]}}),
            finalize: Finalize::None,
        },
        ("SUM", Some(a)) if distinct => AccumulatorPlan {
            accumulator: bson!({"$addToSet": a}),
            finalize: Finalize::SumOfSet,
        },
        ("SUM", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$sum": a}),
            finalize: Finalize::None,
        },
        ("AVG", Some(a)) if distinct => AccumulatorPlan {
            accumulator: bson!({"$addToSet": a}),
            finalize: Finalize::AvgOfSet,
        },
        ("AVG", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$avg": a}),
            finalize: Finalize::None,
        },
        ("MIN", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$min": a}),
            finalize: Finalize::None,
        },
        ("MAX", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$max": a}),
            finalize: Finalize::None,
        },
        ("GROUP_CONCAT", Some(a)) => AccumulatorPlan {
            accumulator: if distinct {
                bson!({"$addToSet": a})
            } else {
                bson!({"$push": a})
            },
            finalize: Finalize::GroupConcat {
                separator: separator.unwrap_or(",").to_string(),
                sort,
            },
        },
        ("STDDEV_POP" | "STDDEV", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$stdDevPop": a}),
            finalize: Finalize::Round6,
        },
        ("STDDEV_SAMP", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$stdDevSamp": a}),
            finalize: Finalize::Round6,
        },
        ("VAR_POP" | "VARIANCE", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$stdDevPop": a}),
            finalize: Finalize::VarRound6,
        },
        ("VAR_SAMP", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$stdDevSamp": a}),
            finalize: Finalize::VarRound6,
        },
        ("BIT_AND", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$push": a}),
            finalize: Finalize::BitReduce {
                op: "$bitAnd",
                init: -1,
            },
        },
        ("BIT_OR", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$push": a}),
            finalize: Finalize::BitReduce {
                op: "$bitOr",
                init: 0,
            },
        },
        ("BIT_XOR", Some(a)) => AccumulatorPlan {
            accumulator: bson!({"$push": a}),
            finalize: Finalize::BitReduce {
                op: "$bitXor",
                init: 0,
            },
        },
        (other, None) => {
            return Err(Error::UnsupportedArgument(
                other.to_string(),
                "`*` is only valid in COUNT(*)".to_string(),
            ))
        }
        (other, _) => return Err(Error::UnknownFunction(other.to_string())),
    };
    Ok(plan)
}

/// Rewrite a post-group reference to the accumulator field according to the
/// plan's finalizer. `path` is the `$`-prefixed accumulator field.
pub fn finalize(path: &str, finalize: &Finalize) -> Bson {
    match finalize {
        Finalize::None => Bson::String(path.to_string()),
        Finalize::Round6 => bson!({"$round": [path, 6]}),
        Finalize::VarRound6 => bson!({"$round": [{"$pow": [path, 2]}, 6]}),
        Finalize::CountDistinct => bson!({"$size": path}),
        Finalize::SumOfSet => bson!({"$sum": path}),
        Finalize::AvgOfSet => bson!({"$avg": path}),
        Finalize::GroupConcat { separator, sort } => {
            let input = match sort {
                Some(direction) => bson!({"$sortArray": {"input": path, "sortBy": *direction}}),
                None => Bson::String(path.to_string()),
            };
            bson!({"$reduce": {
                "input": input,
                "initialValue": "",
                "in": {"$cond": [
                    {"$eq": ["$$value", ""]},
                    {"$toString": "$$this"},
                    {"$concat": ["$$value", separator.as_str(), {"$toString": "$$this"}]}
                ]}
            }})
        }
        Finalize::BitReduce { op, init } => {
            let mut step = bson::Document::new();
            step.insert(*op, bson!(["$$value", "$$this"]));
            bson!({"$reduce": {
                "input": path,
                "initialValue": *init,
                "in": step
            }})
        }
    }
}
