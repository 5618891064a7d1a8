//! Window function recipes for `$setWindowFields` outputs. The ranking
//! family maps directly; LAG/LEAD become `$shift`; NTILE has no native
//! operator and is computed from the row number and the partition count.

use super::{add, Error, FunctionEntry, FunctionKind, Result};
use bson::{bson, Bson};
use std::collections::HashMap;

pub(super) fn register(entries: &mut HashMap<&'static str, FunctionEntry>) {
    use FunctionKind::Window;
    let defs: &[(&'static str, usize, Option<usize>)] = &[
        ("ROW_NUMBER", 0, Some(0)),
        ("RANK", 0, Some(0)),
        ("DENSE_RANK", 0, Some(0)),
        ("NTILE", 1, Some(1)),
        ("LAG", 1, Some(3)),
        ("LEAD", 1, Some(3)),
    ];
    for (name, min, max) in defs {
        add(entries, name, Window, *min, *max, reject_scalar);
    }
}

fn reject_scalar(name: &str, _args: &[Bson]) -> Result<Bson> {
    Err(Error::UnsupportedArgument(
        name.to_string(),
        "window function requires an OVER clause".to_string(),
    ))
}

/// What the engine must add to `$setWindowFields` for one window call.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutput {
    /// A single output field holding the given window operator.
    Single(Bson),
    /// NTILE(n): two outputs (row number and partition count) combined in
    /// the projection as `floor((rn - 1) * n / count) + 1`.
    Ntile { buckets: Bson },
}

pub fn output(name: &str, args: &[Bson]) -> Result<WindowOutput> {
    let shift_offset = |negate: bool| -> Bson {
        let offset = args.get(1).cloned().unwrap_or(Bson::Int64(1));
        match (negate, offset) {
            (true, Bson::Int32(v)) => Bson::Int32(-v),
            (true, Bson::Int64(v)) => Bson::Int64(-v),
            (true, other) => bson!({"$multiply": [other, -1]}),
            (false, other) => other,
        }
    };
    let out = match name {
        "ROW_NUMBER" => WindowOutput::Single(bson!({"$documentNumber": {}})),
        "RANK" => WindowOutput::Single(bson!({"$rank": {}})),
        "DENSE_RANK" => WindowOutput::Single(bson!({"$denseRank": {}})),
        "NTILE" => WindowOutput::Ntile {
            buckets: args[0].clone(),
        },
        "LAG" => WindowOutput::Single(bson!({"$shift": {
            "output": args[0].clone(),
            "by": shift_offset(true),
            "default": args.get(2).cloned().unwrap_or(Bson::Null)
        }})),
        "LEAD" => WindowOutput::Single(bson!({"$shift": {
            "output": args[0].clone(),
            "by": shift_offset(false),
            "default": args.get(2).cloned().unwrap_or(Bson::Null)
        }})),
        _ => return Err(Error::UnknownFunction(name.to_string())),
    };
    Ok(out)
}
