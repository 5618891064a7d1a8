//! Datetime function recipes: current time, component extraction, interval
//! arithmetic, construction, formatting, timezone, and unix-epoch helpers.

use super::{add, convert_date_format, Error, FunctionEntry, FunctionKind, Result};
use bson::{bson, Bson};
use std::collections::HashMap;

pub(super) fn register(entries: &mut HashMap<&'static str, FunctionEntry>) {
    use FunctionKind::Scalar;
    let defs: &[(&'static str, usize, Option<usize>)] = &[
        ("NOW", 0, Some(0)),
        ("SYSDATE", 0, Some(0)),
        ("CURRENT_TIMESTAMP", 0, Some(0)),
        ("LOCALTIME", 0, Some(0)),
        ("LOCALTIMESTAMP", 0, Some(0)),
        ("CURDATE", 0, Some(0)),
        ("CURRENT_DATE", 0, Some(0)),
        ("CURTIME", 0, Some(0)),
        ("CURRENT_TIME", 0, Some(0)),
        ("UTC_DATE", 0, Some(0)),
        ("UTC_TIME", 0, Some(0)),
        ("UTC_TIMESTAMP", 0, Some(0)),
        ("YEAR", 1, Some(1)),
        ("MONTH", 1, Some(1)),
        ("DAY", 1, Some(1)),
        ("DAYOFMONTH", 1, Some(1)),
        ("DAYOFWEEK", 1, Some(1)),
        ("DAYOFYEAR", 1, Some(1)),
        ("WEEKDAY", 1, Some(1)),
        ("WEEK", 1, Some(2)),
        ("WEEKOFYEAR", 1, Some(1)),
        ("YEARWEEK", 1, Some(2)),
        ("QUARTER", 1, Some(1)),
        ("HOUR", 1, Some(1)),
        ("MINUTE", 1, Some(1)),
        ("SECOND", 1, Some(1)),
        ("MICROSECOND", 1, Some(1)),
        ("DAYNAME", 1, Some(1)),
        ("MONTHNAME", 1, Some(1)),
        ("DATE", 1, Some(1)),
        ("TIME", 1, Some(1)),
        ("DATE_FORMAT", 2, Some(2)),
        ("TIME_FORMAT", 2, Some(2)),
        ("STR_TO_DATE", 2, Some(2)),
        ("CONVERT_TZ", 3, Some(3)),
        ("DATE_ADD", 2, Some(2)),
        ("DATE_SUB", 2, Some(2)),
        ("ADDDATE", 2, Some(2)),
        ("SUBDATE", 2, Some(2)),
        ("ADDTIME", 2, Some(2)),
        ("SUBTIME", 2, Some(2)),
        ("TIMESTAMPADD", 3, Some(3)),
        ("TIMESTAMPDIFF", 3, Some(3)),
        ("DATEDIFF", 2, Some(2)),
        ("TIMEDIFF", 2, Some(2)),
        ("PERIOD_ADD", 2, Some(2)),
        ("PERIOD_DIFF", 2, Some(2)),
        ("LAST_DAY", 1, Some(1)),
        ("MAKEDATE", 2, Some(2)),
        ("MAKETIME", 3, Some(3)),
        ("FROM_DAYS", 1, Some(1)),
        ("TO_DAYS", 1, Some(1)),
        ("SEC_TO_TIME", 1, Some(1)),
        ("TIME_TO_SEC", 1, Some(1)),
        ("UNIX_TIMESTAMP", 0, Some(1)),
        ("FROM_UNIXTIME", 1, Some(2)),
    ];
    for (name, min, max) in defs {
        add(entries, name, Scalar, *min, *max, lower);
    }
}

/// Treat a lowered argument as a date value. Field references pass through;
/// string literals are parsed server-side, with time-only strings anchored
/// to the epoch day the way the reference implementation does.
pub(crate) fn date_arg(v: &Bson) -> Bson {
    match v {
        Bson::String(s) if !s.starts_with('$') => {
            if s.contains(':') && !s.contains('-') {
                bson!({"$dateFromString": {"dateString": format!("1970-01-01T{s}")}})
            } else {
                bson!({"$dateFromString": {"dateString": s.clone()}})
            }
        }
        other => other.clone(),
    }
}

/// Destructure an interval argument produced by the expression lowering.
fn interval_parts(name: &str, v: &Bson) -> Result<(Bson, String)> {
    if let Bson::Document(d) = v {
        if let (Some(amount), Some(Bson::String(unit))) = (d.get("amount"), d.get("unit")) {
            if d.len() == 2 {
                return Ok((amount.clone(), unit.clone()));
            }
        }
    }
    // a bare numeric amount means days (ADDDATE/SUBDATE second form)
    match v {
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => Ok((v.clone(), "day".to_string())),
        other => Err(Error::UnsupportedArgument(
            name.to_string(),
            format!("expected an INTERVAL, found {other}"),
        )),
    }
}

fn format_string(name: &str, v: &Bson) -> Result<String> {
    match v {
        Bson::String(s) if !s.starts_with('$') => Ok(s.clone()),
        other => Err(Error::UnsupportedArgument(
            name.to_string(),
            format!("expected a format string literal, found {other}"),
        )),
    }
}

fn now_string(format: &str) -> Bson {
    bson!({"$dateToString": {"date": "$$NOW", "format": format}})
}

fn now_string_utc(format: &str) -> Bson {
    bson!({"$dateToString": {"date": "$$NOW", "format": format, "timezone": "UTC"}})
}

fn component(op: &str, arg: &Bson) -> Bson {
    let mut d = bson::Document::new();
    d.insert(op, date_arg(arg));
    Bson::Document(d)
}

fn date_add(date: Bson, unit: String, amount: Bson) -> Bson {
    bson!({"$dateAdd": {"startDate": date, "unit": unit, "amount": amount}})
}

fn date_subtract(date: Bson, unit: String, amount: Bson) -> Bson {
    bson!({"$dateSubtract": {"startDate": date, "unit": unit, "amount": amount}})
}

/// `YYYYMM` period to a zero-based month count.
fn period_to_months(p: &Bson) -> Bson {
    bson!({"$add": [
        {"$multiply": [{"$floor": {"$divide": [p.clone(), 100]}}, 12]},
        {"$subtract": [{"$mod": [p.clone(), 100]}, 1]}
    ]})
}

/// Seconds-in-a-time-string helper shared by TIME_TO_SEC and ADDTIME.
fn time_to_seconds(t: &Bson) -> Bson {
    bson!({"$let": {
        "vars": {"parts": {"$split": [t.clone(), ":"]}},
        "in": {"$add": [
            {"$multiply": [{"$toInt": {"$arrayElemAt": ["$$parts", 0]}}, 3600]},
            {"$multiply": [{"$toInt": {"$arrayElemAt": ["$$parts", 1]}}, 60]},
            {"$toInt": {"$arrayElemAt": ["$$parts", 2]}}
        ]}
    }})
}

fn two_digit(expr: Bson) -> Bson {
    bson!({"$cond": [
        {"$lt": [expr.clone(), 10]},
        {"$concat": ["0", {"$toString": expr.clone()}]},
        {"$toString": expr}
    ]})
}

fn lower(name: &str, args: &[Bson]) -> Result<Bson> {
    let out = match name {
        "NOW" | "SYSDATE" | "CURRENT_TIMESTAMP" | "LOCALTIME" | "LOCALTIMESTAMP" => {
            now_string("%Y-%m-%d %H:%M:%S")
        }
        "CURDATE" | "CURRENT_DATE" => now_string("%Y-%m-%d"),
        "CURTIME" | "CURRENT_TIME" => now_string("%H:%M:%S"),
        "UTC_DATE" => now_string_utc("%Y-%m-%d"),
        "UTC_TIME" => now_string_utc("%H:%M:%S"),
        "UTC_TIMESTAMP" => now_string_utc("%Y-%m-%d %H:%M:%S"),

        "YEAR" => component("$year", &args[0]),
        "MONTH" => component("$month", &args[0]),
        "DAY" | "DAYOFMONTH" => component("$dayOfMonth", &args[0]),
        "DAYOFWEEK" => component("$dayOfWeek", &args[0]),
        "DAYOFYEAR" => component("$dayOfYear", &args[0]),
        "HOUR" => component("$hour", &args[0]),
        "MINUTE" => component("$minute", &args[0]),
        "SECOND" => component("$second", &args[0]),
        "WEEK" => component("$week", &args[0]),
        // WEEKOFYEAR is WEEK in mode 3, which matches the ISO week
        "WEEKOFYEAR" => component("$isoWeek", &args[0]),
        "MICROSECOND" => bson!({"$multiply": [component("$millisecond", &args[0]), 1000]}),

        // shift 1 = Sunday to 0 = Monday
        "WEEKDAY" => bson!({"$mod": [{"$add": [component("$dayOfWeek", &args[0]), 5]}, 7]}),

        "QUARTER" => {
            bson!({"$toInt": {"$ceil": {"$divide": [component("$month", &args[0]), 3]}}})
        }
        "YEARWEEK" => bson!({"$add": [
            {"$multiply": [component("$year", &args[0]), 100]},
            component("$week", &args[0])
        ]}),

        "DAYNAME" => name_switch(
            component("$dayOfWeek", &args[0]),
            &[
                "Sunday",
                "Monday",
                "Tuesday",
                "Wednesday",
                "Thursday",
                "Friday",
                "Saturday",
            ],
        ),
        "MONTHNAME" => name_switch(
            component("$month", &args[0]),
            &[
                "January",
                "February",
                "March",
                "April",
                "May",
                "June",
                "July",
                "August",
                "September",
                "October",
                "November",
                "December",
            ],
        ),

        "DATE" => bson!({"$dateToString": {"date": date_arg(&args[0]), "format": "%Y-%m-%d"}}),
        "TIME" => bson!({"$dateToString": {"date": date_arg(&args[0]), "format": "%H:%M:%S"}}),

        "DATE_FORMAT" | "TIME_FORMAT" => {
            let format = convert_date_format(&format_string(name, &args[1])?)?;
            bson!({"$dateToString": {"date": date_arg(&args[0]), "format": format}})
        }
        "STR_TO_DATE" => {
            let format = convert_date_format(&format_string(name, &args[1])?)?;
            bson!({"$dateFromString": {"dateString": args[0].clone(), "format": format}})
        }
        "CONVERT_TZ" => bson!({"$dateToString": {
            "date": {"$dateFromString": {
                "dateString": {"$dateToString": {
                    "date": date_arg(&args[0]),
                    "format": "%Y-%m-%dT%H:%M:%S",
                    "timezone": "UTC"
                }},
                "timezone": args[1].clone()
            }},
            "format": "%Y-%m-%d %H:%M:%S",
            "timezone": args[2].clone()
        }}),

        "DATE_ADD" | "ADDDATE" => {
            let (amount, unit) = interval_parts(name, &args[1])?;
            date_add(date_arg(&args[0]), unit, amount)
        }
        "DATE_SUB" | "SUBDATE" => {
            let (amount, unit) = interval_parts(name, &args[1])?;
            date_subtract(date_arg(&args[0]), unit, amount)
        }
        "TIMESTAMPADD" => {
            let unit = format_string(name, &args[0])?;
            date_add(date_arg(&args[2]), unit, args[1].clone())
        }
        "TIMESTAMPDIFF" => {
            let unit = format_string(name, &args[0])?;
            bson!({"$dateDiff": {
                "startDate": date_arg(&args[1]),
                "endDate": date_arg(&args[2]),
                "unit": unit
            }})
        }
        "DATEDIFF" => bson!({"$toInt": {"$divide": [
            {"$subtract": [date_arg(&args[0]), date_arg(&args[1])]},
            86_400_000
        ]}}),
        "TIMEDIFF" => bson!({"$dateToString": {
            "date": {"$add": [
                {"$toDate": 0},
                {"$subtract": [date_arg(&args[0]), date_arg(&args[1])]}
            ]},
            "format": "%H:%M:%S"
        }}),
        "ADDTIME" => date_add(
            date_arg(&args[0]),
            "second".to_string(),
            time_to_seconds(&args[1]),
        ),
        "SUBTIME" => date_subtract(
            date_arg(&args[0]),
            "second".to_string(),
            time_to_seconds(&args[1]),
        ),

        "PERIOD_ADD" => bson!({"$let": {
            "vars": {"m": {"$add": [period_to_months(&args[0]), args[1].clone()]}},
            "in": {"$add": [
                {"$multiply": [{"$floor": {"$divide": ["$$m", 12]}}, 100]},
                {"$add": [{"$mod": ["$$m", 12]}, 1]}
            ]}
        }}),
        "PERIOD_DIFF" => {
            bson!({"$subtract": [period_to_months(&args[0]), period_to_months(&args[1])]})
        }

        "LAST_DAY" => {
            let date = date_arg(&args[0]);
            bson!({"$dateToString": {
                "date": {"$dateSubtract": {
                    "startDate": {"$dateFromParts": {
                        "year": component("$year", &date),
                        "month": {"$add": [component("$month", &date), 1]},
                        "day": 1
                    }},
                    "unit": "day",
                    "amount": 1
                }},
                "format": "%Y-%m-%d"
            }})
        }
        "MAKEDATE" => bson!({"$dateToString": {
            "date": {"$dateAdd": {
                "startDate": {"$dateFromParts": {"year": args[0].clone(), "month": 1, "day": 1}},
                "unit": "day",
                "amount": {"$subtract": [args[1].clone(), 1]}
            }},
            "format": "%Y-%m-%d"
        }}),
        "MAKETIME" => bson!({"$dateToString": {
            "date": {"$dateFromParts": {
                "year": 1970, "month": 1, "day": 1,
                "hour": args[0].clone(),
                "minute": args[1].clone(),
                "second": args[2].clone()
            }},
            "format": "%H:%M:%S"
        }}),

        "FROM_DAYS" => bson!({"$dateToString": {
            "date": {"$dateAdd": {
                "startDate": {"$dateFromParts": {"year": 1, "month": 1, "day": 1}},
                "unit": "day",
                "amount": {"$subtract": [args[0].clone(), 1]}
            }},
            "format": "%Y-%m-%d"
        }}),
        "TO_DAYS" => bson!({"$add": [
            {"$dateDiff": {
                "startDate": {"$dateFromParts": {"year": 1, "month": 1, "day": 1}},
                "endDate": date_arg(&args[0]),
                "unit": "day"
            }},
            1
        ]}),

        "SEC_TO_TIME" => {
            let secs = bson!({"$toInt": args[0].clone()});
            bson!({"$let": {
                "vars": {"s": secs},
                "in": {"$concat": [
                    {"$toString": {"$floor": {"$divide": ["$$s", 3600]}}},
                    ":",
                    two_digit(bson!({"$floor": {"$divide": [{"$mod": ["$$s", 3600]}, 60]}})),
                    ":",
                    two_digit(bson!({"$mod": ["$$s", 60]}))
                ]}
            }})
        }
        "TIME_TO_SEC" => time_to_seconds(&args[0]),

        "UNIX_TIMESTAMP" => {
            let date = if args.is_empty() {
                Bson::String("$$NOW".to_string())
            } else {
                date_arg(&args[0])
            };
            bson!({"$toInt": {"$divide": [{"$toLong": date}, 1000]}})
        }
        "FROM_UNIXTIME" => {
            let date = bson!({"$toDate": {"$multiply": [args[0].clone(), 1000]}});
            match args.get(1) {
                None => bson!({"$dateToString": {"date": date, "format": "%Y-%m-%d %H:%M:%S"}}),
                Some(f) => {
                    let format = convert_date_format(&format_string(name, f)?)?;
                    bson!({"$dateToString": {"date": date, "format": format}})
                }
            }
        }

        _ => return Err(Error::UnknownFunction(name.to_string())),
    };
    Ok(out)
}

fn name_switch(selector: Bson, names: &[&str]) -> Bson {
    let branches: Vec<Bson> = names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            bson!({"case": {"$eq": [selector.clone(), (i + 1) as i32]}, "then": (*n)})
        })
        .collect();
    bson!({"$switch": {"branches": branches, "default": Bson::Null}})
}
