use super::*;
use bson::bson;

macro_rules! lowers_to {
    ($func_name:ident, name = $name:expr, args = $args:expr, expected = $expected:expr) => {
        #[test]
        fn $func_name() {
            let args: Vec<Bson> = $args;
            assert_eq!(CATALOG.lower_scalar($name, &args), Ok($expected));
        }
    };
}

macro_rules! lowering_fails {
    ($func_name:ident, name = $name:expr, args = $args:expr, error = $error:pat) => {
        #[test]
        fn $func_name() {
            let args: Vec<Bson> = $args;
            assert!(matches!(CATALOG.lower_scalar($name, &args), Err($error)));
        }
    };
}

mod lookup {
    use super::*;

    #[test]
    fn unknown_function() {
        assert_eq!(
            CATALOG.entry("NO_SUCH_FN").unwrap_err(),
            Error::UnknownFunction("NO_SUCH_FN".into())
        );
    }

    #[test]
    fn arity_too_few() {
        assert!(matches!(
            CATALOG.check_arity("REPLACE", 2),
            Err(Error::ArityMismatch { .. })
        ));
    }

    #[test]
    fn arity_variadic() {
        assert_eq!(CATALOG.check_arity("CONCAT", 7), Ok(()));
        assert!(matches!(
            CATALOG.check_arity("CONCAT", 0),
            Err(Error::ArityMismatch { .. })
        ));
    }

    #[test]
    fn aggregate_classification() {
        assert!(CATALOG.is_aggregate("COUNT", 1));
        assert!(CATALOG.is_aggregate("GROUP_CONCAT", 1));
        assert!(!CATALOG.is_aggregate("UPPER", 1));
        // dual-use bitwise names: scalar with two args
        assert!(CATALOG.is_aggregate("BIT_AND", 1));
        assert!(!CATALOG.is_aggregate("BIT_AND", 2));
    }

    #[test]
    fn structural_names_are_registered_but_not_lowered_here() {
        assert_eq!(CATALOG.kind("IF"), Some(FunctionKind::Structural));
        assert_eq!(CATALOG.kind("COALESCE"), Some(FunctionKind::Structural));
        assert!(CATALOG
            .lower_scalar("IF", &[bson!(1), bson!(2), bson!(3)])
            .is_err());
    }

    #[test]
    fn encryption_family_is_unsupported() {
        assert_eq!(
            CATALOG.lower_scalar("MD5", &[bson!("$a")]),
            Err(Error::Unsupported("MD5".into()))
        );
    }
}

mod datetime {
    use super::*;

    lowers_to!(
        year_of_field,
        name = "YEAR",
        args = vec![bson!("$orderDate")],
        expected = bson!({"$year": "$orderDate"})
    );

    lowers_to!(
        year_of_string_literal_parses_server_side,
        name = "YEAR",
        args = vec![bson!("2024-12-25")],
        expected = bson!({"$year": {"$dateFromString": {"dateString": "2024-12-25"}}})
    );

    lowers_to!(
        hour_of_time_literal_is_epoch_anchored,
        name = "HOUR",
        args = vec![bson!("14:30:45")],
        expected = bson!({"$hour": {"$dateFromString": {"dateString": "1970-01-01T14:30:45"}}})
    );

    lowers_to!(
        now_formats_current_time,
        name = "NOW",
        args = vec![],
        expected = bson!({"$dateToString": {"date": "$$NOW", "format": "%Y-%m-%d %H:%M:%S"}})
    );

    lowers_to!(
        weekday_is_monday_based,
        name = "WEEKDAY",
        args = vec![bson!("$d")],
        expected = bson!({"$mod": [{"$add": [{"$dayOfWeek": "$d"}, 5]}, 7]})
    );

    lowers_to!(
        date_format_converts_specifiers,
        name = "DATE_FORMAT",
        args = vec![bson!("$d"), bson!("%Y-%m-%d %H:%i:%S")],
        expected = bson!({"$dateToString": {"date": "$d", "format": "%Y-%m-%d %H:%M:%S"}})
    );

    lowering_fails!(
        date_format_rejects_unknown_specifier,
        name = "DATE_FORMAT",
        args = vec![bson!("$d"), bson!("%Q")],
        error = Error::UnsupportedFormatSpecifier('Q')
    );

    lowers_to!(
        datediff_in_days,
        name = "DATEDIFF",
        args = vec![bson!("$a"), bson!("$b")],
        expected = bson!({"$toInt": {"$divide": [{"$subtract": ["$a", "$b"]}, 86_400_000]}})
    );

    lowers_to!(
        date_add_uses_interval_unit,
        name = "DATE_ADD",
        args = vec![bson!("$d"), bson!({"amount": 5, "unit": "day"})],
        expected = bson!({"$dateAdd": {"startDate": "$d", "unit": "day", "amount": 5}})
    );

    lowers_to!(
        date_sub_subtracts,
        name = "DATE_SUB",
        args = vec![bson!("$d"), bson!({"amount": 3, "unit": "month"})],
        expected = bson!({"$dateSubtract": {"startDate": "$d", "unit": "month", "amount": 3}})
    );

    lowers_to!(
        timestampdiff_lowered_to_datediff,
        name = "TIMESTAMPDIFF",
        args = vec![bson!("hour"), bson!("$a"), bson!("$b")],
        expected =
            bson!({"$dateDiff": {"startDate": "$a", "endDate": "$b", "unit": "hour"}})
    );

    lowering_fails!(
        date_add_requires_interval,
        name = "DATE_ADD",
        args = vec![bson!("$d"), bson!("$x")],
        error = Error::UnsupportedArgument(..)
    );

    lowers_to!(
        quarter_from_month,
        name = "QUARTER",
        args = vec![bson!("$d")],
        expected = bson!({"$toInt": {"$ceil": {"$divide": [{"$month": "$d"}, 3]}}})
    );
}

mod string {
    use super::*;

    lowers_to!(
        concat_varargs,
        name = "CONCAT",
        args = vec![bson!("$a"), bson!("-"), bson!("$b")],
        expected = bson!({"$concat": ["$a", "-", "$b"]})
    );

    lowers_to!(
        substring_is_zero_based_code_points,
        name = "SUBSTRING",
        args = vec![bson!("$s"), bson!(3), bson!(2)],
        expected = bson!({"$substrCP": ["$s", 2, 2]})
    );

    lowers_to!(
        substring_without_length_runs_to_end,
        name = "SUBSTRING",
        args = vec![bson!("$s"), bson!(3)],
        expected = bson!({"$substrCP": ["$s", 2, {"$strLenCP": "$s"}]})
    );

    lowers_to!(
        instr_is_one_based,
        name = "INSTR",
        args = vec![bson!("$s"), bson!("x")],
        expected = bson!({"$add": [{"$indexOfCP": ["$s", "x"]}, 1]})
    );

    lowers_to!(
        locate_swaps_arguments,
        name = "LOCATE",
        args = vec![bson!("x"), bson!("$s")],
        expected = bson!({"$add": [{"$indexOfCP": ["$s", "x"]}, 1]})
    );

    lowers_to!(
        left_prefix,
        name = "LEFT",
        args = vec![bson!("$s"), bson!(2)],
        expected = bson!({"$substrCP": ["$s", 0, 2]})
    );

    lowers_to!(
        trim_with_chars,
        name = "TRIM",
        args = vec![bson!("$s"), bson!("x")],
        expected = bson!({"$trim": {"input": "$s", "chars": "x"}})
    );

    lowers_to!(
        replace_all_occurrences,
        name = "REPLACE",
        args = vec![bson!("$s"), bson!("a"), bson!("b")],
        expected =
            bson!({"$replaceAll": {"input": "$s", "find": "a", "replacement": "b"}})
    );

    lowering_fails!(
        soundex_unsupported,
        name = "SOUNDEX",
        args = vec![bson!("$s")],
        error = Error::Unsupported(_)
    );
}

mod math {
    use super::*;

    lowers_to!(
        abs_simple,
        name = "ABS",
        args = vec![bson!("$x")],
        expected = bson!({"$abs": "$x"})
    );

    lowers_to!(
        round_defaults_to_zero_places,
        name = "ROUND",
        args = vec![bson!("$x")],
        expected = bson!({"$round": ["$x", 0]})
    );

    lowers_to!(
        log_single_arg_is_natural,
        name = "LOG",
        args = vec![bson!("$x")],
        expected = bson!({"$ln": "$x"})
    );

    lowers_to!(
        log_with_base,
        name = "LOG",
        args = vec![bson!(2), bson!("$x")],
        expected = bson!({"$log": ["$x", 2]})
    );

    lowers_to!(
        pi_is_a_literal,
        name = "PI",
        args = vec![],
        expected = bson!({"$literal": std::f64::consts::PI})
    );

    lowers_to!(
        sign_via_cond,
        name = "SIGN",
        args = vec![bson!("$x")],
        expected = bson!({"$cond": [
            {"$gt": ["$x", 0]},
            1,
            {"$cond": [{"$lt": ["$x", 0]}, -1, 0]}
        ]})
    );

    lowers_to!(
        bit_and_scalar_form,
        name = "BIT_AND",
        args = vec![bson!("$a"), bson!("$b")],
        expected = bson!({"$bitAnd": ["$a", "$b"]})
    );
}

mod aggregates {
    use super::*;
    use crate::catalog::aggregate::{accumulator, finalize, Finalize};

    #[test]
    fn count_star() {
        let plan = accumulator("COUNT", None, false, None, None).unwrap();
        assert_eq!(plan.accumulator, bson!({"$sum": 1}));
        assert_eq!(plan.finalize, Finalize::None);
    }

    #[test]
    fn count_distinct_takes_set_size() {
        let plan = accumulator("COUNT", Some(bson!("$a")), true, None, None).unwrap();
        assert_eq!(plan.accumulator, bson!({"$addToSet": "$a"}));
        assert_eq!(finalize("$n", &plan.finalize), bson!({"$size": "$n"}));
    }

    #[test]
    fn stddev_rounds_to_six_places() {
        let plan = accumulator("STDDEV_POP", Some(bson!("$a")), false, None, None).unwrap();
        assert_eq!(plan.accumulator, bson!({"$stdDevPop": "$a"}));
        assert_eq!(finalize("$s", &plan.finalize), bson!({"$round": ["$s", 6]}));
    }

    #[test]
    fn variance_is_squared_stddev() {
        let plan = accumulator("VAR_POP", Some(bson!("$a")), false, None, None).unwrap();
        assert_eq!(
            finalize("$v", &plan.finalize),
            bson!({"$round": [{"$pow": ["$v", 2]}, 6]})
        );
    }

    #[test]
    fn group_concat_joins_with_separator() {
        let plan = accumulator("GROUP_CONCAT", Some(bson!("$a")), false, Some("; "), None).unwrap();
        assert_eq!(plan.accumulator, bson!({"$push": "$a"}));
        assert_eq!(
            finalize("$g", &plan.finalize),
            bson!({"$reduce": {
                "input": "$g",
                "initialValue": "",
                "in": {"$cond": [
                    {"$eq": ["$$value", ""]},
                    {"$toString": "$$this"},
                    {"$concat": ["$$value", "; ", {"$toString": "$$this"}]}
                ]}
            }})
        );
    }

    #[test]
    fn bit_and_reduces_pushed_values() {
        let plan = accumulator("BIT_AND", Some(bson!("$a")), false, None, None).unwrap();
        assert_eq!(plan.accumulator, bson!({"$push": "$a"}));
        assert_eq!(
            finalize("$b", &plan.finalize),
            bson!({"$reduce": {
                "input": "$b",
                "initialValue": -1i64,
                "in": {"$bitAnd": ["$$value", "$$this"]}
            }})
        );
    }

    #[test]
    fn star_outside_count_rejected() {
        assert!(matches!(
            accumulator("SUM", None, false, None, None),
            Err(Error::UnsupportedArgument(..))
        ));
    }
}

mod windows {
    use super::*;
    use crate::catalog::window::{output, WindowOutput};

    #[test]
    fn row_number() {
        assert_eq!(
            output("ROW_NUMBER", &[]).unwrap(),
            WindowOutput::Single(bson!({"$documentNumber": {}}))
        );
    }

    #[test]
    fn lag_shifts_backwards() {
        assert_eq!(
            output("LAG", &[bson!("$v"), bson!(2)]).unwrap(),
            WindowOutput::Single(bson!({"$shift": {
                "output": "$v",
                "by": -2,
                "default": Bson::Null
            }}))
        );
    }

    #[test]
    fn lead_defaults_to_one() {
        assert_eq!(
            output("LEAD", &[bson!("$v")]).unwrap(),
            WindowOutput::Single(bson!({"$shift": {
                "output": "$v",
                "by": 1i64,
                "default": Bson::Null
            }}))
        );
    }

    #[test]
    fn ntile_carries_bucket_count() {
        assert_eq!(
            output("NTILE", &[bson!(4)]).unwrap(),
            WindowOutput::Ntile { buckets: bson!(4) }
        );
    }

    #[test]
    fn window_function_without_over_is_rejected() {
        assert!(matches!(
            CATALOG.lower_scalar("ROW_NUMBER", &[]),
            Err(Error::UnsupportedArgument(..))
        ));
    }
}

mod format_table {
    use super::*;

    #[test]
    fn passthrough_literals() {
        assert_eq!(convert_date_format("ymd").unwrap(), "ymd");
    }

    #[test]
    fn minute_and_month_disambiguated() {
        // MariaDB %i = minutes, %m = month; MongoDB %M = minutes, %m = month
        assert_eq!(convert_date_format("%i %m").unwrap(), "%M %m");
    }

    #[test]
    fn twelve_hour_compound() {
        assert_eq!(convert_date_format("%r").unwrap(), "%I:%M:%S %p");
    }

    #[test]
    fn escaped_percent() {
        assert_eq!(convert_date_format("100%%").unwrap(), "100%");
    }

    #[test]
    fn trailing_percent_is_an_error() {
        assert_eq!(
            convert_date_format("%Y%").unwrap_err(),
            Error::UnsupportedFormatSpecifier('%')
        );
    }
}
