use crate::lexer::ReservedWordDialect;

macro_rules! parsable {
    ($func_name:ident, expected = $expected:expr, input = $input:expr) => {
        #[test]
        fn $func_name() {
            let res = crate::parser::parse_statement($input, ReservedWordDialect::MariaDb);
            if $expected {
                res.expect("expected input to parse, but it failed");
            } else {
                assert!(res.is_err(), "expected parse error, but parsing succeeded");
            }
        }
    };
}

macro_rules! validate_ast {
    ($func_name:ident, expected = $expected:expr, input = $input:expr,) => {
        #[test]
        fn $func_name() {
            let stmt = crate::parser::parse_statement($input, ReservedWordDialect::MariaDb)
                .expect("expected input to parse");
            assert_eq!(stmt, $expected);
        }
    };
}

mod select {
    use super::*;

    parsable!(star, expected = true, input = "select *");
    parsable!(star_upper, expected = true, input = "SELECT *");
    parsable!(mixed_case, expected = true, input = "SeLeCt *");
    parsable!(qualified_star, expected = true, input = "select a.* from t");
    parsable!(multiple, expected = true, input = "select a, b, c from t");
    parsable!(aliased, expected = true, input = "select a as x, b y from t");
    parsable!(distinct, expected = true, input = "select distinct a from t");
    parsable!(all_quantifier, expected = true, input = "select all a from t");
    parsable!(
        backtick_reserved,
        expected = true,
        input = "select `order` from `select`"
    );
    parsable!(trailing_semicolon, expected = true, input = "select * from t;");
    parsable!(
        limit_offset,
        expected = true,
        input = "select a from t limit 10 offset 5"
    );
    parsable!(
        limit_comma,
        expected = true,
        input = "select a from t limit 5, 10"
    );
    parsable!(no_projection, expected = false, input = "select from t");
    parsable!(unterminated, expected = false, input = "select a from");
    parsable!(double_statement, expected = false, input = "select 1 select 2");
    parsable!(bad_token, expected = false, input = "select @@version");

    use crate::ast::*;

    validate_ast!(
        simple_projection_ast,
        expected = Statement::Select(SelectStatement {
            projections: vec![
                Projection {
                    expr: Expression::Column(Identifier::simple("a")),
                    alias: None,
                },
                Projection {
                    expr: Expression::Column(Identifier::qualified("t", "b")),
                    alias: Some("c".into()),
                },
            ],
            from: Some(TableRef::Collection {
                name: "t".into(),
                alias: None,
            }),
            ..Default::default()
        }),
        input = "SELECT a, t.b AS c FROM t",
    );

    validate_ast!(
        backticks_are_transparent,
        expected = crate::parser::parse_statement("SELECT a FROM t", ReservedWordDialect::MariaDb)
            .unwrap(),
        input = "SELECT `a` FROM `t`",
    );

    validate_ast!(
        limit_comma_ast,
        expected = Statement::Select(SelectStatement {
            projections: vec![Projection {
                expr: Expression::Column(Identifier::simple("a")),
                alias: None,
            }],
            from: Some(TableRef::Collection {
                name: "t".into(),
                alias: None,
            }),
            limit: Some(10),
            offset: Some(5),
            ..Default::default()
        }),
        input = "SELECT a FROM t LIMIT 5, 10",
    );
}

mod joins {
    use super::*;
    use crate::ast::*;

    parsable!(inner, expected = true, input = "select * from a join b on a.x = b.x");
    parsable!(
        inner_explicit,
        expected = true,
        input = "select * from a inner join b on a.x = b.x"
    );
    parsable!(
        left_outer,
        expected = true,
        input = "select * from a left outer join b on a.x = b.x"
    );
    parsable!(cross, expected = true, input = "select * from a cross join b");
    parsable!(
        cross_with_on_rejected,
        expected = false,
        input = "select * from a cross join b on a.x = b.x"
    );
    parsable!(
        chained,
        expected = true,
        input = "select * from a join b on a.x = b.x left join c on b.y = c.y"
    );
    parsable!(
        derived_table,
        expected = true,
        input = "select * from (select a from t) d"
    );
    parsable!(
        derived_requires_alias,
        expected = false,
        input = "select * from (select a from t)"
    );

    validate_ast!(
        using_desugars_to_on,
        expected = crate::parser::parse_statement(
            "SELECT * FROM a JOIN b ON a.id = b.id",
            ReservedWordDialect::MariaDb
        )
        .unwrap(),
        input = "SELECT * FROM a JOIN b USING (id)",
    );

    #[test]
    fn join_kinds() {
        let stmt = crate::parser::parse_statement(
            "SELECT * FROM a LEFT JOIN b ON a.x = b.x RIGHT JOIN c ON a.x = c.x",
            ReservedWordDialect::MariaDb,
        )
        .unwrap();
        let Statement::Select(s) = stmt else {
            panic!("expected select")
        };
        assert_eq!(s.joins.len(), 2);
        assert_eq!(s.joins[0].kind, JoinKind::Left);
        assert_eq!(s.joins[1].kind, JoinKind::Right);
    }
}

mod exprs {
    use super::*;
    use crate::ast::*;

    parsable!(arithmetic, expected = true, input = "select 1 + 2 * 3 - 4 / 5");
    parsable!(comparison_chain, expected = true, input = "select * from t where a = 1 and b > 2 or c < 3");
    parsable!(like, expected = true, input = "select * from t where a like 'x%'");
    parsable!(not_like, expected = true, input = "select * from t where a not like 'x%'");
    parsable!(in_list, expected = true, input = "select * from t where a in (1, 2, 3)");
    parsable!(not_in_list, expected = true, input = "select * from t where a not in (1, 2)");
    parsable!(between, expected = true, input = "select * from t where a between 1 and 10");
    parsable!(is_null, expected = true, input = "select * from t where a is null");
    parsable!(is_not_null, expected = true, input = "select * from t where a is not null");
    parsable!(regexp, expected = true, input = "select * from t where a regexp '^x'");
    parsable!(bitops, expected = true, input = "select a | b & c ^ d from t");
    parsable!(shift_ops, expected = true, input = "select a << 2, b >> 1 from t");
    parsable!(concat_pipes, expected = true, input = "select a || b from t");
    parsable!(unary_minus, expected = true, input = "select -a, -(b + 1) from t");
    parsable!(bit_not, expected = true, input = "select ~a from t");
    parsable!(interval_literal, expected = true, input = "select date_add(d, interval 5 day) from t");
    parsable!(bad_interval_unit, expected = false, input = "select date_add(d, interval 5 lightyear) from t");

    validate_ast!(
        precedence_mul_before_add,
        expected = Statement::Select(SelectStatement {
            projections: vec![Projection {
                expr: Expression::binary(
                    Expression::Literal(Literal::Integer(1)),
                    BinaryOp::Add,
                    Expression::binary(
                        Expression::Literal(Literal::Integer(2)),
                        BinaryOp::Mul,
                        Expression::Literal(Literal::Integer(3)),
                    ),
                ),
                alias: None,
            }],
            ..Default::default()
        }),
        input = "SELECT 1 + 2 * 3",
    );

    validate_ast!(
        between_desugars,
        expected = crate::parser::parse_statement(
            "SELECT * FROM t WHERE a >= 1 AND a <= 10",
            ReservedWordDialect::MariaDb
        )
        .unwrap(),
        input = "SELECT * FROM t WHERE a BETWEEN 1 AND 10",
    );

    validate_ast!(
        is_null_is_unary,
        expected = Statement::Select(SelectStatement {
            projections: vec![Projection {
                expr: Expression::Star,
                alias: None,
            }],
            from: Some(TableRef::Collection {
                name: "t".into(),
                alias: None,
            }),
            where_clause: Some(Expression::unary(
                UnaryOp::IsNull,
                Expression::Column(Identifier::simple("a")),
            )),
            ..Default::default()
        }),
        input = "SELECT * FROM t WHERE a IS NULL",
    );
}

mod functions {
    use super::*;
    use crate::ast::*;

    parsable!(count_star, expected = true, input = "select count(*) from t");
    parsable!(count_distinct, expected = true, input = "select count(distinct a) from t");
    parsable!(nested_calls, expected = true, input = "select upper(trim(name)) from t");
    parsable!(reserved_name_call, expected = true, input = "select if(a > 1, 'x', 'y') from t");
    parsable!(left_right_calls, expected = true, input = "select left(a, 2), right(a, 2) from t");
    parsable!(extract_form, expected = true, input = "select extract(year from d) from t");
    parsable!(cast_form, expected = true, input = "select cast(a as char) from t");
    parsable!(cast_decimal_precision, expected = true, input = "select cast(a as decimal(10, 2)) from t");
    parsable!(convert_form, expected = true, input = "select convert(a, signed) from t");
    parsable!(position_form, expected = true, input = "select position('x' in a) from t");
    parsable!(trim_both_form, expected = true, input = "select trim(both 'x' from a) from t");
    parsable!(trim_leading_form, expected = true, input = "select trim(leading from a) from t");
    parsable!(
        group_concat_full,
        expected = true,
        input = "select group_concat(name order by name desc separator ', ') from t group by city"
    );
    parsable!(
        window_over,
        expected = true,
        input = "select row_number() over (partition by a order by b desc) from t"
    );
    parsable!(
        match_against,
        expected = true,
        input = "select * from t where match (title, body) against ('ferris' in boolean mode)"
    );
    parsable!(niladic_current_date, expected = true, input = "select current_date");
    parsable!(sysdate_call, expected = true, input = "select sysdate()");

    validate_ast!(
        count_star_ast,
        expected = Statement::Select(SelectStatement {
            projections: vec![Projection {
                expr: Expression::FunctionCall(FunctionExpr::new("COUNT", vec![Expression::Star])),
                alias: Some("n".into()),
            }],
            from: Some(TableRef::Collection {
                name: "t".into(),
                alias: None,
            }),
            ..Default::default()
        }),
        input = "SELECT COUNT(*) AS n FROM t",
    );

    validate_ast!(
        function_names_uppercased,
        expected = crate::parser::parse_statement("SELECT UPPER(a) FROM t", ReservedWordDialect::MariaDb)
            .unwrap(),
        input = "SELECT upper(a) FROM t",
    );

    #[test]
    fn extract_ast() {
        let stmt =
            crate::parser::parse_statement("SELECT EXTRACT(YEAR FROM d) FROM t", ReservedWordDialect::MariaDb)
                .unwrap();
        let Statement::Select(s) = stmt else {
            panic!("expected select")
        };
        assert_eq!(
            s.projections[0].expr,
            Expression::Extract {
                unit: IntervalUnit::Year,
                expr: Box::new(Expression::Column(Identifier::simple("d"))),
            }
        );
    }

    #[test]
    fn group_concat_separator() {
        let stmt = crate::parser::parse_statement(
            "SELECT GROUP_CONCAT(name SEPARATOR '; ') FROM t GROUP BY city",
            ReservedWordDialect::MariaDb,
        )
        .unwrap();
        let Statement::Select(s) = stmt else {
            panic!("expected select")
        };
        let Expression::FunctionCall(f) = &s.projections[0].expr else {
            panic!("expected function call")
        };
        assert_eq!(f.separator.as_deref(), Some("; "));
    }
}

mod case_when {
    use super::*;
    use crate::ast::*;

    parsable!(searched, expected = true, input = "select case when a > 1 then 'x' else 'y' end from t");
    parsable!(with_operand, expected = true, input = "select case a when 1 then 'x' when 2 then 'y' end from t");
    parsable!(missing_end, expected = false, input = "select case when a > 1 then 'x'");
    parsable!(missing_when, expected = false, input = "select case else 'y' end");

    #[test]
    fn searched_case_ast() {
        let stmt = crate::parser::parse_statement(
            "SELECT CASE WHEN a = 1 THEN 'one' ELSE 'other' END FROM t",
            ReservedWordDialect::MariaDb,
        )
        .unwrap();
        let Statement::Select(s) = stmt else {
            panic!("expected select")
        };
        let Expression::Case(c) = &s.projections[0].expr else {
            panic!("expected case")
        };
        assert!(c.operand.is_none());
        assert_eq!(c.branches.len(), 1);
        assert!(c.else_branch.is_some());
    }
}

mod subqueries {
    use super::*;
    use crate::ast::*;

    parsable!(scalar, expected = true, input = "select * from t where a = (select max(a) from t2 limit 1)");
    parsable!(in_subquery, expected = true, input = "select * from t where a in (select a from t2)");
    parsable!(not_in_subquery, expected = true, input = "select * from t where a not in (select a from t2)");
    parsable!(exists, expected = true, input = "select * from t where exists (select 1 from t2 limit 1)");
    parsable!(not_exists, expected = true, input = "select * from t where not exists (select 1 from t2 limit 1)");
    parsable!(row_subquery, expected = true, input = "select * from t where (a, b) = (select a, b from t2 limit 1)");

    fn subquery_kind_of_where(sql: &str) -> SubqueryKind {
        let stmt = crate::parser::parse_statement(sql, ReservedWordDialect::MariaDb).unwrap();
        let Statement::Select(s) = stmt else {
            panic!("expected select")
        };
        let mut found = None;
        s.where_clause.unwrap().any(&mut |e| {
            if let Expression::Subquery(sub) = e {
                found = Some(sub.kind);
                true
            } else {
                false
            }
        });
        found.expect("expected a subquery in WHERE")
    }

    #[test]
    fn kind_inference() {
        assert_eq!(
            subquery_kind_of_where("SELECT * FROM t WHERE a = (SELECT a FROM u LIMIT 1)"),
            SubqueryKind::Scalar
        );
        assert_eq!(
            subquery_kind_of_where("SELECT * FROM t WHERE a IN (SELECT a FROM u)"),
            SubqueryKind::In
        );
        assert_eq!(
            subquery_kind_of_where("SELECT * FROM t WHERE a NOT IN (SELECT a FROM u)"),
            SubqueryKind::NotIn
        );
        assert_eq!(
            subquery_kind_of_where("SELECT * FROM t WHERE EXISTS (SELECT 1 FROM u LIMIT 1)"),
            SubqueryKind::Exists
        );
        assert_eq!(
            subquery_kind_of_where("SELECT * FROM t WHERE NOT EXISTS (SELECT 1 FROM u LIMIT 1)"),
            SubqueryKind::NotExists
        );
        assert_eq!(
            subquery_kind_of_where("SELECT * FROM t WHERE (a, b) = (SELECT a, b FROM u LIMIT 1)"),
            SubqueryKind::Row
        );
    }
}

mod ctes {
    use super::*;
    use crate::ast::*;

    parsable!(single, expected = true, input = "with c as (select a from t) select * from c");
    parsable!(
        multiple,
        expected = true,
        input = "with c as (select a from t), d as (select b from u) select * from c"
    );
    parsable!(
        with_columns,
        expected = true,
        input = "with c (x, y) as (select a, b from t) select * from c"
    );
    parsable!(
        recursive,
        expected = true,
        input = "with recursive r as (select id from t join r on t.parent = r.id) select * from r"
    );

    #[test]
    fn recursive_flag_set() {
        let stmt = crate::parser::parse_statement(
            "WITH RECURSIVE r AS (SELECT id FROM t JOIN r ON t.parent = r.id) SELECT * FROM r",
            ReservedWordDialect::MariaDb,
        )
        .unwrap();
        let Statement::With(w) = stmt else {
            panic!("expected with")
        };
        assert!(w.ctes[0].recursive);
        assert!(matches!(*w.body, Statement::Select(_)));
    }
}

mod writes {
    use super::*;
    use crate::ast::*;

    parsable!(insert_single, expected = true, input = "insert into t (a, b) values (1, 'x')");
    parsable!(
        insert_multi,
        expected = true,
        input = "insert into t (a, b) values (1, 'x'), (2, 'y')"
    );
    parsable!(insert_without_columns, expected = false, input = "insert into t values (1)");
    parsable!(update_simple, expected = true, input = "update t set a = 1 where b = 2");
    parsable!(update_multi_assign, expected = true, input = "update t set a = 1, b = b + 1");
    parsable!(delete_where, expected = true, input = "delete from t where a = 1");
    parsable!(delete_all, expected = true, input = "delete from t");

    validate_ast!(
        insert_ast,
        expected = Statement::Insert(InsertStatement {
            table: "t".into(),
            columns: vec!["a".into(), "b".into()],
            rows: vec![
                vec![
                    Expression::Literal(Literal::Integer(1)),
                    Expression::Literal(Literal::String("x".into())),
                ],
                vec![
                    Expression::Literal(Literal::Integer(2)),
                    Expression::Literal(Literal::Null),
                ],
            ],
        }),
        input = "INSERT INTO t (a, b) VALUES (1, 'x'), (2, NULL)",
    );
}

mod batch {
    use super::*;

    #[test]
    fn splits_on_semicolons() {
        let stmts = crate::parser::parse_statements(
            "SELECT 1; SELECT 2; DELETE FROM t",
            ReservedWordDialect::MariaDb,
        )
        .unwrap();
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn reports_offending_statement_index() {
        let err = crate::parser::parse_statements(
            "SELECT 1; SELEKT 2; SELECT 3",
            ReservedWordDialect::MariaDb,
        )
        .unwrap_err();
        assert_eq!(err.0, 1);
    }
}
