use crate::{invocation::*, options::TranslateOptions, result, translator::Error};
use bson::{doc, Document};

fn translate(sql: &str) -> result::Result<Invocation> {
    crate::translate(sql, "test", &TranslateOptions::default())
}

fn translate_ok(sql: &str) -> Invocation {
    translate(sql).expect("expected translation to succeed")
}

fn translate_err(sql: &str) -> Error {
    match translate(sql) {
        Ok(inv) => panic!("expected translation to fail, got {inv:?}"),
        Err(result::Error::Translate(e)) => e,
        Err(other) => panic!("expected a translation error, got {other:?}"),
    }
}

fn collation() -> Document {
    doc! {"locale": "en", "caseLevel": false, "strength": 1, "numericOrdering": false}
}

macro_rules! translates_to {
    ($func_name:ident, input = $input:expr, expected = $expected:expr) => {
        #[test]
        fn $func_name() {
            assert_eq!(translate_ok($input), $expected);
        }
    };
}

macro_rules! pipeline_is {
    ($func_name:ident, input = $input:expr, collection = $collection:expr, pipeline = $pipeline:expr) => {
        #[test]
        fn $func_name() {
            match translate_ok($input) {
                Invocation::Aggregate(agg) => {
                    assert_eq!(agg.collection.as_deref(), $collection);
                    assert_eq!(agg.pipeline, $pipeline);
                }
                other => panic!("expected an aggregate invocation, got {other:?}"),
            }
        }
    };
}

mod scenarios {
    use super::*;

    translates_to!(
        find_with_filter_sort_limit,
        input = "SELECT customerName FROM customers WHERE customerNumber > 100 \
                 ORDER BY customerName ASC LIMIT 10;",
        expected = Invocation::Find(FindInvocation {
            database: "test".into(),
            collection: "customers".into(),
            filter: Some(doc! {"customerNumber": {"$gt": 100}}),
            projection: Some(doc! {"_id": 0, "customerName": 1}),
            sort: Some(doc! {"customerName": 1}),
            skip: None,
            limit: Some(10),
            collation: Some(collation()),
        })
    );

    pipeline_is!(
        group_by_having_order,
        input = "SELECT country, COUNT(*) AS n FROM customers GROUP BY country \
                 HAVING COUNT(*) > 5 ORDER BY n DESC;",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$group": {
                "_id": "$country",
                "n": {"$sum": 1},
                "country": {"$first": "$country"},
            }},
            doc! {"$match": {"n": {"$gt": 5}}},
            doc! {"$sort": {"n": -1}},
            doc! {"$project": {"_id": 0, "country": 1, "n": 1}},
        ]
    );

    pipeline_is!(
        left_join_lookup_unwind,
        input = "SELECT c.customerName, o.orderDate FROM customers c \
                 LEFT JOIN orders o ON c.customerNumber = o.customerNumber;",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$lookup": {
                "from": "orders",
                "let": {"cn": "$customerNumber"},
                "pipeline": [
                    {"$match": {"$expr": {"$eq": ["$customerNumber", "$$cn"]}}},
                ],
                "as": "o",
            }},
            doc! {"$unwind": {"path": "$o", "preserveNullAndEmptyArrays": true}},
            doc! {"$project": {"_id": 0, "customerName": 1, "orderDate": "$o.orderDate"}},
        ]
    );

    pipeline_is!(
        in_subquery_lookup,
        input = "SELECT customerName FROM customers \
                 WHERE customerNumber IN (SELECT customerNumber FROM orders);",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$lookup": {
                "from": "orders",
                "pipeline": [{"$project": {"_id": 0, "customerNumber": 1}}],
                "as": "__in_1",
            }},
            doc! {"$match": {"$expr": {"$in": ["$customerNumber", "$__in_1.customerNumber"]}}},
            doc! {"$project": {"_id": 0, "customerName": 1, "__in_1": 0}},
        ]
    );

    pipeline_is!(
        conditional_projection,
        input = "SELECT IF(creditLimit > 50000, 'High', 'Low') AS tier FROM customers;",
        collection = Some("customers"),
        pipeline = vec![doc! {"$project": {
            "_id": 0,
            "tier": {"$cond": [{"$gt": ["$creditLimit", 50000]}, "High", "Low"]},
        }}]
    );

    translates_to!(
        update_set_literal,
        input = "UPDATE customers SET contactFirstName = 'Jane' WHERE customerNumber = 500;",
        expected = Invocation::UpdateMany(UpdateManyInvocation {
            database: "test".into(),
            collection: "customers".into(),
            filter: doc! {"customerNumber": 500},
            update: UpdateSpec::Document(doc! {"$set": {"contactFirstName": "Jane"}}),
        })
    );
}

mod properties {
    use super::*;

    #[test]
    fn translation_is_deterministic() {
        let sql = "SELECT c.customerName, COUNT(*) AS n FROM customers c \
                   LEFT JOIN orders o ON c.customerNumber = o.customerNumber \
                   GROUP BY c.customerName ORDER BY n DESC LIMIT 3";
        assert_eq!(translate_ok(sql), translate_ok(sql));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            translate_ok("select customerName from customers where customerNumber > 1"),
            translate_ok("SELECT customerName FROM customers WHERE customerNumber > 1"),
        );
    }

    #[test]
    fn backticks_are_transparent() {
        assert_eq!(
            translate_ok("SELECT `customerName` FROM `customers`"),
            translate_ok("SELECT customerName FROM customers"),
        );
    }

    #[test]
    fn limit_without_order_by_gets_implicit_sort() {
        let Invocation::Find(find) = translate_ok("SELECT customerName FROM customers LIMIT 5")
        else {
            panic!("expected find");
        };
        assert_eq!(find.sort, Some(doc! {"_id": 1}));
        assert_eq!(find.limit, Some(5));
        // the shim is not a user sort, so no collation is attached
        assert_eq!(find.collation, None);
    }

    #[test]
    fn implicit_sort_precedes_limit_in_pipelines() {
        let Invocation::Aggregate(agg) =
            translate_ok("SELECT UPPER(customerName) AS u FROM customers LIMIT 3")
        else {
            panic!("expected aggregate");
        };
        let tail = &agg.pipeline[agg.pipeline.len() - 2..];
        assert_eq!(tail[0], doc! {"$sort": {"_id": 1}});
        assert_eq!(tail[1], doc! {"$limit": 3i64});
    }

    #[test]
    fn shim_can_be_disabled() {
        let options = TranslateOptions {
            implicit_order_on_limit: false,
            ..Default::default()
        };
        let Invocation::Find(find) =
            crate::translate("SELECT customerName FROM customers LIMIT 5", "test", &options)
                .unwrap()
        else {
            panic!("expected find");
        };
        assert_eq!(find.sort, None);
    }

    #[test]
    fn limit_offset_lowers_to_skip_then_limit() {
        let Invocation::Aggregate(agg) =
            translate_ok("SELECT UPPER(customerName) AS u FROM customers LIMIT 2, 7")
        else {
            panic!("expected aggregate");
        };
        let tail = &agg.pipeline[agg.pipeline.len() - 3..];
        assert_eq!(tail[0], doc! {"$sort": {"_id": 1}});
        assert_eq!(tail[1], doc! {"$skip": 2i64});
        assert_eq!(tail[2], doc! {"$limit": 7i64});
    }
}

mod find_path {
    use super::*;

    translates_to!(
        select_star_has_no_projection,
        input = "SELECT * FROM customers",
        expected = Invocation::Find(FindInvocation {
            database: "test".into(),
            collection: "customers".into(),
            filter: None,
            projection: None,
            sort: None,
            skip: None,
            limit: None,
            collation: None,
        })
    );

    #[test]
    fn compound_where_merges_into_one_document() {
        let Invocation::Find(find) = translate_ok(
            "SELECT customerName FROM customers WHERE creditLimit > 1000 AND country = 'France'",
        ) else {
            panic!("expected find");
        };
        assert_eq!(
            find.filter,
            Some(doc! {"creditLimit": {"$gt": 1000}, "country": "France"})
        );
    }

    #[test]
    fn or_stays_explicit() {
        let Invocation::Find(find) = translate_ok(
            "SELECT customerName FROM customers WHERE country = 'France' OR country = 'Spain'",
        ) else {
            panic!("expected find");
        };
        assert_eq!(
            find.filter,
            Some(doc! {"$or": [{"country": "France"}, {"country": "Spain"}]})
        );
    }

    #[test]
    fn between_desugars_to_range() {
        let Invocation::Find(find) = translate_ok(
            "SELECT customerName FROM customers WHERE creditLimit BETWEEN 100 AND 200",
        ) else {
            panic!("expected find");
        };
        // both bounds address the same key, so they stack in $and
        assert_eq!(
            find.filter,
            Some(doc! {"$and": [
                {"creditLimit": {"$gte": 100}},
                {"creditLimit": {"$lte": 200}},
            ]})
        );
    }

    #[test]
    fn like_converts_to_anchored_regex() {
        let Invocation::Find(find) =
            translate_ok("SELECT customerName FROM customers WHERE customerName LIKE 'Jo%'")
        else {
            panic!("expected find");
        };
        assert_eq!(
            find.filter,
            Some(doc! {"customerName": {"$regex": "^Jo", "$options": "i"}})
        );
        assert_eq!(find.collation, Some(collation()));
    }

    #[test]
    fn is_null_and_is_not_null() {
        let Invocation::Find(find) =
            translate_ok("SELECT customerName FROM customers WHERE state IS NULL")
        else {
            panic!("expected find");
        };
        assert_eq!(find.filter, Some(doc! {"state": null}));

        let Invocation::Find(find) =
            translate_ok("SELECT customerName FROM customers WHERE state IS NOT NULL")
        else {
            panic!("expected find");
        };
        assert_eq!(
            find.filter,
            Some(doc! {"state": {"$exists": true, "$ne": null}})
        );
    }

    #[test]
    fn in_list_uses_dollar_in() {
        let Invocation::Find(find) = translate_ok(
            "SELECT customerName FROM customers WHERE country IN ('France', 'Spain')",
        ) else {
            panic!("expected find");
        };
        assert_eq!(
            find.filter,
            Some(doc! {"country": {"$in": ["France", "Spain"]}})
        );
    }

    #[test]
    fn cross_field_comparison_uses_expr() {
        let Invocation::Find(find) =
            translate_ok("SELECT customerName FROM customers WHERE creditLimit > amountOwed")
        else {
            panic!("expected find");
        };
        assert_eq!(
            find.filter,
            Some(doc! {"$expr": {"$gt": ["$creditLimit", "$amountOwed"]}})
        );
    }

    #[test]
    fn fulltext_match_lowers_to_text_search() {
        let Invocation::Find(find) = translate_ok(
            "SELECT title FROM articles WHERE MATCH (title, body) AGAINST ('ferris' IN BOOLEAN MODE)",
        ) else {
            panic!("expected find");
        };
        assert_eq!(find.filter, Some(doc! {"$text": {"$search": "ferris"}}));
    }

    #[test]
    fn aliased_column_projects_a_path() {
        let Invocation::Find(find) =
            translate_ok("SELECT customerName AS name FROM customers")
        else {
            panic!("expected find");
        };
        assert_eq!(
            find.projection,
            Some(doc! {"_id": 0, "name": "$customerName"})
        );
    }

    #[test]
    fn order_by_positional_resolves_against_projections() {
        let Invocation::Find(find) =
            translate_ok("SELECT customerName, creditLimit FROM customers ORDER BY 2 DESC")
        else {
            panic!("expected find");
        };
        assert_eq!(find.sort, Some(doc! {"creditLimit": -1}));
    }
}

mod groups {
    use super::*;

    pipeline_is!(
        lone_aggregate_groups_on_null,
        input = "SELECT COUNT(*) FROM customers",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$group": {"_id": null, "COUNT(*)": {"$sum": 1}}},
            doc! {"$project": {"_id": 0, "COUNT(*)": 1}},
        ]
    );

    pipeline_is!(
        count_distinct_finalizes_with_size,
        input = "SELECT COUNT(DISTINCT country) AS c FROM customers",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$group": {"_id": null, "c": {"$addToSet": "$country"}}},
            doc! {"$project": {"_id": 0, "c": {"$size": "$c"}}},
        ]
    );

    pipeline_is!(
        stddev_rounds_to_six_places,
        input = "SELECT STDDEV_POP(creditLimit) AS s FROM customers",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$group": {"_id": null, "s": {"$stdDevPop": "$creditLimit"}}},
            doc! {"$project": {"_id": 0, "s": {"$round": ["$s", 6]}}},
        ]
    );

    pipeline_is!(
        multi_key_group_uses_id_document,
        input = "SELECT country, city, COUNT(*) AS n FROM customers GROUP BY country, city",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$group": {
                "_id": {"country": "$country", "city": "$city"},
                "n": {"$sum": 1},
                "country": {"$first": "$country"},
                "city": {"$first": "$city"},
            }},
            doc! {"$project": {"_id": 0, "country": 1, "city": 1, "n": 1}},
        ]
    );

    pipeline_is!(
        group_concat_reduces_pushed_array,
        input = "SELECT country, GROUP_CONCAT(customerName SEPARATOR '; ') AS names \
                 FROM customers GROUP BY country",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$group": {
                "_id": "$country",
                "names": {"$push": "$customerName"},
                "country": {"$first": "$country"},
            }},
            doc! {"$project": {"_id": 0, "country": 1, "names": {"$reduce": {
                "input": "$names",
                "initialValue": "",
                "in": {"$cond": [
                    {"$eq": ["$$value", ""]},
                    {"$toString": "$$this"},
                    {"$concat": ["$$value", "; ", {"$toString": "$$this"}]},
                ]},
            }}}},
        ]
    );

    pipeline_is!(
        distinct_groups_and_replaces_root,
        input = "SELECT DISTINCT country FROM customers ORDER BY country",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$group": {"_id": {"country": "$country"}}},
            doc! {"$replaceRoot": {"newRoot": "$_id"}},
            doc! {"$sort": {"country": 1}},
            doc! {"$project": {"_id": 0, "country": 1}},
        ]
    );

    #[test]
    fn distinct_sort_is_a_column_sort_so_collation_attaches() {
        let Invocation::Aggregate(agg) =
            translate_ok("SELECT DISTINCT country FROM customers ORDER BY country")
        else {
            panic!("expected aggregate");
        };
        assert_eq!(agg.collation, Some(collation()));
    }

    #[test]
    fn having_without_matching_projection_gets_hidden_accumulator() {
        let Invocation::Aggregate(agg) = translate_ok(
            "SELECT country FROM customers GROUP BY country HAVING SUM(creditLimit) > 10000",
        ) else {
            panic!("expected aggregate");
        };
        assert_eq!(
            agg.pipeline[0],
            doc! {"$group": {
                "_id": "$country",
                "country": {"$first": "$country"},
                "SUM(creditLimit)": {"$sum": "$creditLimit"},
            }}
        );
        assert_eq!(
            agg.pipeline[1],
            doc! {"$match": {"SUM(creditLimit)": {"$gt": 10000}}}
        );
        // the hidden accumulator stays out of the projection
        assert_eq!(
            agg.pipeline[2],
            doc! {"$project": {"_id": 0, "country": 1}}
        );
    }

    #[test]
    fn non_grouped_projection_is_rejected() {
        assert!(matches!(
            translate_err("SELECT country, city FROM customers GROUP BY country"),
            Error::GroupByMismatch(_)
        ));
    }

    #[test]
    fn distinct_with_group_by_is_rejected() {
        assert!(matches!(
            translate_err("SELECT DISTINCT country FROM customers GROUP BY country"),
            Error::DistinctGroupByConflict
        ));
    }
}

mod subqueries {
    use super::*;

    pipeline_is!(
        scalar_subquery_compares_against_unwound_value,
        input = "SELECT customerName FROM customers \
                 WHERE creditLimit > (SELECT AVG(creditLimit) FROM customers)",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$lookup": {
                "from": "customers",
                "pipeline": [
                    {"$group": {"_id": null, "AVG(creditLimit)": {"$avg": "$creditLimit"}}},
                    {"$project": {"_id": 0, "AVG(creditLimit)": 1}},
                    {"$limit": 1},
                ],
                "as": "__scalar_1",
            }},
            doc! {"$unwind": {"path": "$__scalar_1", "preserveNullAndEmptyArrays": true}},
            doc! {"$match": {"$expr": {"$gt": ["$creditLimit", "$__scalar_1.AVG(creditLimit)"]}}},
            doc! {"$project": {"_id": 0, "customerName": 1}},
        ]
    );

    pipeline_is!(
        correlated_exists_binds_let_variables,
        input = "SELECT customerName FROM customers c WHERE EXISTS \
                 (SELECT 1 FROM orders o WHERE o.customerNumber = c.customerNumber LIMIT 1)",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$lookup": {
                "from": "orders",
                "let": {"cn": "$customerNumber"},
                "pipeline": [
                    {"$match": {"$expr": {"$eq": ["$customerNumber", "$$cn"]}}},
                    {"$project": {"_id": 0, "1": {"$literal": 1}}},
                    // the explicit LIMIT 1 carries the stable-ordering shim
                    {"$sort": {"_id": 1}},
                    {"$limit": 1i64},
                ],
                "as": "__exists_1",
            }},
            doc! {"$match": {"$expr": {"$gt": [{"$size": "$__exists_1"}, 0]}}},
            doc! {"$project": {"_id": 0, "customerName": 1, "__exists_1": 0}},
        ]
    );

    #[test]
    fn not_exists_compares_size_to_zero() {
        let Invocation::Aggregate(agg) = translate_ok(
            "SELECT customerName FROM customers WHERE NOT EXISTS \
             (SELECT 1 FROM orders LIMIT 1)",
        ) else {
            panic!("expected aggregate");
        };
        assert_eq!(
            agg.pipeline[1],
            doc! {"$match": {"$expr": {"$eq": [{"$size": "$__exists_1"}, 0]}}}
        );
    }

    #[test]
    fn not_in_subquery_negates_membership() {
        let Invocation::Aggregate(agg) = translate_ok(
            "SELECT customerName FROM customers \
             WHERE customerNumber NOT IN (SELECT customerNumber FROM orders)",
        ) else {
            panic!("expected aggregate");
        };
        assert_eq!(
            agg.pipeline[1],
            doc! {"$match": {"$expr": {"$not": [
                {"$in": ["$customerNumber", "$__in_1.customerNumber"]}
            ]}}}
        );
    }

    pipeline_is!(
        derived_table_replaces_base_collection,
        input = "SELECT customerName FROM \
                 (SELECT customerName FROM customers WHERE creditLimit > 1000) big",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$match": {"creditLimit": {"$gt": 1000}}},
            doc! {"$project": {"_id": 0, "customerName": 1}},
            doc! {"$project": {"_id": 0, "customerName": 1}},
        ]
    );

    #[test]
    fn scalar_subquery_must_be_single_valued() {
        assert!(matches!(
            translate_err(
                "SELECT customerName FROM customers \
                 WHERE creditLimit > (SELECT creditLimit FROM customers)"
            ),
            Error::UnsupportedConstruct(_)
        ));
    }

    #[test]
    fn in_subquery_must_project_one_column() {
        assert!(matches!(
            translate_err(
                "SELECT customerName FROM customers \
                 WHERE customerNumber IN (SELECT customerNumber, orderDate FROM orders)"
            ),
            Error::UnsupportedConstruct(_)
        ));
    }

    #[test]
    fn correlation_cannot_escape_two_levels() {
        assert!(matches!(
            translate_err(
                "SELECT customerName FROM customers c WHERE EXISTS \
                 (SELECT 1 FROM orders o WHERE EXISTS \
                  (SELECT 1 FROM orderdetails d WHERE d.customerNumber = c.customerNumber \
                   LIMIT 1) LIMIT 1)"
            ),
            Error::CorrelationEscapes(_)
        ));
    }
}

mod joins {
    use super::*;

    #[test]
    fn inner_join_drops_unmatched() {
        let Invocation::Aggregate(agg) = translate_ok(
            "SELECT c.customerName FROM customers c \
             INNER JOIN orders o ON c.customerNumber = o.customerNumber",
        ) else {
            panic!("expected aggregate");
        };
        assert_eq!(
            agg.pipeline[1],
            doc! {"$unwind": {"path": "$o", "preserveNullAndEmptyArrays": false}}
        );
    }

    #[test]
    fn cross_join_has_empty_sub_pipeline() {
        let Invocation::Aggregate(agg) =
            translate_ok("SELECT c.customerName FROM customers c CROSS JOIN offices f")
        else {
            panic!("expected aggregate");
        };
        assert_eq!(
            agg.pipeline[0],
            doc! {"$lookup": {"from": "offices", "pipeline": [], "as": "f"}}
        );
        assert_eq!(
            agg.pipeline[1],
            doc! {"$unwind": {"path": "$f", "preserveNullAndEmptyArrays": false}}
        );
    }

    #[test]
    fn right_join_swaps_sides() {
        let Invocation::Aggregate(agg) = translate_ok(
            "SELECT o.orderDate FROM customers c \
             RIGHT JOIN orders o ON c.customerNumber = o.customerNumber",
        ) else {
            panic!("expected aggregate");
        };
        assert_eq!(agg.collection.as_deref(), Some("orders"));
        // the original base becomes the preserved joined side
        assert_eq!(
            agg.pipeline[1],
            doc! {"$unwind": {"path": "$c", "preserveNullAndEmptyArrays": true}}
        );
    }

    #[test]
    fn qualified_star_projects_embedded_document() {
        let Invocation::Aggregate(agg) = translate_ok(
            "SELECT o.* FROM customers c \
             LEFT JOIN orders o ON c.customerNumber = o.customerNumber",
        ) else {
            panic!("expected aggregate");
        };
        assert_eq!(
            agg.pipeline.last().unwrap(),
            &doc! {"$project": {"_id": 0, "o": 1}}
        );
    }

    #[test]
    fn duplicate_binding_is_ambiguous() {
        assert!(matches!(
            translate_err("SELECT a.x FROM a JOIN a ON a.x = a.x"),
            Error::AmbiguousIdentifier { .. }
        ));
    }

    #[test]
    fn unknown_qualifier_is_unresolved() {
        assert!(matches!(
            translate_err("SELECT x.col FROM customers"),
            Error::UnresolvedIdentifier(_)
        ));
    }
}

mod windows {
    use super::*;

    pipeline_is!(
        row_number_sets_window_fields,
        input = "SELECT customerName, \
                 ROW_NUMBER() OVER (PARTITION BY country ORDER BY customerName) AS rn \
                 FROM customers",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$setWindowFields": {
                "partitionBy": "$country",
                "sortBy": {"customerName": 1},
                "output": {"rn": {"$documentNumber": {}}},
            }},
            doc! {"$project": {"_id": 0, "customerName": 1, "rn": 1}},
        ]
    );

    #[test]
    fn lag_lowers_to_negative_shift() {
        let Invocation::Aggregate(agg) = translate_ok(
            "SELECT LAG(creditLimit, 2) OVER (ORDER BY customerNumber) AS prev FROM customers",
        ) else {
            panic!("expected aggregate");
        };
        assert_eq!(
            agg.pipeline[0],
            doc! {"$setWindowFields": {
                "sortBy": {"customerNumber": 1},
                "output": {"prev": {"$shift": {
                    "output": "$creditLimit",
                    "by": -2,
                    "default": null,
                }}},
            }}
        );
    }

    #[test]
    fn ntile_combines_row_number_and_count() {
        let Invocation::Aggregate(agg) = translate_ok(
            "SELECT NTILE(4) OVER (ORDER BY creditLimit) AS quartile FROM customers",
        ) else {
            panic!("expected aggregate");
        };
        assert_eq!(
            agg.pipeline[0],
            doc! {"$setWindowFields": {
                "sortBy": {"creditLimit": 1},
                "output": {
                    "quartile__rn": {"$documentNumber": {}},
                    "quartile__ct": {"$count": {}, "window": {"documents": ["unbounded", "unbounded"]}},
                },
            }}
        );
        assert_eq!(
            agg.pipeline[1],
            doc! {"$project": {"_id": 0, "quartile": {"$add": [
                {"$floor": {"$divide": [
                    {"$multiply": [{"$subtract": ["$quartile__rn", 1]}, 4]},
                    "$quartile__ct",
                ]}},
                1,
            ]}}}
        );
    }
}

mod ctes {
    use super::*;

    pipeline_is!(
        cte_inlines_before_body_stages,
        input = "WITH big AS (SELECT customerName, creditLimit FROM customers \
                 WHERE creditLimit > 50000) SELECT customerName FROM big",
        collection = Some("customers"),
        pipeline = vec![
            doc! {"$match": {"creditLimit": {"$gt": 50000}}},
            doc! {"$project": {"_id": 0, "customerName": 1, "creditLimit": 1}},
            doc! {"$project": {"_id": 0, "customerName": 1}},
        ]
    );

    pipeline_is!(
        recursive_cte_lowers_to_graph_lookup,
        input = "WITH RECURSIVE tree AS (SELECT id FROM categories \
                 JOIN tree ON categories.parent = tree.id) SELECT * FROM tree",
        collection = Some("categories"),
        pipeline = vec![doc! {"$graphLookup": {
            "from": "categories",
            "startWith": "$parent",
            "connectFromField": "parent",
            "connectToField": "id",
            "as": "tree",
        }}]
    );

    #[test]
    fn cte_column_list_renames_outputs() {
        let Invocation::Aggregate(agg) = translate_ok(
            "WITH c (name) AS (SELECT customerName FROM customers) SELECT name FROM c",
        ) else {
            panic!("expected aggregate");
        };
        assert_eq!(
            agg.pipeline[1],
            doc! {"$project": {"_id": 0, "name": "$customerName"}}
        );
    }

    #[test]
    fn unsupported_recursion_is_rejected() {
        assert!(matches!(
            translate_err(
                "WITH RECURSIVE r AS (SELECT id FROM t) SELECT * FROM r"
            ),
            Error::UnsupportedCte(_)
        ));
    }
}

mod no_table {
    use super::*;

    pipeline_is!(
        arithmetic_runs_on_synthetic_document,
        input = "SELECT 1 + 1 AS s",
        collection = None,
        pipeline = vec![
            doc! {"$documents": [{}]},
            doc! {"$project": {"_id": 0, "s": {"$add": [1, 1]}}},
        ]
    );

    pipeline_is!(
        now_is_evaluated_by_the_server,
        input = "SELECT NOW() AS ts",
        collection = None,
        pipeline = vec![
            doc! {"$documents": [{}]},
            doc! {"$project": {"_id": 0, "ts": {
                "$dateToString": {"date": "$$NOW", "format": "%Y-%m-%d %H:%M:%S"}
            }}},
        ]
    );
}

mod writes {
    use super::*;

    translates_to!(
        insert_single_row,
        input = "INSERT INTO customers (customerName, creditLimit) VALUES ('Acme', 1000)",
        expected = Invocation::InsertOne(InsertOneInvocation {
            database: "test".into(),
            collection: "customers".into(),
            document: doc! {"customerName": "Acme", "creditLimit": 1000},
        })
    );

    translates_to!(
        insert_multiple_rows,
        input = "INSERT INTO customers (customerName) VALUES ('Acme'), ('Globex')",
        expected = Invocation::InsertMany(InsertManyInvocation {
            database: "test".into(),
            collection: "customers".into(),
            documents: vec![
                doc! {"customerName": "Acme"},
                doc! {"customerName": "Globex"},
            ],
        })
    );

    translates_to!(
        update_with_column_reference_uses_pipeline,
        input = "UPDATE customers SET creditLimit = creditLimit * 2 WHERE country = 'France'",
        expected = Invocation::UpdateMany(UpdateManyInvocation {
            database: "test".into(),
            collection: "customers".into(),
            filter: doc! {"country": "France"},
            update: UpdateSpec::Pipeline(vec![doc! {"$set": {
                "creditLimit": {"$multiply": ["$creditLimit", 2]}
            }}]),
        })
    );

    translates_to!(
        delete_without_where_matches_all,
        input = "DELETE FROM customers",
        expected = Invocation::DeleteMany(DeleteManyInvocation {
            database: "test".into(),
            collection: "customers".into(),
            filter: doc! {},
        })
    );

    #[test]
    fn insert_rejects_computed_values() {
        assert!(matches!(
            translate_err("INSERT INTO t (a) VALUES (NOW())"),
            Error::UnsupportedConstruct(_)
        ));
    }

    #[test]
    fn mismatched_row_width_is_rejected() {
        assert!(matches!(
            translate_err("INSERT INTO t (a, b) VALUES (1)"),
            Error::UnsupportedConstruct(_)
        ));
    }
}

mod failures {
    use super::*;
    use crate::catalog;

    #[test]
    fn unknown_function() {
        assert_eq!(
            translate_err("SELECT NO_SUCH_FUNCTION(1) FROM t"),
            Error::Catalog(catalog::Error::UnknownFunction("NO_SUCH_FUNCTION".into()))
        );
    }

    #[test]
    fn arity_mismatch() {
        assert!(matches!(
            translate_err("SELECT SUBSTRING(customerName) FROM customers"),
            Error::Catalog(catalog::Error::ArityMismatch { .. })
        ));
    }

    #[test]
    fn window_function_without_over() {
        assert!(matches!(
            translate_err("SELECT ROW_NUMBER() FROM customers"),
            Error::Catalog(catalog::Error::UnsupportedArgument(..))
        ));
    }

    #[test]
    fn client_side_crypto_is_unsupported() {
        assert_eq!(
            translate_err("SELECT MD5(customerName) FROM customers"),
            Error::Catalog(catalog::Error::Unsupported("MD5".into()))
        );
    }

    #[test]
    fn aggregate_in_where_is_rejected() {
        assert!(matches!(
            translate_err("SELECT customerName FROM customers WHERE SUM(creditLimit) > 5"),
            Error::UnsupportedConstruct(_)
        ));
    }

    #[test]
    fn batch_reports_statement_index() {
        let err = crate::translate_many(
            "SELECT 1; SELECT NO_SUCH_FUNCTION(1) FROM t; SELECT 2",
            "test",
            &TranslateOptions::default(),
        )
        .unwrap_err();
        match err {
            result::Error::Statement { index, .. } => assert_eq!(index, 1),
            other => panic!("expected a statement error, got {other:?}"),
        }
    }

    #[test]
    fn batch_translates_every_statement() {
        let invocations = crate::translate_many(
            "SELECT customerName FROM customers; DELETE FROM orders",
            "test",
            &TranslateOptions::default(),
        )
        .unwrap();
        assert_eq!(invocations.len(), 2);
        assert!(matches!(invocations[0], Invocation::Find(_)));
        assert!(matches!(invocations[1], Invocation::DeleteMany(_)));
    }
}
