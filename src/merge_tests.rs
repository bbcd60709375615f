#[cfg(test)]
mod tests {
    use crate::context::QueryContext;
    use crate::error::Error;
    use crate::expr::Expr;
    use crate::flavor::Flavor;
    use crate::merge::MergeBuilder;
    use crate::schema::{Field, Table, ValueKind};
    use crate::value::SqlValue;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn posts() -> Arc<Table> {
        Arc::new(
            Table::new("posts")
                .alias("p")
                .field(Field::new("id", ValueKind::Int).primary_key())
                .field(Field::new("title", ValueKind::String))
                .field(Field::new("body", ValueKind::String))
                .field(Field::new("views", ValueKind::Int).column("view_count")),
        )
    }

    fn upsert(flavor: Flavor) -> MergeBuilder {
        let ctx = QueryContext::new(flavor).with_table(posts());
        let mut m = ctx.merge().unwrap();
        m.using_table("staged_posts", "s")
            .on(|c| {
                c.equals_column("id", "s.id");
            })
            .when_matched(|w| {
                w.and(|c| {
                    c.greater_than_column("s.version", "version");
                })
                .then_update(|u| {
                    u.set_columns(["title", "body"]).set("view_count", 0_i64);
                });
            })
            .when_not_matched(|w| {
                w.then_insert(|i| {
                    i.values(["id", "title"]);
                });
            });
        m
    }

    #[test]
    fn postgres_merge() {
        let mut m = upsert(Flavor::PostgreSQL);
        m.when_not_matched_by_source(|w| {
            w.then_delete();
        });
        let (sql, values) = m.build().unwrap().to_sql();
        assert_eq!(
            sql,
            "MERGE INTO posts AS p USING staged_posts AS s ON p.id = s.id \
             WHEN MATCHED AND (s.version > p.version) THEN UPDATE SET title = s.title, body = s.body, view_count = $1 \
             WHEN NOT MATCHED THEN INSERT (id, title) VALUES (s.id, s.title) \
             WHEN NOT MATCHED BY SOURCE THEN DELETE"
        );
        assert_eq!(values, vec![SqlValue::I64(0)]);
    }

    #[test]
    fn sqlserver_merge_ends_with_semicolon() {
        let (sql, _) = upsert(Flavor::SQLServer).build().unwrap().to_sql();
        assert_eq!(
            sql,
            "MERGE INTO posts AS p USING staged_posts AS s ON p.id = s.id \
             WHEN MATCHED AND (s.version > p.version) THEN UPDATE SET title = s.title, body = s.body, view_count = @p1 \
             WHEN NOT MATCHED THEN INSERT (id, title) VALUES (s.id, s.title);"
        );
    }

    #[test]
    fn oracle_merge_moves_guard_after_action() {
        let (sql, values) = upsert(Flavor::Oracle).build().unwrap().to_sql();
        assert_eq!(
            sql,
            "MERGE INTO posts p USING staged_posts s ON (p.id = s.id) \
             WHEN MATCHED THEN UPDATE SET title = s.title, body = s.body, view_count = :1 \
             WHERE (s.version > p.version) \
             WHEN NOT MATCHED THEN INSERT (id, title) VALUES (s.id, s.title)"
        );
        assert_eq!(values, vec![SqlValue::I64(0)]);
    }

    #[test]
    fn oracle_rejects_delete_branches() {
        let ctx = QueryContext::new(Flavor::Oracle).with_table(posts());
        let mut m = ctx.merge().unwrap();
        m.using_table("staged_posts", "s")
            .on(|c| {
                c.equals_column("id", "s.id");
            })
            .when_matched(|w| {
                w.then_delete();
            });
        assert_eq!(
            m.build().err(),
            Some(Error::MergeActionUnsupported {
                branch: "matched",
                action: "delete",
                flavor: Flavor::Oracle,
            })
        );
    }

    #[test]
    fn subquery_source_and_set_all() {
        let ctx = QueryContext::new(Flavor::PostgreSQL).with_table(posts());
        let source = Expr::build("SELECT * FROM imports WHERE batch = $0", [7_i64]);
        let mut m = ctx.merge().unwrap();
        m.using(Expr::subquery(source), "src")
            .on(|c| {
                c.equals_column("id", "src.id");
            })
            .when_matched(|w| {
                w.then_update(|u| {
                    u.set_all(["id"]);
                });
            })
            .when_not_matched(|w| {
                w.then_insert(|i| {
                    i.values_all(["views"]).value("view_count", 1_i64);
                });
            });
        let (sql, values) = m.build().unwrap().to_sql();
        assert_eq!(
            sql,
            "MERGE INTO posts AS p USING (SELECT * FROM imports WHERE batch = $1) AS src ON p.id = src.id \
             WHEN MATCHED THEN UPDATE SET title = src.title, body = src.body, view_count = src.view_count \
             WHEN NOT MATCHED THEN INSERT (id, title, body, view_count) VALUES (src.id, src.title, src.body, $2)"
        );
        assert_eq!(values, vec![SqlValue::I64(7), SqlValue::I64(1)]);
    }

    #[test]
    fn do_nothing_is_postgres_only() {
        let build = |flavor: Flavor| {
            let ctx = QueryContext::new(flavor).with_table(posts());
            let mut m = ctx.merge().unwrap();
            m.using_table("staged_posts", "s")
                .on(|c| {
                    c.equals_column("id", "s.id");
                })
                .when_matched(|w| {
                    w.then_do_nothing();
                })
                .when_not_matched(|w| {
                    w.then_insert(|i| {
                        i.values(["id"]);
                    });
                });
            m.build().unwrap().to_sql().0
        };
        assert!(build(Flavor::PostgreSQL).contains("WHEN MATCHED THEN DO NOTHING"));
        assert!(!build(Flavor::SQLServer).contains("WHEN MATCHED"));
    }

    #[test]
    fn unsupported_dialects() {
        for flavor in [Flavor::MySQL, Flavor::SQLite, Flavor::ClickHouse] {
            assert_eq!(
                upsert(flavor).build().err(),
                Some(Error::MergeUnsupported { flavor }),
                "{flavor:?}"
            );
        }
    }

    #[test]
    fn branch_errors_surface_on_build() {
        let ctx = QueryContext::new(Flavor::PostgreSQL).with_table(posts());

        let mut m = ctx.merge().unwrap();
        m.using_table("s", "s").on(|c| {
            c.equals_column("id", "s.id");
        });
        m.when_matched(|w| {
            w.then_delete().then_do_nothing();
        });
        assert_eq!(
            m.build().err(),
            Some(Error::DuplicateMergeAction { branch: "matched" })
        );

        let mut m = ctx.merge().unwrap();
        m.using_table("s", "s").when_matched(|w| {
            w.then_update(|_| {});
        });
        assert_eq!(
            m.build().err(),
            Some(Error::EmptyMergeBranch { branch: "matched" })
        );

        let mut m = ctx.merge().unwrap();
        m.using_table("s", "s").when_matched(|w| {
            w.and(|c| {
                c.is_null("deleted_at");
            });
        });
        assert_eq!(
            m.build().err(),
            Some(Error::EmptyMergeBranch { branch: "matched" })
        );

        let mut m = ctx.merge().unwrap();
        m.using_table("s", "s").when_not_matched(|w| {
            w.then_update(|u| {
                u.set("title", "x");
            });
        });
        assert_eq!(
            m.build().err(),
            Some(Error::MergeActionUnsupported {
                branch: "not matched",
                action: "update",
                flavor: Flavor::PostgreSQL,
            })
        );
    }

    #[test]
    fn incomplete_statements() {
        let ctx = QueryContext::new(Flavor::PostgreSQL).with_table(posts());

        let mut m = ctx.merge().unwrap();
        m.when_matched(|w| {
            w.then_delete();
        });
        assert_eq!(m.build().err(), Some(Error::IncompleteMerge { part: "USING" }));

        let mut m = ctx.merge().unwrap();
        m.using_table("s", "s").when_matched(|w| {
            w.then_delete();
        });
        assert_eq!(m.build().err(), Some(Error::IncompleteMerge { part: "ON" }));

        let mut m = ctx.merge().unwrap();
        m.using_table("s", "s").on(|c| {
            c.equals_column("id", "s.id");
        });
        assert_eq!(m.build().err(), Some(Error::IncompleteMerge { part: "WHEN" }));

        assert_eq!(
            QueryContext::new(Flavor::PostgreSQL).merge().err(),
            Some(Error::MissingTable { operation: "merge" })
        );
    }

    #[test]
    fn repeated_assignment_overwrites() {
        let ctx = QueryContext::new(Flavor::PostgreSQL).with_table(posts());
        let mut m = ctx.merge().unwrap();
        m.using_table("s", "s")
            .on(|c| {
                c.equals_column("id", "s.id");
            })
            .when_matched(|w| {
                w.then_update(|u| {
                    u.set("title", "a").set("body", "b").set("title", "c");
                    assert_eq!(u.columns(), vec!["title", "body"]);
                });
            });
        let (_, values) = m.build().unwrap().to_sql();
        assert_eq!(values, vec![SqlValue::from("c"), SqlValue::from("b")]);
    }
}
