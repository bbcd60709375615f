#[cfg(test)]
mod tests {
    use crate::aggregate::{FrameBound, Order};
    use crate::context::QueryContext;
    use crate::expr::Expr;
    use crate::expr_builder::ExprBuilder;
    use crate::flavor::Flavor;
    use crate::schema::Table;
    use crate::value::SqlValue;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn eb(flavor: Flavor) -> ExprBuilder {
        QueryContext::new(flavor).expr()
    }

    fn sql(e: Expr) -> String {
        e.to_sql().0
    }

    #[test]
    fn count_forms() {
        let b = eb(Flavor::MySQL);
        assert_eq!(sql(b.count(|_| {})), "COUNT(*)");
        assert_eq!(sql(b.count_all()), "COUNT(*)");
        assert_eq!(
            sql(b.count(|a| {
                a.column("user_id").distinct();
            })),
            "COUNT(DISTINCT user_id)"
        );
    }

    #[test]
    fn filter_is_native_on_postgres_and_sqlite() {
        let b = eb(Flavor::PostgreSQL);
        let (got, values) = b
            .sum(|a| {
                a.column("amount").filter(|c| {
                    c.equals("status", "paid");
                });
            })
            .to_sql();
        assert_eq!(got, "SUM(amount) FILTER (WHERE status = $1)");
        assert_eq!(values, vec![SqlValue::from("paid")]);

        let b = eb(Flavor::SQLite);
        assert_eq!(
            sql(b.count(|a| {
                a.filter(|c| {
                    c.greater_than("views", 10_i64);
                });
            })),
            "COUNT(*) FILTER (WHERE views > ?)"
        );
    }

    #[test]
    fn filter_folds_into_case_elsewhere() {
        let b = eb(Flavor::MySQL);
        assert_eq!(
            sql(b.sum(|a| {
                a.column("amount").filter(|c| {
                    c.equals("status", "paid");
                });
            })),
            "SUM(CASE WHEN status = ? THEN amount END)"
        );
        assert_eq!(
            sql(b.count(|a| {
                a.filter(|c| {
                    c.is_true("active");
                });
            })),
            "COUNT(CASE WHEN active = 1 THEN 1 END)"
        );
    }

    #[test]
    fn string_agg_per_dialect() {
        let agg = |flavor: Flavor| {
            let b = eb(flavor);
            sql(b.string_agg(", ", |a| {
                a.column("name").order_by("name", Order::Asc);
            }))
        };
        assert_eq!(agg(Flavor::PostgreSQL), "STRING_AGG(name, ', ' ORDER BY name ASC)");
        assert_eq!(agg(Flavor::MySQL), "GROUP_CONCAT(name ORDER BY name ASC SEPARATOR ', ')");
        assert_eq!(agg(Flavor::SQLite), "GROUP_CONCAT(name, ', ' ORDER BY name ASC)");
        assert_eq!(
            agg(Flavor::SQLServer),
            "STRING_AGG(name, ', ') WITHIN GROUP (ORDER BY name ASC)"
        );
        assert_eq!(
            agg(Flavor::Oracle),
            "LISTAGG(name, ', ') WITHIN GROUP (ORDER BY name ASC)"
        );
    }

    #[test]
    fn sqlite_distinct_string_agg_replaces_comma() {
        let b = eb(Flavor::SQLite);
        assert_eq!(
            sql(b.string_agg("|", |a| {
                a.column("tag").distinct();
            })),
            "REPLACE(GROUP_CONCAT(DISTINCT tag), ',', '|')"
        );
    }

    #[test]
    fn array_and_statistics() {
        let b = eb(Flavor::MySQL);
        assert_eq!(
            sql(b.array_agg(|a| {
                a.column("id");
            })),
            "JSON_ARRAYAGG(id)"
        );
        assert_eq!(
            sql(b.stddev(|a| {
                a.column("x");
            })),
            "STDDEV_SAMP(x)"
        );

        let b = eb(Flavor::SQLite);
        assert_eq!(
            sql(b.variance(|a| {
                a.column("x");
            })),
            "((SUM(x * x) - SUM(x) * SUM(x) * 1.0 / COUNT(x)) / (COUNT(x) - 1))"
        );
    }

    #[test]
    fn bitwise_and_boolean_aggregates() {
        let b = eb(Flavor::SQLite);
        assert_eq!(
            sql(b.bit_or(|a| {
                a.column("flags");
            })),
            "NULL /* BIT_OR unsupported */"
        );
        let b = eb(Flavor::PostgreSQL);
        assert_eq!(
            sql(b.bool_and(|a| {
                a.column("ok");
            })),
            "BOOL_AND(ok)"
        );
        let b = eb(Flavor::MySQL);
        assert_eq!(
            sql(b.bool_or(|a| {
                a.column("ok");
            })),
            "MAX(ok)"
        );
    }

    #[test]
    fn window_clause() {
        let posts = Arc::new(Table::new("posts").alias("p"));
        let b = QueryContext::new(Flavor::PostgreSQL).with_table(posts).expr();
        let e = b.row_number(|w| {
            w.partition_by("user_id").order_by("created_at", Order::Desc);
        });
        assert_eq!(
            sql(e),
            "ROW_NUMBER() OVER (PARTITION BY p.user_id ORDER BY p.created_at DESC)"
        );

        let running = b.over(
            b.sum(|a| {
                a.column("amount");
            }),
            |w| {
                w.order_by("id", Order::Asc)
                    .rows(FrameBound::UnboundedPreceding, FrameBound::CurrentRow);
            },
        );
        assert_eq!(
            sql(running),
            "SUM(p.amount) OVER (ORDER BY p.id ASC ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)"
        );
    }

    #[test]
    fn offset_functions() {
        let b = eb(Flavor::MySQL);
        let e = b.lag(b.column("v"), 1, Some(0_i64.into()), |w| {
            w.order_by("t", Order::Asc);
        });
        let (got, values) = e.to_sql();
        assert_eq!(got, "LAG(v, 1, ?) OVER (ORDER BY t ASC)");
        assert_eq!(values, vec![SqlValue::I64(0)]);

        let e = b.ntile(4, |w| {
            w.range(FrameBound::Preceding(2), FrameBound::Following(2));
        });
        assert_eq!(sql(e), "NTILE(4) OVER (RANGE BETWEEN 2 PRECEDING AND 2 FOLLOWING)");
        assert_eq!(sql(b.rank(|_| {})), "RANK() OVER ()");
    }
}
