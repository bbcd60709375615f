#[cfg(test)]
mod tests {
    use crate::condition::{ConditionBuilder, ConditionFn};
    use crate::context::QueryContext;
    use crate::flavor::Flavor;
    use crate::schema::Table;
    use crate::value::SqlValue;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn cb(flavor: Flavor) -> ConditionBuilder {
        QueryContext::new(flavor).condition()
    }

    fn render(c: &ConditionBuilder) -> (String, Vec<SqlValue>) {
        c.build().map(|e| e.to_sql()).unwrap_or_default()
    }

    #[test]
    fn and_or_chain_left_to_right() {
        let mut c = cb(Flavor::MySQL);
        c.equals("x", 1_i64).or_equals("x", 2_i64);
        let (got, values) = render(&c);
        assert_eq!(got, "x = ? OR x = ?");
        assert_eq!(values, vec![SqlValue::I64(1), SqlValue::I64(2)]);

        let mut c = cb(Flavor::MySQL);
        c.equals("a", 1_i64)
            .or_equals("b", 2_i64)
            .equals("c", 3_i64);
        assert_eq!(render(&c).0, "a = ? OR b = ? AND c = ?");
    }

    #[test]
    fn groups_are_parenthesized() {
        let mut c = cb(Flavor::PostgreSQL);
        c.equals("status", "published").group(|g| {
            g.greater_than("views", 100_i64).or_equals("featured", true);
        });
        assert_eq!(
            render(&c).0,
            "status = $1 AND (views > $2 OR featured = $3)"
        );

        let mut c = cb(Flavor::PostgreSQL);
        c.equals("a", 1_i64).or_group(|g| {
            g.equals("b", 2_i64).equals("c", 3_i64);
        });
        assert_eq!(render(&c).0, "a = $1 OR (b = $2 AND c = $3)");
    }

    #[test]
    fn empty_group_is_dropped() {
        let mut c = cb(Flavor::MySQL);
        c.equals("a", 1_i64).group(|_| {}).or_group(|_| {});
        assert_eq!(c.len(), 1);
        assert_eq!(render(&c).0, "a = ?");
    }

    #[test]
    fn empty_builder_has_no_expression() {
        let c = cb(Flavor::MySQL);
        assert!(c.is_empty());
        assert!(c.build().is_none());
        assert_eq!(c.where_clause().to_sql().0, "");
    }

    #[test]
    fn where_clause_prefixes_keyword() {
        let mut c = cb(Flavor::SQLite);
        c.is_null("deleted_at");
        assert_eq!(c.where_clause().to_sql().0, "WHERE deleted_at IS NULL");
    }

    #[test]
    fn null_values_switch_to_is_null() {
        let mut c = cb(Flavor::MySQL);
        c.equals("a", None::<i64>).not_equals("b", None::<i64>);
        let (got, values) = render(&c);
        assert_eq!(got, "a IS NULL AND b IS NOT NULL");
        assert!(values.is_empty());
    }

    #[test]
    fn between_and_ranges() {
        let mut c = cb(Flavor::PostgreSQL);
        c.between("view_count", 10_i64, 100_i64)
            .or_not_between("score", 1_i64, 5_i64);
        assert_eq!(
            render(&c).0,
            "view_count BETWEEN $1 AND $2 OR score NOT BETWEEN $3 AND $4"
        );
    }

    #[test]
    fn membership() {
        let mut c = cb(Flavor::PostgreSQL);
        c.in_("status", ["draft", "review"]).not_in("user_id", [7_i64]);
        let (got, values) = render(&c);
        assert_eq!(got, "status IN ($1, $2) AND user_id NOT IN ($3)");
        assert_eq!(values.len(), 3);

        let mut c = cb(Flavor::MySQL);
        c.in_("x", Vec::<i64>::new()).or_not_in("y", Vec::<i64>::new());
        assert_eq!(render(&c).0, "0 = 1 OR 0 = 0");
    }

    #[test]
    fn subquery_membership() {
        let mut c = cb(Flavor::PostgreSQL);
        let active = c
            .expr_builder()
            .build("SELECT id FROM users WHERE active = $0", [true]);
        c.equals("kind", "post").in_subquery("user_id", active);
        assert_eq!(
            render(&c).0,
            "kind = $1 AND user_id IN (SELECT id FROM users WHERE active = $2)"
        );
    }

    #[test]
    fn like_patterns_escape_wildcards() {
        let mut c = cb(Flavor::MySQL);
        c.contains("title", "50%_off");
        let (got, values) = render(&c);
        assert_eq!(got, "title LIKE ? ESCAPE '!'");
        assert_eq!(values, vec![SqlValue::from("%50!%!_off%")]);

        let mut c = cb(Flavor::SQLServer);
        c.starts_with("code", "[a]!");
        assert_eq!(render(&c).1, vec![SqlValue::from("![a]!!%")]);

        let mut c = cb(Flavor::SQLite);
        c.ends_with("path", ".rs");
        assert_eq!(render(&c).1, vec![SqlValue::from("%.rs")]);
    }

    #[test]
    fn ignore_case_patterns() {
        let mut c = cb(Flavor::PostgreSQL);
        c.contains_ignore_case("title", "Rust");
        assert_eq!(render(&c).0, "title ILIKE $1 ESCAPE '!'");

        let mut c = cb(Flavor::MySQL);
        c.starts_with_ignore_case("title", "Rust");
        assert_eq!(render(&c).0, "LOWER(title) LIKE LOWER(?) ESCAPE '!'");
    }

    #[test]
    fn any_of_patterns() {
        let mut c = cb(Flavor::SQLite);
        c.contains_any("tags", ["a", "b"]);
        assert_eq!(
            render(&c).0,
            "(tags LIKE ? ESCAPE '!' OR tags LIKE ? ESCAPE '!')"
        );

        let mut c = cb(Flavor::SQLite);
        c.equals("x", 1_i64).ends_with_any("name", Vec::<String>::new());
        assert_eq!(render(&c).0, "x = ? AND 0 = 1");
    }

    #[test]
    fn boolean_tests_per_dialect() {
        let cases = [
            (Flavor::PostgreSQL, "flag IS TRUE", "flag IS FALSE"),
            (Flavor::MySQL, "flag = 1", "flag = 0"),
            (Flavor::SQLite, "flag = 1", "flag = 0"),
            (Flavor::SQLServer, "flag = 1", "flag = 0"),
            (Flavor::Oracle, "flag = 1", "flag = 0"),
            (Flavor::ClickHouse, "flag = TRUE", "flag = FALSE"),
        ];
        for (flavor, yes, no) in cases {
            let mut c = cb(flavor);
            c.is_true("flag");
            assert_eq!(render(&c).0, yes, "{flavor:?}");
            let mut c = cb(flavor);
            c.is_false("flag");
            assert_eq!(render(&c).0, no, "{flavor:?}");
        }
    }

    #[test]
    fn distinct_from_per_dialect() {
        let cases = [
            (Flavor::PostgreSQL, "a IS DISTINCT FROM $1"),
            (Flavor::MySQL, "NOT (a <=> ?)"),
            (Flavor::SQLite, "a IS NOT ?"),
            (Flavor::Oracle, "DECODE(a, :1, 0, 1) = 1"),
            (Flavor::SQLServer, "a IS DISTINCT FROM @p1"),
        ];
        for (flavor, expected) in cases {
            let mut c = cb(flavor);
            c.is_distinct_from("a", 1_i64);
            assert_eq!(render(&c).0, expected, "{flavor:?}");
        }

        let mut c = cb(Flavor::MySQL);
        c.is_not_distinct_from("a", 1_i64);
        assert_eq!(render(&c).0, "a <=> ?");
    }

    #[test]
    fn column_comparisons_use_table_alias() {
        let posts = Arc::new(Table::new("posts").alias("p"));
        let mut c = QueryContext::new(Flavor::MySQL).with_table(posts).condition();
        c.greater_than_column("updated_at", "created_at")
            .or_equals_column("user_id", "u.id");
        assert_eq!(
            render(&c).0,
            "p.updated_at > p.created_at OR p.user_id = u.id"
        );
    }

    #[test]
    fn expression_leaf() {
        let mut c = cb(Flavor::PostgreSQL);
        c.expr(|eb| eb.greater_than(eb.length(eb.column("title")), 10_i64));
        assert_eq!(render(&c).0, "CHAR_LENGTH(title) > $1");
    }

    #[test]
    fn apply_and_apply_if() {
        let published: ConditionFn = Box::new(|c| {
            c.equals("status", "published");
        });
        let popular: ConditionFn = Box::new(|c| {
            c.greater_than("views", 100_i64);
        });

        let mut c = cb(Flavor::MySQL);
        c.apply([&published, &popular]);
        assert_eq!(render(&c).0, "status = ? AND views > ?");

        let mut c = cb(Flavor::MySQL);
        c.apply_if(false, [&published]).apply_if(true, [&popular]);
        assert_eq!(render(&c).0, "views > ?");
    }

    #[test]
    fn exists_leaf() {
        let mut c = cb(Flavor::SQLite);
        let sub = c
            .expr_builder()
            .build("SELECT 1 FROM comments WHERE post_id = posts.id", Vec::<i64>::new());
        c.not_exists(sub);
        assert_eq!(
            render(&c).0,
            "NOT EXISTS (SELECT 1 FROM comments WHERE post_id = posts.id)"
        );
    }
}
