#[cfg(test)]
mod tests {
    use crate::args::Args;
    use crate::expr::Expr;
    use crate::flavor::Flavor;
    use crate::modifiers::{Arg, list, raw, tuple};
    use crate::value::SqlValue;
    use pretty_assertions::assert_eq;

    fn compile(flavor: Flavor, format: &str, args: Vec<Arg>) -> (String, Vec<Arg>) {
        let mut a = Args::with_flavor(flavor);
        for arg in args {
            a.add(arg);
        }
        a.compile(format, &[])
    }

    #[test]
    fn args_compile_cases() {
        let cases: Vec<(&str, Vec<Arg>, &str, Vec<Arg>)> = vec![
            (
                "abc $? def",
                vec![123_i64.into()],
                "abc ? def",
                vec![123_i64.into()],
            ),
            (
                "abc $0 def",
                vec![456_i64.into()],
                "abc ? def",
                vec![456_i64.into()],
            ),
            (
                "abc $1 def $0",
                vec![1_i64.into(), 2_i64.into()],
                "abc ? def ?",
                vec![2_i64.into(), 1_i64.into()],
            ),
            (
                "$0 $? $?",
                vec!["a".into(), "b".into(), "c".into()],
                "? ? ?",
                vec!["a".into(), "b".into(), "c".into()],
            ),
            ("cost $$5", vec![], "cost $5", vec![]),
            ("trailing $", vec![], "trailing $", vec![]),
            (
                "$0 IN ($1)",
                vec![raw("p.id"), list(vec![1_i64, 2, 3])],
                "p.id IN (?, ?, ?)",
                vec![1_i64.into(), 2_i64.into(), 3_i64.into()],
            ),
            (
                "$0 = $1",
                vec![raw("(a, b)"), tuple(["x", "y"])],
                "(a, b) = (?, ?)",
                vec!["x".into(), "y".into()],
            ),
        ];

        for (format, args, expected_sql, expected_args) in cases {
            let (sql, values) = compile(Flavor::MySQL, format, args);
            assert_eq!(sql, expected_sql, "format: {format}");
            assert_eq!(values, expected_args, "format: {format}");
        }
    }

    #[test]
    fn missing_argument_is_marked() {
        let (sql, values) = compile(Flavor::SQLite, "a = $3", vec![1_i64.into()]);
        assert_eq!(sql, "a = /* INVALID ARG $3 */");
        assert!(values.is_empty());
    }

    #[test]
    fn placeholders_follow_flavor() {
        let args = || vec![Arg::from(1_i64), Arg::from(2_i64)];
        let cases = [
            (Flavor::PostgreSQL, "a = $1 AND b = $2"),
            (Flavor::SQLServer, "a = @p1 AND b = @p2"),
            (Flavor::Oracle, "a = :1 AND b = :2"),
            (Flavor::ClickHouse, "a = ? AND b = ?"),
        ];
        for (flavor, expected) in cases {
            let (sql, _) = compile(flavor, "a = $0 AND b = $1", args());
            assert_eq!(sql, expected, "{flavor:?}");
        }
    }

    #[test]
    fn nested_builder_continues_numbering() {
        let inner = Expr::build("LOWER($0)", [Arg::from("Ann")]);
        let (sql, values) = compile(
            Flavor::PostgreSQL,
            "$0 = $1 AND $2 > $3",
            vec![inner.into(), "ann".into(), raw("age"), 18_i64.into()],
        );
        assert_eq!(sql, "LOWER($1) = $2 AND age > $3");
        assert_eq!(
            values,
            vec![
                Arg::Value(SqlValue::from("Ann")),
                Arg::Value(SqlValue::from("ann")),
                Arg::Value(SqlValue::I64(18)),
            ]
        );
    }

    #[test]
    fn nested_tuples_flatten() {
        let pairs = list(vec![tuple([1_i64, 2]), tuple([3_i64, 4])]);
        let (sql, values) = compile(Flavor::SQLite, "(a, b) IN ($0)", vec![pairs]);
        assert_eq!(sql, "(a, b) IN ((?, ?), (?, ?))");
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Arg::from(Option::<i64>::None), Arg::Value(SqlValue::Null));
        assert_eq!(Arg::from(Some(7_i64)), Arg::Value(SqlValue::I64(7)));
    }
}
