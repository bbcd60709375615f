//! 表达式节点：一段 format（`$n` 引用参数）加上它的参数。
//!
//! 子表达式作为 [`Arg::Builder`] 嵌入，编译时递归展开，参数按出现顺序收集。
//! 节点构造后不可变，只负责把自己渲染成 SQL 文本与参数。

use crate::args::Args;
use crate::flavor::Flavor;
use crate::modifiers::{Arg, Builder, escape};
use crate::value::SqlValue;

#[derive(Debug, Clone)]
pub struct Expr {
    format: String,
    args: Args,
}

impl Expr {
    /// 参数化片段：`format` 中用 `$0`、`$1`… 引用 `args`，`$$` 表示字面量 `$`。
    ///
    /// 所有更高层的函数都基于它构造。
    pub fn build(format: impl Into<String>, args: impl IntoIterator<Item = impl Into<Arg>>) -> Self {
        let mut a = Args::default();
        for arg in args {
            a.add(arg);
        }
        Self {
            format: format.into(),
            args: a,
        }
    }

    /// 由已收集好的参数直接组装（format 中的引用来自 [`Args::add`]）。
    pub(crate) fn from_parts(format: String, args: Args) -> Self {
        Self { format, args }
    }

    /// 原样输出的 SQL 文本（其中的 `$` 不会被当成参数引用）。
    pub fn raw(sql: impl AsRef<str>) -> Self {
        Self::build(escape(sql.as_ref()), Vec::<Arg>::new())
    }

    /// `NULL` 字面量：方言无可用实现或参数不合法时的降级结果。
    pub fn null() -> Self {
        Self::raw("NULL")
    }

    /// 绑定参数值。
    pub fn value(v: impl Into<Arg>) -> Self {
        Self::build("$0", [v.into()])
    }

    /// 子查询：`(<sub>)`。
    pub fn subquery(sub: impl Builder + 'static) -> Self {
        Self::build("($0)", [Arg::Builder(Box::new(sub))])
    }

    pub fn is_null_literal(&self) -> bool {
        self.format == "NULL" && self.args.is_empty()
    }

    /// 绑定默认 flavor（独立调用 [`Builder::build`] 时使用）。
    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.args.flavor = flavor;
        self
    }

    /// 按自身 flavor 渲染，并把参数展开成 [`SqlValue`] 列表。
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let (sql, args) = Builder::build(self);
        (sql, into_values(args))
    }

    /// 按指定 flavor 渲染。
    pub fn to_sql_with_flavor(&self, flavor: Flavor) -> (String, Vec<SqlValue>) {
        let (sql, args) = self.build_with_flavor(flavor, &[]);
        (sql, into_values(args))
    }
}

/// 编译后剩下的参数都是 `Arg::Value`；其它变体已在编译时展开。
fn into_values(args: Vec<Arg>) -> Vec<SqlValue> {
    args.into_iter()
        .filter_map(|a| match a {
            Arg::Value(v) => Some(v),
            _ => None,
        })
        .collect()
}

impl Builder for Expr {
    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>) {
        self.args
            .compile_with_flavor(&self.format, flavor, initial_arg)
    }

    fn flavor(&self) -> Flavor {
        self.args.flavor
    }
}

impl From<Expr> for Arg {
    fn from(e: Expr) -> Self {
        Arg::Builder(Box::new(e))
    }
}

macro_rules! value_into_expr {
    ($($t:ty),+ $(,)?) => {
        $(impl From<$t> for Expr {
            fn from(v: $t) -> Self {
                Expr::value(v)
            }
        })+
    };
}

value_into_expr!(
    SqlValue,
    bool,
    i32,
    i64,
    u32,
    u64,
    f64,
    serde_json::Value,
    time::OffsetDateTime,
);

/// SQL 字符串字面量（单引号，内部单引号加倍）。只用于必须内联常量的位置。
pub(crate) fn string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::Expr;
    use crate::flavor::Flavor;
    use crate::modifiers::Arg;
    use crate::value::SqlValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn raw_is_not_parameterized() {
        let e = Expr::raw("a = 1").with_flavor(Flavor::MySQL);
        assert_eq!(e.to_sql(), ("a = 1".to_string(), vec![]));
    }

    #[test]
    fn raw_keeps_dollar_literal() {
        let (sql, _) = Expr::raw("x ->> '$.a'").to_sql_with_flavor(Flavor::MySQL);
        assert_eq!(sql, "x ->> '$.a'");
    }

    #[test]
    fn nested_numbering_is_continuous() {
        let inner = Expr::build("$0 + $1", [Arg::from(1_i64), Arg::from(2_i64)]);
        let outer = Expr::build("($0) * $1", [Arg::from(inner), Arg::from(3_i64)]);
        let (sql, values) = outer.to_sql_with_flavor(Flavor::PostgreSQL);
        assert_eq!(sql, "($1 + $2) * $3");
        assert_eq!(
            values,
            vec![SqlValue::I64(1), SqlValue::I64(2), SqlValue::I64(3)]
        );
    }

    #[test]
    fn repeated_reference_binds_twice() {
        let e = Expr::build("$0 = $0", [Arg::from("a")]);
        let (sql, values) = e.to_sql_with_flavor(Flavor::SQLite);
        assert_eq!(sql, "? = ?");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn null_literal() {
        assert!(Expr::null().is_null_literal());
        assert!(!Expr::value(1_i64).is_null_literal());
    }

    #[test]
    fn subquery_is_parenthesized() {
        let sub = Expr::build("SELECT id FROM t WHERE x = $0", [Arg::from(5_i64)]);
        let (sql, values) = Expr::subquery(sub).to_sql_with_flavor(Flavor::Oracle);
        assert_eq!(sql, "(SELECT id FROM t WHERE x = :1)");
        assert_eq!(values, vec![SqlValue::I64(5)]);
    }
}
