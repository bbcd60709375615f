//! ExprBuilder：与方言无关的表达式构造入口。
//!
//! 方言在构造时由上下文决定；每个函数通过 [`Dialects`] 选出对应方言的写法，
//! 调用方无需自己区分方言。函数族分布在 `func_*` / `aggregate` 模块中。

use crate::context::QueryContext;
use crate::dispatch::Dialects;
use crate::expr::Expr;
use crate::flavor::Flavor;
use crate::modifiers::{Arg, Builder, escape};

#[derive(Debug, Clone)]
pub struct ExprBuilder {
    ctx: QueryContext,
}

impl ExprBuilder {
    pub fn new(ctx: QueryContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &QueryContext {
        &self.ctx
    }

    pub fn flavor(&self) -> Flavor {
        self.ctx.flavor()
    }

    /// 按当前方言分派；既无专属分支也无 default 时输出 `NULL`。
    pub fn dispatch(&self, operation: &'static str, dialects: Dialects<'_, Expr>) -> Expr {
        match dialects.resolve(self.flavor()) {
            Some(e) => e,
            None => {
                tracing::debug!(
                    operation,
                    flavor = self.flavor().name(),
                    "no dialect branch, rendering NULL"
                );
                self.null()
            }
        }
    }

    /// 内部格式化：`format` 中以 `$n` 引用 `args`。
    pub(crate) fn fmt(&self, format: &str, args: &[Arg]) -> Expr {
        Expr::build(format, args.iter().cloned()).with_flavor(self.flavor())
    }

    /// 参数化片段（万能出口）：`build("LOWER($0) = $1", [...])`。
    pub fn build(
        &self,
        format: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<Arg>>,
    ) -> Expr {
        Expr::build(format, args).with_flavor(self.flavor())
    }

    pub fn raw(&self, sql: impl AsRef<str>) -> Expr {
        Expr::raw(sql).with_flavor(self.flavor())
    }

    pub fn null(&self) -> Expr {
        Expr::null().with_flavor(self.flavor())
    }

    /// 绑定参数值。
    pub fn value(&self, v: impl Into<Arg>) -> Expr {
        Expr::value(v).with_flavor(self.flavor())
    }

    /// 列引用：裸列名会加上当前表别名（见 [`QueryContext::column_name`]）。
    pub fn column(&self, name: &str) -> Expr {
        self.raw(self.ctx.column_name(name))
    }

    /// 显式指定别名的列引用。
    pub fn table_column(&self, alias: &str, name: &str) -> Expr {
        if alias.is_empty() {
            return self.raw(name);
        }
        self.raw(format!("{alias}.{name}"))
    }

    /// 表达式列表，以 `sep` 连接；嵌套的列表参数会递归展开。
    pub fn list(&self, items: impl IntoIterator<Item = impl Into<Arg>>, sep: &str) -> Expr {
        let args: Vec<Arg> = items.into_iter().map(Into::into).collect();
        let sep = escape(sep);
        let format = (0..args.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(&sep);
        self.fmt(&format, &args)
    }

    /// 函数调用：`NAME(a, b, ...)`。
    pub(crate) fn call(&self, name: &str, args: &[Arg]) -> Expr {
        let format = (0..args.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.fmt(&format!("{name}({format})"), args)
    }

    pub fn paren(&self, e: impl Into<Arg>) -> Expr {
        self.fmt("($0)", &[e.into()])
    }

    pub fn not(&self, e: impl Into<Arg>) -> Expr {
        self.fmt("NOT ($0)", &[e.into()])
    }

    pub fn subquery(&self, sub: impl Builder + 'static) -> Expr {
        self.fmt("($0)", &[Arg::Builder(Box::new(sub))])
    }

    pub fn exists(&self, sub: impl Builder + 'static) -> Expr {
        self.fmt("EXISTS ($0)", &[Arg::Builder(Box::new(sub))])
    }

    pub fn not_exists(&self, sub: impl Builder + 'static) -> Expr {
        self.fmt("NOT EXISTS ($0)", &[Arg::Builder(Box::new(sub))])
    }

    /// `ANY (<sub>)`，与比较运算组合使用：`x = ANY (...)`。
    pub fn any(&self, sub: impl Builder + 'static) -> Expr {
        self.fmt("ANY ($0)", &[Arg::Builder(Box::new(sub))])
    }

    pub fn all(&self, sub: impl Builder + 'static) -> Expr {
        self.fmt("ALL ($0)", &[Arg::Builder(Box::new(sub))])
    }

    fn infix(&self, op: &str, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.fmt(&format!("$0 {op} $1"), &[left.into(), right.into()])
    }

    fn grouped_infix(&self, op: &str, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.fmt(&format!("($0 {op} $1)"), &[left.into(), right.into()])
    }

    pub fn add(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.grouped_infix("+", left, right)
    }

    pub fn subtract(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.grouped_infix("-", left, right)
    }

    pub fn multiply(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.grouped_infix("*", left, right)
    }

    /// 除法。整数操作数也得到小数结果：会做整除的方言先把操作数转换成小数类型。
    pub fn divide(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        let a = [left.into(), right.into()];
        self.dispatch(
            "divide",
            Dialects::new()
                .postgres(|| self.fmt("(CAST($0 AS NUMERIC) / CAST($1 AS NUMERIC))", &a))
                .sqlite(|| self.fmt("(CAST($0 AS REAL) / CAST($1 AS REAL))", &a))
                .mysql(|| self.fmt("($0 / $1)", &a))
                .oracle(|| self.fmt("($0 / $1)", &a))
                .default_branch(|| self.fmt("(CAST($0 AS DECIMAL(38, 10)) / $1)", &a)),
        )
    }

    /// 取模：函数或中缀运算符。
    pub fn modulo(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        let a = [left.into(), right.into()];
        self.dispatch(
            "modulo",
            Dialects::new()
                .sqlite(|| self.fmt("($0 % $1)", &a))
                .sqlserver(|| self.fmt("($0 % $1)", &a))
                .default_branch(|| self.fmt("MOD($0, $1)", &a)),
        )
    }

    pub fn equals(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.infix("=", left, right)
    }

    pub fn not_equals(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.infix("<>", left, right)
    }

    pub fn greater_than(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.infix(">", left, right)
    }

    pub fn greater_than_or_equal(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.infix(">=", left, right)
    }

    pub fn less_than(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.infix("<", left, right)
    }

    pub fn less_than_or_equal(&self, left: impl Into<Arg>, right: impl Into<Arg>) -> Expr {
        self.infix("<=", left, right)
    }
}
