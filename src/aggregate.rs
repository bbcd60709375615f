//! 聚合函数与窗口函数。
//!
//! 聚合的参数、DISTINCT、FILTER、ORDER BY 通过 [`AggBuilder`] 配置；
//! 窗口的分区、排序与帧通过 [`WindowBuilder`] 配置，所有窗口函数共用它。

use crate::condition::ConditionBuilder;
use crate::dispatch::Dialects;
use crate::expr::{Expr, string_literal};
use crate::expr_builder::ExprBuilder;
use crate::flavor::Flavor;
use crate::modifiers::{Arg, escape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// 聚合参数配置。
#[derive(Debug, Clone)]
pub struct AggBuilder {
    eb: ExprBuilder,
    target: Option<Arg>,
    distinct: bool,
    filter: Option<Expr>,
    order_by: Vec<(Arg, Order)>,
}

impl AggBuilder {
    fn new(eb: ExprBuilder) -> Self {
        Self {
            eb,
            target: None,
            distinct: false,
            filter: None,
            order_by: Vec::new(),
        }
    }

    /// 以列为参数（裸列名会加上表别名）。
    pub fn column(&mut self, name: &str) -> &mut Self {
        self.target = Some(self.eb.column(name).into());
        self
    }

    /// 以表达式为参数。
    pub fn expr(&mut self, e: impl Into<Arg>) -> &mut Self {
        self.target = Some(e.into());
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    /// 只聚合满足条件的行。
    pub fn filter(&mut self, f: impl FnOnce(&mut ConditionBuilder)) -> &mut Self {
        let mut cond = self.eb.context().condition();
        f(&mut cond);
        self.filter = cond.build();
        self
    }

    /// 聚合内排序（字符串 / 数组聚合）。
    pub fn order_by(&mut self, column: &str, order: Order) -> &mut Self {
        self.order_by.push((self.eb.column(column).into(), order));
        self
    }

    pub fn order_by_expr(&mut self, e: impl Into<Arg>, order: Order) -> &mut Self {
        self.order_by.push((e.into(), order));
        self
    }

    /// 原生 FILTER 子句可用时为 true。
    fn native_filter(&self) -> bool {
        matches!(self.eb.flavor(), Flavor::PostgreSQL | Flavor::SQLite)
    }

    /// 聚合参数；不支持 FILTER 的方言把条件折叠进 `CASE WHEN`。
    fn folded_target(&self, fold_filter: bool) -> Arg {
        let target = self
            .target
            .clone()
            .unwrap_or_else(|| self.eb.null().into());
        match (&self.filter, fold_filter) {
            (Some(cond), true) => self
                .eb
                .fmt("CASE WHEN $0 THEN $1 END", &[cond.clone().into(), target])
                .into(),
            _ => target,
        }
    }

    fn order_clause(&self, args: &mut Vec<Arg>) -> String {
        if self.order_by.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = self
            .order_by
            .iter()
            .map(|(e, o)| {
                args.push(e.clone());
                format!("${} {}", args.len() - 1, o.keyword())
            })
            .collect();
        format!("ORDER BY {}", terms.join(", "))
    }

    /// `NAME([DISTINCT ]target[ extra][ ORDER BY ...])[ FILTER (WHERE ...)]`
    fn render(&self, name: &str, extra: &str, with_order: bool) -> Expr {
        self.render_parts(name, extra, with_order, "")
    }

    /// 同 [`AggBuilder::render`]，`tail` 放在 ORDER BY 之后（MySQL 的 SEPARATOR）。
    fn render_parts(&self, name: &str, extra: &str, with_order: bool, tail: &str) -> Expr {
        let native = self.native_filter();
        let mut args = vec![self.folded_target(!native)];
        let mut format = format!("{name}(");
        if self.distinct {
            format.push_str("DISTINCT ");
        }
        format.push_str("$0");
        format.push_str(extra);
        if with_order {
            let order = self.order_clause(&mut args);
            if !order.is_empty() {
                format.push(' ');
                format.push_str(&order);
            }
        }
        format.push_str(tail);
        format.push(')');
        if native {
            if let Some(cond) = &self.filter {
                format.push_str(&format!(" FILTER (WHERE ${})", args.len()));
                args.push(cond.clone().into());
            }
        }
        self.eb.fmt(&format, &args)
    }
}

/// 窗口帧边界。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u64),
    CurrentRow,
    Following(u64),
    UnboundedFollowing,
}

impl FrameBound {
    fn sql(self) -> String {
        match self {
            Self::UnboundedPreceding => "UNBOUNDED PRECEDING".to_string(),
            Self::Preceding(n) => format!("{n} PRECEDING"),
            Self::CurrentRow => "CURRENT ROW".to_string(),
            Self::Following(n) => format!("{n} FOLLOWING"),
            Self::UnboundedFollowing => "UNBOUNDED FOLLOWING".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameUnit {
    Rows,
    Range,
}

/// 窗口配置：分区、排序与帧。
#[derive(Debug, Clone)]
pub struct WindowBuilder {
    eb: ExprBuilder,
    partition_by: Vec<Arg>,
    order_by: Vec<(Arg, Order)>,
    frame: Option<(FrameUnit, FrameBound, FrameBound)>,
}

impl WindowBuilder {
    fn new(eb: ExprBuilder) -> Self {
        Self {
            eb,
            partition_by: Vec::new(),
            order_by: Vec::new(),
            frame: None,
        }
    }

    pub fn partition_by(&mut self, column: &str) -> &mut Self {
        self.partition_by.push(self.eb.column(column).into());
        self
    }

    pub fn partition_by_expr(&mut self, e: impl Into<Arg>) -> &mut Self {
        self.partition_by.push(e.into());
        self
    }

    pub fn order_by(&mut self, column: &str, order: Order) -> &mut Self {
        self.order_by.push((self.eb.column(column).into(), order));
        self
    }

    pub fn order_by_expr(&mut self, e: impl Into<Arg>, order: Order) -> &mut Self {
        self.order_by.push((e.into(), order));
        self
    }

    /// `ROWS BETWEEN start AND end`
    pub fn rows(&mut self, start: FrameBound, end: FrameBound) -> &mut Self {
        self.frame = Some((FrameUnit::Rows, start, end));
        self
    }

    /// `RANGE BETWEEN start AND end`
    pub fn range(&mut self, start: FrameBound, end: FrameBound) -> &mut Self {
        self.frame = Some((FrameUnit::Range, start, end));
        self
    }

    /// 渲染 `<func> OVER (...)`。
    fn over(&self, func: Expr) -> Expr {
        let mut args: Vec<Arg> = vec![func.into()];
        let mut clauses = Vec::new();
        if !self.partition_by.is_empty() {
            let refs: Vec<String> = self
                .partition_by
                .iter()
                .map(|e| {
                    args.push(e.clone());
                    format!("${}", args.len() - 1)
                })
                .collect();
            clauses.push(format!("PARTITION BY {}", refs.join(", ")));
        }
        if !self.order_by.is_empty() {
            let refs: Vec<String> = self
                .order_by
                .iter()
                .map(|(e, o)| {
                    args.push(e.clone());
                    format!("${} {}", args.len() - 1, o.keyword())
                })
                .collect();
            clauses.push(format!("ORDER BY {}", refs.join(", ")));
        }
        if let Some((unit, start, end)) = self.frame {
            let unit = match unit {
                FrameUnit::Rows => "ROWS",
                FrameUnit::Range => "RANGE",
            };
            clauses.push(format!("{unit} BETWEEN {} AND {}", start.sql(), end.sql()));
        }
        self.eb
            .fmt(&format!("$0 OVER ({})", clauses.join(" ")), &args)
    }
}

impl ExprBuilder {
    fn agg(&self, f: impl FnOnce(&mut AggBuilder)) -> AggBuilder {
        let mut agg = AggBuilder::new(self.clone());
        f(&mut agg);
        agg
    }

    /// `COUNT(...)`；未指定参数时为 `COUNT(*)`。
    pub fn count(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        let mut agg = self.agg(f);
        if agg.target.is_none() {
            if agg.filter.is_some() && !agg.native_filter() {
                agg.target = Some(self.raw("1").into());
            } else {
                agg.target = Some(self.raw("*").into());
            }
        }
        agg.render("COUNT", "", false)
    }

    pub fn count_all(&self) -> Expr {
        self.raw("COUNT(*)")
    }

    pub fn sum(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        self.agg(f).render("SUM", "", false)
    }

    pub fn avg(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        self.agg(f).render("AVG", "", false)
    }

    pub fn min(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        self.agg(f).render("MIN", "", false)
    }

    pub fn max(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        self.agg(f).render("MAX", "", false)
    }

    /// 字符串聚合，以 `sep` 连接。
    ///
    /// SQLite 的 `GROUP_CONCAT(DISTINCT ...)` 只接受一个参数，分隔符通过替换默认的逗号实现，
    /// 值本身含逗号时结果会被改写。
    pub fn string_agg(&self, sep: &str, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        let agg = self.agg(f);
        let lit = escape(&string_literal(sep));
        self.dispatch(
            "string_agg",
            Dialects::new()
                .mysql(|| agg.render_parts("GROUP_CONCAT", "", true, &format!(" SEPARATOR {lit}")))
                .sqlite(|| {
                    if agg.distinct {
                        let inner = agg.render("GROUP_CONCAT", "", true);
                        self.fmt(&format!("REPLACE($0, ',', {lit})"), &[inner.into()])
                    } else {
                        agg.render("GROUP_CONCAT", &format!(", {lit}"), true)
                    }
                })
                .sqlserver(|| within_group(self, &agg, "STRING_AGG", &lit))
                .oracle(|| within_group(self, &agg, "LISTAGG", &lit))
                .default_branch(|| agg.render("STRING_AGG", &format!(", {lit}"), true)),
        )
    }

    /// 数组聚合：PostgreSQL 为原生数组，MySQL / SQLite 为 JSON 数组。
    pub fn array_agg(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        let agg = self.agg(f);
        self.dispatch(
            "array_agg",
            Dialects::new()
                .mysql(|| agg.render("JSON_ARRAYAGG", "", false))
                .sqlite(|| agg.render("JSON_GROUP_ARRAY", "", true))
                .default_branch(|| agg.render("ARRAY_AGG", "", true)),
        )
    }

    /// 样本标准差。SQLite 用平方和公式计算。
    pub fn stddev(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        let agg = self.agg(f);
        self.dispatch(
            "stddev",
            Dialects::new()
                .sqlite(|| self.fmt("SQRT($0)", &[sqlite_variance(self, &agg).into()]))
                .sqlserver(|| agg.render("STDEV", "", false))
                .oracle(|| agg.render("STDDEV", "", false))
                .default_branch(|| agg.render("STDDEV_SAMP", "", false)),
        )
    }

    /// 样本方差。
    pub fn variance(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        let agg = self.agg(f);
        self.dispatch(
            "variance",
            Dialects::new()
                .sqlite(|| sqlite_variance(self, &agg))
                .sqlserver(|| agg.render("VAR", "", false))
                .oracle(|| agg.render("VARIANCE", "", false))
                .default_branch(|| agg.render("VAR_SAMP", "", false)),
        )
    }

    pub fn bit_or(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        let agg = self.agg(f);
        self.dispatch(
            "bit_or",
            Dialects::new()
                .sqlite(|| unsupported(self, "BIT_OR"))
                .oracle(|| agg.render("BIT_OR_AGG", "", false))
                .default_branch(|| agg.render("BIT_OR", "", false)),
        )
    }

    pub fn bit_and(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        let agg = self.agg(f);
        self.dispatch(
            "bit_and",
            Dialects::new()
                .sqlite(|| unsupported(self, "BIT_AND"))
                .oracle(|| agg.render("BIT_AND_AGG", "", false))
                .default_branch(|| agg.render("BIT_AND", "", false)),
        )
    }

    /// 任一为真。没有布尔聚合的方言使用 MAX。
    pub fn bool_or(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        let agg = self.agg(f);
        self.dispatch(
            "bool_or",
            Dialects::new()
                .postgres(|| agg.render("BOOL_OR", "", false))
                .default_branch(|| agg.render("MAX", "", false)),
        )
    }

    /// 全部为真。没有布尔聚合的方言使用 MIN。
    pub fn bool_and(&self, f: impl FnOnce(&mut AggBuilder)) -> Expr {
        let agg = self.agg(f);
        self.dispatch(
            "bool_and",
            Dialects::new()
                .postgres(|| agg.render("BOOL_AND", "", false))
                .default_branch(|| agg.render("MIN", "", false)),
        )
    }

    fn window(&self, f: impl FnOnce(&mut WindowBuilder)) -> WindowBuilder {
        let mut w = WindowBuilder::new(self.clone());
        f(&mut w);
        w
    }

    /// 任意聚合的窗口版本：`<agg> OVER (...)`。
    pub fn over(&self, func: Expr, f: impl FnOnce(&mut WindowBuilder)) -> Expr {
        self.window(f).over(func)
    }

    pub fn row_number(&self, f: impl FnOnce(&mut WindowBuilder)) -> Expr {
        self.window(f).over(self.raw("ROW_NUMBER()"))
    }

    pub fn rank(&self, f: impl FnOnce(&mut WindowBuilder)) -> Expr {
        self.window(f).over(self.raw("RANK()"))
    }

    pub fn dense_rank(&self, f: impl FnOnce(&mut WindowBuilder)) -> Expr {
        self.window(f).over(self.raw("DENSE_RANK()"))
    }

    pub fn percent_rank(&self, f: impl FnOnce(&mut WindowBuilder)) -> Expr {
        self.window(f).over(self.raw("PERCENT_RANK()"))
    }

    pub fn cume_dist(&self, f: impl FnOnce(&mut WindowBuilder)) -> Expr {
        self.window(f).over(self.raw("CUME_DIST()"))
    }

    pub fn ntile(&self, buckets: u32, f: impl FnOnce(&mut WindowBuilder)) -> Expr {
        self.window(f).over(self.raw(format!("NTILE({buckets})")))
    }

    /// `LAG(x, offset[, default])`
    pub fn lag(
        &self,
        x: impl Into<Arg>,
        offset: u32,
        default: Option<Arg>,
        f: impl FnOnce(&mut WindowBuilder),
    ) -> Expr {
        let func = self.offset_fn("LAG", x.into(), offset, default);
        self.window(f).over(func)
    }

    /// `LEAD(x, offset[, default])`
    pub fn lead(
        &self,
        x: impl Into<Arg>,
        offset: u32,
        default: Option<Arg>,
        f: impl FnOnce(&mut WindowBuilder),
    ) -> Expr {
        let func = self.offset_fn("LEAD", x.into(), offset, default);
        self.window(f).over(func)
    }

    fn offset_fn(&self, name: &str, x: Arg, offset: u32, default: Option<Arg>) -> Expr {
        match default {
            Some(d) => self.fmt(&format!("{name}($0, {offset}, $1)"), &[x, d]),
            None => self.fmt(&format!("{name}($0, {offset})"), &[x]),
        }
    }

    pub fn first_value(&self, x: impl Into<Arg>, f: impl FnOnce(&mut WindowBuilder)) -> Expr {
        let func = self.fmt("FIRST_VALUE($0)", &[x.into()]);
        self.window(f).over(func)
    }

    pub fn last_value(&self, x: impl Into<Arg>, f: impl FnOnce(&mut WindowBuilder)) -> Expr {
        let func = self.fmt("LAST_VALUE($0)", &[x.into()]);
        self.window(f).over(func)
    }

    pub fn nth_value(
        &self,
        x: impl Into<Arg>,
        n: u32,
        f: impl FnOnce(&mut WindowBuilder),
    ) -> Expr {
        let func = self.fmt(&format!("NTH_VALUE($0, {n})"), &[x.into()]);
        self.window(f).over(func)
    }
}

/// `NAME(x, sep) WITHIN GROUP (ORDER BY ...)`（SQL Server / Oracle）。
fn within_group(eb: &ExprBuilder, agg: &AggBuilder, name: &str, lit: &str) -> Expr {
    let mut args = vec![agg.folded_target(true)];
    let distinct = if agg.distinct && name == "LISTAGG" {
        "DISTINCT "
    } else {
        ""
    };
    let mut format = format!("{name}({distinct}$0, {lit})");
    let order = agg.order_clause(&mut args);
    if !order.is_empty() {
        format.push_str(&format!(" WITHIN GROUP ({order})"));
    }
    eb.fmt(&format, &args)
}

/// 样本方差的平方和公式：`(Σx² - (Σx)²/n) / (n - 1)`。
fn sqlite_variance(eb: &ExprBuilder, agg: &AggBuilder) -> Expr {
    if agg.distinct {
        tracing::warn!("DISTINCT is ignored by the sqlite variance emulation");
    }
    let x = agg.folded_target(true);
    eb.fmt(
        "((SUM($0 * $0) - SUM($0) * SUM($0) * 1.0 / COUNT($0)) / (COUNT($0) - 1))",
        &[x],
    )
}

fn unsupported(eb: &ExprBuilder, name: &str) -> Expr {
    tracing::warn!(function = name, flavor = eb.flavor().name(), "aggregate not supported");
    eb.raw(format!("NULL /* {name} unsupported */"))
}
