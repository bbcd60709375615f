//! ConditionBuilder：谓词列表构建器。
//!
//! 内部是 `(分隔符, 节点)` 的有序列表，渲染时省略第一项的分隔符，
//! 之后各项按自己的分隔符从左到右连接。不会自动推断优先级：
//! 需要 `A AND (B OR C)` 时请显式使用 [`ConditionBuilder::group`]。
//!
//! 分组时先把当前列表暂存，在同一个构建器上运行回调，
//! 回调产生的列表整体作为一个带括号的节点挂回父列表；空分组不产生任何内容。

use crate::context::QueryContext;
use crate::dispatch::Dialects;
use crate::expr::Expr;
use crate::expr_builder::ExprBuilder;
use crate::flavor::Flavor;
use crate::macros::predicate_pair;
use crate::modifiers::{Arg, Builder};
use crate::value::SqlValue;
use std::mem;

/// 可复用的条件片段。
pub type ConditionFn = Box<dyn Fn(&mut ConditionBuilder)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Separator {
    And,
    Or,
}

impl Separator {
    fn sql(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(Expr),
    Group(Vec<Entry>),
}

#[derive(Debug, Clone)]
struct Entry {
    sep: Separator,
    node: Node,
}

/// LIKE 模式的位置。
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Contains,
    StartsWith,
    EndsWith,
}

const LIKE_ESCAPE: char = '!';

#[derive(Debug, Clone)]
pub struct ConditionBuilder {
    eb: ExprBuilder,
    entries: Vec<Entry>,
}

impl ConditionBuilder {
    pub fn new(ctx: QueryContext) -> Self {
        Self {
            eb: ExprBuilder::new(ctx),
            entries: Vec::new(),
        }
    }

    pub fn context(&self) -> &QueryContext {
        self.eb.context()
    }

    /// 与本构建器共享上下文的表达式构建器。
    pub fn expr_builder(&self) -> &ExprBuilder {
        &self.eb
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn push_leaf(&mut self, sep: Separator, leaf: Expr) -> &mut Self {
        self.entries.push(Entry {
            sep,
            node: Node::Leaf(leaf),
        });
        self
    }

    fn push_group(&mut self, sep: Separator, f: impl FnOnce(&mut Self)) -> &mut Self {
        let saved = mem::take(&mut self.entries);
        f(self);
        let inner = mem::replace(&mut self.entries, saved);
        if !inner.is_empty() {
            self.entries.push(Entry {
                sep,
                node: Node::Group(inner),
            });
        }
        self
    }

    /// 分组，以 AND 连接到父列表。
    pub fn group(&mut self, f: impl FnOnce(&mut Self)) -> &mut Self {
        self.push_group(Separator::And, f)
    }

    /// 分组，以 OR 连接到父列表。
    pub fn or_group(&mut self, f: impl FnOnce(&mut Self)) -> &mut Self {
        self.push_group(Separator::Or, f)
    }

    /// 依次在当前构建器上运行条件片段。
    pub fn apply<F>(&mut self, fragments: impl IntoIterator<Item = F>) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        for f in fragments {
            f(self);
        }
        self
    }

    /// `enabled` 为 true 时才运行条件片段。
    pub fn apply_if<F>(&mut self, enabled: bool, fragments: impl IntoIterator<Item = F>) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        if enabled {
            self.apply(fragments);
        }
        self
    }

    /// 冻结成一个表达式；列表为空时返回 `None`。
    pub fn build(&self) -> Option<Expr> {
        if self.entries.is_empty() {
            return None;
        }
        let mut format = String::new();
        let mut args = Vec::new();
        render(&self.entries, &mut format, &mut args);
        Some(self.eb.fmt(&format, &args))
    }

    /// `WHERE <conditions>`；列表为空时为空片段。
    pub fn where_clause(&self) -> Expr {
        match self.build() {
            Some(e) => self.eb.fmt("WHERE $0", &[e.into()]),
            None => self.eb.raw(""),
        }
    }

    fn col(&self, column: &str) -> Arg {
        self.eb.column(column).into()
    }

    fn binary(&self, column: &str, op: &str, value: Arg) -> Expr {
        self.eb.fmt(&format!("$0 {op} $1"), &[self.col(column), value])
    }

    fn columns(&self, left: &str, op: &str, right: &str) -> Expr {
        self.eb.fmt(&format!("$0 {op} $1"), &[self.col(left), self.col(right)])
    }

    fn leaf_equals(&mut self, column: &str, value: impl Into<Arg>) -> Expr {
        let value: Arg = value.into();
        match value {
            Arg::Value(SqlValue::Null) => self.leaf_is_null(column),
            v => self.binary(column, "=", v),
        }
    }

    fn leaf_not_equals(&mut self, column: &str, value: impl Into<Arg>) -> Expr {
        let value: Arg = value.into();
        match value {
            Arg::Value(SqlValue::Null) => self.leaf_is_not_null(column),
            v => self.binary(column, "<>", v),
        }
    }

    fn leaf_greater_than(&mut self, column: &str, value: impl Into<Arg>) -> Expr {
        self.binary(column, ">", value.into())
    }

    fn leaf_greater_than_or_equal(&mut self, column: &str, value: impl Into<Arg>) -> Expr {
        self.binary(column, ">=", value.into())
    }

    fn leaf_less_than(&mut self, column: &str, value: impl Into<Arg>) -> Expr {
        self.binary(column, "<", value.into())
    }

    fn leaf_less_than_or_equal(&mut self, column: &str, value: impl Into<Arg>) -> Expr {
        self.binary(column, "<=", value.into())
    }

    fn leaf_equals_column(&mut self, left: &str, right: &str) -> Expr {
        self.columns(left, "=", right)
    }

    fn leaf_not_equals_column(&mut self, left: &str, right: &str) -> Expr {
        self.columns(left, "<>", right)
    }

    fn leaf_greater_than_column(&mut self, left: &str, right: &str) -> Expr {
        self.columns(left, ">", right)
    }

    fn leaf_greater_than_or_equal_column(&mut self, left: &str, right: &str) -> Expr {
        self.columns(left, ">=", right)
    }

    fn leaf_less_than_column(&mut self, left: &str, right: &str) -> Expr {
        self.columns(left, "<", right)
    }

    fn leaf_less_than_or_equal_column(&mut self, left: &str, right: &str) -> Expr {
        self.columns(left, "<=", right)
    }

    fn leaf_between(&mut self, column: &str, low: impl Into<Arg>, high: impl Into<Arg>) -> Expr {
        self.eb.fmt(
            "$0 BETWEEN $1 AND $2",
            &[self.col(column), low.into(), high.into()],
        )
    }

    fn leaf_not_between(
        &mut self,
        column: &str,
        low: impl Into<Arg>,
        high: impl Into<Arg>,
    ) -> Expr {
        self.eb.fmt(
            "$0 NOT BETWEEN $1 AND $2",
            &[self.col(column), low.into(), high.into()],
        )
    }

    fn membership(&self, column: &str, op: &str, values: Vec<Arg>) -> Expr {
        if values.is_empty() {
            // 空集合：IN 恒假，NOT IN 恒真
            return self.eb.raw(if op == "IN" { "0 = 1" } else { "0 = 0" });
        }
        let list = self.eb.list(values, ", ");
        self.eb
            .fmt(&format!("$0 {op} ($1)"), &[self.col(column), list.into()])
    }

    fn leaf_in(&mut self, column: &str, values: impl IntoIterator<Item = impl Into<Arg>>) -> Expr {
        self.membership(column, "IN", values.into_iter().map(Into::into).collect())
    }

    fn leaf_not_in(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Arg>>,
    ) -> Expr {
        self.membership(column, "NOT IN", values.into_iter().map(Into::into).collect())
    }

    fn leaf_in_subquery(&mut self, column: &str, sub: impl Builder + 'static) -> Expr {
        self.eb
            .fmt("$0 IN ($1)", &[self.col(column), Arg::Builder(Box::new(sub))])
    }

    fn leaf_not_in_subquery(&mut self, column: &str, sub: impl Builder + 'static) -> Expr {
        self.eb
            .fmt("$0 NOT IN ($1)", &[self.col(column), Arg::Builder(Box::new(sub))])
    }

    fn leaf_exists(&mut self, sub: impl Builder + 'static) -> Expr {
        self.eb.exists(sub)
    }

    fn leaf_not_exists(&mut self, sub: impl Builder + 'static) -> Expr {
        self.eb.not_exists(sub)
    }

    fn leaf_like(&mut self, column: &str, pattern: impl Into<Arg>) -> Expr {
        self.binary(column, "LIKE", pattern.into())
    }

    fn leaf_not_like(&mut self, column: &str, pattern: impl Into<Arg>) -> Expr {
        self.binary(column, "NOT LIKE", pattern.into())
    }

    /// 转义 LIKE 通配符后按位置拼出模式。
    fn like_pattern(&self, value: &str, pattern: Pattern) -> String {
        let mut escaped = String::with_capacity(value.len() + 2);
        for c in value.chars() {
            let special = matches!(c, '%' | '_' | LIKE_ESCAPE)
                || (c == '[' && self.eb.flavor() == Flavor::SQLServer);
            if special {
                escaped.push(LIKE_ESCAPE);
            }
            escaped.push(c);
        }
        match pattern {
            Pattern::Contains => format!("%{escaped}%"),
            Pattern::StartsWith => format!("{escaped}%"),
            Pattern::EndsWith => format!("%{escaped}"),
        }
    }

    fn pattern_leaf(&self, column: &str, value: &str, pattern: Pattern, ignore_case: bool) -> Expr {
        let a = [self.col(column), Arg::from(self.like_pattern(value, pattern))];
        if !ignore_case {
            return self.eb.fmt("$0 LIKE $1 ESCAPE '!'", &a);
        }
        self.eb.dispatch(
            "like_ignore_case",
            Dialects::new()
                .postgres(|| self.eb.fmt("$0 ILIKE $1 ESCAPE '!'", &a))
                .default_branch(|| self.eb.fmt("LOWER($0) LIKE LOWER($1) ESCAPE '!'", &a)),
        )
    }

    fn pattern_any(
        &self,
        column: &str,
        values: Vec<String>,
        pattern: Pattern,
        ignore_case: bool,
    ) -> Expr {
        if values.is_empty() {
            return self.eb.raw("0 = 1");
        }
        let leaves: Vec<Arg> = values
            .iter()
            .map(|v| self.pattern_leaf(column, v, pattern, ignore_case).into())
            .collect();
        self.eb.paren(self.eb.list(leaves, " OR "))
    }

    fn leaf_contains(&mut self, column: &str, value: &str) -> Expr {
        self.pattern_leaf(column, value, Pattern::Contains, false)
    }

    fn leaf_contains_ignore_case(&mut self, column: &str, value: &str) -> Expr {
        self.pattern_leaf(column, value, Pattern::Contains, true)
    }

    fn leaf_starts_with(&mut self, column: &str, value: &str) -> Expr {
        self.pattern_leaf(column, value, Pattern::StartsWith, false)
    }

    fn leaf_starts_with_ignore_case(&mut self, column: &str, value: &str) -> Expr {
        self.pattern_leaf(column, value, Pattern::StartsWith, true)
    }

    fn leaf_ends_with(&mut self, column: &str, value: &str) -> Expr {
        self.pattern_leaf(column, value, Pattern::EndsWith, false)
    }

    fn leaf_ends_with_ignore_case(&mut self, column: &str, value: &str) -> Expr {
        self.pattern_leaf(column, value, Pattern::EndsWith, true)
    }

    fn leaf_contains_any(&mut self, column: &str, values: impl crate::IntoStrings) -> Expr {
        let values = crate::collect_into_strings(values);
        self.pattern_any(column, values, Pattern::Contains, false)
    }

    fn leaf_contains_any_ignore_case(
        &mut self,
        column: &str,
        values: impl crate::IntoStrings,
    ) -> Expr {
        let values = crate::collect_into_strings(values);
        self.pattern_any(column, values, Pattern::Contains, true)
    }

    fn leaf_starts_with_any(&mut self, column: &str, values: impl crate::IntoStrings) -> Expr {
        let values = crate::collect_into_strings(values);
        self.pattern_any(column, values, Pattern::StartsWith, false)
    }

    fn leaf_starts_with_any_ignore_case(
        &mut self,
        column: &str,
        values: impl crate::IntoStrings,
    ) -> Expr {
        let values = crate::collect_into_strings(values);
        self.pattern_any(column, values, Pattern::StartsWith, true)
    }

    fn leaf_ends_with_any(&mut self, column: &str, values: impl crate::IntoStrings) -> Expr {
        let values = crate::collect_into_strings(values);
        self.pattern_any(column, values, Pattern::EndsWith, false)
    }

    fn leaf_ends_with_any_ignore_case(
        &mut self,
        column: &str,
        values: impl crate::IntoStrings,
    ) -> Expr {
        let values = crate::collect_into_strings(values);
        self.pattern_any(column, values, Pattern::EndsWith, true)
    }

    fn leaf_is_null(&mut self, column: &str) -> Expr {
        self.eb.fmt("$0 IS NULL", &[self.col(column)])
    }

    fn leaf_is_not_null(&mut self, column: &str) -> Expr {
        self.eb.fmt("$0 IS NOT NULL", &[self.col(column)])
    }

    fn truth(&self, column: &str, truth: bool) -> Expr {
        let a = [self.col(column)];
        let (keyword, digit) = if truth { ("TRUE", 1) } else { ("FALSE", 0) };
        self.eb.dispatch(
            "boolean_test",
            Dialects::new()
                .postgres(|| self.eb.fmt(&format!("$0 IS {keyword}"), &a))
                .mysql(|| self.eb.fmt(&format!("$0 = {digit}"), &a))
                .sqlite(|| self.eb.fmt(&format!("$0 = {digit}"), &a))
                .sqlserver(|| self.eb.fmt(&format!("$0 = {digit}"), &a))
                .oracle(|| self.eb.fmt(&format!("$0 = {digit}"), &a))
                .default_branch(|| self.eb.fmt(&format!("$0 = {keyword}"), &a)),
        )
    }

    fn leaf_is_true(&mut self, column: &str) -> Expr {
        self.truth(column, true)
    }

    fn leaf_is_false(&mut self, column: &str) -> Expr {
        self.truth(column, false)
    }

    fn distinct_from(&self, column: &str, value: Arg, negated: bool) -> Expr {
        let a = [self.col(column), value];
        let (pg, mysql, sqlite, oracle) = if negated {
            (
                "$0 IS NOT DISTINCT FROM $1",
                "$0 <=> $1",
                "$0 IS $1",
                "DECODE($0, $1, 1, 0) = 1",
            )
        } else {
            (
                "$0 IS DISTINCT FROM $1",
                "NOT ($0 <=> $1)",
                "$0 IS NOT $1",
                "DECODE($0, $1, 0, 1) = 1",
            )
        };
        self.eb.dispatch(
            "is_distinct_from",
            Dialects::new()
                .mysql(|| self.eb.fmt(mysql, &a))
                .sqlite(|| self.eb.fmt(sqlite, &a))
                .oracle(|| self.eb.fmt(oracle, &a))
                .default_branch(|| self.eb.fmt(pg, &a)),
        )
    }

    fn leaf_is_distinct_from(&mut self, column: &str, value: impl Into<Arg>) -> Expr {
        self.distinct_from(column, value.into(), false)
    }

    fn leaf_is_not_distinct_from(&mut self, column: &str, value: impl Into<Arg>) -> Expr {
        self.distinct_from(column, value.into(), true)
    }

    fn leaf_expr(&mut self, f: impl FnOnce(&ExprBuilder) -> Expr) -> Expr {
        f(&self.eb)
    }

    predicate_pair!(
        /// `column = value`；值为 NULL 时渲染为 `IS NULL`。
        equals, or_equals => leaf_equals(column: &str, value: impl Into<Arg>)
    );
    predicate_pair!(
        /// `column <> value`；值为 NULL 时渲染为 `IS NOT NULL`。
        not_equals, or_not_equals => leaf_not_equals(column: &str, value: impl Into<Arg>)
    );
    predicate_pair!(greater_than, or_greater_than => leaf_greater_than(column: &str, value: impl Into<Arg>));
    predicate_pair!(
        greater_than_or_equal, or_greater_than_or_equal =>
        leaf_greater_than_or_equal(column: &str, value: impl Into<Arg>)
    );
    predicate_pair!(less_than, or_less_than => leaf_less_than(column: &str, value: impl Into<Arg>));
    predicate_pair!(
        less_than_or_equal, or_less_than_or_equal =>
        leaf_less_than_or_equal(column: &str, value: impl Into<Arg>)
    );

    predicate_pair!(
        /// 两列比较：`left = right`。
        equals_column, or_equals_column => leaf_equals_column(left: &str, right: &str)
    );
    predicate_pair!(not_equals_column, or_not_equals_column => leaf_not_equals_column(left: &str, right: &str));
    predicate_pair!(greater_than_column, or_greater_than_column => leaf_greater_than_column(left: &str, right: &str));
    predicate_pair!(
        greater_than_or_equal_column, or_greater_than_or_equal_column =>
        leaf_greater_than_or_equal_column(left: &str, right: &str)
    );
    predicate_pair!(less_than_column, or_less_than_column => leaf_less_than_column(left: &str, right: &str));
    predicate_pair!(
        less_than_or_equal_column, or_less_than_or_equal_column =>
        leaf_less_than_or_equal_column(left: &str, right: &str)
    );

    predicate_pair!(
        /// `column BETWEEN low AND high`（闭区间）。
        between, or_between => leaf_between(column: &str, low: impl Into<Arg>, high: impl Into<Arg>)
    );
    predicate_pair!(
        not_between, or_not_between =>
        leaf_not_between(column: &str, low: impl Into<Arg>, high: impl Into<Arg>)
    );

    predicate_pair!(
        /// `column IN (...)`；空列表恒假。
        in_, or_in => leaf_in(column: &str, values: impl IntoIterator<Item = impl Into<Arg>>)
    );
    predicate_pair!(
        /// `column NOT IN (...)`；空列表恒真。
        not_in, or_not_in => leaf_not_in(column: &str, values: impl IntoIterator<Item = impl Into<Arg>>)
    );
    predicate_pair!(
        /// `column IN (<sub>)`
        in_subquery, or_in_subquery => leaf_in_subquery(column: &str, sub: impl Builder + 'static)
    );
    predicate_pair!(
        not_in_subquery, or_not_in_subquery =>
        leaf_not_in_subquery(column: &str, sub: impl Builder + 'static)
    );
    predicate_pair!(exists, or_exists => leaf_exists(sub: impl Builder + 'static));
    predicate_pair!(not_exists, or_not_exists => leaf_not_exists(sub: impl Builder + 'static));

    predicate_pair!(
        /// 原样的 LIKE 模式（不转义通配符）。
        like, or_like => leaf_like(column: &str, pattern: impl Into<Arg>)
    );
    predicate_pair!(not_like, or_not_like => leaf_not_like(column: &str, pattern: impl Into<Arg>));

    predicate_pair!(
        /// 包含子串；`%`、`_` 按字面匹配。
        contains, or_contains => leaf_contains(column: &str, value: &str)
    );
    predicate_pair!(
        contains_ignore_case, or_contains_ignore_case =>
        leaf_contains_ignore_case(column: &str, value: &str)
    );
    predicate_pair!(starts_with, or_starts_with => leaf_starts_with(column: &str, value: &str));
    predicate_pair!(
        starts_with_ignore_case, or_starts_with_ignore_case =>
        leaf_starts_with_ignore_case(column: &str, value: &str)
    );
    predicate_pair!(ends_with, or_ends_with => leaf_ends_with(column: &str, value: &str));
    predicate_pair!(
        ends_with_ignore_case, or_ends_with_ignore_case =>
        leaf_ends_with_ignore_case(column: &str, value: &str)
    );

    predicate_pair!(
        /// 包含任一子串：`(c LIKE a OR c LIKE b ...)`；空列表恒假。
        contains_any, or_contains_any => leaf_contains_any(column: &str, values: impl crate::IntoStrings)
    );
    predicate_pair!(
        contains_any_ignore_case, or_contains_any_ignore_case =>
        leaf_contains_any_ignore_case(column: &str, values: impl crate::IntoStrings)
    );
    predicate_pair!(
        starts_with_any, or_starts_with_any =>
        leaf_starts_with_any(column: &str, values: impl crate::IntoStrings)
    );
    predicate_pair!(
        starts_with_any_ignore_case, or_starts_with_any_ignore_case =>
        leaf_starts_with_any_ignore_case(column: &str, values: impl crate::IntoStrings)
    );
    predicate_pair!(
        ends_with_any, or_ends_with_any =>
        leaf_ends_with_any(column: &str, values: impl crate::IntoStrings)
    );
    predicate_pair!(
        ends_with_any_ignore_case, or_ends_with_any_ignore_case =>
        leaf_ends_with_any_ignore_case(column: &str, values: impl crate::IntoStrings)
    );

    predicate_pair!(is_null, or_is_null => leaf_is_null(column: &str));
    predicate_pair!(is_not_null, or_is_not_null => leaf_is_not_null(column: &str));
    predicate_pair!(
        /// 布尔列为真；没有布尔类型的方言比较 `= 1`。
        is_true, or_is_true => leaf_is_true(column: &str)
    );
    predicate_pair!(is_false, or_is_false => leaf_is_false(column: &str));

    predicate_pair!(
        /// NULL 安全的不等比较。
        is_distinct_from, or_is_distinct_from =>
        leaf_is_distinct_from(column: &str, value: impl Into<Arg>)
    );
    predicate_pair!(
        is_not_distinct_from, or_is_not_distinct_from =>
        leaf_is_not_distinct_from(column: &str, value: impl Into<Arg>)
    );

    predicate_pair!(
        /// 任意表达式作为条件。
        expr, or_expr => leaf_expr(f: impl FnOnce(&ExprBuilder) -> Expr)
    );
}

fn render(entries: &[Entry], format: &mut String, args: &mut Vec<Arg>) {
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            format.push_str(entry.sep.sql());
        }
        match &entry.node {
            Node::Leaf(e) => {
                format.push_str(&format!("${}", args.len()));
                args.push(e.clone().into());
            }
            Node::Group(inner) => {
                format.push('(');
                render(inner, format, args);
                format.push(')');
            }
        }
    }
}
