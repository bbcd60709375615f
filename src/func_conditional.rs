//! 条件与空值处理：COALESCE / NULLIF / IFNULL / CASE / DECODE。

use crate::condition::ConditionBuilder;
use crate::dispatch::Dialects;
use crate::expr::Expr;
use crate::expr_builder::ExprBuilder;
use crate::modifiers::{Arg, Builder};

impl ExprBuilder {
    /// 第一个非 NULL 的参数。
    pub fn coalesce(&self, items: impl IntoIterator<Item = impl Into<Arg>>) -> Expr {
        let items: Vec<Arg> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return self.null();
        }
        self.call("COALESCE", &items)
    }

    pub fn nullif(&self, a: impl Into<Arg>, b: impl Into<Arg>) -> Expr {
        self.fmt("NULLIF($0, $1)", &[a.into(), b.into()])
    }

    /// 两参数版 COALESCE，有专用函数的方言用专用函数。
    pub fn ifnull(&self, a: impl Into<Arg>, b: impl Into<Arg>) -> Expr {
        let a = [a.into(), b.into()];
        self.dispatch(
            "ifnull",
            Dialects::new()
                .mysql(|| self.fmt("IFNULL($0, $1)", &a))
                .sqlite(|| self.fmt("IFNULL($0, $1)", &a))
                .sqlserver(|| self.fmt("ISNULL($0, $1)", &a))
                .oracle(|| self.fmt("NVL($0, $1)", &a))
                .default_branch(|| self.fmt("COALESCE($0, $1)", &a)),
        )
    }

    /// 搜索式 CASE：`CASE WHEN cond THEN ... END`。
    pub fn case(&self) -> CaseBuilder {
        CaseBuilder {
            eb: self.clone(),
            subject: None,
            branches: Vec::new(),
            otherwise: None,
        }
    }

    /// 简单式 CASE：`CASE subject WHEN v THEN ... END`。
    pub fn case_of(&self, subject: impl Into<Arg>) -> CaseBuilder {
        CaseBuilder {
            eb: self.clone(),
            subject: Some(subject.into()),
            branches: Vec::new(),
            otherwise: None,
        }
    }

    /// `DECODE(expr, search1, result1, ..., [default])`。
    ///
    /// Oracle 使用原生 DECODE，其它方言改写成简单式 CASE；参数少于 3 个时为 `NULL`。
    pub fn decode(&self, items: impl IntoIterator<Item = impl Into<Arg>>) -> Expr {
        let items: Vec<Arg> = items.into_iter().map(Into::into).collect();
        if items.len() < 3 {
            tracing::debug!(args = items.len(), "DECODE needs at least 3 arguments");
            return self.null();
        }
        self.dispatch(
            "decode",
            Dialects::new()
                .oracle(|| self.call("DECODE", &items))
                .default_branch(|| {
                    let mut case = self.case_of(items[0].clone());
                    let mut pairs = items[1..].chunks_exact(2);
                    for pair in pairs.by_ref() {
                        case.when(pair[0].clone(), pair[1].clone());
                    }
                    if let [default] = pairs.remainder() {
                        case.else_(default.clone());
                    }
                    case.end()
                }),
        )
    }
}

/// CASE 表达式构建器。
#[derive(Debug, Clone)]
pub struct CaseBuilder {
    eb: ExprBuilder,
    subject: Option<Arg>,
    branches: Vec<(Arg, Arg)>,
    otherwise: Option<Arg>,
}

impl CaseBuilder {
    pub fn when(&mut self, when: impl Into<Arg>, then: impl Into<Arg>) -> &mut Self {
        self.branches.push((when.into(), then.into()));
        self
    }

    /// WHEN 条件由条件构建器生成；条件为空时按恒真处理。
    pub fn when_condition(
        &mut self,
        f: impl FnOnce(&mut ConditionBuilder),
        then: impl Into<Arg>,
    ) -> &mut Self {
        let mut cond = self.eb.context().condition();
        f(&mut cond);
        let when = cond.build().unwrap_or_else(|| self.eb.raw("1 = 1"));
        self.when(when, then)
    }

    /// THEN 分支为（可关联的）子查询。
    pub fn when_subquery(
        &mut self,
        when: impl Into<Arg>,
        then: impl Builder + 'static,
    ) -> &mut Self {
        let then = self.eb.subquery(then);
        self.when(when, then)
    }

    pub fn else_(&mut self, v: impl Into<Arg>) -> &mut Self {
        self.otherwise = Some(v.into());
        self
    }

    /// 冻结成表达式。没有 WHEN 分支时为 `NULL`。
    pub fn end(&self) -> Expr {
        if self.branches.is_empty() {
            return self.eb.null();
        }
        let mut args = Vec::with_capacity(self.branches.len() * 2 + 2);
        let mut format = String::from("CASE");
        if let Some(subject) = &self.subject {
            format.push_str(&format!(" ${}", args.len()));
            args.push(subject.clone());
        }
        for (when, then) in &self.branches {
            format.push_str(&format!(" WHEN ${} THEN ${}", args.len(), args.len() + 1));
            args.push(when.clone());
            args.push(then.clone());
        }
        if let Some(otherwise) = &self.otherwise {
            format.push_str(&format!(" ELSE ${}", args.len()));
            args.push(otherwise.clone());
        }
        format.push_str(" END");
        self.eb.fmt(&format, &args)
    }
}
