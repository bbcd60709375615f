//! 数学函数。

use crate::dispatch::Dialects;
use crate::expr::Expr;
use crate::expr_builder::ExprBuilder;
use crate::modifiers::Arg;

impl ExprBuilder {
    pub fn abs(&self, x: impl Into<Arg>) -> Expr {
        self.fmt("ABS($0)", &[x.into()])
    }

    /// 向上取整。SQLite 上用整数转换模拟。
    pub fn ceil(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "ceil",
            Dialects::new()
                .sqlite(|| {
                    self.fmt(
                        "(CASE WHEN $0 = CAST($0 AS INTEGER) THEN CAST($0 AS INTEGER) \
                         ELSE CAST($0 AS INTEGER) + ($0 > 0) END)",
                        &a,
                    )
                })
                .sqlserver(|| self.fmt("CEILING($0)", &a))
                .default_branch(|| self.fmt("CEIL($0)", &a)),
        )
    }

    /// 向下取整。
    pub fn floor(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "floor",
            Dialects::new()
                .sqlite(|| {
                    self.fmt(
                        "(CASE WHEN $0 = CAST($0 AS INTEGER) THEN CAST($0 AS INTEGER) \
                         ELSE CAST($0 AS INTEGER) - ($0 < 0) END)",
                        &a,
                    )
                })
                .default_branch(|| self.fmt("FLOOR($0)", &a)),
        )
    }

    /// 四舍五入；`precision` 为保留的小数位数。
    pub fn round(&self, x: impl Into<Arg>, precision: Option<i32>) -> Expr {
        let a = [x.into()];
        let p = precision.unwrap_or(0);
        self.dispatch(
            "round",
            Dialects::new()
                .postgres(|| self.fmt(&format!("ROUND(CAST($0 AS NUMERIC), {p})"), &a))
                .sqlserver(|| self.fmt(&format!("ROUND($0, {p})"), &a))
                .default_branch(|| match precision {
                    Some(p) => self.fmt(&format!("ROUND($0, {p})"), &a),
                    None => self.fmt("ROUND($0)", &a),
                }),
        )
    }

    /// 向零截断到 `precision` 位小数。
    ///
    /// SQLite 没有 TRUNC：先按 10 的幂放大再转整数，结果受浮点误差影响。
    pub fn trunc(&self, x: impl Into<Arg>, precision: Option<i32>) -> Expr {
        let a = [x.into()];
        let p = precision.unwrap_or(0);
        self.dispatch(
            "trunc",
            Dialects::new()
                .postgres(|| self.fmt(&format!("TRUNC(CAST($0 AS NUMERIC), {p})"), &a))
                .mysql(|| self.fmt(&format!("TRUNCATE($0, {p})"), &a))
                .sqlserver(|| self.fmt(&format!("ROUND($0, {p}, 1)"), &a))
                .sqlite(|| {
                    if p == 0 {
                        return self.fmt("CAST($0 AS INTEGER)", &a);
                    }
                    tracing::warn!(precision = p, "TRUNC is approximated by scaled integer cast on sqlite");
                    let scale = 10f64.powi(p);
                    self.fmt(&format!("(CAST($0 * {scale:?} AS INTEGER) / {scale:?})"), &a)
                })
                .default_branch(|| self.fmt(&format!("TRUNC($0, {p})"), &a)),
        )
    }

    pub fn power(&self, base: impl Into<Arg>, exponent: impl Into<Arg>) -> Expr {
        self.fmt("POWER($0, $1)", &[base.into(), exponent.into()])
    }

    pub fn sqrt(&self, x: impl Into<Arg>) -> Expr {
        self.fmt("SQRT($0)", &[x.into()])
    }

    pub fn exp(&self, x: impl Into<Arg>) -> Expr {
        self.fmt("EXP($0)", &[x.into()])
    }

    /// 自然对数。
    pub fn ln(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "ln",
            Dialects::new()
                .sqlserver(|| self.fmt("LOG($0)", &a))
                .default_branch(|| self.fmt("LN($0)", &a)),
        )
    }

    /// 以 10 为底的对数。
    pub fn log(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "log",
            Dialects::new()
                .postgres(|| self.fmt("LOG($0)", &a))
                .oracle(|| self.fmt("LOG(10, $0)", &a))
                .default_branch(|| self.fmt("LOG10($0)", &a)),
        )
    }

    /// 以 `base` 为底的对数。
    pub fn log_base(&self, x: impl Into<Arg>, base: impl Into<Arg>) -> Expr {
        let a = [x.into(), base.into()];
        self.dispatch(
            "log",
            Dialects::new()
                .postgres(|| self.fmt("LOG($1, $0)", &a))
                .mysql(|| self.fmt("LOG($1, $0)", &a))
                .sqlite(|| self.fmt("LOG($1, $0)", &a))
                .oracle(|| self.fmt("LOG($1, $0)", &a))
                .sqlserver(|| self.fmt("LOG($0, $1)", &a))
                .default_branch(|| self.fmt("(LN($0) / LN($1))", &a)),
        )
    }

    pub fn sin(&self, x: impl Into<Arg>) -> Expr {
        self.fmt("SIN($0)", &[x.into()])
    }

    pub fn cos(&self, x: impl Into<Arg>) -> Expr {
        self.fmt("COS($0)", &[x.into()])
    }

    pub fn tan(&self, x: impl Into<Arg>) -> Expr {
        self.fmt("TAN($0)", &[x.into()])
    }

    pub fn asin(&self, x: impl Into<Arg>) -> Expr {
        self.fmt("ASIN($0)", &[x.into()])
    }

    pub fn acos(&self, x: impl Into<Arg>) -> Expr {
        self.fmt("ACOS($0)", &[x.into()])
    }

    pub fn atan(&self, x: impl Into<Arg>) -> Expr {
        self.fmt("ATAN($0)", &[x.into()])
    }

    pub fn pi(&self) -> Expr {
        self.dispatch(
            "pi",
            Dialects::new()
                .oracle(|| self.raw("ACOS(-1)"))
                .default_branch(|| self.raw("PI()")),
        )
    }

    /// `[0, 1)` 区间的随机数。SQLite 的 `RANDOM()` 是 64 位有符号整数，取低 53 位再缩放。
    pub fn random(&self) -> Expr {
        self.dispatch(
            "random",
            Dialects::new()
                .postgres(|| self.raw("RANDOM()"))
                .sqlite(|| self.raw("((RANDOM() & 9007199254740991) / 9007199254740992.0)"))
                .oracle(|| self.raw("DBMS_RANDOM.VALUE"))
                .default_branch(|| self.raw("RAND()")),
        )
    }

    /// 符号：-1 / 0 / 1。
    pub fn sign(&self, x: impl Into<Arg>) -> Expr {
        let x: Arg = x.into();
        self.dispatch(
            "sign",
            Dialects::new()
                .sqlite(|| {
                    self.case()
                        .when(self.greater_than(x.clone(), 0_i64), self.raw("1"))
                        .when(self.less_than(x.clone(), 0_i64), self.raw("-1"))
                        .else_(self.raw("0"))
                        .end()
                })
                .default_branch(|| self.fmt("SIGN($0)", std::slice::from_ref(&x))),
        )
    }

    /// 最大值。SQLite 使用多参数的标量 `MAX`。
    pub fn greatest(&self, items: impl IntoIterator<Item = impl Into<Arg>>) -> Expr {
        let items: Vec<Arg> = items.into_iter().map(Into::into).collect();
        self.dispatch(
            "greatest",
            Dialects::new()
                .sqlite(|| self.call("MAX", &items))
                .default_branch(|| self.call("GREATEST", &items)),
        )
    }

    pub fn least(&self, items: impl IntoIterator<Item = impl Into<Arg>>) -> Expr {
        let items: Vec<Arg> = items.into_iter().map(Into::into).collect();
        self.dispatch(
            "least",
            Dialects::new()
                .sqlite(|| self.call("MIN", &items))
                .default_branch(|| self.call("LEAST", &items)),
        )
    }
}
