//! 日期 / 时间函数。

use crate::dispatch::Dialects;
use crate::expr::{Expr, string_literal};
use crate::expr_builder::ExprBuilder;
use crate::modifiers::Arg;

/// 日期字段 / 精度 / 时间间隔单位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DateUnit {
    /// SQL 关键字（`YEAR`、`MONTH`…）。
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
        }
    }

    fn lower(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }

    fn strftime(self) -> &'static str {
        match self {
            Self::Year => "%Y",
            Self::Month => "%m",
            Self::Day => "%d",
            Self::Hour => "%H",
            Self::Minute => "%M",
            Self::Second => "%S",
        }
    }

    /// 一个单位包含的秒数（年、月不固定，返回 `None`）。
    fn seconds(self) -> Option<i64> {
        match self {
            Self::Day => Some(86_400),
            Self::Hour => Some(3_600),
            Self::Minute => Some(60),
            Self::Second => Some(1),
            Self::Year | Self::Month => None,
        }
    }
}

impl ExprBuilder {
    pub fn current_date(&self) -> Expr {
        self.dispatch(
            "current_date",
            Dialects::new()
                .sqlite(|| self.raw("DATE('now')"))
                .sqlserver(|| self.raw("CAST(GETDATE() AS DATE)"))
                .default_branch(|| self.raw("CURRENT_DATE")),
        )
    }

    pub fn current_time(&self) -> Expr {
        self.dispatch(
            "current_time",
            Dialects::new()
                .sqlite(|| self.raw("TIME('now')"))
                .sqlserver(|| self.raw("CAST(GETDATE() AS TIME)"))
                .default_branch(|| self.raw("CURRENT_TIME")),
        )
    }

    pub fn current_timestamp(&self) -> Expr {
        self.raw("CURRENT_TIMESTAMP")
    }

    pub fn now(&self) -> Expr {
        self.dispatch(
            "now",
            Dialects::new()
                .postgres(|| self.raw("NOW()"))
                .mysql(|| self.raw("NOW()"))
                .sqlite(|| self.raw("DATETIME('now')"))
                .sqlserver(|| self.raw("SYSDATETIME()"))
                .oracle(|| self.raw("SYSTIMESTAMP"))
                .default_branch(|| self.raw("CURRENT_TIMESTAMP")),
        )
    }

    /// 取日期字段，结果为整数。
    pub fn extract(&self, part: DateUnit, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "extract",
            Dialects::new()
                .sqlite(|| {
                    self.fmt(
                        &format!("CAST(STRFTIME('{}', $0) AS INTEGER)", part.strftime()),
                        &a,
                    )
                })
                .sqlserver(|| self.fmt(&format!("DATEPART({}, $0)", part.lower()), &a))
                .default_branch(|| self.fmt(&format!("EXTRACT({} FROM $0)", part.keyword()), &a)),
        )
    }

    pub fn year(&self, x: impl Into<Arg>) -> Expr {
        self.extract(DateUnit::Year, x)
    }

    pub fn month(&self, x: impl Into<Arg>) -> Expr {
        self.extract(DateUnit::Month, x)
    }

    pub fn day(&self, x: impl Into<Arg>) -> Expr {
        self.extract(DateUnit::Day, x)
    }

    /// 截断到指定精度。
    pub fn date_trunc(&self, precision: DateUnit, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "date_trunc",
            Dialects::new()
                .postgres(|| {
                    self.fmt(&format!("DATE_TRUNC('{}', $0)", precision.lower()), &a)
                })
                .mysql(|| {
                    let pattern = match precision {
                        DateUnit::Year => "%Y-01-01 00:00:00",
                        DateUnit::Month => "%Y-%m-01 00:00:00",
                        DateUnit::Day => "%Y-%m-%d 00:00:00",
                        DateUnit::Hour => "%Y-%m-%d %H:00:00",
                        DateUnit::Minute => "%Y-%m-%d %H:%i:00",
                        DateUnit::Second => "%Y-%m-%d %H:%i:%s",
                    };
                    self.fmt(&format!("CAST(DATE_FORMAT($0, '{pattern}') AS DATETIME)"), &a)
                })
                .sqlite(|| {
                    let pattern = match precision {
                        DateUnit::Year => "%Y-01-01 00:00:00",
                        DateUnit::Month => "%Y-%m-01 00:00:00",
                        DateUnit::Day => "%Y-%m-%d 00:00:00",
                        DateUnit::Hour => "%Y-%m-%d %H:00:00",
                        DateUnit::Minute => "%Y-%m-%d %H:%M:00",
                        DateUnit::Second => "%Y-%m-%d %H:%M:%S",
                    };
                    self.fmt(&format!("STRFTIME('{pattern}', $0)"), &a)
                })
                .sqlserver(|| self.fmt(&format!("DATETRUNC({}, $0)", precision.lower()), &a))
                .oracle(|| {
                    let fmt = match precision {
                        DateUnit::Year => "YYYY",
                        DateUnit::Month => "MM",
                        DateUnit::Day => "DD",
                        DateUnit::Hour => "HH24",
                        DateUnit::Minute => "MI",
                        // TRUNC 没有秒精度；转成 DATE 会丢掉小数秒
                        DateUnit::Second => {
                            return self.fmt("CAST(CAST($0 AS DATE) AS TIMESTAMP(0))", &a);
                        }
                    };
                    self.fmt(&format!("TRUNC($0, '{fmt}')"), &a)
                })
                .default_branch(|| {
                    self.fmt(&format!("DATE_TRUNC('{}', $0)", precision.lower()), &a)
                }),
        )
    }

    /// 加上 `amount` 个 `unit`（可为负）。
    pub fn date_add(&self, x: impl Into<Arg>, amount: i64, unit: DateUnit) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "date_add",
            Dialects::new()
                .postgres(|| {
                    let interval = string_literal(&format!("{amount} {}", unit.lower()));
                    self.fmt(&format!("($0 + INTERVAL {interval})"), &a)
                })
                .mysql(|| {
                    self.fmt(
                        &format!("DATE_ADD($0, INTERVAL {amount} {})", unit.keyword()),
                        &a,
                    )
                })
                .sqlite(|| {
                    let modifier = string_literal(&format!("{amount:+} {}s", unit.lower()));
                    self.fmt(&format!("DATETIME($0, {modifier})"), &a)
                })
                .sqlserver(|| {
                    self.fmt(&format!("DATEADD({}, {amount}, $0)", unit.lower()), &a)
                })
                .oracle(|| match unit {
                    DateUnit::Year => self.fmt(&format!("ADD_MONTHS($0, {})", amount.saturating_mul(12)), &a),
                    DateUnit::Month => self.fmt(&format!("ADD_MONTHS($0, {amount})"), &a),
                    _ => self.fmt(
                        &format!("($0 + NUMTODSINTERVAL({amount}, '{}'))", unit.keyword()),
                        &a,
                    ),
                })
                .default_branch(|| {
                    self.fmt(&format!("($0 + INTERVAL '{amount}' {})", unit.keyword()), &a)
                }),
        )
    }

    /// 减去 `amount` 个 `unit`。
    pub fn date_sub(&self, x: impl Into<Arg>, amount: i64, unit: DateUnit) -> Expr {
        self.date_add(x, amount.saturating_neg(), unit)
    }

    /// `end - start`，以 `unit` 计的完整单位数，向零截断。
    pub fn date_diff(
        &self,
        unit: DateUnit,
        start: impl Into<Arg>,
        end: impl Into<Arg>,
    ) -> Expr {
        let a = [start.into(), end.into()];
        self.dispatch(
            "date_diff",
            Dialects::new()
                .mysql(|| self.fmt(&format!("TIMESTAMPDIFF({}, $0, $1)", unit.keyword()), &a))
                .sqlserver(|| self.fmt(&format!("DATEDIFF({}, $0, $1)", unit.lower()), &a))
                .sqlite(|| match unit.seconds() {
                    Some(secs) => self.fmt(
                        &format!(
                            "CAST(ROUND((JULIANDAY($1) - JULIANDAY($0)) * 86400) / {secs} AS INTEGER)"
                        ),
                        &a,
                    ),
                    None => {
                        let years = "(CAST(STRFTIME('%Y', $1) AS INTEGER) - CAST(STRFTIME('%Y', $0) AS INTEGER))";
                        if unit == DateUnit::Year {
                            self.fmt(&complete_units(years, "%m-%d %H:%M:%f"), &a)
                        } else {
                            let months = format!(
                                "({years} * 12 + CAST(STRFTIME('%m', $1) AS INTEGER) - CAST(STRFTIME('%m', $0) AS INTEGER))"
                            );
                            self.fmt(&complete_units(&months, "%d %H:%M:%f"), &a)
                        }
                    }
                })
                .postgres(|| match unit.seconds() {
                    Some(secs) => self.fmt(
                        &format!("CAST(TRUNC(EXTRACT(EPOCH FROM ($1 - $0)) / {secs}) AS BIGINT)"),
                        &a,
                    ),
                    None if unit == DateUnit::Year => {
                        self.fmt("CAST(EXTRACT(YEAR FROM AGE($1, $0)) AS BIGINT)", &a)
                    }
                    None => self.fmt(
                        "CAST(EXTRACT(YEAR FROM AGE($1, $0)) * 12 + EXTRACT(MONTH FROM AGE($1, $0)) AS BIGINT)",
                        &a,
                    ),
                })
                .oracle(|| match unit {
                    DateUnit::Year => self.fmt("TRUNC(MONTHS_BETWEEN($1, $0) / 12)", &a),
                    DateUnit::Month => self.fmt("TRUNC(MONTHS_BETWEEN($1, $0))", &a),
                    _ => {
                        let per_day = 86_400 / unit.seconds().unwrap_or(86_400);
                        self.fmt(
                            &format!("TRUNC((CAST($1 AS DATE) - CAST($0 AS DATE)) * {per_day})"),
                            &a,
                        )
                    }
                })
                .default_branch(|| {
                    self.fmt(&format!("DATE_DIFF('{}', $0, $1)", unit.lower()), &a)
                }),
        )
    }

    /// 两个时间点的间隔。
    ///
    /// PostgreSQL 返回原生 interval；其它方言退化为整年数（精度损失）。
    pub fn age(&self, start: impl Into<Arg>, end: impl Into<Arg>) -> Expr {
        let a = [start.into(), end.into()];
        let degraded = |flavor: &str| {
            tracing::warn!(flavor, "AGE degraded to whole years");
        };
        self.dispatch(
            "age",
            Dialects::new()
                .postgres(|| self.fmt("AGE($1, $0)", &a))
                .mysql(|| {
                    degraded("mysql");
                    self.fmt("TIMESTAMPDIFF(YEAR, $0, $1)", &a)
                })
                .sqlite(|| {
                    degraded("sqlite");
                    self.fmt(
                        "(CAST(STRFTIME('%Y', $1) AS INTEGER) - CAST(STRFTIME('%Y', $0) AS INTEGER) \
                         - (STRFTIME('%m-%d', $1) < STRFTIME('%m-%d', $0)))",
                        &a,
                    )
                })
                .oracle(|| {
                    degraded("oracle");
                    self.fmt("TRUNC(MONTHS_BETWEEN($1, $0) / 12)", &a)
                })
                .default_branch(|| {
                    degraded(self.flavor().name());
                    self.date_diff(DateUnit::Year, a[0].clone(), a[1].clone())
                }),
        )
    }
}

/// 日历差 `raw` 修正为完整单位数：终点的剩余部分（`rest` 格式）还没走到起点时退回一个单位。
fn complete_units(raw: &str, rest: &str) -> String {
    let end = format!("STRFTIME('{rest}', $1)");
    let start = format!("STRFTIME('{rest}', $0)");
    format!("({raw} - ({raw} > 0 AND {end} < {start}) + ({raw} < 0 AND {end} > {start}))")
}
