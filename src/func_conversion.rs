//! 类型转换函数。
//!
//! 日期格式串统一采用 `YYYY-MM-DD HH24:MI:SS` 风格，按方言翻译后作为参数绑定。

use crate::dispatch::Dialects;
use crate::expr::Expr;
use crate::expr_builder::ExprBuilder;
use crate::modifiers::Arg;

/// 把 `YYYY`/`MM`/`DD`/`HH24`/`MI`/`SS` 翻译成 MySQL `DATE_FORMAT` 风格。
pub(crate) fn mysql_date_format(format: &str) -> String {
    const TOKENS: [(&str, &str); 7] = [
        ("YYYY", "%Y"),
        ("HH24", "%H"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%h"),
        ("MI", "%i"),
        ("SS", "%s"),
    ];
    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    'scan: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push('%');
            }
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

impl ExprBuilder {
    pub fn to_string(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "to_string",
            Dialects::new()
                .postgres(|| self.fmt("CAST($0 AS TEXT)", &a))
                .mysql(|| self.fmt("CAST($0 AS CHAR)", &a))
                .sqlite(|| self.fmt("CAST($0 AS TEXT)", &a))
                .sqlserver(|| self.fmt("CAST($0 AS NVARCHAR(MAX))", &a))
                .oracle(|| self.fmt("TO_CHAR($0)", &a))
                .default_branch(|| self.fmt("CAST($0 AS VARCHAR)", &a)),
        )
    }

    pub fn to_integer(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "to_integer",
            Dialects::new()
                .mysql(|| self.fmt("CAST($0 AS SIGNED)", &a))
                .sqlite(|| self.fmt("CAST($0 AS INTEGER)", &a))
                .oracle(|| self.fmt("CAST($0 AS NUMBER(19))", &a))
                .default_branch(|| self.fmt("CAST($0 AS BIGINT)", &a)),
        )
    }

    /// 定点小数。SQLite 没有定点类型，转成 REAL 后按 `scale` 舍入。
    pub fn to_decimal(&self, x: impl Into<Arg>, precision: u8, scale: u8) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "to_decimal",
            Dialects::new()
                .postgres(|| self.fmt(&format!("CAST($0 AS NUMERIC({precision}, {scale}))"), &a))
                .sqlite(|| self.fmt(&format!("ROUND(CAST($0 AS REAL), {scale})"), &a))
                .oracle(|| self.fmt(&format!("CAST($0 AS NUMBER({precision}, {scale}))"), &a))
                .default_branch(|| {
                    self.fmt(&format!("CAST($0 AS DECIMAL({precision}, {scale}))"), &a)
                }),
        )
    }

    pub fn to_float(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "to_float",
            Dialects::new()
                .mysql(|| self.fmt("CAST($0 AS DOUBLE)", &a))
                .sqlite(|| self.fmt("CAST($0 AS REAL)", &a))
                .sqlserver(|| self.fmt("CAST($0 AS FLOAT)", &a))
                .oracle(|| self.fmt("CAST($0 AS BINARY_DOUBLE)", &a))
                .default_branch(|| self.fmt("CAST($0 AS DOUBLE PRECISION)", &a)),
        )
    }

    /// 布尔转换。没有布尔类型的方言做非零判断。
    pub fn to_boolean(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "to_boolean",
            Dialects::new()
                .mysql(|| self.fmt("($0 <> 0)", &a))
                .sqlite(|| self.fmt("($0 <> 0)", &a))
                .sqlserver(|| self.fmt("CAST(CASE WHEN $0 <> 0 THEN 1 ELSE 0 END AS BIT)", &a))
                .oracle(|| self.fmt("(CASE WHEN $0 <> 0 THEN 1 ELSE 0 END)", &a))
                .default_branch(|| self.fmt("CAST($0 AS BOOLEAN)", &a)),
        )
    }

    /// 转日期；`format` 为空时按 ISO 格式解析。SQLite 只支持 ISO 格式，忽略 `format`。
    pub fn to_date(&self, x: impl Into<Arg>, format: Option<&str>) -> Expr {
        self.parse_temporal("to_date", x.into(), format, Temporal::Date)
    }

    pub fn to_time(&self, x: impl Into<Arg>, format: Option<&str>) -> Expr {
        self.parse_temporal("to_time", x.into(), format, Temporal::Time)
    }

    pub fn to_timestamp(&self, x: impl Into<Arg>, format: Option<&str>) -> Expr {
        self.parse_temporal("to_timestamp", x.into(), format, Temporal::Timestamp)
    }

    fn parse_temporal(
        &self,
        operation: &'static str,
        x: Arg,
        format: Option<&str>,
        target: Temporal,
    ) -> Expr {
        let plain = [x.clone()];
        let with_format = |f: String| [x.clone(), Arg::from(f)];
        let format_ignored = |flavor: &str| {
            if let Some(f) = format {
                tracing::warn!(operation, flavor, format = f, "format ignored, input parsed as ISO 8601");
            }
        };
        self.dispatch(
            operation,
            Dialects::new()
                .postgres(|| match (format, target) {
                    (None, _) => self.fmt(&format!("CAST($0 AS {})", target.ansi()), &plain),
                    (Some(f), Temporal::Date) => {
                        self.fmt("TO_DATE($0, $1)", &with_format(f.to_string()))
                    }
                    (Some(f), Temporal::Time) => {
                        self.fmt("CAST(TO_TIMESTAMP($0, $1) AS TIME)", &with_format(f.to_string()))
                    }
                    (Some(f), Temporal::Timestamp) => {
                        self.fmt("TO_TIMESTAMP($0, $1)", &with_format(f.to_string()))
                    }
                })
                .mysql(|| match format {
                    None => {
                        let ty = match target {
                            Temporal::Timestamp => "DATETIME",
                            _ => target.ansi(),
                        };
                        self.fmt(&format!("CAST($0 AS {ty})"), &plain)
                    }
                    Some(f) => {
                        let a = with_format(mysql_date_format(f));
                        match target {
                            Temporal::Date => self.fmt("DATE(STR_TO_DATE($0, $1))", &a),
                            Temporal::Time => self.fmt("TIME(STR_TO_DATE($0, $1))", &a),
                            Temporal::Timestamp => self.fmt("STR_TO_DATE($0, $1)", &a),
                        }
                    }
                })
                .sqlite(|| {
                    format_ignored("sqlite");
                    match target {
                        Temporal::Date => self.fmt("DATE($0)", &plain),
                        Temporal::Time => self.fmt("TIME($0)", &plain),
                        Temporal::Timestamp => self.fmt("DATETIME($0)", &plain),
                    }
                })
                .sqlserver(|| {
                    format_ignored("sqlserver");
                    let ty = match target {
                        Temporal::Timestamp => "DATETIME2",
                        _ => target.ansi(),
                    };
                    self.fmt(&format!("CAST($0 AS {ty})"), &plain)
                })
                .oracle(|| match (format, target) {
                    (Some(f), Temporal::Date) => {
                        self.fmt("TO_DATE($0, $1)", &with_format(f.to_string()))
                    }
                    (Some(f), _) => self.fmt("TO_TIMESTAMP($0, $1)", &with_format(f.to_string())),
                    (None, Temporal::Date) => self.fmt("CAST($0 AS DATE)", &plain),
                    (None, _) => self.fmt("CAST($0 AS TIMESTAMP)", &plain),
                })
                .default_branch(|| self.fmt(&format!("CAST($0 AS {})", target.ansi()), &plain)),
        )
    }

    /// 转 JSON（文本按 JSON 解析）。
    pub fn to_json(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "to_json",
            Dialects::new()
                .postgres(|| self.fmt("CAST($0 AS JSONB)", &a))
                .sqlite(|| self.fmt("JSON($0)", &a))
                .default_branch(|| self.fmt("CAST($0 AS JSON)", &a)),
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Temporal {
    Date,
    Time,
    Timestamp,
}

impl Temporal {
    fn ansi(self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
        }
    }
}
