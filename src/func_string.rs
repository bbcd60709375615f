//! 字符串函数。

use crate::dispatch::Dialects;
use crate::expr::Expr;
use crate::expr_builder::ExprBuilder;
use crate::modifiers::Arg;

impl ExprBuilder {
    /// 字符串拼接：SQLite / Oracle 用 `||`，其它方言用 `CONCAT(...)`。
    pub fn concat(&self, items: impl IntoIterator<Item = impl Into<Arg>>) -> Expr {
        let items: Vec<Arg> = items.into_iter().map(Into::into).collect();
        let piped = || self.paren(self.list(items.clone(), " || "));
        self.dispatch(
            "concat",
            Dialects::new()
                .sqlite(piped)
                .oracle(piped)
                .default_branch(|| self.call("CONCAT", &items)),
        )
    }

    /// 带分隔符拼接。没有 `CONCAT_WS` 的方言用 `||` 交替拼接分隔符。
    pub fn concat_ws(
        &self,
        sep: impl Into<Arg>,
        items: impl IntoIterator<Item = impl Into<Arg>>,
    ) -> Expr {
        let mut args = vec![sep.into()];
        args.extend(items.into_iter().map(Into::into));
        let n = args.len();
        let piped = || {
            let format = (1..n)
                .map(|i| format!("${i}"))
                .collect::<Vec<_>>()
                .join(" || $0 || ");
            self.fmt(&format!("({format})"), &args)
        };
        self.dispatch(
            "concat_ws",
            Dialects::new()
                .sqlite(piped)
                .oracle(piped)
                .default_branch(|| self.call("CONCAT_WS", &args)),
        )
    }

    /// 子串，`start` 从 1 开始，截取 `length` 个字符。
    pub fn substring(
        &self,
        s: impl Into<Arg>,
        start: impl Into<Arg>,
        length: impl Into<Arg>,
    ) -> Expr {
        let a = [s.into(), start.into(), length.into()];
        self.dispatch(
            "substring",
            Dialects::new()
                .postgres(|| self.fmt("SUBSTRING($0 FROM $1 FOR $2)", &a))
                .sqlite(|| self.fmt("SUBSTR($0, $1, $2)", &a))
                .oracle(|| self.fmt("SUBSTR($0, $1, $2)", &a))
                .default_branch(|| self.fmt("SUBSTRING($0, $1, $2)", &a)),
        )
    }

    /// 从 `start` 截到末尾。
    pub fn substring_from(&self, s: impl Into<Arg>, start: impl Into<Arg>) -> Expr {
        let a = [s.into(), start.into()];
        self.dispatch(
            "substring",
            Dialects::new()
                .postgres(|| self.fmt("SUBSTRING($0 FROM $1)", &a))
                .sqlserver(|| self.fmt("SUBSTRING($0, $1, LEN($0))", &a))
                .default_branch(|| self.fmt("SUBSTR($0, $1)", &a)),
        )
    }

    pub fn upper(&self, s: impl Into<Arg>) -> Expr {
        self.fmt("UPPER($0)", &[s.into()])
    }

    pub fn lower(&self, s: impl Into<Arg>) -> Expr {
        self.fmt("LOWER($0)", &[s.into()])
    }

    pub fn trim(&self, s: impl Into<Arg>) -> Expr {
        self.fmt("TRIM($0)", &[s.into()])
    }

    pub fn ltrim(&self, s: impl Into<Arg>) -> Expr {
        self.fmt("LTRIM($0)", &[s.into()])
    }

    pub fn rtrim(&self, s: impl Into<Arg>) -> Expr {
        self.fmt("RTRIM($0)", &[s.into()])
    }

    /// 字符长度。
    pub fn length(&self, s: impl Into<Arg>) -> Expr {
        let a = [s.into()];
        self.dispatch(
            "length",
            Dialects::new()
                .sqlite(|| self.fmt("LENGTH($0)", &a))
                .oracle(|| self.fmt("LENGTH($0)", &a))
                .sqlserver(|| self.fmt("LEN($0)", &a))
                .default_branch(|| self.fmt("CHAR_LENGTH($0)", &a)),
        )
    }

    /// 字节长度。
    pub fn byte_length(&self, s: impl Into<Arg>) -> Expr {
        let a = [s.into()];
        self.dispatch(
            "byte_length",
            Dialects::new()
                .mysql(|| self.fmt("LENGTH($0)", &a))
                .sqlite(|| self.fmt("LENGTH(CAST($0 AS BLOB))", &a))
                .sqlserver(|| self.fmt("DATALENGTH($0)", &a))
                .oracle(|| self.fmt("LENGTHB($0)", &a))
                .default_branch(|| self.fmt("OCTET_LENGTH($0)", &a)),
        )
    }

    /// `needle` 在 `haystack` 中的位置（1 起，找不到为 0）。
    pub fn position(&self, needle: impl Into<Arg>, haystack: impl Into<Arg>) -> Expr {
        let a = [needle.into(), haystack.into()];
        self.dispatch(
            "position",
            Dialects::new()
                .mysql(|| self.fmt("LOCATE($0, $1)", &a))
                .sqlite(|| self.fmt("INSTR($1, $0)", &a))
                .oracle(|| self.fmt("INSTR($1, $0)", &a))
                .sqlserver(|| self.fmt("CHARINDEX($0, $1)", &a))
                .default_branch(|| self.fmt("POSITION($0 IN $1)", &a)),
        )
    }

    /// 左起 `n` 个字符。
    pub fn left(&self, s: impl Into<Arg>, n: impl Into<Arg>) -> Expr {
        let a = [s.into(), n.into()];
        let substr = || self.fmt("SUBSTR($0, 1, $1)", &a);
        self.dispatch(
            "left",
            Dialects::new()
                .sqlite(substr)
                .oracle(substr)
                .default_branch(|| self.fmt("LEFT($0, $1)", &a)),
        )
    }

    /// 右起 `n` 个字符。模拟实现用负的起始下标，`n <= 0` 时为空串。
    pub fn right(&self, s: impl Into<Arg>, n: impl Into<Arg>) -> Expr {
        let a = [s.into(), n.into()];
        let substr = || self.fmt("(CASE WHEN $1 > 0 THEN SUBSTR($0, -$1) ELSE '' END)", &a);
        self.dispatch(
            "right",
            Dialects::new()
                .sqlite(substr)
                .oracle(substr)
                .default_branch(|| self.fmt("RIGHT($0, $1)", &a)),
        )
    }

    /// 重复 `n` 次。SQLite 借助 `ZEROBLOB` 的十六进制文本做替换。
    pub fn repeat(&self, s: impl Into<Arg>, n: impl Into<Arg>) -> Expr {
        let a = [s.into(), n.into()];
        self.dispatch(
            "repeat",
            Dialects::new()
                .sqlite(|| self.fmt("REPLACE(HEX(ZEROBLOB($1)), '00', $0)", &a))
                .sqlserver(|| self.fmt("REPLICATE($0, $1)", &a))
                .default_branch(|| self.fmt("REPEAT($0, $1)", &a)),
        )
    }

    pub fn replace(&self, s: impl Into<Arg>, from: impl Into<Arg>, to: impl Into<Arg>) -> Expr {
        self.fmt("REPLACE($0, $1, $2)", &[s.into(), from.into(), to.into()])
    }

    /// 反转字符串。SQLite 没有 `REVERSE`，用递归 CTE 标量子查询逐字符拼接。
    pub fn reverse(&self, s: impl Into<Arg>) -> Expr {
        let a = [s.into()];
        self.dispatch(
            "reverse",
            Dialects::new()
                .sqlite(|| {
                    tracing::warn!("REVERSE is emulated with a recursive CTE on sqlite");
                    self.fmt(
                        "(WITH RECURSIVE r(i, out) AS (SELECT LENGTH($0), '' \
                         UNION ALL SELECT i - 1, out || SUBSTR($0, i, 1) FROM r WHERE i > 0) \
                         SELECT out FROM r WHERE i = 0)",
                        &a,
                    )
                })
                .default_branch(|| self.fmt("REVERSE($0)", &a)),
        )
    }
}
