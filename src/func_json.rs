//! JSON 函数。
//!
//! 路径统一使用 `$.a.b[0]` 写法，PostgreSQL 上翻译成 `{a,b,0}` 文本数组。
//! 写入类函数（set / insert / replace / array_append）的值按 JSON 文本解析。

use crate::dispatch::Dialects;
use crate::expr::{Expr, string_literal};
use crate::expr_builder::ExprBuilder;
use crate::modifiers::{Arg, escape};

/// `d` 为文档成员，`v` 为待查成员；类型与值都相同才算匹配。
const SQLITE_JSON_CONTAINS: &str = "(CASE JSON_TYPE($0) \
    WHEN 'array' THEN NOT EXISTS (SELECT 1 FROM JSON_EACH(CASE JSON_TYPE($1) WHEN 'array' THEN JSON($1) ELSE JSON_ARRAY(JSON($1)) END) AS v \
    WHERE NOT EXISTS (SELECT 1 FROM JSON_EACH($0) AS d WHERE d.type = v.type AND d.value IS v.value)) \
    WHEN 'object' THEN JSON_TYPE($1) = 'object' AND NOT EXISTS (SELECT 1 FROM JSON_EACH($1) AS v \
    WHERE NOT EXISTS (SELECT 1 FROM JSON_EACH($0) AS d WHERE d.key = v.key AND d.type = v.type AND d.value IS v.value)) \
    ELSE JSON($0) = JSON($1) END)";

/// 把 `$.a.b[0]` 拆成路径段 `["a", "b", "0"]`。
pub(crate) fn path_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let rest = path.strip_prefix('$').unwrap_or(path);
    let mut chars = rest.chars().peekable();
    let mut current = String::new();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                if chars.peek() == Some(&'"') {
                    chars.next();
                    for q in chars.by_ref() {
                        if q == '"' {
                            break;
                        }
                        current.push(q);
                    }
                    segments.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                for q in chars.by_ref() {
                    if q == ']' {
                        break;
                    }
                    current.push(q);
                }
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// PostgreSQL 文本数组字面量：`{"a","b","0"}`。
pub(crate) fn pg_text_array(path: &str) -> String {
    let items: Vec<String> = path_segments(path)
        .iter()
        .map(|s| format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", items.join(","))
}

impl ExprBuilder {
    fn pg_path(&self, path: &str) -> Arg {
        Arg::from(pg_text_array(path))
    }

    /// 内联的路径字面量（Oracle 要求路径为常量）。
    fn inline_path(&self, path: &str) -> String {
        escape(&string_literal(path))
    }

    /// 按路径取值（结果仍为 JSON；SQLite 对标量返回 SQL 值）。
    pub fn json_extract(&self, json: impl Into<Arg>, path: &str) -> Expr {
        let doc: Arg = json.into();
        let a = [doc.clone(), Arg::from(path.to_string())];
        self.dispatch(
            "json_extract",
            Dialects::new()
                .postgres(|| self.fmt("($0 #> CAST($1 AS TEXT[]))", &[doc.clone(), self.pg_path(path)]))
                .sqlserver(|| self.fmt("COALESCE(JSON_QUERY($0, $1), JSON_VALUE($0, $1))", &a))
                .oracle(|| {
                    self.fmt(&format!("JSON_QUERY($0, {})", self.inline_path(path)), &a[..1])
                })
                .default_branch(|| self.fmt("JSON_EXTRACT($0, $1)", &a)),
        )
    }

    /// 按路径取文本值。
    pub fn json_extract_text(&self, json: impl Into<Arg>, path: &str) -> Expr {
        let doc: Arg = json.into();
        let a = [doc.clone(), Arg::from(path.to_string())];
        self.dispatch(
            "json_extract_text",
            Dialects::new()
                .postgres(|| {
                    self.fmt("($0 #>> CAST($1 AS TEXT[]))", &[doc.clone(), self.pg_path(path)])
                })
                .mysql(|| self.fmt("JSON_UNQUOTE(JSON_EXTRACT($0, $1))", &a))
                .sqlite(|| self.fmt("JSON_EXTRACT($0, $1)", &a))
                .sqlserver(|| self.fmt("JSON_VALUE($0, $1)", &a))
                .oracle(|| {
                    self.fmt(&format!("JSON_VALUE($0, {})", self.inline_path(path)), &a[..1])
                })
                .default_branch(|| self.fmt("JSON_UNQUOTE(JSON_EXTRACT($0, $1))", &a)),
        )
    }

    /// JSON 字符串去引号。
    pub fn json_unquote(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "json_unquote",
            Dialects::new()
                .postgres(|| self.fmt("($0 #>> '{}')", &a))
                .sqlite(|| self.fmt("JSON_EXTRACT($0, '$$')", &a))
                .sqlserver(|| self.fmt("JSON_VALUE($0, '$$')", &a))
                .default_branch(|| self.fmt("JSON_UNQUOTE($0)", &a)),
        )
    }

    pub fn json_build_array(&self, items: impl IntoIterator<Item = impl Into<Arg>>) -> Expr {
        let items: Vec<Arg> = items.into_iter().map(Into::into).collect();
        self.dispatch(
            "json_build_array",
            Dialects::new()
                .postgres(|| self.call("JSONB_BUILD_ARRAY", &items))
                .default_branch(|| self.call("JSON_ARRAY", &items)),
        )
    }

    /// 由键值对构造对象，键以字面量内联。
    pub fn json_build_object<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Expr
    where
        K: AsRef<str>,
        V: Into<Arg>,
    {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for (k, v) in pairs {
            keys.push(escape(&string_literal(k.as_ref())));
            values.push(v.into());
        }
        let render = |name: &str, join: &dyn Fn(&str, usize) -> String| {
            let body = keys
                .iter()
                .enumerate()
                .map(|(i, k)| join(k, i))
                .collect::<Vec<_>>()
                .join(", ");
            self.fmt(&format!("{name}({body})"), &values)
        };
        self.dispatch(
            "json_build_object",
            Dialects::new()
                .postgres(|| render("JSONB_BUILD_OBJECT", &|k, i| format!("{k}, ${i}")))
                .oracle(|| render("JSON_OBJECT", &|k, i| format!("KEY {k} VALUE ${i}")))
                .sqlserver(|| render("JSON_OBJECT", &|k, i| format!("{k}: ${i}")))
                .default_branch(|| render("JSON_OBJECT", &|k, i| format!("{k}, ${i}"))),
        )
    }

    /// 是否包含 `value`（JSON 文本）。
    ///
    /// 数组包含某个元素，或包含另一个数组的全部元素；对象包含另一个对象的全部键值；
    /// 标量只与自身相等。SQLite 用 `JSON_EACH` 子查询模拟，嵌套容器只比较一层（按文本相等）。
    pub fn json_contains(&self, json: impl Into<Arg>, value: impl Into<Arg>) -> Expr {
        let a = [json.into(), value.into()];
        self.dispatch(
            "json_contains",
            Dialects::new()
                .postgres(|| self.fmt("($0 @> CAST($1 AS JSONB))", &a))
                .sqlite(|| self.fmt(SQLITE_JSON_CONTAINS, &a))
                .default_branch(|| self.fmt("JSON_CONTAINS($0, $1)", &a)),
        )
    }

    /// 路径是否存在。
    pub fn json_contains_path(&self, json: impl Into<Arg>, path: &str) -> Expr {
        let a = [json.into(), Arg::from(path.to_string())];
        self.dispatch(
            "json_contains_path",
            Dialects::new()
                .postgres(|| self.fmt("JSONB_PATH_EXISTS($0, CAST($1 AS JSONPATH))", &a))
                .sqlite(|| self.fmt("(JSON_TYPE($0, $1) IS NOT NULL)", &a))
                .sqlserver(|| self.fmt("(JSON_PATH_EXISTS($0, $1) = 1)", &a))
                .oracle(|| {
                    self.fmt(&format!("JSON_EXISTS($0, {})", self.inline_path(path)), &a[..1])
                })
                .default_branch(|| self.fmt("JSON_CONTAINS_PATH($0, 'one', $1)", &a)),
        )
    }

    /// 对象的键，结果为 JSON 数组。
    pub fn json_keys(&self, json: impl Into<Arg>) -> Expr {
        let a = [json.into()];
        self.dispatch(
            "json_keys",
            Dialects::new()
                .postgres(|| self.fmt("(SELECT JSONB_AGG(k) FROM JSONB_OBJECT_KEYS($0) AS k)", &a))
                .sqlite(|| self.fmt("(SELECT JSON_GROUP_ARRAY(key) FROM JSON_EACH($0))", &a))
                .default_branch(|| self.fmt("JSON_KEYS($0)", &a)),
        )
    }

    /// 长度：数组为元素个数，对象为键个数，标量为 1。
    pub fn json_length(&self, json: impl Into<Arg>) -> Expr {
        let a = [json.into()];
        self.dispatch(
            "json_length",
            Dialects::new()
                .postgres(|| {
                    self.fmt(
                        "(CASE JSONB_TYPEOF($0) WHEN 'array' THEN JSONB_ARRAY_LENGTH($0) \
                         WHEN 'object' THEN (SELECT COUNT(*) FROM JSONB_OBJECT_KEYS($0)) ELSE 1 END)",
                        &a,
                    )
                })
                .sqlite(|| {
                    self.fmt(
                        "(CASE JSON_TYPE($0) WHEN 'array' THEN JSON_ARRAY_LENGTH($0) \
                         WHEN 'object' THEN (SELECT COUNT(*) FROM JSON_EACH($0)) ELSE 1 END)",
                        &a,
                    )
                })
                .default_branch(|| self.fmt("JSON_LENGTH($0)", &a)),
        )
    }

    /// 类型名（小写；各方言的具体取值不同）。
    pub fn json_type(&self, json: impl Into<Arg>) -> Expr {
        let a = [json.into()];
        self.dispatch(
            "json_type",
            Dialects::new()
                .postgres(|| self.fmt("JSONB_TYPEOF($0)", &a))
                .mysql(|| self.fmt("LOWER(JSON_TYPE($0))", &a))
                .default_branch(|| self.fmt("JSON_TYPE($0)", &a)),
        )
    }

    /// 是否为合法 JSON。
    ///
    /// PostgreSQL 上依赖类型转换，非法输入会直接报错而不是返回 false。
    pub fn json_valid(&self, x: impl Into<Arg>) -> Expr {
        let a = [x.into()];
        self.dispatch(
            "json_valid",
            Dialects::new()
                .postgres(|| {
                    tracing::warn!("JSON validity on postgres raises on invalid input");
                    self.fmt("(CAST($0 AS JSONB) IS NOT NULL)", &a)
                })
                .sqlserver(|| self.fmt("(ISJSON($0) = 1)", &a))
                .oracle(|| self.fmt("($0 IS JSON)", &a))
                .default_branch(|| self.fmt("JSON_VALID($0)", &a)),
        )
    }

    /// 写入路径（不存在则创建，存在则替换）。
    pub fn json_set(&self, json: impl Into<Arg>, path: &str, value: impl Into<Arg>) -> Expr {
        self.json_write("json_set", json.into(), path, value.into(), JsonWrite::Set)
    }

    /// 仅在路径不存在时写入。
    pub fn json_insert(&self, json: impl Into<Arg>, path: &str, value: impl Into<Arg>) -> Expr {
        self.json_write("json_insert", json.into(), path, value.into(), JsonWrite::Insert)
    }

    /// 仅在路径已存在时替换。
    pub fn json_replace(&self, json: impl Into<Arg>, path: &str, value: impl Into<Arg>) -> Expr {
        self.json_write("json_replace", json.into(), path, value.into(), JsonWrite::Replace)
    }

    fn json_write(
        &self,
        operation: &'static str,
        doc: Arg,
        path: &str,
        value: Arg,
        mode: JsonWrite,
    ) -> Expr {
        let a = [doc.clone(), Arg::from(path.to_string()), value.clone()];
        let pg = [doc, self.pg_path(path), value];
        self.dispatch(
            operation,
            Dialects::new()
                .postgres(|| match mode {
                    JsonWrite::Set => {
                        self.fmt("JSONB_SET($0, CAST($1 AS TEXT[]), CAST($2 AS JSONB), true)", &pg)
                    }
                    JsonWrite::Replace => {
                        self.fmt("JSONB_SET($0, CAST($1 AS TEXT[]), CAST($2 AS JSONB), false)", &pg)
                    }
                    JsonWrite::Insert => self.fmt(
                        "(CASE WHEN ($0 #> CAST($1 AS TEXT[])) IS NULL \
                         THEN JSONB_SET($0, CAST($1 AS TEXT[]), CAST($2 AS JSONB), true) ELSE $0 END)",
                        &pg,
                    ),
                })
                .sqlite(|| self.fmt(&format!("{}($0, $1, JSON($2))", mode.function()), &a))
                .sqlserver(|| match mode {
                    JsonWrite::Set => self.fmt("JSON_MODIFY($0, $1, JSON_QUERY($2))", &a),
                    JsonWrite::Insert => self.fmt(
                        "(CASE WHEN JSON_PATH_EXISTS($0, $1) = 1 THEN $0 \
                         ELSE JSON_MODIFY($0, $1, JSON_QUERY($2)) END)",
                        &a,
                    ),
                    JsonWrite::Replace => self.fmt(
                        "(CASE WHEN JSON_PATH_EXISTS($0, $1) = 1 \
                         THEN JSON_MODIFY($0, $1, JSON_QUERY($2)) ELSE $0 END)",
                        &a,
                    ),
                })
                .default_branch(|| {
                    self.fmt(&format!("{}($0, $1, CAST($2 AS JSON))", mode.function()), &a)
                }),
        )
    }

    /// 向路径处的数组追加元素；路径不存在或不是数组时视为空数组。
    pub fn json_array_append(
        &self,
        json: impl Into<Arg>,
        path: &str,
        value: impl Into<Arg>,
    ) -> Expr {
        let doc: Arg = json.into();
        let value: Arg = value.into();
        let a = [doc.clone(), Arg::from(path.to_string()), value.clone()];
        self.dispatch(
            "json_array_append",
            Dialects::new()
                .postgres(|| {
                    self.fmt(
                        "JSONB_SET($0, CAST($1 AS TEXT[]), \
                         (CASE WHEN JSONB_TYPEOF($0 #> CAST($1 AS TEXT[])) = 'array' \
                         THEN $0 #> CAST($1 AS TEXT[]) ELSE CAST('[]' AS JSONB) END) \
                         || JSONB_BUILD_ARRAY(CAST($2 AS JSONB)), true)",
                        &[doc.clone(), self.pg_path(path), value.clone()],
                    )
                })
                .sqlite(|| {
                    self.fmt(
                        "JSON_SET($0, $1, JSON_INSERT(\
                         (CASE WHEN JSON_TYPE($0, $1) = 'array' THEN JSON_EXTRACT($0, $1) ELSE '[]' END), \
                         '$$[#]', JSON($2)))",
                        &a,
                    )
                })
                .default_branch(|| {
                    self.fmt(
                        "JSON_SET($0, $1, JSON_ARRAY_APPEND(\
                         (CASE WHEN JSON_TYPE(JSON_EXTRACT($0, $1)) = 'ARRAY' THEN JSON_EXTRACT($0, $1) \
                         ELSE JSON_ARRAY() END), '$$', CAST($2 AS JSON)))",
                        &a,
                    )
                }),
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum JsonWrite {
    Set,
    Insert,
    Replace,
}

impl JsonWrite {
    fn function(self) -> &'static str {
        match self {
            Self::Set => "JSON_SET",
            Self::Insert => "JSON_INSERT",
            Self::Replace => "JSON_REPLACE",
        }
    }
}
