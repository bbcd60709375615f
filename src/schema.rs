//! 表 / 字段描述符。
//!
//! 由外部 schema 解析层提供（或由 [`crate::model!`] 生成），引擎只读不写。
//! 解析完成后可以跨线程共享（`Arc<Table>`）。

use std::fmt;
use std::sync::OnceLock;

/// 字段的底层值种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Int,
    Float,
    Bool,
    Timestamp,
    Bytes,
    Json,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
            Self::Bytes => "bytes",
            Self::Json => "json",
        };
        f.write_str(s)
    }
}

/// 字段描述符。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// 对外名称（模型字段名）。
    pub name: String,
    /// 存储列名。
    pub column: String,
    pub kind: ValueKind,
    /// 是否可空（`Option<T>` 字段）。
    pub nullable: bool,
    pub primary_key: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            kind,
            nullable: false,
            primary_key: false,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// 表描述符。
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    alias: String,
    fields: Vec<Field>,
    key_indices: OnceLock<Vec<usize>>,
}

impl Table {
    /// 新建表描述符；别名默认等于表名。
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            fields: Vec::new(),
            key_indices: OnceLock::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self.key_indices = OnceLock::new();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias_name(&self) -> &str {
        &self.alias
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// 按对外名称查找字段。
    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// 按列名查找字段。
    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// 主键字段的下标（按声明顺序），首次访问时计算并缓存。
    pub(crate) fn key_indices(&self) -> &[usize] {
        self.key_indices.get_or_init(|| {
            self.fields
                .iter()
                .enumerate()
                .filter(|(_, f)| f.primary_key)
                .map(|(i, _)| i)
                .collect()
        })
    }

    /// `name AS alias`（别名与表名相同时只输出表名）。
    pub fn name_with_alias(&self) -> String {
        if self.alias == self.name {
            self.name.clone()
        } else {
            format!("{} AS {}", self.name, self.alias)
        }
    }
}
