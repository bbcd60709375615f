//! 参数修饰器与 `Builder` trait。

use crate::flavor::Flavor;
use crate::value::SqlValue;
use dyn_clone::DynClone;

/// Escape：把 `$` 替换为 `$$`，避免被 `Args::compile_with_flavor` 当成参数引用。
pub fn escape(ident: &str) -> String {
    ident.replace('$', "$$")
}

/// Raw：原样拼入 SQL，不会成为参数占位符。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw {
    pub(crate) expr: String,
}

pub fn raw(expr: impl Into<String>) -> Arg {
    Arg::Raw(Raw { expr: expr.into() })
}

/// List：展开成 `?, ?, ?`（或对应 flavor 的占位符序列）。
pub fn list<T: FlattenIntoArgs>(arg: T) -> Arg {
    let mut out = Vec::new();
    arg.flatten_into(&mut out);
    Arg::List {
        args: out,
        is_tuple: false,
    }
}

/// Tuple：展开成 `(?, ?)`。
pub fn tuple<T: FlattenIntoArgs>(values: T) -> Arg {
    let mut out = Vec::new();
    values.flatten_into(&mut out);
    Arg::List {
        args: out,
        is_tuple: true,
    }
}

/// `Args` 中保存的一个参数。
#[derive(Clone)]
pub enum Arg {
    Value(SqlValue),
    Raw(Raw),
    /// List/Tuple 的统一表示。
    List {
        args: Vec<Arg>,
        is_tuple: bool,
    },
    /// 嵌套表达式或子查询，编译时递归展开并延续参数编号。
    Builder(Box<dyn Builder>),
}

impl std::fmt::Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Raw(v) => f.debug_tuple("Raw").field(v).finish(),
            Self::List { args, is_tuple } => f
                .debug_struct("List")
                .field("args", args)
                .field("is_tuple", is_tuple)
                .finish(),
            Self::Builder(_) => f.write_str("Builder(..)"),
        }
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Raw(a), Self::Raw(b)) => a == b,
            (
                Self::List {
                    args: a,
                    is_tuple: at,
                },
                Self::List {
                    args: b,
                    is_tuple: bt,
                },
            ) => at == bt && a == b,
            _ => false,
        }
    }
}

/// 可渲染为 SQL 文本 + 有序参数列表的单元。
///
/// `initial_arg` 是外层已经收集到的参数；返回值中的参数列表包含它们，
/// 这样嵌套片段的占位符编号（如 PostgreSQL 的 `$n`）能够连续。
pub trait Builder: DynClone {
    fn build(&self) -> (String, Vec<Arg>) {
        self.build_with_flavor(self.flavor(), &[])
    }

    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>);

    fn flavor(&self) -> Flavor;
}

dyn_clone::clone_trait_object!(Builder);

impl Builder for Box<dyn Builder> {
    fn build_with_flavor(&self, flavor: Flavor, initial_arg: &[Arg]) -> (String, Vec<Arg>) {
        (**self).build_with_flavor(flavor, initial_arg)
    }

    fn flavor(&self) -> Flavor {
        (**self).flavor()
    }
}

impl From<Box<dyn Builder>> for Arg {
    fn from(v: Box<dyn Builder>) -> Self {
        Self::Builder(v)
    }
}

impl From<SqlValue> for Arg {
    fn from(v: SqlValue) -> Self {
        Self::Value(v)
    }
}

macro_rules! value_into_arg {
    ($($t:ty),+ $(,)?) => {
        $(impl From<$t> for Arg {
            fn from(v: $t) -> Self {
                Self::Value(SqlValue::from(v))
            }
        })+
    };
}

// 不为 u8 实现：`Vec<u8>` 是 Bytes，而不是可展开的参数列表。
value_into_arg!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u16,
    u32,
    u64,
    f32,
    f64,
    &'static str,
    String,
    Vec<u8>,
    serde_json::Value,
    time::OffsetDateTime,
);

impl<T> From<Option<T>> for Arg
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        Self::Value(SqlValue::from_option(v))
    }
}

/// 递归展开成参数序列。
pub trait FlattenIntoArgs {
    fn flatten_into(self, out: &mut Vec<Arg>);
}

impl<T: Into<Arg>> FlattenIntoArgs for T {
    fn flatten_into(self, out: &mut Vec<Arg>) {
        out.push(self.into());
    }
}

impl<T: FlattenIntoArgs> FlattenIntoArgs for Vec<T> {
    fn flatten_into(self, out: &mut Vec<Arg>) {
        for v in self {
            v.flatten_into(out);
        }
    }
}

impl<T: FlattenIntoArgs, const N: usize> FlattenIntoArgs for [T; N] {
    fn flatten_into(self, out: &mut Vec<Arg>) {
        for v in self {
            v.flatten_into(out);
        }
    }
}
