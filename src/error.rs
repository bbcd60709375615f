//! 引擎错误类型。
//!
//! 表达式构造本身不会失败（缺少方言原语时降级或输出 `NULL`）；
//! 这里只收录会让当前语句无法继续构建的配置错误和值转换错误。

use crate::flavor::Flavor;
use crate::schema::ValueKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{operation} requires a table descriptor but none is bound")]
    MissingTable { operation: &'static str },

    #[error("{operation} has no branch for dialect {flavor} and no default")]
    NoDialectBranch {
        operation: &'static str,
        flavor: Flavor,
    },

    #[error("table {table} has no primary key field")]
    NoPrimaryKey { table: String },

    #[error("table {table} has no field named {field}")]
    UnknownField { table: String, field: String },

    #[error("primary key field {field} has unsupported kind {kind}")]
    UnsupportedKeyKind { field: String, kind: ValueKind },

    #[error("cannot store {value} into field {field} of kind {kind}")]
    Coercion {
        field: String,
        kind: ValueKind,
        value: String,
    },

    #[error("primary key expects {expected} value(s), got {actual}")]
    KeyArity { expected: usize, actual: usize },

    #[error("merge branch {branch} already has an action")]
    DuplicateMergeAction { branch: &'static str },

    #[error("merge branch {branch} has no action")]
    EmptyMergeBranch { branch: &'static str },

    #[error("MERGE is not supported by {flavor}")]
    MergeUnsupported { flavor: Flavor },

    #[error("merge branch {branch} cannot {action} on {flavor}")]
    MergeActionUnsupported {
        branch: &'static str,
        action: &'static str,
        flavor: Flavor,
    },

    #[error("merge statement has no {part} clause")]
    IncompleteMerge { part: &'static str },
}
