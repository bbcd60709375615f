//! sqlexpr：跨方言的 SQL 表达式、谓词、主键与审计列构建引擎。
//!
//! 只负责产出 SQL 片段与绑定参数，不执行语句。

pub mod aggregate;
#[cfg(test)]
mod aggregate_tests;
pub mod args;
pub mod audit;
pub mod condition;
#[cfg(test)]
mod condition_tests;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod expr;
pub mod expr_builder;
pub mod flavor;
pub mod func_conditional;
pub mod func_conversion;
pub mod func_datetime;
pub mod func_json;
pub mod func_math;
pub mod func_string;
pub mod macros;
pub use crate::macros::{IntoStrings, collect_into_strings};
pub mod merge;
#[cfg(test)]
mod merge_tests;
pub mod model;
pub mod modifiers;
#[cfg(test)]
mod modifiers_tests;
pub mod primary_key;
pub mod schema;
pub mod value;

pub use crate::aggregate::{AggBuilder, FrameBound, Order, WindowBuilder};
pub use crate::args::Args;
pub use crate::audit::{
    AuditHandler, AuditRegistry, AuditRegistryBuilder, CreatedAtHandler, CreatedByHandler,
    HookContext, IdHandler, InsertHandler, InsertQuery, OPERATOR_ARG, UpdateHandler,
    UpdateQuery, UpdatedAtHandler, UpdatedByHandler, generate_id,
};
pub use crate::condition::{ConditionBuilder, ConditionFn};
pub use crate::context::{Engine, EngineBuilder, QueryContext};
pub use crate::dispatch::Dialects;
pub use crate::error::{Error, Result};
pub use crate::expr::Expr;
pub use crate::expr_builder::ExprBuilder;
pub use crate::flavor::{Flavor, default_flavor, set_default_flavor, set_default_flavor_scoped};
pub use crate::func_conditional::CaseBuilder;
pub use crate::func_datetime::DateUnit;
pub use crate::merge::{MergeBranchKind, MergeBuilder, MergeInsert, MergeUpdate, MergeWhenBuilder};
pub use crate::model::{FieldAccess, FieldSlot, Model};
pub use crate::modifiers::{Arg, Builder, escape, list, raw, tuple};
pub use crate::primary_key::PrimaryKey;
pub use crate::schema::{Field, Table, ValueKind};
pub use crate::value::SqlValue;
