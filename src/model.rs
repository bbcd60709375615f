//! Model：模型实例的字段读写。
//!
//! 没有运行时反射；[`model!`](crate::model!) 宏为结构体生成按字段名分派的
//! 读 / 写 / 零值判断，以及一次性构建、之后共享的表描述符。

use crate::error::{Error, Result};
use crate::schema::{Table, ValueKind};
use crate::value::SqlValue;
use std::sync::Arc;
use time::OffsetDateTime;

/// 可作为模型字段的类型。
pub trait FieldSlot: Sized {
    const KIND: ValueKind;
    const NULLABLE: bool = false;

    fn to_value(&self) -> SqlValue;

    /// 按字段种类做转换；无法转换时返回 `None`。
    fn from_value(value: SqlValue) -> Option<Self>;

    fn is_zero(&self) -> bool;
}

impl FieldSlot for String {
    const KIND: ValueKind = ValueKind::String;

    fn to_value(&self) -> SqlValue {
        SqlValue::from(self.clone())
    }

    fn from_value(value: SqlValue) -> Option<Self> {
        value.coerce_string()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! int_slot {
    ($($t:ty),+) => {
        $(impl FieldSlot for $t {
            const KIND: ValueKind = ValueKind::Int;

            fn to_value(&self) -> SqlValue {
                SqlValue::from(*self)
            }

            fn from_value(value: SqlValue) -> Option<Self> {
                value.coerce_i64().and_then(|v| <$t>::try_from(v).ok())
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }
        })+
    };
}

int_slot!(i32, i64);

impl FieldSlot for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_value(&self) -> SqlValue {
        SqlValue::F64(*self)
    }

    fn from_value(value: SqlValue) -> Option<Self> {
        match value {
            SqlValue::F64(v) => Some(v),
            SqlValue::String(s) => s.trim().parse().ok(),
            other => other.coerce_i64().map(|v| v as f64),
        }
    }

    fn is_zero(&self) -> bool {
        self.to_bits() == 0
    }
}

impl FieldSlot for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }

    fn from_value(value: SqlValue) -> Option<Self> {
        match value {
            SqlValue::Bool(v) => Some(v),
            other => other.coerce_i64().map(|v| v != 0),
        }
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

impl FieldSlot for OffsetDateTime {
    const KIND: ValueKind = ValueKind::Timestamp;

    fn to_value(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }

    fn from_value(value: SqlValue) -> Option<Self> {
        match value {
            SqlValue::Timestamp(t) => Some(t),
            SqlValue::String(s) => {
                OffsetDateTime::parse(&s, &time::format_description::well_known::Rfc3339).ok()
            }
            _ => None,
        }
    }

    /// 以 Unix 纪元作为零值。
    fn is_zero(&self) -> bool {
        *self == OffsetDateTime::UNIX_EPOCH
    }
}

impl<T: FieldSlot> FieldSlot for Option<T> {
    const KIND: ValueKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_value(),
            None => SqlValue::Null,
        }
    }

    fn from_value(value: SqlValue) -> Option<Self> {
        if value.is_null() {
            return Some(None);
        }
        T::from_value(value).map(Some)
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

/// 把 `value` 写入字段槽，失败时给出转换错误。
pub fn assign<T: FieldSlot>(slot: &mut T, field: &str, value: SqlValue) -> Result<()> {
    let shown = value.to_string();
    match T::from_value(value) {
        Some(v) => {
            *slot = v;
            Ok(())
        }
        None => Err(Error::Coercion {
            field: field.to_string(),
            kind: T::KIND,
            value: shown,
        }),
    }
}

/// 只检查 `value` 能否写入字段槽，不修改字段。
pub fn check<T: FieldSlot>(_slot: &T, field: &str, value: &SqlValue) -> Result<()> {
    match T::from_value(value.clone()) {
        Some(_) => Ok(()),
        None => Err(Error::Coercion {
            field: field.to_string(),
            kind: T::KIND,
            value: value.to_string(),
        }),
    }
}

/// 字段种类与可空性，由字段访问器的类型推出。
#[doc(hidden)]
pub fn slot_meta<M, T: FieldSlot>(_accessor: impl Fn(&M) -> &T) -> (ValueKind, bool) {
    (T::KIND, T::NULLABLE)
}

/// 按字段名读写模型实例。
pub trait FieldAccess {
    fn table_name(&self) -> &str;

    /// 字段当前值；字段不存在时为 `None`。
    fn field_value(&self, name: &str) -> Option<SqlValue>;

    fn set_field_value(&mut self, name: &str, value: SqlValue) -> Result<()>;

    /// 同 [`Self::set_field_value`] 的转换规则，但不写入。
    fn check_field_value(&self, name: &str, value: &SqlValue) -> Result<()>;

    fn is_zero_field(&self, name: &str) -> Option<bool>;
}

/// 带表描述符的模型。
pub trait Model: FieldAccess {
    fn table() -> Arc<Table>;
}

/// 为结构体生成 [`Model`] / [`FieldAccess`] 实现。
///
/// ```ignore
/// sqlexpr::model! {
///     impl Post {
///         table: "posts", alias: "p";
///         id: { column: "id", key: true },
///         title: { column: "title" },
///     }
/// }
/// ```
#[macro_export]
macro_rules! model {
    (
        impl $ty:ty {
            table: $table:literal, alias: $alias:literal;
            $(
                $field:ident : { column: $column:literal $(, key: $key:literal)? }
            ),* $(,)?
        }
    ) => {
        impl $crate::model::FieldAccess for $ty {
            fn table_name(&self) -> &str {
                $table
            }

            fn field_value(&self, name: &str) -> Option<$crate::SqlValue> {
                match name {
                    $(stringify!($field) => Some($crate::model::FieldSlot::to_value(&self.$field)),)*
                    _ => None,
                }
            }

            fn set_field_value(&mut self, name: &str, value: $crate::SqlValue) -> $crate::Result<()> {
                match name {
                    $(stringify!($field) => $crate::model::assign(&mut self.$field, name, value),)*
                    _ => Err($crate::Error::UnknownField {
                        table: $table.to_string(),
                        field: name.to_string(),
                    }),
                }
            }

            fn check_field_value(&self, name: &str, value: &$crate::SqlValue) -> $crate::Result<()> {
                match name {
                    $(stringify!($field) => $crate::model::check(&self.$field, name, value),)*
                    _ => Err($crate::Error::UnknownField {
                        table: $table.to_string(),
                        field: name.to_string(),
                    }),
                }
            }

            fn is_zero_field(&self, name: &str) -> Option<bool> {
                match name {
                    $(stringify!($field) => Some($crate::model::FieldSlot::is_zero(&self.$field)),)*
                    _ => None,
                }
            }
        }

        impl $crate::model::Model for $ty {
            fn table() -> ::std::sync::Arc<$crate::schema::Table> {
                static TABLE: ::std::sync::LazyLock<::std::sync::Arc<$crate::schema::Table>> =
                    ::std::sync::LazyLock::new(|| {
                        let table = $crate::schema::Table::new($table).alias($alias);
                        $(
                            let (kind, nullable) =
                                $crate::model::slot_meta(|m: &$ty| &m.$field);
                            let mut field = $crate::schema::Field::new(stringify!($field), kind)
                                .column($column)
                                .nullable(nullable);
                            if $crate::__model_key!($($key)?) {
                                field = field.primary_key();
                            }
                            let table = table.field(field);
                        )*
                        ::std::sync::Arc::new(table)
                    });
                ::std::sync::Arc::clone(&TABLE)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __model_key {
    () => {
        false
    };
    ($key:literal) => {
        $key
    };
}
