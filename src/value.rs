//! SQL 参数值类型。

use std::borrow::Cow;
use std::fmt;

/// 绑定到语句上的参数值。
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(Cow<'static, str>),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Timestamp(time::OffsetDateTime),
}

impl SqlValue {
    /// 将 `Option<T>` 映射为 `SqlValue`：`None => Null`，`Some(v) => v.into()`。
    pub fn from_option<T: Into<SqlValue>>(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 值的种类名，用于错误信息。
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// 转成字符串：标量都可以，Null / Bytes(非 UTF-8) / JSON 容器不行。
    pub fn coerce_string(&self) -> Option<String> {
        match self {
            Self::Bool(v) => Some(v.to_string()),
            Self::I64(v) => Some(v.to_string()),
            Self::U64(v) => Some(v.to_string()),
            Self::F64(v) => Some(v.to_string()),
            Self::String(s) => Some(s.to_string()),
            Self::Bytes(b) => String::from_utf8(b.clone()).ok(),
            Self::Json(serde_json::Value::String(s)) => Some(s.clone()),
            Self::Json(serde_json::Value::Number(n)) => Some(n.to_string()),
            Self::Timestamp(t) => t
                .format(&time::format_description::well_known::Rfc3339)
                .ok(),
            Self::Null | Self::Json(_) => None,
        }
    }

    /// 转成 i64：整数、可无损表示的浮点数、数字字符串、布尔（0/1）。
    pub fn coerce_i64(&self) -> Option<i64> {
        match self {
            Self::Bool(v) => Some(i64::from(*v)),
            Self::I64(v) => Some(*v),
            Self::U64(v) => i64::try_from(*v).ok(),
            Self::F64(v) if v.is_finite() && v.fract() == 0.0 => {
                let i = *v as i64;
                (i as f64 == *v).then_some(i)
            }
            Self::String(s) => s.trim().parse().ok(),
            Self::Json(serde_json::Value::Number(n)) => n.as_i64(),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Json(v) => write!(f, "{v}"),
            Self::Timestamp(t) => write!(f, "{t}"),
        }
    }
}

impl From<()> for SqlValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! signed_into_value {
    ($($t:ty),+) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                Self::I64(i64::from(v))
            }
        })+
    };
}

macro_rules! unsigned_into_value {
    ($($t:ty),+) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                Self::U64(u64::from(v))
            }
        })+
    };
}

signed_into_value!(i8, i16, i32, i64);
unsigned_into_value!(u8, u16, u32, u64);

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::F64(f64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(Cow::Owned(v))
    }
}

impl From<&'static str> for SqlValue {
    fn from(v: &'static str) -> Self {
        Self::String(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl From<time::OffsetDateTime> for SqlValue {
    fn from(v: time::OffsetDateTime) -> Self {
        Self::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::SqlValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_option() {
        assert_eq!(SqlValue::from_option(Some(123_i64)), SqlValue::I64(123));
        assert_eq!(SqlValue::from_option::<i64>(None), SqlValue::Null);
    }

    #[test]
    fn coerce_string_accepts_scalars() {
        assert_eq!(SqlValue::I64(42).coerce_string().as_deref(), Some("42"));
        assert_eq!(SqlValue::from("abc").coerce_string().as_deref(), Some("abc"));
        assert_eq!(SqlValue::Null.coerce_string(), None);
        assert_eq!(
            SqlValue::Json(serde_json::json!({"a": 1})).coerce_string(),
            None
        );
    }

    #[test]
    fn coerce_i64_rules() {
        assert_eq!(SqlValue::from("  42 ").coerce_i64(), Some(42));
        assert_eq!(SqlValue::F64(3.0).coerce_i64(), Some(3));
        assert_eq!(SqlValue::F64(3.5).coerce_i64(), None);
        assert_eq!(SqlValue::U64(u64::MAX).coerce_i64(), None);
        assert_eq!(SqlValue::from("x1").coerce_i64(), None);
        assert_eq!(SqlValue::Bool(true).coerce_i64(), Some(1));
    }
}
