//! 主键抽象：按声明顺序解析主键字段，读写模型实例上的主键值，
//! 以及渲染按主键过滤的条件。
//!
//! 复合主键总是作为整体读写，不支持只写其中一部分。

use crate::context::QueryContext;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::model::FieldAccess;
use crate::modifiers::{Arg, tuple};
use crate::schema::{Field, Table, ValueKind};
use crate::value::SqlValue;

impl Table {
    /// 主键字段（首次访问后缓存）。没有主键字段时返回 [`Error::NoPrimaryKey`]。
    pub fn primary_key(&self) -> Result<PrimaryKey<'_>> {
        let fields: Vec<&Field> = self
            .key_indices()
            .iter()
            .map(|&i| &self.fields()[i])
            .collect();
        if fields.is_empty() {
            return Err(Error::NoPrimaryKey {
                table: self.name().to_string(),
            });
        }
        Ok(PrimaryKey {
            table: self,
            fields,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PrimaryKey<'a> {
    table: &'a Table,
    fields: Vec<&'a Field>,
}

impl<'a> PrimaryKey<'a> {
    pub fn fields(&self) -> &[&'a Field] {
        &self.fields
    }

    pub fn is_composite(&self) -> bool {
        self.fields.len() > 1
    }

    /// 带表别名的列名：`alias.col`。
    pub fn qualified_columns(&self) -> Vec<String> {
        let alias = self.table.alias_name();
        self.fields
            .iter()
            .map(|f| {
                if alias.is_empty() {
                    f.column.clone()
                } else {
                    format!("{alias}.{}", f.column)
                }
            })
            .collect()
    }

    fn check_arity(&self, actual: usize) -> Result<()> {
        if actual != self.fields.len() {
            return Err(Error::KeyArity {
                expected: self.fields.len(),
                actual,
            });
        }
        Ok(())
    }

    fn read(&self, model: &dyn FieldAccess, field: &Field) -> Result<SqlValue> {
        model
            .field_value(&field.name)
            .ok_or_else(|| Error::UnknownField {
                table: model.table_name().to_string(),
                field: field.name.clone(),
            })
    }

    /// 单列主键的当前值。复合主键请用 [`Self::values`]。
    pub fn value(&self, model: &dyn FieldAccess) -> Result<SqlValue> {
        self.check_arity(1)?;
        self.read(model, self.fields[0])
    }

    /// 全部主键列的当前值（按声明顺序）。
    pub fn values(&self, model: &dyn FieldAccess) -> Result<Vec<SqlValue>> {
        self.fields.iter().map(|f| self.read(model, f)).collect()
    }

    /// 写入单列主键。
    pub fn set(&self, model: &mut dyn FieldAccess, value: impl Into<SqlValue>) -> Result<()> {
        self.set_values(model, vec![value.into()])
    }

    /// 整体写入主键。先按字段种类和模型字段的实际类型检查全部值，全部通过后才写入。
    pub fn set_values(&self, model: &mut dyn FieldAccess, values: Vec<SqlValue>) -> Result<()> {
        self.check_arity(values.len())?;
        let coerced = self
            .fields
            .iter()
            .zip(values)
            .map(|(f, v)| coerce_key(f, v))
            .collect::<Result<Vec<_>>>()?;
        for (field, value) in self.fields.iter().zip(&coerced) {
            model.check_field_value(&field.name, value)?;
        }
        for (field, value) in self.fields.iter().zip(coerced) {
            model.set_field_value(&field.name, value)?;
        }
        Ok(())
    }

    /// 按主键过滤的条件。`keys` 中每一项是一组完整的主键值。
    ///
    /// 单列：`a.id = ?` / `a.id IN (?, ?)`；复合：`(a.k1, a.k2) = (?, ?)` /
    /// `(a.k1, a.k2) IN ((?, ?), (?, ?))`。没有任何键时渲染为 `IS NULL` 检查。
    pub fn where_keys(&self, ctx: &QueryContext, keys: Vec<Vec<SqlValue>>) -> Result<Expr> {
        for key in &keys {
            self.check_arity(key.len())?;
        }
        let columns = self.qualified_columns();
        let eb = ctx.expr();

        if keys.is_empty() {
            let checks: Vec<String> = columns.iter().map(|c| format!("{c} IS NULL")).collect();
            let sql = if checks.len() == 1 {
                checks.join("")
            } else {
                format!("({})", checks.join(" AND "))
            };
            return Ok(eb.raw(sql));
        }

        let target = if self.is_composite() {
            format!("({})", columns.join(", "))
        } else {
            columns.join("")
        };
        let target = eb.raw(target);

        let mut keys = keys;
        if keys.len() == 1 {
            let key = keys.remove(0);
            let rhs: Arg = if self.is_composite() {
                tuple(key)
            } else {
                key.into_iter().next().map(Arg::from).unwrap_or(Arg::Value(SqlValue::Null))
            };
            return Ok(eb.fmt("$0 = $1", &[target.into(), rhs]));
        }

        let items: Vec<Arg> = keys
            .into_iter()
            .map(|key| {
                if self.is_composite() {
                    tuple(key)
                } else {
                    key.into_iter().next().map(Arg::from).unwrap_or(Arg::Value(SqlValue::Null))
                }
            })
            .collect();
        Ok(eb.fmt("$0 IN ($1)", &[target.into(), eb.list(items, ", ").into()]))
    }

    /// 按模型实例当前的主键值过滤。
    pub fn where_model(&self, ctx: &QueryContext, model: &dyn FieldAccess) -> Result<Expr> {
        let values = self.values(model)?;
        self.where_keys(ctx, vec![values])
    }
}

/// 主键值转换：字符串列接受可转成字符串的值，整数列接受可转成 i64 的值；
/// 可空列接受 NULL。其它种类的主键不支持写入。
fn coerce_key(field: &Field, value: SqlValue) -> Result<SqlValue> {
    if value.is_null() && field.nullable {
        return Ok(SqlValue::Null);
    }
    let converted = match field.kind {
        ValueKind::String => value.coerce_string().map(SqlValue::from),
        ValueKind::Int => value.coerce_i64().map(SqlValue::I64),
        kind => {
            return Err(Error::UnsupportedKeyKind {
                field: field.name.clone(),
                kind,
            });
        }
    };
    converted.ok_or_else(|| Error::Coercion {
        field: field.name.clone(),
        kind: field.kind,
        value: value.to_string(),
    })
}
