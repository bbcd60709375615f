//! 审计列处理器：自动填充主键 ID、创建 / 更新时间与操作人。
//!
//! 处理器分两类：只参与插入的（[`InsertHandler`]），以及插入和更新都参与的
//! （[`UpdateHandler`]）。处理器集合由 [`AuditRegistry`] 在启动时构建一次，
//! 之后只读，通过 [`crate::Engine`] 显式传递。
//!
//! 插入时只填充零值字段，不覆盖调用方显式给出的值。更新时：语句已有 SET 子句就追加一条，
//! 否则直接写入模型字段。插入 / 更新都参与的处理器会在支持的方言上请求 RETURNING。

use crate::dispatch::Dialects;
use crate::error::Result;
use crate::expr::Expr;
use crate::flavor::Flavor;
use crate::model::FieldAccess;
use crate::schema::{Field, Table, ValueKind};
use crate::value::SqlValue;
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

/// 操作人默认读取的具名参数。
pub const OPERATOR_ARG: &str = "operator";

/// 每个连接一份的钩子上下文：方言、当前时间、具名参数。
#[derive(Debug, Clone)]
pub struct HookContext {
    flavor: Flavor,
    now: OffsetDateTime,
    named: BTreeMap<String, SqlValue>,
}

impl HookContext {
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            now: OffsetDateTime::now_utc(),
            named: BTreeMap::new(),
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn now(&self) -> OffsetDateTime {
        self.now
    }

    /// 固定“当前时间”。
    pub fn with_now(mut self, now: OffsetDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set_named(name, value);
        self
    }

    pub fn set_named(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.named.insert(name.into(), value.into());
    }

    pub fn named(&self, name: &str) -> Option<&SqlValue> {
        self.named.get(name)
    }
}

/// 插入语句一侧的协作接口。
pub trait InsertQuery {
    fn flavor(&self) -> Flavor;

    /// 请求在结果中返回该列。
    fn returning(&mut self, column: &str);
}

/// 更新语句一侧的协作接口。
pub trait UpdateQuery {
    fn flavor(&self) -> Flavor;

    /// 已有的 SET 子句数量。
    fn set_count(&self) -> usize;

    fn set(&mut self, column: &str, value: Expr);

    fn returning(&mut self, column: &str);

    /// 多表更新时返回目标表别名，SET 列需要带上它。
    fn multi_table_alias(&self) -> Option<&str> {
        None
    }
}

/// 只参与插入的处理器。
pub trait InsertHandler: fmt::Debug + Send + Sync {
    /// 处理器负责的逻辑列名。
    fn column(&self) -> &str;

    fn on_insert(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        query: &mut dyn InsertQuery,
    ) -> Result<()>;
}

/// 插入、更新都参与的处理器。
pub trait UpdateHandler: InsertHandler {
    fn on_update(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        query: &mut dyn UpdateQuery,
    ) -> Result<()>;
}

/// 注册表中的一项。
#[derive(Debug)]
pub enum AuditHandler {
    Insert(Box<dyn InsertHandler>),
    InsertAndUpdate(Box<dyn UpdateHandler>),
}

impl AuditHandler {
    pub fn column(&self) -> &str {
        match self {
            Self::Insert(h) => h.column(),
            Self::InsertAndUpdate(h) => h.column(),
        }
    }
}

/// 审计处理器注册表（有序）。
#[derive(Debug, Default)]
pub struct AuditRegistry {
    handlers: Vec<AuditHandler>,
}

impl AuditRegistry {
    /// 标准集合：id / created_at / updated_at / created_by / updated_by。
    pub fn standard() -> Self {
        Self::builder()
            .insert(IdHandler::default())
            .insert(CreatedAtHandler::default())
            .insert_and_update(UpdatedAtHandler::default())
            .insert(CreatedByHandler::default())
            .insert_and_update(UpdatedByHandler::default())
            .build()
    }

    pub fn builder() -> AuditRegistryBuilder {
        AuditRegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn handlers(&self) -> &[AuditHandler] {
        &self.handlers
    }

    /// 按注册顺序运行全部处理器的插入逻辑。
    pub fn on_insert(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        query: &mut dyn InsertQuery,
    ) -> Result<()> {
        for handler in &self.handlers {
            match handler {
                AuditHandler::Insert(h) => h.on_insert(hook, table, model, query)?,
                AuditHandler::InsertAndUpdate(h) => h.on_insert(hook, table, model, query)?,
            }
        }
        Ok(())
    }

    /// 按注册顺序运行插入、更新都参与的处理器的更新逻辑。
    pub fn on_update(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        query: &mut dyn UpdateQuery,
    ) -> Result<()> {
        for handler in &self.handlers {
            if let AuditHandler::InsertAndUpdate(h) = handler {
                h.on_update(hook, table, model, query)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct AuditRegistryBuilder {
    handlers: Vec<AuditHandler>,
}

impl AuditRegistryBuilder {
    pub fn insert(mut self, handler: impl InsertHandler + 'static) -> Self {
        self.handlers.push(AuditHandler::Insert(Box::new(handler)));
        self
    }

    pub fn insert_and_update(mut self, handler: impl UpdateHandler + 'static) -> Self {
        self.handlers
            .push(AuditHandler::InsertAndUpdate(Box::new(handler)));
        self
    }

    pub fn build(self) -> AuditRegistry {
        AuditRegistry {
            handlers: self.handlers,
        }
    }
}

/// 表上对应逻辑列的字段（按列名，其次按字段名）。
fn audited_field<'t>(table: &'t Table, column: &str) -> Option<&'t Field> {
    table
        .field_by_column(column)
        .or_else(|| table.field_named(column))
}

/// 字段为零值时写入；返回是否写入。
fn fill_if_zero(model: &mut dyn FieldAccess, field: &Field, value: SqlValue) -> Result<bool> {
    if model.is_zero_field(&field.name) != Some(true) {
        return Ok(false);
    }
    model.set_field_value(&field.name, value)?;
    tracing::debug!(
        table = model.table_name(),
        field = field.name.as_str(),
        "audit handler filled zero-valued field"
    );
    Ok(true)
}

/// 更新时写入审计列：已有 SET 子句就追加一条，否则写入模型字段。
fn touch(
    query: &mut dyn UpdateQuery,
    model: &mut dyn FieldAccess,
    field: &Field,
    value: SqlValue,
) -> Result<()> {
    let flavor = query.flavor();
    if query.set_count() > 0 {
        let column = match query.multi_table_alias() {
            Some(alias) => {
                let qualified = format!("{alias}.{}", field.column);
                Dialects::new()
                    .mysql(|| qualified.clone())
                    .sqlserver(|| qualified.clone())
                    .default_branch(|| field.column.clone())
                    .try_resolve(flavor, "audit set clause")?
            }
            None => field.column.clone(),
        };
        query.set(&column, Expr::value(value).with_flavor(flavor));
        tracing::debug!(column = column.as_str(), "audit handler appended SET clause");
    } else {
        model.set_field_value(&field.name, value)?;
        tracing::debug!(
            field = field.name.as_str(),
            "audit handler wrote field, statement has no SET clause"
        );
    }
    if flavor.supports_returning() {
        query.returning(&field.column);
    }
    Ok(())
}

/// 字符串主键 ID：按时间排序的 UUIDv7，32 位小写十六进制。
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// 为零值的字符串主键生成 ID。
#[derive(Debug, Clone)]
pub struct IdHandler {
    column: String,
}

impl Default for IdHandler {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdHandler {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl InsertHandler for IdHandler {
    fn column(&self) -> &str {
        &self.column
    }

    fn on_insert(
        &self,
        _hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        _query: &mut dyn InsertQuery,
    ) -> Result<()> {
        let Some(field) = audited_field(table, &self.column) else {
            return Ok(());
        };
        if !field.primary_key || field.kind != ValueKind::String {
            return Ok(());
        }
        fill_if_zero(model, field, SqlValue::from(generate_id()))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CreatedAtHandler {
    column: String,
}

impl Default for CreatedAtHandler {
    fn default() -> Self {
        Self {
            column: "created_at".to_string(),
        }
    }
}

impl CreatedAtHandler {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl InsertHandler for CreatedAtHandler {
    fn column(&self) -> &str {
        &self.column
    }

    fn on_insert(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        _query: &mut dyn InsertQuery,
    ) -> Result<()> {
        if let Some(field) = audited_field(table, &self.column) {
            fill_if_zero(model, field, SqlValue::Timestamp(hook.now()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UpdatedAtHandler {
    column: String,
}

impl Default for UpdatedAtHandler {
    fn default() -> Self {
        Self {
            column: "updated_at".to_string(),
        }
    }
}

impl UpdatedAtHandler {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl InsertHandler for UpdatedAtHandler {
    fn column(&self) -> &str {
        &self.column
    }

    fn on_insert(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        query: &mut dyn InsertQuery,
    ) -> Result<()> {
        let Some(field) = audited_field(table, &self.column) else {
            return Ok(());
        };
        fill_if_zero(model, field, SqlValue::Timestamp(hook.now()))?;
        if query.flavor().supports_returning() {
            query.returning(&field.column);
        }
        Ok(())
    }
}

impl UpdateHandler for UpdatedAtHandler {
    fn on_update(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        query: &mut dyn UpdateQuery,
    ) -> Result<()> {
        match audited_field(table, &self.column) {
            Some(field) => touch(query, model, field, SqlValue::Timestamp(hook.now())),
            None => Ok(()),
        }
    }
}

/// 创建人：取自具名参数（默认 [`OPERATOR_ARG`]）。
#[derive(Debug, Clone)]
pub struct CreatedByHandler {
    column: String,
    arg: String,
}

impl Default for CreatedByHandler {
    fn default() -> Self {
        Self::new("created_by", OPERATOR_ARG)
    }
}

impl CreatedByHandler {
    pub fn new(column: impl Into<String>, arg: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            arg: arg.into(),
        }
    }
}

impl InsertHandler for CreatedByHandler {
    fn column(&self) -> &str {
        &self.column
    }

    fn on_insert(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        _query: &mut dyn InsertQuery,
    ) -> Result<()> {
        let (Some(field), Some(actor)) = (audited_field(table, &self.column), hook.named(&self.arg))
        else {
            return Ok(());
        };
        fill_if_zero(model, field, actor.clone())?;
        Ok(())
    }
}

/// 更新人：取自具名参数（默认 [`OPERATOR_ARG`]）。
#[derive(Debug, Clone)]
pub struct UpdatedByHandler {
    column: String,
    arg: String,
}

impl Default for UpdatedByHandler {
    fn default() -> Self {
        Self::new("updated_by", OPERATOR_ARG)
    }
}

impl UpdatedByHandler {
    pub fn new(column: impl Into<String>, arg: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            arg: arg.into(),
        }
    }
}

impl InsertHandler for UpdatedByHandler {
    fn column(&self) -> &str {
        &self.column
    }

    fn on_insert(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        query: &mut dyn InsertQuery,
    ) -> Result<()> {
        let (Some(field), Some(actor)) = (audited_field(table, &self.column), hook.named(&self.arg))
        else {
            return Ok(());
        };
        fill_if_zero(model, field, actor.clone())?;
        if query.flavor().supports_returning() {
            query.returning(&field.column);
        }
        Ok(())
    }
}

impl UpdateHandler for UpdatedByHandler {
    fn on_update(
        &self,
        hook: &HookContext,
        table: &Table,
        model: &mut dyn FieldAccess,
        query: &mut dyn UpdateQuery,
    ) -> Result<()> {
        let (Some(field), Some(actor)) = (audited_field(table, &self.column), hook.named(&self.arg))
        else {
            tracing::debug!(arg = self.arg.as_str(), "no actor argument, skipping updated_by");
            return Ok(());
        };
        touch(query, model, field, actor.clone())
    }
}
