//! 查询构建上下文与引擎配置。

use crate::audit::{AuditRegistry, HookContext};
use crate::condition::ConditionBuilder;
use crate::error::{Error, Result};
use crate::expr_builder::ExprBuilder;
use crate::flavor::{Flavor, default_flavor};
use crate::merge::MergeBuilder;
use crate::schema::Table;
use std::sync::Arc;

/// 一条语句的构建上下文：绑定一个方言和（可选的）一张表。
///
/// 克隆成本很低；表描述符通过 `Arc` 共享。
#[derive(Debug, Clone)]
pub struct QueryContext {
    flavor: Flavor,
    table: Option<Arc<Table>>,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new(default_flavor())
    }
}

impl QueryContext {
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            table: None,
        }
    }

    pub fn with_table(mut self, table: Arc<Table>) -> Self {
        self.table = Some(table);
        self
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn table(&self) -> Option<&Arc<Table>> {
        self.table.as_ref()
    }

    /// 当前表的别名（未绑定表时为 `None`）。
    pub fn alias(&self) -> Option<&str> {
        self.table.as_deref().map(Table::alias_name)
    }

    /// 列引用解析：裸列名加上当前表别名前缀。
    ///
    /// 已带别名（含 `.`）、含占位标记 `$`、是函数调用或 `*` 的名字保持原样；
    /// 未绑定表时也保持原样。
    pub fn column_name(&self, name: &str) -> String {
        let qualified = name.contains(['.', '$', '(', '*']);
        match self.alias() {
            Some(alias) if !qualified && !alias.is_empty() => format!("{alias}.{name}"),
            _ => name.to_string(),
        }
    }

    /// 取得表描述符；未绑定时返回 [`Error::MissingTable`]。
    pub fn require_table(&self, operation: &'static str) -> Result<&Arc<Table>> {
        self.table.as_ref().ok_or(Error::MissingTable { operation })
    }

    pub fn expr(&self) -> ExprBuilder {
        ExprBuilder::new(self.clone())
    }

    pub fn condition(&self) -> ConditionBuilder {
        ConditionBuilder::new(self.clone())
    }

    /// MERGE 语句构建器，目标表为当前绑定的表。
    pub fn merge(&self) -> Result<MergeBuilder> {
        MergeBuilder::new(self.clone())
    }
}

/// 引擎配置：启动时构建一次，之后只读，显式传给创建查询上下文的地方。
#[derive(Debug, Clone)]
pub struct Engine {
    flavor: Flavor,
    audit: Arc<AuditRegistry>,
}

impl Engine {
    /// 使用标准审计处理器集合。
    pub fn new(flavor: Flavor) -> Self {
        Self::builder().flavor(flavor).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn audit(&self) -> &AuditRegistry {
        &self.audit
    }

    pub fn context(&self) -> QueryContext {
        QueryContext::new(self.flavor)
    }

    pub fn context_for(&self, table: Arc<Table>) -> QueryContext {
        QueryContext::new(self.flavor).with_table(table)
    }

    /// 每个连接一份的钩子上下文，`operator` 等具名参数由调用方填充。
    pub fn hook_context(&self) -> HookContext {
        HookContext::new(self.flavor)
    }
}

#[derive(Debug, Default)]
pub struct EngineBuilder {
    flavor: Option<Flavor>,
    audit: Option<AuditRegistry>,
}

impl EngineBuilder {
    pub fn flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = Some(flavor);
        self
    }

    pub fn audit_registry(mut self, registry: AuditRegistry) -> Self {
        self.audit = Some(registry);
        self
    }

    pub fn build(self) -> Engine {
        let flavor = self.flavor.unwrap_or_else(default_flavor);
        let audit = self.audit.unwrap_or_else(AuditRegistry::standard);
        tracing::debug!(
            flavor = flavor.name(),
            audit_handlers = audit.len(),
            "sql expression engine configured"
        );
        Engine {
            flavor,
            audit: Arc::new(audit),
        }
    }
}
