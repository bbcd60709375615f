//! MergeBuilder：构建 `MERGE INTO ... USING ... ON ... WHEN ...` 语句。
//!
//! 每个 WHEN 分支可以附加一个守卫条件，并且只接受一个终结动作
//! （UPDATE / INSERT / DELETE / DO NOTHING）。链式调用中的错误先记录下来，
//! 在 [`MergeBuilder::build`] 时统一返回。

use crate::args::Args;
use crate::audit::UpdateQuery;
use crate::condition::ConditionBuilder;
use crate::context::QueryContext;
use crate::dispatch::Dialects;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::flavor::Flavor;
use crate::macros::{IntoStrings, collect_into_strings};
use crate::modifiers::{Arg, escape};
use crate::schema::Table;
use std::sync::Arc;

/// WHEN 分支的种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeBranchKind {
    Matched,
    NotMatched,
    NotMatchedBySource,
}

impl MergeBranchKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NotMatched => "not matched",
            Self::NotMatchedBySource => "not matched by source",
        }
    }

    fn clause(self) -> &'static str {
        match self {
            Self::Matched => " WHEN MATCHED",
            Self::NotMatched => " WHEN NOT MATCHED",
            Self::NotMatchedBySource => " WHEN NOT MATCHED BY SOURCE",
        }
    }

    /// 目标行不存在时只能 INSERT；目标行存在时只能 UPDATE / DELETE。
    fn accepts(self, action: ActionKind) -> bool {
        match action {
            ActionKind::DoNothing => true,
            ActionKind::Insert => self == Self::NotMatched,
            ActionKind::Update | ActionKind::Delete => self != Self::NotMatched,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Update,
    Insert,
    Delete,
    DoNothing,
}

impl ActionKind {
    fn name(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::DoNothing => "do nothing",
        }
    }
}

#[derive(Debug, Clone)]
enum MergeAction {
    Update(MergeUpdate),
    Insert(MergeInsert),
    Delete,
    DoNothing,
}

impl MergeAction {
    fn kind(&self) -> ActionKind {
        match self {
            Self::Update(_) => ActionKind::Update,
            Self::Insert(_) => ActionKind::Insert,
            Self::Delete => ActionKind::Delete,
            Self::DoNothing => ActionKind::DoNothing,
        }
    }
}

/// 列赋值表。同一列再次赋值时覆盖旧值，位置不变。
#[derive(Debug, Clone, Default)]
struct Assignments(Vec<(String, Expr)>);

impl Assignments {
    fn put(&mut self, column: String, value: Expr) {
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }
}

/// 源表中对应列的引用：`s.col`。
fn source_column(source_alias: &str, column: &str) -> Expr {
    Expr::raw(format!("{source_alias}.{column}"))
}

/// 表中除 `exclude`（列名或字段名）以外的全部列。
fn table_columns(table: &Table, exclude: Vec<String>) -> Vec<String> {
    table
        .fields()
        .iter()
        .filter(|f| !exclude.iter().any(|e| *e == f.column || *e == f.name))
        .map(|f| f.column.clone())
        .collect()
}

/// `THEN UPDATE SET ...` 的列赋值。
#[derive(Debug, Clone)]
pub struct MergeUpdate {
    flavor: Flavor,
    table: Arc<Table>,
    source_alias: String,
    assignments: Assignments,
}

impl MergeUpdate {
    /// `column = <绑定参数>`。
    pub fn set(&mut self, column: &str, value: impl Into<Arg>) -> &mut Self {
        self.assignments.put(column.to_string(), Expr::value(value));
        self
    }

    pub fn set_expr(&mut self, column: &str, value: Expr) -> &mut Self {
        self.assignments.put(column.to_string(), value);
        self
    }

    /// 从源行原样复制这些列：`col = s.col`。
    pub fn set_columns(&mut self, columns: impl IntoStrings) -> &mut Self {
        for column in collect_into_strings(columns) {
            let value = source_column(&self.source_alias, &column);
            self.assignments.put(column, value);
        }
        self
    }

    /// 从源行复制表的全部列，`exclude` 中的除外。
    pub fn set_all(&mut self, exclude: impl IntoStrings) -> &mut Self {
        let columns = table_columns(&self.table, collect_into_strings(exclude));
        self.set_columns(columns)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.len() == 0
    }

    pub fn columns(&self) -> Vec<&str> {
        self.assignments.columns().collect()
    }

    fn render(&self, args: &mut Args, sql: &mut String) {
        sql.push_str("UPDATE SET ");
        for (i, (column, value)) in self.assignments.0.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&escape(column));
            sql.push_str(" = ");
            sql.push_str(&args.add(value.clone()));
        }
    }
}

impl UpdateQuery for MergeUpdate {
    fn flavor(&self) -> Flavor {
        self.flavor
    }

    fn set_count(&self) -> usize {
        self.assignments.len()
    }

    fn set(&mut self, column: &str, value: Expr) {
        self.assignments.put(column.to_string(), value);
    }

    /// MERGE 分支没有 RETURNING。
    fn returning(&mut self, _column: &str) {}
}

/// `THEN INSERT (...) VALUES (...)` 的列与值。
#[derive(Debug, Clone)]
pub struct MergeInsert {
    table: Arc<Table>,
    source_alias: String,
    values: Assignments,
}

impl MergeInsert {
    pub fn value(&mut self, column: &str, value: impl Into<Arg>) -> &mut Self {
        self.values.put(column.to_string(), Expr::value(value));
        self
    }

    pub fn value_expr(&mut self, column: &str, value: Expr) -> &mut Self {
        self.values.put(column.to_string(), value);
        self
    }

    /// 从源行原样插入这些列。
    pub fn values(&mut self, columns: impl IntoStrings) -> &mut Self {
        for column in collect_into_strings(columns) {
            let value = source_column(&self.source_alias, &column);
            self.values.put(column, value);
        }
        self
    }

    /// 从源行插入表的全部列，`exclude` 中的除外。
    pub fn values_all(&mut self, exclude: impl IntoStrings) -> &mut Self {
        let columns = table_columns(&self.table, collect_into_strings(exclude));
        self.values(columns)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    fn render(&self, args: &mut Args, sql: &mut String) {
        let columns: Vec<String> = self.values.columns().map(escape).collect();
        sql.push_str("INSERT (");
        sql.push_str(&columns.join(", "));
        sql.push_str(") VALUES (");
        for (i, (_, value)) in self.values.0.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&args.add(value.clone()));
        }
        sql.push(')');
    }
}

/// 单个 WHEN 分支的构建器。
#[derive(Debug)]
pub struct MergeWhenBuilder {
    kind: MergeBranchKind,
    flavor: Flavor,
    table: Arc<Table>,
    source_alias: String,
    guard: ConditionBuilder,
    action: Option<MergeAction>,
    error: Option<Error>,
}

impl MergeWhenBuilder {
    pub fn kind(&self) -> MergeBranchKind {
        self.kind
    }

    /// 追加守卫条件（与已有守卫以 AND 连接）。
    pub fn and(&mut self, f: impl FnOnce(&mut ConditionBuilder)) -> &mut Self {
        self.guard.group(f);
        self
    }

    pub fn then_update(&mut self, f: impl FnOnce(&mut MergeUpdate)) -> &mut Self {
        let mut update = MergeUpdate {
            flavor: self.flavor,
            table: Arc::clone(&self.table),
            source_alias: self.source_alias.clone(),
            assignments: Assignments::default(),
        };
        f(&mut update);
        if update.is_empty() {
            return self.fail(Error::EmptyMergeBranch {
                branch: self.kind.name(),
            });
        }
        self.set_action(MergeAction::Update(update))
    }

    pub fn then_insert(&mut self, f: impl FnOnce(&mut MergeInsert)) -> &mut Self {
        let mut insert = MergeInsert {
            table: Arc::clone(&self.table),
            source_alias: self.source_alias.clone(),
            values: Assignments::default(),
        };
        f(&mut insert);
        if insert.is_empty() {
            return self.fail(Error::EmptyMergeBranch {
                branch: self.kind.name(),
            });
        }
        self.set_action(MergeAction::Insert(insert))
    }

    pub fn then_delete(&mut self) -> &mut Self {
        self.set_action(MergeAction::Delete)
    }

    pub fn then_do_nothing(&mut self) -> &mut Self {
        self.set_action(MergeAction::DoNothing)
    }

    fn fail(&mut self, err: Error) -> &mut Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }

    fn set_action(&mut self, action: MergeAction) -> &mut Self {
        let kind = action.kind();
        if self.action.is_some() {
            return self.fail(Error::DuplicateMergeAction {
                branch: self.kind.name(),
            });
        }
        if !self.kind.accepts(kind) {
            return self.fail(Error::MergeActionUnsupported {
                branch: self.kind.name(),
                action: kind.name(),
                flavor: self.flavor,
            });
        }
        self.action = Some(action);
        self
    }
}

#[derive(Debug, Clone)]
struct MergeBranch {
    kind: MergeBranchKind,
    guard: Option<Expr>,
    action: MergeAction,
}

/// MERGE 语句构建器，目标表为上下文绑定的表。
#[derive(Debug)]
pub struct MergeBuilder {
    ctx: QueryContext,
    table: Arc<Table>,
    source: Option<(Expr, String)>,
    on: ConditionBuilder,
    branches: Vec<MergeBranch>,
    error: Option<Error>,
}

impl MergeBuilder {
    /// 上下文未绑定表时返回 [`Error::MissingTable`]。
    pub fn new(ctx: QueryContext) -> Result<Self> {
        let table = Arc::clone(ctx.require_table("merge")?);
        Ok(Self {
            on: ctx.condition(),
            ctx,
            table,
            source: None,
            branches: Vec::new(),
            error: None,
        })
    }

    /// 数据源：表名、子查询等任意表达式，以及它的别名。
    pub fn using(&mut self, source: Expr, alias: &str) -> &mut Self {
        self.source = Some((source, alias.to_string()));
        self
    }

    pub fn using_table(&mut self, table: &str, alias: &str) -> &mut Self {
        self.using(Expr::raw(table), alias)
    }

    /// 匹配条件；多次调用时以 AND 连接。
    pub fn on(&mut self, f: impl FnOnce(&mut ConditionBuilder)) -> &mut Self {
        f(&mut self.on);
        self
    }

    pub fn when_matched(&mut self, f: impl FnOnce(&mut MergeWhenBuilder)) -> &mut Self {
        self.when(MergeBranchKind::Matched, f)
    }

    pub fn when_not_matched(&mut self, f: impl FnOnce(&mut MergeWhenBuilder)) -> &mut Self {
        self.when(MergeBranchKind::NotMatched, f)
    }

    pub fn when_not_matched_by_source(
        &mut self,
        f: impl FnOnce(&mut MergeWhenBuilder),
    ) -> &mut Self {
        self.when(MergeBranchKind::NotMatchedBySource, f)
    }

    fn fail(&mut self, err: Error) -> &mut Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }

    fn when(&mut self, kind: MergeBranchKind, f: impl FnOnce(&mut MergeWhenBuilder)) -> &mut Self {
        let Some((_, source_alias)) = &self.source else {
            return self.fail(Error::IncompleteMerge { part: "USING" });
        };
        let mut branch = MergeWhenBuilder {
            kind,
            flavor: self.ctx.flavor(),
            table: Arc::clone(&self.table),
            source_alias: source_alias.clone(),
            guard: self.ctx.condition(),
            action: None,
            error: None,
        };
        f(&mut branch);
        if let Some(err) = branch.error {
            return self.fail(err);
        }
        let Some(action) = branch.action else {
            return self.fail(Error::EmptyMergeBranch {
                branch: kind.name(),
            });
        };
        self.branches.push(MergeBranch {
            kind,
            guard: branch.guard.build(),
            action,
        });
        self
    }

    /// 渲染整条 MERGE 语句。
    ///
    /// PostgreSQL / SQLServer 的分支守卫写成 `WHEN ... AND <cond>`，Oracle 写成动作后的
    /// `WHERE <cond>`。DO NOTHING 只在 PostgreSQL 上输出，其它方言直接省略该分支。
    pub fn build(&self) -> Result<Expr> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let flavor = self.ctx.flavor();
        let oracle = Dialects::new()
            .postgres(|| false)
            .sqlserver(|| false)
            .oracle(|| true)
            .try_resolve(flavor, "merge")
            .map_err(|_| Error::MergeUnsupported { flavor })?;
        let (source, source_alias) = self
            .source
            .as_ref()
            .ok_or(Error::IncompleteMerge { part: "USING" })?;
        let on = self.on.build().ok_or(Error::IncompleteMerge { part: "ON" })?;
        if self.branches.is_empty() {
            return Err(Error::IncompleteMerge { part: "WHEN" });
        }

        let alias_sep = if oracle { " " } else { " AS " };
        let mut args = Args::with_flavor(flavor);
        let mut sql = String::from("MERGE INTO ");
        sql.push_str(&escape(self.table.name()));
        if self.table.alias_name() != self.table.name() {
            sql.push_str(alias_sep);
            sql.push_str(&escape(self.table.alias_name()));
        }
        sql.push_str(" USING ");
        sql.push_str(&args.add(source.clone()));
        sql.push_str(alias_sep);
        sql.push_str(&escape(source_alias));
        if oracle {
            sql.push_str(" ON (");
            sql.push_str(&args.add(on));
            sql.push(')');
        } else {
            sql.push_str(" ON ");
            sql.push_str(&args.add(on));
        }

        for branch in &self.branches {
            let action = branch.action.kind();
            if action == ActionKind::DoNothing && flavor != Flavor::PostgreSQL {
                tracing::debug!(
                    flavor = flavor.name(),
                    branch = branch.kind.name(),
                    "DO NOTHING merge branch omitted"
                );
                continue;
            }
            let oracle_rejects = branch.kind == MergeBranchKind::NotMatchedBySource
                || action == ActionKind::Delete;
            if oracle && oracle_rejects {
                return Err(Error::MergeActionUnsupported {
                    branch: branch.kind.name(),
                    action: action.name(),
                    flavor,
                });
            }

            sql.push_str(branch.kind.clause());
            if let (false, Some(guard)) = (oracle, &branch.guard) {
                sql.push_str(" AND ");
                sql.push_str(&args.add(guard.clone()));
            }
            sql.push_str(" THEN ");
            match &branch.action {
                MergeAction::Update(update) => update.render(&mut args, &mut sql),
                MergeAction::Insert(insert) => insert.render(&mut args, &mut sql),
                MergeAction::Delete => sql.push_str("DELETE"),
                MergeAction::DoNothing => sql.push_str("DO NOTHING"),
            }
            if let (true, Some(guard)) = (oracle, &branch.guard) {
                sql.push_str(" WHERE ");
                sql.push_str(&args.add(guard.clone()));
            }
        }
        if flavor == Flavor::SQLServer {
            sql.push(';');
        }
        Ok(Expr::from_parts(sql, args))
    }
}
