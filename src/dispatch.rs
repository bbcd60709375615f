//! 方言分派器：每个方言一个 thunk，外加一个 default。
//!
//! 解析顺序固定为 “方言专属 → default → 无”。无分支时，
//! 产出表达式的调用拿到 `NULL`（见 [`crate::ExprBuilder::dispatch`]），
//! 有副作用的调用通过 [`Dialects::try_resolve`] 得到配置错误。

use crate::error::{Error, Result};
use crate::flavor::Flavor;

type Thunk<'a, R> = Box<dyn FnOnce() -> R + 'a>;

/// 各方言实现的集合。thunk 只会被调用一次，且只调用命中的那个。
pub struct Dialects<'a, R> {
    postgres: Option<Thunk<'a, R>>,
    mysql: Option<Thunk<'a, R>>,
    sqlite: Option<Thunk<'a, R>>,
    sqlserver: Option<Thunk<'a, R>>,
    oracle: Option<Thunk<'a, R>>,
    fallback: Option<Thunk<'a, R>>,
}

impl<R> Default for Dialects<'_, R> {
    fn default() -> Self {
        Self {
            postgres: None,
            mysql: None,
            sqlite: None,
            sqlserver: None,
            oracle: None,
            fallback: None,
        }
    }
}

impl<'a, R> Dialects<'a, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn postgres(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.postgres = Some(Box::new(f));
        self
    }

    pub fn mysql(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.mysql = Some(Box::new(f));
        self
    }

    pub fn sqlite(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.sqlite = Some(Box::new(f));
        self
    }

    pub fn sqlserver(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.sqlserver = Some(Box::new(f));
        self
    }

    pub fn oracle(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.oracle = Some(Box::new(f));
        self
    }

    /// 没有方言专属实现时使用的分支。
    pub fn default_branch(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.fallback = Some(Box::new(f));
        self
    }

    fn take_specific(&mut self, flavor: Flavor) -> Option<Thunk<'a, R>> {
        match flavor {
            Flavor::PostgreSQL => self.postgres.take(),
            Flavor::MySQL => self.mysql.take(),
            Flavor::SQLite => self.sqlite.take(),
            Flavor::SQLServer => self.sqlserver.take(),
            Flavor::Oracle => self.oracle.take(),
            Flavor::ClickHouse => None,
        }
    }

    /// 解析并调用命中的 thunk；没有任何分支时返回 `None`。
    pub fn resolve(mut self, flavor: Flavor) -> Option<R> {
        if let Some(f) = self.take_specific(flavor) {
            return Some(f());
        }
        let f = self.fallback.take()?;
        tracing::trace!(flavor = flavor.name(), "dialect dispatch fell back to default");
        Some(f())
    }

    /// 同 [`Self::resolve`]，但没有分支时返回 [`Error::NoDialectBranch`]。
    pub fn try_resolve(self, flavor: Flavor, operation: &'static str) -> Result<R> {
        self.resolve(flavor)
            .ok_or(Error::NoDialectBranch { operation, flavor })
    }
}

#[cfg(test)]
mod tests {
    use super::Dialects;
    use crate::error::Error;
    use crate::flavor::Flavor;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_only_serves_every_flavor() {
        for flavor in Flavor::ALL {
            let got = Dialects::new().default_branch(|| "default").resolve(flavor);
            assert_eq!(got, Some("default"));
        }
    }

    #[test]
    fn specific_wins_over_default() {
        let got = Dialects::new()
            .sqlite(|| "sqlite")
            .default_branch(|| "default")
            .resolve(Flavor::SQLite);
        assert_eq!(got, Some("sqlite"));
    }

    #[test]
    fn specific_only_misses_other_flavor() {
        let got = Dialects::new().postgres(|| 1).resolve(Flavor::MySQL);
        assert_eq!(got, None);

        let err = Dialects::new()
            .postgres(|| 1)
            .try_resolve(Flavor::MySQL, "set audit column")
            .unwrap_err();
        assert_eq!(
            err,
            Error::NoDialectBranch {
                operation: "set audit column",
                flavor: Flavor::MySQL
            }
        );
    }

    #[test]
    fn clickhouse_has_no_specific_slot() {
        let got = Dialects::new()
            .mysql(|| "mysql")
            .default_branch(|| "default")
            .resolve(Flavor::ClickHouse);
        assert_eq!(got, Some("default"));
    }

    #[test]
    fn only_the_selected_thunk_runs() {
        let mut calls = Vec::new();
        {
            let calls = &mut calls;
            let _ = Dialects::new()
                .postgres(move || calls.push("postgres"))
                .resolve(Flavor::PostgreSQL);
        }
        assert_eq!(calls, vec!["postgres"]);
    }
}
