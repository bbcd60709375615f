//! SQL Flavor（方言）：决定占位符以及各函数的方言分派。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

/// 目标数据库方言。查询上下文生命周期内不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flavor {
    #[default]
    MySQL,
    PostgreSQL,
    SQLite,
    SQLServer,
    Oracle,
    /// 没有专属分派分支的方言，总是走 default。
    ClickHouse,
}

static DEFAULT_FLAVOR: AtomicU8 = AtomicU8::new(Flavor::MySQL as u8);
static DEFAULT_FLAVOR_LOCK: Mutex<()> = Mutex::new(());

impl Flavor {
    pub const ALL: [Flavor; 6] = [
        Flavor::MySQL,
        Flavor::PostgreSQL,
        Flavor::SQLite,
        Flavor::SQLServer,
        Flavor::Oracle,
        Flavor::ClickHouse,
    ];

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::MySQL,
            1 => Self::PostgreSQL,
            2 => Self::SQLite,
            3 => Self::SQLServer,
            4 => Self::Oracle,
            5 => Self::ClickHouse,
            _ => Self::MySQL,
        }
    }

    /// 方言名（小写），用于日志与错误信息。
    pub fn name(self) -> &'static str {
        match self {
            Self::MySQL => "mysql",
            Self::PostgreSQL => "postgres",
            Self::SQLite => "sqlite",
            Self::SQLServer => "sqlserver",
            Self::Oracle => "oracle",
            Self::ClickHouse => "clickhouse",
        }
    }

    /// 写入第 `index_1_based` 个参数的占位符。
    pub(crate) fn write_placeholder(self, index_1_based: usize, out: &mut String) {
        match self {
            Self::MySQL | Self::SQLite | Self::ClickHouse => out.push('?'),
            Self::PostgreSQL => {
                out.push('$');
                out.push_str(&index_1_based.to_string());
            }
            Self::SQLServer => {
                out.push_str("@p");
                out.push_str(&index_1_based.to_string());
            }
            Self::Oracle => {
                out.push(':');
                out.push_str(&index_1_based.to_string());
            }
        }
    }

    /// 是否支持 `RETURNING`（SQLServer 的 OUTPUT 由外部语句构建器处理，这里不算）。
    pub fn supports_returning(self) -> bool {
        matches!(self, Self::PostgreSQL | Self::SQLite)
    }
}

/// 获取当前全局默认 Flavor。
pub fn default_flavor() -> Flavor {
    Flavor::from_u8(DEFAULT_FLAVOR.load(Ordering::Relaxed))
}

/// 设置全局默认 Flavor，返回旧值。
pub fn set_default_flavor(flavor: Flavor) -> Flavor {
    let old = DEFAULT_FLAVOR.swap(flavor as u8, Ordering::Relaxed);
    Flavor::from_u8(old)
}

/// 修改全局默认 Flavor 的 RAII guard（持有全局锁，避免并行测试互相干扰）。
pub struct DefaultFlavorGuard {
    _lock: MutexGuard<'static, ()>,
    old: Flavor,
}

impl Drop for DefaultFlavorGuard {
    fn drop(&mut self) {
        set_default_flavor(self.old);
    }
}

/// 在一个作用域内临时设置默认 Flavor，退出作用域后自动恢复。
pub fn set_default_flavor_scoped(flavor: Flavor) -> DefaultFlavorGuard {
    let lock = DEFAULT_FLAVOR_LOCK
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    let old = set_default_flavor(flavor);
    DefaultFlavorGuard { _lock: lock, old }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "SQLite",
            Self::SQLServer => "SQLServer",
            Self::Oracle => "Oracle",
            Self::ClickHouse => "ClickHouse",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn placeholders() {
        let mut s = String::new();
        Flavor::PostgreSQL.write_placeholder(12, &mut s);
        Flavor::MySQL.write_placeholder(1, &mut s);
        Flavor::SQLServer.write_placeholder(3, &mut s);
        Flavor::Oracle.write_placeholder(4, &mut s);
        assert_eq!(s, "$12?@p3:4");
    }

    #[test]
    fn returning_support() {
        let with: Vec<Flavor> = Flavor::ALL
            .into_iter()
            .filter(|f| f.supports_returning())
            .collect();
        assert_eq!(with, vec![Flavor::PostgreSQL, Flavor::SQLite]);
    }

    #[test]
    fn scoped_default_flavor_restores() {
        let before = default_flavor();
        {
            let _g = set_default_flavor_scoped(Flavor::SQLite);
            assert_eq!(default_flavor(), Flavor::SQLite);
        }
        assert_eq!(default_flavor(), before);
    }
}
