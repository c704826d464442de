//! SQL dialect capabilities.
//!
//! Everything that differs between backends while seeding (identifier
//! quoting, referential-integrity toggles, truncation) sits behind
//! [`DialectOps`]. The flush coordinator only talks to this trait, so adding
//! a backend means adding one implementation and one [`Dialect`] variant.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Database backend tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Detect the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or("").to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(Error::Unsupported(format!(
                "no dialect for connection scheme '{scheme}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Capability implementation for this dialect.
    pub fn ops(&self) -> &'static dyn DialectOps {
        match self {
            Dialect::Postgres => &PostgresOps,
            Dialect::MySql => &MySqlOps,
            Dialect::Sqlite => &SqliteOps,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dialect-specific SQL used by the seeding runtime.
pub trait DialectOps: Sync {
    fn quote_ident(&self, ident: &str) -> String;

    /// Quote a possibly schema-qualified table name.
    fn quote_table(&self, table: &str) -> String {
        table
            .split('.')
            .map(|part| self.quote_ident(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Statement that turns off foreign key enforcement for the session.
    /// `None` when the backend cannot do it without elevated privileges.
    fn disable_integrity(&self) -> Option<String>;

    /// Counterpart of [`DialectOps::disable_integrity`].
    fn enable_integrity(&self) -> Option<String>;

    /// Statement removing every row of `table`. Dialects that keep integrity
    /// enforcement on during truncation must cascade to dependent rows.
    fn truncate(&self, table: &str) -> String;

    /// Query returning a row when the catalog of auto-increment counters
    /// exists. `None` when [`DialectOps::truncate`] already restarts them.
    fn sequence_catalog_query(&self) -> Option<&'static str> {
        None
    }

    /// Statement restarting the auto-increment counter of `table` at 1.
    fn reset_sequence(&self, _table: &str) -> Option<String> {
        None
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    /// Escape the body of a single-quoted string literal.
    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }
}

struct PostgresOps;

impl DialectOps for PostgresOps {
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn disable_integrity(&self) -> Option<String> {
        // Disabling triggers requires superuser.
        None
    }

    fn enable_integrity(&self) -> Option<String> {
        None
    }

    fn truncate(&self, table: &str) -> String {
        format!(
            "TRUNCATE TABLE {} RESTART IDENTITY CASCADE",
            self.quote_table(table)
        )
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }
}

struct MySqlOps;

impl DialectOps for MySqlOps {
    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn disable_integrity(&self) -> Option<String> {
        Some("SET FOREIGN_KEY_CHECKS = 0".to_string())
    }

    fn enable_integrity(&self) -> Option<String> {
        Some("SET FOREIGN_KEY_CHECKS = 1".to_string())
    }

    fn truncate(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.quote_table(table))
    }

    fn escape_string(&self, value: &str) -> String {
        value.replace('\\', "\\\\").replace('\'', "''")
    }
}

struct SqliteOps;

impl DialectOps for SqliteOps {
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn disable_integrity(&self) -> Option<String> {
        Some("PRAGMA foreign_keys = OFF".to_string())
    }

    fn enable_integrity(&self) -> Option<String> {
        Some("PRAGMA foreign_keys = ON".to_string())
    }

    fn truncate(&self, table: &str) -> String {
        // No TRUNCATE statement; an unqualified DELETE uses the truncate optimization.
        format!("DELETE FROM {}", self.quote_table(table))
    }

    fn sequence_catalog_query(&self) -> Option<&'static str> {
        // Created lazily with the first AUTOINCREMENT table.
        Some("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'")
    }

    fn reset_sequence(&self, table: &str) -> Option<String> {
        // Counters are keyed by the bare table name.
        let name = table.rsplit('.').next().unwrap_or(table);
        Some(format!(
            "DELETE FROM sqlite_sequence WHERE name = '{}'",
            self.escape_string(name)
        ))
    }
}
