use sqlx::any::AnyRow;
use sqlx::{AnyConnection, Connection, Executor};
use tracing::{debug, info};

use seedsmith_core::{Dialect, Error, RedactedConnection, Result, redact_connection_string};

/// A single database connection plus the dialect it speaks.
///
/// Seeding needs one session for the whole pass: MySQL's
/// `FOREIGN_KEY_CHECKS` and SQLite's `foreign_keys` pragma are
/// connection-scoped, so a pool could run the truncate on a different
/// connection than the toggle.
pub struct SqlConnection {
    conn: AnyConnection,
    dialect: Dialect,
    target: RedactedConnection,
}

impl SqlConnection {
    /// Open a connection to `url` (`postgres://`, `mysql://`, `sqlite:`).
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let dialect = Dialect::from_url(url)?;
        let target = redact_connection_string(url);
        let conn = AnyConnection::connect(url).await.map_err(db_error)?;

        info!(
            event = "connected",
            engine = %dialect,
            target = %target.redacted
        );

        Ok(Self {
            conn,
            dialect,
            target,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Redacted connection metadata, safe to log.
    pub fn target(&self) -> &RedactedConnection {
        &self.target
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!(event = "execute", engine = %self.dialect, sql_len = sql.len());
        let result = (&mut self.conn).execute(sql).await.map_err(db_error)?;
        Ok(result.rows_affected())
    }

    /// Run a query with positional text binds and collect every row.
    pub async fn fetch_all(&mut self, sql: &str, binds: &[&str]) -> Result<Vec<AnyRow>> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(value.to_string());
        }
        query.fetch_all(&mut self.conn).await.map_err(db_error)
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(db_error)
    }
}

impl std::fmt::Debug for SqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlConnection")
            .field("dialect", &self.dialect)
            .field("target", &self.target.redacted)
            .finish()
    }
}

pub(crate) fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}
