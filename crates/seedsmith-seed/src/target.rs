use async_trait::async_trait;

use seedsmith_core::{Dialect, Table};
use seedsmith_introspect::{Adapter, SqlConnection};

use crate::error::Result;

/// Database a seeding session writes to.
#[async_trait]
pub trait SeedTarget: Send {
    fn dialect(&self) -> Dialect;

    /// Execute one statement, returning the affected row count.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Whether `sql` returns at least one row.
    async fn query_exists(&mut self, sql: &str) -> Result<bool>;

    /// Live schema of `name`, `None` when the table does not exist.
    async fn table(&mut self, name: &str) -> Result<Option<Table>>;
}

#[async_trait]
impl SeedTarget for SqlConnection {
    fn dialect(&self) -> Dialect {
        SqlConnection::dialect(self)
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        Ok(SqlConnection::execute(self, sql).await?)
    }

    async fn query_exists(&mut self, sql: &str) -> Result<bool> {
        Ok(!self.fetch_all(sql, &[]).await?.is_empty())
    }

    async fn table(&mut self, name: &str) -> Result<Option<Table>> {
        Ok(Adapter::table(self, name).await?)
    }
}
