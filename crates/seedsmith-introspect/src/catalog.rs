//! Dialect-neutral catalog rows and the queries each dialect must answer.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::any::AnyRow;

use seedsmith_core::{Error, Result};

use crate::connection::SqlConnection;

pub struct RawTable {
    pub name: String,
    pub is_view: bool,
    pub comment: Option<String>,
}

pub struct RawColumn {
    pub ordinal_position: i64,
    pub name: String,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
    pub character_max_length: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Primary,
    Foreign,
    Unique,
}

/// One column of a key constraint; multi-column keys span several rows.
pub struct RawKeyColumn {
    pub constraint: String,
    pub kind: KeyKind,
    pub column: String,
    pub position: i64,
    pub referenced_schema: Option<String>,
    pub referenced_table: Option<String>,
    pub referenced_column: Option<String>,
    pub on_delete: Option<String>,
}

/// Catalog queries answered by every supported dialect.
#[async_trait]
pub trait Catalog: Sync {
    async fn database_name(&self, conn: &mut SqlConnection) -> Result<Option<String>>;

    /// Namespace used for unqualified table names.
    async fn default_schema(&self, conn: &mut SqlConnection) -> Result<String>;

    async fn list_schemas(&self, conn: &mut SqlConnection) -> Result<Vec<String>>;

    fn is_system_schema(&self, name: &str) -> bool;

    async fn list_tables(&self, conn: &mut SqlConnection, schema: &str) -> Result<Vec<RawTable>>;

    async fn list_columns(
        &self,
        conn: &mut SqlConnection,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawColumn>>;

    async fn list_keys(
        &self,
        conn: &mut SqlConnection,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawKeyColumn>>;
}

pub fn text(row: &AnyRow, idx: usize) -> Result<String> {
    row.try_get::<String, _>(idx).map_err(decode_error)
}

pub fn opt_text(row: &AnyRow, idx: usize) -> Result<Option<String>> {
    row.try_get::<Option<String>, _>(idx).map_err(decode_error)
}

pub fn int(row: &AnyRow, idx: usize) -> Result<i64> {
    row.try_get::<i64, _>(idx).map_err(decode_error)
}

pub fn opt_int(row: &AnyRow, idx: usize) -> Result<Option<i64>> {
    row.try_get::<Option<i64>, _>(idx).map_err(decode_error)
}

pub fn flag(row: &AnyRow, idx: usize) -> Result<bool> {
    Ok(int(row, idx)? != 0)
}

fn decode_error(err: sqlx::Error) -> Error {
    Error::Db(format!("catalog decode failed: {err}"))
}
