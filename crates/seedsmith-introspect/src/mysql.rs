//! MySQL / MariaDB catalog queries over `information_schema`.
//!
//! Text columns are cast to `CHAR` and numbers to `SIGNED` so the rows decode
//! through the `Any` driver regardless of the server's catalog collation.

use async_trait::async_trait;

use seedsmith_core::Result;

use crate::catalog::{Catalog, KeyKind, RawColumn, RawKeyColumn, RawTable};
use crate::catalog::{flag, int, opt_int, opt_text, text};
use crate::connection::SqlConnection;

pub struct MySqlCatalog;

const LIST_TABLES: &str = r#"
    SELECT
      CAST(TABLE_NAME AS CHAR),
      CAST(CASE WHEN TABLE_TYPE = 'VIEW' THEN 1 ELSE 0 END AS SIGNED),
      CAST(TABLE_COMMENT AS CHAR)
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = ?
    ORDER BY TABLE_NAME
"#;

const LIST_COLUMNS: &str = r#"
    SELECT
      CAST(ORDINAL_POSITION AS SIGNED),
      CAST(COLUMN_NAME AS CHAR),
      CAST(COLUMN_TYPE AS CHAR),
      CAST(DATA_TYPE AS CHAR),
      CAST(CASE WHEN IS_NULLABLE = 'YES' THEN 1 ELSE 0 END AS SIGNED),
      CAST(COLUMN_DEFAULT AS CHAR),
      CAST(CASE WHEN EXTRA LIKE '%auto_increment%' THEN 1 ELSE 0 END AS SIGNED),
      CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED),
      CAST(COLUMN_COMMENT AS CHAR)
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

const LIST_KEYS: &str = r#"
    SELECT
      CAST(k.CONSTRAINT_NAME AS CHAR),
      CAST(c.CONSTRAINT_TYPE AS CHAR),
      CAST(k.COLUMN_NAME AS CHAR),
      CAST(k.ORDINAL_POSITION AS SIGNED),
      CAST(k.REFERENCED_TABLE_SCHEMA AS CHAR),
      CAST(k.REFERENCED_TABLE_NAME AS CHAR),
      CAST(k.REFERENCED_COLUMN_NAME AS CHAR),
      CAST(r.DELETE_RULE AS CHAR)
    FROM information_schema.KEY_COLUMN_USAGE k
    JOIN information_schema.TABLE_CONSTRAINTS c
      ON c.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
     AND c.CONSTRAINT_NAME = k.CONSTRAINT_NAME
     AND c.TABLE_NAME = k.TABLE_NAME
    LEFT JOIN information_schema.REFERENTIAL_CONSTRAINTS r
      ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
     AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
     AND r.TABLE_NAME = k.TABLE_NAME
    WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ?
    ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
"#;

#[async_trait]
impl Catalog for MySqlCatalog {
    async fn database_name(&self, conn: &mut SqlConnection) -> Result<Option<String>> {
        let rows = conn.fetch_all("SELECT CAST(DATABASE() AS CHAR)", &[]).await?;
        Ok(match rows.first() {
            Some(row) => opt_text(row, 0)?,
            None => None,
        })
    }

    async fn default_schema(&self, conn: &mut SqlConnection) -> Result<String> {
        Ok(self.database_name(conn).await?.unwrap_or_default())
    }

    async fn list_schemas(&self, conn: &mut SqlConnection) -> Result<Vec<String>> {
        // Seeding targets the connected database only.
        Ok(self.database_name(conn).await?.into_iter().collect())
    }

    fn is_system_schema(&self, name: &str) -> bool {
        matches!(
            name,
            "information_schema" | "mysql" | "performance_schema" | "sys"
        )
    }

    async fn list_tables(&self, conn: &mut SqlConnection, schema: &str) -> Result<Vec<RawTable>> {
        let rows = conn.fetch_all(LIST_TABLES, &[schema]).await?;
        rows.iter()
            .map(|row| {
                Ok(RawTable {
                    name: text(row, 0)?,
                    is_view: flag(row, 1)?,
                    comment: opt_text(row, 2)?.filter(|comment| !comment.is_empty()),
                })
            })
            .collect()
    }

    async fn list_columns(
        &self,
        conn: &mut SqlConnection,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawColumn>> {
        let rows = conn.fetch_all(LIST_COLUMNS, &[schema, table]).await?;
        rows.iter()
            .map(|row| {
                Ok(RawColumn {
                    ordinal_position: int(row, 0)?,
                    name: text(row, 1)?,
                    data_type: text(row, 2)?,
                    udt_name: text(row, 3)?,
                    is_nullable: flag(row, 4)?,
                    default: opt_text(row, 5)?,
                    auto_increment: flag(row, 6)?,
                    character_max_length: opt_int(row, 7)?,
                    comment: opt_text(row, 8)?,
                })
            })
            .collect()
    }

    async fn list_keys(
        &self,
        conn: &mut SqlConnection,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawKeyColumn>> {
        let rows = conn.fetch_all(LIST_KEYS, &[schema, table]).await?;
        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            let kind = match text(row, 1)?.as_str() {
                "PRIMARY KEY" => KeyKind::Primary,
                "FOREIGN KEY" => KeyKind::Foreign,
                "UNIQUE" => KeyKind::Unique,
                _ => continue,
            };
            keys.push(RawKeyColumn {
                constraint: text(row, 0)?,
                kind,
                column: text(row, 2)?,
                position: int(row, 3)?,
                referenced_schema: opt_text(row, 4)?,
                referenced_table: opt_text(row, 5)?,
                referenced_column: opt_text(row, 6)?,
                on_delete: opt_text(row, 7)?,
            });
        }
        Ok(keys)
    }
}
