//! SQLite catalog queries via `sqlite_master` and the table-valued pragmas.

use async_trait::async_trait;

use seedsmith_core::Result;

use crate::catalog::{Catalog, KeyKind, RawColumn, RawKeyColumn, RawTable};
use crate::catalog::{flag, int, opt_text, text};
use crate::connection::SqlConnection;

pub struct SqliteCatalog;

const MAIN: &str = "main";

const LIST_TABLES: &str = r#"
    SELECT name, CASE WHEN type = 'view' THEN 1 ELSE 0 END
    FROM sqlite_master
    WHERE type IN ('table', 'view')
      AND name NOT LIKE 'sqlite_%'
    ORDER BY name
"#;

const TABLE_INFO: &str = r#"
    SELECT cid, name, type, "notnull", dflt_value, pk
    FROM pragma_table_info(?)
    ORDER BY cid
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT id, seq, "table", "from", "to", on_delete
    FROM pragma_foreign_key_list(?)
    ORDER BY id, seq
"#;

struct TableInfoRow {
    cid: i64,
    name: String,
    declared_type: String,
    not_null: bool,
    default: Option<String>,
    pk: i64,
}

async fn table_info(conn: &mut SqlConnection, table: &str) -> Result<Vec<TableInfoRow>> {
    let rows = conn.fetch_all(TABLE_INFO, &[table]).await?;
    rows.iter()
        .map(|row| {
            Ok(TableInfoRow {
                cid: int(row, 0)?,
                name: text(row, 1)?,
                declared_type: opt_text(row, 2)?.unwrap_or_default(),
                not_null: flag(row, 3)?,
                default: opt_text(row, 4)?,
                pk: int(row, 5)?,
            })
        })
        .collect()
}

/// A lone `INTEGER PRIMARY KEY` aliases the rowid and is filled by SQLite.
fn is_rowid_alias(row: &TableInfoRow, pk_columns: usize) -> bool {
    pk_columns == 1 && row.pk == 1 && row.declared_type.eq_ignore_ascii_case("integer")
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn database_name(&self, _conn: &mut SqlConnection) -> Result<Option<String>> {
        Ok(Some(MAIN.to_string()))
    }

    async fn default_schema(&self, _conn: &mut SqlConnection) -> Result<String> {
        Ok(MAIN.to_string())
    }

    async fn list_schemas(&self, _conn: &mut SqlConnection) -> Result<Vec<String>> {
        Ok(vec![MAIN.to_string()])
    }

    fn is_system_schema(&self, name: &str) -> bool {
        name == "temp"
    }

    async fn list_tables(&self, conn: &mut SqlConnection, _schema: &str) -> Result<Vec<RawTable>> {
        let rows = conn.fetch_all(LIST_TABLES, &[]).await?;
        rows.iter()
            .map(|row| {
                Ok(RawTable {
                    name: text(row, 0)?,
                    is_view: flag(row, 1)?,
                    comment: None,
                })
            })
            .collect()
    }

    async fn list_columns(
        &self,
        conn: &mut SqlConnection,
        _schema: &str,
        table: &str,
    ) -> Result<Vec<RawColumn>> {
        let rows = table_info(conn, table).await?;
        let pk_columns = rows.iter().filter(|row| row.pk > 0).count();

        Ok(rows
            .iter()
            .map(|row| {
                let declared = if row.declared_type.is_empty() {
                    "text".to_string()
                } else {
                    row.declared_type.clone()
                };
                let udt_name = declared
                    .split(['(', ' '])
                    .next()
                    .unwrap_or(&declared)
                    .to_lowercase();
                RawColumn {
                    ordinal_position: row.cid + 1,
                    name: row.name.clone(),
                    auto_increment: is_rowid_alias(row, pk_columns),
                    data_type: declared,
                    udt_name,
                    is_nullable: !row.not_null && row.pk == 0,
                    default: row.default.clone(),
                    character_max_length: None,
                    comment: None,
                }
            })
            .collect())
    }

    async fn list_keys(
        &self,
        conn: &mut SqlConnection,
        _schema: &str,
        table: &str,
    ) -> Result<Vec<RawKeyColumn>> {
        let mut keys: Vec<RawKeyColumn> = table_info(conn, table)
            .await?
            .into_iter()
            .filter(|row| row.pk > 0)
            .map(|row| RawKeyColumn {
                constraint: format!("{table}_pkey"),
                kind: KeyKind::Primary,
                column: row.name,
                position: row.pk,
                referenced_schema: None,
                referenced_table: None,
                referenced_column: None,
                on_delete: None,
            })
            .collect();

        let rows = conn.fetch_all(FOREIGN_KEYS, &[table]).await?;
        for row in &rows {
            keys.push(RawKeyColumn {
                constraint: format!("{table}_fk_{}", int(row, 0)?),
                kind: KeyKind::Foreign,
                column: text(row, 3)?,
                position: int(row, 1)?,
                referenced_schema: Some(MAIN.to_string()),
                referenced_table: Some(text(row, 2)?),
                referenced_column: opt_text(row, 4)?,
                on_delete: opt_text(row, 5)?,
            });
        }

        Ok(keys)
    }
}
