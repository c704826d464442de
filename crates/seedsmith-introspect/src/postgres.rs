//! PostgreSQL catalog queries.
//!
//! Every projected column is cast to `text` or `bigint` so the rows decode
//! through the `Any` driver.

use async_trait::async_trait;

use seedsmith_core::Result;

use crate::catalog::{Catalog, KeyKind, RawColumn, RawKeyColumn, RawTable};
use crate::catalog::{flag, int, opt_int, opt_text, text};
use crate::connection::SqlConnection;

pub struct PostgresCatalog;

const LIST_TABLES: &str = r#"
    select
      c.relname::text,
      (case when c.relkind in ('v', 'm') then 1 else 0 end)::bigint,
      pg_catalog.obj_description(c.oid, 'pg_class')::text
    from pg_class c
    join pg_namespace n on n.oid = c.relnamespace
    where n.nspname = $1
      and c.relkind in ('r', 'p', 'v', 'm')
    order by c.relname
"#;

const LIST_COLUMNS: &str = r#"
    select
      a.attnum::bigint,
      a.attname::text,
      pg_catalog.format_type(a.atttypid, a.atttypmod)::text,
      t.typname::text,
      (case when a.attnotnull then 0 else 1 end)::bigint,
      pg_get_expr(ad.adbin, ad.adrelid)::text,
      (case
         when a.attidentity <> '' then 1
         when coalesce(pg_get_expr(ad.adbin, ad.adrelid), '') like 'nextval(%' then 1
         else 0
       end)::bigint,
      (case
         when t.typname in ('varchar', 'bpchar') and a.atttypmod > 4 then a.atttypmod - 4
         else null
       end)::bigint,
      pg_catalog.col_description(a.attrelid, a.attnum)::text
    from pg_attribute a
    join pg_class c on c.oid = a.attrelid
    join pg_namespace n on n.oid = c.relnamespace
    join pg_type t on t.oid = a.atttypid
    left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
    where n.nspname = $1
      and c.relname = $2
      and a.attnum > 0
      and not a.attisdropped
    order by a.attnum
"#;

const LIST_KEYS: &str = r#"
    select
      con.conname::text,
      con.contype::text,
      a.attname::text,
      k.ord::bigint,
      rn.nspname::text,
      rc.relname::text,
      ra.attname::text,
      (case con.confdeltype
         when 'a' then 'NO ACTION'
         when 'r' then 'RESTRICT'
         when 'c' then 'CASCADE'
         when 'n' then 'SET NULL'
         when 'd' then 'SET DEFAULT'
         else null
       end)::text
    from pg_constraint con
    join pg_class c on c.oid = con.conrelid
    join pg_namespace n on n.oid = c.relnamespace
    cross join lateral unnest(con.conkey) with ordinality as k(attnum, ord)
    join pg_attribute a on a.attrelid = c.oid and a.attnum = k.attnum
    left join pg_class rc on rc.oid = con.confrelid
    left join pg_namespace rn on rn.oid = rc.relnamespace
    left join pg_attribute ra
      on ra.attrelid = con.confrelid and ra.attnum = con.confkey[k.ord::int]
    where n.nspname = $1
      and c.relname = $2
      and con.contype in ('p', 'u', 'f')
    order by con.conname, k.ord
"#;

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn database_name(&self, conn: &mut SqlConnection) -> Result<Option<String>> {
        let rows = conn
            .fetch_all("select current_database()::text", &[])
            .await?;
        rows.first().map(|row| text(row, 0)).transpose()
    }

    async fn default_schema(&self, conn: &mut SqlConnection) -> Result<String> {
        let rows = conn
            .fetch_all("select coalesce(current_schema(), 'public')::text", &[])
            .await?;
        match rows.first() {
            Some(row) => text(row, 0),
            None => Ok("public".to_string()),
        }
    }

    async fn list_schemas(&self, conn: &mut SqlConnection) -> Result<Vec<String>> {
        let rows = conn
            .fetch_all("select nspname::text from pg_namespace order by nspname", &[])
            .await?;
        rows.iter().map(|row| text(row, 0)).collect()
    }

    fn is_system_schema(&self, name: &str) -> bool {
        name.starts_with("pg_") || name == "information_schema"
    }

    async fn list_tables(&self, conn: &mut SqlConnection, schema: &str) -> Result<Vec<RawTable>> {
        let rows = conn.fetch_all(LIST_TABLES, &[schema]).await?;
        rows.iter()
            .map(|row| {
                Ok(RawTable {
                    name: text(row, 0)?,
                    is_view: flag(row, 1)?,
                    comment: opt_text(row, 2)?,
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
        rows.iter()
            .map(|row| {
                let kind = match text(row, 1)?.as_str() {
                    "p" => KeyKind::Primary,
                    "f" => KeyKind::Foreign,
                    _ => KeyKind::Unique,
                };
                Ok(RawKeyColumn {
                    constraint: text(row, 0)?,
                    kind,
                    column: text(row, 2)?,
                    position: int(row, 3)?,
                    referenced_schema: opt_text(row, 4)?,
                    referenced_table: opt_text(row, 5)?,
                    referenced_column: opt_text(row, 6)?,
                    on_delete: opt_text(row, 7)?,
                })
            })
            .collect()
    }
}
