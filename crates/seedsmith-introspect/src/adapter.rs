use async_trait::async_trait;
use tracing::debug;

use seedsmith_core::{DatabaseSchema, Dialect, Result, SCHEMA_VERSION, Schema, Table};

use crate::catalog::Catalog;
use crate::connection::SqlConnection;
use crate::mapper;
use crate::mysql::MySqlCatalog;
use crate::options::IntrospectOptions;
use crate::postgres::PostgresCatalog;
use crate::sqlite::SqliteCatalog;

/// Trait implemented by database adapters that can introspect schemas.
#[async_trait]
pub trait Adapter {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Introspect the database and return a schema snapshot.
    async fn introspect(&mut self, opts: &IntrospectOptions) -> Result<DatabaseSchema>;

    /// Load a single table by `schema.table` or bare name, `None` when absent.
    async fn table(&mut self, name: &str) -> Result<Option<Table>>;
}

fn catalog_for(dialect: Dialect) -> &'static dyn Catalog {
    match dialect {
        Dialect::Postgres => &PostgresCatalog,
        Dialect::MySql => &MySqlCatalog,
        Dialect::Sqlite => &SqliteCatalog,
    }
}

#[async_trait]
impl Adapter for SqlConnection {
    fn engine(&self) -> &'static str {
        self.dialect().as_str()
    }

    async fn introspect(&mut self, opts: &IntrospectOptions) -> Result<DatabaseSchema> {
        let catalog = catalog_for(self.dialect());
        let database = catalog.database_name(self).await?;
        let schemas = mapper::filter_schemas(catalog.list_schemas(self).await?, opts, |name| {
            catalog.is_system_schema(name)
        });

        let mut schema_items = Vec::with_capacity(schemas.len());
        for schema_name in schemas {
            let raw_tables = catalog.list_tables(self, &schema_name).await?;
            let mut tables = Vec::new();
            for table in mapper::map_tables(raw_tables, opts) {
                tables.push(load_table(self, catalog, &schema_name, table, opts).await?);
            }

            tables.sort_by(|left, right| left.name.cmp(&right.name));
            debug!(schema = %schema_name, tables = tables.len(), "schema introspected");
            schema_items.push(Schema {
                name: schema_name,
                tables,
            });
        }

        schema_items.sort_by(|left, right| left.name.cmp(&right.name));

        Ok(DatabaseSchema {
            schema_version: SCHEMA_VERSION.to_string(),
            engine: self.engine().to_string(),
            database,
            schemas: schema_items,
        })
    }

    async fn table(&mut self, name: &str) -> Result<Option<Table>> {
        let catalog = catalog_for(self.dialect());
        let default_schema = catalog.default_schema(self).await?;
        let (schema_name, table_name) = mapper::split_table_name(name, &default_schema);

        let opts = IntrospectOptions {
            include_views: true,
            ..IntrospectOptions::default()
        };
        let raw_tables = catalog.list_tables(self, schema_name).await?;
        let Some(table) = mapper::map_tables(raw_tables, &opts)
            .into_iter()
            .find(|table| table.name == table_name)
        else {
            return Ok(None);
        };

        load_table(self, catalog, schema_name, table, &opts)
            .await
            .map(Some)
    }
}

async fn load_table(
    conn: &mut SqlConnection,
    catalog: &dyn Catalog,
    schema: &str,
    mut table: Table,
    opts: &IntrospectOptions,
) -> Result<Table> {
    let raw_columns = catalog.list_columns(conn, schema, &table.name).await?;
    table.columns = mapper::map_columns(raw_columns, opts);

    let raw_keys = catalog.list_keys(conn, schema, &table.name).await?;
    table.constraints = mapper::map_keys(raw_keys, schema);

    Ok(table)
}
