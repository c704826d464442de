//! Seeders: per-table units, the schema-driven default and the umbrella.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use seedsmith_core::{DatabaseSchema, SqlValue, Table, TableKind, build_fk_graph_report};

use crate::classify::{Classifier, GeneratorAssignment, TIMESTAMP_COLUMNS};
use crate::codegen::seeder_class_name;
use crate::error::{Result, SeedError};
use crate::faker::ValueSource;
use crate::flush::FlushReport;
use crate::session::{SeedSession, SessionOptions};
use crate::target::SeedTarget;

/// Entry point used when no method is selected.
pub const DEFAULT_METHOD: &str = "run";

/// Name the umbrella seeder answers to.
pub const DATABASE_SEEDER: &str = "DatabaseSeeder";

/// A unit that populates one table.
#[async_trait]
pub trait TableSeeder: Send + Sync {
    fn name(&self) -> &str;

    /// Table written by this seeder, used to order the umbrella run.
    fn table(&self) -> Option<&str> {
        None
    }

    /// Methods accepted by [`TableSeeder::call`].
    fn methods(&self) -> &[&'static str] {
        &[DEFAULT_METHOD]
    }

    fn has_method(&self, method: &str) -> bool {
        self.methods().contains(&method)
    }

    async fn run(&self, session: &mut SeedSession<'_>, count: u64) -> Result<()>;

    /// Invoke `method`. Seeders with extra entry points override this.
    async fn call(&self, method: &str, session: &mut SeedSession<'_>, count: u64) -> Result<()> {
        if method == DEFAULT_METHOD {
            return self.run(session, count).await;
        }
        Err(SeedError::UnknownMethod {
            seeder: self.name().to_string(),
            method: method.to_string(),
        })
    }
}

/// Seeder driven by the classifier output for one table of a snapshot.
pub struct SchemaTableSeeder {
    name: String,
    table: String,
    schema: Arc<DatabaseSchema>,
    classifier: Classifier,
}

impl SchemaTableSeeder {
    /// `table` is a bare or `schema.table` name inside `schema`.
    pub fn new(table: impl Into<String>, schema: Arc<DatabaseSchema>) -> Self {
        let table = table.into();
        Self {
            name: seeder_class_name(&table),
            table,
            schema,
            classifier: Classifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    fn table_schema(&self) -> Result<&Table> {
        self.schema
            .find_table(&self.table)
            .ok_or_else(|| SeedError::TableNotFound(self.table.clone()))
    }

    fn assignments(&self, count: u64) -> Result<Vec<GeneratorAssignment>> {
        let table = self.table_schema()?;
        Ok(self.classifier.classify_table(table, &self.schema, count))
    }

    /// Log the strategy of every column without inserting anything.
    pub async fn plan(&self, _session: &mut SeedSession<'_>, count: u64) -> Result<()> {
        for assignment in self.assignments(count)? {
            let foreign_key = assignment
                .foreign_key
                .as_ref()
                .map(|fk| format!("{}.{}", fk.table, fk.pk_column));
            info!(
                event = "column_plan",
                seeder = %self.name,
                table = %self.table,
                column = %assignment.column,
                strategy = %assignment.strategy.tag(),
                foreign_key = foreign_key.as_deref().unwrap_or("-")
            );
        }
        Ok(())
    }
}

#[async_trait]
impl TableSeeder for SchemaTableSeeder {
    fn name(&self) -> &str {
        &self.name
    }

    fn table(&self) -> Option<&str> {
        Some(&self.table)
    }

    fn methods(&self) -> &[&'static str] {
        &[DEFAULT_METHOD, "plan"]
    }

    async fn run(&self, session: &mut SeedSession<'_>, count: u64) -> Result<()> {
        let table = self.table_schema()?;
        let assignments = self.classifier.classify_table(table, &self.schema, count);
        let has_timestamps = TIMESTAMP_COLUMNS.iter().any(|column| table.has_column(column));
        if assignments.is_empty() && !has_timestamps {
            warn!(
                event = "nothing_to_seed",
                seeder = %self.name,
                table = %self.table,
                "no column of the table takes generated values"
            );
            return Ok(());
        }

        let width = assignments
            .iter()
            .filter(|assignment| assignment.foreign_key.is_some())
            .count();
        let foreign_keys = if width > 0 {
            Some(session.allocate_foreign_keys(count, width)?)
        } else {
            None
        };

        let columns: Vec<String> = assignments
            .iter()
            .map(|assignment| assignment.column.clone())
            .collect();
        let mut rows = Vec::with_capacity(count as usize);
        for row in 1..=count {
            let keys = foreign_keys
                .as_ref()
                .and_then(|set| set.get(row))
                .unwrap_or_default();
            rows.push(generate_row(&assignments, keys, session.values()));
        }

        session.insert_many(&self.table, columns, rows).await
    }

    async fn call(&self, method: &str, session: &mut SeedSession<'_>, count: u64) -> Result<()> {
        match method {
            DEFAULT_METHOD => self.run(session, count).await,
            "plan" => self.plan(session, count).await,
            other => Err(SeedError::UnknownMethod {
                seeder: self.name.clone(),
                method: other.to_string(),
            }),
        }
    }
}

/// Foreign-key columns take the allocated tuple in order; the rest are
/// generated.
fn generate_row(
    assignments: &[GeneratorAssignment],
    keys: &[i64],
    values: &mut dyn ValueSource,
) -> Vec<SqlValue> {
    let mut slots = keys.iter();
    assignments
        .iter()
        .map(|assignment| match assignment.foreign_key {
            Some(_) => slots.next().map_or(SqlValue::Null, |key| SqlValue::Int(*key)),
            None => values.value_for(&assignment.strategy),
        })
        .collect()
}

/// Table seeders by name.
#[derive(Default)]
pub struct SeederRegistry {
    seeders: BTreeMap<String, Box<dyn TableSeeder>>,
}

impl SeederRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`SchemaTableSeeder`] per base table of `schema`. Names are
    /// qualified only when the snapshot holds several namespaces.
    pub fn from_schema(schema: Arc<DatabaseSchema>) -> Self {
        let qualify = schema.schemas.len() > 1;
        let mut registry = Self::new();
        for (namespace, table) in schema.tables() {
            if table.kind != TableKind::Table {
                continue;
            }
            let key = if qualify {
                format!("{namespace}.{}", table.name)
            } else {
                table.name.clone()
            };
            registry.register(Box::new(SchemaTableSeeder::new(key, Arc::clone(&schema))));
        }
        registry
    }

    /// Register `seeder`, replacing a seeder of the same name.
    pub fn register(&mut self, seeder: Box<dyn TableSeeder>) {
        let name = seeder.name().to_string();
        if self.seeders.insert(name.clone(), seeder).is_some() {
            warn!(event = "seeder_replaced", seeder = %name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn TableSeeder> {
        self.seeders.get(name).map(|seeder| seeder.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.seeders.keys().map(String::as_str)
    }

    /// Seeders in name order.
    pub fn seeders(&self) -> impl Iterator<Item = &dyn TableSeeder> {
        self.seeders.values().map(|seeder| seeder.as_ref())
    }

    pub fn len(&self) -> usize {
        self.seeders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeders.is_empty()
    }
}

impl std::fmt::Debug for SeederRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeederRegistry")
            .field("seeders", &self.seeders.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Outcome of one seeder inside an umbrella run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeederRun {
    pub seeder: String,
    pub report: FlushReport,
}

/// Umbrella seeder running every registered seeder, parents first.
pub struct DatabaseSeeder<'r> {
    registry: &'r SeederRegistry,
    schema: Option<&'r DatabaseSchema>,
}

impl<'r> DatabaseSeeder<'r> {
    pub fn new(registry: &'r SeederRegistry) -> Self {
        Self {
            registry,
            schema: None,
        }
    }

    /// Order seeders by the foreign keys of `schema`.
    pub fn with_schema(mut self, schema: &'r DatabaseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn methods(&self) -> &'static [&'static str] {
        &[DEFAULT_METHOD, "plan"]
    }

    /// Seeders with every referenced table ahead of its dependents.
    ///
    /// Seeders without a known table, and every seeder when the foreign
    /// keys form a cycle, follow in name order.
    pub fn order(&self) -> Vec<&'r dyn TableSeeder> {
        let mut seeders: Vec<&'r dyn TableSeeder> = self.registry.seeders().collect();
        let Some(schema) = self.schema else {
            return seeders;
        };

        let report = build_fk_graph_report(schema);
        let Some(topo_order) = report.topo_order else {
            warn!(
                event = "seed_order_cycle",
                tables = ?report.cycle.unwrap_or_default(),
                "foreign keys form a cycle; seeding in name order"
            );
            return seeders;
        };

        let rank = |seeder: &&'r dyn TableSeeder| {
            seeder
                .table()
                .and_then(|table| {
                    topo_order.iter().position(|key| {
                        key == table
                            || key
                                .split_once('.')
                                .is_some_and(|(_, bare)| !table.contains('.') && bare == table)
                    })
                })
                .unwrap_or(usize::MAX)
        };
        seeders.sort_by_key(rank);
        seeders
    }

    /// Run `method` on every seeder that has it, each in its own session.
    pub async fn run(
        &self,
        db: &mut dyn SeedTarget,
        values: &mut dyn ValueSource,
        method: &str,
        count: u64,
        options: SessionOptions,
    ) -> Result<Vec<SeederRun>> {
        let mut runs = Vec::new();
        for seeder in self.order() {
            if !seeder.has_method(method) {
                info!(
                    event = "seeder_skipped",
                    seeder = seeder.name(),
                    method,
                    "seeder has no such method"
                );
                continue;
            }
            let report =
                SeedSession::execute(&mut *db, &mut *values, seeder, method, count, options)
                    .await?;
            runs.push(SeederRun {
                seeder: seeder.name().to_string(),
                report,
            });
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedValueSource, MemoryTarget, table};
    use seedsmith_core::{Constraint, Dialect, FkAction, ForeignKey, PrimaryKey, Schema};

    fn with_keys(mut table: Table, parent: Option<(&str, &str)>) -> Table {
        table.constraints.push(Constraint::PrimaryKey(PrimaryKey {
            name: None,
            columns: vec!["id".to_string()],
        }));
        if let Some((column, referenced)) = parent {
            table.constraints.push(Constraint::ForeignKey(ForeignKey {
                name: None,
                columns: vec![column.to_string()],
                referenced_schema: "main".to_string(),
                referenced_table: referenced.to_string(),
                referenced_columns: vec!["id".to_string()],
                on_delete: FkAction::Cascade,
            }));
        }
        table
    }

    fn snapshot() -> DatabaseSchema {
        let authors = with_keys(
            table("authors", &[("id", "integer", true), ("name", "text", false)]),
            None,
        );
        let books = with_keys(
            table(
                "books",
                &[
                    ("id", "integer", true),
                    ("author_id", "integer", false),
                    ("title", "varchar(80)", false),
                    ("created_at", "datetime", false),
                ],
            ),
            Some(("author_id", "authors")),
        );
        let audit = with_keys(table("audit", &[("id", "integer", true)]), None);
        DatabaseSchema {
            schema_version: "0.1".to_string(),
            engine: "sqlite".to_string(),
            database: None,
            schemas: vec![Schema {
                name: "main".to_string(),
                tables: vec![audit, authors, books],
            }],
        }
    }

    fn target(schema: &DatabaseSchema) -> MemoryTarget {
        schema
            .tables()
            .fold(MemoryTarget::new(Dialect::Sqlite), |db, (_, table)| {
                db.with_table(table.clone())
            })
    }

    #[test]
    fn registry_names_follow_tables() {
        let registry = SeederRegistry::from_schema(Arc::new(snapshot()));
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            ["AuditTableSeeder", "AuthorsTableSeeder", "BooksTableSeeder"]
        );
    }

    #[test]
    fn umbrella_orders_parents_first() {
        let schema = Arc::new(snapshot());
        let registry = SeederRegistry::from_schema(Arc::clone(&schema));
        let umbrella = DatabaseSeeder::new(&registry).with_schema(&schema);

        let order: Vec<&str> = umbrella.order().iter().map(|seeder| seeder.name()).collect();
        let authors = order.iter().position(|name| *name == "AuthorsTableSeeder");
        let books = order.iter().position(|name| *name == "BooksTableSeeder");
        assert!(authors < books);
    }

    #[tokio::test]
    async fn schema_seeder_fills_foreign_keys_from_allocator() {
        let schema = Arc::new(snapshot());
        let mut db = target(&schema);
        let mut values = FixedValueSource;
        let seeder = SchemaTableSeeder::new("books", Arc::clone(&schema));

        let report = SeedSession::execute(
            &mut db,
            &mut values,
            &seeder,
            DEFAULT_METHOD,
            1,
            SessionOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.rows_for("books"), Some(1));
        let insert = db.executed.last().unwrap();
        assert!(insert.starts_with(
            "INSERT INTO \"books\" (\"author_id\", \"title\", \"created_at\") VALUES (1, 'lorem ipsum', '"
        ));
    }

    #[tokio::test]
    async fn plan_inserts_nothing() {
        let schema = Arc::new(snapshot());
        let mut db = target(&schema);
        let mut values = FixedValueSource;
        let seeder = SchemaTableSeeder::new("books", Arc::clone(&schema));

        let report = SeedSession::execute(
            &mut db,
            &mut values,
            &seeder,
            "plan",
            5,
            SessionOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report, FlushReport::default());
        assert!(db.executed.is_empty());
    }

    #[tokio::test]
    async fn zero_rows_leave_the_table_alone() {
        let schema = Arc::new(snapshot());
        let mut db = target(&schema);
        let mut values = FixedValueSource;
        let seeder = SchemaTableSeeder::new("books", Arc::clone(&schema));

        let report = SeedSession::execute(
            &mut db,
            &mut values,
            &seeder,
            DEFAULT_METHOD,
            0,
            SessionOptions::default(),
        )
        .await
        .unwrap();

        assert!(report.truncated.is_empty());
        assert!(report.tables.is_empty());
        assert!(db.executed.is_empty());
    }

    #[tokio::test]
    async fn umbrella_runs_each_seeder_in_its_own_session() {
        let schema = Arc::new(snapshot());
        let registry = SeederRegistry::from_schema(Arc::clone(&schema));
        let mut db = target(&schema);
        let mut values = FixedValueSource;

        let runs = DatabaseSeeder::new(&registry)
            .with_schema(&schema)
            .run(
                &mut db,
                &mut values,
                DEFAULT_METHOD,
                1,
                SessionOptions::default(),
            )
            .await
            .unwrap();

        let seeded: Vec<&str> = runs
            .iter()
            .filter(|run| run.report.total_rows() > 0)
            .map(|run| run.seeder.as_str())
            .collect();
        assert_eq!(seeded, ["AuthorsTableSeeder", "BooksTableSeeder"]);
        assert_eq!(runs.len(), 3);

        let deletes: Vec<&String> = db
            .executed
            .iter()
            .filter(|sql| sql.starts_with("DELETE"))
            .collect();
        assert_eq!(deletes, ["DELETE FROM \"authors\"", "DELETE FROM \"books\""]);
    }
}
