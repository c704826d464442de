//! One seeding pass: buffered inserts with a guaranteed final flush.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Timelike, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use seedsmith_core::{Dialect, SqlValue, Table};

use crate::allocator::{AllocatorOptions, ForeignKeyTupleSet, allocate_with};
use crate::batch::{InsertBatch, Row};
use crate::error::{Result, SeedError};
use crate::faker::ValueSource;
use crate::flush::{FlushOptions, FlushReport, flush};
use crate::seeder::TableSeeder;
use crate::target::SeedTarget;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub flush: FlushOptions,
    pub allocator: AllocatorOptions,
}

/// Buffer, tracker and timestamp of one seeder invocation.
///
/// Rows reach the database only through [`SeedSession::finish`].
/// [`SeedSession::execute`] calls it on every exit path.
pub struct SeedSession<'a> {
    run_id: Uuid,
    db: &'a mut dyn SeedTarget,
    values: &'a mut dyn ValueSource,
    options: SessionOptions,
    schemas: HashMap<String, Table>,
    batch: Option<InsertBatch>,
}

impl<'a> SeedSession<'a> {
    pub fn new(
        db: &'a mut dyn SeedTarget,
        values: &'a mut dyn ValueSource,
        options: SessionOptions,
    ) -> Self {
        let now = Utc::now().naive_utc();
        let timestamp = now.with_nanosecond(0).unwrap_or(now);
        Self {
            run_id: Uuid::new_v4(),
            db,
            values,
            options,
            schemas: HashMap::new(),
            batch: Some(InsertBatch::new(timestamp)),
        }
    }

    /// Run `method` of `seeder` in a fresh session and flush it.
    ///
    /// The buffer is flushed even when the seeder fails; the seeder's error
    /// then wins over a flush error, which is only logged.
    pub async fn execute(
        db: &'a mut dyn SeedTarget,
        values: &'a mut dyn ValueSource,
        seeder: &dyn TableSeeder,
        method: &str,
        count: u64,
        options: SessionOptions,
    ) -> Result<FlushReport> {
        let mut session = SeedSession::new(db, values, options);
        info!(
            event = "seeder_started",
            run_id = %session.run_id,
            seeder = seeder.name(),
            method,
            count,
            skip_truncate = options.flush.skip_truncate
        );

        let called = seeder.call(method, &mut session, count).await;
        let flushed = session.finish().await;

        match (called, flushed) {
            (Ok(()), flushed) => flushed,
            (Err(err), Ok(report)) => {
                warn!(
                    event = "seeder_failed",
                    seeder = seeder.name(),
                    flushed_rows = report.total_rows(),
                    error = %err
                );
                Err(err)
            }
            (Err(err), Err(flush_err)) => {
                error!(
                    event = "flush_failed",
                    seeder = seeder.name(),
                    error = %flush_err
                );
                Err(err)
            }
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Shared value used for `created_at` / `updated_at`.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.batch.as_ref().map(InsertBatch::timestamp)
    }

    pub fn values(&mut self) -> &mut dyn ValueSource {
        &mut *self.values
    }

    /// Live schema of `table`, loaded once per session.
    pub async fn schema(&mut self, table: &str) -> Result<&Table> {
        if !self.schemas.contains_key(table) {
            let schema = self
                .db
                .table(table)
                .await?
                .ok_or_else(|| SeedError::TableNotFound(table.to_string()))?;
            self.schemas.insert(table.to_string(), schema);
        }
        self.schemas
            .get(table)
            .ok_or_else(|| SeedError::TableNotFound(table.to_string()))
    }

    pub async fn insert(&mut self, table: &str, row: Row) -> Result<()> {
        self.schema(table).await?;
        let (Some(batch), Some(schema)) = (self.batch.as_mut(), self.schemas.get(table)) else {
            return Err(finished());
        };
        batch.insert(table, schema, row)
    }

    pub async fn insert_many(
        &mut self,
        table: &str,
        columns: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<()> {
        self.schema(table).await?;
        let (Some(batch), Some(schema)) = (self.batch.as_mut(), self.schemas.get(table)) else {
            return Err(finished());
        };
        batch.insert_many(table, schema, columns, rows)
    }

    /// Distinct foreign-key tuples of `width` values in `[1, count]`.
    pub fn allocate_foreign_keys(&mut self, count: u64, width: usize) -> Result<ForeignKeyTupleSet> {
        allocate_with(count, width, &mut *self.values, &self.options.allocator)
    }

    pub fn buffered_rows(&self) -> u64 {
        self.batch.as_ref().map_or(0, InsertBatch::row_count)
    }

    /// Flush the buffered rows. Consumes the session.
    pub async fn finish(mut self) -> Result<FlushReport> {
        let Some(batch) = self.batch.take() else {
            return Ok(FlushReport::default());
        };
        info!(
            event = "session_flush",
            run_id = %self.run_id,
            tables = batch.tables().len(),
            rows = batch.row_count()
        );
        flush(&mut *self.db, batch, &self.options.flush).await
    }
}

impl Drop for SeedSession<'_> {
    fn drop(&mut self) {
        if let Some(batch) = self.batch.take() {
            if !batch.is_empty() {
                warn!(
                    event = "session_discarded",
                    run_id = %self.run_id,
                    rows = batch.row_count(),
                    "seeding session dropped without finish; buffered rows discarded"
                );
            }
        }
    }
}

fn finished() -> SeedError {
    SeedError::Database("seeding session already finished".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeder::DEFAULT_METHOD;
    use crate::testing::{FixedValueSource, MemoryTarget, table};
    use async_trait::async_trait;

    struct NamesSeeder;

    #[async_trait]
    impl TableSeeder for NamesSeeder {
        fn name(&self) -> &str {
            "NamesTableSeeder"
        }

        fn methods(&self) -> &[&'static str] {
            &[DEFAULT_METHOD, "broken"]
        }

        async fn run(&self, session: &mut SeedSession<'_>, count: u64) -> Result<()> {
            for idx in 0..count {
                session
                    .insert("names", Row::new().with("name", format!("name {idx}")))
                    .await?;
            }
            Ok(())
        }

        async fn call(&self, method: &str, session: &mut SeedSession<'_>, count: u64) -> Result<()> {
            match method {
                "broken" => {
                    session.insert("names", Row::new().with("name", "partial")).await?;
                    session.insert("missing", Row::new().with("name", "x")).await
                }
                _ => self.run(session, count).await,
            }
        }
    }

    fn target() -> MemoryTarget {
        MemoryTarget::new(Dialect::Sqlite).with_table(table(
            "names",
            &[
                ("id", "integer", true),
                ("name", "text", false),
                ("created_at", "datetime", false),
            ],
        ))
    }

    #[tokio::test]
    async fn execute_flushes_after_run() {
        let mut db = target();
        let mut values = FixedValueSource;
        let report = SeedSession::execute(
            &mut db,
            &mut values,
            &NamesSeeder,
            DEFAULT_METHOD,
            3,
            SessionOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.rows_for("names"), Some(3));
        assert_eq!(
            db.executed[..3],
            [
                "PRAGMA foreign_keys = OFF",
                "DELETE FROM \"names\"",
                "PRAGMA foreign_keys = ON",
            ]
        );
        assert_eq!(db.executed.len(), 4);
    }

    #[tokio::test]
    async fn execute_flushes_buffer_when_seeder_fails() {
        let mut db = target();
        let mut values = FixedValueSource;
        let err = SeedSession::execute(
            &mut db,
            &mut values,
            &NamesSeeder,
            "broken",
            1,
            SessionOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SeedError::TableNotFound(ref table) if table == "missing"));
        assert!(db.executed.iter().any(|sql| sql.contains("'partial'")));
    }

    #[tokio::test]
    async fn dropped_session_executes_nothing() {
        let mut db = target();
        let mut values = FixedValueSource;
        {
            let mut session = SeedSession::new(&mut db, &mut values, SessionOptions::default());
            session
                .insert("names", Row::new().with("name", "lost"))
                .await
                .unwrap();
            assert_eq!(session.buffered_rows(), 1);
        }
        assert!(db.executed.is_empty());
    }

    #[tokio::test]
    async fn timestamp_is_shared_across_inserts() {
        let mut db = target();
        let mut values = FixedValueSource;
        let options = SessionOptions {
            flush: FlushOptions {
                skip_truncate: true,
                ..FlushOptions::default()
            },
            ..SessionOptions::default()
        };
        let mut session = SeedSession::new(&mut db, &mut values, options);
        let stamp = session.timestamp().unwrap();
        session
            .insert_many(
                "names",
                vec!["name".to_string()],
                vec![vec!["a".into()], vec!["b".into()]],
            )
            .await
            .unwrap();
        session.finish().await.unwrap();

        assert_eq!(db.executed.len(), 1);
        let literal = SqlValue::DateTime(stamp).to_literal(Dialect::Sqlite);
        assert_eq!(db.executed[0].matches(&literal).count(), 2);
    }
}
