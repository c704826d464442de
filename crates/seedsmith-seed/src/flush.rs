//! End-of-session flush: truncate, insert, report.
//!
//! The coordinator only speaks [`DialectOps`]: integrity toggles a dialect
//! cannot perform come back as `None` and are skipped.
//!
//! [`DialectOps`]: seedsmith_core::DialectOps

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use seedsmith_core::{Dialect, SqlValue};

use crate::batch::InsertBatch;
use crate::error::Result;
use crate::target::SeedTarget;

const REPORT_WIDTH: usize = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOptions {
    /// Keep existing rows instead of truncating every buffered table.
    pub skip_truncate: bool,
    /// Rows per INSERT statement; larger groups are split.
    pub max_rows_per_statement: usize,
}

impl Default for FlushOptions {
    fn default() -> Self {
        Self {
            skip_truncate: false,
            max_rows_per_statement: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInsertReport {
    pub table: String,
    pub rows: u64,
    pub statements: usize,
}

impl TableInsertReport {
    pub fn summary_line(&self) -> String {
        let plural = if self.rows == 1 { "" } else { "s" };
        format!("{} row{plural} inserted in {}", self.rows, self.table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncateReport {
    pub table: String,
    pub elapsed: Duration,
}

impl TruncateReport {
    pub fn summary_line(&self) -> String {
        format!(
            "truncate table {} ... done (time: {:.3}s)",
            self.table,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Schema columns that never received a value, as `(name, db type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingColumns {
    pub table: String,
    pub columns: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub truncated: Vec<TruncateReport>,
    pub tables: Vec<TableInsertReport>,
    pub missing: Vec<MissingColumns>,
}

impl FlushReport {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|table| table.rows).sum()
    }

    pub fn rows_for(&self, table: &str) -> Option<u64> {
        self.tables
            .iter()
            .find(|report| report.table == table)
            .map(|report| report.rows)
    }
}

/// Execute the buffered work of a session.
///
/// Any failing statement aborts the remaining steps. When truncation fails
/// midway, integrity enforcement is still restored before the error
/// propagates.
pub async fn flush<T>(db: &mut T, batch: InsertBatch, options: &FlushOptions) -> Result<FlushReport>
where
    T: SeedTarget + ?Sized,
{
    let dialect = db.dialect();
    let mut report = FlushReport::default();

    if !options.skip_truncate && !batch.is_empty() {
        truncate_tables(db, &batch, &mut report).await?;
    }

    let chunk_size = options.max_rows_per_statement.max(1);
    for table in batch.tables() {
        let mut rows = 0_u64;
        let mut statements = 0_usize;
        for group in table.groups() {
            for chunk in group.rows().chunks(chunk_size) {
                let sql = insert_statement(dialect, table.name(), group.columns(), chunk);
                db.execute(&sql).await?;
                statements += 1;
                rows += chunk.len() as u64;
            }
        }
        if rows == 0 {
            continue;
        }

        let entry = TableInsertReport {
            table: table.name().to_string(),
            rows,
            statements,
        };
        info!(
            event = "rows_inserted",
            table = %entry.table,
            rows,
            statements,
            "{}",
            entry.summary_line()
        );
        report.tables.push(entry);
    }

    for table in batch.tables() {
        let columns = batch.tracker().missing(table.name(), table.schema());
        if !columns.is_empty() {
            report.missing.push(MissingColumns {
                table: table.name().to_string(),
                columns,
            });
        }
    }
    if let Some(block) = render_missing_columns(&report.missing) {
        info!(
            event = "missing_columns",
            tables = report.missing.len(),
            "\n{block}"
        );
    }

    Ok(report)
}

async fn truncate_tables<T>(db: &mut T, batch: &InsertBatch, report: &mut FlushReport) -> Result<()>
where
    T: SeedTarget + ?Sized,
{
    let ops = db.dialect().ops();

    if let Some(sql) = ops.disable_integrity() {
        db.execute(&sql).await?;
    }

    let truncated = truncate_each(db, batch, report).await;

    let restored = match ops.enable_integrity() {
        Some(sql) => db.execute(&sql).await.map(|_| ()),
        None => Ok(()),
    };
    truncated?;
    restored
}

async fn truncate_each<T>(db: &mut T, batch: &InsertBatch, report: &mut FlushReport) -> Result<()>
where
    T: SeedTarget + ?Sized,
{
    let ops = db.dialect().ops();
    let reset_sequences = match ops.sequence_catalog_query() {
        Some(sql) => db.query_exists(sql).await?,
        None => false,
    };

    for table in batch.tables() {
        let started = Instant::now();
        db.execute(&ops.truncate(table.name())).await?;
        if reset_sequences {
            if let Some(sql) = ops.reset_sequence(table.name()) {
                db.execute(&sql).await?;
            }
        }
        let entry = TruncateReport {
            table: table.name().to_string(),
            elapsed: started.elapsed(),
        };
        info!(
            event = "table_truncated",
            table = %entry.table,
            elapsed_ms = entry.elapsed.as_millis() as u64,
            "{}",
            entry.summary_line()
        );
        report.truncated.push(entry);
    }
    Ok(())
}

/// One multi-row INSERT with literal values.
pub fn insert_statement(
    dialect: Dialect,
    table: &str,
    columns: &[String],
    rows: &[Vec<SqlValue>],
) -> String {
    let ops = dialect.ops();
    let columns = columns
        .iter()
        .map(|column| ops.quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let values = rows
        .iter()
        .map(|row| {
            let literals = row
                .iter()
                .map(|value| value.to_literal(dialect))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({literals})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "INSERT INTO {} ({columns}) VALUES {values}",
        ops.quote_table(table)
    );
    debug!(event = "insert_statement", table, rows = rows.len(), sql_len = sql.len());
    sql
}

/// Boxed `MISSING COLUMNS` block, `None` when nothing is missing.
pub fn render_missing_columns(missing: &[MissingColumns]) -> Option<String> {
    if missing.is_empty() {
        return None;
    }

    let inner = REPORT_WIDTH - 1;
    let mut lines = vec![format!(
        "    > {:#^width$}",
        " MISSING COLUMNS ",
        width = REPORT_WIDTH
    )];
    for table in missing {
        lines.push(format!("    > {:<inner$}#", format!("# TABLE: {}", table.table)));
        for (column, db_type) in &table.columns {
            lines.push(format!("    > {:<inner$}#", format!("#    {column} => {db_type}")));
        }
    }
    lines.push(format!("    > {}", "#".repeat(REPORT_WIDTH)));
    Some(lines.join("\n"))
}
