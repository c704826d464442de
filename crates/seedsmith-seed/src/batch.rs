//! In-memory insert buffer for one seeding session.
//!
//! Rows are grouped by table, then by their exact ordered column list; each
//! group later becomes multi-row INSERT statements. Nothing touches the
//! database until the batch is flushed.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use seedsmith_core::{SqlValue, Table};

use crate::classify::TIMESTAMP_COLUMNS;
use crate::error::{Result, SeedError};

/// Ordered column/value pairs for one inserted row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Row::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Set `column`, replacing any earlier value in place.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter().position(|existing| *existing == column) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|existing| existing == column)
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|existing| existing == column)
            .map(|idx| &self.values[idx])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Rows of one table sharing the same column list.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl RowGroup {
    /// Comma-joined column list identifying the group.
    pub fn signature(&self) -> String {
        self.columns.join(",")
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }
}

/// Buffered groups for one table plus the schema seen at first insert.
#[derive(Debug, Clone)]
pub struct TableBatch {
    name: String,
    schema: Table,
    groups: Vec<RowGroup>,
}

impl TableBatch {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Table {
        &self.schema
    }

    pub fn groups(&self) -> &[RowGroup] {
        &self.groups
    }

    pub fn row_count(&self) -> u64 {
        self.groups.iter().map(|group| group.rows.len() as u64).sum()
    }

    fn push(&mut self, columns: Vec<String>, row: Vec<SqlValue>) {
        match self.groups.iter_mut().find(|group| group.columns == columns) {
            Some(group) => group.rows.push(row),
            None => self.groups.push(RowGroup {
                columns,
                rows: vec![row],
            }),
        }
    }
}

/// Columns that received an explicit value, per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertedColumnsTracker {
    columns: BTreeMap<String, BTreeSet<String>>,
}

impl InsertedColumnsTracker {
    pub fn record<'a>(&mut self, table: &str, columns: impl IntoIterator<Item = &'a String>) {
        self.columns
            .entry(table.to_string())
            .or_default()
            .extend(columns.into_iter().cloned());
    }

    pub fn inserted(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.columns.get(table)
    }

    /// Schema columns of `schema` never supplied, as `(name, db type)`.
    /// Database-filled columns are not reported.
    pub fn missing(&self, table: &str, schema: &Table) -> Vec<(String, String)> {
        let inserted = self.columns.get(table);
        schema
            .columns
            .iter()
            .filter(|column| !column.auto_increment)
            .filter(|column| !inserted.is_some_and(|set| set.contains(&column.name)))
            .map(|column| (column.name.clone(), column.column_type.data_type.clone()))
            .collect()
    }
}

/// Rows buffered by one session, flushed exactly once.
#[derive(Debug, Clone)]
pub struct InsertBatch {
    timestamp: NaiveDateTime,
    tables: Vec<TableBatch>,
    tracker: InsertedColumnsTracker,
}

impl InsertBatch {
    /// `timestamp` fills `created_at` / `updated_at` for every row.
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            tables: Vec::new(),
            tracker: InsertedColumnsTracker::default(),
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Tables in first-insert order.
    pub fn tables(&self) -> &[TableBatch] {
        &self.tables
    }

    pub fn tracker(&self) -> &InsertedColumnsTracker {
        &self.tracker
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn row_count(&self) -> u64 {
        self.tables.iter().map(TableBatch::row_count).sum()
    }

    pub fn insert(&mut self, table: &str, schema: &Table, mut row: Row) -> Result<()> {
        for column in TIMESTAMP_COLUMNS {
            if !row.contains(column) && schema.has_column(column) {
                row.set(column, self.timestamp);
            }
        }
        if row.is_empty() {
            return Err(invalid_row(table, "row has no columns"));
        }

        self.tracker.record(table, row.columns());
        let Row { columns, values } = row;
        self.table_mut(table, schema).push(columns, values);
        Ok(())
    }

    pub fn insert_many(
        &mut self,
        table: &str,
        schema: &Table,
        mut columns: Vec<String>,
        mut rows: Vec<Vec<SqlValue>>,
    ) -> Result<()> {
        if let Some(bad) = rows.iter().position(|row| row.len() != columns.len()) {
            return Err(invalid_row(
                table,
                &format!(
                    "row {} has {} values for {} columns",
                    bad + 1,
                    rows[bad].len(),
                    columns.len()
                ),
            ));
        }

        for column in TIMESTAMP_COLUMNS {
            if !columns.iter().any(|existing| existing == column) && schema.has_column(column) {
                columns.push(column.to_string());
                for row in &mut rows {
                    row.push(SqlValue::DateTime(self.timestamp));
                }
            }
        }
        if columns.is_empty() {
            return Err(invalid_row(table, "row has no columns"));
        }

        self.tracker.record(table, &columns);
        if rows.is_empty() {
            return Ok(());
        }
        let batch = self.table_mut(table, schema);
        for row in rows {
            batch.push(columns.clone(), row);
        }
        Ok(())
    }

    fn table_mut(&mut self, table: &str, schema: &Table) -> &mut TableBatch {
        let idx = match self.tables.iter().position(|batch| batch.name == table) {
            Some(idx) => idx,
            None => {
                self.tables.push(TableBatch {
                    name: table.to_string(),
                    schema: schema.clone(),
                    groups: Vec::new(),
                });
                self.tables.len() - 1
            }
        };
        &mut self.tables[idx]
    }
}

fn invalid_row(table: &str, reason: &str) -> SeedError {
    SeedError::InvalidRow {
        table: table.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::table;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn users() -> Table {
        table(
            "users",
            &[
                ("id", "integer", true),
                ("name", "varchar(80)", false),
                ("email", "varchar(120)", false),
                ("created_at", "datetime", false),
                ("updated_at", "datetime", false),
            ],
        )
    }

    #[test]
    fn fills_timestamps_with_one_value() {
        let schema = users();
        let mut batch = InsertBatch::new(at());
        batch
            .insert("users", &schema, Row::new().with("name", "Ada"))
            .unwrap();
        batch
            .insert("users", &schema, Row::new().with("name", "Grace"))
            .unwrap();

        let group = &batch.tables()[0].groups()[0];
        assert_eq!(group.signature(), "name,created_at,updated_at");
        for row in group.rows() {
            assert_eq!(row[1], SqlValue::DateTime(at()));
            assert_eq!(row[2], SqlValue::DateTime(at()));
        }
    }

    #[test]
    fn caller_timestamps_are_kept() {
        let schema = users();
        let mut batch = InsertBatch::new(at());
        let earlier = at() - chrono::Duration::days(1);
        batch
            .insert(
                "users",
                &schema,
                Row::new().with("name", "Ada").with("created_at", earlier),
            )
            .unwrap();

        let group = &batch.tables()[0].groups()[0];
        assert_eq!(group.signature(), "name,created_at,updated_at");
        assert_eq!(group.rows()[0][1], SqlValue::DateTime(earlier));
        assert_eq!(group.rows()[0][2], SqlValue::DateTime(at()));
    }

    #[test]
    fn groups_by_table_then_column_list() {
        let schema = users();
        let posts = table("posts", &[("id", "integer", true), ("title", "text", false)]);
        let mut batch = InsertBatch::new(at());

        batch
            .insert("users", &schema, Row::new().with("name", "Ada"))
            .unwrap();
        batch
            .insert("posts", &posts, Row::new().with("title", "Hello"))
            .unwrap();
        batch
            .insert(
                "users",
                &schema,
                Row::new().with("name", "Grace").with("email", "g@example.com"),
            )
            .unwrap();
        batch
            .insert("users", &schema, Row::new().with("name", "Linus"))
            .unwrap();

        let names: Vec<&str> = batch.tables().iter().map(TableBatch::name).collect();
        assert_eq!(names, ["users", "posts"]);

        let users = &batch.tables()[0];
        assert_eq!(users.groups().len(), 2);
        assert_eq!(users.groups()[0].rows().len(), 2);
        assert_eq!(users.groups()[1].signature(), "name,email,created_at,updated_at");
        assert_eq!(users.row_count(), 3);
        assert_eq!(batch.row_count(), 4);
    }

    #[test]
    fn insert_many_appends_timestamps_and_checks_width() {
        let schema = users();
        let mut batch = InsertBatch::new(at());
        batch
            .insert_many(
                "users",
                &schema,
                vec!["name".to_string()],
                vec![vec!["Ada".into()], vec!["Grace".into()]],
            )
            .unwrap();

        let group = &batch.tables()[0].groups()[0];
        assert_eq!(group.signature(), "name,created_at,updated_at");
        assert!(group.rows().iter().all(|row| row.len() == 3));

        let err = batch
            .insert_many(
                "users",
                &schema,
                vec!["name".to_string(), "email".to_string()],
                vec![vec!["Ada".into()]],
            )
            .unwrap_err();
        assert!(matches!(err, SeedError::InvalidRow { .. }));
    }

    #[test]
    fn insert_many_without_rows_buffers_no_table() {
        let schema = users();
        let mut batch = InsertBatch::new(at());
        batch
            .insert_many("users", &schema, vec!["name".to_string()], Vec::new())
            .unwrap();

        assert!(batch.is_empty());
        assert_eq!(batch.row_count(), 0);
        let recorded = batch.tracker().inserted("users").unwrap();
        assert!(recorded.contains("name"));
        assert!(recorded.contains("created_at"));
    }

    #[test]
    fn missing_columns_skip_auto_increment() {
        let schema = users();
        let mut batch = InsertBatch::new(at());
        batch
            .insert("users", &schema, Row::new().with("name", "Ada"))
            .unwrap();

        let missing = batch.tracker().missing("users", &schema);
        assert_eq!(
            missing,
            [("email".to_string(), "varchar(120)".to_string())]
        );
    }

    #[test]
    fn rejects_rows_without_columns() {
        let bare = table("tags", &[("id", "integer", true)]);
        let mut batch = InsertBatch::new(at());
        let err = batch.insert("tags", &bare, Row::new()).unwrap_err();
        assert!(matches!(err, SeedError::InvalidRow { .. }));
        assert!(batch.is_empty());
    }

    #[test]
    fn row_set_replaces_in_place() {
        let row = Row::new().with("a", 1_i64).with("b", 2_i64).with("a", 3_i64);
        assert_eq!(row.columns(), ["a", "b"]);
        assert_eq!(row.get("a"), Some(&SqlValue::Int(3)));
    }
}
