//! Test doubles shared by the unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use seedsmith_core::{Column, ColumnType, Dialect, Table, TableKind};

use crate::error::{Result, SeedError};
use crate::faker::ValueSource;
use crate::target::SeedTarget;

/// Returns the same value for every request.
#[derive(Debug, Default)]
pub struct FixedValueSource;

impl ValueSource for FixedValueSource {
    fn number_between(&mut self, min: i64, _max: i64) -> i64 {
        min
    }

    fn boolean(&mut self) -> bool {
        true
    }

    fn name(&mut self) -> String {
        "Ada Lovelace".to_string()
    }

    fn real_text(&mut self) -> String {
        "Some real text.".to_string()
    }

    fn company(&mut self) -> String {
        "Acme".to_string()
    }

    fn email(&mut self) -> String {
        "lovelace.ada@example.com".to_string()
    }

    fn cpf(&mut self) -> String {
        "52998224725".to_string()
    }

    fn cnpj(&mut self) -> String {
        "11222333000181".to_string()
    }

    fn text(&mut self) -> String {
        "lorem ipsum".to_string()
    }

    fn date(&mut self) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()
    }

    fn date_time(&mut self) -> NaiveDateTime {
        self.date().and_hms_opt(3, 4, 5).unwrap()
    }

    fn year(&mut self) -> i64 {
        2020
    }

    fn time(&mut self) -> NaiveTime {
        NaiveTime::from_hms_opt(3, 4, 5).unwrap()
    }
}

/// In-memory [`SeedTarget`] recording every executed statement.
#[derive(Debug)]
pub struct MemoryTarget {
    pub dialect: Dialect,
    pub tables: HashMap<String, Table>,
    pub executed: Vec<String>,
    /// Statements starting with this prefix fail.
    pub fail_on: Option<String>,
    /// Queries passed to `query_exists`, kept apart from `executed`.
    pub queried: Vec<String>,
    /// Answer to every `query_exists` call.
    pub rows_exist: bool,
}

impl MemoryTarget {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            tables: HashMap::new(),
            executed: Vec::new(),
            fail_on: None,
            queried: Vec::new(),
            rows_exist: false,
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }
}

#[async_trait]
impl SeedTarget for MemoryTarget {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        if let Some(prefix) = &self.fail_on {
            if sql.starts_with(prefix.as_str()) {
                return Err(SeedError::Database(format!("rejected: {sql}")));
            }
        }
        self.executed.push(sql.to_string());
        Ok(0)
    }

    async fn query_exists(&mut self, sql: &str) -> Result<bool> {
        self.queried.push(sql.to_string());
        Ok(self.rows_exist)
    }

    async fn table(&mut self, name: &str) -> Result<Option<Table>> {
        Ok(self.tables.get(name).cloned())
    }
}

/// Build a table from `(name, type label, auto_increment)` triples.
pub fn table(name: &str, columns: &[(&str, &str, bool)]) -> Table {
    Table {
        name: name.to_string(),
        kind: TableKind::Table,
        comment: None,
        columns: columns
            .iter()
            .enumerate()
            .map(|(idx, (column, label, auto_increment))| Column {
                ordinal_position: idx as i32 + 1,
                name: column.to_string(),
                column_type: ColumnType::from_label(label),
                is_nullable: true,
                default: None,
                auto_increment: *auto_increment,
                comment: None,
            })
            .collect(),
        constraints: Vec::new(),
    }
}
