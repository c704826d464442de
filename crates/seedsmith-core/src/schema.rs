use serde::{Deserialize, Serialize};

use crate::constraints::{Constraint, ForeignKey, PrimaryKey};
use crate::types::ColumnType;

/// Top-level schema snapshot for a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Contract version for this schema format.
    pub schema_version: String,
    /// Database engine identifier (`postgres`, `mysql`, `sqlite`).
    pub engine: String,
    /// Database name when available.
    pub database: Option<String>,
    /// Namespaces captured from the database.
    pub schemas: Vec<Schema>,
}

impl DatabaseSchema {
    /// Iterate every table together with its namespace name.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.schemas.iter().flat_map(|schema| {
            schema
                .tables
                .iter()
                .map(move |table| (schema.name.as_str(), table))
        })
    }

    /// Find a table by `schema.table` or by bare table name.
    ///
    /// A bare name matches the first namespace that contains it.
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        if let Some((schema_name, table_name)) = name.split_once('.') {
            return self
                .schemas
                .iter()
                .find(|schema| schema.name == schema_name)
                .and_then(|schema| schema.table(table_name));
        }

        self.schemas.iter().find_map(|schema| schema.table(name))
    }
}

/// A namespace containing tables (Postgres schema, MySQL database, SQLite `main`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// A table-like object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub comment: Option<String>,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.constraints.iter().find_map(|constraint| match constraint {
            Constraint::PrimaryKey(pk) => Some(pk),
            _ => None,
        })
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.constraints
            .iter()
            .filter_map(|constraint| match constraint {
                Constraint::ForeignKey(fk) => Some(fk),
                _ => None,
            })
    }

    /// Foreign key whose first column is `column`.
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys()
            .find(|fk| fk.columns.first().is_some_and(|first| first == column))
    }
}

/// Kind of table represented in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    View,
    Other(String),
}

/// Column metadata for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub ordinal_position: i32,
    pub name: String,
    pub column_type: ColumnType,
    pub is_nullable: bool,
    pub default: Option<String>,
    /// Value supplied by the database itself (serial, identity,
    /// `AUTO_INCREMENT`, SQLite rowid alias).
    pub auto_increment: bool,
    pub comment: Option<String>,
}
