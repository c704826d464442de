//! Column classification: schema metadata to fake-data strategy.
//!
//! A column is matched against an ordered list of name rules first; only when
//! no rule matches does its SQL type decide the strategy. Timestamp columns
//! and database-filled columns get no assignment at all.

use serde::{Deserialize, Serialize};
use tracing::warn;

use seedsmith_core::{Column, DatabaseSchema, ForeignKey, Table};

/// Columns filled from the session timestamp instead of a generator.
pub const TIMESTAMP_COLUMNS: [&str; 2] = ["created_at", "updated_at"];

/// Coarse SQL type family of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Integer,
    TinyInt,
    SmallInt,
    MediumInt,
    BigInt,
    Boolean,
    Date,
    DateTime,
    Timestamp,
    Year,
    Time,
    Text,
    Other,
}

impl SemanticType {
    /// Parse a physical type label such as `tinyint(1)`, `int4` or
    /// `timestamp without time zone`.
    pub fn from_db_type(label: &str) -> Self {
        let lowered = label.trim().to_ascii_lowercase();
        let base = lowered.split(['(', ' ']).next().unwrap_or_default();
        match base {
            "tinyint" | "int1" => SemanticType::TinyInt,
            "smallint" | "int2" | "smallserial" | "serial2" => SemanticType::SmallInt,
            "mediumint" => SemanticType::MediumInt,
            "int" | "integer" | "int4" | "serial" | "serial4" => SemanticType::Integer,
            "bigint" | "int8" | "bigserial" | "serial8" => SemanticType::BigInt,
            "bool" | "boolean" => SemanticType::Boolean,
            "date" => SemanticType::Date,
            "datetime" => SemanticType::DateTime,
            "timestamp" | "timestamptz" => SemanticType::Timestamp,
            "year" => SemanticType::Year,
            "time" | "timetz" => SemanticType::Time,
            "text" | "tinytext" | "mediumtext" | "longtext" | "varchar" | "char"
            | "character" | "bpchar" | "nvarchar" | "nchar" | "string" | "clob" => {
                SemanticType::Text
            }
            _ => SemanticType::Other,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SemanticType::Integer
                | SemanticType::TinyInt
                | SemanticType::SmallInt
                | SemanticType::MediumInt
                | SemanticType::BigInt
        )
    }
}

/// Synthetic-data strategy assigned to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    Name,
    RealText,
    Company,
    Cnpj,
    Cpf,
    Email,
    Boolean,
    /// Uniform integer in `[1, max]`, `max` being the row count.
    NumberBetween { max: u64 },
    Date,
    DateTime,
    Year,
    Time,
    Text,
}

impl Strategy {
    /// Strategy tag as written into generated seeder headers and logs.
    pub fn tag(&self) -> String {
        match self {
            Strategy::Name => "name".to_string(),
            Strategy::RealText => "realText()".to_string(),
            Strategy::Company => "company".to_string(),
            Strategy::Cnpj => "cnpj()".to_string(),
            Strategy::Cpf => "cpf()".to_string(),
            Strategy::Email => "email".to_string(),
            Strategy::Boolean => "boolean".to_string(),
            Strategy::NumberBetween { max } => format!("numberBetween(1, {max})"),
            Strategy::Date => "date()".to_string(),
            Strategy::DateTime => "dateTime()->format(\"Y-m-d H:i:s\")".to_string(),
            Strategy::Year => "year()".to_string(),
            Strategy::Time => "time()".to_string(),
            Strategy::Text => "text".to_string(),
        }
    }
}

/// Target of a resolved foreign key: parent table and its key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub pk_column: String,
}

/// Column metadata the classifier works from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    pub db_type: String,
    pub auto_increment: bool,
    pub foreign_key: Option<ForeignKeyRef>,
}

impl ColumnDescriptor {
    pub fn from_column(column: &Column) -> Self {
        let semantic_type = match SemanticType::from_db_type(&column.column_type.udt_name) {
            SemanticType::Other => SemanticType::from_db_type(&column.column_type.data_type),
            found => found,
        };
        Self {
            name: column.name.clone(),
            semantic_type,
            db_type: column.column_type.data_type.clone(),
            auto_increment: column.auto_increment,
            foreign_key: None,
        }
    }

    pub fn with_foreign_key(mut self, foreign_key: Option<ForeignKeyRef>) -> Self {
        self.foreign_key = foreign_key;
        self
    }

    /// `tinyint(1)` is how MySQL spells a boolean.
    fn is_single_byte_boolean(&self) -> bool {
        self.db_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("tinyint(1)")
    }
}

/// Strategy chosen for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorAssignment {
    pub column: String,
    pub strategy: Strategy,
    /// When present the parent key replaces the generated value.
    pub foreign_key: Option<ForeignKeyRef>,
}

/// Column names whose meaning beats their SQL type.
pub const NAME_RULES: &[(&str, Strategy)] = &[
    ("name", Strategy::Name),
    ("description", Strategy::RealText),
    ("business_name", Strategy::Company),
    ("cnpj", Strategy::Cnpj),
    ("cpf", Strategy::Cpf),
    ("email", Strategy::Email),
];

/// Ordered name rules followed by the type dispatch.
#[derive(Debug, Clone)]
pub struct Classifier {
    name_rules: Vec<(String, Strategy)>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            name_rules: NAME_RULES
                .iter()
                .map(|(name, strategy)| (name.to_string(), *strategy))
                .collect(),
        }
    }
}

impl Classifier {
    /// Add a name rule that takes precedence over the existing ones.
    pub fn with_name_rule(mut self, column: impl Into<String>, strategy: Strategy) -> Self {
        self.name_rules.insert(0, (column.into(), strategy));
        self
    }

    pub fn classify(
        &self,
        column: &ColumnDescriptor,
        row_count: u64,
    ) -> Option<GeneratorAssignment> {
        if column.auto_increment || TIMESTAMP_COLUMNS.contains(&column.name.as_str()) {
            return None;
        }

        let strategy = self
            .name_rules
            .iter()
            .find(|(name, _)| *name == column.name)
            .map(|(_, strategy)| *strategy)
            .unwrap_or_else(|| strategy_for_type(column, row_count));

        Some(GeneratorAssignment {
            column: column.name.clone(),
            strategy,
            foreign_key: column.foreign_key.clone(),
        })
    }

    /// Classify every column of `table`, resolving foreign keys against
    /// `schema`. Unresolvable references degrade to plain columns.
    pub fn classify_table(
        &self,
        table: &Table,
        schema: &DatabaseSchema,
        row_count: u64,
    ) -> Vec<GeneratorAssignment> {
        table
            .columns
            .iter()
            .filter_map(|column| {
                let foreign_key = resolve_foreign_key(table, column, schema);
                let descriptor = ColumnDescriptor::from_column(column).with_foreign_key(foreign_key);
                self.classify(&descriptor, row_count)
            })
            .collect()
    }
}

/// Classify with the default rules.
pub fn classify(column: &ColumnDescriptor, row_count: u64) -> Option<GeneratorAssignment> {
    Classifier::default().classify(column, row_count)
}

/// Classify a table with the default rules.
pub fn classify_table(
    table: &Table,
    schema: &DatabaseSchema,
    row_count: u64,
) -> Vec<GeneratorAssignment> {
    Classifier::default().classify_table(table, schema, row_count)
}

fn strategy_for_type(column: &ColumnDescriptor, row_count: u64) -> Strategy {
    match column.semantic_type {
        kind if kind.is_integer() => {
            if column.is_single_byte_boolean() {
                Strategy::Boolean
            } else {
                Strategy::NumberBetween { max: row_count }
            }
        }
        SemanticType::Boolean => Strategy::Boolean,
        SemanticType::Date => Strategy::Date,
        SemanticType::DateTime | SemanticType::Timestamp => Strategy::DateTime,
        SemanticType::Year => Strategy::Year,
        SemanticType::Time => Strategy::Time,
        _ => Strategy::Text,
    }
}

fn resolve_foreign_key(
    table: &Table,
    column: &Column,
    schema: &DatabaseSchema,
) -> Option<ForeignKeyRef> {
    let (fk, position) = table.foreign_keys().find_map(|fk| {
        fk.columns
            .iter()
            .position(|name| *name == column.name)
            .map(|position| (fk, position))
    })?;

    let resolved = referenced_key_column(fk, position, schema).map(|pk_column| ForeignKeyRef {
        table: fk.referenced_table.clone(),
        pk_column,
    });

    if resolved.is_none() {
        warn!(
            event = "foreign_key_unresolved",
            table = %table.name,
            column = %column.name,
            referenced_table = %fk.referenced_table,
            "Foreign Key for '{}' column will be ignored and a common column will be generated.",
            column.name
        );
    }
    resolved
}

fn referenced_key_column(fk: &ForeignKey, position: usize, schema: &DatabaseSchema) -> Option<String> {
    let parent = schema
        .find_table(&format!("{}.{}", fk.referenced_schema, fk.referenced_table))
        .or_else(|| schema.find_table(&fk.referenced_table))?;

    if let Some(column) = fk.referenced_columns.get(position) {
        return parent.has_column(column).then(|| column.clone());
    }
    parent
        .primary_key()
        .and_then(|pk| pk.columns.get(position))
        .cloned()
}
