//! `seedsmith create`: write a seeder source file for one table.

use std::io::Write;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::info;

use seedsmith_introspect::{Adapter, IntrospectOptions, SqlConnection};
use seedsmith_seed::{
    Classifier, database_seeder_source, fingerprint, seeder_class_name, seeder_file_name,
    table_seeder_source,
};

use crate::atomic::write_bytes_atomic;
use crate::error::{CliError, CliResult};
use crate::prompt::Confirm;

pub const DATABASE_SEEDER_FILE: &str = "DatabaseSeeder.rs";

/// `table` or `schema/table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: Option<String>,
    pub table: String,
}

impl TableName {
    pub fn parse(input: &str) -> CliResult<Self> {
        let pattern = Regex::new(r"^[A-Za-z0-9_/]+$")
            .map_err(|err| CliError::InvalidConfig(err.to_string()))?;
        if !pattern.is_match(input) {
            return Err(CliError::InvalidConfig(
                "The table name should contain letters, digits, underscore and/or slashes."
                    .to_string(),
            ));
        }

        match input.split_once('/') {
            None => Ok(Self {
                schema: None,
                table: input.to_string(),
            }),
            Some((schema, table))
                if !schema.is_empty() && !table.is_empty() && !table.contains('/') =>
            {
                Ok(Self {
                    schema: Some(schema.to_string()),
                    table: table.to_string(),
                })
            }
            Some(_) => Err(CliError::InvalidConfig(format!(
                "expected `table` or `schema/table`, got `{input}`"
            ))),
        }
    }

    /// Lookup key in a schema snapshot.
    pub fn key(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(PathBuf),
    Declined,
    TableNotFound(String),
}

/// Introspect `name` over `conn` and write its seeder into `dir`.
pub async fn create_seeder(
    conn: &mut SqlConnection,
    name: &TableName,
    dir: &Path,
    confirm: &mut dyn Confirm,
    out: &mut dyn Write,
) -> CliResult<CreateOutcome> {
    ensure_database_seeder(dir, out)?;

    let key = name.key();
    let options = IntrospectOptions {
        schemas: name.schema.clone().map(|schema| vec![schema]),
        ..IntrospectOptions::default()
    };
    let snapshot = conn.introspect(&options).await?;
    let Some(table) = snapshot.find_table(&key) else {
        writeln!(out, "Table {key} not exists.")?;
        return Ok(CreateOutcome::TableNotFound(key));
    };

    let assignments = Classifier::default().classify_table(table, &snapshot, 1);
    let source = table_seeder_source(&key, &assignments, &fingerprint(table)?)?;
    info!(
        event = "seeder_generated",
        table = %key,
        seeder = %seeder_class_name(&key),
        columns = assignments.len()
    );

    write_seeder(dir, &key, &source, confirm, out)
}

/// Write the umbrella registry file when `dir` has none.
pub fn ensure_database_seeder(dir: &Path, out: &mut dyn Write) -> CliResult<bool> {
    let path = dir.join(DATABASE_SEEDER_FILE);
    if path.exists() {
        return Ok(false);
    }
    write_bytes_atomic(&path, database_seeder_source()?.as_bytes())?;
    writeln!(out, "DatabaseSeeder created at {}", path.display())?;
    Ok(true)
}

/// Ask, then write `source` as the seeder of `table` under `dir`.
pub fn write_seeder(
    dir: &Path,
    table: &str,
    source: &str,
    confirm: &mut dyn Confirm,
    out: &mut dyn Write,
) -> CliResult<CreateOutcome> {
    let path = dir.join(seeder_file_name(table));
    if !confirm.confirm(&format!("Create new seeder '{}'?", path.display()))? {
        return Ok(CreateOutcome::Declined);
    }

    if path.exists() {
        let question = format!(
            "\n'{}' already exists, overwrite?\nAll data will be lost irreversibly!",
            seeder_class_name(table)
        );
        if !confirm.confirm(&question)? {
            return Ok(CreateOutcome::Declined);
        }
    }

    write_bytes_atomic(&path, source.as_bytes())?;
    writeln!(out, "New seeder created successfully.")?;
    Ok(CreateOutcome::Created(path))
}
