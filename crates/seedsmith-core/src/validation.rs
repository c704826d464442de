use std::collections::{BTreeMap, BTreeSet};

use crate::constraints::Constraint;
use crate::error::{Error, Result};
use crate::schema::DatabaseSchema;

/// Validate internal consistency of a database schema.
///
/// This checks:
/// - duplicate schemas/tables/columns
/// - key and unique columns exist
/// - foreign key targets exist and column counts line up
pub fn validate_schema(schema: &DatabaseSchema) -> Result<()> {
    let mut catalog: BTreeMap<&str, BTreeMap<&str, BTreeSet<&str>>> = BTreeMap::new();

    for db_schema in &schema.schemas {
        if catalog.contains_key(db_schema.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate schema name: {}",
                db_schema.name
            )));
        }
        let tables = catalog.entry(db_schema.name.as_str()).or_default();

        for table in &db_schema.tables {
            let mut columns = BTreeSet::new();
            for column in &table.columns {
                if !columns.insert(column.name.as_str()) {
                    return Err(Error::InvalidSchema(format!(
                        "duplicate column name: {}.{}.{}",
                        db_schema.name, table.name, column.name
                    )));
                }
            }

            if tables.insert(table.name.as_str(), columns).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "duplicate table name: {}.{}",
                    db_schema.name, table.name
                )));
            }
        }
    }

    for (schema_name, table) in schema.tables() {
        let columns = &catalog[schema_name][table.name.as_str()];
        let require = |kind: &str, column: &str| -> Result<()> {
            if columns.contains(column) {
                Ok(())
            } else {
                Err(Error::InvalidSchema(format!(
                    "{kind} column not found: {schema_name}.{}.{column}",
                    table.name
                )))
            }
        };

        for constraint in &table.constraints {
            match constraint {
                Constraint::PrimaryKey(pk) => {
                    for column in &pk.columns {
                        require("primary key", column)?;
                    }
                }
                Constraint::Unique(unique) => {
                    for column in &unique.columns {
                        require("unique", column)?;
                    }
                }
                Constraint::ForeignKey(fk) => {
                    for column in &fk.columns {
                        require("foreign key", column)?;
                    }

                    let ref_columns = catalog
                        .get(fk.referenced_schema.as_str())
                        .and_then(|tables| tables.get(fk.referenced_table.as_str()))
                        .ok_or_else(|| {
                            Error::InvalidSchema(format!(
                                "referenced table not found: {}.{}",
                                fk.referenced_schema, fk.referenced_table
                            ))
                        })?;

                    if !fk.referenced_columns.is_empty()
                        && fk.referenced_columns.len() != fk.columns.len()
                    {
                        return Err(Error::InvalidSchema(format!(
                            "foreign key column count mismatch on {schema_name}.{}",
                            table.name
                        )));
                    }

                    if let Some(missing) = fk
                        .referenced_columns
                        .iter()
                        .find(|column| !ref_columns.contains(column.as_str()))
                    {
                        return Err(Error::InvalidSchema(format!(
                            "referenced column not found: {}.{}.{}",
                            fk.referenced_schema, fk.referenced_table, missing
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{FkAction, ForeignKey, PrimaryKey};
    use crate::schema::{Column, Schema, Table, TableKind};
    use crate::types::ColumnType;

    fn table(name: &str, columns: &[&str], constraints: Vec<Constraint>) -> Table {
        Table {
            name: name.to_string(),
            kind: TableKind::Table,
            comment: None,
            columns: columns
                .iter()
                .enumerate()
                .map(|(idx, column)| Column {
                    ordinal_position: idx as i32 + 1,
                    name: column.to_string(),
                    column_type: ColumnType::from_label("integer"),
                    is_nullable: true,
                    default: None,
                    auto_increment: false,
                    comment: None,
                })
                .collect(),
            constraints,
        }
    }

    fn wrap(tables: Vec<Table>) -> DatabaseSchema {
        DatabaseSchema {
            schema_version: "0.1".to_string(),
            engine: "sqlite".to_string(),
            database: None,
            schemas: vec![Schema {
                name: "main".to_string(),
                tables,
            }],
        }
    }

    #[test]
    fn accepts_consistent_schema() {
        let schema = wrap(vec![
            table(
                "users",
                &["id"],
                vec![Constraint::PrimaryKey(PrimaryKey {
                    name: None,
                    columns: vec!["id".to_string()],
                })],
            ),
            table(
                "posts",
                &["id", "user_id"],
                vec![Constraint::ForeignKey(ForeignKey {
                    name: None,
                    columns: vec!["user_id".to_string()],
                    referenced_schema: "main".to_string(),
                    referenced_table: "users".to_string(),
                    referenced_columns: vec!["id".to_string()],
                    on_delete: FkAction::Cascade,
                })],
            ),
        ]);

        validate_schema(&schema).expect("schema should validate");
    }

    #[test]
    fn rejects_dangling_foreign_key() {
        let schema = wrap(vec![table(
            "posts",
            &["id", "user_id"],
            vec![Constraint::ForeignKey(ForeignKey {
                name: None,
                columns: vec!["user_id".to_string()],
                referenced_schema: "main".to_string(),
                referenced_table: "users".to_string(),
                referenced_columns: vec!["id".to_string()],
                on_delete: FkAction::NoAction,
            })],
        )]);

        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("referenced table not found"));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let schema = wrap(vec![table("users", &["id", "id"], Vec::new())]);
        assert!(validate_schema(&schema).is_err());
    }
}
