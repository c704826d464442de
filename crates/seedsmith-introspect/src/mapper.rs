use std::collections::BTreeMap;

use seedsmith_core::{
    Column, ColumnType, Constraint, FkAction, ForeignKey, PrimaryKey, Table, TableKind,
    UniqueConstraint,
};

use crate::catalog::{KeyKind, RawColumn, RawKeyColumn, RawTable};
use crate::options::IntrospectOptions;

pub fn filter_schemas(
    raw: Vec<String>,
    opts: &IntrospectOptions,
    is_system: impl Fn(&str) -> bool,
) -> Vec<String> {
    raw.into_iter()
        .filter(|schema| match &opts.schemas {
            Some(list) => list.iter().any(|item| item == schema),
            None => opts.include_system_schemas || !is_system(schema),
        })
        .collect()
}

pub fn map_tables(raw: Vec<RawTable>, opts: &IntrospectOptions) -> Vec<Table> {
    raw.into_iter()
        .filter(|table| opts.include_views || !table.is_view)
        .map(|table| Table {
            name: table.name,
            kind: if table.is_view {
                TableKind::View
            } else {
                TableKind::Table
            },
            comment: table.comment.filter(|_| opts.include_comments),
            columns: Vec::new(),
            constraints: Vec::new(),
        })
        .collect()
}

pub fn map_columns(raw: Vec<RawColumn>, opts: &IntrospectOptions) -> Vec<Column> {
    raw.into_iter()
        .map(|col| Column {
            ordinal_position: col.ordinal_position as i32,
            name: col.name,
            column_type: ColumnType {
                data_type: col.data_type,
                udt_name: col.udt_name.to_lowercase(),
                character_max_length: col.character_max_length.map(|len| len as i32),
            },
            is_nullable: col.is_nullable,
            default: col.default,
            auto_increment: col.auto_increment,
            comment: col
                .comment
                .filter(|comment| opts.include_comments && !comment.is_empty()),
        })
        .collect()
}

/// Group key rows by constraint and rebuild ordered constraints.
///
/// Foreign keys missing a referenced schema inherit `schema`.
pub fn map_keys(raw: Vec<RawKeyColumn>, schema: &str) -> Vec<Constraint> {
    let mut grouped: BTreeMap<(u8, String), Vec<RawKeyColumn>> = BTreeMap::new();
    for key in raw {
        let rank = match key.kind {
            KeyKind::Primary => 0,
            KeyKind::Unique => 1,
            KeyKind::Foreign => 2,
        };
        grouped
            .entry((rank, key.constraint.clone()))
            .or_default()
            .push(key);
    }

    grouped
        .into_iter()
        .filter_map(|((_, name), mut columns)| {
            columns.sort_by_key(|column| column.position);
            let first = columns.first()?;
            let kind = first.kind;
            let constraint = match kind {
                KeyKind::Primary => Constraint::PrimaryKey(PrimaryKey {
                    name: Some(name),
                    columns: columns.into_iter().map(|column| column.column).collect(),
                }),
                KeyKind::Unique => Constraint::Unique(UniqueConstraint {
                    name: Some(name),
                    columns: columns.into_iter().map(|column| column.column).collect(),
                }),
                KeyKind::Foreign => {
                    let referenced_schema = first
                        .referenced_schema
                        .clone()
                        .unwrap_or_else(|| schema.to_string());
                    let referenced_table = first.referenced_table.clone()?;
                    let on_delete = first
                        .on_delete
                        .as_deref()
                        .map(FkAction::from_rule)
                        .unwrap_or(FkAction::NoAction);
                    let referenced_columns = columns
                        .iter()
                        .map(|column| column.referenced_column.clone())
                        .collect::<Option<Vec<_>>>()
                        .unwrap_or_default();
                    Constraint::ForeignKey(ForeignKey {
                        name: Some(name),
                        columns: columns.into_iter().map(|column| column.column).collect(),
                        referenced_schema,
                        referenced_table,
                        referenced_columns,
                        on_delete,
                    })
                }
            };
            Some(constraint)
        })
        .collect()
}

/// Split `schema.table`; bare names resolve against `default_schema`.
pub fn split_table_name<'a>(name: &'a str, default_schema: &'a str) -> (&'a str, &'a str) {
    name.split_once('.').unwrap_or((default_schema, name))
}
