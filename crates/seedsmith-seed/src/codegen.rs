//! Source generation for `seedsmith create`.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use seedsmith_core::Table;

use crate::classify::{GeneratorAssignment, Strategy};
use crate::error::{Result, SeedError};

const TABLE_SEEDER_TEMPLATE: &str = r#"//! Seeder for `{{table}}`.
//!
//! Generated by `seedsmith create` (schema fingerprint {{fingerprint}}).
//!
//! Columns:
{{column_docs}}

use async_trait::async_trait;
use seedsmith_seed::{Result, Row, SeedSession, Strategy, TableSeeder};

pub struct {{class_name}};

#[async_trait]
impl TableSeeder for {{class_name}} {
    fn name(&self) -> &str {
        "{{class_name}}"
    }

    fn table(&self) -> Option<&str> {
        Some("{{table}}")
    }

    async fn run(&self, session: &mut SeedSession<'_>, count: u64) -> Result<()> {
{{body}}
        Ok(())
    }
}
"#;

const DATABASE_SEEDER_TEMPLATE: &str = r#"//! Umbrella seeder.
//!
//! Generated by `seedsmith create`. Register each table seeder below;
//! `seedsmith seed` runs them parents first.

use seedsmith_seed::SeederRegistry;

pub fn registry() -> SeederRegistry {
    #[allow(unused_mut)]
    let mut registry = SeederRegistry::new();
    // registry.register(Box::new(users::UsersTableSeeder));
    registry
}
"#;

/// Replace every `{{key}}` in `template` with `params[key]`.
///
/// Whitespace inside the braces is ignored. A placeholder without a value
/// or an unclosed `{{` is an error.
pub fn render(template: &str, params: &BTreeMap<&str, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let offset = template.len() - rest.len() + start;
        let end = after
            .find("}}")
            .ok_or_else(|| SeedError::Template(format!("unclosed placeholder at byte {offset}")))?;
        let key = after[..end].trim();
        let value = params
            .get(key)
            .ok_or_else(|| SeedError::Template(format!("missing value for placeholder '{key}'")))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// `user_profiles` → `UserProfilesTableSeeder`. Only the last path or
/// schema segment counts.
pub fn seeder_class_name(table: &str) -> String {
    let bare = table.rsplit(['.', '/']).next().unwrap_or(table);
    let mut name: String = bare
        .split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    name.push_str("TableSeeder");
    name
}

/// File name of the generated seeder for `table`.
pub fn seeder_file_name(table: &str) -> String {
    format!("{}.rs", seeder_class_name(table))
}

/// sha256 hex of the table's JSON form.
pub fn fingerprint(table: &Table) -> Result<String> {
    let bytes = serde_json::to_vec(table)
        .map_err(|err| SeedError::Template(format!("failed to serialize table: {err}")))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Rust source of a `TableSeeder` inserting `count` rows into `table`.
pub fn table_seeder_source(
    table: &str,
    assignments: &[GeneratorAssignment],
    fingerprint: &str,
) -> Result<String> {
    let mut params = BTreeMap::new();
    params.insert("table", table.to_string());
    params.insert("class_name", seeder_class_name(table));
    params.insert("fingerprint", fingerprint.to_string());
    params.insert("column_docs", column_docs(assignments));
    params.insert("body", run_body(table, assignments));
    render(TABLE_SEEDER_TEMPLATE, &params)
}

/// Rust source of the umbrella registry file.
pub fn database_seeder_source() -> Result<String> {
    render(DATABASE_SEEDER_TEMPLATE, &BTreeMap::new())
}

fn column_docs(assignments: &[GeneratorAssignment]) -> String {
    if assignments.is_empty() {
        return "//! - none".to_string();
    }
    assignments
        .iter()
        .map(|assignment| match &assignment.foreign_key {
            Some(fk) => format!(
                "//! - `{}`: foreign key to `{}.{}`",
                assignment.column, fk.table, fk.pk_column
            ),
            None => format!("//! - `{}`: {}", assignment.column, assignment.strategy.tag()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn run_body(table: &str, assignments: &[GeneratorAssignment]) -> String {
    let width = assignments
        .iter()
        .filter(|assignment| assignment.foreign_key.is_some())
        .count();

    let mut lines = Vec::new();
    if width > 0 {
        lines.push(format!(
            "        let foreign_keys = session.allocate_foreign_keys(count, {width})?;"
        ));
        lines.push("        for row in 1..=count {".to_string());
        lines.push("            let keys = foreign_keys.get(row).unwrap_or_default();".to_string());
    } else {
        lines.push("        for _ in 0..count {".to_string());
    }
    lines.push("            let values = session.values();".to_string());
    lines.push("            let record = Row::new()".to_string());

    let mut slot = 0;
    for assignment in assignments {
        let value = match assignment.foreign_key {
            Some(_) => {
                let expr = format!("keys[{slot}]");
                slot += 1;
                expr
            }
            None => format!("values.value_for(&{})", strategy_expr(&assignment.strategy)),
        };
        lines.push(format!(
            "                .with(\"{}\", {value})",
            assignment.column
        ));
    }
    if let Some(last) = lines.last_mut() {
        last.push(';');
    }
    lines.push(format!("            session.insert(\"{table}\", record).await?;"));
    lines.push("        }".to_string());
    lines.join("\n")
}

fn strategy_expr(strategy: &Strategy) -> String {
    let variant = match strategy {
        Strategy::NumberBetween { .. } => {
            return "Strategy::NumberBetween { max: count }".to_string();
        }
        Strategy::Name => "Name",
        Strategy::RealText => "RealText",
        Strategy::Company => "Company",
        Strategy::Cnpj => "Cnpj",
        Strategy::Cpf => "Cpf",
        Strategy::Email => "Email",
        Strategy::Boolean => "Boolean",
        Strategy::Date => "Date",
        Strategy::DateTime => "DateTime",
        Strategy::Year => "Year",
        Strategy::Time => "Time",
        Strategy::Text => "Text",
    };
    format!("Strategy::{variant}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ForeignKeyRef;
    use crate::testing::table;

    fn params(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs
            .iter()
            .map(|(key, value)| (*key, value.to_string()))
            .collect()
    }

    #[test]
    fn render_substitutes_placeholders() {
        let out = render(
            "hello {{name}}, {{ name }} again",
            &params(&[("name", "world")]),
        )
        .unwrap();
        assert_eq!(out, "hello world, world again");
    }

    #[test]
    fn render_rejects_unknown_and_unclosed_placeholders() {
        let err = render("{{missing}}", &params(&[])).unwrap_err();
        assert!(matches!(err, SeedError::Template(ref msg) if msg.contains("missing")));

        let err = render("x {{open", &params(&[])).unwrap_err();
        assert!(matches!(err, SeedError::Template(ref msg) if msg.contains("unclosed")));
    }

    #[test]
    fn class_names_are_camel_cased() {
        assert_eq!(seeder_class_name("users"), "UsersTableSeeder");
        assert_eq!(seeder_class_name("user_profiles"), "UserProfilesTableSeeder");
        assert_eq!(seeder_class_name("public.order-items"), "OrderItemsTableSeeder");
        assert_eq!(seeder_class_name("crm/contacts"), "ContactsTableSeeder");
        assert_eq!(seeder_file_name("users"), "UsersTableSeeder.rs");
    }

    #[test]
    fn fingerprint_tracks_table_shape() {
        let users = table("users", &[("id", "integer", true), ("name", "text", false)]);
        let mut renamed = users.clone();
        renamed.columns[1].name = "full_name".to_string();

        let first = fingerprint(&users).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, fingerprint(&users).unwrap());
        assert_ne!(first, fingerprint(&renamed).unwrap());
    }

    #[test]
    fn table_seeder_source_covers_each_assignment() {
        let assignments = vec![
            GeneratorAssignment {
                column: "user_id".to_string(),
                strategy: Strategy::NumberBetween { max: 10 },
                foreign_key: Some(ForeignKeyRef {
                    table: "users".to_string(),
                    pk_column: "id".to_string(),
                }),
            },
            GeneratorAssignment {
                column: "title".to_string(),
                strategy: Strategy::Text,
                foreign_key: None,
            },
            GeneratorAssignment {
                column: "views".to_string(),
                strategy: Strategy::NumberBetween { max: 10 },
                foreign_key: None,
            },
        ];

        let source = table_seeder_source("posts", &assignments, "abc123").unwrap();

        assert!(source.contains("pub struct PostsTableSeeder;"));
        assert!(source.contains("schema fingerprint abc123"));
        assert!(source.contains("//! - `user_id`: foreign key to `users.id`"));
        assert!(source.contains("//! - `views`: numberBetween(1, 10)"));
        assert!(source.contains("session.allocate_foreign_keys(count, 1)?"));
        assert!(source.contains(".with(\"user_id\", keys[0])"));
        assert!(source.contains(".with(\"title\", values.value_for(&Strategy::Text))"));
        assert!(source.contains(
            ".with(\"views\", values.value_for(&Strategy::NumberBetween { max: count }));"
        ));
        assert!(source.contains("session.insert(\"posts\", record).await?;"));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn table_seeder_without_foreign_keys_skips_allocation() {
        let assignments = vec![GeneratorAssignment {
            column: "name".to_string(),
            strategy: Strategy::Name,
            foreign_key: None,
        }];
        let source = table_seeder_source("tags", &assignments, "f").unwrap();
        assert!(!source.contains("allocate_foreign_keys"));
        assert!(source.contains(".with(\"name\", values.value_for(&Strategy::Name));"));
    }

    #[test]
    fn database_seeder_source_builds_registry() {
        let source = database_seeder_source().unwrap();
        assert!(source.contains("pub fn registry() -> SeederRegistry"));
    }
}
