//! `seedsmith seed`: run the umbrella or one table seeder.

use std::io::Write;
use std::sync::Arc;

use tracing::info;

use seedsmith_introspect::{Adapter, IntrospectOptions, SqlConnection};
use seedsmith_seed::{
    DispatchOutcome, DispatchRequest, Dispatcher, FakerValueSource, SeederRegistry, SeederRun,
};

use crate::error::CliResult;
use crate::settings::Settings;

pub const PRODUCTION_GUARD: &str = "SEEDSMITH_ENV is set to 'prod'.\n\
Seeding is not possible on production systems. Use '--run-on-prod' to ignore it.";

/// `true` when the run must stop before touching the database.
pub fn production_guard(
    settings: &Settings,
    run_on_prod: bool,
    out: &mut dyn Write,
) -> CliResult<bool> {
    if settings.is_production() && !run_on_prod {
        writeln!(out, "{PRODUCTION_GUARD}")?;
        return Ok(true);
    }
    Ok(false)
}

/// Seed through `conn` with seeders derived from its live schema.
pub async fn run_seed(
    conn: &mut SqlConnection,
    settings: &Settings,
    request: &DispatchRequest,
    out: &mut dyn Write,
) -> CliResult<DispatchOutcome> {
    let schema = Arc::new(conn.introspect(&IntrospectOptions::default()).await?);
    let registry = SeederRegistry::from_schema(Arc::clone(&schema));
    info!(
        event = "seeders_registered",
        seeders = registry.len(),
        locale = settings.locale.as_str()
    );

    let dispatcher = Dispatcher::new(&registry, settings.seed_defaults()).with_schema(&schema);
    let mut values = FakerValueSource::new(settings.locale, settings.seed);
    let outcome = dispatcher.dispatch(conn, &mut values, request).await?;

    match &outcome {
        DispatchOutcome::Completed(runs) => print_runs(runs, out)?,
        DispatchOutcome::Unresolved { seeder, method } => {
            if registry.get(seeder).is_some() {
                writeln!(out, "Method {method} not exists in class {seeder}.")?;
            } else {
                writeln!(out, "Class {seeder} not exists.")?;
            }
        }
    }
    Ok(outcome)
}

fn print_runs(runs: &[SeederRun], out: &mut dyn Write) -> CliResult<()> {
    for run in runs {
        for truncate in &run.report.truncated {
            writeln!(out, "    > {}", truncate.summary_line())?;
        }
        for table in &run.report.tables {
            writeln!(out, "    > {}", table.summary_line())?;
        }
        if let Some(block) = seedsmith_seed::flush::render_missing_columns(&run.report.missing) {
            writeln!(out, "{block}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use seedsmith_seed::{FlushReport, MissingColumns, TableInsertReport, TruncateReport};

    #[test]
    fn guard_blocks_production_unless_overridden() {
        let prod = Settings {
            environment: "prod".to_string(),
            ..Settings::default()
        };
        let mut out = Vec::new();

        assert!(production_guard(&prod, false, &mut out).unwrap());
        assert!(String::from_utf8(out).unwrap().contains("--run-on-prod"));

        let mut out = Vec::new();
        assert!(!production_guard(&prod, true, &mut out).unwrap());
        assert!(!production_guard(&Settings::default(), false, &mut out).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn prints_truncates_inserts_and_missing_columns() {
        let runs = vec![SeederRun {
            seeder: "UsersTableSeeder".to_string(),
            report: FlushReport {
                truncated: vec![TruncateReport {
                    table: "users".to_string(),
                    elapsed: Duration::from_millis(3),
                }],
                tables: vec![TableInsertReport {
                    table: "users".to_string(),
                    rows: 1,
                    statements: 1,
                }],
                missing: vec![MissingColumns {
                    table: "users".to_string(),
                    columns: vec![("email".to_string(), "varchar(120)".to_string())],
                }],
            },
        }];
        let mut out = Vec::new();

        print_runs(&runs, &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines[0], "    > truncate table users ... done (time: 0.003s)");
        assert_eq!(lines[1], "    > 1 row inserted in users");
        assert!(lines[2].contains(" MISSING COLUMNS "));
        assert!(printed.contains("#    email => varchar(120)"));
    }
}
