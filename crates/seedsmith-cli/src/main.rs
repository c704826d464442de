mod atomic;
mod create;
mod error;
mod introspect;
mod logging;
mod prompt;
mod seed;
mod settings;
#[cfg(test)]
mod testing;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use seedsmith_introspect::{IntrospectOptions, SqlConnection};
use seedsmith_seed::DispatchRequest;

use create::{TableName, create_seeder};
use error::{CliError, CliResult};
use prompt::{AssumeYes, Confirm, TerminalConfirm};
use settings::{DEFAULT_SETTINGS_FILE, Settings};

#[derive(Parser, Debug)]
#[command(name = "seedsmith", version, about = "Populate relational databases with fake data")]
struct Cli {
    /// Settings file.
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE, env = "SEEDSMITH_CONFIG")]
    config: PathBuf,
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the DatabaseSeeder, or one table seeder (`Name[:method]`).
    Seed(SeedArgs),
    /// Generate a seeder source file for a table.
    Create(CreateArgs),
    /// Write the schema snapshot as JSON.
    Introspect(IntrospectArgs),
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// `Name` or `Name:method`; empty runs every seeder.
    target: Option<String>,
    /// Rows per seeder.
    #[arg(long, short = 'n')]
    num_rows: Option<u64>,
    /// Keep existing rows.
    #[arg(long)]
    skip_truncate: bool,
    /// Allow seeding when the environment is `prod`.
    #[arg(long)]
    run_on_prod: bool,
    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// `table` or `schema/table`.
    table: String,
    /// Answer yes to every confirmation.
    #[arg(long, short = 'y')]
    yes: bool,
    /// Directory for generated seeders; defaults to `seeder_path`.
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Args, Debug)]
struct IntrospectArgs {
    /// Output path for the schema JSON; stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Schema name(s) to include.
    #[arg(long, value_name = "SCHEMA")]
    schema: Vec<String>,
    /// Include views.
    #[arg(long, default_value_t = false)]
    include_views: bool,
    /// Include system schemas such as pg_catalog.
    #[arg(long, default_value_t = false)]
    include_system_schemas: bool,
    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Database connection string; defaults to `database_url`.
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: Option<String>,
}

impl ConnectionArgs {
    async fn connect(&self, settings: &Settings) -> CliResult<SqlConnection> {
        let url = self
            .conn
            .clone()
            .or_else(|| settings.database_url.clone())
            .ok_or_else(|| {
                CliError::InvalidConfig(
                    "connection string is required (--conn, SEEDSMITH_DATABASE_URL or database_url)"
                        .to_string(),
                )
            })?;
        Ok(SqlConnection::connect(&url).await?)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init_logging(cli.log_json) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let started = Instant::now();
    match run(cli).await {
        Ok(()) => {
            info!(
                event = "command_finished",
                status = "success",
                duration_ms = started.elapsed().as_millis() as u64
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(event = "command_failed", error = %err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let settings = Settings::load(&cli.config)?;
    let mut stdout = io::stdout();

    match cli.command {
        Command::Seed(args) => {
            if seed::production_guard(&settings, args.run_on_prod, &mut stdout)? {
                return Ok(());
            }
            let request = DispatchRequest {
                target: args.target,
                row_count: args.num_rows,
                // An absent flag defers to the settings file.
                skip_truncate: args.skip_truncate.then_some(true),
            };
            let mut conn = args.connection.connect(&settings).await?;
            seed::run_seed(&mut conn, &settings, &request, &mut stdout).await?;
            conn.close().await?;
        }
        Command::Create(args) => {
            let name = TableName::parse(&args.table)?;
            let dir = args.out.unwrap_or_else(|| settings.seeder_path.clone());
            let mut confirm: Box<dyn Confirm> = if args.yes {
                Box::new(AssumeYes)
            } else {
                Box::new(TerminalConfirm)
            };
            let mut conn = args.connection.connect(&settings).await?;
            create_seeder(&mut conn, &name, &dir, confirm.as_mut(), &mut stdout).await?;
            conn.close().await?;
        }
        Command::Introspect(args) => {
            let options = IntrospectOptions {
                include_system_schemas: args.include_system_schemas,
                include_views: args.include_views,
                schemas: (!args.schema.is_empty()).then_some(args.schema),
                ..IntrospectOptions::default()
            };
            let mut conn = args.connection.connect(&settings).await?;
            introspect::run_introspect(&mut conn, &options, args.out.as_deref(), &mut stdout)
                .await?;
            conn.close().await?;
        }
    }

    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_seed_flags() {
        let cli = Cli::try_parse_from([
            "seedsmith",
            "seed",
            "Users:plan",
            "--num-rows",
            "25",
            "--skip-truncate",
            "--log-json",
        ])
        .unwrap();

        assert!(cli.log_json);
        let Command::Seed(args) = cli.command else {
            panic!("expected seed command");
        };
        assert_eq!(args.target.as_deref(), Some("Users:plan"));
        assert_eq!(args.num_rows, Some(25));
        assert!(args.skip_truncate);
        assert!(!args.run_on_prod);
    }

    #[test]
    fn parses_create_flags() {
        let cli = Cli::try_parse_from(["seedsmith", "create", "crm/contacts", "--yes"]).unwrap();
        let Command::Create(args) = cli.command else {
            panic!("expected create command");
        };
        assert_eq!(args.table, "crm/contacts");
        assert!(args.yes);
        assert_eq!(args.out, None);
    }
}
