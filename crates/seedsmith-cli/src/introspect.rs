//! `seedsmith introspect`: dump the schema snapshot as JSON.

use std::io::Write;
use std::path::Path;

use tracing::info;

use seedsmith_core::{build_fk_graph_report, validate_schema};
use seedsmith_introspect::{Adapter, IntrospectOptions, SqlConnection};

use crate::atomic::write_json_atomic;
use crate::error::CliResult;

pub async fn run_introspect(
    conn: &mut SqlConnection,
    options: &IntrospectOptions,
    out_path: Option<&Path>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let schema = conn.introspect(options).await?;
    validate_schema(&schema)?;

    let graph = build_fk_graph_report(&schema);
    info!(
        event = "introspection_finished",
        tables = graph.summary.nodes,
        foreign_keys = graph.summary.edges,
        has_cycle = graph.cycle.is_some()
    );

    match out_path {
        Some(path) => {
            write_json_atomic(path, &schema)?;
            info!(event = "schema_written", path = %path.display());
        }
        None => {
            serde_json::to_writer_pretty(&mut *out, &schema)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
