use std::io;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

use crate::error::{CliError, CliResult};

const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Install the global subscriber writing to stderr.
///
/// `RUST_LOG` overrides the default filter. `json` switches to one JSON
/// object per event.
pub fn init_logging(json: bool) -> CliResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(io::stderr);
        registry.with(layer).try_init()
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(io::stderr);
        registry.with(layer).try_init()
    };

    installed.map_err(|err| CliError::Logging(err.to_string()))
}
