use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings error: {0}")]
    Settings(#[from] toml::de::Error),
    #[error("core error: {0}")]
    Core(#[from] seedsmith_core::Error),
    #[error(transparent)]
    Seed(#[from] seedsmith_seed::SeedError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("logging error: {0}")]
    Logging(String),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
