use thiserror::Error;

/// Errors emitted by the seeding runtime.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Core(seedsmith_core::Error),
    #[error("database error: {0}")]
    Database(String),
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error("invalid row for table '{table}': {reason}")]
    InvalidRow { table: String, reason: String },
    #[error("foreign key allocation stalled at row {row} after {attempts} attempts")]
    ForeignKeyAllocation { row: u64, attempts: u64 },
    #[error("seeder '{seeder}' has no method '{method}'")]
    UnknownMethod { seeder: String, method: String },
    #[error("template error: {0}")]
    Template(String),
}

impl From<seedsmith_core::Error> for SeedError {
    fn from(err: seedsmith_core::Error) -> Self {
        match err {
            seedsmith_core::Error::Db(message) => SeedError::Database(message),
            other => SeedError::Core(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SeedError>;
