//! Core contracts and helpers for seedsmith.
//!
//! This crate defines the canonical schema types, the SQL dialect
//! capabilities, literal values and the helpers shared by the introspection
//! adapter, the seeding runtime and the CLI.

pub mod constraints;
pub mod dialect;
pub mod error;
pub mod graph;
pub mod redaction;
pub mod schema;
pub mod types;
pub mod validation;
pub mod value;

pub use constraints::{Constraint, FkAction, ForeignKey, PrimaryKey, UniqueConstraint};
pub use dialect::{Dialect, DialectOps};
pub use error::{Error, Result};
pub use graph::{FkGraphReport, FkGraphSummary, build_fk_graph_report};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use schema::{Column, DatabaseSchema, Schema, Table, TableKind};
pub use types::ColumnType;
pub use validation::validate_schema;
pub use value::SqlValue;

/// Current schema contract version for `schema.json` artifacts.
pub const SCHEMA_VERSION: &str = "0.1";
