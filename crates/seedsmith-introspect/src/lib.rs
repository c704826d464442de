//! Database introspection and statement execution over a single connection.

pub mod adapter;
mod catalog;
pub mod connection;
mod mapper;
mod mysql;
pub mod options;
mod postgres;
mod sqlite;

pub use adapter::Adapter;
pub use connection::SqlConnection;
pub use options::IntrospectOptions;

pub use seedsmith_core::DatabaseSchema;
