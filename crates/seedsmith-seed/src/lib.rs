//! Seeding runtime for seedsmith.
//!
//! Columns are classified into value strategies, rows are buffered per
//! table and column set, and a session flushes them as multi-row inserts
//! after truncating the touched tables with referential checks disabled.

pub mod allocator;
pub mod batch;
pub mod classify;
pub mod codegen;
pub mod dispatch;
pub mod error;
pub mod faker;
pub mod flush;
pub mod seeder;
pub mod session;
pub mod target;

#[cfg(test)]
mod testing;

pub use allocator::{AllocatorOptions, ForeignKeyTupleSet, allocate, allocate_with};
pub use batch::{InsertBatch, InsertedColumnsTracker, Row, RowGroup, TableBatch};
pub use classify::{
    Classifier, ColumnDescriptor, ForeignKeyRef, GeneratorAssignment, SemanticType, Strategy,
    classify, classify_table,
};
pub use codegen::{
    database_seeder_source, fingerprint, render, seeder_class_name, seeder_file_name,
    table_seeder_source,
};
pub use dispatch::{
    DispatchOutcome, DispatchRequest, Dispatcher, ResolvedParameters, SeedDefaults, SeederTarget,
    parse_target,
};
pub use error::{Result, SeedError};
pub use faker::{FakerValueSource, Locale, ValueSource};
pub use flush::{
    FlushOptions, FlushReport, MissingColumns, TableInsertReport, TruncateReport, flush,
};
pub use seeder::{
    DATABASE_SEEDER, DEFAULT_METHOD, DatabaseSeeder, SchemaTableSeeder, SeederRegistry, SeederRun,
    TableSeeder,
};
pub use session::{SeedSession, SessionOptions};
pub use target::SeedTarget;
