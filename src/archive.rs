//! Archive Layer
//!
//! Persists one aggregated row of statistics per cycle into a columnar table
//! whose schema grows as new dimensions and metrics show up:
//! - **Schema**: snapshot to nested schema tree, and a growth-only tree merge
//! - **Sync**: create the table, or merge with its current schema and patch it
//! - **Writer**: synchronize, encode, insert
//!
//! # Components
//!
//! - [`build_schema`] / [`consolidate_fields`]: schema derivation and merge
//! - [`encode_row`]: snapshot to JSON row
//! - [`TableSynchronizer`]: create-or-patch orchestration
//! - [`ArchiveWriter`]: single entry point for a write cycle
//! - [`TableService`]: table storage backend, with [`MemoryTableService`] and
//!   [`LocalTableService`] implementations

mod error;
mod local;
mod memory;
pub mod merge;
pub mod row;
pub mod schema;
mod service;
mod sync;
mod writer;

pub use error::{ArchiveError, TableError};
pub use local::LocalTableService;
pub use memory::{MemoryTableService, Operation};
pub use merge::consolidate_fields;
pub use row::{Row, encode_row};
pub use schema::{
    COUNTER_FIELD, FieldKind, GAUGE_FIELD, SchemaField, TIMESTAMP_FIELD, TableSchema,
    build_schema,
};
pub use service::{TableId, TableService};
pub use sync::TableSynchronizer;
pub use writer::ArchiveWriter;
