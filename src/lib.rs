//! Statshub Archive
//!
//! Periodically reads the counters and gauges a statshub store holds per
//! dimension and appends them, one row per cycle, to an archive table whose
//! nested schema grows as new dimensions and metrics appear.
//!
//! # Architecture
//!
//! - **Store**: pooled RESP connections with per-connection error latching
//! - **Archive**: schema building and merging, row encoding, table services
//! - **Service**: the read-then-archive cycle and its schedule
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use statshub_archive::{
//!     ArchiveService, ArchiveWriter, ConnectionPool, LocalTableService, PoolOptions,
//!     RespDialer, StatsReader, TableId,
//! };
//!
//! let pool = ConnectionPool::new(
//!     Arc::new(RespDialer::new("localhost:6379")),
//!     PoolOptions::default(),
//! );
//! let writer = ArchiveWriter::new(
//!     Arc::new(LocalTableService::new("./archive")),
//!     TableId::new("proj", "stats", "archive"),
//! );
//! let service = ArchiveService::new(pool, StatsReader::default(), writer);
//! service.run_once()?;
//! # Ok::<(), statshub_archive::CycleError>(())
//! ```

pub mod archive;
pub mod config;
pub mod service;
pub mod stats;
pub mod store;

pub use archive::{
    ArchiveError, ArchiveWriter, LocalTableService, MemoryTableService, TableError, TableId,
    TableSchema, TableService,
};
pub use config::{AppConfig, ConfigError};
pub use service::{ArchiveService, CycleError};
pub use stats::{DimensionedSnapshot, Stats};
pub use store::{
    ConnectionPool, GuardedConnection, PoolOptions, ReleasePolicy, RespDialer, StatsReader,
    StoreError,
};
