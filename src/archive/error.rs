//! Archive-specific error types.
//!
//! [`TableError`] is what a [`TableService`](super::TableService) backend
//! returns. [`ArchiveError`] tags the stage of a write cycle that failed and
//! keeps the backend error as its source, untouched.

use thiserror::Error;

use super::TableId;

/// Errors returned by a table storage backend.
#[derive(Debug, Error)]
pub enum TableError {
    /// The table does not exist.
    #[error("table not found: {0}")]
    NotFound(TableId),

    /// The table already exists (create on an existing table).
    #[error("table already exists: {0}")]
    AlreadyExists(TableId),

    /// A patch would drop a field or change its kind.
    #[error("incompatible schema for {table}: {reason}")]
    IncompatibleSchema { table: TableId, reason: String },

    /// Filesystem error in a local backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl TableError {
    /// True when the error means the table is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors that abort an archive write cycle.
///
/// Each variant names the failed stage and the table, and carries the
/// backend's [`TableError`] untouched as its source. Use
/// [`table_error`](Self::table_error) to get at it.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Fetching the current schema failed for a reason other than absence.
    #[error("failed to fetch schema of {table}: {source}")]
    SchemaFetch {
        table: TableId,
        #[source]
        source: TableError,
    },

    /// Creating the table or patching its schema failed.
    #[error("failed to write schema of {table}: {source}")]
    SchemaWrite {
        table: TableId,
        #[source]
        source: TableError,
    },

    /// Inserting the row failed.
    #[error("failed to insert row into {table}: {source}")]
    RowInsert {
        table: TableId,
        #[source]
        source: TableError,
    },
}

impl ArchiveError {
    /// The backend error behind this failure.
    pub fn table_error(&self) -> &TableError {
        match self {
            Self::SchemaFetch { source, .. }
            | Self::SchemaWrite { source, .. }
            | Self::RowInsert { source, .. } => source,
        }
    }
}
