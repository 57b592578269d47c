//! Archive write cycle: synchronize schema, encode, insert.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{ArchiveError, TableId, TableService, TableSynchronizer, encode_row};
use crate::stats::DimensionedSnapshot;

/// Writes one aggregated row per call into the archive table.
#[derive(Clone)]
pub struct ArchiveWriter {
    sync: TableSynchronizer,
    service: Arc<dyn TableService>,
}

impl ArchiveWriter {
    pub fn new(service: Arc<dyn TableService>, table: TableId) -> Self {
        Self {
            sync: TableSynchronizer::new(Arc::clone(&service), table),
            service,
        }
    }

    /// Destination table.
    pub fn table(&self) -> &TableId {
        self.sync.table()
    }

    /// Write a snapshot as a single row.
    ///
    /// The schema is synchronized first; if that fails nothing is inserted.
    /// No retries are attempted.
    pub fn write_stats(
        &self,
        snapshot: &DimensionedSnapshot,
        capture_time: DateTime<Utc>,
    ) -> Result<(), ArchiveError> {
        self.sync.ensure_schema(snapshot)?;

        let row = encode_row(snapshot, capture_time);
        let table = self.sync.table();
        self.service
            .insert_rows(table, &[row])
            .map_err(|source| ArchiveError::RowInsert {
                table: table.clone(),
                source,
            })?;

        tracing::info!(table = %table, dims = snapshot.len(), "Inserted new row");
        Ok(())
    }
}

impl std::fmt::Debug for ArchiveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("table", self.table())
            .finish_non_exhaustive()
    }
}
