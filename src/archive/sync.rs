//! Destination schema synchronization.

use std::sync::Arc;

use super::{
    ArchiveError, TableId, TableSchema, TableService, build_schema, consolidate_fields,
};
use crate::stats::DimensionedSnapshot;

/// Keeps the destination table's schema a superset of what a snapshot needs.
#[derive(Clone)]
pub struct TableSynchronizer {
    service: Arc<dyn TableService>,
    table: TableId,
}

impl TableSynchronizer {
    pub fn new(service: Arc<dyn TableService>, table: TableId) -> Self {
        Self { service, table }
    }

    /// The table this synchronizer manages.
    pub fn table(&self) -> &TableId {
        &self.table
    }

    /// Create the table or grow its schema so the snapshot fits.
    ///
    /// A missing table is created with the snapshot's schema. Otherwise the
    /// snapshot's schema is consolidated with the current one (the snapshot's
    /// fields take precedence on clashes) and the table is patched. Returns
    /// the schema that was applied.
    ///
    /// # Errors
    /// - [`ArchiveError::SchemaFetch`] when reading the schema fails for any
    ///   reason other than the table being absent
    /// - [`ArchiveError::SchemaWrite`] when create or patch fails
    pub fn ensure_schema(
        &self,
        snapshot: &DimensionedSnapshot,
    ) -> Result<TableSchema, ArchiveError> {
        let candidate = build_schema(snapshot);

        match self.service.get_schema(&self.table) {
            Err(e) if e.is_not_found() => {
                tracing::info!(table = %self.table, "Creating table");
                if let Err(e) = self.service.create_table(&self.table, &candidate) {
                    tracing::error!(table = %self.table, error = %e, "Error creating table");
                    return Err(ArchiveError::SchemaWrite {
                        table: self.table.clone(),
                        source: e,
                    });
                }
                Ok(candidate)
            }
            Err(e) => Err(ArchiveError::SchemaFetch {
                table: self.table.clone(),
                source: e,
            }),
            Ok(existing) => {
                tracing::info!(table = %self.table, "Patching table schema");
                let merged =
                    TableSchema::new(consolidate_fields(&candidate.fields, &existing.fields));
                if let Err(e) = self.service.patch_schema(&self.table, &merged) {
                    tracing::error!(table = %self.table, error = %e, "Error patching table");
                    return Err(ArchiveError::SchemaWrite {
                        table: self.table.clone(),
                        source: e,
                    });
                }
                Ok(merged)
            }
        }
    }
}

impl std::fmt::Debug for TableSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSynchronizer")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
