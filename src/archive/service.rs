//! Table storage backend interface.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Row, TableError, TableSchema};

/// Fully qualified table reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableId {
    /// Create a table reference.
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// Table storage service the archive writes through.
///
/// Calls are blocking and may be issued from any thread.
pub trait TableService: Send + Sync {
    /// Current schema of the table, or [`TableError::NotFound`].
    fn get_schema(&self, table: &TableId) -> Result<TableSchema, TableError>;

    /// Create the table with the given schema.
    fn create_table(&self, table: &TableId, schema: &TableSchema) -> Result<(), TableError>;

    /// Replace the table schema.
    fn patch_schema(&self, table: &TableId, schema: &TableSchema) -> Result<(), TableError>;

    /// Append rows to the table.
    fn insert_rows(&self, table: &TableId, rows: &[Row]) -> Result<(), TableError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_id_display() {
        let id = TableId::new("lantern", "stats", "hourly");
        assert_eq!(id.to_string(), "lantern:stats.hourly");
    }
}
