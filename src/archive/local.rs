//! Directory-backed table service.
//!
//! Each table lives in `{root}/{project}/{dataset}/{table}/`:
//! - `schema.json`: the table schema
//! - `rows.jsonl`: one JSON row per line, append-only

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Row, TableError, TableId, TableSchema, TableService};

const SCHEMA_FILE: &str = "schema.json";
const ROWS_FILE: &str = "rows.jsonl";

/// Table service writing JSON files under a root directory.
#[derive(Debug)]
pub struct LocalTableService {
    root: PathBuf,
    // Serializes read-modify-write sequences across threads.
    write_lock: Mutex<()>,
}

impl LocalTableService {
    /// Create a service rooted at `root`. The directory is created lazily.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Root directory of all tables.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one table's files.
    pub fn table_dir(&self, table: &TableId) -> PathBuf {
        self.root
            .join(&table.project_id)
            .join(&table.dataset_id)
            .join(&table.table_id)
    }

    fn read_schema(&self, table: &TableId) -> Result<TableSchema, TableError> {
        let path = self.table_dir(table).join(SCHEMA_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TableError::NotFound(table.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn write_schema(&self, table: &TableId, schema: &TableSchema) -> Result<(), TableError> {
        let dir = self.table_dir(table);
        fs::create_dir_all(&dir)?;

        // Atomic replace.
        let tmp = dir.join(format!("{SCHEMA_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(schema)?)?;
        fs::rename(&tmp, dir.join(SCHEMA_FILE))?;
        Ok(())
    }
}

impl TableService for LocalTableService {
    fn get_schema(&self, table: &TableId) -> Result<TableSchema, TableError> {
        self.read_schema(table)
    }

    fn create_table(&self, table: &TableId, schema: &TableSchema) -> Result<(), TableError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.table_dir(table).join(SCHEMA_FILE).exists() {
            return Err(TableError::AlreadyExists(table.clone()));
        }
        self.write_schema(table, schema)?;
        tracing::debug!(
            table = %table,
            dir = %self.table_dir(table).display(),
            "Local table created"
        );
        Ok(())
    }

    fn patch_schema(&self, table: &TableId, schema: &TableSchema) -> Result<(), TableError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.read_schema(table)?;
        schema
            .check_retains(&current)
            .map_err(|reason| TableError::IncompatibleSchema {
                table: table.clone(),
                reason,
            })?;
        self.write_schema(table, schema)
    }

    fn insert_rows(&self, table: &TableId, rows: &[Row]) -> Result<(), TableError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let dir = self.table_dir(table);
        if !dir.join(SCHEMA_FILE).exists() {
            return Err(TableError::NotFound(table.clone()));
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(ROWS_FILE))?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        tracing::debug!(table = %table, count = rows.len(), "Rows appended");
        Ok(())
    }
}
