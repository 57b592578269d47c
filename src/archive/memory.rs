//! In-memory table service.
//!
//! Keeps schemas and rows in a map. Used by tests and by the `memory` backend;
//! it records call counts and can be told to fail the next call of a given
//! operation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use strum_macros::{AsRefStr, Display};

use super::{Row, TableError, TableId, TableSchema, TableService};

/// Table service operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    GetSchema,
    CreateTable,
    PatchSchema,
    InsertRows,
}

#[derive(Debug, Default)]
struct MemoryTable {
    schema: TableSchema,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<TableId, MemoryTable>,
    calls: HashMap<Operation, usize>,
    failures: HashMap<Operation, String>,
}

/// Table service backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryTableService {
    state: Mutex<State>,
}

impl MemoryTableService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing table.
    pub fn with_table(self, table: TableId, schema: TableSchema) -> Self {
        self.lock().tables.insert(
            table,
            MemoryTable {
                schema,
                rows: Vec::new(),
            },
        );
        self
    }

    /// Make the next call of `op` fail with [`TableError::Backend`].
    pub fn fail_next(&self, op: Operation, message: impl Into<String>) {
        self.lock().failures.insert(op, message.into());
    }

    /// Number of calls made for `op`, failed ones included.
    pub fn call_count(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Current schema of a table.
    pub fn schema(&self, table: &TableId) -> Option<TableSchema> {
        self.lock().tables.get(table).map(|t| t.schema.clone())
    }

    /// Rows inserted into a table so far.
    pub fn rows(&self, table: &TableId) -> Vec<Row> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, op: Operation) -> Result<MutexGuard<'_, State>, TableError> {
        let mut state = self.lock();
        *state.calls.entry(op).or_default() += 1;
        match state.failures.remove(&op) {
            Some(message) => Err(TableError::Backend(message)),
            None => Ok(state),
        }
    }
}

impl TableService for MemoryTableService {
    fn get_schema(&self, table: &TableId) -> Result<TableSchema, TableError> {
        let state = self.begin(Operation::GetSchema)?;
        state
            .tables
            .get(table)
            .map(|t| t.schema.clone())
            .ok_or_else(|| TableError::NotFound(table.clone()))
    }

    fn create_table(&self, table: &TableId, schema: &TableSchema) -> Result<(), TableError> {
        let mut state = self.begin(Operation::CreateTable)?;
        if state.tables.contains_key(table) {
            return Err(TableError::AlreadyExists(table.clone()));
        }
        state.tables.insert(
            table.clone(),
            MemoryTable {
                schema: schema.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn patch_schema(&self, table: &TableId, schema: &TableSchema) -> Result<(), TableError> {
        let mut state = self.begin(Operation::PatchSchema)?;
        let entry = state
            .tables
            .get_mut(table)
            .ok_or_else(|| TableError::NotFound(table.clone()))?;
        schema
            .check_retains(&entry.schema)
            .map_err(|reason| TableError::IncompatibleSchema {
                table: table.clone(),
                reason,
            })?;
        entry.schema = schema.clone();
        Ok(())
    }

    fn insert_rows(&self, table: &TableId, rows: &[Row]) -> Result<(), TableError> {
        let mut state = self.begin(Operation::InsertRows)?;
        let entry = state
            .tables
            .get_mut(table)
            .ok_or_else(|| TableError::NotFound(table.clone()))?;
        entry.rows.extend_from_slice(rows);
        Ok(())
    }
}
