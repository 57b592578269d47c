//! Table schema model and derivation from a statistics snapshot.
//!
//! The table has one `_ts` TIMESTAMP column plus one RECORD per dimension:
//!
//! ```text
//! _ts        TIMESTAMP
//! serverA    RECORD
//!   counter  RECORD
//!     bytesIn  INTEGER
//!   gauge    RECORD
//!     cpuPct   INTEGER
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::stats::{DimensionedSnapshot, Stats};

/// Name of the capture-time column.
pub const TIMESTAMP_FIELD: &str = "_ts";

/// Name of the record holding a dimension's counters.
pub const COUNTER_FIELD: &str = "counter";

/// Name of the record holding a dimension's gauges.
pub const GAUGE_FIELD: &str = "gauge";

/// Column type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum FieldKind {
    Timestamp,
    Integer,
    /// Nested field list.
    Record,
}

/// A named, typed node of the table schema.
///
/// Only [`FieldKind::Record`] nodes carry children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SchemaField>,
}

impl SchemaField {
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::leaf(name, FieldKind::Timestamp)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::leaf(name, FieldKind::Integer)
    }

    pub fn record(name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Record,
            fields,
        }
    }

    fn leaf(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: Vec::new(),
        }
    }

    pub fn is_record(&self) -> bool {
        self.kind == FieldKind::Record
    }

    /// Direct child by name.
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Root field list of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<SchemaField>,
}

impl TableSchema {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Top-level field by name.
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field at a nested path, e.g. `["serverA", "counter", "bytesIn"]`.
    pub fn find(&self, path: &[&str]) -> Option<&SchemaField> {
        let (first, rest) = path.split_first()?;
        let mut current = self.field(first)?;
        for name in rest {
            current = current.field(name)?;
        }
        Some(current)
    }

    /// Check that every field of `previous` is still present here with the
    /// same kind. Returns the first offending path otherwise.
    pub fn check_retains(&self, previous: &TableSchema) -> Result<(), String> {
        check_fields(&self.fields, &previous.fields, "")
    }
}

fn check_fields(
    current: &[SchemaField],
    previous: &[SchemaField],
    prefix: &str,
) -> Result<(), String> {
    for old in previous {
        let path = if prefix.is_empty() {
            old.name.clone()
        } else {
            format!("{prefix}.{}", old.name)
        };
        let Some(new) = current.iter().find(|f| f.name == old.name) else {
            return Err(format!("field '{path}' would be removed"));
        };
        if new.kind != old.kind {
            return Err(format!(
                "field '{path}' would change type from {} to {}",
                old.kind, new.kind
            ));
        }
        check_fields(&new.fields, &old.fields, &path)?;
    }
    Ok(())
}

/// Derive the table schema for a snapshot.
///
/// Dimensions and metric names are emitted in ascending order, so the result
/// only depends on the snapshot's contents. Dimensions without any metric are
/// left out.
pub fn build_schema(snapshot: &DimensionedSnapshot) -> TableSchema {
    let mut fields = vec![SchemaField::timestamp(TIMESTAMP_FIELD)];

    for key in snapshot.sorted_keys() {
        let Some(stats) = snapshot.get(key) else {
            continue;
        };
        let dim_fields = fields_for_stats(stats);
        if !dim_fields.is_empty() {
            fields.push(SchemaField::record(key, dim_fields));
        }
    }

    TableSchema::new(fields)
}

fn fields_for_stats(stats: &Stats) -> Vec<SchemaField> {
    let mut fields = Vec::with_capacity(2);
    if !stats.counters.is_empty() {
        fields.push(SchemaField::record(COUNTER_FIELD, integer_fields(&stats.counters)));
    }
    if !stats.gauges.is_empty() {
        fields.push(SchemaField::record(GAUGE_FIELD, integer_fields(&stats.gauges)));
    }
    fields
}

fn integer_fields(metrics: &HashMap<String, i64>) -> Vec<SchemaField> {
    let mut names: Vec<&String> = metrics.keys().collect();
    names.sort_unstable();
    names.into_iter().map(SchemaField::integer).collect()
}
