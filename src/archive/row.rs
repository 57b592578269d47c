//! Row encoding.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::schema::{COUNTER_FIELD, GAUGE_FIELD, TIMESTAMP_FIELD};
use crate::stats::DimensionedSnapshot;

/// One table row as a JSON object.
pub type Row = Map<String, Value>;

/// Encode a snapshot as a single row.
///
/// Every dimension present in the snapshot gets a `counter`/`gauge` object,
/// including dimensions with no metrics at all. [`build_schema`] leaves such
/// dimensions out, so those objects are empty and refer to no column.
///
/// [`build_schema`]: super::build_schema
pub fn encode_row(snapshot: &DimensionedSnapshot, capture_time: DateTime<Utc>) -> Row {
    let mut row = Row::new();
    row.insert(TIMESTAMP_FIELD.to_string(), Value::from(capture_time.timestamp()));

    for (key, stats) in snapshot.iter() {
        let mut dim = Map::new();
        dim.insert(COUNTER_FIELD.to_string(), metrics_object(&stats.counters));
        dim.insert(GAUGE_FIELD.to_string(), metrics_object(&stats.gauges));
        row.insert(key.to_string(), Value::Object(dim));
    }

    row
}

fn metrics_object(metrics: &HashMap<String, i64>) -> Value {
    Value::Object(
        metrics
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(*value)))
            .collect(),
    )
}
