//! Statistics snapshots.
//!
//! A [`DimensionedSnapshot`] is what one archive cycle works on: the counters
//! and gauges of every dimension (server, region, ...) captured at a single
//! point in time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters and gauges recorded under one dimension key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Cumulative metrics.
    #[serde(default)]
    pub counters: HashMap<String, i64>,
    /// Point-in-time metrics.
    #[serde(default)]
    pub gauges: HashMap<String, i64>,
}

impl Stats {
    /// Create an empty set of statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a counter value.
    pub fn with_counter(mut self, name: impl Into<String>, value: i64) -> Self {
        self.counters.insert(name.into(), value);
        self
    }

    /// Add a gauge value.
    pub fn with_gauge(mut self, name: impl Into<String>, value: i64) -> Self {
        self.gauges.insert(name.into(), value);
        self
    }

    /// True when neither counters nor gauges hold a value.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.gauges.is_empty()
    }
}

/// Statistics for every dimension key, captured at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionedSnapshot {
    dims: HashMap<String, Stats>,
    captured_at: DateTime<Utc>,
}

impl DimensionedSnapshot {
    /// Create an empty snapshot captured at `captured_at`.
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            dims: HashMap::new(),
            captured_at,
        }
    }

    /// Build a snapshot from already collected dimensions.
    pub fn from_dims(dims: HashMap<String, Stats>, captured_at: DateTime<Utc>) -> Self {
        Self { dims, captured_at }
    }

    /// Add (or replace) the statistics of one dimension.
    pub fn with_dim(mut self, key: impl Into<String>, stats: Stats) -> Self {
        self.dims.insert(key.into(), stats);
        self
    }

    /// Statistics of a single dimension.
    pub fn get(&self, key: &str) -> Option<&Stats> {
        self.dims.get(key)
    }

    /// Iterate dimensions in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Stats)> {
        self.dims.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Dimension keys in ascending lexicographic order.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.dims.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.dims.len()
    }

    /// True when no dimension was captured.
    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Capture time of the snapshot.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
