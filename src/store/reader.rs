//! Reads the live statistics out of the store.
//!
//! Key layout under a prefix (default `stats`):
//! - `{prefix}:dims`: set of dimension names
//! - `{prefix}:counter:{dim}`: hash of counter name to integer
//! - `{prefix}:gauge:{dim}`: hash of gauge name to integer

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{Command, GuardedConnection, Reply, StoreError};
use crate::stats::{DimensionedSnapshot, Stats};

pub const DEFAULT_KEY_PREFIX: &str = "stats";

/// Builds a [`DimensionedSnapshot`] from one store round of reads.
#[derive(Debug, Clone)]
pub struct StatsReader {
    prefix: String,
}

impl Default for StatsReader {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl StatsReader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn dims_key(&self) -> String {
        format!("{}:dims", self.prefix)
    }

    pub fn counter_key(&self, dim: &str) -> String {
        format!("{}:counter:{dim}", self.prefix)
    }

    pub fn gauge_key(&self, dim: &str) -> String {
        format!("{}:gauge:{dim}", self.prefix)
    }

    /// Read every dimension's counters and gauges.
    ///
    /// The per-dimension hashes are pipelined: all sent, one flush, then all
    /// received. Every reply is drained before any is parsed.
    pub fn read(
        &self,
        conn: &mut GuardedConnection,
        captured_at: DateTime<Utc>,
    ) -> Result<DimensionedSnapshot, StoreError> {
        let dims = conn
            .execute(&Command::new("SMEMBERS").arg(self.dims_key()))?
            .into_strings()?;

        for dim in &dims {
            conn.send(&Command::new("HGETALL").arg(self.counter_key(dim)))?;
            conn.send(&Command::new("HGETALL").arg(self.gauge_key(dim)))?;
        }
        conn.flush()?;

        let mut replies = Vec::with_capacity(dims.len() * 2);
        for _ in 0..dims.len() * 2 {
            replies.push(conn.receive()?);
        }

        let mut snapshot = HashMap::with_capacity(dims.len());
        let mut replies = replies.into_iter();
        for dim in dims {
            let (Some(counters), Some(gauges)) = (replies.next(), replies.next()) else {
                break;
            };
            let stats = Stats {
                counters: parse_metrics(&dim, counters)?,
                gauges: parse_metrics(&dim, gauges)?,
            };
            snapshot.insert(dim, stats);
        }

        tracing::debug!(dims = snapshot.len(), "Read stats from store");
        Ok(DimensionedSnapshot::from_dims(snapshot, captured_at))
    }
}

fn parse_metrics(dim: &str, reply: Reply) -> Result<HashMap<String, i64>, StoreError> {
    reply
        .into_pairs()?
        .into_iter()
        .map(|(name, value)| {
            let parsed = value.parse::<i64>().map_err(|_| {
                StoreError::UnexpectedReply(format!(
                    "non-integer value {value:?} for {dim}.{name}"
                ))
            })?;
            Ok((name, parsed))
        })
        .collect()
}
