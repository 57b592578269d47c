//! Archive cycle and its periodic schedule.
//!
//! One cycle acquires a store connection, reads a snapshot, returns the
//! connection and writes the snapshot as a single archive row. The schedule
//! runs cycles on a tokio interval, each on the blocking pool, until the
//! shutdown future resolves.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::archive::{ArchiveError, ArchiveWriter};
use crate::store::{ConnectionPool, StatsReader, StoreError};

/// Why a cycle failed.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to read stats: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("archive cycle task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Reads stats from the store and archives them.
#[derive(Debug)]
pub struct ArchiveService {
    pool: ConnectionPool,
    reader: StatsReader,
    writer: ArchiveWriter,
}

impl ArchiveService {
    pub fn new(pool: ConnectionPool, reader: StatsReader, writer: ArchiveWriter) -> Self {
        Self {
            pool,
            reader,
            writer,
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Run a single cycle. Blocking.
    pub fn run_once(&self) -> Result<(), CycleError> {
        let captured_at = Utc::now();

        let mut conn = self.pool.acquire()?;
        let snapshot = self.reader.read(&mut conn, captured_at);
        conn.close()?;
        let snapshot = snapshot?;

        self.writer.write_stats(&snapshot, captured_at)?;
        Ok(())
    }

    /// Run cycles every `interval` until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. A failed cycle is logged and the
    /// schedule continues. A cycle in flight when shutdown fires is allowed
    /// to finish. Idle store connections are closed on exit.
    pub async fn run(self: Arc<Self>, interval: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(
            table = %self.writer.table(),
            interval = %humantime::format_duration(interval),
            "Archive schedule started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping archive schedule");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = Arc::clone(&self).run_cycle().await {
                        tracing::error!(error = %e, "Archive cycle failed");
                    }
                }
            }
        }

        self.pool.clear();
    }

    /// Run one cycle on the blocking pool.
    pub async fn run_cycle(self: Arc<Self>) -> Result<(), CycleError> {
        tracing::debug!("Archive cycle starting");
        tokio::task::spawn_blocking(move || self.run_once()).await??;
        tracing::debug!("Archive cycle finished");
        Ok(())
    }
}
