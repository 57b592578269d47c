//! Bounded pool of reusable store connections.
//!
//! `acquire` never waits: it takes an idle connection if one is buffered and
//! dials otherwise. `release` never waits either: when the idle buffer is
//! full the connection is dropped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::{ConnectionFactory, GuardedConnection, RawConnection, StoreError};

/// Default number of idle connections kept for reuse.
pub const DEFAULT_POOL_CAPACITY: usize = 1000;

/// What to do with a latched connection on release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Drop latched connections instead of buffering them.
    #[default]
    DiscardLatched,
    /// Buffer latched connections like healthy ones.
    RetainLatched,
}

/// Pool tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub capacity: usize,
    pub release_policy: ReleasePolicy,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_CAPACITY,
            release_policy: ReleasePolicy::default(),
        }
    }
}

/// Connection state once it has left the driver's hands.
#[derive(Debug, Clone, Default)]
pub(crate) enum LatchState {
    #[default]
    Healthy,
    Latched(StoreError),
}

/// A raw connection plus its latch.
pub(crate) struct Session {
    raw: Box<dyn RawConnection>,
    state: LatchState,
    // Pipelined replies sent but not yet received.
    owed: usize,
}

impl Session {
    fn new(raw: Box<dyn RawConnection>) -> Self {
        Self {
            raw,
            state: LatchState::Healthy,
            owed: 0,
        }
    }

    pub(crate) fn owe_reply(&mut self) {
        self.owed += 1;
    }

    pub(crate) fn settle_reply(&mut self) {
        self.owed = self.owed.saturating_sub(1);
    }

    pub(crate) fn settle_all(&mut self) {
        self.owed = 0;
    }

    /// Latch a session handed back with unread replies; its stream would
    /// otherwise answer the next holder with stale data.
    fn latch_if_owed(&mut self) {
        if self.owed > 0 && self.latched_error().is_none() {
            let err = StoreError::Protocol(format!(
                "connection released with {} unread replies",
                self.owed
            ));
            tracing::warn!(owed = self.owed, "Store connection latched on release");
            self.state = LatchState::Latched(err);
        }
    }

    pub(crate) fn latched_error(&self) -> Option<&StoreError> {
        match &self.state {
            LatchState::Healthy => None,
            LatchState::Latched(err) => Some(err),
        }
    }

    /// Run `op` against the raw connection unless latched; latch on failure.
    pub(crate) fn guard<T>(
        &mut self,
        op: impl FnOnce(&mut dyn RawConnection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        if let LatchState::Latched(err) = &self.state {
            return Err(err.clone());
        }
        match op(self.raw.as_mut()) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(error = %err, "Store connection latched");
                self.state = LatchState::Latched(err.clone());
                Err(err)
            }
        }
    }
}

struct PoolInner {
    idle: Mutex<VecDeque<Session>>,
    options: PoolOptions,
    factory: Arc<dyn ConnectionFactory>,
}

/// Shared handle to a connection pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new(factory: Arc<dyn ConnectionFactory>, options: PoolOptions) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(VecDeque::new()),
                options,
                factory,
            }),
        }
    }

    /// Take an idle connection, or dial a new one if none is buffered.
    ///
    /// Dial errors, authentication included, are returned as-is.
    pub fn acquire(&self) -> Result<GuardedConnection, StoreError> {
        if let Some(session) = self.lock_idle().pop_front() {
            return Ok(GuardedConnection::new(session, self.clone()));
        }

        tracing::debug!("Dialing new store connection");
        let raw = self.inner.factory.dial()?;
        Ok(GuardedConnection::new(Session::new(raw), self.clone()))
    }

    /// Hand a connection back. Same as [`GuardedConnection::close`].
    pub fn release(&self, conn: GuardedConnection) {
        if let Some(session) = conn.into_session() {
            self.put(session);
        }
    }

    /// Number of buffered idle connections.
    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.options.capacity
    }

    pub fn release_policy(&self) -> ReleasePolicy {
        self.inner.options.release_policy
    }

    /// Drop every idle connection.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.lock_idle());
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "Closed idle store connections");
        }
    }

    pub(crate) fn put(&self, mut session: Session) {
        session.latch_if_owed();
        if session.latched_error().is_some()
            && self.inner.options.release_policy == ReleasePolicy::DiscardLatched
        {
            tracing::debug!("Discarding latched store connection");
            return;
        }

        let mut idle = self.lock_idle();
        if idle.len() >= self.inner.options.capacity {
            tracing::debug!(
                capacity = self.inner.options.capacity,
                "Idle buffer full, closing store connection"
            );
            return;
        }
        idle.push_back(session);
    }

    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<Session>> {
        self.inner.idle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("options", &self.inner.options)
            .field("idle", &self.idle_count())
            .finish_non_exhaustive()
    }
}
