//! Latching connection wrapper handed out by the pool.
//!
//! The first failure of any operation latches the connection: every later
//! call returns a clone of that error without touching the wire.

use super::pool::Session;
use super::{Command, ConnectionPool, Reply, StoreError};

/// A pooled connection. Returned to its pool on [`close`](Self::close) or drop.
pub struct GuardedConnection {
    session: Option<Session>,
    pool: ConnectionPool,
}

impl GuardedConnection {
    pub(crate) fn new(session: Session, pool: ConnectionPool) -> Self {
        Self {
            session: Some(session),
            pool,
        }
    }

    /// Round trip one command. Any replies still owed are drained first.
    pub fn execute(&mut self, command: &Command) -> Result<Reply, StoreError> {
        let session = self.session()?;
        let reply = session.guard(|raw| raw.execute(command))?;
        session.settle_all();
        Ok(reply)
    }

    /// Queue a command for pipelining.
    ///
    /// Every sent command must be matched by a [`receive`](Self::receive)
    /// before the connection is closed; otherwise it is latched on release.
    pub fn send(&mut self, command: &Command) -> Result<(), StoreError> {
        let session = self.session()?;
        session.guard(|raw| raw.send(command))?;
        session.owe_reply();
        Ok(())
    }

    /// Write all queued commands.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.session()?.guard(|raw| raw.flush())
    }

    /// Read the next pending reply.
    pub fn receive(&mut self) -> Result<Reply, StoreError> {
        let session = self.session()?;
        let reply = session.guard(|raw| raw.receive())?;
        session.settle_reply();
        Ok(reply)
    }

    pub fn is_latched(&self) -> bool {
        self.latched_error().is_some()
    }

    /// The error this connection is latched on, if any.
    pub fn latched_error(&self) -> Option<&StoreError> {
        self.session.as_ref().and_then(Session::latched_error)
    }

    /// Return the connection to its pool. Always succeeds, latched or not.
    pub fn close(mut self) -> Result<(), StoreError> {
        if let Some(session) = self.session.take() {
            self.pool.put(session);
        }
        Ok(())
    }

    pub(crate) fn into_session(mut self) -> Option<Session> {
        self.session.take()
    }

    fn session(&mut self) -> Result<&mut Session, StoreError> {
        self.session.as_mut().ok_or(StoreError::ConnectionClosed)
    }
}

impl Drop for GuardedConnection {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.put(session);
        }
    }
}

impl std::fmt::Debug for GuardedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedConnection")
            .field("latched", &self.latched_error())
            .finish_non_exhaustive()
    }
}
