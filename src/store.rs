//! Statistics store access.
//!
//! # Components
//!
//! - [`RawConnection`] / [`ConnectionFactory`]: driver capability set
//! - [`RespDialer`]: RESP2 over TCP, with optional AUTH on dial
//! - [`ConnectionPool`]: bounded, non-blocking reuse of connections
//! - [`GuardedConnection`]: latches the first error and returns it forever
//! - [`StatsReader`]: reads dimensions, counters and gauges into a snapshot

mod conn;
mod error;
mod guarded;
mod pool;
mod reader;
mod resp;
#[cfg(test)]
pub(crate) mod testing;

pub use conn::{Command, ConnectionFactory, RawConnection, Reply};
pub use error::StoreError;
pub use guarded::GuardedConnection;
pub use pool::{ConnectionPool, DEFAULT_POOL_CAPACITY, PoolOptions, ReleasePolicy};
pub use reader::{DEFAULT_KEY_PREFIX, StatsReader};
pub use resp::{DEFAULT_TIMEOUT, RespConnection, RespDialer};
