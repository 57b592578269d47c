//! Raw connection capability set.
//!
//! [`RawConnection`] is what a store driver exposes: a request/response call
//! plus the pipelining primitives. [`ConnectionFactory`] dials and
//! authenticates new ones.

use super::StoreError;

/// A store command with binary-safe arguments.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<Vec<u8>>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(arg.as_ref().to_vec());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }
}

// Arguments may carry credentials; only the command name and arity are shown.
impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("args", &self.args.len())
            .finish()
    }
}

/// A decoded server reply. Error replies surface as [`StoreError::Server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Status(String),
    Integer(i64),
    Bulk(Vec<u8>),
    Array(Vec<Reply>),
}

impl Reply {
    /// Text of a status or bulk reply.
    pub fn into_string(self) -> Result<String, StoreError> {
        match self {
            Self::Status(s) => Ok(s),
            Self::Bulk(bytes) => String::from_utf8(bytes)
                .map_err(|e| StoreError::UnexpectedReply(format!("non-utf8 bulk string: {e}"))),
            other => Err(StoreError::UnexpectedReply(format!(
                "expected string, got {other:?}"
            ))),
        }
    }

    /// Elements of an array reply as strings. `Nil` reads as empty.
    pub fn into_strings(self) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Nil => Ok(Vec::new()),
            Self::Array(items) => items.into_iter().map(Reply::into_string).collect(),
            other => Err(StoreError::UnexpectedReply(format!(
                "expected array, got {other:?}"
            ))),
        }
    }

    /// Flat `[k1, v1, k2, v2, ...]` array reply as pairs (HGETALL shape).
    pub fn into_pairs(self) -> Result<Vec<(String, String)>, StoreError> {
        let items = self.into_strings()?;
        if items.len() % 2 != 0 {
            return Err(StoreError::UnexpectedReply(format!(
                "odd number of elements ({}) in key/value reply",
                items.len()
            )));
        }
        let mut pairs = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
            pairs.push((k, v));
        }
        Ok(pairs)
    }
}

/// A live connection to the store.
///
/// `send` queues a command, `flush` writes everything queued, `receive` reads
/// the next pending reply. `execute` is a full round trip.
pub trait RawConnection: Send {
    fn execute(&mut self, command: &Command) -> Result<Reply, StoreError>;

    fn send(&mut self, command: &Command) -> Result<(), StoreError>;

    fn flush(&mut self) -> Result<(), StoreError>;

    fn receive(&mut self) -> Result<Reply, StoreError>;
}

/// Dials and authenticates new store connections.
///
/// Authentication failures are reported as the dial's error.
pub trait ConnectionFactory: Send + Sync {
    fn dial(&self) -> Result<Box<dyn RawConnection>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_debug_hides_args() {
        let cmd = Command::new("AUTH").arg("hunter2");
        let debug = format!("{cmd:?}");
        assert!(debug.contains("AUTH"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(cmd.args(), &[b"hunter2".to_vec()]);
    }

    #[test]
    fn test_into_strings() {
        let reply = Reply::Array(vec![
            Reply::Bulk(b"serverA".to_vec()),
            Reply::Status("serverB".to_string()),
        ]);
        assert_eq!(reply.into_strings().unwrap(), vec!["serverA", "serverB"]);
        assert!(Reply::Nil.into_strings().unwrap().is_empty());
        assert!(Reply::Integer(1).into_strings().is_err());
    }

    #[test]
    fn test_into_pairs() {
        let reply = Reply::Array(vec![
            Reply::Bulk(b"bytesIn".to_vec()),
            Reply::Bulk(b"5".to_vec()),
            Reply::Bulk(b"bytesOut".to_vec()),
            Reply::Bulk(b"7".to_vec()),
        ]);
        assert_eq!(
            reply.into_pairs().unwrap(),
            vec![
                ("bytesIn".to_string(), "5".to_string()),
                ("bytesOut".to_string(), "7".to_string())
            ]
        );
    }

    #[test]
    fn test_into_pairs_rejects_odd_length() {
        let reply = Reply::Array(vec![Reply::Bulk(b"lonely".to_vec())]);
        assert!(matches!(reply.into_pairs(), Err(StoreError::UnexpectedReply(_))));
    }
}
