//! Scripted connections for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Command, ConnectionFactory, RawConnection, Reply, StoreError};

/// One scripted outcome of `execute` or `receive`.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Reply(Reply),
    Fail(StoreError),
}

#[derive(Default)]
struct Shared {
    steps: Mutex<VecDeque<Step>>,
    sent: Mutex<Vec<Command>>,
    dials: AtomicUsize,
    drops: AtomicUsize,
    dial_failure: Mutex<Option<StoreError>>,
}

/// Factory whose connections all consume one shared script.
#[derive(Default)]
pub(crate) struct ScriptedFactory {
    shared: Arc<Shared>,
}

impl ScriptedFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, steps: Vec<Step>) {
        self.shared.steps.lock().unwrap().extend(steps);
    }

    pub(crate) fn fail_next_dial(&self, err: StoreError) {
        *self.shared.dial_failure.lock().unwrap() = Some(err);
    }

    pub(crate) fn dial_count(&self) -> usize {
        self.shared.dials.load(Ordering::SeqCst)
    }

    pub(crate) fn dropped_count(&self) -> usize {
        self.shared.drops.load(Ordering::SeqCst)
    }

    pub(crate) fn remaining_steps(&self) -> usize {
        self.shared.steps.lock().unwrap().len()
    }

    pub(crate) fn sent(&self) -> Vec<Command> {
        self.shared.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_names(&self) -> Vec<String> {
        self.sent().iter().map(|c| c.name().to_string()).collect()
    }
}

impl ConnectionFactory for ScriptedFactory {
    fn dial(&self) -> Result<Box<dyn RawConnection>, StoreError> {
        if let Some(err) = self.shared.dial_failure.lock().unwrap().take() {
            return Err(err);
        }
        let id = self.shared.dials.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            id,
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Name of a command answered with the connection's dial index. It neither
/// consumes the script nor shows up in `sent`.
pub(crate) const WHOAMI: &str = "WHOAMI";

struct ScriptedConnection {
    id: usize,
    shared: Arc<Shared>,
}

impl ScriptedConnection {
    fn next(&self) -> Result<Reply, StoreError> {
        match self.shared.steps.lock().unwrap().pop_front() {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(err)) => Err(err),
            None => Err(StoreError::UnexpectedReply("script exhausted".to_string())),
        }
    }
}

impl RawConnection for ScriptedConnection {
    fn execute(&mut self, command: &Command) -> Result<Reply, StoreError> {
        if command.name() == WHOAMI {
            return Ok(Reply::Integer(self.id as i64));
        }
        self.shared.sent.lock().unwrap().push(command.clone());
        self.next()
    }

    fn send(&mut self, command: &Command) -> Result<(), StoreError> {
        self.shared.sent.lock().unwrap().push(command.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn receive(&mut self) -> Result<Reply, StoreError> {
        self.next()
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.shared.drops.fetch_add(1, Ordering::SeqCst);
    }
}
