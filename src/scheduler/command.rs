//! Cross-thread command ring and error stack.
//!
//! Both live in `ThreadShared` behind a `spin::Mutex`: the scheduler side
//! pushes commands and pops errors, the worker drains commands at a tick
//! boundary and pushes errors. Contending threads busy-wait, so nothing slow
//! (logging included) happens while either lock is held.

use crate::error::Error;
use crate::graph::id::GraphId;
use crate::graph::pipeline::Pipeline;
use std::collections::VecDeque;

/// Operations applied by a worker to its own graphs.
pub enum Command {
    AddGraph(GraphId, Box<Pipeline>),
    RemoveGraph(GraphId),
    /// Leave the Broken state.
    ForceRestart(GraphId),
    Run,
    Stop,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::AddGraph(id, pipeline) => write!(f, "AddGraph({}, '{}')", id, pipeline.name()),
            Command::RemoveGraph(id) => write!(f, "RemoveGraph({})", id),
            Command::ForceRestart(id) => write!(f, "ForceRestart({})", id),
            Command::Run => f.write_str("Run"),
            Command::Stop => f.write_str("Stop"),
        }
    }
}

/// Bounded FIFO of pending commands.
pub(crate) struct CommandRing {
    commands: VecDeque<Command>,
    capacity: usize,
}

impl CommandRing {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            commands: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Enqueue, handing the command back when the ring is full.
    pub(crate) fn push(&mut self, command: Command) -> Result<(), Command> {
        if self.is_full() {
            return Err(command);
        }
        self.push_back(command);
        Ok(())
    }

    /// Enqueue without the capacity check. Callers check `is_full` under the
    /// same lock first.
    pub(crate) fn push_back(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    pub(crate) fn is_full(&self) -> bool {
        self.commands.len() >= self.capacity
    }

    pub(crate) fn drain(&mut self) -> Vec<Command> {
        self.commands.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.commands.len()
    }
}

/// Bounded stack of graph failures. Pops newest first; pushing onto a full
/// stack discards the oldest entry.
pub struct ErrorStack {
    entries: VecDeque<(GraphId, Error)>,
    capacity: usize,
    discarded: u64,
}

impl ErrorStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            discarded: 0,
        }
    }

    /// Push a failure. Returns the oldest entry when it had to make room.
    pub fn push(&mut self, graph: GraphId, error: Error) -> Option<(GraphId, Error)> {
        let discarded = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        if discarded.is_some() {
            self.discarded += 1;
        }
        self.entries.push_back((graph, error));
        discarded
    }

    pub fn pop(&mut self) -> Option<(GraphId, Error)> {
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries dropped because the stack was full.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}
