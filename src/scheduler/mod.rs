//! Thread scheduler
//!
//! The scheduler owns a bounded set of worker threads. Each thread drives
//! its own pipelines by polling them in a loop; nothing is shared between
//! threads except queue bricks and the per-thread `ThreadShared` block.
//!
//! Graph lifecycle on a thread:
//!
//! ```text
//!   add_graph ─► Stopped ──run──► Running ──poll error──► Broken
//!                   ▲               │                       │
//!                   └─────stop──────┘     force_restart ◄───┘
//! ```
//!
//! `add_graph`, `remove_graph`, `force_restart`, `run` and `stop` never touch
//! the worker's graphs directly: they are queued on the thread's command ring
//! and applied by the worker at the start of its next tick. Queries (`state`,
//! `graph_state`, `stats`) read what the worker published at the end of its
//! last tick.

pub mod command;
pub mod worker;

pub use command::{Command, ErrorStack};
pub use worker::Worker;

use crate::config::SchedulerConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::graph::id::{GraphId, ThreadId};
use crate::graph::pipeline::Pipeline;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use worker::ThreadShared;

/// Reported state of a scheduler thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ThreadState {
    Stopped = 0,
    Running = 1,
    /// Running, but at least one of its graphs is broken.
    Broken = 2,
}

impl ThreadState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => ThreadState::Running,
            2 => ThreadState::Broken,
            _ => ThreadState::Stopped,
        }
    }
}

/// State of one graph on a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GraphState {
    Stopped,
    Running,
    Broken,
}

/// Counters published by a worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThreadStats {
    pub ticks: u64,
    pub packets: u64,
    pub graphs: usize,
    pub pending_commands: usize,
    pub pending_errors: usize,
}

struct ThreadHandle {
    shared: Arc<ThreadShared>,
    /// `None` for threads driven by hand through a `Worker`.
    join: Option<JoinHandle<Vec<Pipeline>>>,
    next_graph: u32,
}

/// One entry of `Scheduler::threads`. The generation is bumped on `destroy`.
#[derive(Default)]
struct ThreadSlot {
    generation: u32,
    handle: Option<ThreadHandle>,
}

/// `add_graph` failure. The rejected pipeline is handed back intact.
pub struct AddGraphError {
    error: Error,
    pipeline: Box<Pipeline>,
}

impl AddGraphError {
    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn into_pipeline(self) -> Pipeline {
        *self.pipeline
    }

    pub fn into_parts(self) -> (Error, Pipeline) {
        (self.error, *self.pipeline)
    }
}

impl fmt::Debug for AddGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddGraphError")
            .field("error", &self.error)
            .field("pipeline", &self.pipeline.name())
            .finish()
    }
}

impl fmt::Display for AddGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot add graph '{}': {}", self.pipeline.name(), self.error)
    }
}

impl std::error::Error for AddGraphError {}

impl From<AddGraphError> for Error {
    fn from(err: AddGraphError) -> Self {
        err.error
    }
}

/// Owner of the worker threads.
pub struct Scheduler {
    config: SchedulerConfig,
    threads: Vec<ThreadSlot>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            threads: Vec::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Live threads.
    pub fn thread_count(&self) -> usize {
        self.threads.iter().filter(|t| t.handle.is_some()).count()
    }

    /// Spawn a worker thread. It starts Stopped.
    pub fn init(&mut self) -> Result<ThreadId> {
        let (id, worker) = self.register()?;
        let spawned = std::thread::Builder::new()
            .name(format!("brickgraph-{}", id.index()))
            .spawn(move || worker.run());
        match spawned {
            Ok(join) => {
                self.handle_mut(id)?.join = Some(join);
                tracing::info!("Spawned scheduler thread {}", id);
                Ok(id)
            }
            Err(e) => {
                self.release(id);
                Err(Error::new(ErrorKind::Spawn(e.to_string())))
            }
        }
    }

    /// Register a thread without spawning it. The caller drives the returned
    /// `Worker` with `tick`.
    pub fn init_manual(&mut self) -> Result<(ThreadId, Worker)> {
        let registered = self.register()?;
        tracing::info!("Registered manual scheduler thread {}", registered.0);
        Ok(registered)
    }

    fn register(&mut self) -> Result<(ThreadId, Worker)> {
        if self.thread_count() >= self.config.max_threads {
            return Err(Error::new(ErrorKind::ThreadLimit(self.config.max_threads)));
        }
        let index = match self.threads.iter().position(|t| t.handle.is_none()) {
            Some(index) => index,
            None => {
                self.threads.push(ThreadSlot::default());
                self.threads.len() - 1
            }
        };
        let slot = &mut self.threads[index];
        let id = ThreadId::new(index as u32, slot.generation);
        let shared = Arc::new(ThreadShared::new(&self.config));
        let worker = Worker::new(id, Arc::clone(&shared), self.config.idle_sleep());
        slot.handle = Some(ThreadHandle {
            shared,
            join: None,
            next_graph: 0,
        });
        Ok((id, worker))
    }

    /// Empty the slot of `tid` and retire its id.
    fn release(&mut self, tid: ThreadId) -> Option<ThreadHandle> {
        let slot = self
            .threads
            .get_mut(tid.index())
            .filter(|slot| slot.generation == tid.generation())?;
        let handle = slot.handle.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        Some(handle)
    }

    fn handle(&self, tid: ThreadId) -> Result<&ThreadHandle> {
        self.threads
            .get(tid.index())
            .filter(|slot| slot.generation == tid.generation())
            .and_then(|slot| slot.handle.as_ref())
            .ok_or_else(|| Error::new(ErrorKind::InvalidThread(tid)))
    }

    fn handle_mut(&mut self, tid: ThreadId) -> Result<&mut ThreadHandle> {
        self.threads
            .get_mut(tid.index())
            .filter(|slot| slot.generation == tid.generation())
            .and_then(|slot| slot.handle.as_mut())
            .ok_or_else(|| Error::new(ErrorKind::InvalidThread(tid)))
    }

    fn send(&self, tid: ThreadId, command: Command) -> Result<()> {
        let handle = self.handle(tid)?;
        let pushed = handle.shared.commands.lock().push(command);
        pushed.map_err(|rejected| {
            tracing::warn!("Command ring of {} full, rejecting {:?}", tid, rejected);
            Error::new(ErrorKind::CommandQueueFull(tid))
        })
    }

    /// Hand a pipeline to a thread. It is polled once the thread runs.
    ///
    /// On failure (unknown thread, full command ring) the pipeline comes back
    /// inside the error and no graph id is consumed.
    pub fn add_graph(
        &mut self,
        tid: ThreadId,
        pipeline: Pipeline,
    ) -> std::result::Result<GraphId, AddGraphError> {
        let handle = match self.handle_mut(tid) {
            Ok(handle) => handle,
            Err(error) => {
                return Err(AddGraphError {
                    error,
                    pipeline: Box::new(pipeline),
                })
            }
        };
        let mut commands = handle.shared.commands.lock();
        if commands.is_full() {
            drop(commands);
            tracing::warn!("Command ring of {} full, returning graph '{}'", tid, pipeline.name());
            return Err(AddGraphError {
                error: Error::new(ErrorKind::CommandQueueFull(tid)),
                pipeline: Box::new(pipeline),
            });
        }
        let id = GraphId(handle.next_graph);
        commands.push_back(Command::AddGraph(id, Box::new(pipeline)));
        drop(commands);
        handle.next_graph += 1;
        Ok(id)
    }

    /// Drop a graph from a thread, destroying its pipeline.
    pub fn remove_graph(&self, tid: ThreadId, gid: GraphId) -> Result<()> {
        self.send(tid, Command::RemoveGraph(gid))
    }

    pub fn run(&self, tid: ThreadId) -> Result<()> {
        self.send(tid, Command::Run)
    }

    pub fn stop(&self, tid: ThreadId) -> Result<()> {
        self.send(tid, Command::Stop)
    }

    /// Take a Broken graph back into service.
    pub fn force_restart(&self, tid: ThreadId, gid: GraphId) -> Result<()> {
        self.send(tid, Command::ForceRestart(gid))
    }

    pub fn state(&self, tid: ThreadId) -> Result<ThreadState> {
        Ok(self.handle(tid)?.shared.state())
    }

    /// State of a graph as of the thread's last tick.
    pub fn graph_state(&self, tid: ThreadId, gid: GraphId) -> Result<GraphState> {
        let handle = self.handle(tid)?;
        let graphs = handle.shared.graphs.lock();
        graphs
            .iter()
            .find(|(id, _)| *id == gid)
            .map(|&(_, state)| state)
            .ok_or_else(|| Error::new(ErrorKind::InvalidGraph { thread: tid, graph: gid }))
    }

    /// Most recent unread graph failure on the thread.
    pub fn pop_error(&self, tid: ThreadId) -> Result<Option<(GraphId, Error)>> {
        Ok(self.handle(tid)?.shared.errors.lock().pop())
    }

    pub fn stats(&self, tid: ThreadId) -> Result<ThreadStats> {
        let shared = &self.handle(tid)?.shared;
        Ok(ThreadStats {
            ticks: shared.ticks.load(Ordering::Relaxed),
            packets: shared.packets.load(Ordering::Relaxed),
            graphs: shared.graphs.lock().len(),
            pending_commands: shared.commands.lock().len(),
            pending_errors: shared.errors.lock().len(),
        })
    }

    /// Stop and join a thread, returning its pipelines (including ones whose
    /// `add_graph` had not been applied yet). A manual thread only returns
    /// the pending ones; the rest stay with its `Worker`.
    ///
    /// `tid` is invalid afterwards, even once `init` reuses its slot.
    pub fn destroy(&mut self, tid: ThreadId) -> Result<Vec<Pipeline>> {
        let handle = self
            .release(tid)
            .ok_or_else(|| Error::new(ErrorKind::InvalidThread(tid)))?;
        handle.shared.shutdown.store(true, Ordering::Release);

        let mut pipelines = match handle.join {
            Some(join) => join.join().map_err(|_| {
                Error::new(ErrorKind::Spawn(format!("thread {} panicked", tid)))
            })?,
            None => Vec::new(),
        };
        let pending = handle.shared.commands.lock().drain();
        for command in pending {
            if let Command::AddGraph(_, pipeline) = command {
                pipelines.push(*pipeline);
            }
        }
        tracing::info!("Destroyed scheduler thread {} ({} pipelines)", tid, pipelines.len());
        Ok(pipelines)
    }

    /// Destroy every thread, dropping their pipelines.
    pub fn shutdown(&mut self) {
        let ids: Vec<ThreadId> = self
            .threads
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.handle.is_some())
            .map(|(i, slot)| ThreadId::new(i as u32, slot.generation))
            .collect();
        for tid in ids {
            if let Err(e) = self.destroy(tid) {
                tracing::warn!("Failed to destroy {}: {}", tid, e);
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
