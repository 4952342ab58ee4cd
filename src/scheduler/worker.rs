//! Worker: the loop that drives one thread's graphs.
//!
//! Each tick:
//! 1. Drain the command ring (graph add/remove, restart, run/stop).
//! 2. If the thread is running, poll every graph in `Running` state.
//! 3. A failing graph turns `Broken`, its error goes on the error stack and
//!    the thread reports `Broken`; the other graphs keep going.
//! 4. Publish graph states and counters for the scheduler side.
//!
//! The worker is the only owner of its pipelines. Everything the scheduler
//! sees goes through `ThreadShared`.

use crate::config::SchedulerConfig;
use crate::graph::id::{GraphId, ThreadId};
use crate::graph::pipeline::Pipeline;
use crate::scheduler::command::{Command, CommandRing, ErrorStack};
use crate::scheduler::{GraphState, ThreadState};
use crossbeam_utils::Backoff;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

/// State shared between a worker and the scheduler.
pub(crate) struct ThreadShared {
    pub(crate) state: AtomicU8,
    pub(crate) commands: spin::Mutex<CommandRing>,
    pub(crate) errors: spin::Mutex<ErrorStack>,
    pub(crate) graphs: spin::Mutex<Vec<(GraphId, GraphState)>>,
    pub(crate) shutdown: AtomicBool,
    pub(crate) ticks: AtomicU64,
    pub(crate) packets: AtomicU64,
}

impl ThreadShared {
    pub(crate) fn new(config: &SchedulerConfig) -> Self {
        Self {
            state: AtomicU8::new(ThreadState::Stopped as u8),
            commands: spin::Mutex::new(CommandRing::new(config.command_queue_capacity)),
            errors: spin::Mutex::new(ErrorStack::new(config.error_stack_capacity)),
            graphs: spin::Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
            packets: AtomicU64::new(0),
        }
    }

    pub(crate) fn state(&self) -> ThreadState {
        ThreadState::from_u8(self.state.load(Ordering::Acquire))
    }
}

struct GraphSlot {
    id: GraphId,
    pipeline: Pipeline,
    state: GraphState,
}

/// Drives the graphs of one scheduler thread.
pub struct Worker {
    id: ThreadId,
    shared: std::sync::Arc<ThreadShared>,
    graphs: Vec<GraphSlot>,
    running: bool,
    idle_sleep: Duration,
}

impl Worker {
    pub(crate) fn new(id: ThreadId, shared: std::sync::Arc<ThreadShared>, idle_sleep: Duration) -> Self {
        Self {
            id,
            shared,
            graphs: Vec::new(),
            running: false,
            idle_sleep,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one scheduling round. Returns the number of packets injected.
    pub fn tick(&mut self) -> usize {
        self.apply_commands();

        let mut packets = 0;
        let mut broken = false;
        if self.running {
            for slot in self.graphs.iter_mut() {
                if slot.state != GraphState::Running {
                    broken |= slot.state == GraphState::Broken;
                    continue;
                }
                match slot.pipeline.poll() {
                    Ok(n) => packets += n,
                    Err(e) => {
                        tracing::warn!(
                            "Graph {} ('{}') on {} broke: {}",
                            slot.id,
                            slot.pipeline.name(),
                            self.id,
                            e
                        );
                        slot.state = GraphState::Broken;
                        let discarded = self.shared.errors.lock().push(slot.id, e);
                        if let Some((old_graph, old)) = discarded {
                            tracing::warn!(
                                "Error stack of {} full, discarding error of {}: {}",
                                self.id,
                                old_graph,
                                old
                            );
                        }
                        broken = true;
                    }
                }
            }
        }

        let state = if !self.running {
            ThreadState::Stopped
        } else if broken {
            ThreadState::Broken
        } else {
            ThreadState::Running
        };
        self.shared.state.store(state as u8, Ordering::Release);
        self.shared.ticks.fetch_add(1, Ordering::Relaxed);
        self.shared.packets.fetch_add(packets as u64, Ordering::Relaxed);
        self.publish();
        packets
    }

    fn apply_commands(&mut self) {
        let commands = self.shared.commands.lock().drain();
        for command in commands {
            tracing::debug!("{} applying {:?}", self.id, command);
            match command {
                Command::AddGraph(id, pipeline) => {
                    let state = if self.running {
                        GraphState::Running
                    } else {
                        GraphState::Stopped
                    };
                    tracing::info!("Graph {} ('{}') added to {}", id, pipeline.name(), self.id);
                    self.graphs.push(GraphSlot {
                        id,
                        pipeline: *pipeline,
                        state,
                    });
                }
                Command::RemoveGraph(id) => match self.graphs.iter().position(|s| s.id == id) {
                    Some(index) => {
                        let slot = self.graphs.remove(index);
                        tracing::info!("Graph {} ('{}') removed from {}", id, slot.pipeline.name(), self.id);
                    }
                    None => tracing::warn!("{}: no graph {} to remove", self.id, id),
                },
                Command::ForceRestart(id) => {
                    let running = self.running;
                    match self.graphs.iter_mut().find(|s| s.id == id) {
                        Some(slot) if slot.state == GraphState::Broken => {
                            slot.state = if running {
                                GraphState::Running
                            } else {
                                GraphState::Stopped
                            };
                            tracing::info!("Graph {} restarted on {}", id, self.id);
                        }
                        Some(_) => {}
                        None => tracing::warn!("{}: no graph {} to restart", self.id, id),
                    }
                }
                Command::Run => {
                    self.running = true;
                    self.set_all(GraphState::Stopped, GraphState::Running);
                }
                Command::Stop => {
                    self.running = false;
                    self.set_all(GraphState::Running, GraphState::Stopped);
                }
            }
        }
    }

    fn set_all(&mut self, from: GraphState, to: GraphState) {
        for slot in self.graphs.iter_mut().filter(|s| s.state == from) {
            slot.state = to;
        }
    }

    fn publish(&self) {
        let mut graphs = self.shared.graphs.lock();
        graphs.clear();
        graphs.extend(self.graphs.iter().map(|s| (s.id, s.state)));
    }

    /// Thread body: tick until shutdown, then hand the pipelines back.
    pub fn run(mut self) -> Vec<Pipeline> {
        tracing::info!("{} started", self.id);
        let backoff = Backoff::new();
        while !self.shared.shutdown.load(Ordering::Acquire) {
            let packets = self.tick();
            let active = self.running && self.graphs.iter().any(|s| s.state == GraphState::Running);
            if !active {
                std::thread::sleep(self.idle_sleep);
                backoff.reset();
            } else if packets == 0 {
                backoff.snooze();
            } else {
                backoff.reset();
            }
        }
        // graphs added after the last tick
        self.apply_commands();
        self.shared.state.store(ThreadState::Stopped as u8, Ordering::Release);
        tracing::info!("{} exiting", self.id);
        self.into_pipelines()
    }

    pub fn into_pipelines(self) -> Vec<Pipeline> {
        self.graphs.into_iter().map(|s| s.pipeline).collect()
    }
}
