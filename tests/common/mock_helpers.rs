//! Mock bricks for exercising the plugin seam

use brickgraph::error::{Error, Result};
use brickgraph::graph::{BrickContext, BrickKind, BrickPlugin, Burst, Side};
use std::sync::{Arc, Mutex};

/// What a `Recorder` saw on one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub from: Side,
    pub edge_index: usize,
    pub mask: u64,
}

/// Multipole sink that records every arrival into a shared log.
pub struct Recorder {
    pub log: Arc<Mutex<Vec<Arrival>>>,
}

impl Recorder {
    pub fn new() -> (Self, Arc<Mutex<Vec<Arrival>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Self { log: log.clone() }, log)
    }
}

impl BrickPlugin for Recorder {
    fn type_name(&self) -> &str {
        "recorder"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Multipole
    }

    fn burst(
        &mut self,
        _ctx: &mut BrickContext<'_>,
        from: Side,
        edge_index: usize,
        burst: &mut Burst,
    ) -> Result<()> {
        self.log.lock().unwrap().push(Arrival {
            from,
            edge_index,
            mask: burst.mask(),
        });
        Ok(())
    }
}

/// Pass-through that fails every burst.
pub struct Faulty;

impl BrickPlugin for Faulty {
    fn type_name(&self) -> &str {
        "faulty"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Dipole
    }

    fn burst(
        &mut self,
        ctx: &mut BrickContext<'_>,
        _from: Side,
        _edge_index: usize,
        _burst: &mut Burst,
    ) -> Result<()> {
        Err(Error::brick(ctx.name(), "injected failure"))
    }
}

/// Pure source: refuses bursts, polls an empty burst and counts the calls.
/// Fails on the `fail_at`-th poll when set.
pub struct TickSource {
    pub polls: u32,
    pub fail_at: Option<u32>,
}

impl TickSource {
    pub fn new(fail_at: Option<u32>) -> Self {
        Self { polls: 0, fail_at }
    }
}

impl BrickPlugin for TickSource {
    fn type_name(&self) -> &str {
        "tick-source"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Monopole
    }

    fn accepts_burst(&self) -> bool {
        false
    }

    fn is_pollable(&self) -> bool {
        true
    }

    fn poll(&mut self, ctx: &mut BrickContext<'_>) -> Result<usize> {
        self.polls += 1;
        if self.fail_at == Some(self.polls) {
            return Err(Error::brick(ctx.name(), format!("failed on poll {}", self.polls)));
        }
        Ok(0)
    }
}

/// Edge notification seen by a `HookLog`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Link(Side, usize),
    Unlink(Side, usize),
}

/// Multipole brick that records its `on_link`/`on_unlink` calls.
pub struct HookLog {
    pub hooks: Arc<Mutex<Vec<Hook>>>,
}

impl HookLog {
    pub fn new() -> (Self, Arc<Mutex<Vec<Hook>>>) {
        let hooks = Arc::new(Mutex::new(Vec::new()));
        (Self { hooks: hooks.clone() }, hooks)
    }
}

impl BrickPlugin for HookLog {
    fn type_name(&self) -> &str {
        "hook-log"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Multipole
    }

    fn on_link(&mut self, side: Side, edge_index: usize) {
        self.hooks.lock().unwrap().push(Hook::Link(side, edge_index));
    }

    fn on_unlink(&mut self, side: Side, edge_index: usize) {
        self.hooks.lock().unwrap().push(Hook::Unlink(side, edge_index));
    }
}
