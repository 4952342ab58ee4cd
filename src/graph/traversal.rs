//! Graph discovery and polling.
//!
//! A `Graph` is a view over the bricks reachable from a root: it never owns
//! them. Discovery is a breadth-first walk over edges, west side before east
//! side and each side in edge order, so for a fixed root and link history the
//! visitation order is deterministic. That order drives both `poll_all` and
//! the topology export.

use crate::error::{Error, ErrorKind, Result};
use crate::graph::id::BrickId;
use crate::graph::registry::Registry;
use crate::graph::side::Side;
use std::collections::{HashSet, VecDeque};

/// Bricks reachable from a root, in visitation order.
#[derive(Debug, Clone)]
pub struct Graph {
    root: BrickId,
    discovered: Vec<BrickId>,
    pollable: Vec<BrickId>,
    generation: u64,
}

impl Graph {
    /// Discover every brick connected to `root`.
    pub fn new(registry: &Registry, root: BrickId) -> Result<Self> {
        let mut discovered = Vec::new();
        bfs(registry, root, |id| discovered.push(id))?;
        let pollable = discovered
            .iter()
            .copied()
            .filter(|&id| registry.is_pollable(id))
            .collect();
        Ok(Self {
            root,
            discovered,
            pollable,
            generation: registry.topology_generation(),
        })
    }

    pub fn root(&self) -> BrickId {
        self.root
    }

    pub fn discovered(&self) -> &[BrickId] {
        &self.discovered
    }

    /// Entry points among the discovered bricks, in visitation order.
    pub fn pollable(&self) -> &[BrickId] {
        &self.pollable
    }

    pub fn len(&self) -> usize {
        self.discovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty()
    }

    pub fn contains(&self, id: BrickId) -> bool {
        self.discovered.contains(&id)
    }

    /// Registry topology generation the graph was discovered at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the registry's topology changed since discovery.
    pub fn is_stale(&self, registry: &Registry) -> bool {
        self.generation != registry.topology_generation()
    }

    /// Poll every entry point once. Returns the number of packets injected.
    /// The first failing poll stops the sweep.
    pub fn poll_all(&self, registry: &mut Registry) -> Result<usize> {
        let mut total = 0;
        for &id in &self.pollable {
            total += registry.poll(id)?;
        }
        Ok(total)
    }
}

/// Breadth-first walk from `root`, calling `visit` once per brick.
pub(crate) fn bfs<F>(registry: &Registry, root: BrickId, mut visit: F) -> Result<()>
where
    F: FnMut(BrickId),
{
    if !registry.contains(root) {
        return Err(Error::new(ErrorKind::UnknownBrick(root)));
    }
    let mut seen = HashSet::new();
    let mut frontier = VecDeque::new();
    seen.insert(root);
    frontier.push_back(root);

    while let Some(id) = frontier.pop_front() {
        visit(id);
        for side in Side::ALL {
            for edge in registry.edges(id, side)? {
                if seen.insert(edge.link) {
                    frontier.push_back(edge.link);
                }
            }
        }
    }
    Ok(())
}
