//! Pipeline: the unit a scheduler thread drives.
//!
//! A pipeline owns a `Registry` and remembers the brick its graph is rooted
//! at. The discovered `Graph` is cached and only rebuilt when the registry's
//! topology generation moves, so a steady-state poll does no discovery work.

use crate::error::{ErrorKind, Result, ResultExt};
use crate::graph::id::BrickId;
use crate::graph::registry::Registry;
use crate::graph::topology::{export_topology, TopologySnapshot};
use crate::graph::traversal::Graph;

pub struct Pipeline {
    name: String,
    registry: Registry,
    root: BrickId,
    graph: Option<Graph>,
}

impl Pipeline {
    /// Wrap `registry`, rooting discovery at `root`.
    pub fn new(name: impl Into<String>, registry: Registry, root: BrickId) -> Result<Self> {
        let graph = Graph::new(&registry, root)?;
        Ok(Self {
            name: name.into(),
            registry,
            root,
            graph: Some(graph),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> BrickId {
        self.root
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access for wiring changes; the graph is re-discovered on the
    /// next poll if the topology changed.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Current graph, re-discovering it first if the topology changed.
    pub fn graph(&mut self) -> Result<&Graph> {
        let stale = match &self.graph {
            Some(graph) => graph.is_stale(&self.registry),
            None => true,
        };
        if stale {
            let graph = Graph::new(&self.registry, self.root)
                .with_context(|| format!("discovering pipeline '{}'", self.name))?;
            tracing::debug!(
                "Pipeline '{}' re-discovered ({} bricks)",
                self.name,
                graph.len()
            );
            self.graph = Some(graph);
        }
        match &self.graph {
            Some(graph) => Ok(graph),
            None => Err(ErrorKind::UnknownBrick(self.root).into()),
        }
    }

    /// Poll every entry point once. Returns the number of packets injected.
    pub fn poll(&mut self) -> Result<usize> {
        self.graph()?;
        match &self.graph {
            Some(graph) => graph.poll_all(&mut self.registry),
            None => Ok(0),
        }
    }

    pub fn snapshot(&self) -> Result<TopologySnapshot> {
        TopologySnapshot::capture(&self.registry, self.root)
    }

    /// Graphviz rendering of the pipeline.
    pub fn dot(&self) -> Result<String> {
        let mut out = String::new();
        export_topology(&self.registry, self.root, &mut out)?;
        Ok(out)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("bricks", &self.registry.len())
            .finish()
    }
}
