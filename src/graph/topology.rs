//! Topology snapshots and Graphviz export.
//!
//! A snapshot is captured with the same breadth-first walk as `Graph`, so
//! bricks appear in visitation order. Each link is recorded once, from the
//! east side of its west brick.

use crate::error::{Error, ErrorKind, Result};
use crate::graph::brick::BrickKind;
use crate::graph::id::BrickId;
use crate::graph::registry::Registry;
use crate::graph::side::Side;
use crate::graph::traversal::bfs;
use serde::Serialize;
use std::fmt::{self, Write};

/// Snapshot of a single brick.
#[derive(Debug, Clone, Serialize)]
pub struct BrickSnapshot {
    pub id: BrickId,
    pub name: String,
    pub type_name: String,
    pub kind: BrickKind,
    pub west_edges: usize,
    pub east_edges: usize,
}

impl BrickSnapshot {
    /// Node label used in DOT output, `type:name`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.type_name, self.name)
    }
}

/// Snapshot of one link. `west_index` is the edge index on the west brick's
/// east side; `east_index` the one on the east brick's west side.
#[derive(Debug, Clone, Serialize)]
pub struct LinkSnapshot {
    pub west: BrickId,
    pub east: BrickId,
    pub west_index: usize,
    pub east_index: usize,
}

/// Complete topology snapshot of the bricks reachable from a root.
#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    pub root: BrickId,
    pub bricks: Vec<BrickSnapshot>,
    pub links: Vec<LinkSnapshot>,
}

impl TopologySnapshot {
    pub fn capture(registry: &Registry, root: BrickId) -> Result<Self> {
        let mut order = Vec::new();
        bfs(registry, root, |id| order.push(id))?;

        let mut bricks = Vec::with_capacity(order.len());
        let mut links = Vec::new();
        for id in order {
            let brick = registry.brick(id)?;
            bricks.push(BrickSnapshot {
                id,
                name: brick.name().to_string(),
                type_name: brick.type_name().to_string(),
                kind: brick.kind(),
                west_edges: brick.side(Side::West).len(),
                east_edges: brick.side(Side::East).len(),
            });
            for (west_index, edge) in brick.side(Side::East).iter().enumerate() {
                links.push(LinkSnapshot {
                    west: id,
                    east: edge.link,
                    west_index,
                    east_index: edge.pair_index,
                });
            }
        }
        Ok(Self { root, bricks, links })
    }

    pub fn brick(&self, id: BrickId) -> Option<&BrickSnapshot> {
        self.bricks.iter().find(|b| b.id == id)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::new(ErrorKind::Config(format!(
                "Failed to serialize topology: {}",
                e
            )))
        })
    }

    /// Render as a Graphviz digraph.
    pub fn write_dot<W: Write>(&self, sink: &mut W) -> fmt::Result {
        writeln!(sink, "digraph G {{")?;
        writeln!(sink, "  rankdir=LR;")?;
        for brick in &self.bricks {
            writeln!(sink, "  \"{}\";", brick.label())?;
        }
        for link in &self.links {
            let (Some(west), Some(east)) = (self.brick(link.west), self.brick(link.east)) else {
                continue;
            };
            writeln!(
                sink,
                "  \"{}\" -> \"{}\" [taillabel=\"{}\", headlabel=\"{}\"];",
                west.label(),
                east.label(),
                Side::East,
                Side::West
            )?;
        }
        writeln!(sink, "}}")
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_dot(&mut out);
        out
    }
}

/// Write the DOT rendering of everything reachable from `root` into `sink`.
pub fn export_topology<W: Write>(registry: &Registry, root: BrickId, sink: &mut W) -> Result<()> {
    TopologySnapshot::capture(registry, root)?
        .write_dot(sink)
        .map_err(|_| {
            Error::new(ErrorKind::Io(std::io::Error::other(
                "topology sink rejected write",
            )))
        })
}
