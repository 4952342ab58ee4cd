//! Sides and edges.
//!
//! Every brick has a WEST and an EAST side. A side is a dense, ordered list of
//! edges bounded by the capacity chosen when the brick was created. An edge
//! names the neighbor and the index of the reciprocal edge on the neighbor's
//! opposite side, so both directions of a link are navigable in O(1):
//!
//! ```text
//!   A.east[i] = Edge { link: B, pair_index: j }
//!   B.west[j] = Edge { link: A, pair_index: i }
//! ```

use crate::graph::id::BrickId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One half of a brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    West,
    East,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::West, Side::East];

    /// The other side.
    #[inline]
    pub const fn flip(self) -> Side {
        match self {
            Side::West => Side::East,
            Side::East => Side::West,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Side::West => "west",
            Side::East => "east",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection slot pointing at a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub link: BrickId,
    pub pair_index: usize,
}

/// The edges of one side.
#[derive(Debug, Clone)]
pub struct SideEdges {
    capacity: usize,
    edges: Vec<Edge>,
}

impl SideEdges {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            edges: Vec::with_capacity(capacity.min(64)),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.edges.len() >= self.capacity
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Edge> {
        self.edges.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn as_slice(&self) -> &[Edge] {
        &self.edges
    }

    pub(crate) fn push(&mut self, edge: Edge) -> usize {
        self.edges.push(edge);
        self.edges.len() - 1
    }

    pub(crate) fn pop(&mut self) -> Option<Edge> {
        self.edges.pop()
    }

    /// Remove the edge at `index` by moving the last edge into its place.
    /// Returns the removed edge and, when one moved, its new index.
    pub(crate) fn swap_remove(&mut self, index: usize) -> (Edge, Option<usize>) {
        let last = self.edges.len() - 1;
        let removed = self.edges.swap_remove(index);
        let moved = if index != last { Some(index) } else { None };
        (removed, moved)
    }

    pub(crate) fn set_pair_index(&mut self, index: usize, pair_index: usize) {
        if let Some(edge) = self.edges.get_mut(index) {
            edge.pair_index = pair_index;
        }
    }

    pub(crate) fn contains_link(&self, link: BrickId) -> bool {
        self.edges.iter().any(|e| e.link == link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(i: u32) -> Edge {
        Edge {
            link: BrickId::new(i, 0),
            pair_index: i as usize,
        }
    }

    #[test]
    fn test_flip() {
        assert_eq!(Side::West.flip(), Side::East);
        assert_eq!(Side::East.flip().flip(), Side::East);
    }

    #[test]
    fn test_capacity() {
        let mut side = SideEdges::new(2);
        assert!(!side.is_full());
        side.push(edge(0));
        side.push(edge(1));
        assert!(side.is_full());
    }

    #[test]
    fn test_swap_remove_reports_moved_index() {
        let mut side = SideEdges::new(4);
        side.push(edge(0));
        side.push(edge(1));
        side.push(edge(2));

        let (removed, moved) = side.swap_remove(0);
        assert_eq!(removed, edge(0));
        assert_eq!(moved, Some(0));
        assert_eq!(side.get(0), Some(edge(2)));

        let (removed, moved) = side.swap_remove(1);
        assert_eq!(removed, edge(1));
        assert_eq!(moved, None);
        assert_eq!(side.len(), 1);
    }
}
