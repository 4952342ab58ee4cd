//! Brick registry: the arena that owns bricks and their topology.
//!
//! Bricks live in generational slots addressed by `BrickId`. The registry is
//! the only owner: graphs and edges hold ids, never bricks. Topology changes
//! (`link`, `unlink`, `unlink_edge`, `destroy`) bump a generation counter that
//! lets `Pipeline` skip re-discovery when nothing changed.
//!
//! # Burst dispatch
//!
//! `burst` checks the target's behaviour out of its slot, runs it with a
//! `BrickContext` that borrows the registry, and puts it back. A brick that is
//! reached again while it is still on the call stack finds its slot empty and
//! the burst fails with `Reentrant`.

use crate::error::{Error, ErrorKind, Result};
use crate::graph::brick::{AnyBrick, Brick, BrickContext, BuiltinVariant};
use crate::graph::burst::Burst;
use crate::graph::id::BrickId;
use crate::graph::side::{Edge, Side, SideEdges};

/// Side capacity used by `add` for multipole bricks.
pub const DEFAULT_SIDE_CAPACITY: usize = 16;

struct Slot {
    generation: u32,
    brick: Option<Brick>,
}

/// Owner of a set of bricks.
pub struct Registry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
    topology_generation: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            topology_generation: 0,
        }
    }

    // ── Construction ──

    /// Add a brick with the default side capacities.
    pub fn add(&mut self, name: impl Into<String>, brick: impl Into<AnyBrick>) -> Result<BrickId> {
        self.add_with_capacity(name, brick, DEFAULT_SIDE_CAPACITY, DEFAULT_SIDE_CAPACITY)
    }

    /// Add a brick with explicit side capacities. Monopole and dipole bricks
    /// are clamped to one edge per side.
    pub fn add_with_capacity(
        &mut self,
        name: impl Into<String>,
        brick: impl Into<AnyBrick>,
        west_capacity: usize,
        east_capacity: usize,
    ) -> Result<BrickId> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::new(ErrorKind::Config(
                "brick name must not be empty".to_string(),
            )));
        }
        let brick = Brick::new(name, brick.into(), west_capacity, east_capacity);
        tracing::debug!("Created {} brick '{}'", brick.type_name(), brick.name());

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.brick = Some(brick);
                BrickId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    brick: Some(brick),
                });
                BrickId::new(index, 0)
            }
        };
        self.len += 1;
        Ok(id)
    }

    /// Unlink a brick from all its neighbors and release it.
    pub fn destroy(&mut self, id: BrickId) -> Result<AnyBrick> {
        let name = self.brick(id)?.name.clone();
        if self.brick(id)?.node.is_none() {
            return Err(Error::new(ErrorKind::Reentrant(name)));
        }
        self.unlink(id)?;

        let slot = &mut self.slots[id.index()];
        let brick = slot
            .brick
            .take()
            .ok_or_else(|| Error::new(ErrorKind::UnknownBrick(id)))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index() as u32);
        self.len -= 1;
        self.topology_generation += 1;

        tracing::info!("Destroyed brick '{}'", name);
        brick
            .node
            .ok_or_else(|| Error::new(ErrorKind::Reentrant(name)))
    }

    /// Destroy every brick.
    pub fn destroy_all(&mut self) {
        let ids: Vec<BrickId> = self.ids().collect();
        for id in ids {
            if let Err(e) = self.destroy(id) {
                tracing::warn!("Failed to destroy {:?}: {}", id, e);
            }
        }
    }

    // ── Lookup ──

    pub fn brick(&self, id: BrickId) -> Result<&Brick> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.brick.as_ref())
            .ok_or_else(|| Error::new(ErrorKind::UnknownBrick(id)))
    }

    fn brick_mut(&mut self, id: BrickId) -> Result<&mut Brick> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.brick.as_mut())
            .ok_or_else(|| Error::new(ErrorKind::UnknownBrick(id)))
    }

    pub fn contains(&self, id: BrickId) -> bool {
        self.brick(id).is_ok()
    }

    pub fn name(&self, id: BrickId) -> Option<&str> {
        self.brick(id).ok().map(|b| b.name())
    }

    pub fn side(&self, id: BrickId, side: Side) -> Result<&SideEdges> {
        Ok(self.brick(id)?.side(side))
    }

    pub fn edges(&self, id: BrickId, side: Side) -> Result<&[Edge]> {
        Ok(self.brick(id)?.side(side).as_slice())
    }

    /// First brick named `name`.
    pub fn find(&self, name: &str) -> Option<BrickId> {
        self.ids().find(|&id| self.name(id) == Some(name))
    }

    /// Ids of all live bricks in slot order.
    pub fn ids(&self) -> impl Iterator<Item = BrickId> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.brick
                .as_ref()
                .map(|_| BrickId::new(i as u32, slot.generation))
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counter bumped by every topology change.
    pub fn topology_generation(&self) -> u64 {
        self.topology_generation
    }

    /// Typed access to a built-in brick.
    pub fn get<T: BuiltinVariant>(&self, id: BrickId) -> Result<&T> {
        let brick = self.brick(id)?;
        match &brick.node {
            Some(AnyBrick::Builtin(b)) => T::peek(b),
            _ => None,
        }
        .ok_or_else(|| {
            Error::new(ErrorKind::WrongVariant {
                brick: brick.name.clone(),
                expected: T::TYPE_NAME,
            })
        })
    }

    pub fn get_mut<T: BuiltinVariant>(&mut self, id: BrickId) -> Result<&mut T> {
        let brick = self.brick_mut(id)?;
        let name = brick.name.clone();
        match &mut brick.node {
            Some(AnyBrick::Builtin(b)) => T::peek_mut(b),
            _ => None,
        }
        .ok_or_else(|| {
            Error::new(ErrorKind::WrongVariant {
                brick: name,
                expected: T::TYPE_NAME,
            })
        })
    }

    // ── Topology ──

    /// Connect `west`'s east side to `east`'s west side.
    pub fn link(&mut self, west: BrickId, east: BrickId) -> Result<()> {
        let w = self.brick(west)?;
        let e = self.brick(east)?;
        if west == east {
            return Err(Error::new(ErrorKind::SelfLink(w.name.clone())));
        }
        if !w.kind_allows(Side::East) {
            return Err(Error::new(ErrorKind::KindViolation {
                brick: w.name.clone(),
                kind: w.kind,
                side: Side::East,
            }));
        }
        if !e.kind_allows(Side::West) {
            return Err(Error::new(ErrorKind::KindViolation {
                brick: e.name.clone(),
                kind: e.kind,
                side: Side::West,
            }));
        }
        if w.east.is_full() {
            return Err(Error::new(ErrorKind::SideFull {
                brick: w.name.clone(),
                side: Side::East,
                capacity: w.east.capacity(),
            }));
        }
        if e.west.is_full() {
            return Err(Error::new(ErrorKind::SideFull {
                brick: e.name.clone(),
                side: Side::West,
                capacity: e.west.capacity(),
            }));
        }
        if w.east.contains_link(east) {
            return Err(Error::new(ErrorKind::AlreadyLinked {
                west: w.name.clone(),
                east: e.name.clone(),
            }));
        }

        let west_index = w.east.len();
        let east_index = e.west.len();
        {
            let w = self.brick_mut(west)?;
            w.east.push(Edge {
                link: east,
                pair_index: east_index,
            });
            if let Some(node) = w.node.as_mut() {
                node.on_link(Side::East, west_index);
            }
        }
        {
            let e = self.brick_mut(east)?;
            e.west.push(Edge {
                link: west,
                pair_index: west_index,
            });
            if let Some(node) = e.node.as_mut() {
                node.on_link(Side::West, east_index);
            }
        }
        self.topology_generation += 1;

        tracing::info!(
            "Linked '{}' -> '{}'",
            self.name(west).unwrap_or("?"),
            self.name(east).unwrap_or("?")
        );
        Ok(())
    }

    /// Link each brick to the next one, west to east.
    pub fn chain(&mut self, bricks: &[BrickId]) -> Result<()> {
        for pair in bricks.windows(2) {
            self.link(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Remove every edge of `id`, on both sides, from both ends.
    pub fn unlink(&mut self, id: BrickId) -> Result<()> {
        self.brick(id)?;
        let mut removed = 0;
        for side in Side::ALL {
            loop {
                let popped = {
                    let brick = self.brick_mut(id)?;
                    let index = brick.side(side).len().checked_sub(1);
                    brick.side_mut(side).pop().zip(index)
                };
                let Some((edge, own_index)) = popped else {
                    break;
                };
                self.remove_edge(edge.link, side.flip(), edge.pair_index)?;
                self.notify_unlink(edge.link, side.flip(), edge.pair_index);
                self.notify_unlink(id, side, own_index);
                removed += 1;
            }
        }
        if removed > 0 {
            self.topology_generation += 1;
            tracing::info!(
                "Unlinked '{}' ({} edges)",
                self.name(id).unwrap_or("?"),
                removed
            );
        }
        Ok(())
    }

    /// Remove the single link from `west`'s east side to `east`.
    pub fn unlink_edge(&mut self, west: BrickId, east: BrickId) -> Result<()> {
        let (west_index, edge) = self
            .brick(west)?
            .east
            .iter()
            .enumerate()
            .find(|(_, e)| e.link == east)
            .map(|(i, e)| (i, *e))
            .ok_or_else(|| {
                Error::new(ErrorKind::Brick {
                    brick: self.name(west).unwrap_or("?").to_string(),
                    message: format!("not linked to '{}'", self.name(east).unwrap_or("?")),
                })
            })?;

        self.remove_edge(east, Side::West, edge.pair_index)?;
        self.remove_edge(west, Side::East, west_index)?;
        self.notify_unlink(east, Side::West, edge.pair_index);
        self.notify_unlink(west, Side::East, west_index);
        self.topology_generation += 1;
        Ok(())
    }

    /// Swap-remove the edge at `index` on `side` of `id` and re-point the
    /// reciprocal of whichever edge moved into the hole.
    fn remove_edge(&mut self, id: BrickId, side: Side, index: usize) -> Result<Edge> {
        let (removed, moved) = {
            let edges = self.brick_mut(id)?.side_mut(side);
            if index >= edges.len() {
                return Err(Error::new(ErrorKind::UnknownBrick(id)));
            }
            edges.swap_remove(index)
        };
        if let Some(new_index) = moved {
            let moved_edge = self
                .brick(id)?
                .side(side)
                .get(new_index)
                .ok_or_else(|| Error::new(ErrorKind::UnknownBrick(id)))?;
            self.brick_mut(moved_edge.link)?
                .side_mut(side.flip())
                .set_pair_index(moved_edge.pair_index, new_index);
        }
        Ok(removed)
    }

    fn notify_unlink(&mut self, id: BrickId, side: Side, index: usize) {
        if let Ok(brick) = self.brick_mut(id) {
            if let Some(node) = brick.node.as_mut() {
                node.on_unlink(side, index);
            }
        }
    }

    /// Whether every edge's reciprocal points back at it.
    pub fn is_consistent(&self) -> bool {
        self.ids().all(|id| {
            Side::ALL.iter().all(|&side| {
                self.side(id, side)
                    .map(|edges| {
                        edges.iter().enumerate().all(|(i, edge)| {
                            self.side(edge.link, side.flip())
                                .ok()
                                .and_then(|remote| remote.get(edge.pair_index))
                                == Some(Edge {
                                    link: id,
                                    pair_index: i,
                                })
                        })
                    })
                    .unwrap_or(false)
            })
        })
    }

    // ── Traffic ──

    fn check_out(&mut self, id: BrickId) -> Result<AnyBrick> {
        let brick = self.brick_mut(id)?;
        match brick.node.take() {
            Some(node) => Ok(node),
            None => Err(Error::new(ErrorKind::Reentrant(brick.name.clone()))),
        }
    }

    fn check_in(&mut self, id: BrickId, node: AnyBrick) {
        if let Ok(brick) = self.brick_mut(id) {
            brick.node = Some(node);
        }
    }

    /// Push `burst` into `id`, arriving on `from` at edge `edge_index`.
    pub fn burst(
        &mut self,
        id: BrickId,
        from: Side,
        edge_index: usize,
        burst: &mut Burst,
    ) -> Result<()> {
        let mut node = self.check_out(id)?;
        let result = if node.accepts_burst() {
            let mut ctx = BrickContext::new(self, id);
            node.burst(&mut ctx, from, edge_index, burst)
        } else {
            Err(Error::new(ErrorKind::NotReceiver(
                self.name(id).unwrap_or("?").to_string(),
            )))
        };
        self.check_in(id, node);
        result
    }

    /// Poll an entry point. Returns the number of packets it injected.
    pub fn poll(&mut self, id: BrickId) -> Result<usize> {
        let mut node = self.check_out(id)?;
        let result = if node.is_pollable() {
            let mut ctx = BrickContext::new(self, id);
            node.poll(&mut ctx)
        } else {
            Err(Error::new(ErrorKind::NotPollable(
                self.name(id).unwrap_or("?").to_string(),
            )))
        };
        self.check_in(id, node);
        result
    }

    pub fn is_pollable(&self, id: BrickId) -> bool {
        self.brick(id)
            .ok()
            .and_then(|b| b.node.as_ref())
            .map(|n| n.is_pollable())
            .unwrap_or(false)
    }

    /// Return a brick to its initial state (drops retained packets).
    pub fn reset(&mut self, id: BrickId) -> Result<()> {
        let mut node = self.check_out(id)?;
        let result = node.reset();
        self.check_in(id, node);
        result
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::brick::BrickKind;
    use crate::graph::bricks::{Collect, Diode, Hub, Nop, Queue};

    #[test]
    fn test_link_sets_reciprocal_indices() {
        let mut reg = Registry::new();
        let a = reg.add("a", Hub::new()).unwrap();
        let b = reg.add("b", Hub::new()).unwrap();
        let c = reg.add("c", Hub::new()).unwrap();

        reg.link(a, c).unwrap();
        reg.link(b, c).unwrap();

        assert_eq!(reg.edges(a, Side::East).unwrap()[0], Edge { link: c, pair_index: 0 });
        assert_eq!(reg.edges(b, Side::East).unwrap()[0], Edge { link: c, pair_index: 1 });
        assert_eq!(reg.edges(c, Side::West).unwrap()[1], Edge { link: b, pair_index: 0 });
        assert!(reg.is_consistent());
    }

    #[test]
    fn test_dipole_kind_violation() {
        let mut reg = Registry::new();
        let a = reg.add("a", Hub::new()).unwrap();
        let b = reg.add("b", Hub::new()).unwrap();
        let d = reg.add("d", Diode::new(Side::East)).unwrap();

        reg.link(a, d).unwrap();
        let err = reg.link(b, d).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::KindViolation { kind: BrickKind::Dipole, side: Side::West, .. }
        ));
        // the other side is still free
        reg.link(d, b).unwrap();
    }

    #[test]
    fn test_monopole_allows_one_edge_total() {
        let mut reg = Registry::new();
        let q = reg.add("q", Queue::new(4)).unwrap();
        let a = reg.add("a", Hub::new()).unwrap();
        let b = reg.add("b", Hub::new()).unwrap();

        reg.link(q, a).unwrap();
        let err = reg.link(b, q).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::KindViolation { kind: BrickKind::Monopole, .. }));
    }

    #[test]
    fn test_side_capacity() {
        let mut reg = Registry::new();
        let hub = reg.add_with_capacity("hub", Hub::new(), 0, 1).unwrap();
        let a = reg.add("a", Nop::new()).unwrap();
        let b = reg.add("b", Nop::new()).unwrap();

        reg.link(hub, a).unwrap();
        let err = reg.link(hub, b).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::SideFull { side: Side::East, capacity: 1, .. }));
        let err = reg.link(a, hub).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::SideFull { side: Side::West, capacity: 0, .. }));
    }

    #[test]
    fn test_duplicate_and_self_link() {
        let mut reg = Registry::new();
        let a = reg.add("a", Hub::new()).unwrap();
        let b = reg.add("b", Hub::new()).unwrap();
        reg.link(a, b).unwrap();
        assert!(matches!(reg.link(a, b).unwrap_err().kind(), ErrorKind::AlreadyLinked { .. }));
        assert!(matches!(reg.link(a, a).unwrap_err().kind(), ErrorKind::SelfLink(_)));
        // the reverse direction is a different link
        reg.link(b, a).unwrap();
        assert!(reg.is_consistent());
    }

    #[test]
    fn test_unlink_repatches_moved_edges() {
        let mut reg = Registry::new();
        let hub = reg.add("hub", Hub::new()).unwrap();
        let a = reg.add("a", Hub::new()).unwrap();
        let b = reg.add("b", Hub::new()).unwrap();
        let c = reg.add("c", Hub::new()).unwrap();
        reg.chain(&[a, hub]).unwrap();
        reg.link(b, hub).unwrap();
        reg.link(c, hub).unwrap();

        reg.unlink(a).unwrap();

        let west = reg.edges(hub, Side::West).unwrap();
        assert_eq!(west.len(), 2);
        assert_eq!(west[0].link, c);
        assert_eq!(reg.edges(c, Side::East).unwrap()[0].pair_index, 0);
        assert!(reg.edges(a, Side::East).unwrap().is_empty());
        assert!(reg.is_consistent());
    }

    #[test]
    fn test_unlink_edge() {
        let mut reg = Registry::new();
        let a = reg.add("a", Hub::new()).unwrap();
        let b = reg.add("b", Hub::new()).unwrap();
        let c = reg.add("c", Hub::new()).unwrap();
        reg.link(a, b).unwrap();
        reg.link(a, c).unwrap();

        reg.unlink_edge(a, b).unwrap();
        assert_eq!(reg.edges(a, Side::East).unwrap(), &[Edge { link: c, pair_index: 0 }]);
        assert!(reg.edges(b, Side::West).unwrap().is_empty());
        assert!(reg.is_consistent());
        assert!(reg.unlink_edge(a, b).is_err());
    }

    #[test]
    fn test_destroy_invalidates_handle() {
        let mut reg = Registry::new();
        let a = reg.add("a", Hub::new()).unwrap();
        let b = reg.add("b", Hub::new()).unwrap();
        reg.link(a, b).unwrap();
        let gen = reg.topology_generation();

        reg.destroy(a).unwrap();
        assert!(reg.topology_generation() > gen);
        assert!(!reg.contains(a));
        assert!(reg.edges(b, Side::West).unwrap().is_empty());

        // slot reuse must not resurrect the old handle
        let c = reg.add("c", Hub::new()).unwrap();
        assert_eq!(c.index(), a.index());
        assert!(!reg.contains(a));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_typed_access() {
        let mut reg = Registry::new();
        let c = reg.add("c", Collect::new()).unwrap();
        assert!(reg.get::<Collect>(c).is_ok());
        let err = reg.get::<Hub>(c).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::WrongVariant { expected: "hub", .. }));
    }

    #[test]
    fn test_poll_non_pollable() {
        let mut reg = Registry::new();
        let h = reg.add("h", Hub::new()).unwrap();
        assert!(!reg.is_pollable(h));
        assert!(matches!(reg.poll(h).unwrap_err().kind(), ErrorKind::NotPollable(_)));
    }

    #[test]
    fn test_find_and_empty_name() {
        let mut reg = Registry::new();
        let a = reg.add("alpha", Hub::new()).unwrap();
        assert_eq!(reg.find("alpha"), Some(a));
        assert_eq!(reg.find("beta"), None);
        assert!(reg.add("", Hub::new()).is_err());
    }
}
