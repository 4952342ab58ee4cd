//! Brick abstraction.
//!
//! Two-layer design, as for the rest of the runtime's hot path:
//! - **`BrickPlugin` trait**: for bricks defined outside this crate (external
//!   transforms, test harness bricks).
//! - **`BuiltinBrick` enum**: for the built-in variants. Dispatch is a match,
//!   so the compiler can inline the burst path.
//!
//! `AnyBrick` wraps either so the registry handles both uniformly. The brick's
//! topology (name, kind, sides) lives next to the behaviour in `Brick`, owned
//! by the registry.

use crate::error::{Error, ErrorKind, Result};
use crate::graph::bricks::{Collect, Diode, Filter, Hub, Nop, Print, Queue, Rxtx};
use crate::graph::burst::Burst;
use crate::graph::id::BrickId;
use crate::graph::registry::Registry;
use crate::graph::side::{Side, SideEdges};
use serde::{Deserialize, Serialize};

/// Arity class of a brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrickKind {
    /// Any number of edges on either side, up to the side capacity.
    Multipole,
    /// Exactly one edge in total, on either side.
    Monopole,
    /// At most one edge per side.
    Dipole,
}

/// Handle a brick gets while it bursts or polls.
///
/// The brick's own behaviour is checked out of the registry for the duration
/// of the call, so the context can lend out the rest of the graph.
pub struct BrickContext<'a> {
    registry: &'a mut Registry,
    id: BrickId,
}

impl<'a> BrickContext<'a> {
    pub(crate) fn new(registry: &'a mut Registry, id: BrickId) -> Self {
        Self { registry, id }
    }

    pub fn id(&self) -> BrickId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.registry.name(self.id).unwrap_or("?")
    }

    pub fn side(&self, side: Side) -> Result<&SideEdges> {
        self.registry.side(self.id, side)
    }

    /// Generic pass-through: deliver to every edge on the side opposite to
    /// the one the burst came from.
    pub fn forward(&mut self, from: Side, burst: &mut Burst) -> Result<()> {
        self.forward_side(from.flip(), burst, None)
    }

    /// Deliver to every edge of `side`, in edge order, optionally skipping one
    /// edge index. Each neighbor sees the mask as it was on entry; the first
    /// failure stops the fan-out and deliveries already made stand.
    pub fn forward_side(
        &mut self,
        side: Side,
        burst: &mut Burst,
        skip: Option<usize>,
    ) -> Result<()> {
        let mask = burst.mask();
        if mask == 0 {
            return Ok(());
        }
        let count = self.registry.side(self.id, side)?.len();
        for index in 0..count {
            if skip == Some(index) {
                continue;
            }
            let edge = self
                .registry
                .side(self.id, side)?
                .get(index)
                .ok_or_else(|| Error::new(ErrorKind::UnknownBrick(self.id)))?;
            burst.restore_mask(mask);
            let result = self
                .registry
                .burst(edge.link, side.flip(), edge.pair_index, burst);
            if let Err(e) = result {
                burst.restore_mask(mask);
                return Err(e);
            }
        }
        burst.restore_mask(mask);
        Ok(())
    }

    /// Deliver on every edge of both sides, west first.
    pub fn forward_all(&mut self, burst: &mut Burst) -> Result<()> {
        self.forward_side(Side::West, burst, None)?;
        self.forward_side(Side::East, burst, None)
    }
}

/// Trait for bricks implemented outside the crate.
///
/// Only `type_name` and `kind` are required; the defaults describe a
/// pass-through brick that is not an entry point.
pub trait BrickPlugin: Send {
    /// Short type tag used in topology exports, e.g. `"firewall"`.
    fn type_name(&self) -> &str;

    fn kind(&self) -> BrickKind;

    /// Whether the brick can receive traffic at all.
    fn accepts_burst(&self) -> bool {
        true
    }

    /// Whether the brick is an entry point.
    fn is_pollable(&self) -> bool {
        false
    }

    fn burst(
        &mut self,
        ctx: &mut BrickContext<'_>,
        from: Side,
        _edge_index: usize,
        burst: &mut Burst,
    ) -> Result<()> {
        ctx.forward(from, burst)
    }

    /// Pull packets from the source and push them into the graph. Returns the
    /// number of packets injected.
    fn poll(&mut self, ctx: &mut BrickContext<'_>) -> Result<usize> {
        Err(Error::new(ErrorKind::NotPollable(ctx.name().to_string())))
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called after an edge was added on `side` at `edge_index`.
    fn on_link(&mut self, _side: Side, _edge_index: usize) {}

    /// Called after the edge at `edge_index` on `side` was removed.
    fn on_unlink(&mut self, _side: Side, _edge_index: usize) {}
}

/// Enum dispatch for built-in bricks.
pub enum BuiltinBrick {
    Nop(Nop),
    Hub(Hub),
    Diode(Diode),
    Collect(Collect),
    Filter(Filter),
    Print(Print),
    Rxtx(Rxtx),
    Queue(Queue),
}

impl BuiltinBrick {
    pub fn type_name(&self) -> &'static str {
        match self {
            BuiltinBrick::Nop(_) => "nop",
            BuiltinBrick::Hub(_) => "hub",
            BuiltinBrick::Diode(_) => "diode",
            BuiltinBrick::Collect(_) => "collect",
            BuiltinBrick::Filter(_) => "filter",
            BuiltinBrick::Print(_) => "print",
            BuiltinBrick::Rxtx(_) => "rxtx",
            BuiltinBrick::Queue(_) => "queue",
        }
    }

    pub fn kind(&self) -> BrickKind {
        match self {
            BuiltinBrick::Nop(_)
            | BuiltinBrick::Hub(_)
            | BuiltinBrick::Collect(_)
            | BuiltinBrick::Print(_) => BrickKind::Multipole,
            BuiltinBrick::Diode(_) | BuiltinBrick::Filter(_) => BrickKind::Dipole,
            BuiltinBrick::Rxtx(_) | BuiltinBrick::Queue(_) => BrickKind::Monopole,
        }
    }

    pub fn is_pollable(&self) -> bool {
        match self {
            BuiltinBrick::Rxtx(b) => b.has_rx(),
            BuiltinBrick::Queue(_) => true,
            _ => false,
        }
    }

    pub fn burst(
        &mut self,
        ctx: &mut BrickContext<'_>,
        from: Side,
        edge_index: usize,
        burst: &mut Burst,
    ) -> Result<()> {
        match self {
            BuiltinBrick::Nop(b) => b.burst(burst),
            BuiltinBrick::Hub(b) => b.burst(ctx, from, edge_index, burst),
            BuiltinBrick::Diode(b) => b.burst(ctx, from, burst),
            BuiltinBrick::Collect(b) => b.burst(from, burst),
            BuiltinBrick::Filter(b) => b.burst(ctx, from, burst),
            BuiltinBrick::Print(b) => b.burst(ctx, from, burst),
            BuiltinBrick::Rxtx(b) => b.burst(ctx, from, burst),
            BuiltinBrick::Queue(b) => b.burst(burst),
        }
    }

    pub fn poll(&mut self, ctx: &mut BrickContext<'_>) -> Result<usize> {
        match self {
            BuiltinBrick::Rxtx(b) => b.poll(ctx),
            BuiltinBrick::Queue(b) => b.poll(ctx),
            _ => Err(Error::new(ErrorKind::NotPollable(ctx.name().to_string()))),
        }
    }

    pub fn reset(&mut self) -> Result<()> {
        match self {
            BuiltinBrick::Nop(b) => b.reset(),
            BuiltinBrick::Collect(b) => b.reset(),
            BuiltinBrick::Filter(b) => b.reset(),
            BuiltinBrick::Queue(b) => b.reset(),
            BuiltinBrick::Hub(_)
            | BuiltinBrick::Diode(_)
            | BuiltinBrick::Print(_)
            | BuiltinBrick::Rxtx(_) => {}
        }
        Ok(())
    }
}

/// Wrapper that holds either a built-in brick (enum dispatch) or a plugin
/// (trait object).
pub enum AnyBrick {
    Builtin(BuiltinBrick),
    Plugin(Box<dyn BrickPlugin>),
}

impl AnyBrick {
    /// Box a user brick.
    pub fn plugin<P: BrickPlugin + 'static>(plugin: P) -> Self {
        AnyBrick::Plugin(Box::new(plugin))
    }

    pub fn type_name(&self) -> &str {
        match self {
            AnyBrick::Builtin(b) => b.type_name(),
            AnyBrick::Plugin(p) => p.type_name(),
        }
    }

    pub fn kind(&self) -> BrickKind {
        match self {
            AnyBrick::Builtin(b) => b.kind(),
            AnyBrick::Plugin(p) => p.kind(),
        }
    }

    pub fn accepts_burst(&self) -> bool {
        match self {
            AnyBrick::Builtin(_) => true,
            AnyBrick::Plugin(p) => p.accepts_burst(),
        }
    }

    pub fn is_pollable(&self) -> bool {
        match self {
            AnyBrick::Builtin(b) => b.is_pollable(),
            AnyBrick::Plugin(p) => p.is_pollable(),
        }
    }

    pub fn burst(
        &mut self,
        ctx: &mut BrickContext<'_>,
        from: Side,
        edge_index: usize,
        burst: &mut Burst,
    ) -> Result<()> {
        match self {
            AnyBrick::Builtin(b) => b.burst(ctx, from, edge_index, burst),
            AnyBrick::Plugin(p) => p.burst(ctx, from, edge_index, burst),
        }
    }

    pub fn poll(&mut self, ctx: &mut BrickContext<'_>) -> Result<usize> {
        match self {
            AnyBrick::Builtin(b) => b.poll(ctx),
            AnyBrick::Plugin(p) => p.poll(ctx),
        }
    }

    pub fn reset(&mut self) -> Result<()> {
        match self {
            AnyBrick::Builtin(b) => b.reset(),
            AnyBrick::Plugin(p) => p.reset(),
        }
    }

    pub fn on_link(&mut self, side: Side, edge_index: usize) {
        if let AnyBrick::Plugin(p) = self {
            p.on_link(side, edge_index);
        }
    }

    pub fn on_unlink(&mut self, side: Side, edge_index: usize) {
        if let AnyBrick::Plugin(p) = self {
            p.on_unlink(side, edge_index);
        }
    }
}

impl From<Box<dyn BrickPlugin>> for AnyBrick {
    fn from(plugin: Box<dyn BrickPlugin>) -> Self {
        AnyBrick::Plugin(plugin)
    }
}

impl From<BuiltinBrick> for AnyBrick {
    fn from(builtin: BuiltinBrick) -> Self {
        AnyBrick::Builtin(builtin)
    }
}

/// Typed access to a built-in variant stored in the registry.
pub trait BuiltinVariant: Sized {
    const TYPE_NAME: &'static str;

    fn peek(brick: &BuiltinBrick) -> Option<&Self>;

    fn peek_mut(brick: &mut BuiltinBrick) -> Option<&mut Self>;
}

macro_rules! builtin_variant {
    ($ty:ident, $name:literal) => {
        impl From<$ty> for AnyBrick {
            fn from(brick: $ty) -> Self {
                AnyBrick::Builtin(BuiltinBrick::$ty(brick))
            }
        }

        impl BuiltinVariant for $ty {
            const TYPE_NAME: &'static str = $name;

            fn peek(brick: &BuiltinBrick) -> Option<&Self> {
                match brick {
                    BuiltinBrick::$ty(b) => Some(b),
                    _ => None,
                }
            }

            fn peek_mut(brick: &mut BuiltinBrick) -> Option<&mut Self> {
                match brick {
                    BuiltinBrick::$ty(b) => Some(b),
                    _ => None,
                }
            }
        }
    };
}

builtin_variant!(Nop, "nop");
builtin_variant!(Hub, "hub");
builtin_variant!(Diode, "diode");
builtin_variant!(Collect, "collect");
builtin_variant!(Filter, "filter");
builtin_variant!(Print, "print");
builtin_variant!(Rxtx, "rxtx");
builtin_variant!(Queue, "queue");

/// A brick as stored in the registry: topology plus behaviour.
pub struct Brick {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) kind: BrickKind,
    pub(crate) west: SideEdges,
    pub(crate) east: SideEdges,
    /// `None` while the behaviour is checked out by a burst or poll.
    pub(crate) node: Option<AnyBrick>,
}

impl Brick {
    pub(crate) fn new(name: String, node: AnyBrick, west_capacity: usize, east_capacity: usize) -> Self {
        let kind = node.kind();
        let (west_capacity, east_capacity) = match kind {
            BrickKind::Multipole => (west_capacity, east_capacity),
            BrickKind::Monopole | BrickKind::Dipole => (west_capacity.min(1), east_capacity.min(1)),
        };
        Self {
            name,
            type_name: node.type_name().to_string(),
            kind,
            west: SideEdges::new(west_capacity),
            east: SideEdges::new(east_capacity),
            node: Some(node),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> BrickKind {
        self.kind
    }

    pub fn side(&self, side: Side) -> &SideEdges {
        match side {
            Side::West => &self.west,
            Side::East => &self.east,
        }
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut SideEdges {
        match side {
            Side::West => &mut self.west,
            Side::East => &mut self.east,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.west.len() + self.east.len()
    }

    /// Whether one more edge on `side` respects the brick's arity.
    pub(crate) fn kind_allows(&self, side: Side) -> bool {
        match self.kind {
            BrickKind::Multipole => true,
            BrickKind::Monopole => self.edge_count() == 0,
            BrickKind::Dipole => self.side(side).is_empty(),
        }
    }
}
