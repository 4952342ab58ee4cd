//! Brick graph runtime.
//!
//! Bricks are owned by a [`Registry`] and wired WEST to EAST into a graph.
//! Traffic moves as [`Burst`]s of up to 64 packets pushed synchronously from
//! brick to brick; pollable bricks are the entry points. A [`Pipeline`] bundles
//! a registry with a root and is what a scheduler thread drives.

pub mod brick;
pub mod bricks;
pub mod burst;
pub mod id;
pub mod mask;
pub mod packet;
pub mod pipeline;
pub mod registry;
pub mod side;
pub mod topology;
pub mod traversal;

pub use brick::{AnyBrick, BrickContext, BrickKind, BrickPlugin, BuiltinBrick};
pub use burst::Burst;
pub use id::{BrickId, GraphId, ThreadId};
pub use mask::{mask_first, popcount, BURST_SIZE};
pub use packet::{PacketPool, PacketRef};
pub use pipeline::Pipeline;
pub use registry::{Registry, DEFAULT_SIDE_CAPACITY};
pub use side::{Edge, Side};
pub use topology::{export_topology, TopologySnapshot};
pub use traversal::Graph;
