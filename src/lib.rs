//! # brickgraph: brick graph packet-processing runtime
//!
//! Independent processing units ("bricks") are wired into a graph of WEST and
//! EAST sides. Bursts of up to 64 packets are pushed synchronously from brick
//! to brick; pollable bricks pull packets from the outside world and inject
//! them. Graphs run on scheduler threads and talk to each other only through
//! paired queue bricks.
//!
//! ## Architecture
//!
//! - **Graph** (`graph`): bricks, sides and edges owned by a `Registry`, the
//!   burst forwarding protocol, discovery and topology export.
//! - **Bricks** (`graph::bricks`): built-in variants; user bricks implement
//!   `BrickPlugin`.
//! - **Scheduler** (`scheduler`): worker threads polling their pipelines, with
//!   per-graph failure isolation and a spin-locked command ring.
//! - **Config** (`config`): TOML-loadable runtime settings.
//!
//! ## Example
//!
//! ```ignore
//! use brickgraph::graph::bricks::{Collect, Hub};
//! use brickgraph::graph::{Burst, PacketPool, Registry, Side};
//!
//! let pool = PacketPool::new(64, 2048);
//! let mut reg = Registry::new();
//! let hub = reg.add("hub", Hub::new())?;
//! let left = reg.add("left", Collect::new())?;
//! let right = reg.add("right", Collect::new())?;
//! reg.link(left, hub)?;
//! reg.link(hub, right)?;
//!
//! let mut burst = Burst::from_packets([pool.alloc(b"hello")?])?;
//! reg.burst(hub, Side::West, 0, &mut burst)?;
//! assert_eq!(reg.get::<Collect>(right)?.last(Side::West).len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod scheduler;

// Re-export commonly used types
pub use config::RuntimeConfig;
pub use error::{Error, ErrorCategory, ErrorKind, Result, ResultExt};
pub use graph::{BrickId, Burst, PacketPool, PacketRef, Pipeline, Registry, Side};
pub use scheduler::{AddGraphError, GraphState, Scheduler, ThreadState};
