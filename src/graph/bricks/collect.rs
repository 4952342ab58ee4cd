//! Collect: a sink that keeps the last burst received on each side.
//!
//! The kept packets are retained, so they stay valid after the sender
//! releases its own references. Receiving a new burst on a side releases the
//! one kept before it.

use crate::error::Result;
use crate::graph::burst::Burst;
use crate::graph::side::Side;

#[derive(Debug, Default)]
pub struct Collect {
    west: Burst,
    east: Burst,
    received: u64,
}

impl Collect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn burst(&mut self, from: Side, burst: &Burst) -> Result<()> {
        let mut kept = Burst::new();
        for (idx, pkt) in burst.iter() {
            kept.insert(idx, pkt.retain())?;
        }
        self.received += kept.len() as u64;
        *self.slot_mut(from) = kept;
        Ok(())
    }

    /// Last burst that arrived from `side`.
    pub fn last(&self, side: Side) -> &Burst {
        match side {
            Side::West => &self.west,
            Side::East => &self.east,
        }
    }

    /// Hand the kept burst for `side` to the caller, leaving it empty.
    pub fn take_burst(&mut self, side: Side) -> Burst {
        std::mem::take(self.slot_mut(side))
    }

    /// Packets received since creation or the last reset.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn reset(&mut self) {
        self.west.clear();
        self.east.clear();
        self.received = 0;
    }

    fn slot_mut(&mut self, side: Side) -> &mut Burst {
        match side {
            Side::West => &mut self.west,
            Side::East => &mut self.east,
        }
    }
}
