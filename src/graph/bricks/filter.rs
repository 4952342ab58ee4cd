//! Filter: drops packets that fail a predicate.
//!
//! Dropping clears the packet's bit before the burst moves on, so neighbors
//! never see it. The sender still owns the reference and releases it.

use crate::error::Result;
use crate::graph::brick::BrickContext;
use crate::graph::burst::Burst;
use crate::graph::mask::popcount;
use crate::graph::packet::PacketRef;
use crate::graph::side::Side;

/// Predicate deciding whether a packet passes.
pub type FilterFn = Box<dyn FnMut(Side, &PacketRef) -> bool + Send>;

/// Predicate-driven inline drop.
pub struct Filter {
    predicate: FilterFn,
    passed: u64,
    dropped: u64,
}

impl Filter {
    /// `predicate` gets the side the packet came from and the packet.
    pub fn new<F>(predicate: F) -> Self
    where
        F: FnMut(Side, &PacketRef) -> bool + Send + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            passed: 0,
            dropped: 0,
        }
    }

    /// Filter passing everything.
    pub fn passthrough() -> Self {
        Self::new(|_, _| true)
    }

    pub fn burst(&mut self, ctx: &mut BrickContext<'_>, from: Side, burst: &mut Burst) -> Result<()> {
        let entry_mask = burst.mask();
        let mut keep = entry_mask;
        for (idx, pkt) in burst.iter() {
            if !(self.predicate)(from, pkt) {
                keep &= !(1u64 << idx);
            }
        }
        burst.set_mask(keep)?;
        self.dropped += popcount(entry_mask & !keep) as u64;
        self.passed += popcount(keep) as u64;

        let result = ctx.forward(from, burst);
        // the sender gets its mask back untouched
        burst.restore_mask(entry_mask);
        result
    }

    pub fn passed(&self) -> u64 {
        self.passed
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.passed = 0;
        self.dropped = 0;
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("passed", &self.passed)
            .field("dropped", &self.dropped)
            .finish()
    }
}
