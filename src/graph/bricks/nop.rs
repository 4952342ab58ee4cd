//! Nop: a sink that counts and discards everything it receives.

use crate::error::Result;
use crate::graph::burst::Burst;

/// Discarding sink.
#[derive(Debug, Default)]
pub struct Nop {
    packets: u64,
    bursts: u64,
}

impl Nop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn burst(&mut self, burst: &Burst) -> Result<()> {
        self.packets += burst.len() as u64;
        self.bursts += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.packets = 0;
        self.bursts = 0;
    }

    /// Packets received since creation or the last reset.
    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn bursts(&self) -> u64 {
        self.bursts
    }
}
