//! Diode: lets traffic through in one direction only.

use crate::error::Result;
use crate::graph::brick::BrickContext;
use crate::graph::burst::Burst;
use crate::graph::side::Side;

/// One-way valve. Traffic heading for `output` passes; the rest is dropped.
#[derive(Debug)]
pub struct Diode {
    output: Side,
    dropped: u64,
}

impl Diode {
    pub fn new(output: Side) -> Self {
        Self { output, dropped: 0 }
    }

    pub fn output(&self) -> Side {
        self.output
    }

    /// Packets refused since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn burst(&mut self, ctx: &mut BrickContext<'_>, from: Side, burst: &mut Burst) -> Result<()> {
        if from == self.output {
            self.dropped += burst.len() as u64;
            return Ok(());
        }
        ctx.forward(from, burst)
    }
}
