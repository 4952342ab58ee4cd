//! Hub: broadcast domain.
//!
//! A burst arriving on any edge goes out on every other edge, on both sides.

use crate::error::Result;
use crate::graph::brick::BrickContext;
use crate::graph::burst::Burst;
use crate::graph::side::Side;

#[derive(Debug, Default)]
pub struct Hub;

impl Hub {
    pub fn new() -> Self {
        Self
    }

    pub fn burst(
        &mut self,
        ctx: &mut BrickContext<'_>,
        from: Side,
        edge_index: usize,
        burst: &mut Burst,
    ) -> Result<()> {
        for side in Side::ALL {
            let skip = (side == from).then_some(edge_index);
            ctx.forward_side(side, burst, skip)?;
        }
        Ok(())
    }
}
