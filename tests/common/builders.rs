//! Test data builders for creating graphs and pipelines

use super::mock_helpers::TickSource;
use brickgraph::graph::bricks::Nop;
use brickgraph::graph::{AnyBrick, BrickId, Pipeline, Registry};

/// Builder for a straight west-to-east chain of bricks.
pub struct ChainBuilder {
    registry: Registry,
    ids: Vec<BrickId>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            ids: Vec::new(),
        }
    }

    /// Append a brick east of the current tail.
    pub fn then(mut self, name: &str, brick: impl Into<AnyBrick>) -> Self {
        let id = self.registry.add(name, brick).unwrap();
        if let Some(&tail) = self.ids.last() {
            self.registry.link(tail, id).unwrap();
        }
        self.ids.push(id);
        self
    }

    pub fn build(self) -> (Registry, Vec<BrickId>) {
        (self.registry, self.ids)
    }
}

/// Pipeline `source -> sink` whose source fails on poll `fail_at`.
pub fn tick_pipeline(name: &str, fail_at: Option<u32>) -> Pipeline {
    let (registry, ids) = ChainBuilder::new()
        .then("source", AnyBrick::plugin(TickSource::new(fail_at)))
        .then("sink", Nop::new())
        .build();
    Pipeline::new(name, registry, ids[0]).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brickgraph::graph::Side;

    #[test]
    fn test_chain_builder() {
        let (reg, ids) = ChainBuilder::new()
            .then("a", Nop::new())
            .then("b", Nop::new())
            .build();
        assert_eq!(reg.edges(ids[0], Side::East).unwrap()[0].link, ids[1]);
    }
}
