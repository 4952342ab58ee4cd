//! Burst forwarding and packet ownership
//!
//! These tests push bursts through small graphs and check:
//! - fan-out order and targets for the generic forward, Hub and Diode
//! - masks and refcounts across pass-through chains
//! - error propagation and re-entry detection

mod common;

use brickgraph::error::ErrorKind;
use brickgraph::graph::bricks::{Collect, Diode, Filter, Hub, Nop, Print, PrintFlags};
use brickgraph::graph::{AnyBrick, Burst, PacketPool, Registry, Side};
use common::builders::ChainBuilder;
use common::mock_helpers::{Arrival, Faulty, Recorder};
use common::{burst_of, packets, tags};
use proptest::prelude::*;

#[test]
fn test_hub_broadcast_skips_ingress() {
    let pool = PacketPool::new(64, 16);
    let mut reg = Registry::new();
    let hub = reg.add("hub", Hub::new()).unwrap();
    let mut logs = Vec::new();
    let mut recorders = Vec::new();
    for i in 0..3 {
        let (rec, log) = Recorder::new();
        let id = reg.add(format!("r{}", i), AnyBrick::plugin(rec)).unwrap();
        reg.link(id, hub).unwrap();
        recorders.push(id);
        logs.push(log);
    }

    let pkts = packets(&pool, 5);
    let mut burst = burst_of(&pkts);
    reg.burst(hub, Side::West, 0, &mut burst).unwrap();

    assert!(logs[0].lock().unwrap().is_empty());
    for (i, log) in logs.iter().enumerate().skip(1) {
        assert_eq!(
            *log.lock().unwrap(),
            vec![Arrival {
                from: Side::East,
                edge_index: 0,
                mask: 0b11111
            }],
            "recorder {}",
            i
        );
    }
    assert_eq!(burst.mask(), 0b11111);
}

#[test]
fn test_generic_forward_reaches_each_edge_in_order() {
    let pool = PacketPool::new(64, 16);
    let mut reg = Registry::new();
    let print = reg.add("print", Print::new(std::io::sink(), PrintFlags::NONE)).unwrap();
    let (rec, log) = Recorder::new();
    let rec = reg.add("rec", AnyBrick::plugin(rec)).unwrap();
    let (rec2, log2) = Recorder::new();
    let rec2 = reg.add("rec2", AnyBrick::plugin(rec2)).unwrap();
    reg.link(print, rec).unwrap();
    reg.link(print, rec2).unwrap();

    let mut burst = burst_of(&packets(&pool, 2));
    reg.burst(print, Side::West, 0, &mut burst).unwrap();

    assert_eq!(log.lock().unwrap()[0].from, Side::West);
    assert_eq!(log.lock().unwrap()[0].edge_index, 0);
    assert_eq!(log2.lock().unwrap()[0].edge_index, 0);
}

#[test]
fn test_diode_direction() {
    let pool = PacketPool::new(64, 16);
    let (mut reg, ids) = ChainBuilder::new()
        .then("west", Collect::new())
        .then("diode", Diode::new(Side::East))
        .then("east", Collect::new())
        .build();
    let (west, diode, east) = (ids[0], ids[1], ids[2]);

    let pkts = packets(&pool, 3);
    let mut burst = burst_of(&pkts);
    reg.burst(diode, Side::West, 0, &mut burst).unwrap();
    assert_eq!(tags(reg.get::<Collect>(east).unwrap().last(Side::West)), vec![0, 1, 2]);

    let mut burst = burst_of(&pkts);
    reg.burst(diode, Side::East, 0, &mut burst).unwrap();
    assert!(reg.get::<Collect>(west).unwrap().last(Side::East).is_empty());
    assert_eq!(reg.get::<Diode>(diode).unwrap().dropped(), 3);
}

#[test]
fn test_filter_hides_packets_from_downstream_only() {
    let pool = PacketPool::new(64, 16);
    let (mut reg, ids) = ChainBuilder::new()
        .then("filter", Filter::new(|_, pkt| pkt.data()[0] % 2 == 0))
        .then("out", Collect::new())
        .build();
    let mut burst = burst_of(&packets(&pool, 6));
    reg.burst(ids[0], Side::West, 0, &mut burst).unwrap();

    assert_eq!(tags(reg.get::<Collect>(ids[1]).unwrap().last(Side::West)), vec![0, 2, 4]);
    // the caller's view is untouched
    assert_eq!(burst.len(), 6);
    assert_eq!(reg.get::<Filter>(ids[0]).unwrap().dropped(), 3);
}

#[test]
fn test_collect_retains_past_caller_release() {
    let pool = PacketPool::new(64, 16);
    let mut reg = Registry::new();
    let collect = reg.add("collect", Collect::new()).unwrap();
    {
        let mut burst = Burst::from_packets(packets(&pool, 4)).unwrap();
        reg.burst(collect, Side::West, 0, &mut burst).unwrap();
    }
    // the caller dropped its references; the collector still holds them
    assert_eq!(pool.in_use(), 4);
    reg.reset(collect).unwrap();
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_failure_aborts_fan_out() {
    let pool = PacketPool::new(64, 16);
    let mut reg = Registry::new();
    let hub = reg.add("hub", Hub::new()).unwrap();
    let first = reg.add("first", Nop::new()).unwrap();
    let faulty = reg.add("faulty", AnyBrick::plugin(Faulty)).unwrap();
    let last = reg.add("last", Nop::new()).unwrap();
    reg.link(hub, first).unwrap();
    reg.link(hub, faulty).unwrap();
    reg.link(hub, last).unwrap();

    let mut burst = burst_of(&packets(&pool, 1));
    let err = reg.burst(hub, Side::West, 0, &mut burst).unwrap_err();
    assert!(err.to_string().contains("injected failure"));
    // delivered before the failure, not after
    assert_eq!(reg.get::<Nop>(first).unwrap().packets(), 1);
    assert_eq!(reg.get::<Nop>(last).unwrap().packets(), 0);
}

#[test]
fn test_hub_loop_is_reentrant_error() {
    let pool = PacketPool::new(64, 16);
    let mut reg = Registry::new();
    let a = reg.add("a", Hub::new()).unwrap();
    let b = reg.add("b", Hub::new()).unwrap();
    reg.link(a, b).unwrap();
    reg.link(b, a).unwrap();

    let mut burst = burst_of(&packets(&pool, 1));
    let err = reg.burst(a, Side::West, 5, &mut burst).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Reentrant(name) if name == "a"));
    // both behaviours were checked back in
    assert!(reg.burst(b, Side::West, 0, &mut burst).is_err());
    assert!(reg.get::<Hub>(a).is_ok());
}

#[test]
fn test_pure_source_refuses_bursts() {
    let mut reg = Registry::new();
    let src = reg
        .add("src", AnyBrick::plugin(common::mock_helpers::TickSource::new(None)))
        .unwrap();
    let err = reg.burst(src, Side::West, 0, &mut Burst::new()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotReceiver(_)));
}

proptest! {
    /// Through any chain of pass-through bricks the sink sees exactly the
    /// entry mask, and once everything is released no buffer is live.
    #[test]
    fn prop_pass_through_preserves_mask_and_refcounts(
        hops in 1..6usize,
        mask in any::<u64>(),
    ) {
        let pool = PacketPool::new(128, 8);
        let mut builder = ChainBuilder::new();
        for i in 0..hops {
            builder = match i % 3 {
                0 => builder.then(&format!("hub{}", i), Hub::new()),
                1 => builder.then(&format!("print{}", i), Print::new(std::io::sink(), PrintFlags::HEX)),
                _ => builder.then(&format!("filter{}", i), Filter::passthrough()),
            };
        }
        let (mut reg, ids) = builder.then("sink", Collect::new()).build();
        let sink = *ids.last().unwrap();

        let pkts = packets(&pool, 64);
        let mut burst = burst_of(&pkts);
        burst.set_mask(mask).unwrap();
        reg.burst(ids[0], Side::West, 0, &mut burst).unwrap();

        prop_assert_eq!(burst.mask(), mask);
        let seen = reg.get::<Collect>(sink).unwrap().last(Side::West).mask();
        prop_assert_eq!(seen, mask);
        for (i, pkt) in pkts.iter().enumerate() {
            // ours + the burst's + the collector's (if it saw it)
            let expected = 2 + ((mask >> i) & 1) as usize;
            prop_assert_eq!(pkt.refcount(), expected);
        }

        drop(burst);
        reg.reset(sink).unwrap();
        for pkt in &pkts {
            prop_assert_eq!(pkt.refcount(), 1);
        }
        drop(pkts);
        prop_assert_eq!(pool.in_use(), 0);
    }
}
