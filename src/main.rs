//! brickgraph demo
//!
//! Builds two pipelines on two scheduler threads, bridged by a queue pair:
//!
//! ```text
//!   thread 0:  generator ─► even-only filter ─► queue(to-b)
//!   thread 1:  queue(from-a) ─► print ─► sink
//! ```
//!
//! Runs them briefly, then prints the topology and the counters.

use anyhow::Context;
use brickgraph::graph::bricks::{friend, Filter, Nop, Print, PrintFlags, Queue, Rxtx};
use brickgraph::graph::{Burst, PacketPool, Pipeline, Registry};
use brickgraph::{Error, RuntimeConfig, Scheduler};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Packets the generator emits per poll.
const PACKETS_PER_POLL: usize = 8;
/// Packets the generator emits in total.
const TOTAL_PACKETS: usize = 64;

fn main() -> anyhow::Result<()> {
    let config = match std::env::var_os("BRICKGRAPH_CONFIG") {
        Some(path) => RuntimeConfig::load(&path)
            .with_context(|| format!("loading config from {:?}", path))?,
        None => RuntimeConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting brickgraph demo");

    let pool = PacketPool::new(config.pool.capacity, config.pool.buffer_size);

    // ── Producer side ──
    let mut producer = Registry::new();
    let gen_pool = pool.clone();
    let mut sequence = 0usize;
    let generator = producer.add(
        "generator",
        Rxtx::source(move |burst: &mut Burst| {
            for _ in 0..PACKETS_PER_POLL {
                if sequence >= TOTAL_PACKETS {
                    break;
                }
                let payload = (sequence as u32).to_be_bytes();
                burst.push(gen_pool.alloc(&payload)?)?;
                sequence += 1;
            }
            Ok(())
        }),
    )?;
    let even = producer.add(
        "even-only",
        Filter::new(|_, pkt| pkt.data().last().is_some_and(|b| b % 2 == 0)),
    )?;
    let to_b = producer.add("to-b", Queue::new(config.queue.default_capacity))?;
    producer.chain(&[generator, even, to_b])?;

    // ── Consumer side ──
    let mut consumer = Registry::new();
    let from_a = consumer.add("from-a", Queue::new(config.queue.default_capacity))?;
    let print = consumer.add(
        "print",
        Print::stdout(PrintFlags::DIRECTION | PrintFlags::HEX),
    )?;
    let sink = consumer.add("sink", Nop::new())?;
    consumer.chain(&[from_a, print, sink])?;

    friend(
        producer.get_mut::<Queue>(to_b)?,
        consumer.get_mut::<Queue>(from_a)?,
    )?;

    let producer = Pipeline::new("producer", producer, generator)?;
    let consumer = Pipeline::new("consumer", consumer, from_a)?;
    println!("{}", producer.dot()?);
    println!("{}", consumer.dot()?);

    let mut scheduler = Scheduler::new(config.scheduler.clone());
    let t0 = scheduler.init()?;
    let t1 = scheduler.init()?;
    scheduler.add_graph(t0, producer).map_err(Error::from)?;
    scheduler.add_graph(t1, consumer).map_err(Error::from)?;
    scheduler.run(t1)?;
    scheduler.run(t0)?;

    std::thread::sleep(Duration::from_millis(200));

    for tid in [t0, t1] {
        scheduler.stop(tid)?;
        while let Some((gid, err)) = scheduler.pop_error(tid)? {
            tracing::error!("{} graph {} failed: {}", tid, gid, err);
        }
        println!("{}: {:?}", tid, scheduler.stats(tid)?);
    }

    let producers = scheduler.destroy(t0)?;
    let consumers = scheduler.destroy(t1)?;
    if let Some(p) = producers.first() {
        let filter = p.registry().get::<Filter>(even)?;
        println!("filter: passed={} dropped={}", filter.passed(), filter.dropped());
    }
    if let Some(c) = consumers.first() {
        let nop = c.registry().get::<Nop>(sink)?;
        println!("sink: packets={} bursts={}", nop.packets(), nop.bursts());
    }

    scheduler.shutdown();
    tracing::info!("Done, {} packet buffers still live", pool.in_use());
    Ok(())
}
