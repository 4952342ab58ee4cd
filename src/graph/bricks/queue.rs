//! Queue: bounded, lossy relay between two graphs on different threads.
//!
//! Two endpoints are paired with `friend`. Each endpoint owns an inbox ring;
//! its friend holds a handle on it. A burst pushed into endpoint A from its
//! own graph is copied (packets retained) into B's inbox, and B's `poll`
//! replays it into B's graph, and vice versa.
//!
//! When an inbox is full the oldest entry is evicted and its packets released,
//! so memory stays bounded and the producer never waits on the consumer.
//! The inbox is the only structure touched from two threads; it sits behind a
//! `spin::Mutex` and every critical section is a push or pop.

use crate::error::{Error, ErrorKind, Result};
use crate::graph::brick::BrickContext;
use crate::graph::burst::Burst;
use crate::graph::packet::PacketRef;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One queued burst, compacted to its live packets.
struct Entry {
    packets: Vec<PacketRef>,
}

struct Ring {
    entries: VecDeque<Entry>,
    capacity: usize,
}

struct Inbox {
    ring: spin::Mutex<Ring>,
    evicted: AtomicU64,
}

impl Inbox {
    fn new(capacity: usize) -> Self {
        Self {
            ring: spin::Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity),
                capacity,
            }),
            evicted: AtomicU64::new(0),
        }
    }

    /// Enqueue, evicting the oldest entry when full. Returns the evicted entry
    /// so it is released outside the lock.
    fn push(&self, entry: Entry) -> Option<Entry> {
        let mut ring = self.ring.lock();
        let evicted = if ring.entries.len() >= ring.capacity {
            ring.entries.pop_front()
        } else {
            None
        };
        ring.entries.push_back(entry);
        evicted
    }

    fn pop(&self) -> Option<Entry> {
        self.ring.lock().entries.pop_front()
    }
}

/// One endpoint of a queue pair.
pub struct Queue {
    capacity: usize,
    inbox: Arc<Inbox>,
    friend: Option<Arc<Inbox>>,
    enqueued: u64,
    dequeued: u64,
}

impl Queue {
    /// Endpoint whose inbox holds up to `capacity` bursts (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inbox: Arc::new(Inbox::new(capacity)),
            friend: None,
            enqueued: 0,
            dequeued: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bursts waiting in this endpoint's inbox.
    pub fn len(&self) -> usize {
        self.inbox.ring.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_friend(&self) -> bool {
        self.friend.is_some()
    }

    /// Inbox fill ratio scaled to `0..=255`. Advisory only.
    pub fn pressure(&self) -> u8 {
        let len = self.len();
        ((len * u8::MAX as usize) / self.capacity).min(u8::MAX as usize) as u8
    }

    /// Bursts this endpoint sent to its friend.
    pub fn enqueued(&self) -> u64 {
        self.enqueued
    }

    /// Bursts this endpoint replayed into its own graph.
    pub fn dequeued(&self) -> u64 {
        self.dequeued
    }

    /// Bursts dropped from this endpoint's inbox because it was full.
    pub fn evicted(&self) -> u64 {
        self.inbox.evicted.load(Ordering::Relaxed)
    }

    pub fn burst(&mut self, burst: &Burst) -> Result<()> {
        let Some(friend) = self.friend.as_ref() else {
            return Err(Error::brick("queue", "endpoint has no friend"));
        };
        if burst.is_empty() {
            return Ok(());
        }
        let entry = Entry {
            packets: burst.retain_all(),
        };
        if let Some(old) = friend.push(entry) {
            friend.evicted.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Queue full, dropped oldest burst ({} packets)", old.packets.len());
        }
        self.enqueued += 1;
        Ok(())
    }

    /// Replay the oldest queued burst into the graph. An empty inbox yields 0.
    pub fn poll(&mut self, ctx: &mut BrickContext<'_>) -> Result<usize> {
        let Some(entry) = self.inbox.pop() else {
            return Ok(0);
        };
        let mut burst = Burst::from_packets(entry.packets)?;
        let count = burst.len();
        self.dequeued += 1;
        ctx.forward_all(&mut burst)?;
        Ok(count)
    }

    /// Release every queued burst.
    pub fn reset(&mut self) {
        let drained: Vec<Entry> = self.inbox.ring.lock().entries.drain(..).collect();
        drop(drained);
        self.enqueued = 0;
        self.dequeued = 0;
        self.inbox.evicted.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("has_friend", &self.has_friend())
            .finish()
    }
}

/// Pair two endpoints. Pairing an already paired couple again is a no-op;
/// pairing an endpoint that has another friend fails.
pub fn friend(a: &mut Queue, b: &mut Queue) -> Result<()> {
    if are_friends(a, b) {
        return Ok(());
    }
    if a.has_friend() {
        return Err(Error::new(ErrorKind::AlreadyFriend("west endpoint".to_string())));
    }
    if b.has_friend() {
        return Err(Error::new(ErrorKind::AlreadyFriend("east endpoint".to_string())));
    }
    a.friend = Some(Arc::clone(&b.inbox));
    b.friend = Some(Arc::clone(&a.inbox));
    tracing::debug!("Paired queues (capacity {} <-> {})", a.capacity, b.capacity);
    Ok(())
}

/// Break a pairing. Bursts already queued stay in their inboxes.
pub fn unfriend(a: &mut Queue, b: &mut Queue) {
    if are_friends(a, b) {
        a.friend = None;
        b.friend = None;
    }
}

pub fn are_friends(a: &Queue, b: &Queue) -> bool {
    matches!(
        (&a.friend, &b.friend),
        (Some(fa), Some(fb)) if Arc::ptr_eq(fa, &b.inbox) && Arc::ptr_eq(fb, &a.inbox)
    )
}
