//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use brickgraph::graph::{Burst, PacketPool, PacketRef};
use std::time::{Duration, Instant};

/// Upper bound for waiting on worker threads
pub fn test_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Poll `condition` until it holds or the timeout expires.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + test_timeout();
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// `n` one-byte packets tagged `0..n`.
pub fn packets(pool: &PacketPool, n: usize) -> Vec<PacketRef> {
    (0..n).map(|i| pool.alloc(&[i as u8]).unwrap()).collect()
}

/// Burst holding an extra reference to each of `pkts`.
pub fn burst_of(pkts: &[PacketRef]) -> Burst {
    Burst::from_packets(pkts.iter().map(|p| p.retain())).unwrap()
}

/// Payload tags of the live packets in `burst`.
pub fn tags(burst: &Burst) -> Vec<u8> {
    burst.iter().map(|(_, p)| p.data()[0]).collect()
}
