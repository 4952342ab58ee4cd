//! Rxtx: callback-driven packet source and sink.
//!
//! This is the seam where packets enter and leave the runtime: NIC drivers,
//! tap devices and test harnesses plug in through the `rx` and `tx`
//! callbacks. On `poll` the `rx` callback fills a fresh burst, which is pushed
//! out on the brick's single edge and released afterwards. Bursts arriving
//! from the graph are handed to `tx`; a `tx` that wants to keep packets must
//! retain them.

use crate::error::Result;
use crate::graph::brick::BrickContext;
use crate::graph::burst::Burst;
use crate::graph::side::Side;

/// Fills the burst with packets pulled from the outside world.
pub type RxCallback = Box<dyn FnMut(&mut Burst) -> Result<()> + Send>;
/// Receives a burst leaving the graph, with the side it arrived on.
pub type TxCallback = Box<dyn FnMut(Side, &Burst) -> Result<()> + Send>;

pub struct Rxtx {
    rx: Option<RxCallback>,
    tx: Option<TxCallback>,
    rx_packets: u64,
    tx_packets: u64,
}

impl Rxtx {
    pub fn new(rx: Option<RxCallback>, tx: Option<TxCallback>) -> Self {
        Self {
            rx,
            tx,
            rx_packets: 0,
            tx_packets: 0,
        }
    }

    /// Entry point only.
    pub fn source<F>(rx: F) -> Self
    where
        F: FnMut(&mut Burst) -> Result<()> + Send + 'static,
    {
        Self::new(Some(Box::new(rx)), None)
    }

    /// Exit point only.
    pub fn sink<F>(tx: F) -> Self
    where
        F: FnMut(Side, &Burst) -> Result<()> + Send + 'static,
    {
        Self::new(None, Some(Box::new(tx)))
    }

    pub fn has_rx(&self) -> bool {
        self.rx.is_some()
    }

    pub fn rx_packets(&self) -> u64 {
        self.rx_packets
    }

    pub fn tx_packets(&self) -> u64 {
        self.tx_packets
    }

    pub fn poll(&mut self, ctx: &mut BrickContext<'_>) -> Result<usize> {
        let Some(rx) = self.rx.as_mut() else {
            return Ok(0);
        };
        let mut burst = Burst::new();
        rx(&mut burst)?;
        let count = burst.len();
        if count == 0 {
            return Ok(0);
        }
        self.rx_packets += count as u64;
        ctx.forward_all(&mut burst)?;
        Ok(count)
    }

    pub fn burst(&mut self, _ctx: &mut BrickContext<'_>, from: Side, burst: &mut Burst) -> Result<()> {
        self.tx_packets += burst.len() as u64;
        match self.tx.as_mut() {
            Some(tx) => tx(from, burst),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Rxtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rxtx")
            .field("rx", &self.rx.is_some())
            .field("tx", &self.tx.is_some())
            .field("rx_packets", &self.rx_packets)
            .field("tx_packets", &self.tx_packets)
            .finish()
    }
}
