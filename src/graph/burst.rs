//! Bursts: the unit of dataflow between bricks.
//!
//! A `Burst` owns up to 64 packet references plus an occupancy mask. The
//! burst holds one reference per filled slot; whoever owns the `Burst` value
//! (normally the poller that built it) releases them all with `clear` or on
//! drop. Bricks only ever see `&mut Burst`:
//!
//! - to drop a packet, clear its bit with `drop_slot`;
//! - to keep a packet past the call, `retain` it (clone the `PacketRef`);
//! - to rewrite a packet, `replace` the slot or go through `PacketRef::make_mut`.
//!
//! A slot whose bit is clear may still hold a stale reference. It is never
//! read through the public accessors and is released with the burst.

use crate::error::{Error, ErrorKind, Result};
use crate::graph::mask::{mask_first, popcount, MaskIter, BURST_SIZE};
use crate::graph::packet::PacketRef;

/// Fixed-capacity packet burst.
pub struct Burst {
    slots: [Option<PacketRef>; BURST_SIZE],
    mask: u64,
}

impl Burst {
    /// Create an empty burst.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            mask: 0,
        }
    }

    /// Build a burst from packets placed in slots `0..n`.
    pub fn from_packets<I>(packets: I) -> Result<Self>
    where
        I: IntoIterator<Item = PacketRef>,
    {
        let mut burst = Self::new();
        let mut n = 0;
        for pkt in packets {
            if n >= BURST_SIZE {
                return Err(Error::new(ErrorKind::Oversized(n + 1)));
            }
            burst.slots[n] = Some(pkt);
            n += 1;
        }
        burst.mask = mask_first(n);
        Ok(burst)
    }

    /// Occupancy mask of live packets.
    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Number of live packets.
    #[inline]
    pub fn len(&self) -> usize {
        popcount(self.mask)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.mask == u64::MAX
    }

    /// Bits of every slot holding a reference, live or stale.
    pub fn occupied(&self) -> u64 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .fold(0u64, |acc, (i, _)| acc | (1 << i))
    }

    /// Replace the mask. Every set bit must name a slot holding a reference.
    pub fn set_mask(&mut self, mask: u64) -> Result<()> {
        let occupied = self.occupied();
        if mask & !occupied != 0 {
            return Err(Error::new(ErrorKind::MalformedMask { mask, occupied }));
        }
        self.mask = mask;
        Ok(())
    }

    /// Reinstate a mask saved before a call, dropping bits whose slots were
    /// taken in the meantime.
    pub(crate) fn restore_mask(&mut self, mask: u64) {
        self.mask = mask & self.occupied();
    }

    /// Put `pkt` in slot `idx` and mark it live. Returns what the slot held.
    pub fn insert(&mut self, idx: usize, pkt: PacketRef) -> Result<Option<PacketRef>> {
        if idx >= BURST_SIZE {
            return Err(Error::new(ErrorKind::Oversized(idx + 1)));
        }
        self.mask |= 1 << idx;
        Ok(self.slots[idx].replace(pkt))
    }

    /// Put `pkt` in the lowest free slot. Returns the slot index.
    pub fn push(&mut self, pkt: PacketRef) -> Result<usize> {
        if self.is_full() {
            return Err(Error::new(ErrorKind::Oversized(BURST_SIZE + 1)));
        }
        let idx = (!self.mask).trailing_zeros() as usize;
        // A stale reference in the slot is released here.
        self.slots[idx] = Some(pkt);
        self.mask |= 1 << idx;
        Ok(idx)
    }

    /// Live packet in slot `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&PacketRef> {
        if idx < BURST_SIZE && self.mask & (1 << idx) != 0 {
            self.slots[idx].as_ref()
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut PacketRef> {
        if idx < BURST_SIZE && self.mask & (1 << idx) != 0 {
            self.slots[idx].as_mut()
        } else {
            None
        }
    }

    /// Live packets in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &PacketRef)> + '_ {
        MaskIter::new(self.mask).filter_map(move |i| self.slots[i].as_ref().map(|p| (i, p)))
    }

    /// Clear the bit of slot `idx`. Returns whether the slot was live.
    pub fn drop_slot(&mut self, idx: usize) -> bool {
        if idx >= BURST_SIZE {
            return false;
        }
        let bit = 1u64 << idx;
        let was_live = self.mask & bit != 0;
        self.mask &= !bit;
        was_live
    }

    /// Move the packet out of slot `idx`, clearing its bit.
    pub fn take(&mut self, idx: usize) -> Option<PacketRef> {
        if !self.drop_slot(idx) {
            return None;
        }
        self.slots[idx].take()
    }

    /// Swap a live packet for `pkt`, returning the old one.
    pub fn replace(&mut self, idx: usize, pkt: PacketRef) -> Result<PacketRef> {
        match self.get_mut(idx) {
            Some(slot) => Ok(std::mem::replace(slot, pkt)),
            None => Err(Error::new(ErrorKind::MalformedMask {
                mask: self.mask | (1u64 << idx.min(BURST_SIZE - 1)),
                occupied: self.occupied(),
            })),
        }
    }

    /// Retain every live packet, in ascending slot order.
    pub fn retain_all(&self) -> Vec<PacketRef> {
        self.iter().map(|(_, p)| p.retain()).collect()
    }

    /// Release every reference the burst holds and reset the mask.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.mask = 0;
    }
}

impl Default for Burst {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Burst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Burst")
            .field("mask", &format_args!("{:#018x}", self.mask))
            .field("len", &self.len())
            .finish()
    }
}
