//! Burst bitmask primitives.
//!
//! Bit `i` of a mask set means slot `i` of the burst holds a live packet.

/// Maximum number of packets in one burst.
pub const BURST_SIZE: usize = 64;

/// Mask with the lowest `n` bits set. `n` is clamped to 64.
#[inline]
pub const fn mask_first(n: usize) -> u64 {
    if n >= BURST_SIZE {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Number of packets a mask describes.
#[inline]
pub const fn popcount(mask: u64) -> usize {
    mask.count_ones() as usize
}

/// Ascending iterator over the slot indices set in a mask.
///
/// Holds its own copy of the mask, so restarting is just building a new one.
#[derive(Debug, Clone, Copy)]
pub struct MaskIter {
    remaining: u64,
}

impl MaskIter {
    #[inline]
    pub fn new(mask: u64) -> Self {
        Self { remaining: mask }
    }
}

impl Iterator for MaskIter {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.remaining.trailing_zeros() as usize;
        self.remaining &= self.remaining - 1;
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = popcount(self.remaining);
        (n, Some(n))
    }
}

impl ExactSizeIterator for MaskIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_first() {
        assert_eq!(mask_first(0), 0);
        assert_eq!(mask_first(1), 1);
        assert_eq!(mask_first(3), 0b111);
        assert_eq!(mask_first(63), u64::MAX >> 1);
        assert_eq!(mask_first(64), u64::MAX);
        assert_eq!(mask_first(100), u64::MAX);
    }

    #[test]
    fn test_iter_ascending() {
        let slots: Vec<_> = MaskIter::new(0b1010_0101).collect();
        assert_eq!(slots, vec![0, 2, 5, 7]);
    }

    #[test]
    fn test_iter_high_bit() {
        let slots: Vec<_> = MaskIter::new(1 << 63 | 1).collect();
        assert_eq!(slots, vec![0, 63]);
        assert_eq!(MaskIter::new(u64::MAX).len(), 64);
    }

    #[test]
    fn test_iter_restartable() {
        let iter = MaskIter::new(0b110);
        let first: Vec<_> = iter.collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
    }
}
