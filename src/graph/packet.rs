//! Reference-counted packet buffers.
//!
//! `PacketPool` stands in for the hardware buffer pool: it hands out at most
//! `capacity` live buffers of at most `buffer_size` bytes. A `PacketRef` is a
//! cloneable handle on one buffer. Cloning is the retain operation, dropping
//! is the release operation; the buffer goes back to the pool when its last
//! handle is dropped.

use crate::error::{Error, ErrorKind, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct PoolShared {
    capacity: usize,
    buffer_size: usize,
    in_use: AtomicUsize,
}

impl PoolShared {
    fn reserve(&self) -> Result<()> {
        let mut current = self.in_use.load(Ordering::Relaxed);
        loop {
            if current >= self.capacity {
                return Err(Error::new(ErrorKind::PoolExhausted {
                    capacity: self.capacity,
                }));
            }
            match self.in_use.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Fixed-capacity packet buffer pool.
#[derive(Debug, Clone)]
pub struct PacketPool {
    shared: Arc<PoolShared>,
}

impl PacketPool {
    pub fn new(capacity: usize, buffer_size: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                capacity,
                buffer_size,
                in_use: AtomicUsize::new(0),
            }),
        }
    }

    /// Allocate a buffer holding a copy of `data`.
    pub fn alloc(&self, data: &[u8]) -> Result<PacketRef> {
        PacketRef::alloc_in(&self.shared, data)
    }

    /// Number of buffers currently referenced by at least one handle.
    pub fn in_use(&self) -> usize {
        self.shared.in_use.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn buffer_size(&self) -> usize {
        self.shared.buffer_size
    }
}

/// One buffer; returns its pool slot on drop.
#[derive(Debug)]
pub struct PacketBuf {
    data: Vec<u8>,
    pool: Arc<PoolShared>,
}

impl PacketBuf {
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Replace the contents. Fails if `data` does not fit the pool's buffer size.
    pub fn set_data(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.pool.buffer_size {
            return Err(Error::new(ErrorKind::BufferTooLarge {
                len: data.len(),
                buffer_size: self.pool.buffer_size,
            }));
        }
        self.data.clear();
        self.data.extend_from_slice(data);
        Ok(())
    }
}

impl Drop for PacketBuf {
    fn drop(&mut self) {
        let prev = self.pool.in_use.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "packet pool accounting underflow");
    }
}

/// Handle on a pooled packet buffer.
#[derive(Debug, Clone)]
pub struct PacketRef(Arc<PacketBuf>);

impl PacketRef {
    fn alloc_in(pool: &Arc<PoolShared>, data: &[u8]) -> Result<Self> {
        if data.len() > pool.buffer_size {
            return Err(Error::new(ErrorKind::BufferTooLarge {
                len: data.len(),
                buffer_size: pool.buffer_size,
            }));
        }
        pool.reserve()?;
        let mut buf = Vec::with_capacity(pool.buffer_size);
        buf.extend_from_slice(data);
        Ok(Self(Arc::new(PacketBuf {
            data: buf,
            pool: pool.clone(),
        })))
    }

    /// Take one more reference on the buffer.
    #[inline]
    pub fn retain(&self) -> PacketRef {
        self.clone()
    }

    /// Give this reference back.
    #[inline]
    pub fn release(self) {
        drop(self)
    }

    /// Number of live handles on the buffer.
    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn data(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether two handles name the same buffer.
    pub fn same_buffer(&self, other: &PacketRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Mutable access to the buffer.
    ///
    /// A unique handle mutates in place. A shared handle is first moved onto a
    /// private copy drawn from the same pool, which can fail on exhaustion.
    pub fn make_mut(&mut self) -> Result<&mut PacketBuf> {
        if Arc::get_mut(&mut self.0).is_none() {
            let copy = PacketRef::alloc_in(&self.0.pool, self.0.as_slice())?;
            *self = copy;
        }
        Arc::get_mut(&mut self.0).ok_or_else(|| {
            Error::brick("packet", "freshly copied buffer is unexpectedly shared")
        })
    }
}
